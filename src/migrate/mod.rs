//! Orchestration of a copy run between two servers.
//!
//! Every batch isolates failures per item: an item that fails is logged and
//! counted, and the batch moves on, unless abort mode is set.

mod images;
mod tags;

pub use images::{CHANNEL_EXCLUDES, IMAGE_EXCLUDES, LOGICAL_CHANNEL_EXCLUDES, PIXELS_EXCLUDES};

use crate::error::{MigrateError, Result};
use crate::metrics::{self, MetricName};
use crate::model::ObjectKind;
use crate::store::ObjectStore;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Run-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Discover and log, but create nothing.
    pub dry_run: bool,
    /// Stop at the first failing item instead of logging and skipping it.
    pub abort_on_error: bool,
    /// Also copy image metadata after tags and tagsets.
    pub images: bool,
}

/// What happened to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created,
    /// Already present on the destination.
    Skipped,
    /// Would have been created; dry run.
    Planned,
}

/// Counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopySummary {
    pub examined: usize,
    pub created: usize,
    pub skipped: usize,
    pub planned: usize,
    pub failed: usize,
}

impl CopySummary {
    fn record(&mut self, kind: ObjectKind, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Created => {
                self.created += 1;
                metrics::increment_for(MetricName::ObjectsCreated, kind);
            }
            ItemOutcome::Skipped => {
                self.skipped += 1;
                metrics::increment_for(MetricName::ObjectsSkipped, kind);
            }
            ItemOutcome::Planned => self.planned += 1,
        }
    }

    /// Count a failed item; under abort mode hand the error back instead.
    fn fail(&mut self, kind: ObjectKind, options: &CopyOptions, err: MigrateError) -> Result<()> {
        self.failed += 1;
        metrics::increment_for(MetricName::ObjectsFailed, kind);
        if options.abort_on_error {
            return Err(err);
        }
        Ok(())
    }
}

impl fmt::Display for CopySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined {}, created {}, skipped {}, planned {}, failed {}",
            self.examined, self.created, self.skipped, self.planned, self.failed
        )
    }
}

/// Per-batch results of [`Migrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub tags: CopySummary,
    pub tagsets: CopySummary,
    pub images: Option<CopySummary>,
}

/// Copies objects from a source store to a destination store.
pub struct Migrator {
    source: Arc<dyn ObjectStore>,
    destination: Arc<dyn ObjectStore>,
    options: CopyOptions,
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("source", &self.source.label())
            .field("destination", &self.destination.label())
            .field("options", &self.options)
            .finish()
    }
}

impl Migrator {
    pub fn new(
        source: Arc<dyn ObjectStore>,
        destination: Arc<dyn ObjectStore>,
        options: CopyOptions,
    ) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Tags, then tagsets against a refreshed registry, then optionally images.
    #[instrument(skip(self), fields(source = self.source.label(), destination = self.destination.label()))]
    pub async fn run(&self) -> Result<SessionSummary> {
        let tags = self.get_tags().await?;

        let registry = self.refresh_tag_registry(None).await?;
        let tag_summary = self.copy_tags(&tags, &registry).await?;
        info!("Tags: {}", tag_summary);

        let registry = self.refresh_tag_registry(Some(registry)).await?;
        let tagset_summary = self.copy_tagsets(&tags, &registry).await?;
        info!("Tagsets: {}", tagset_summary);

        let image_summary = if self.options.images {
            let summary = self.copy_images().await?;
            info!("Images: {}", summary);
            Some(summary)
        } else {
            None
        };

        Ok(SessionSummary {
            tags: tag_summary,
            tagsets: tagset_summary,
            images: image_summary,
        })
    }
}
