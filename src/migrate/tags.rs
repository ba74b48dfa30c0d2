use super::{CopySummary, ItemOutcome, Migrator};
use crate::error::{MigrateError, Result};
use crate::model::{AnnotationAnnotationLink, ModelError, ObjectKind, ObjectRef, TagAnnotation};
use crate::provenance::{append_marker, SourceIdentity};
use crate::registry::{refresh_registry, ObjectRegistry};
use crate::store::ObjectStore;
use tracing::{debug, error, info, instrument};

fn tag_ref(tag: &TagAnnotation) -> Result<ObjectRef> {
    tag.header
        .id
        .map(|id| ObjectRef::new(ObjectKind::TagAnnotation, id))
        .ok_or_else(|| MigrateError::store("source tag has no id"))
}

/// Destination counterpart of a source object, via the registry.
fn resolve(registry: &ObjectRegistry, source: ObjectRef) -> Result<ObjectRef> {
    let identity = SourceIdentity::new(source.kind, source.id);
    registry
        .get(&identity)
        .and_then(|obj| obj.object_ref())
        .ok_or(MigrateError::Unresolved { identity })
}

impl Migrator {
    /// All tags on the source server.
    #[instrument(skip(self))]
    pub async fn get_tags(&self) -> Result<Vec<TagAnnotation>> {
        let objects = self.source.list(ObjectKind::TagAnnotation).await?;
        let tags = objects
            .into_iter()
            .map(TagAnnotation::try_from)
            .collect::<std::result::Result<Vec<_>, ModelError>>()?;
        for tag in &tags {
            debug!(
                "Found tag id:{} value:{:?} ns:{:?} name:{:?} description:{:?}",
                tag.header.id.unwrap_or_default(),
                tag.value,
                tag.namespace,
                tag.name,
                tag.description
            );
        }
        Ok(tags)
    }

    /// Rebuild the registry of copied tags from the destination.
    pub async fn refresh_tag_registry(
        &self,
        existing: Option<ObjectRegistry>,
    ) -> Result<ObjectRegistry> {
        refresh_registry(self.destination.as_ref(), ObjectKind::TagAnnotation, existing).await
    }

    /// Create every tag not yet present on the destination.
    #[instrument(skip(self, tags, registry), fields(count = tags.len()))]
    pub async fn copy_tags(
        &self,
        tags: &[TagAnnotation],
        registry: &ObjectRegistry,
    ) -> Result<CopySummary> {
        let mut summary = CopySummary::default();
        for tag in tags {
            summary.examined += 1;
            match self.copy_tag(tag, registry).await {
                Ok(outcome) => summary.record(ObjectKind::TagAnnotation, outcome),
                Err(e) => {
                    error!(
                        "Failed to copy tag [{}] {:?}: {}",
                        tag.header.id.unwrap_or_default(),
                        tag.value,
                        e
                    );
                    summary.fail(ObjectKind::TagAnnotation, &self.options, e)?;
                }
            }
        }
        Ok(summary)
    }

    async fn copy_tag(&self, tag: &TagAnnotation, registry: &ObjectRegistry) -> Result<ItemOutcome> {
        let source = tag_ref(tag)?;
        debug!("Creating tag: id:{} value:{:?}", source.id, tag.value);

        let identity = SourceIdentity::new(source.kind, source.id);
        if registry.contains(&identity) {
            debug!("\tAlready in map");
            return Ok(ItemOutcome::Skipped);
        }
        if self.options.dry_run {
            info!("Would create tag for {} value:{:?}", identity, tag.value);
            return Ok(ItemOutcome::Planned);
        }

        let new_tag = TagAnnotation {
            value: tag.value.clone(),
            namespace: tag.namespace.clone(),
            description: Some(append_marker(tag.description.as_deref(), &identity)),
            ..Default::default()
        };
        let saved = self.destination.save(new_tag.into()).await?;
        let saved = TagAnnotation::try_from(saved)?;
        info!(
            "Created tag: id:{} value:{:?}",
            saved.header.id.unwrap_or_default(),
            saved.value
        );
        Ok(ItemOutcome::Created)
    }

    /// Recreate parent/child links between copied tags.
    #[instrument(skip(self, tags, registry), fields(count = tags.len()))]
    pub async fn copy_tagsets(
        &self,
        tags: &[TagAnnotation],
        registry: &ObjectRegistry,
    ) -> Result<CopySummary> {
        let mut summary = CopySummary::default();
        for tag in tags {
            let parents = match tag_ref(tag) {
                Ok(child) => self.source.parents_of(child).await.map(|p| (child, p)),
                Err(e) => Err(e),
            };
            let (child, parents) = match parents {
                Ok(found) => found,
                Err(e) => {
                    summary.examined += 1;
                    error!(
                        "Failed to find tagsets of tag [{}] {:?}: {}",
                        tag.header.id.unwrap_or_default(),
                        tag.value,
                        e
                    );
                    summary.fail(ObjectKind::AnnotationAnnotationLink, &self.options, e)?;
                    continue;
                }
            };

            for parent in parents {
                summary.examined += 1;
                match self.link_tag(child, parent, tag, registry).await {
                    Ok(outcome) => summary.record(ObjectKind::AnnotationAnnotationLink, outcome),
                    Err(e) => {
                        error!(
                            "Failed to add tag [{}] {:?} to tagset [{}]: {}",
                            child.id, tag.value, parent.id, e
                        );
                        summary.fail(ObjectKind::AnnotationAnnotationLink, &self.options, e)?;
                    }
                }
            }
        }
        Ok(summary)
    }

    async fn link_tag(
        &self,
        child: ObjectRef,
        parent: ObjectRef,
        tag: &TagAnnotation,
        registry: &ObjectRegistry,
    ) -> Result<ItemOutcome> {
        debug!(
            "Creating tagset id:{} value:{:?} parent:{} [{}]",
            child.id, tag.value, parent.kind, parent.id
        );
        if self.options.dry_run {
            return Ok(ItemOutcome::Planned);
        }

        let new_parent = resolve(registry, parent)?;
        let new_child = resolve(registry, child)?;
        if self.destination.is_linked(new_parent, new_child).await? {
            debug!("Already linked");
            return Ok(ItemOutcome::Skipped);
        }

        let link = AnnotationAnnotationLink::new(new_parent, new_child);
        let saved = self.destination.save(link.into()).await?;
        info!(
            "Created tagset link [{}]: parent:{} child:{}",
            saved.id().unwrap_or_default(),
            new_parent.id,
            new_child.id
        );
        Ok(ItemOutcome::Created)
    }
}
