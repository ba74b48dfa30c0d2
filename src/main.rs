use anyhow::Context;
use clap::Parser;
use omero_copy::config::ConnectionConfig;
use omero_copy::logging;
use omero_copy::migrate::{CopyOptions, Migrator};
use omero_copy::store::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Copy tags and tagsets between OMERO servers.
///
/// Each connection file is TOML naming the server (`omero.host`,
/// `omero.user`, optional `omero.group`) and the snapshot file that holds its
/// objects (`store.path`).
#[derive(Parser)]
#[command(name = "omero_copy")]
#[command(about = "Copy tags, tagsets and image metadata between OMERO servers")]
#[command(version = "0.1.0")]
struct Cli {
    /// Connection config for the source
    source: PathBuf,

    /// Connection config for the destination
    destination: PathBuf,

    /// Debug logging
    #[arg(short = 'd')]
    debug: bool,

    /// Dry-run, show what would be done
    #[arg(short = 'n')]
    dry_run: bool,

    /// Abort on the first failing item
    #[arg(short = 'a', long)]
    abort: bool,

    /// Also copy image metadata (pixels, channels)
    #[arg(long)]
    images: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    debug!(
        "config 1:{} 2:{}{}{}{}",
        cli.source.display(),
        cli.destination.display(),
        if cli.dry_run { " (dryrun)" } else { "" },
        if cli.debug { " (debug)" } else { "" },
        if cli.abort { " (abort exceptions)" } else { "" }
    );

    let source_config = ConnectionConfig::load(&cli.source)
        .with_context(|| format!("loading source config {}", cli.source.display()))?;
    let destination_config = ConnectionConfig::load(&cli.destination)
        .with_context(|| format!("loading destination config {}", cli.destination.display()))?;

    let source: Arc<dyn ObjectStore> = Arc::new(source_config.open_store()?);
    let destination: Arc<dyn ObjectStore> = Arc::new(destination_config.open_store()?);
    info!(
        "Copying from {} (group {}) to {} (group {})",
        source.label(),
        source_config.omero.group,
        destination.label(),
        destination_config.omero.group
    );

    let options = CopyOptions {
        dry_run: cli.dry_run,
        abort_on_error: cli.abort,
        images: cli.images,
    };
    let migrator = Migrator::new(source, destination, options);

    match migrator.run().await {
        Ok(summary) => {
            println!("Tags:    {}", summary.tags);
            println!("Tagsets: {}", summary.tagsets);
            if let Some(images) = &summary.images {
                println!("Images:  {}", images);
            }
            Ok(())
        }
        Err(e) => {
            error!("Copy run aborted: {}", e);
            Err(e.into())
        }
    }
}
