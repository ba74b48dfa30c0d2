use super::{CopySummary, ItemOutcome, Migrator};
use crate::copier::{copy_fields, FieldFilter};
use crate::error::{MigrateError, Result};
use crate::model::{Channel, Image, LogicalChannel, ModelObject, ObjectKind, ObjectRef, Pixels};
use crate::provenance::{append_marker, SourceIdentity};
use crate::registry::{refresh_registry, ObjectRegistry};
use crate::store::ObjectStore;
use tracing::{debug, error, info, instrument};

/// Detector settings belong to the source instrument graph.
pub const LOGICAL_CHANNEL_EXCLUDES: [&str; 1] = ["DetectorSettings"];

/// References are re-pointed at the destination copies after the field copy.
pub const CHANNEL_EXCLUDES: [&str; 3] = ["AnnotationLinksCountPerOwner", "LogicalChannel", "Pixels"];

pub const PIXELS_EXCLUDES: [&str; 1] = ["Image"];

pub const IMAGE_EXCLUDES: [&str; 1] = ["PrimaryPixels"];

impl Migrator {
    /// Copy and save a logical channel on the destination.
    pub async fn copy_logical_channel(&self, src: &LogicalChannel) -> Result<ModelObject> {
        let mut dst = LogicalChannel::default();
        copy_fields(src, &mut dst, &FieldFilter::all().excluding(LOGICAL_CHANNEL_EXCLUDES));
        self.destination.save(dst.into()).await
    }

    /// Copy and save a channel under `pixels`, together with its logical channel.
    pub async fn copy_channel(&self, src: &Channel, pixels: ObjectRef) -> Result<ModelObject> {
        let mut dst = Channel::default();
        copy_fields(src, &mut dst, &FieldFilter::all().excluding(CHANNEL_EXCLUDES));
        if let Some(lc_ref) = src.logical_channel {
            let lc = LogicalChannel::try_from(self.source.get(lc_ref).await?)?;
            let new_lc = self.copy_logical_channel(&lc).await?;
            dst.logical_channel = new_lc.object_ref();
        }
        dst.pixels = Some(pixels);
        self.destination.save(dst.into()).await
    }

    /// Copy and save pixel metadata under `image`. Plane data is not transferred.
    pub async fn copy_pixels(&self, src: &Pixels, image: ObjectRef) -> Result<ModelObject> {
        let mut dst = Pixels::default();
        copy_fields(src, &mut dst, &FieldFilter::all().excluding(PIXELS_EXCLUDES));
        dst.image = Some(image);
        self.destination.save(dst.into()).await
    }

    /// Copy an image with its primary pixels and their channels.
    ///
    /// Steps are persisted one by one; a failure part way leaves the
    /// earlier objects on the destination. The provenance marker is written
    /// last, so an image that failed part way is not registered and gets
    /// copied again on the next run.
    pub async fn copy_image(&self, src: &Image) -> Result<ModelObject> {
        let source_ref = image_ref(src)?;
        let identity = SourceIdentity::new(source_ref.kind, source_ref.id);

        let mut dst = Image::default();
        copy_fields(src, &mut dst, &FieldFilter::all().excluding(IMAGE_EXCLUDES));
        let saved = self.destination.save(dst.into()).await?;
        let new_image = saved
            .object_ref()
            .ok_or_else(|| MigrateError::store("saved image has no id"))?;

        if let Some(pixels_ref) = src.primary_pixels {
            let pixels = Pixels::try_from(self.source.get(pixels_ref).await?)?;
            let new_pixels = self.copy_pixels(&pixels, new_image).await?;
            let new_pixels = new_pixels
                .object_ref()
                .ok_or_else(|| MigrateError::store("saved pixels have no id"))?;

            let channels = self.source.list(ObjectKind::Channel).await?;
            for channel in channels {
                let channel = Channel::try_from(channel)?;
                if channel.pixels != Some(pixels_ref) {
                    continue;
                }
                self.copy_channel(&channel, new_pixels).await?;
            }
        }

        // Re-read: saving pixels updated the stored image's primary pixels.
        let mut image = Image::try_from(self.destination.get(new_image).await?)?;
        image.description = Some(append_marker(src.description.as_deref(), &identity));
        self.destination.save(image.into()).await
    }

    /// Copy every source image not yet present on the destination.
    #[instrument(skip(self))]
    pub async fn copy_images(&self) -> Result<CopySummary> {
        let images = self
            .source
            .list(ObjectKind::Image)
            .await?
            .into_iter()
            .map(Image::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let registry =
            refresh_registry(self.destination.as_ref(), ObjectKind::Image, None).await?;

        let mut summary = CopySummary::default();
        for image in &images {
            summary.examined += 1;
            match self.copy_image_once(image, &registry).await {
                Ok(outcome) => summary.record(ObjectKind::Image, outcome),
                Err(e) => {
                    error!(
                        "Failed to copy image [{}] {:?}: {}",
                        image.header.id.unwrap_or_default(),
                        image.name,
                        e
                    );
                    summary.fail(ObjectKind::Image, &self.options, e)?;
                }
            }
        }
        Ok(summary)
    }

    async fn copy_image_once(&self, image: &Image, registry: &ObjectRegistry) -> Result<ItemOutcome> {
        let source = image_ref(image)?;
        debug!("Creating image: id:{} name:{:?}", source.id, image.name);
        if registry.contains(&SourceIdentity::new(source.kind, source.id)) {
            debug!("\tAlready in map");
            return Ok(ItemOutcome::Skipped);
        }
        if self.options.dry_run {
            info!("Would create image for [{}] name:{:?}", source.id, image.name);
            return Ok(ItemOutcome::Planned);
        }
        let saved = self.copy_image(image).await?;
        info!(
            "Created image: id:{} name:{:?}",
            saved.id().unwrap_or_default(),
            image.name
        );
        Ok(ItemOutcome::Created)
    }
}

fn image_ref(image: &Image) -> Result<ObjectRef> {
    image
        .header
        .id
        .map(|id| ObjectRef::new(ObjectKind::Image, id))
        .ok_or_else(|| MigrateError::store("source image has no id"))
}
