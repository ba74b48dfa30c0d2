//! Access to one server's objects.
//!
//! Stands in for the remote query and update services: list objects of a
//! type, fetch one by reference, save (insert or update) and walk annotation
//! links.

mod in_memory;
mod json_file;

pub use in_memory::{InMemoryStore, StoreSnapshot};
pub use json_file::JsonFileStore;

use crate::error::Result;
use crate::model::{AnnotationAnnotationLink, ModelObject, ObjectKind, ObjectRef};
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name used in log spans.
    fn label(&self) -> &str;

    /// Every object of `kind`, ordered by id.
    async fn list(&self, kind: ObjectKind) -> Result<Vec<ModelObject>>;

    async fn get(&self, target: ObjectRef) -> Result<ModelObject>;

    /// Insert when the object has no id, update otherwise. Returns the
    /// persisted object with its id and details filled in.
    async fn save(&self, object: ModelObject) -> Result<ModelObject>;

    /// Parents of `child` through annotation links, in link order.
    async fn parents_of(&self, child: ObjectRef) -> Result<Vec<ObjectRef>> {
        let links = self.list(ObjectKind::AnnotationAnnotationLink).await?;
        Ok(links
            .into_iter()
            .filter_map(|obj| AnnotationAnnotationLink::try_from(obj).ok())
            .filter(|link| link.child == Some(child))
            .filter_map(|link| link.parent)
            .collect())
    }

    async fn is_linked(&self, parent: ObjectRef, child: ObjectRef) -> Result<bool> {
        Ok(self.parents_of(child).await?.contains(&parent))
    }
}

/// Objects that must already exist for `object` to be saved.
pub(crate) fn references(object: &ModelObject) -> Vec<ObjectRef> {
    let refs = match object {
        ModelObject::Pixels(pixels) => vec![pixels.image],
        ModelObject::Channel(channel) => vec![channel.pixels, channel.logical_channel],
        ModelObject::AnnotationAnnotationLink(link) => vec![link.parent, link.child],
        ModelObject::Image(_) | ModelObject::LogicalChannel(_) | ModelObject::TagAnnotation(_) => {
            Vec::new()
        }
    };
    refs.into_iter().flatten().collect()
}
