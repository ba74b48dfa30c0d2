//! Cross-server object registry.
//!
//! Maps the identity of a source object to its copy on the destination,
//! recovered by scanning destination descriptions for provenance markers.
//! Derived state only: rebuild it whenever the destination may have changed.

use crate::error::Result;
use crate::metrics::{self, MetricName};
use crate::model::{ModelObject, ObjectKind};
use crate::provenance::{find_marker, SourceIdentity};
use crate::store::ObjectStore;
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    entries: HashMap<SourceIdentity, ModelObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every object whose description carries a marker of its own
    /// type. Returns how many identities were not registered before.
    pub fn extend_from<I>(&mut self, objects: I) -> usize
    where
        I: IntoIterator<Item = ModelObject>,
    {
        let mut added = 0usize;
        for object in objects {
            let kind = object.kind();
            let marker = object
                .description()
                .and_then(|description| find_marker(description, kind));
            match marker {
                Some(identity) => {
                    debug!(
                        "Added [{}] as {}",
                        object.id().unwrap_or_default(),
                        identity
                    );
                    if self.entries.insert(identity, object).is_none() {
                        added += 1;
                    }
                }
                None => {
                    debug!("Ignoring {} [{}]", kind, object.id().unwrap_or_default());
                }
            }
        }
        metrics::increment(MetricName::RegistryEntries, added as u64);
        added
    }

    pub fn get(&self, identity: &SourceIdentity) -> Option<&ModelObject> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &SourceIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceIdentity, &ModelObject)> {
        self.entries.iter()
    }
}

/// Build a registry from `objects`, extending `existing` when given.
pub fn build_registry<I>(objects: I, existing: Option<ObjectRegistry>) -> ObjectRegistry
where
    I: IntoIterator<Item = ModelObject>,
{
    let mut registry = existing.unwrap_or_default();
    registry.extend_from(objects);
    registry
}

/// Scan every object of `kind` on `store` into the registry.
#[instrument(skip(store, existing), fields(store = store.label()))]
pub async fn refresh_registry(
    store: &dyn ObjectStore,
    kind: ObjectKind,
    existing: Option<ObjectRegistry>,
) -> Result<ObjectRegistry> {
    let objects = store.list(kind).await?;
    let registry = build_registry(objects, existing);
    debug!("Registry holds {} entries", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, TagAnnotation};
    use crate::store::InMemoryStore;

    fn tag(id: i64, description: Option<&str>) -> ModelObject {
        let mut tag = TagAnnotation {
            description: description.map(str::to_string),
            ..Default::default()
        };
        tag.header.id = Some(id);
        tag.into()
    }

    #[test]
    fn test_only_marked_objects_are_registered() {
        let objects = vec![
            tag(1, Some("plain tag")),
            tag(2, Some("copied\n\n[remote-source:TagAnnotation:42]")),
            tag(3, Some("[remote-source:Image:42]")),
            tag(4, None),
        ];
        let registry = build_registry(objects, None);
        assert_eq!(registry.len(), 1);
        let found = registry
            .get(&SourceIdentity::new(ObjectKind::TagAnnotation, 42))
            .unwrap();
        assert_eq!(found.id(), Some(2));
    }

    #[test]
    fn test_objects_without_description_are_skipped() {
        let mut channel = Channel::default();
        channel.header.id = Some(9);
        let registry = build_registry(vec![channel.into()], None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_build_extends_existing_registry() {
        let first = build_registry(vec![tag(1, Some("[remote-source:TagAnnotation:10]"))], None);
        let merged = build_registry(
            vec![tag(2, Some("[remote-source:TagAnnotation:20]"))],
            Some(first),
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&SourceIdentity::new(ObjectKind::TagAnnotation, 10)));
        assert!(merged.contains(&SourceIdentity::new(ObjectKind::TagAnnotation, 20)));
    }

    #[tokio::test]
    async fn test_refresh_counts_only_new_identities() {
        let store = InMemoryStore::new("dest");
        let marked = TagAnnotation {
            description: Some("[remote-source:TagAnnotation:5]".to_string()),
            ..Default::default()
        };
        store.save(marked.into()).await.unwrap();

        let mut registry = ObjectRegistry::new();
        let objects = store.list(ObjectKind::TagAnnotation).await.unwrap();
        assert_eq!(registry.extend_from(objects.clone()), 1);
        assert_eq!(registry.extend_from(objects), 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_from_store() {
        let store = InMemoryStore::new("dest");
        let fresh = TagAnnotation {
            description: Some("[remote-source:TagAnnotation:5]".to_string()),
            ..Default::default()
        };
        let saved = store.save(fresh.into()).await.unwrap();
        store.save(TagAnnotation::default().into()).await.unwrap();

        let registry = refresh_registry(&store, ObjectKind::TagAnnotation, None)
            .await
            .unwrap();
        let found = registry
            .get(&SourceIdentity::new(ObjectKind::TagAnnotation, 5))
            .unwrap();
        assert_eq!(found.id(), saved.id());
    }
}
