use super::{references, ObjectStore};
use crate::error::{MigrateError, Result};
use crate::model::{ModelObject, ObjectKind, ObjectRef};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Serializable contents of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_id: i64,
    pub objects: Vec<ModelObject>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            next_id: 1,
            objects: Vec::new(),
        }
    }
}

struct StoreState {
    next_id: i64,
    objects: BTreeMap<ObjectRef, ModelObject>,
}

/// In-memory store for development and testing.
pub struct InMemoryStore {
    label: String,
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self::from_snapshot(label, StoreSnapshot::default())
    }

    /// Objects without an id in the snapshot are dropped.
    pub fn from_snapshot(label: impl Into<String>, snapshot: StoreSnapshot) -> Self {
        let objects: BTreeMap<ObjectRef, ModelObject> = snapshot
            .objects
            .into_iter()
            .filter_map(|obj| obj.object_ref().map(|r| (r, obj)))
            .collect();
        let highest = objects.keys().map(|r| r.id).max().unwrap_or(0);
        Self {
            label: label.into(),
            state: Mutex::new(StoreState {
                next_id: snapshot.next_id.max(highest.saturating_add(1)),
                objects,
            }),
        }
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.lock()?;
        Ok(StoreSnapshot {
            next_id: state.next_id,
            objects: state.objects.values().cloned().collect(),
        })
    }

    /// Number of persisted objects of `kind`.
    pub fn count(&self, kind: ObjectKind) -> Result<usize> {
        let state = self.lock()?;
        Ok(state.objects.keys().filter(|r| r.kind == kind).count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| MigrateError::store(format!("{}: store state poisoned", self.label)))
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self, kind: ObjectKind) -> Result<Vec<ModelObject>> {
        let state = self.lock()?;
        let objects: Vec<ModelObject> = state
            .objects
            .range(ObjectRef::new(kind, i64::MIN)..=ObjectRef::new(kind, i64::MAX))
            .map(|(_, obj)| obj.clone())
            .collect();
        debug!("Listed {} {} objects from {}", objects.len(), kind, self.label);
        Ok(objects)
    }

    async fn get(&self, target: ObjectRef) -> Result<ModelObject> {
        let state = self.lock()?;
        state
            .objects
            .get(&target)
            .cloned()
            .ok_or(MigrateError::NotFound {
                kind: target.kind,
                id: target.id,
            })
    }

    async fn save(&self, mut object: ModelObject) -> Result<ModelObject> {
        if !object.header().loaded {
            return Err(MigrateError::store(format!(
                "cannot save unloaded {}",
                object.kind()
            )));
        }

        let mut state = self.lock()?;
        for target in references(&object) {
            if !state.objects.contains_key(&target) {
                return Err(MigrateError::store(format!(
                    "{} references missing {}",
                    object.kind(),
                    target
                )));
            }
        }

        let kind = object.kind();
        let id = match object.id() {
            Some(id) => {
                if !state.objects.contains_key(&ObjectRef::new(kind, id)) {
                    return Err(MigrateError::NotFound { kind, id });
                }
                id
            }
            None => {
                let id = state.next_id;
                state.next_id = id.checked_add(1).ok_or_else(|| {
                    MigrateError::store(format!("{}: object id space exhausted", self.label))
                })?;
                object.header_mut().id = Some(id);
                id
            }
        };
        let details = &mut object.header_mut().details;
        if details.created_at.is_none() {
            details.created_at = Some(Utc::now());
        }

        // The server points an image at the first pixels attached to it.
        if let ModelObject::Pixels(pixels) = &object {
            if let Some(image_ref) = pixels.image {
                if let Some(ModelObject::Image(image)) = state.objects.get_mut(&image_ref) {
                    if image.primary_pixels.is_none() {
                        image.primary_pixels = Some(ObjectRef::new(ObjectKind::Pixels, id));
                    }
                }
            }
        }

        state.objects.insert(ObjectRef::new(kind, id), object.clone());
        debug!("Saved {} [{}] to {}", kind, id, self.label);
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationAnnotationLink, Image, Pixels, TagAnnotation};

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let store = InMemoryStore::new("test");
        let first = store.save(TagAnnotation::default().into()).await.unwrap();
        let second = store.save(Image::default().into()).await.unwrap();
        assert_eq!(first.id(), Some(1));
        assert_eq!(second.id(), Some(2));
        assert!(first.header().details.created_at.is_some());
        assert_eq!(store.count(ObjectKind::TagAnnotation).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_object() {
        let store = InMemoryStore::new("test");
        let mut tag = TagAnnotation::default();
        tag.header.id = Some(99);
        let err = store.save(tag.into()).await.unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { id: 99, .. }));
    }

    #[tokio::test]
    async fn test_link_to_missing_annotation_is_rejected() {
        let store = InMemoryStore::new("test");
        let parent = store.save(TagAnnotation::default().into()).await.unwrap();
        let link = AnnotationAnnotationLink::new(
            parent.object_ref().unwrap(),
            ObjectRef::new(ObjectKind::TagAnnotation, 50),
        );
        assert!(store.save(link.into()).await.is_err());
        assert_eq!(store.count(ObjectKind::AnnotationAnnotationLink).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_parents_of_follows_links() {
        let store = InMemoryStore::new("test");
        let parent = store.save(TagAnnotation::default().into()).await.unwrap();
        let child = store.save(TagAnnotation::default().into()).await.unwrap();
        let (parent, child) = (parent.object_ref().unwrap(), child.object_ref().unwrap());
        store
            .save(AnnotationAnnotationLink::new(parent, child).into())
            .await
            .unwrap();

        assert_eq!(store.parents_of(child).await.unwrap(), vec![parent]);
        assert!(store.is_linked(parent, child).await.unwrap());
        assert!(!store.is_linked(child, parent).await.unwrap());
    }

    #[tokio::test]
    async fn test_saving_pixels_sets_primary_pixels() {
        let store = InMemoryStore::new("test");
        let image = store.save(Image::default().into()).await.unwrap();
        let pixels = Pixels {
            image: image.object_ref(),
            ..Default::default()
        };
        let pixels = store.save(pixels.into()).await.unwrap();
        let image = Image::try_from(store.get(image.object_ref().unwrap()).await.unwrap()).unwrap();
        assert_eq!(image.primary_pixels, pixels.object_ref());
    }

    #[tokio::test]
    async fn test_snapshot_restores_id_sequence() {
        let store = InMemoryStore::new("test");
        store.save(TagAnnotation::default().into()).await.unwrap();
        store.save(TagAnnotation::default().into()).await.unwrap();
        let restored = InMemoryStore::from_snapshot("copy", store.snapshot().unwrap());
        let next = restored.save(TagAnnotation::default().into()).await.unwrap();
        assert_eq!(next.id(), Some(3));
        assert_eq!(restored.list(ObjectKind::TagAnnotation).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_with_max_id_loads_but_refuses_inserts() {
        let mut tag = TagAnnotation::default();
        tag.header.id = Some(i64::MAX);
        let snapshot = StoreSnapshot {
            next_id: 1,
            objects: vec![tag.into()],
        };
        let store = InMemoryStore::from_snapshot("full", snapshot);

        let target = ObjectRef::new(ObjectKind::TagAnnotation, i64::MAX);
        assert_eq!(store.get(target).await.unwrap().id(), Some(i64::MAX));
        let err = store.save(TagAnnotation::default().into()).await.unwrap_err();
        assert!(matches!(err, MigrateError::Store { .. }));
        assert_eq!(store.count(ObjectKind::TagAnnotation).unwrap(), 1);
    }
}
