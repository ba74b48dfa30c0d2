use super::{InMemoryStore, ObjectStore, StoreSnapshot};
use crate::error::Result;
use crate::model::{ModelObject, ObjectKind, ObjectRef};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store backed by a JSON snapshot file, rewritten after every save.
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(label: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<StoreSnapshot>(&content)?
        } else {
            StoreSnapshot::default()
        };
        info!(
            "Opened store {} with {} objects",
            path.display(),
            snapshot.objects.len()
        );
        Ok(Self {
            path,
            inner: InMemoryStore::from_snapshot(label, snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        self.inner.snapshot()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.inner.snapshot()?)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Flushed store to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for JsonFileStore {
    fn label(&self) -> &str {
        self.inner.label()
    }

    async fn list(&self, kind: ObjectKind) -> Result<Vec<ModelObject>> {
        self.inner.list(kind).await
    }

    async fn get(&self, target: ObjectRef) -> Result<ModelObject> {
        self.inner.get(target).await
    }

    async fn save(&self, object: ModelObject) -> Result<ModelObject> {
        let saved = self.inner.save(object).await?;
        self.flush()?;
        Ok(saved)
    }
}
