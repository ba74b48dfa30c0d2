use crate::error::{MigrateError, Result};
use crate::store::JsonFileStore;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One side of a copy: which server, and where its objects are read from
/// and written to.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub omero: ServerConfig,
    pub store: StoreConfig,
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub user: Option<String>,
    /// `-1` selects objects across all groups.
    #[serde(default = "all_groups")]
    pub group: i64,
}

fn all_groups() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Snapshot file; relative paths resolve against the config file's directory.
    pub path: PathBuf,
}

impl ConnectionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ConnectionConfig = toml::from_str(content)?;
        if config.omero.host.trim().is_empty() {
            return Err(MigrateError::Config("omero.host must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Label used in logs: `user@host`, or just the host.
    pub fn label(&self) -> String {
        match &self.omero.user {
            Some(user) => format!("{}@{}", user, self.omero.host),
            None => self.omero.host.clone(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            self.base_dir.join(&self.store.path)
        }
    }

    pub fn open_store(&self) -> Result<JsonFileStore> {
        JsonFileStore::open(self.label(), self.store_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_config() {
        let config = ConnectionConfig::parse(
            r#"
            [omero]
            host = "omero-a.example.org"
            user = "alice"

            [store]
            path = "omero-a.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.omero.group, -1);
        assert_eq!(config.label(), "alice@omero-a.example.org");
        assert_eq!(config.store_path(), PathBuf::from("omero-a.json"));
    }

    #[test]
    fn test_dotted_keys_are_accepted() {
        let config = ConnectionConfig::parse(
            r#"
            omero.host = "omero-b"
            omero.group = 3
            store.path = "/srv/omero-b.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.omero.group, 3);
        assert_eq!(config.label(), "omero-b");
        assert_eq!(config.store_path(), PathBuf::from("/srv/omero-b.json"));
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let err = ConnectionConfig::parse("[omero]\nhost = \"\"\n[store]\npath = \"x.json\"\n")
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_missing_store_is_a_toml_error() {
        let err = ConnectionConfig::parse("[omero]\nhost = \"a\"\n").unwrap_err();
        assert!(matches!(err, MigrateError::Toml(_)));
    }
}
