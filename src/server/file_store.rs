//! Flat-file snapshot storage
//!
//! The whole dataset lives in one pretty-printed JSON file. Writes go to a
//! sibling temp file which is then renamed over the target, and are
//! serialised so concurrent writers resolve as last-write-wins.

use crate::error::{Error, Result};
use crate::roster::types::Snapshot;
use crate::sync::DataService;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// JSON file holding the four collections
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the data file, creating it (and its directory) with empty
    /// collections if it does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::try_exists(&path).await? {
            let initial = serde_json::to_string_pretty(&Snapshot::default())?;
            tokio::fs::write(&path, initial).await?;
            tracing::info!("Created initial data file at {}", path.display());
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file as raw JSON
    pub async fn read_value(&self) -> Result<serde_json::Value> {
        let data = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            Error::Storage(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Overwrite the file with `snapshot`
    pub async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let _guard = self.write_lock.lock().await;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Storage(format!(
                "Failed to rename {} -> {}: {}",
                tmp.display(),
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl DataService for FileStore {
    async fn fetch(&self) -> Result<Snapshot> {
        let value = self.read_value().await?;
        serde_json::from_value(value).map_err(|e| {
            Error::Storage(format!("Malformed data in {}: {}", self.path.display(), e))
        })
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_snapshot(snapshot).await
    }
}
