//! Review entries stored as a JSON array, one file per profile.

use crate::{ReviewError, ReviewErrorKind, ReviewStore};
use async_trait::async_trait;
use reverb_core::ReviewEntry;
use reverb_error::{StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// A JSON array file holding a profile's review entries.
///
/// A missing file is an empty queue. A file that does not decode is an
/// error rather than an empty queue, so reviewer decisions are never
/// silently overwritten.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Uses the file at `path`; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<ReviewEntry>, ReviewError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
            .into()
        })
    }

    async fn write(&self, entries: &[ReviewEntry]) -> Result<(), ReviewError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from)?;
        }
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::new(StorageErrorKind::Encode(e.to_string())))?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(StorageError::from)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(StorageError::from)?;
        debug!(entries = entries.len(), "Review file written");
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<ReviewEntry>, ReviewError> {
        self.read().await
    }

    #[instrument(skip(self, entries), fields(path = %self.path.display(), count = entries.len()))]
    async fn append(&self, entries: &[ReviewEntry]) -> Result<(), ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read().await?;
        all.extend_from_slice(entries);
        self.write(&all).await
    }

    #[instrument(skip(self, entry), fields(path = %self.path.display(), id = %entry.tweet_id()))]
    async fn update(&self, entry: &ReviewEntry) -> Result<(), ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read().await?;
        let slot = all
            .iter_mut()
            .find(|existing| existing.tweet_id() == entry.tweet_id())
            .ok_or_else(|| ReviewErrorKind::NotFound(entry.tweet_id().clone()))?;
        *slot = entry.clone();
        self.write(&all).await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn delete(&self, id: &str) -> Result<bool, ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read().await?;
        let Some(index) = all.iter().position(|entry| entry.tweet_id() == id) else {
            return Ok(false);
        };
        all.remove(index);
        self.write(&all).await?;
        Ok(true)
    }
}
