//! Review entry persistence.

use crate::ReviewError;
use async_trait::async_trait;
use reverb_core::ReviewEntry;

/// Storage for review entries, addressed by `tweet_id`.
///
/// Stores assume a single writer; concurrent processes touching the same
/// store are unsupported.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Every entry, in stored order.
    async fn load_all(&self) -> Result<Vec<ReviewEntry>, ReviewError>;

    /// Appends entries after the existing ones.
    async fn append(&self, entries: &[ReviewEntry]) -> Result<(), ReviewError>;

    /// Replaces the first entry with the same id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no entry has that id.
    async fn update(&self, entry: &ReviewEntry) -> Result<(), ReviewError>;

    /// Removes the first entry with `id`. Returns whether one was removed.
    async fn delete(&self, id: &str) -> Result<bool, ReviewError>;
}
