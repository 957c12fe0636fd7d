//! Reviewer operations over a [`ReviewStore`].

use crate::{ReviewError, ReviewErrorKind, ReviewStore};
use chrono::Local;
use reverb_core::{NullSink, ProgressEvent, ProgressSink, ReviewEntry, ReviewStatus};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The review queue for one profile.
///
/// Every status change goes through [`transition`](Self::transition), which
/// enforces the state machine and persists before returning.
#[derive(Clone)]
pub struct ReviewQueue {
    store: Arc<dyn ReviewStore>,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ReviewQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewQueue").finish_non_exhaustive()
    }
}

impl ReviewQueue {
    /// Creates a queue over `store`.
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self {
            store,
            sink: Arc::new(NullSink),
        }
    }

    /// Publishes status changes to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Entries in stored order, optionally only those with `status`.
    pub async fn list(&self, status: Option<ReviewStatus>) -> Result<Vec<ReviewEntry>, ReviewError> {
        let entries = self.store.load_all().await?;
        Ok(match status {
            Some(status) => entries
                .into_iter()
                .filter(|entry| *entry.status() == status)
                .collect(),
            None => entries,
        })
    }

    /// The entry with `id`.
    pub async fn get(&self, id: &str) -> Result<ReviewEntry, ReviewError> {
        self.store
            .load_all()
            .await?
            .into_iter()
            .find(|entry| entry.tweet_id() == id)
            .ok_or_else(|| ReviewErrorKind::NotFound(id.to_string()).into())
    }

    /// Adds new entries.
    pub async fn append(&self, entries: &[ReviewEntry]) -> Result<(), ReviewError> {
        self.store.append(entries).await
    }

    /// Moves entry `id` to `next` and persists it.
    ///
    /// Moving to `posted` stamps the posted date.
    ///
    /// # Errors
    ///
    /// Illegal moves (anything out of `posted` or `rejected`, for one) are
    /// refused with `InvalidTransition` and leave the entry untouched.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        id: &str,
        next: ReviewStatus,
    ) -> Result<ReviewEntry, ReviewError> {
        let mut entry = self.get(id).await?;
        let current = *entry.status();
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Ignoring invalid status transition");
            return Err(ReviewErrorKind::InvalidTransition {
                id: id.to_string(),
                from: current,
                to: next,
            }
            .into());
        }

        entry.set_status(next);
        if next == ReviewStatus::Posted {
            entry.set_posted_date(Local::now().naive_local());
        }
        self.store.update(&entry).await?;

        info!(from = %current, to = %next, "Entry status changed");
        self.sink.emit(ProgressEvent::EntryStatus {
            entry_id: id.to_string(),
            status: next.to_string(),
        });
        Ok(entry)
    }

    /// Approves an entry for posting.
    pub async fn approve(&self, id: &str) -> Result<ReviewEntry, ReviewError> {
        self.transition(id, ReviewStatus::Approved).await
    }

    /// Rejects an entry.
    pub async fn reject(&self, id: &str) -> Result<ReviewEntry, ReviewError> {
        self.transition(id, ReviewStatus::Rejected).await
    }

    /// Replaces the reply text of a non-terminal entry.
    #[instrument(skip(self, reply))]
    pub async fn edit(&self, id: &str, reply: &str) -> Result<ReviewEntry, ReviewError> {
        let mut entry = self.get(id).await?;
        if entry.status().is_terminal() {
            return Err(ReviewErrorKind::Locked {
                id: id.to_string(),
                status: *entry.status(),
            }
            .into());
        }
        entry.set_generated_reply(reply);
        self.store.update(&entry).await?;
        info!("Reply edited");
        Ok(entry)
    }

    /// Removes one entry. Returns whether it existed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool, ReviewError> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!("Entry deleted");
        }
        Ok(removed)
    }
}
