//! Publishing approved entries.

use crate::{ReviewError, ReviewQueue};
use async_trait::async_trait;
use derive_getters::Getters;
use reverb_core::{Platform, ReviewEntry, ReviewStatus};
use reverb_error::{PostError, PostErrorKind};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Publishes a reply to a platform.
#[async_trait]
pub trait ReplyPoster: Send + Sync {
    /// Platform this poster publishes to.
    fn platform(&self) -> Platform;

    /// Publishes `text` as a reply to the post `target_id`.
    async fn post_reply(&self, target_id: &str, text: &str) -> Result<(), PostError>;
}

/// Counts from one posting run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Getters)]
pub struct PostSummary {
    /// Approved entries attempted
    processed: usize,
    /// Entries published
    posted: usize,
    /// Entries that ended in a failure status
    failed: usize,
}

/// Review status recording a posting failure of `kind`.
///
/// A server error leaves it unknown whether the reply went out, so it is
/// recorded as a plain `post_failed` for a reviewer to check and re-approve.
pub fn failure_status(kind: &PostErrorKind) -> ReviewStatus {
    match kind {
        PostErrorKind::TargetNotFound(_) => ReviewStatus::TweetNotFound,
        PostErrorKind::DialogTimeout(_) => ReviewStatus::DialogTimeout,
        PostErrorKind::BrowserInteraction(_) => ReviewStatus::BrowserInteractionFailed,
        PostErrorKind::Api { status, .. } if *status >= 500 => ReviewStatus::PostFailed,
        PostErrorKind::Api { .. } => ReviewStatus::ApiPostFailed,
        PostErrorKind::Transport(_) | PostErrorKind::MissingCredentials(_) => {
            ReviewStatus::PostFailed
        }
    }
}

/// Posts `approved` entries in stored order, at most `limit` of them.
///
/// Each outcome is persisted before the next entry is attempted, so a crash
/// never causes a duplicate post on resume. Entries already `posted` are
/// never touched. Each entry is re-read just before posting, so an edit made
/// during the run is what gets published.
///
/// # Errors
///
/// Storage failures and missing credentials stop the run; individual
/// posting failures are recorded on their entries instead.
#[instrument(skip(queue, poster), fields(platform = %poster.platform()))]
pub async fn post_approved(
    queue: &ReviewQueue,
    poster: &dyn ReplyPoster,
    limit: Option<usize>,
) -> Result<PostSummary, ReviewError> {
    let approved = queue.list(Some(ReviewStatus::Approved)).await?;
    let mut summary = PostSummary::default();

    for entry in approved.iter().take(limit.unwrap_or(usize::MAX)) {
        let current = queue.get(entry.tweet_id()).await?;
        if *current.status() != ReviewStatus::Approved {
            debug!(id = %entry.tweet_id(), status = %current.status(), "No longer approved, skipping");
            continue;
        }
        summary.processed += 1;
        let outcome = post_one(poster, &current).await?;
        queue.transition(current.tweet_id(), outcome).await?;

        if outcome == ReviewStatus::Posted {
            summary.posted += 1;
        } else {
            summary.failed += 1;
        }
    }

    info!(
        processed = summary.processed,
        posted = summary.posted,
        failed = summary.failed,
        "Posting run finished"
    );
    Ok(summary)
}

async fn post_one(
    poster: &dyn ReplyPoster,
    entry: &ReviewEntry,
) -> Result<ReviewStatus, ReviewError> {
    if !entry.is_postable() {
        warn!(id = %entry.tweet_id(), "Entry is missing an id or reply");
        return Ok(ReviewStatus::InvalidEntry);
    }

    match poster
        .post_reply(entry.tweet_id(), entry.generated_reply())
        .await
    {
        Ok(()) => {
            info!(id = %entry.tweet_id(), "Reply posted");
            Ok(ReviewStatus::Posted)
        }
        Err(e) if matches!(e.kind, PostErrorKind::MissingCredentials(_)) => Err(e.into()),
        Err(e) => {
            warn!(id = %entry.tweet_id(), error = %e, "Posting failed");
            Ok(failure_status(&e.kind))
        }
    }
}
