//! Collected items in, review entries out.

use chrono::Local;
use derive_getters::Getters;
use futures::StreamExt;
use reverb_core::{
    CollectedItem, MediaRefs, NullSink, ProgressEvent, ProgressSink, ReviewEntry, ReviewStatus,
};
use reverb_error::GenerationErrorKind;
use reverb_models::{GenerationRequest, GuardedGenerator};
use reverb_review::{ReviewError, ReviewQueue};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Getters)]
pub struct PipelineSummary {
    /// Entries ready for a reviewer
    generated: usize,
    /// Entries whose generation failed
    failed: usize,
    /// Entries that found no API key
    no_api_key: usize,
    /// Items already in the queue
    skipped: usize,
}

/// Generates one reply per collected item and queues it for review.
///
/// Up to `workers` generations run at once. Entries are appended in the
/// order generations finish, each one persisted before the next is taken.
pub struct ReplyPipeline {
    generator: Arc<GuardedGenerator>,
    prompt: String,
    workers: usize,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ReplyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPipeline")
            .field("generator", &self.generator)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl ReplyPipeline {
    /// Creates a pipeline asking `generator` to follow `prompt`.
    ///
    /// Concurrency starts at the generator's configured worker count.
    pub fn new(generator: Arc<GuardedGenerator>, prompt: impl Into<String>) -> Self {
        let workers = *generator.config().workers();
        Self {
            generator,
            prompt: prompt.into(),
            workers: workers.max(1),
            sink: Arc::new(NullSink),
        }
    }

    /// Overrides the number of concurrent generations.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Publishes per-item progress to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The generation request for `item`.
    ///
    /// Image references that name existing local files are attached; remote
    /// URLs and videos are left to the prompt text.
    pub fn request_for(&self, item: &CollectedItem) -> GenerationRequest {
        let prompt = format!("{}\n\nPost:\n{}", self.prompt.trim_end(), item.text());
        let mut request = GenerationRequest::new(prompt);
        if let MediaRefs::Images(refs) = item.media() {
            for path in refs.iter().map(Path::new).filter(|p| p.is_file()) {
                request = request.with_media_path(path);
            }
        }
        request
    }

    /// Generates the review entry for one item. Never fails: generation
    /// errors become failure statuses with an `Error: ...` reply.
    #[instrument(skip(self, item), fields(item = %item.id()))]
    pub async fn reply_to(
        &self,
        item: &CollectedItem,
        profile: &str,
        run_number: Option<u32>,
    ) -> ReviewEntry {
        self.sink.emit(ProgressEvent::GenerationStarted {
            item_id: item.id().clone(),
        });

        let (reply, status) = match self.generator.generate(&self.request_for(item)).await {
            Ok(text) => (text, ReviewStatus::ReadyForApproval),
            Err(e) if matches!(e.kind, GenerationErrorKind::NoApiKey) => {
                warn!("No API key available for reply");
                (format!("Error: {}", e.kind), ReviewStatus::NoApiKey)
            }
            Err(e) => {
                warn!(error = %e, "Reply generation failed");
                (format!("Error: {}", e.kind), ReviewStatus::AnalysisFailed)
            }
        };

        self.sink.emit(ProgressEvent::GenerationFinished {
            item_id: item.id().clone(),
            status: status.to_string(),
        });

        let mut entry = ReviewEntry::new(
            item.id(),
            item.url(),
            item.text(),
            reply,
            status,
            profile,
        )
        .with_scraped_date(Local::now().naive_local());
        if let Some(run) = run_number {
            entry = entry.with_run_number(run);
        }
        let media = item.media().to_legacy_string();
        if !media.is_empty() {
            entry = entry.with_extra("media", serde_json::Value::String(media));
        }
        entry
    }

    /// Replies to every item not already in `queue` and appends the results.
    ///
    /// # Errors
    ///
    /// Stops at the first storage failure. Entries appended before it stay
    /// in the queue; in-flight generations are dropped.
    #[instrument(skip(self, queue, items), fields(items = items.len(), workers = self.workers))]
    pub async fn run(
        &self,
        queue: &ReviewQueue,
        profile: &str,
        items: &[CollectedItem],
        run_number: Option<u32>,
    ) -> Result<PipelineSummary, ReviewError> {
        let queued: HashSet<String> = queue
            .list(None)
            .await?
            .into_iter()
            .map(|entry| entry.tweet_id().clone())
            .collect();

        let mut summary = PipelineSummary::default();
        let mut seen = HashSet::new();
        let pending: Vec<&CollectedItem> = items
            .iter()
            .filter(|item| {
                let fresh = !queued.contains(item.id()) && seen.insert(item.id().clone());
                if !fresh {
                    debug!(item = %item.id(), "Already queued, skipping");
                    summary.skipped += 1;
                }
                fresh
            })
            .collect();

        let mut replies = futures::stream::iter(pending)
            .map(|item| self.reply_to(item, profile, run_number))
            .buffer_unordered(self.workers);

        while let Some(entry) = replies.next().await {
            match entry.status() {
                ReviewStatus::ReadyForApproval => summary.generated += 1,
                ReviewStatus::NoApiKey => summary.no_api_key += 1,
                _ => summary.failed += 1,
            }
            queue.append(std::slice::from_ref(&entry)).await?;
        }

        info!(
            generated = summary.generated,
            failed = summary.failed,
            no_api_key = summary.no_api_key,
            skipped = summary.skipped,
            "Reply pipeline finished"
        );
        Ok(summary)
    }
}
