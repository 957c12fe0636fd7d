//! Process-wide shared state.

use crate::ReverbConfig;
use reverb_core::{NullSink, ProgressSink};
use reverb_error::{ConfigError, ConfigErrorKind};
use reverb_models::{ContentGenerator, GuardedGenerator};
use reverb_rate_limit::{ApiCallTracker, ApiKeyPool, RateLimiter};
use reverb_review::{JsonFileStore, ReviewQueue, ReviewStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Registry of the components every operation shares.
///
/// One context owns one key pool, one limiter and one call tracker, so every
/// generator built from it draws on the same quota state. Review queues are
/// opened once per profile and reused.
pub struct EngageContext {
    config: Arc<ReverbConfig>,
    pool: Arc<ApiKeyPool>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<ApiCallTracker>,
    sink: Arc<dyn ProgressSink>,
    queues: Mutex<HashMap<String, ReviewQueue>>,
}

impl std::fmt::Debug for EngageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngageContext")
            .field("config", &self.config)
            .field("tracker", &self.tracker.log_file())
            .finish_non_exhaustive()
    }
}

impl EngageContext {
    /// Builds the shared components from `config`.
    ///
    /// Keys come from `keys` (comma separated) when given, otherwise from the
    /// environment variable named by `[pool] env_var`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the call log cannot be opened.
    pub fn new(config: ReverbConfig, keys: Option<&str>) -> Result<Self, ConfigError> {
        Self::with_sink(config, keys, Arc::new(NullSink))
    }

    /// [`new`](Self::new) publishing progress events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the call log cannot be opened.
    pub fn with_sink(
        config: ReverbConfig,
        keys: Option<&str>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, ConfigError> {
        let log_file = config.paths().call_log();
        let tracker = ApiCallTracker::open(&log_file, config.quotas().clone()).map_err(|e| {
            ConfigErrorKind::Path {
                path: log_file.display().to_string(),
                reason: e.kind().to_string(),
            }
        })?;
        let pool = ApiKeyPool::from_list_or_env(keys, config.pool()).with_sink(sink.clone());

        Ok(Self::from_parts(config, pool, tracker, sink))
    }

    /// Assembles a context from components built elsewhere.
    pub fn from_parts(
        config: ReverbConfig,
        pool: ApiKeyPool,
        tracker: ApiCallTracker,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let limiter = RateLimiter::new(*config.limiter().rpm());
        info!(
            rpm = *config.limiter().rpm(),
            log_file = %tracker.log_file().display(),
            "Engagement context ready"
        );
        Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            limiter: Arc::new(limiter),
            tracker: Arc::new(tracker),
            sink,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Arc<ReverbConfig> {
        &self.config
    }

    /// Shared key pool.
    pub fn pool(&self) -> &Arc<ApiKeyPool> {
        &self.pool
    }

    /// Shared per-key limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Shared call tracker.
    pub fn tracker(&self) -> &Arc<ApiCallTracker> {
        &self.tracker
    }

    /// Progress sink.
    pub fn sink(&self) -> &Arc<dyn ProgressSink> {
        &self.sink
    }

    /// Backs the review queue of `profile` with `store` instead of the
    /// profile's JSON file. Takes effect for every later
    /// [`review_queue`](Self::review_queue) call.
    pub fn use_review_store(&self, profile: &str, store: Arc<dyn ReviewStore>) {
        let queue = ReviewQueue::new(store).with_sink(self.sink.clone());
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.insert(profile.to_string(), queue);
        debug!(profile, "Review store replaced");
    }

    /// Review queue for replies posted as `profile`, opened on first use.
    pub fn review_queue(&self, profile: &str) -> ReviewQueue {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues
            .entry(profile.to_string())
            .or_insert_with(|| {
                let path = self.config.paths().replies_queue(profile);
                debug!(profile, path = %path.display(), "Opening review queue");
                ReviewQueue::new(Arc::new(JsonFileStore::new(path))).with_sink(self.sink.clone())
            })
            .clone()
    }

    /// Wraps `generator` with this context's pool, limiter and tracker.
    pub fn guarded(&self, generator: Arc<dyn ContentGenerator>) -> GuardedGenerator {
        GuardedGenerator::new(
            generator,
            self.pool.clone(),
            self.limiter.clone(),
            self.tracker.clone(),
            self.config.generation().clone(),
        )
    }
}
