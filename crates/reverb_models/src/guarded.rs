//! Generation behind the key pool, rate limiter and call tracker.

use crate::{ContentGenerator, GenerationConfig, GenerationRequest};
use reverb_core::Credential;
use reverb_error::{GenerationError, GenerationErrorKind};
use reverb_rate_limit::{
    ApiCallTracker, ApiKeyPool, CallKey, Decision, KeyRotationError, RateLimiter,
    with_key_rotation,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Wraps a [`ContentGenerator`] with every quota safeguard.
///
/// Each attempt draws a key from the pool, waits on the limiter, asks the
/// tracker for permission, calls the generator and records the outcome.
/// Quota failures, including tracker denials, cool the key down and rotate to
/// the next one. A model with no quota entry, like anything else, is returned
/// immediately.
pub struct GuardedGenerator {
    generator: Arc<dyn ContentGenerator>,
    pool: Arc<ApiKeyPool>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<ApiCallTracker>,
    config: GenerationConfig,
}

impl std::fmt::Debug for GuardedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedGenerator")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GuardedGenerator {
    /// Assembles a guarded generator from shared components.
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        pool: Arc<ApiKeyPool>,
        limiter: Arc<RateLimiter>,
        tracker: Arc<ApiCallTracker>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            pool,
            limiter,
            tracker,
            config,
        }
    }

    /// Generation settings.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Shared key pool.
    pub fn pool(&self) -> &Arc<ApiKeyPool> {
        &self.pool
    }

    /// Shared call tracker.
    pub fn tracker(&self) -> &Arc<ApiCallTracker> {
        &self.tracker
    }

    /// Tracker tuple for calls with `model` under `credential`.
    pub fn call_key(&self, model: &str, credential: Option<&Credential>) -> CallKey {
        let key = CallKey::new(self.config.service().as_str(), self.config.method().as_str())
            .with_model(model);
        match credential {
            Some(credential) => key.with_key_suffix(credential.suffix()),
            None => key,
        }
    }

    /// Generates text for `request`, rotating keys on quota failures.
    ///
    /// # Errors
    ///
    /// - `NoApiKey` when the pool is empty
    /// - `UnknownModel` when the tracker has no quota entry for the call
    /// - the last quota error once the attempt budget is spent
    /// - any non-quota error from the generator, unretried
    #[instrument(skip(self, request), fields(generator = %self.generator.name()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let model = request
            .model()
            .clone()
            .unwrap_or_else(|| self.config.model().clone());

        with_key_rotation(&self.pool, *self.config.max_attempts(), |key| {
            self.attempt(key, &model, request)
        })
        .await
        .map_err(|e| match e {
            KeyRotationError::NoKeyAvailable => GenerationError::new(GenerationErrorKind::NoApiKey),
            KeyRotationError::Exhausted { last, .. } => last,
            KeyRotationError::Rejected(e) => e,
        })
    }

    async fn attempt(
        &self,
        key: Credential,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        self.limiter.wait_if_needed(key.expose()).await;

        let call = self.call_key(model, Some(&key));
        match self.tracker.can_make_call(&call) {
            Decision::Allowed => {}
            Decision::Denied(reason) => {
                let quota = self.tracker.get_quota_info(&call).ok();
                warn!(key = %key.suffix(), reason = %reason, quota = ?quota, "API call blocked");
                return Err(GenerationError::new(GenerationErrorKind::QuotaDenied(reason)));
            }
            Decision::Unknown(reason) => {
                warn!(model, reason = %reason, "No quota entry for call");
                return Err(GenerationError::new(GenerationErrorKind::UnknownModel(reason)));
            }
        }

        debug!(key = %key.suffix(), model, "Calling generator");
        let result = self.generator.generate(&key, model, request).await;

        let (success, excerpt) = match &result {
            Ok(text) => (true, text.clone()),
            Err(e) => (false, e.kind.to_string()),
        };
        if let Err(e) = self.tracker.record_call(&call, success, Some(&excerpt)).await {
            warn!(error = %e, "Failed to persist call record");
        }
        result
    }
}
