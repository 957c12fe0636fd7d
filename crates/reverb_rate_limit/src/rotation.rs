//! Retry a keyed operation across the pool.
//!
//! Quota-shaped failures rotate to another key after cooling the failed one
//! down. Any other failure comes straight back, since the same input would
//! fail again on a different key.

use crate::ApiKeyPool;
use reverb_core::Credential;
use reverb_error::{GenerationError, is_quota_error};
use std::future::Future;
use tracing::{debug, instrument, warn};

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Errors that can say whether they mean "this key is exhausted".
pub trait QuotaSignal: std::fmt::Display {
    /// True when rotating to another key may help.
    fn is_quota_exhausted(&self) -> bool {
        is_quota_error(&self.to_string())
    }
}

impl QuotaSignal for GenerationError {
    fn is_quota_exhausted(&self) -> bool {
        GenerationError::is_quota_exhausted(self)
    }
}

impl QuotaSignal for String {}

/// Why rotation gave up.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum KeyRotationError<E> {
    /// The pool has no keys
    #[display("No API key available")]
    NoKeyAvailable,
    /// Every attempt hit a quota failure; holds the last one
    #[display("Quota exhausted after {} attempts: {}", attempts, last)]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Last observed error
        #[error(source)]
        last: E,
    },
    /// A non-quota failure, returned without retrying
    #[display("{}", _0)]
    Rejected(#[error(source)] E),
}

impl<E> KeyRotationError<E> {
    /// The underlying operation error, if one was observed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            KeyRotationError::NoKeyAvailable => None,
            KeyRotationError::Exhausted { last, .. } => Some(last),
            KeyRotationError::Rejected(e) => Some(e),
        }
    }
}

/// Runs `operation` with keys drawn from `pool` until it succeeds, fails
/// for a non-quota reason, or `max_attempts` quota failures accumulate.
///
/// After a quota failure the key is cooled down, so the pool's rotation
/// hands out a different key next. A single-key pool stops after its first
/// quota failure.
///
/// # Example
///
/// ```no_run
/// use reverb_rate_limit::{ApiKeyPool, PoolConfig, with_key_rotation};
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = ApiKeyPool::from_list_or_env(Some("key-one,key-two"), &PoolConfig::default());
/// let reply = with_key_rotation(&pool, 6, |key| async move {
///     Ok::<_, String>(format!("called with {}", key.suffix()))
/// })
/// .await;
/// # }
/// ```
#[instrument(skip(pool, operation))]
pub async fn with_key_rotation<T, E, F, Fut>(
    pool: &ApiKeyPool,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, KeyRotationError<E>>
where
    E: QuotaSignal,
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        let Some(key) = pool.get_key().await else {
            warn!("Key pool is empty");
            return Err(KeyRotationError::NoKeyAvailable);
        };
        attempts += 1;
        debug!(attempt = attempts, key = %key.suffix(), "Attempting keyed operation");

        let error = match operation(key.clone()).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_quota_exhausted() {
            return Err(KeyRotationError::Rejected(error));
        }

        warn!(attempt = attempts, key = %key.suffix(), error = %error, "Quota failure, rotating key");
        pool.mark_cooldown(&key, pool.cooldown()).await;

        if attempts >= max_attempts || pool.size().await <= 1 {
            return Err(KeyRotationError::Exhausted {
                attempts,
                last: error,
            });
        }
    }
}
