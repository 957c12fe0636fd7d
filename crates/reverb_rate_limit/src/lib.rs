//! Quota enforcement for the Reverb engagement toolkit.
//!
//! Three layers keep generation traffic inside provider quotas:
//!
//! - [`RateLimiter`]: per-key sliding-window throttle that waits for capacity
//! - [`ApiCallTracker`]: durable call ledger checked against [`QuotaTable`]s
//! - [`ApiKeyPool`]: round-robin credentials with cooldown after quota failures
//!
//! [`with_key_rotation`] ties the pool to an operation, rotating past
//! exhausted keys and returning other failures immediately.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod error;
mod limiter;
mod pool;
mod quota;
mod rotation;
mod tracker;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{LimiterConfig, PoolConfig};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use limiter::RateLimiter;
pub use pool::ApiKeyPool;
pub use quota::{KeyedBy, QuotaLimits, QuotaTable, ServiceQuota};
pub use rotation::{DEFAULT_MAX_ATTEMPTS, KeyRotationError, QuotaSignal, with_key_rotation};
pub use tracker::{ApiCallTracker, CallKey, CallRecord, Decision, QuotaInfo, RESPONSE_EXCERPT_CHARS};
