//! Per-key sliding-window throttle.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window requests-per-minute throttle, keyed by credential.
///
/// Each key keeps the timestamps of its calls in the trailing minute. A call
/// that would exceed the ceiling waits until the oldest timestamp leaves the
/// window. Waiting never fails.
///
/// # Design
///
/// - **One lock**: a single mutex guards every key's timestamp list
/// - **Sleep outside the lock**: other keys keep flowing while one waits
/// - **Re-check after waking**: racing callers cannot overshoot the ceiling
///
/// # Example
///
/// ```no_run
/// use reverb_rate_limit::RateLimiter;
///
/// # #[tokio::main]
/// # async fn main() {
/// let limiter = RateLimiter::new(15);
/// limiter.wait_if_needed("key-a").await;
/// // ... make the call ...
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    rpm: usize,
    calls: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `rpm` calls per key per minute (at least 1).
    pub fn new(rpm: u32) -> Self {
        let rpm = rpm.max(1) as usize;
        debug!(rpm, "Creating RateLimiter");
        Self {
            rpm,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Configured ceiling.
    pub fn rpm(&self) -> usize {
        self.rpm
    }

    /// Waits until one more call under `key` fits in the window, then
    /// records it.
    #[instrument(skip(self, key), fields(rpm = self.rpm))]
    pub async fn wait_if_needed(&self, key: &str) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();
                let recent = calls.entry(key.to_string()).or_default();
                prune(recent, now);

                if recent.len() < self.rpm {
                    recent.push_back(now);
                    trace!(in_window = recent.len(), "Call admitted");
                    return;
                }

                match recent.front() {
                    Some(oldest) => (*oldest + WINDOW).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Calls recorded for `key` in the trailing minute.
    pub async fn calls_in_window(&self, key: &str) -> usize {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();
        match calls.get_mut(key) {
            Some(recent) => {
                prune(recent, now);
                recent.len()
            }
            None => 0,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60)
    }
}

pub(crate) fn prune(recent: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = recent.front() {
        if now.duration_since(*oldest) >= WINDOW {
            recent.pop_front();
        } else {
            break;
        }
    }
}
