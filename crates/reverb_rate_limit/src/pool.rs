//! Round-robin credential pool with cooldown and a per-key rate gate.

use crate::PoolConfig;
use crate::limiter::prune;
use reverb_core::{Credential, NullSink, ProgressEvent, ProgressSink};
use reverb_error::is_quota_error;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

const MIN_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct PoolState {
    keys: Vec<Credential>,
    index: usize,
    usage: HashMap<Credential, VecDeque<Instant>>,
    cooldowns: HashMap<Credential, Instant>,
}

impl PoolState {
    fn replace_keys(&mut self, keys: Vec<Credential>) {
        self.usage = keys.iter().map(|k| (k.clone(), VecDeque::new())).collect();
        self.cooldowns.clear();
        self.index = 0;
        self.keys = keys;
    }
}

/// Hands out credentials in rotation.
///
/// Keys in cooldown are skipped, and each key is held to its own
/// calls-per-minute ceiling. When no key is usable, [`get_key`](Self::get_key)
/// sleeps until the earliest cooldown or window frees up.
///
/// All state sits behind one lock, which is never held across a sleep.
pub struct ApiKeyPool {
    rpm: usize,
    cooldown: Duration,
    state: Mutex<PoolState>,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ApiKeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyPool")
            .field("rpm", &self.rpm)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl ApiKeyPool {
    /// Creates a pool over `keys`.
    pub fn new(keys: Vec<Credential>, config: &PoolConfig) -> Self {
        if keys.is_empty() {
            warn!("No API keys provided, pool is empty");
        }
        let mut state = PoolState::default();
        state.replace_keys(keys);
        Self {
            rpm: (*config.rpm()).max(1) as usize,
            cooldown: Duration::from_secs(*config.cooldown_secs()),
            state: Mutex::new(state),
            sink: Arc::new(NullSink),
        }
    }

    /// Creates a pool from an explicit comma-separated list, or from the
    /// configured environment variable when `keys` is `None`.
    pub fn from_list_or_env(keys: Option<&str>, config: &PoolConfig) -> Self {
        Self::new(resolve_keys(keys, config.env_var()), config)
    }

    /// Publishes cooldowns to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Default cooldown after a quota failure.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns the next usable key, waiting if every key is cooling down or
    /// saturated. Returns `None` only when the pool is empty.
    #[instrument(skip(self))]
    pub async fn get_key(&self) -> Option<Credential> {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                if state.keys.is_empty() {
                    return None;
                }
                let now = Instant::now();
                let count = state.keys.len();
                let mut next_free: Option<Instant> = None;

                for _ in 0..count {
                    let key = state.keys[state.index].clone();
                    state.index = (state.index + 1) % count;

                    if let Some(until) = state.cooldowns.get(&key).copied() {
                        if until > now {
                            next_free = Some(next_free.map_or(until, |t| t.min(until)));
                            continue;
                        }
                        state.cooldowns.remove(&key);
                    }

                    let usage = state.usage.entry(key.clone()).or_default();
                    prune(usage, now);
                    if usage.len() < self.rpm {
                        usage.push_back(now);
                        debug!(key = %key.suffix(), "Key handed out");
                        return Some(key);
                    }
                    if let Some(oldest) = usage.front() {
                        let frees = *oldest + Duration::from_secs(60);
                        next_free = Some(next_free.map_or(frees, |t| t.min(frees)));
                    }
                }

                next_free
                    .map(|t| t.saturating_duration_since(now))
                    .unwrap_or(MIN_COOLDOWN)
            };

            debug!(wait_ms = wait.as_millis() as u64, "All keys busy, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes `key` out of rotation for `duration` (at least one second).
    #[instrument(skip(self, key), fields(key = %key.suffix()))]
    pub async fn mark_cooldown(&self, key: &Credential, duration: Duration) {
        let duration = duration.max(MIN_COOLDOWN);
        {
            let mut state = self.state.lock().await;
            state
                .cooldowns
                .insert(key.clone(), Instant::now() + duration);
        }
        info!(secs = duration.as_secs(), "Key put on cooldown");
        self.sink.emit(ProgressEvent::KeyCooldown {
            key_suffix: key.suffix().to_string(),
            secs: duration.as_secs(),
        });
    }

    /// Cools `key` down if `error` looks like quota exhaustion.
    ///
    /// Other errors leave the key alone. Returns whether a cooldown was
    /// applied.
    pub async fn report_failure(&self, key: &Credential, error: &str) -> bool {
        if is_quota_error(error) {
            self.mark_cooldown(key, self.cooldown).await;
            true
        } else {
            debug!(key = %key.suffix(), "Failure is not quota related, key stays in rotation");
            false
        }
    }

    /// Replaces the pool with a single forced key.
    #[instrument(skip(self, key), fields(key = %key.suffix()))]
    pub async fn set_explicit_key(&self, key: Credential) {
        self.state.lock().await.replace_keys(vec![key]);
        info!("Using explicit API key");
    }

    /// Reloads keys from a comma-separated list or the environment variable.
    pub async fn load_keys(&self, keys: Option<&str>, env_var: &str) {
        let keys = resolve_keys(keys, env_var);
        if keys.is_empty() {
            warn!(env_var, "No API keys provided or found in environment, pool is empty");
        }
        self.state.lock().await.replace_keys(keys);
    }

    /// Number of configured keys.
    pub async fn size(&self) -> usize {
        self.state.lock().await.keys.len()
    }

    /// Suffixes of configured keys, in rotation order.
    pub async fn suffixes(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .keys
            .iter()
            .map(|k| k.suffix().to_string())
            .collect()
    }

    /// True while `key` is cooling down.
    pub async fn is_cooling_down(&self, key: &Credential) -> bool {
        let state = self.state.lock().await;
        state
            .cooldowns
            .get(key)
            .is_some_and(|until| *until > Instant::now())
    }
}

fn resolve_keys(keys: Option<&str>, env_var: &str) -> Vec<Credential> {
    match keys {
        Some(list) if !list.trim().is_empty() => Credential::parse_list(list),
        _ => std::env::var(env_var)
            .map(|list| Credential::parse_list(&list))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> ApiKeyPool {
        ApiKeyPool::new(
            keys.iter().map(Credential::new).collect(),
            &PoolConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_pool_returns_none() {
        assert!(pool(&[]).get_key().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_has_a_floor() {
        let pool = pool(&["key-aaaa"]);
        let key = Credential::new("key-aaaa");
        pool.mark_cooldown(&key, Duration::ZERO).await;
        assert!(pool.is_cooling_down(&key).await);
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(!pool.is_cooling_down(&key).await);
    }

    #[tokio::test]
    async fn test_explicit_key_replaces_pool() {
        let pool = pool(&["key-aaaa", "key-bbbb"]);
        pool.set_explicit_key(Credential::new("forced-zzzz")).await;
        assert_eq!(pool.size().await, 1);
        assert_eq!(pool.get_key().await.unwrap().suffix(), "zzzz");
    }

    #[tokio::test]
    async fn test_explicit_list_wins_over_env() {
        let pool = pool(&[]);
        pool.load_keys(Some("one-1111,two-2222"), "REVERB_TEST_UNSET_VAR")
            .await;
        assert_eq!(pool.suffixes().await, vec!["1111", "2222"]);
    }
}
