//! Configuration sections for the limiter and the key pool.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

fn default_rpm() -> u32 {
    60
}

fn default_cooldown_secs() -> u64 {
    70
}

fn default_env_var() -> String {
    "GEMINI_API".to_string()
}

/// `[limiter]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct LimiterConfig {
    /// Calls per key per trailing minute
    #[serde(default = "default_rpm")]
    rpm: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { rpm: default_rpm() }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PoolConfig {
    /// Calls per key per trailing minute, enforced inside the pool
    #[serde(default = "default_rpm")]
    rpm: u32,
    /// Cooldown applied after a quota failure
    #[serde(default = "default_cooldown_secs")]
    cooldown_secs: u64,
    /// Environment variable holding comma-separated keys
    #[serde(default = "default_env_var")]
    env_var: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rpm: default_rpm(),
            cooldown_secs: default_cooldown_secs(),
            env_var: default_env_var(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let pool: PoolConfig = serde_json::from_str(r#"{"rpm": 5}"#).unwrap();
        assert_eq!(*pool.rpm(), 5);
        assert_eq!(*pool.cooldown_secs(), 70);
        assert_eq!(pool.env_var(), "GEMINI_API");

        let limiter: LimiterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(limiter, LimiterConfig::default());
    }
}
