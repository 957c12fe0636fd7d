//! `[generation]` configuration section.

use derive_getters::Getters;
use derive_setters::Setters;
use reverb_rate_limit::DEFAULT_MAX_ATTEMPTS;
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_workers() -> usize {
    5
}

fn default_service() -> String {
    "gemini".to_string()
}

fn default_method() -> String {
    "generate".to_string()
}

/// Model selection and fan-out for guarded generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_", into)]
pub struct GenerationConfig {
    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    model: String,
    /// Attempts across keys before giving up
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    /// Concurrent generation tasks in the reply pipeline
    #[serde(default = "default_workers")]
    workers: usize,
    /// Service name calls are tracked under
    #[serde(default = "default_service")]
    service: String,
    /// Method name calls are tracked under
    #[serde(default = "default_method")]
    method: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_attempts: default_max_attempts(),
            workers: default_workers(),
            service: default_service(),
            method: default_method(),
        }
    }
}
