//! `[collect]` configuration section.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing and termination settings for a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct CollectConfig {
    /// Stop once this many unique items are collected
    target_count: usize,
    /// Stop after this many consecutive passes with nothing new
    max_stall_passes: u32,
    /// Force an extra scroll when nothing new arrived for this long
    stale_after_secs: u64,
    /// Pause between passes
    pass_delay_ms: u64,
    /// Pause after each scroll for content to render
    settle_delay_ms: u64,
    /// Scroll distance as a fraction of the viewport height
    scroll_fraction: f64,
    /// Blocking workers used for normalisation
    normalize_workers: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            target_count: 50,
            max_stall_passes: 5,
            stale_after_secs: 10,
            pass_delay_ms: 1000,
            settle_delay_ms: 500,
            scroll_fraction: 0.8,
            normalize_workers: 10,
        }
    }
}

impl CollectConfig {
    /// Pause between passes.
    pub fn pass_delay(&self) -> Duration {
        Duration::from_millis(self.pass_delay_ms)
    }

    /// Pause after each scroll.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Idle time that triggers a forced scroll.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
