//! Reply automation for social platforms.
//!
//! This crate ties the workspace together: layered configuration, a shared
//! [`EngageContext`] holding the key pool, rate limiter and call tracker, the
//! [`ReplyPipeline`] that turns collected posts into review entries, and the
//! `reverb` command-line interface.
//!
//! The member crates are re-exported under short names:
//!
//! | module | crate |
//! |---|---|
//! | [`types`] | `reverb_core` |
//! | [`error`] | `reverb_error` |
//! | [`rate_limit`] | `reverb_rate_limit` |
//! | [`collect`] | `reverb_collect` |
//! | [`models`] | `reverb_models` |
//! | [`review`] | `reverb_review` |
//! | [`social`] | `reverb_social` |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
mod config;
mod context;
mod pipeline;

pub use config::{
    DEFAULT_CONFIG, PathsConfig, ReplyConfig, ReverbConfig, check_profile,
    default_user_config_path,
};
pub use context::EngageContext;
pub use pipeline::{PipelineSummary, ReplyPipeline};

pub use reverb_collect as collect;
pub use reverb_core as types;
pub use reverb_error as error;
pub use reverb_models as models;
pub use reverb_rate_limit as rate_limit;
pub use reverb_review as review;
pub use reverb_social as social;
