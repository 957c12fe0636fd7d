//! Core data types for the Reverb engagement toolkit.
//!
//! This crate provides the foundation data types shared by the collection,
//! generation, review and posting crates, plus the logging and progress
//! event plumbing they report through.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credential;
mod events;
mod item;
pub mod observability;
mod review;

pub use credential::Credential;
pub use events::{ChannelSink, NullSink, ProgressEvent, ProgressSink, TracingSink};
pub use item::{
    CollectedItem, CollectedItemBuilder, CollectedItemBuilderError, EngagementMetrics, MediaRefs,
    Platform,
};
pub use review::{REVIEW_DATE_FORMAT, ReviewEntry, ReviewStatus};
