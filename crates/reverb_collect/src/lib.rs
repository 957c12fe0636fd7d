//! Feed collection for the Reverb engagement toolkit.
//!
//! Infinite-scroll feeds are harvested by repeated passes: capture the
//! rendered containers, deduplicate them by id, scroll, repeat. Captured
//! markup is then normalised into [`reverb_core::CollectedItem`]s on a small
//! pool of blocking workers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod collector;
mod config;
mod driver;
mod error;
mod extract;
mod normalize;

pub use collector::{CollectionOutcome, CollectionRun, Collector, PassOutcome, StopReason};
pub use config::CollectConfig;
pub use driver::{BrowserDriver, Element};
pub use error::{CollectError, CollectErrorKind};
pub use extract::{
    AttributeExtractor, ContainerIdentity, IdExtractor, RawContainer, XStatusExtractor, status_id,
};
pub use normalize::{
    ContainerNormalizer, XNormalizer, apply_metrics_label, normalize_all, parse_count,
};
