//! Human review between generation and posting.
//!
//! Generated replies land in a [`ReviewQueue`] as `ready_for_approval`. A
//! reviewer approves, rejects or edits them, and [`post_approved`] later
//! publishes the approved ones through a [`ReplyPoster`], recording each
//! outcome on its entry.
//!
//! Entries live in a [`ReviewStore`]: a JSON file per profile
//! ([`JsonFileStore`]) or rows of a shared sheet ([`SheetReviewStore`]).
//!
//! The `reverb` binary always uses [`JsonFileStore`]. The sheet store is for
//! embedders that bring their own [`SheetBackend`] (a hosted spreadsheet
//! client, say) and hand the store to `EngageContext::use_review_store`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod json_store;
mod posting;
mod queue;
mod sheet;
mod store;

pub use error::{ReviewError, ReviewErrorKind};
pub use json_store::JsonFileStore;
pub use posting::{PostSummary, ReplyPoster, failure_status, post_approved};
pub use queue::ReviewQueue;
pub use sheet::{DEFAULT_COLUMNS, MemorySheet, SheetBackend, SheetReviewStore};
pub use store::ReviewStore;
