//! Error types for review queue operations.

use reverb_core::ReviewStatus;
use reverb_error::{PostError, StorageError};

/// Error kinds for review queue operations.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum ReviewErrorKind {
    /// No entry has this id.
    #[display("Review entry not found: {_0}")]
    NotFound(String),
    /// The state machine forbids this move.
    #[display("Entry {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Entry id
        id: String,
        /// Current status
        from: ReviewStatus,
        /// Requested status
        to: ReviewStatus,
    },
    /// The entry is in a terminal state and can no longer be edited.
    #[display("Entry {id} is {status} and can no longer be edited")]
    Locked {
        /// Entry id
        id: String,
        /// Terminal status
        status: ReviewStatus,
    },
    /// The backing store failed.
    #[display("{_0}")]
    #[from]
    Storage(StorageError),
    /// Posting cannot continue at all (missing credentials, for example).
    #[display("{_0}")]
    #[from]
    Post(PostError),
}

/// Review error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Review Error: {} at line {} in {}", kind, line, file)]
pub struct ReviewError {
    kind: ReviewErrorKind,
    line: u32,
    file: &'static str,
}

impl ReviewError {
    /// Create a new review error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ReviewErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReviewErrorKind {
        &self.kind
    }
}

impl<T> From<T> for ReviewError
where
    T: Into<ReviewErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}
