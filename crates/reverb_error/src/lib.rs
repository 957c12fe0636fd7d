//! Error types for the Reverb engagement toolkit.
//!
//! One error type per concern, each a kind enum wrapped in a struct that
//! records the file and line where it was created. Crates return the type
//! for their own concern; the binary reports them through `anyhow`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod generation;
mod post;
mod quota;
mod storage;

pub use config::{ConfigError, ConfigErrorKind};
pub use generation::{GenerationError, GenerationErrorKind};
pub use post::{PostError, PostErrorKind};
pub use quota::is_quota_error;
pub use storage::{StorageError, StorageErrorKind};
