//! Reply-posting error types.

/// Ways a posting attempt can fail.
///
/// Each kind corresponds to a distinct review status so an operator can see
/// exactly what happened to every entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PostErrorKind {
    /// The target post could not be located
    #[display("Target not found: {}", _0)]
    TargetNotFound(String),
    /// The compose dialog never appeared
    #[display("Dialog timed out: {}", _0)]
    DialogTimeout(String),
    /// A browser interaction (click, typing) failed
    #[display("Browser interaction failed: {}", _0)]
    BrowserInteraction(String),
    /// The platform API rejected the post
    #[display("API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
    /// Network failure before a response arrived
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Credentials for the platform are missing
    #[display("Missing credentials: {}", _0)]
    MissingCredentials(String),
}

/// Posting error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Post Error: {} at line {} in {}", kind, line, file)]
pub struct PostError {
    /// The kind of error that occurred
    pub kind: PostErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PostError {
    /// Create a new PostError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PostErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl From<PostErrorKind> for PostError {
    #[track_caller]
    fn from(kind: PostErrorKind) -> Self {
        Self::new(kind)
    }
}
