//! Error types for collection operations.

/// Error kinds for collection operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CollectErrorKind {
    /// The browser driver failed a command.
    #[display("Browser driver error: {_0}")]
    Driver(String),
    /// A CSS selector did not parse.
    #[display("Invalid selector '{_0}'")]
    Selector(String),
    /// A container could not be normalised.
    #[display("Container parse error: {_0}")]
    Parse(String),
    /// A normalisation worker died.
    #[display("Worker failed: {_0}")]
    Worker(String),
}

/// Collection error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Collect Error: {} at line {} in {}", kind, line, file)]
pub struct CollectError {
    kind: CollectErrorKind,
    line: u32,
    file: &'static str,
}

impl CollectError {
    /// Create a new collection error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CollectErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CollectErrorKind {
        &self.kind
    }
}

impl<T> From<T> for CollectError
where
    T: Into<CollectErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}
