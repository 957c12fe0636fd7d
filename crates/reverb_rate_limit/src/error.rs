//! Error types for rate limiting operations.

/// Error kinds for rate limiting operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// Quota configuration is invalid.
    #[display("Configuration error: {_0}")]
    Config(String),
    /// No quota table exists for the service.
    #[display("Unknown service: {_0}")]
    UnknownService(String),
    /// The service has no quota entry for this model.
    #[display("Unknown {service} model: {model}")]
    UnknownModel {
        /// Service name
        service: String,
        /// Requested model
        model: String,
    },
    /// The service has no quota entry for this method.
    #[display("Unknown {service} method: {method}")]
    UnknownMethod {
        /// Service name
        service: String,
        /// Requested method
        method: String,
    },
    /// The call log could not be written.
    #[display("Call log persistence failed: {_0}")]
    Persistence(String),
}

/// Rate limiting error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    kind: RateLimitErrorKind,
    line: u32,
    file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limiting error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RateLimitErrorKind {
        &self.kind
    }
}

impl<T> From<T> for RateLimitError
where
    T: Into<RateLimitErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}
