//! Content-generation error types.

use crate::is_quota_error;

/// Generation failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The key pool has no credentials configured
    #[display("No API key available")]
    NoApiKey,
    /// The call tracker refused the call before it was attempted
    #[display("API call blocked: {}", _0)]
    QuotaDenied(String),
    /// The service, method or model has no quota entry, so no key can help
    #[display("No quota configured: {}", _0)]
    UnknownModel(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Request never produced a response
    #[display("Request failed: {}", _0)]
    Transport(String),
    /// Response body could not be decoded
    #[display("Response parsing failed: {}", _0)]
    ResponseParsing(String),
    /// The model answered without text (safety block, recitation, ...)
    #[display("Generation refused: {}", _0)]
    Refused(String),
    /// A media attachment could not be prepared
    #[display("Media error: {}", _0)]
    Media(String),
    /// Uploaded media was rejected by the service
    #[display("Media upload failed: {}", _0)]
    UploadFailed(String),
    /// Uploaded media never became usable
    #[display("Media {} did not become ACTIVE within {} seconds", name, secs)]
    UploadTimeout {
        /// Remote file name
        name: String,
        /// Seconds waited
        secs: u64,
    },
}

impl GenerationErrorKind {
    /// Returns true when the failure means the credential is exhausted, so
    /// rotating to another key may succeed.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            GenerationErrorKind::QuotaDenied(_) => true,
            GenerationErrorKind::Http { status_code, message } => {
                *status_code == 429 || is_quota_error(message)
            }
            GenerationErrorKind::Transport(msg) => is_quota_error(msg),
            _ => false,
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use reverb_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::Http {
///     status_code: 429,
///     message: "Resource has been exhausted".to_string(),
/// });
/// assert!(err.is_quota_exhausted());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// See [`GenerationErrorKind::is_quota_exhausted`].
    pub fn is_quota_exhausted(&self) -> bool {
        self.kind.is_quota_exhausted()
    }
}

impl From<GenerationErrorKind> for GenerationError {
    #[track_caller]
    fn from(kind: GenerationErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_is_not_quota() {
        let err = GenerationError::new(GenerationErrorKind::Refused(
            "Finish reason - SAFETY".to_string(),
        ));
        assert!(!err.is_quota_exhausted());
    }

    #[test]
    fn test_tracker_denial_is_quota() {
        let err = GenerationError::new(GenerationErrorKind::QuotaDenied(
            "Rate limit (RPM) exceeded".to_string(),
        ));
        assert!(err.is_quota_exhausted());
        assert!(err.to_string().contains("Rate limit (RPM) exceeded"));
    }

    #[test]
    fn test_unknown_model_is_not_quota() {
        let err = GenerationError::new(GenerationErrorKind::UnknownModel(
            "Unknown Gemini model: gemini-9-ultra".to_string(),
        ));
        assert!(!err.is_quota_exhausted());
        assert!(err.to_string().contains("Unknown Gemini model: gemini-9-ultra"));
    }

    #[test]
    fn test_server_error_is_not_quota() {
        let err = GenerationError::new(GenerationErrorKind::Http {
            status_code: 500,
            message: "internal".to_string(),
        });
        assert!(!err.is_quota_exhausted());
    }
}
