//! Configuration error types.

/// Ways configuration can be unusable.
///
/// Every kind is fatal for the invoking command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A configuration source could not be read or parsed
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// The merged settings do not fit the expected shape
    #[display("Invalid configuration: {}", _0)]
    Invalid(String),
    /// The `[quotas]` table has an unusable entry
    #[display("Invalid quota table: {}", _0)]
    QuotaTable(String),
    /// No usable profile name was given
    #[display("Invalid profile {:?}: {}", name, reason)]
    Profile {
        /// Profile as given
        name: String,
        /// What is wrong with it
        reason: String,
    },
    /// A configured path cannot be used
    #[display("Invalid path {}: {}", path, reason)]
    Path {
        /// Offending path
        path: String,
        /// Underlying failure
        reason: String,
    },
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use reverb_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::new(ConfigErrorKind::QuotaTable(
///     "gemini/gemini-2.0-flash allows 0 requests per minute".to_string(),
/// ));
/// assert!(matches!(err.kind(), ConfigErrorKind::QuotaTable(_)));
/// assert!(err.to_string().contains("Invalid quota table"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

impl From<ConfigErrorKind> for ConfigError {
    #[track_caller]
    fn from(kind: ConfigErrorKind) -> Self {
        Self::new(kind)
    }
}
