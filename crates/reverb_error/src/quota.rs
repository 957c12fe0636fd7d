//! Detection of quota and rate-limit failures from free-form error text.

use regex::Regex;
use std::sync::LazyLock;

static QUOTA_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b429\b|rate limit|quota|resource has been exhausted|resource exhausted|too many requests",
    )
    .expect("quota signature pattern is valid")
});

/// Returns true if `message` looks like a quota or rate-limit failure.
///
/// Remote APIs report exhaustion inconsistently (status codes, gRPC status
/// names, prose), so the match is on text rather than on a typed code.
///
/// # Examples
///
/// ```
/// use reverb_error::is_quota_error;
///
/// assert!(is_quota_error("HTTP 429 error: Too Many Requests"));
/// assert!(is_quota_error("Resource has been exhausted (e.g. check quota)."));
/// assert!(!is_quota_error("invalid argument"));
/// ```
pub fn is_quota_error(message: &str) -> bool {
    QUOTA_SIGNATURE.is_match(message)
}
