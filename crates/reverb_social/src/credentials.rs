//! Per-profile access tokens.

use derive_getters::Getters;
use reverb_core::{Credential, Platform};
use reverb_error::{PostError, PostErrorKind};
use serde::Serialize;
use tracing::debug;

/// Environment variable holding `profile`'s token for `platform`.
///
/// The profile name is upper-cased and anything that is not alphanumeric
/// becomes an underscore.
///
/// # Examples
///
/// ```
/// use reverb_core::Platform;
/// use reverb_social::token_var;
///
/// assert_eq!(token_var("alice", Platform::X), "ALICE_X_ACCESS_TOKEN");
/// assert_eq!(token_var("news-bot", Platform::YouTube), "NEWS_BOT_YOUTUBE_ACCESS_TOKEN");
/// ```
pub fn token_var(profile: &str, platform: Platform) -> String {
    let profile: String = profile
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!(
        "{}_{}_ACCESS_TOKEN",
        profile,
        platform.as_ref().to_ascii_uppercase()
    )
}

/// Reads `profile`'s token for `platform` from the process environment.
///
/// # Errors
///
/// Returns `MissingCredentials` naming the variable when it is unset or blank.
pub fn resolve_token(profile: &str, platform: Platform) -> Result<Credential, PostError> {
    resolve_token_with(profile, platform, |var| std::env::var(var).ok())
}

/// [`resolve_token`] with an explicit variable lookup.
///
/// # Errors
///
/// Returns `MissingCredentials` naming the variable when it is unset or blank.
pub fn resolve_token_with(
    profile: &str,
    platform: Platform,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Credential, PostError> {
    let var = token_var(profile, platform);
    match lookup(&var).filter(|value| !value.trim().is_empty()) {
        Some(value) => {
            let token = Credential::new(value);
            debug!(var = %var, token = %token.suffix(), "Resolved access token");
            Ok(token)
        }
        None => Err(PostError::new(PostErrorKind::MissingCredentials(var))),
    }
}

/// Presence of one token variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct CredentialCheck {
    /// Platform the token is for
    platform: Platform,
    /// Variable name
    variable: String,
    /// Whether it is set
    present: bool,
    /// Last four characters, when set
    suffix: Option<String>,
}

impl std::fmt::Display for CredentialCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suffix {
            Some(suffix) => write!(f, "{}: set (…{})", self.variable, suffix),
            None => write!(f, "{}: missing", self.variable),
        }
    }
}

/// Reports every platform token for `profile` from the process environment.
pub fn check_profile_credentials(profile: &str) -> Vec<CredentialCheck> {
    check_profile_credentials_with(profile, |var| std::env::var(var).ok())
}

/// [`check_profile_credentials`] with an explicit variable lookup.
pub fn check_profile_credentials_with(
    profile: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<CredentialCheck> {
    [Platform::X, Platform::Reddit, Platform::YouTube]
        .into_iter()
        .map(|platform| {
            let token = resolve_token_with(profile, platform, &lookup).ok();
            CredentialCheck {
                platform,
                variable: token_var(profile, platform),
                present: token.is_some(),
                suffix: token.map(|t| t.suffix().to_string()),
            }
        })
        .collect()
}
