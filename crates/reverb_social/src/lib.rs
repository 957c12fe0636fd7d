//! Reply posting over platform REST APIs.
//!
//! Each poster implements [`ReplyPoster`](reverb_review::ReplyPoster) for one
//! platform and authenticates with a per-profile access token read from the
//! environment:
//!
//! | platform | variable |
//! |---|---|
//! | X | `<PROFILE>_X_ACCESS_TOKEN` |
//! | Reddit | `<PROFILE>_REDDIT_ACCESS_TOKEN` |
//! | YouTube | `<PROFILE>_YOUTUBE_ACCESS_TOKEN` |
//!
//! Transient failures (timeouts, 5xx) are retried with jittered exponential
//! backoff. Everything else maps straight to a [`PostErrorKind`](reverb_error::PostErrorKind).

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credentials;
mod http;
mod reddit;
mod x;
mod youtube;

pub use credentials::{
    CredentialCheck, check_profile_credentials, check_profile_credentials_with, resolve_token,
    resolve_token_with, token_var,
};
pub use http::{RetryPolicy, classify_status};
pub use reddit::{REDDIT_BASE_URL, RedditPoster, reddit_thing_id};
pub use x::{X_BASE_URL, XPoster};
pub use youtube::{YOUTUBE_BASE_URL, YouTubePoster};

use reverb_core::Platform;
use reverb_error::PostError;
use reverb_review::ReplyPoster;

/// Builds the poster for `platform`, authenticated as `profile`.
///
/// # Errors
///
/// Returns `MissingCredentials` when the profile's token variable is unset.
pub fn poster_for(platform: Platform, profile: &str) -> Result<Box<dyn ReplyPoster>, PostError> {
    let token = resolve_token(profile, platform)?;
    Ok(match platform {
        Platform::X => Box::new(XPoster::new(token)),
        Platform::Reddit => Box::new(RedditPoster::new(token)),
        Platform::YouTube => Box::new(YouTubePoster::new(token)),
    })
}
