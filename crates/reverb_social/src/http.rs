//! Shared request plumbing: status classification and retry.

use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response, StatusCode};
use reverb_error::{PostError, PostErrorKind};
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Backoff for transient posting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry; each later retry doubles it
    pub first_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Retries after the initial attempt
    pub retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            retries: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    fn delays(&self) -> impl Iterator<Item = Duration> {
        let first_ms = self.first_delay.as_millis().max(1) as u64;
        ExponentialBackoff::from_millis(2)
            .factor(first_ms / 2)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.retries)
    }
}

/// Maps a non-success status to a posting failure.
///
/// 404 and 410 mean the post being replied to is gone. Everything else is an
/// API rejection carrying the response body.
pub fn classify_status(status: u16, body: String) -> PostErrorKind {
    match status {
        404 | 410 => PostErrorKind::TargetNotFound(body),
        _ => PostErrorKind::Api {
            status,
            message: body,
        },
    }
}

/// Sends the request produced by `build`, retrying only failures where the
/// platform cannot have published anything.
///
/// A reply is not idempotent, so a request is re-sent only when the
/// connection was never established, or when the platform answered 503 with
/// a `Retry-After` header. Every other failure is returned as is.
///
/// `build` runs once per attempt since a request body cannot be replayed.
pub(crate) async fn send_with_retry<F>(
    policy: RetryPolicy,
    build: F,
) -> Result<Response, PostError>
where
    F: Fn() -> RequestBuilder,
{
    let build = &build;
    let action = move || async move { send_once(build(), policy.max_delay).await };
    Retry::spawn(policy.delays(), action).await
}

async fn send_once(
    request: RequestBuilder,
    max_delay: Duration,
) -> Result<Response, RetryError<PostError>> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_connect() => {
            warn!(error = %e, "Could not connect, will retry");
            return Err(RetryError::Transient {
                err: PostError::new(PostErrorKind::Transport(e.to_string())),
                retry_after: None,
            });
        }
        Err(e) => {
            return Err(RetryError::Permanent(PostError::new(
                PostErrorKind::Transport(e.to_string()),
            )));
        }
    };

    let status = response.status();
    if status.is_success() {
        debug!(status = %status, "Platform accepted request");
        return Ok(response);
    }

    let retry_after = (status == StatusCode::SERVICE_UNAVAILABLE)
        .then(|| retry_after(&response))
        .flatten();
    let body = response.text().await.unwrap_or_default();
    let err = PostError::new(classify_status(status.as_u16(), body));
    match retry_after {
        Some(delay) => {
            warn!(error = %err, delay = ?delay, "Platform asked to retry later");
            Err(RetryError::Transient {
                err,
                retry_after: Some(delay.min(max_delay)),
            })
        }
        None => Err(RetryError::Permanent(err)),
    }
}

/// Delay from a delta-seconds `Retry-After` header.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
