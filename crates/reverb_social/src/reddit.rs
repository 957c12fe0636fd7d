//! Comments through the Reddit API.

use crate::http::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use reverb_core::{Credential, Platform};
use reverb_error::{PostError, PostErrorKind};
use reverb_review::ReplyPoster;
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Production endpoint for OAuth-authenticated calls.
pub const REDDIT_BASE_URL: &str = "https://oauth.reddit.com";

const USER_AGENT: &str = concat!("reverb/", env!("CARGO_PKG_VERSION"));

/// Fullname of the thing being replied to.
///
/// Ids that already carry a kind prefix (`t1_` comment, `t3_` link) are kept;
/// bare ids are treated as posts.
///
/// # Examples
///
/// ```
/// use reverb_social::reddit_thing_id;
///
/// assert_eq!(reddit_thing_id("1abcde"), "t3_1abcde");
/// assert_eq!(reddit_thing_id("t1_k9x2"), "t1_k9x2");
/// ```
pub fn reddit_thing_id(target_id: &str) -> String {
    let target_id = target_id.trim();
    if target_id.starts_with("t1_") || target_id.starts_with("t3_") {
        target_id.to_string()
    } else {
        format!("t3_{}", target_id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    json: CommentResult,
}

#[derive(Debug, Default, Deserialize)]
struct CommentResult {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

/// Posts comments with `POST /api/comment`.
#[derive(Debug, Clone)]
pub struct RedditPoster {
    client: Client,
    base_url: String,
    token: Credential,
    retry: RetryPolicy,
}

impl RedditPoster {
    /// Poster authenticated with an OAuth bearer token.
    pub fn new(token: Credential) -> Self {
        Self {
            client: Client::new(),
            base_url: REDDIT_BASE_URL.to_string(),
            token,
            retry: RetryPolicy::default(),
        }
    }

    /// Points the poster at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Form fields for a comment on `target_id`.
    pub fn form_fields(target_id: &str, text: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api_type", "json".to_string()),
            ("thing_id", reddit_thing_id(target_id)),
            ("text", text.to_string()),
        ]
    }
}

/// Reddit answers 200 even for rejected comments; the errors sit in the body.
fn rejection(body: &str) -> Option<PostErrorKind> {
    let parsed: CommentResponse = serde_json::from_str(body).unwrap_or_default();
    let first = parsed.json.errors.first()?;
    let code = first.first().and_then(|v| v.as_str()).unwrap_or_default();
    let message = first
        .iter()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(": ");
    Some(match code {
        "DELETED_COMMENT" | "DELETED_LINK" | "NO_LINK" | "TOO_OLD" => {
            PostErrorKind::TargetNotFound(message)
        }
        _ => PostErrorKind::Api {
            status: 200,
            message,
        },
    })
}

#[async_trait]
impl ReplyPoster for RedditPoster {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    #[instrument(skip(self, text), fields(token = %self.token.suffix()))]
    async fn post_reply(&self, target_id: &str, text: &str) -> Result<(), PostError> {
        let url = format!("{}/api/comment", self.base_url);
        let form = Self::form_fields(target_id, text);
        let response = send_with_retry(self.retry, || {
            self.client
                .post(&url)
                .bearer_auth(self.token.expose())
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .form(&form)
        })
        .await?;

        let body = response.text().await.unwrap_or_default();
        if let Some(kind) = rejection(&body) {
            warn!(error = %kind, "Reddit rejected the comment");
            return Err(PostError::new(kind));
        }
        info!("Comment posted to Reddit");
        Ok(())
    }
}
