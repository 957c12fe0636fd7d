//! Replies through the X API v2.

use crate::http::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use reverb_core::{Credential, Platform};
use reverb_error::PostError;
use reverb_review::ReplyPoster;
use serde_json::{Value, json};
use tracing::{info, instrument};

/// Production endpoint.
pub const X_BASE_URL: &str = "https://api.x.com";

/// Posts replies with `POST /2/tweets`.
#[derive(Debug, Clone)]
pub struct XPoster {
    client: Client,
    base_url: String,
    token: Credential,
    retry: RetryPolicy,
}

impl XPoster {
    /// Poster authenticated with a user-context bearer token.
    pub fn new(token: Credential) -> Self {
        Self {
            client: Client::new(),
            base_url: X_BASE_URL.to_string(),
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

    /// JSON body replying to `target_id` with `text`.
    pub fn request_body(target_id: &str, text: &str) -> Value {
        json!({
            "text": text,
            "reply": { "in_reply_to_tweet_id": target_id },
        })
    }
}

#[async_trait]
impl ReplyPoster for XPoster {
    fn platform(&self) -> Platform {
        Platform::X
    }

    #[instrument(skip(self, text), fields(token = %self.token.suffix()))]
    async fn post_reply(&self, target_id: &str, text: &str) -> Result<(), PostError> {
        let url = format!("{}/2/tweets", self.base_url);
        let body = Self::request_body(target_id, text);
        send_with_retry(self.retry, || {
            self.client
                .post(&url)
                .bearer_auth(self.token.expose())
                .json(&body)
        })
        .await?;
        info!("Reply posted to X");
        Ok(())
    }
}
