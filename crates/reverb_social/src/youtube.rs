//! Top-level comments through the YouTube Data API.

use crate::http::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use reverb_core::{Credential, Platform};
use reverb_error::PostError;
use reverb_review::ReplyPoster;
use serde_json::{Value, json};
use tracing::{info, instrument};

/// Production endpoint.
pub const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com";

/// Posts comments with `commentThreads.insert`.
#[derive(Debug, Clone)]
pub struct YouTubePoster {
    client: Client,
    base_url: String,
    token: Credential,
    retry: RetryPolicy,
}

impl YouTubePoster {
    /// Poster authenticated with an OAuth access token.
    pub fn new(token: Credential) -> Self {
        Self {
            client: Client::new(),
            base_url: YOUTUBE_BASE_URL.to_string(),
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

    /// `commentThread` resource for a comment on video `video_id`.
    pub fn request_body(video_id: &str, text: &str) -> Value {
        json!({
            "snippet": {
                "videoId": video_id,
                "topLevelComment": {
                    "snippet": { "textOriginal": text }
                }
            }
        })
    }
}

#[async_trait]
impl ReplyPoster for YouTubePoster {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    #[instrument(skip(self, text), fields(token = %self.token.suffix()))]
    async fn post_reply(&self, target_id: &str, text: &str) -> Result<(), PostError> {
        let url = format!("{}/youtube/v3/commentThreads", self.base_url);
        let body = Self::request_body(target_id, text);
        send_with_retry(self.retry, || {
            self.client
                .post(&url)
                .query(&[("part", "snippet")])
                .bearer_auth(self.token.expose())
                .json(&body)
        })
        .await?;
        info!("Comment posted to YouTube");
        Ok(())
    }
}
