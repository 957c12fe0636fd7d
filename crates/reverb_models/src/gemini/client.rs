//! HTTP client for `generateContent` and the Files API.

use super::dto::{
    FileEnvelope, GeminiFile, GenerateContentRequest, GenerateContentResponse, Part,
};
use crate::{ContentGenerator, GenerationRequest, MediaAttachment, MediaKind};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response};
use reverb_core::Credential;
use reverb_error::{GenerationError, GenerationErrorKind};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Production endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Client for the Gemini REST API.
///
/// One client serves every credential; the key travels per request.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    upload_timeout: Duration,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    /// Client for the production endpoint, polling uploads every 5 seconds
    /// for up to 10 minutes.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(600),
        }
    }

    /// Points the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Interval between upload state checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Longest wait for an upload to become `ACTIVE`.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name)
    }

    /// Calls `generateContent` with a prepared body.
    ///
    /// # Errors
    ///
    /// Returns `Http` for non-success statuses (429 included), `Transport`
    /// when no response arrives and `ResponseParsing` for undecodable bodies.
    #[instrument(skip(self, credential, body), fields(key = %credential.suffix()))]
    pub async fn generate_content(
        &self,
        credential: &Credential,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let response = self
            .client
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, credential.expose())
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse generateContent response");
            GenerationError::new(GenerationErrorKind::ResponseParsing(e.to_string()))
        })
    }

    /// Uploads `attachment` with the resumable upload protocol.
    ///
    /// # Errors
    ///
    /// Returns `Media` when the file cannot be read and `UploadFailed` when
    /// the service does not hand back an upload session.
    #[instrument(skip(self, credential, attachment), fields(key = %credential.suffix(), path = %attachment.path().display()))]
    pub async fn upload_file(
        &self,
        credential: &Credential,
        attachment: &MediaAttachment,
    ) -> Result<GeminiFile, GenerationError> {
        let bytes = read_media(attachment).await?;
        let display_name = attachment.display_name();
        info!(display_name = %display_name, size = bytes.len(), "Uploading media");

        let start = self
            .client
            .post(self.upload_url())
            .header(API_KEY_HEADER, credential.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", attachment.mime_type())
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(transport)?;
        let start = check_status(start).await?;

        let session = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                GenerationError::new(GenerationErrorKind::UploadFailed(format!(
                    "{}: no upload session returned",
                    display_name
                )))
            })?;

        let finish = self
            .client
            .post(session)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", 0)
            .body(bytes)
            .send()
            .await
            .map_err(transport)?;
        let finish = check_status(finish).await?;

        let envelope: FileEnvelope = finish.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::ResponseParsing(e.to_string()))
        })?;
        debug!(name = %envelope.file.name, state = %envelope.file.state, "Upload finished");
        Ok(envelope.file)
    }

    /// Fetches the current state of an uploaded file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`generate_content`](Self::generate_content).
    pub async fn get_file(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<GeminiFile, GenerationError> {
        let response = self
            .client
            .get(self.file_url(name))
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::ResponseParsing(e.to_string()))
        })
    }

    /// Polls until `file` is `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns `UploadFailed` if processing fails and `UploadTimeout` if the
    /// file is still processing after the upload timeout.
    #[instrument(skip(self, credential, file), fields(name = %file.name))]
    pub async fn wait_until_active(
        &self,
        credential: &Credential,
        mut file: GeminiFile,
    ) -> Result<GeminiFile, GenerationError> {
        let started = Instant::now();
        loop {
            if file.is_active() {
                info!(display_name = %file.display_name, "File is ACTIVE");
                return Ok(file);
            }
            if file.is_failed() {
                warn!(display_name = %file.display_name, "File processing failed");
                return Err(GenerationError::new(GenerationErrorKind::UploadFailed(
                    format!("{} ({})", file.display_name, file.name),
                )));
            }
            if started.elapsed() >= self.upload_timeout {
                return Err(GenerationError::new(GenerationErrorKind::UploadTimeout {
                    name: file.name,
                    secs: self.upload_timeout.as_secs(),
                }));
            }
            debug!(state = %file.state, "Waiting for file to become ACTIVE");
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(credential, &file.name).await?;
        }
    }

    /// Deletes an uploaded file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`generate_content`](Self::generate_content).
    pub async fn delete_file(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<(), GenerationError> {
        let response = self
            .client
            .delete(self.file_url(name))
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        debug!(name, "Deleted uploaded file");
        Ok(())
    }

    /// Builds the parts for `request`, uploading videos as it goes.
    ///
    /// Names of uploaded files are pushed to `uploaded` as soon as they
    /// exist, so the caller can clean up even when a later step fails.
    async fn prepare_parts(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
        uploaded: &mut Vec<String>,
    ) -> Result<Vec<Part>, GenerationError> {
        let mut parts = vec![Part::text(request.prompt())];
        for attachment in request.media() {
            match attachment.kind() {
                MediaKind::Image => {
                    let bytes = read_media(attachment).await?;
                    debug!(path = %attachment.path().display(), "Inlining image");
                    parts.push(Part::inline(attachment.mime_type(), STANDARD.encode(bytes)));
                }
                MediaKind::Video => {
                    let file = self.upload_file(credential, attachment).await?;
                    uploaded.push(file.name.clone());
                    let file = self.wait_until_active(credential, file).await?;
                    let mime_type = if file.mime_type.is_empty() {
                        attachment.mime_type().clone()
                    } else {
                        file.mime_type
                    };
                    parts.push(Part::file(mime_type, file.uri));
                }
            }
        }
        Ok(parts)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, credential, request), fields(key = %credential.suffix(), media = request.media().len()))]
    async fn generate(
        &self,
        credential: &Credential,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let mut uploaded = Vec::new();
        let result = match self.prepare_parts(credential, request, &mut uploaded).await {
            Ok(parts) => self
                .generate_content(credential, model, &GenerateContentRequest::user(parts))
                .await
                .and_then(GenerateContentResponse::into_text),
            Err(e) => Err(e),
        };

        for name in uploaded {
            if let Err(e) = self.delete_file(credential, &name).await {
                warn!(name = %name, error = %e, "Failed to delete uploaded file");
            }
        }
        result
    }
}

async fn read_media(attachment: &MediaAttachment) -> Result<Vec<u8>, GenerationError> {
    tokio::fs::read(attachment.path()).await.map_err(|e| {
        GenerationError::new(GenerationErrorKind::Media(format!(
            "{}: {}",
            attachment.path().display(),
            e
        )))
    })
}

#[track_caller]
fn transport(e: reqwest::Error) -> GenerationError {
    error!(error = ?e, "HTTP request failed");
    GenerationError::new(GenerationErrorKind::Transport(e.to_string()))
}

async fn check_status(response: Response) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    error!(status = %status, error = %message, "Gemini API error");
    Err(GenerationError::new(GenerationErrorKind::Http {
        status_code: status.as_u16(),
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_follow_base() {
        let client = GeminiClient::new().with_base_url("http://localhost:9000/");
        assert_eq!(
            client.generate_url("gemini-2.0-flash-lite"),
            "http://localhost:9000/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
        assert_eq!(client.upload_url(), "http://localhost:9000/upload/v1beta/files");
        assert_eq!(
            client.file_url("files/abc123"),
            "http://localhost:9000/v1beta/files/abc123"
        );
    }

    #[tokio::test]
    async fn test_missing_image_is_a_media_error() {
        let client = GeminiClient::new();
        let request = GenerationRequest::new("describe").with_media_path("/nonexistent/pic.png");
        let mut uploaded = Vec::new();
        let err = client
            .prepare_parts(&Credential::new("key-0000"), &request, &mut uploaded)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, GenerationErrorKind::Media(_)));
        assert!(uploaded.is_empty());
    }

    #[tokio::test]
    async fn test_inline_image_is_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        std::fs::write(&path, b"png-bytes").unwrap();
        let request = GenerationRequest::new("describe").with_media_path(&path);

        let mut uploaded = Vec::new();
        let parts = GeminiClient::new()
            .prepare_parts(&Credential::new("key-0000"), &request, &mut uploaded)
            .await
            .unwrap();

        assert_eq!(parts[0].text.as_deref(), Some("describe"));
        let blob = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(blob.data, STANDARD.encode(b"png-bytes"));
    }
}
