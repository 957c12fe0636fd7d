//! Wire types for the Gemini REST API.

use reverb_error::{GenerationError, GenerationErrorKind};
use serde::{Deserialize, Serialize};

/// Inline binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type of `data`
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Reference to a file uploaded through the Files API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// MIME type of the file
    pub mime_type: String,
    /// URI returned by the upload
    pub file_uri: String,
}

/// One piece of a message. Exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Uploaded media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl Part {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// An inline media part.
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Self::default()
        }
    }

    /// A part referencing an uploaded file.
    pub fn file(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            }),
            ..Self::default()
        }
    }
}

/// A message: a role and its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Message parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation so far; a single user turn here
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A single user turn made of `parts`.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

/// Safety classification of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SafetyRating {
    /// Harm category
    pub category: String,
    /// Likelihood of harm
    pub probability: String,
}

/// One generated answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content, absent when blocked
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Safety classification
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

/// Feedback on the prompt itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was blocked
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Response of a `generateContent` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Prompt feedback
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, trimmed. `None` when there is no text.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Explains why the response carries no text.
    pub fn refusal_reason(&self) -> String {
        let block_reason = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref());

        match (self.candidates.first(), block_reason) {
            (Some(Candidate {
                finish_reason: Some(reason),
                safety_ratings,
                ..
            }), _) => {
                let mut message = format!("Finish reason - {}.", reason);
                if !safety_ratings.is_empty() {
                    let ratings: Vec<String> = safety_ratings
                        .iter()
                        .map(|r| format!("{}: {}", r.category, r.probability))
                        .collect();
                    message.push_str(" Safety ratings: ");
                    message.push_str(&ratings.join(", "));
                }
                message
            }
            (_, Some(block)) => format!("Blocked by prompt feedback: {}.", block),
            (Some(_), None) => "No text in response and no clear finish reason.".to_string(),
            (None, None) => "No text in response and no further details.".to_string(),
        }
    }

    /// The generated text, or a [`GenerationErrorKind::Refused`] error.
    ///
    /// # Errors
    ///
    /// Returns `Refused` naming the finish reason, safety ratings or block
    /// reason when the response carries no text.
    pub fn into_text(self) -> Result<String, GenerationError> {
        match self.text() {
            Some(text) => Ok(text),
            None => Err(GenerationError::new(GenerationErrorKind::Refused(
                self.refusal_reason(),
            ))),
        }
    }
}

/// A file managed by the Files API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    /// Resource name, `files/<id>`
    pub name: String,
    /// Human-readable name
    #[serde(default)]
    pub display_name: String,
    /// URI used to reference the file in prompts
    #[serde(default)]
    pub uri: String,
    /// MIME type
    #[serde(default)]
    pub mime_type: String,
    /// `PROCESSING`, `ACTIVE` or `FAILED`
    #[serde(default)]
    pub state: String,
}

impl GeminiFile {
    /// Ready to be referenced.
    pub fn is_active(&self) -> bool {
        self.state == "ACTIVE"
    }

    /// Processing failed.
    pub fn is_failed(&self) -> bool {
        self.state == "FAILED"
    }
}

/// Envelope around a file in upload responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileEnvelope {
    pub(crate) file: GeminiFile,
}
