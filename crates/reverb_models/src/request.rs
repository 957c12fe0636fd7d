//! Generation requests and media attachments.

use derive_getters::Getters;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Parenthesised and bracketed fragments dropped from upload display names.
static DISPLAY_NAME_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(.*?\)|\s*\[.*?\]").expect("display name pattern is valid")
});

/// How an attachment is sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Sent inline, base64 encoded
    Image,
    /// Uploaded first, then referenced by URI
    Video,
}

/// A local media file to send along with a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct MediaAttachment {
    /// Path on disk
    path: PathBuf,
    /// MIME type guessed from the extension
    mime_type: String,
    /// Image or video
    kind: MediaKind,
}

impl MediaAttachment {
    /// Classifies `path` by extension. Returns `None` for anything that is
    /// not an image or a video.
    ///
    /// # Examples
    ///
    /// ```
    /// use reverb_models::{MediaAttachment, MediaKind};
    ///
    /// let clip = MediaAttachment::from_path("downloads/clip.mp4").unwrap();
    /// assert_eq!(*clip.kind(), MediaKind::Video);
    /// assert!(MediaAttachment::from_path("notes.txt").is_none());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let mime = mime_guess::from_path(path).first()?;
        let kind = match mime.type_().as_str() {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            _ => return None,
        };
        Some(Self {
            path: path.to_path_buf(),
            mime_type: mime.essence_str().to_string(),
            kind,
        })
    }

    /// File name with parenthesised and bracketed fragments removed, as
    /// shown by the provider's file listing.
    pub fn display_name(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        DISPLAY_NAME_NOISE.replace_all(&name, "").trim().to_string()
    }
}

/// Prompt text plus optional media and model override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct GenerationRequest {
    /// Full prompt text
    prompt: String,
    /// Attachments, in the order they are sent
    media: Vec<MediaAttachment>,
    /// Model to use instead of the configured default
    model: Option<String>,
}

impl GenerationRequest {
    /// A text-only request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Attaches a local file. Unsupported types are skipped with a debug log.
    pub fn with_media_path(mut self, path: impl AsRef<Path>) -> Self {
        match MediaAttachment::from_path(&path) {
            Some(attachment) => self.media.push(attachment),
            None => debug!(path = %path.as_ref().display(), "Skipping unsupported media type"),
        }
        self
    }

    /// Overrides the model for this request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
