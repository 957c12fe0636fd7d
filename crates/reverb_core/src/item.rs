//! Collected content items.

use chrono::NaiveDateTime;
use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Platform an item was collected from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    /// X (Twitter)
    #[default]
    X,
    /// Reddit
    Reddit,
    /// YouTube
    YouTube,
}

/// Engagement counters shown alongside a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Likes
    #[serde(default)]
    pub likes: u64,
    /// Reposts / retweets
    #[serde(default)]
    pub reposts: u64,
    /// Replies
    #[serde(default)]
    pub replies: u64,
    /// Views
    #[serde(default)]
    pub views: u64,
    /// Bookmarks
    #[serde(default)]
    pub bookmarks: u64,
}

/// Media attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "urls", rename_all = "snake_case")]
pub enum MediaRefs {
    /// No media
    #[default]
    None,
    /// A video player; the stream itself must be fetched separately
    Video,
    /// Image URLs
    Images(Vec<String>),
}

impl MediaRefs {
    /// Legacy `;`-joined form used in review rows (`video` for videos).
    pub fn to_legacy_string(&self) -> String {
        match self {
            MediaRefs::None => String::new(),
            MediaRefs::Video => "video".to_string(),
            MediaRefs::Images(urls) => urls.join(";"),
        }
    }
}

/// A deduplicated unit of scraped content.
///
/// Items are immutable once built: a collection run creates them, and
/// downstream stages either discard them or promote them to review entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Builder)]
#[builder(setter(into))]
pub struct CollectedItem {
    /// Platform-native identifier, unique within a collection run
    id: String,
    /// Platform the item came from
    #[builder(default)]
    #[serde(default)]
    platform: Platform,
    /// Canonical URL of the item
    url: String,
    /// Raw markup the item was parsed from
    #[builder(default)]
    #[serde(default)]
    raw_html: String,
    /// Body text
    #[builder(default)]
    #[serde(default)]
    text: String,
    /// Author handle, when known
    #[builder(default)]
    #[serde(default)]
    author: Option<String>,
    /// Publication time, when known
    #[builder(default)]
    #[serde(default)]
    posted_at: Option<NaiveDateTime>,
    /// Engagement counters
    #[builder(default)]
    #[serde(default)]
    metrics: EngagementMetrics,
    /// Attached media
    #[builder(default)]
    #[serde(default)]
    media: MediaRefs,
    /// Author avatar URL
    #[builder(default)]
    #[serde(default)]
    profile_image_url: Option<String>,
}

impl CollectedItem {
    /// Creates a new builder.
    pub fn builder() -> CollectedItemBuilder {
        CollectedItemBuilder::default()
    }
}
