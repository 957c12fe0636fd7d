//! Review queue entries and their status state machine.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Timestamp layout used for review entry dates.
pub const REVIEW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status of a review entry.
///
/// `posted` and `rejected` are terminal. The other failure states record what
/// went wrong for one entry so an operator can decide what to do with it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    /// Reply generated, waiting for a reviewer
    ReadyForApproval,
    /// Reviewer approved the reply for posting
    Approved,
    /// Reviewer rejected the reply
    Rejected,
    /// Reply was published
    Posted,
    /// Posting failed for an unclassified reason
    PostFailed,
    /// Reply generation failed
    AnalysisFailed,
    /// No credential was available to generate a reply
    NoApiKey,
    /// The target post could not be found when posting
    TweetNotFound,
    /// The entry lacks an id or reply text
    InvalidEntry,
    /// The platform API rejected the reply
    ApiPostFailed,
    /// The reply dialog never appeared
    DialogTimeout,
    /// A browser interaction failed while posting
    BrowserInteractionFailed,
}

impl ReviewStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReviewStatus::Posted | ReviewStatus::Rejected)
    }

    /// States a posting attempt can end in.
    pub fn is_posting_outcome(self) -> bool {
        matches!(
            self,
            ReviewStatus::Posted
                | ReviewStatus::PostFailed
                | ReviewStatus::TweetNotFound
                | ReviewStatus::InvalidEntry
                | ReviewStatus::ApiPostFailed
                | ReviewStatus::DialogTimeout
                | ReviewStatus::BrowserInteractionFailed
        )
    }

    /// Returns whether moving from `self` to `next` is a legal transition.
    ///
    /// Posting failures other than `invalid_entry` may be re-approved by a
    /// reviewer, which sends the entry back through the posting flow. Nothing
    /// leaves a terminal state.
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;

        if self.is_terminal() || self == next {
            return false;
        }
        match self {
            ReadyForApproval => matches!(next, Approved | Rejected),
            Approved => next == Rejected || next.is_posting_outcome(),
            PostFailed | TweetNotFound | ApiPostFailed | DialogTimeout
            | BrowserInteractionFailed => matches!(next, Approved | Rejected),
            AnalysisFailed | NoApiKey | InvalidEntry => next == Rejected,
            Posted | Rejected => false,
        }
    }
}

/// One generated reply awaiting a decision.
///
/// Unknown fields found in stored entries are kept in `extra` and written
/// back unchanged, so other review tooling can annotate entries freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ReviewEntry {
    /// Platform id of the post being replied to
    #[serde(alias = "id", default)]
    tweet_id: String,
    /// Link to the post being replied to
    #[serde(default)]
    tweet_url: String,
    /// Text of the post being replied to
    #[serde(default)]
    tweet_text: String,
    /// Generated reply, or `Error: ...` when generation failed
    #[serde(default)]
    generated_reply: String,
    /// Current status
    status: ReviewStatus,
    /// Profile the reply will be posted as
    #[serde(default)]
    profile: String,
    /// When the source post was collected
    #[serde(with = "review_date", default)]
    scraped_date: Option<NaiveDateTime>,
    /// When the reply was published
    #[serde(with = "review_date", default)]
    posted_date: Option<NaiveDateTime>,
    /// Collection run that produced the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_number: Option<u32>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ReviewEntry {
    /// Creates an entry with no dates or extra fields.
    pub fn new(
        tweet_id: impl Into<String>,
        tweet_url: impl Into<String>,
        tweet_text: impl Into<String>,
        generated_reply: impl Into<String>,
        status: ReviewStatus,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            tweet_id: tweet_id.into(),
            tweet_url: tweet_url.into(),
            tweet_text: tweet_text.into(),
            generated_reply: generated_reply.into(),
            status,
            profile: profile.into(),
            scraped_date: None,
            posted_date: None,
            run_number: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets when the source post was collected.
    pub fn with_scraped_date(mut self, date: NaiveDateTime) -> Self {
        self.scraped_date = Some(date);
        self
    }

    /// Sets the run number.
    pub fn with_run_number(mut self, run: u32) -> Self {
        self.run_number = Some(run);
        self
    }

    /// Adds an uninterpreted field.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overwrites the status without validation.
    ///
    /// Stores call this after the queue has validated the transition.
    pub fn set_status(&mut self, status: ReviewStatus) {
        self.status = status;
    }

    /// Replaces the reply text.
    pub fn set_generated_reply(&mut self, reply: impl Into<String>) {
        self.generated_reply = reply.into();
    }

    /// Records the publication time.
    pub fn set_posted_date(&mut self, date: NaiveDateTime) {
        self.posted_date = Some(date);
    }

    /// True when the entry can be posted at all.
    pub fn is_postable(&self) -> bool {
        !self.tweet_id.trim().is_empty() && !self.generated_reply.trim().is_empty()
    }
}

mod review_date {
    use super::REVIEW_DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(REVIEW_DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(text, REVIEW_DATE_FORMAT)
                .or_else(|_| text.parse::<NaiveDateTime>())
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
