//! API credentials.

use serde::{Deserialize, Serialize};

/// An opaque API key.
///
/// The full value never appears in `Debug` or `Display` output; logs identify
/// a key by its last four characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw key, trimming surrounding whitespace.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_string())
    }

    /// The raw key, for handing to an API client.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Last four characters of the key.
    pub fn suffix(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(3)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &self.0[start..]
    }

    /// Parses a comma-separated key list, dropping empty segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use reverb_core::Credential;
    ///
    /// let keys = Credential::parse_list(" key-aaaa, ,key-bbbb ");
    /// assert_eq!(keys.len(), 2);
    /// assert_eq!(keys[1].suffix(), "bbbb");
    /// ```
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(Self::new)
            .collect()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(…{})", self.suffix())
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "…{}", self.suffix())
    }
}
