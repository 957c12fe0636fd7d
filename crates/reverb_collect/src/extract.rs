//! Stable identifiers for rendered containers.

use crate::Element;
use derive_getters::Getters;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A container captured during a pass, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct RawContainer {
    /// Platform-native identifier
    id: String,
    /// Canonical URL of the content
    url: String,
    /// Raw markup
    html: String,
    /// Rendered text
    text: String,
    /// Author avatar URL, when one was found
    profile_image_url: Option<String>,
}

impl RawContainer {
    /// Creates a container from an extracted identity and the element.
    pub fn from_element(identity: ContainerIdentity, element: &Element) -> Self {
        Self {
            id: identity.id,
            url: identity.url,
            html: element.outer_html().clone(),
            text: element.text().clone(),
            profile_image_url: identity.profile_image_url,
        }
    }
}

/// What an extractor learned about one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    /// Platform-native identifier
    pub id: String,
    /// Canonical URL
    pub url: String,
    /// Author avatar URL, if present
    pub profile_image_url: Option<String>,
}

/// Locates content containers and pulls a stable identifier out of each.
pub trait IdExtractor: Send + Sync {
    /// CSS selector matching one container per content item.
    fn container_selector(&self) -> &str;

    /// Identity of `element`, or `None` when it has no stable id
    /// (reply-quote wrappers, promoted slots).
    fn extract(&self, element: &Element) -> Option<ContainerIdentity>;
}

static STATUS_LINK: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/status/"]"#).ok());
static AVATAR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/"] img"#).ok());

/// Extracts post ids from X `article` containers via their status link.
#[derive(Debug, Clone)]
pub struct XStatusExtractor {
    base_url: String,
}

impl XStatusExtractor {
    /// Resolves relative links against `https://x.com`.
    pub fn new() -> Self {
        Self {
            base_url: "https://x.com".to_string(),
        }
    }
}

impl Default for XStatusExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdExtractor for XStatusExtractor {
    fn container_selector(&self) -> &str {
        r#"article[data-testid="tweet"]"#
    }

    fn extract(&self, element: &Element) -> Option<ContainerIdentity> {
        let links = STATUS_LINK.as_ref()?;
        let fragment = Html::parse_fragment(element.outer_html());

        let href = fragment
            .select(links)
            .filter_map(|link| link.value().attr("href"))
            .find(|href| !href.contains("/analytics"))?;

        let id = status_id(href)?;
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        };

        let profile_image_url = AVATAR.as_ref().and_then(|avatar| {
            fragment
                .select(avatar)
                .find_map(|img| img.value().attr("src"))
                .map(str::to_string)
        });

        Some(ContainerIdentity {
            id,
            url,
            profile_image_url,
        })
    }
}

/// Numeric id following `/status/` in a link.
pub fn status_id(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/status/")?;
    let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
    (!id.is_empty()).then_some(id)
}

/// Reads the id from an attribute on the container's root element.
///
/// Suits platforms that stamp ids on their post elements, such as Reddit's
/// `shreddit-post` (`id="t3_..."`) or YouTube's `ytd-comment-thread-renderer`.
#[derive(Debug, Clone)]
pub struct AttributeExtractor {
    selector: String,
    id_attribute: String,
    url_attribute: Option<String>,
    url_prefix: String,
}

impl AttributeExtractor {
    /// Matches `selector` and reads the id from `id_attribute`.
    pub fn new(selector: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            id_attribute: id_attribute.into(),
            url_attribute: None,
            url_prefix: String::new(),
        }
    }

    /// Reads the URL from `attribute`, prefixed with `prefix` when relative.
    pub fn with_url_attribute(
        mut self,
        attribute: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.url_attribute = Some(attribute.into());
        self.url_prefix = prefix.into();
        self
    }
}

impl IdExtractor for AttributeExtractor {
    fn container_selector(&self) -> &str {
        &self.selector
    }

    fn extract(&self, element: &Element) -> Option<ContainerIdentity> {
        let fragment = Html::parse_fragment(element.outer_html());
        let root = fragment
            .root_element()
            .children()
            .find_map(scraper::ElementRef::wrap)?;

        let id = root
            .value()
            .attr(&self.id_attribute)
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_string();

        let url = self
            .url_attribute
            .as_deref()
            .and_then(|attr| root.value().attr(attr))
            .map(|raw| {
                if raw.starts_with("http") {
                    raw.to_string()
                } else {
                    format!("{}{}", self.url_prefix, raw)
                }
            })
            .unwrap_or_default();

        Some(ContainerIdentity {
            id,
            url,
            profile_image_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_id_stops_at_query_and_path() {
        assert_eq!(status_id("/jack/status/20?s=20").as_deref(), Some("20"));
        assert_eq!(
            status_id("https://x.com/a/status/1790/photo/1").as_deref(),
            Some("1790")
        );
        assert_eq!(status_id("/a/status/"), None);
        assert_eq!(status_id("/a/likes"), None);
    }

    #[test]
    fn test_x_extractor_skips_analytics_links() {
        let element = Element::new(
            r#"<article data-testid="tweet">
                 <a href="/someone"><img src="https://pbs.twimg.com/profile_images/1/a.jpg"></a>
                 <a href="/someone/status/555/analytics">stats</a>
                 <a href="/someone/status/555">5m</a>
               </article>"#,
            "post",
        );
        let identity = XStatusExtractor::new().extract(&element).unwrap();
        assert_eq!(identity.id, "555");
        assert_eq!(identity.url, "https://x.com/someone/status/555");
        assert_eq!(
            identity.profile_image_url.as_deref(),
            Some("https://pbs.twimg.com/profile_images/1/a.jpg")
        );
    }

    #[test]
    fn test_x_extractor_without_status_link() {
        let element = Element::new(r#"<article><a href="/someone">x</a></article>"#, "");
        assert!(XStatusExtractor::new().extract(&element).is_none());
    }

    #[test]
    fn test_attribute_extractor_reads_root() {
        let element = Element::new(
            r#"<shreddit-post id="t3_abc" permalink="/r/rust/comments/abc/x/"><p>hi</p></shreddit-post>"#,
            "hi",
        );
        let extractor = AttributeExtractor::new("shreddit-post", "id")
            .with_url_attribute("permalink", "https://www.reddit.com");
        let identity = extractor.extract(&element).unwrap();
        assert_eq!(identity.id, "t3_abc");
        assert_eq!(identity.url, "https://www.reddit.com/r/rust/comments/abc/x/");
    }
}
