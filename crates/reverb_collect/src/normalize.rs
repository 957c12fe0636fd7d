//! Turning raw containers into [`CollectedItem`]s.

use crate::{CollectError, CollectErrorKind, RawContainer};
use chrono::{DateTime, NaiveDateTime};
use futures::stream::{self, StreamExt};
use reverb_core::{CollectedItem, EngagementMetrics, MediaRefs, Platform};
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Converts captured markup into structured items.
pub trait ContainerNormalizer: Send + Sync {
    /// Structured item for `container`, `Ok(None)` when the container is
    /// deliberately skipped.
    fn normalize(&self, container: &RawContainer) -> Result<Option<CollectedItem>, CollectError>;
}

struct XSelectors {
    ltr: Selector,
    text: Selector,
    time: Selector,
    images: Selector,
    groups: Selector,
    author: Selector,
}

impl XSelectors {
    fn parse() -> Result<Self, CollectError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|_| CollectError::new(CollectErrorKind::Selector(css.into())))
        };
        Ok(Self {
            ltr: parse(r#"div[dir="ltr"]"#)?,
            text: parse(r#"[data-testid="tweetText"]"#)?,
            time: parse("time[datetime]")?,
            images: parse(r#"img[src*="media"]"#)?,
            groups: parse(r#"[role="group"][aria-label]"#)?,
            author: parse(r#"[data-testid="User-Name"] a[href^="/"]"#)?,
        })
    }
}

/// Normaliser for X post containers.
///
/// Replies (containers showing "Replying to") are skipped. Timestamps are
/// kept in UTC.
pub struct XNormalizer {
    selectors: XSelectors,
}

impl std::fmt::Debug for XNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XNormalizer").finish_non_exhaustive()
    }
}

impl XNormalizer {
    /// Compiles the selectors.
    ///
    /// # Errors
    ///
    /// Fails only if a built-in selector does not parse.
    pub fn new() -> Result<Self, CollectError> {
        Ok(Self {
            selectors: XSelectors::parse()?,
        })
    }
}

impl ContainerNormalizer for XNormalizer {
    #[instrument(skip(self, container), fields(id = %container.id()))]
    fn normalize(&self, container: &RawContainer) -> Result<Option<CollectedItem>, CollectError> {
        let doc = Html::parse_fragment(container.html());
        let s = &self.selectors;

        let is_reply = doc
            .select(&s.ltr)
            .any(|div| div.text().collect::<String>().trim().starts_with("Replying to"));
        if is_reply {
            debug!("Skipping reply container");
            return Ok(None);
        }

        let text = doc
            .select(&s.text)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();

        let posted_at = doc
            .select(&s.time)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .and_then(parse_timestamp);

        let media = if container.html().contains(r#"data-testid="videoComponent""#) {
            MediaRefs::Video
        } else {
            let urls: Vec<String> = doc
                .select(&s.images)
                .filter_map(|img| img.value().attr("src"))
                .map(str::to_string)
                .collect();
            if urls.is_empty() {
                MediaRefs::None
            } else {
                MediaRefs::Images(urls)
            }
        };

        let mut metrics = EngagementMetrics::default();
        for group in doc.select(&s.groups) {
            if let Some(label) = group.value().attr("aria-label") {
                apply_metrics_label(label, &mut metrics);
            }
        }

        let author = doc
            .select(&s.author)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| href.trim_matches('/'))
            .find(|handle| !handle.is_empty() && !handle.contains('/'))
            .map(str::to_string);

        let item = CollectedItem::builder()
            .id(container.id().clone())
            .platform(Platform::X)
            .url(container.url().clone())
            .raw_html(container.html().clone())
            .text(text)
            .author(author)
            .posted_at(posted_at)
            .metrics(metrics)
            .media(media)
            .profile_image_url(container.profile_image_url().clone())
            .build()
            .map_err(|e| CollectErrorKind::Parse(e.to_string()))?;

        Ok(Some(item))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok())
}

/// Applies an engagement label such as
/// `"12 replies, 3 reposts, 1.2K likes, 4 bookmarks, 56789 views"`.
pub fn apply_metrics_label(label: &str, metrics: &mut EngagementMetrics) {
    for part in label.to_lowercase().split(',') {
        let part = part.trim();
        let Some(value) = part.split_whitespace().next().and_then(parse_count) else {
            continue;
        };
        if part.contains("repl") {
            metrics.replies = value;
        } else if part.contains("repost") || part.contains("retweet") {
            metrics.reposts = value;
        } else if part.contains("like") {
            metrics.likes = value;
        } else if part.contains("view") {
            metrics.views = value;
        } else if part.contains("bookmark") {
            metrics.bookmarks = value;
        }
    }
}

/// Parses counts like `42`, `1.2k`, `3M` or `1B`.
pub fn parse_count(token: &str) -> Option<u64> {
    let token = token.trim().to_lowercase();
    let (number, scale) = match token.chars().last()? {
        'k' => (&token[..token.len() - 1], 1e3),
        'm' => (&token[..token.len() - 1], 1e6),
        'b' => (&token[..token.len() - 1], 1e9),
        _ => (token.as_str(), 1.0),
    };
    let value: f64 = number.replace(',', "").parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| (value * scale).round() as u64)
}

/// Normalises containers on up to `workers` blocking threads.
///
/// Containers that fail to parse are logged and dropped; skipped containers
/// produce nothing. Output follows input order.
#[instrument(skip(normalizer, containers), fields(count = containers.len()))]
pub async fn normalize_all(
    normalizer: Arc<dyn ContainerNormalizer>,
    containers: Vec<RawContainer>,
    workers: usize,
) -> Vec<CollectedItem> {
    stream::iter(containers)
        .map(|container| {
            let normalizer = Arc::clone(&normalizer);
            tokio::task::spawn_blocking(move || {
                let result = normalizer.normalize(&container);
                (container.id().clone(), result)
            })
        })
        .buffered(workers.max(1))
        .filter_map(|joined| async move {
            match joined {
                Ok((_, Ok(item))) => item,
                Ok((id, Err(e))) => {
                    warn!(id = %id, error = %e, "Failed to normalise container");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Normalisation worker failed");
                    None
                }
            }
        })
        .collect()
        .await
}
