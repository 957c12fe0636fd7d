//! Browser automation boundary.
//!
//! Concrete WebDriver or CDP sessions live outside this crate. Collection
//! only needs these few commands, which keeps it testable against a scripted
//! fake.

use crate::CollectError;
use async_trait::async_trait;
use derive_getters::Getters;
use derive_new::new;
use std::time::Duration;

/// A rendered element as seen by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Element {
    /// The element's `outerHTML`
    #[new(into)]
    outer_html: String,
    /// The element's rendered text
    #[new(into)]
    text: String,
}

/// Commands a browser session must support.
///
/// Sessions are not shared across threads; one flow drives one session.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Loads `url` in the current tab.
    async fn navigate(&self, url: &str) -> Result<(), CollectError>;

    /// All currently rendered elements matching a CSS selector.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Element>, CollectError>;

    /// Scrolls forward by a fraction of the viewport height.
    async fn scroll_by(&self, viewport_fraction: f64) -> Result<(), CollectError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), CollectError>;

    /// Types `text` into the first element matching `selector`.
    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), CollectError>;

    /// Waits up to `timeout` for `selector` to match. Returns whether it did.
    async fn wait_until(&self, selector: &str, timeout: Duration) -> Result<bool, CollectError>;
}
