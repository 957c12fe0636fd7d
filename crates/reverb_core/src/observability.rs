//! Logging initialization and error summaries.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3}\s+.*?)(?:\.|\n|$)").expect("status pattern is valid"));

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set. Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init()
        .is_ok();

    if installed {
        debug!(verbose, "Logging initialized");
    }
}

/// Shortens an error message for non-verbose output.
///
/// Verbose mode returns the message unchanged. Otherwise the first
/// `NNN text` fragment (an HTTP-style status and its sentence) is returned
/// as `Error: NNN text`, falling back to the first line.
///
/// # Examples
///
/// ```
/// use reverb_core::observability::summarize_error;
///
/// let raw = "Request failed. 429 Too Many Requests. Retry later\nstack...";
/// assert_eq!(summarize_error(raw, false), "Error: 429 Too Many Requests");
/// assert_eq!(summarize_error("boom\ndetails", false), "boom");
/// assert_eq!(summarize_error("boom\ndetails", true), "boom\ndetails");
/// ```
pub fn summarize_error(message: &str, verbose: bool) -> String {
    if verbose {
        return message.to_string();
    }
    if let Some(captures) = STATUS_LINE.captures(message)
        && let Some(fragment) = captures.get(1)
    {
        return format!("Error: {}", fragment.as_str().trim());
    }
    message.lines().next().unwrap_or_default().trim().to_string()
}
