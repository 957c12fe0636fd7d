//! Progress events emitted by long-running flows.
//!
//! Components report what they are doing through a [`ProgressSink`] instead
//! of driving a display directly, so the same flow runs headless, under a
//! terminal spinner, or behind a web UI.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Something a flow wants an observer to know about.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum ProgressEvent {
    /// A scroll pass finished
    #[display("Collected {} new items this pass ({} total)", new_items, total)]
    CollectionPass {
        /// Items first seen in this pass
        new_items: usize,
        /// Items collected so far
        total: usize,
    },
    /// No new content arrived for a while and an extra scroll was forced
    #[display("No new content for {}s, forcing a scroll", idle_secs)]
    ForcedScroll {
        /// Seconds since new content was last seen
        idle_secs: u64,
    },
    /// Collection ended
    #[display("Collection stopped ({}) with {} items", reason, total)]
    CollectionFinished {
        /// Why it stopped
        reason: String,
        /// Items collected
        total: usize,
    },
    /// A reply is being generated for an item
    #[display("Generating reply for {}", item_id)]
    GenerationStarted {
        /// Item identifier
        item_id: String,
    },
    /// Reply generation for an item finished
    #[display("Reply for {} finished with status {}", item_id, status)]
    GenerationFinished {
        /// Item identifier
        item_id: String,
        /// Resulting review status
        status: String,
    },
    /// A key was taken out of rotation
    #[display("Key …{} cooling down for {}s", key_suffix, secs)]
    KeyCooldown {
        /// Last four characters of the key
        key_suffix: String,
        /// Cooldown length
        secs: u64,
    },
    /// A review entry changed status
    #[display("Entry {} moved to {}", entry_id, status)]
    EntryStatus {
        /// Entry identifier
        entry_id: String,
        /// New status
        status: String,
    },
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    /// Publishes one event. Must not block.
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::CollectionPass { .. } | ProgressEvent::GenerationStarted { .. } => {
                debug!(%event, "progress")
            }
            ProgressEvent::KeyCooldown { .. } | ProgressEvent::ForcedScroll { .. } => {
                warn!(%event, "progress")
            }
            _ => info!(%event, "progress"),
        }
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(event);
    }
}
