//! The scroll-and-collect loop.
//!
//! [`Collector::collect_pass`] performs exactly one pass. [`CollectionRun`]
//! owns the termination policy: a target count, a stall counter, and a
//! wall-clock staleness timer that forces an extra scroll when a lazily
//! loading feed pauses without signalling the end.

use crate::{BrowserDriver, CollectConfig, CollectError, IdExtractor, RawContainer};
use derive_getters::Getters;
use rand::Rng;
use reverb_core::{NullSink, ProgressEvent, ProgressSink};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Counters returned by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct PassOutcome {
    /// Consecutive passes that found nothing new, including this one
    stall_count: u32,
    /// Scrolls issued so far
    scroll_count: u32,
    /// Items first seen in this pass
    new_items: usize,
}

/// One browser session plus the extractor for its page layout.
pub struct Collector<'a> {
    driver: &'a dyn BrowserDriver,
    extractor: &'a dyn IdExtractor,
    scroll_fraction: f64,
    settle_delay: Duration,
}

impl<'a> Collector<'a> {
    /// Creates a collector using `config`'s scroll distance and settle delay.
    pub fn new(
        driver: &'a dyn BrowserDriver,
        extractor: &'a dyn IdExtractor,
        config: &CollectConfig,
    ) -> Self {
        Self {
            driver,
            extractor,
            scroll_fraction: *config.scroll_fraction(),
            settle_delay: config.settle_delay(),
        }
    }

    /// Runs one pass: capture every rendered container not yet in `seen`,
    /// then scroll forward and let the page settle.
    ///
    /// Containers without an id are skipped. A failing container never
    /// aborts the pass; only driver failures are returned.
    #[instrument(skip_all, fields(seen = seen.len(), stall_count = stall_count, scroll_count = scroll_count))]
    pub async fn collect_pass(
        &self,
        accumulator: &mut Vec<RawContainer>,
        seen: &mut HashSet<String>,
        stall_count: u32,
        scroll_count: u32,
    ) -> Result<PassOutcome, CollectError> {
        let elements = self
            .driver
            .find_elements(self.extractor.container_selector())
            .await?;
        debug!(found = elements.len(), "Containers rendered");

        let mut new_items = 0;
        for element in &elements {
            let Some(identity) = self.extractor.extract(element) else {
                debug!(text = %preview(element.text()), "Container has no stable id");
                continue;
            };
            if seen.contains(&identity.id) {
                continue;
            }
            seen.insert(identity.id.clone());
            accumulator.push(RawContainer::from_element(identity, element));
            new_items += 1;
        }

        self.driver.scroll_by(self.scroll_fraction).await?;
        tokio::time::sleep(self.settle_delay).await;

        let stall_count = if new_items == 0 { stall_count + 1 } else { 0 };
        Ok(PassOutcome {
            stall_count,
            scroll_count: scroll_count + 1,
            new_items,
        })
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

/// Why a collection run ended.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum StopReason {
    /// The target count was reached
    #[display("target reached")]
    TargetReached,
    /// Too many consecutive passes found nothing
    #[display("no new content after {_0} passes")]
    Stalled(u32),
    /// The operator interrupted the run
    #[display("interrupted")]
    Interrupted,
    /// The browser stopped responding
    #[display("driver failure: {_0}")]
    DriverFailed(String),
}

/// Result of a collection run. Items gathered before the stop are kept.
#[derive(Debug, Clone, Getters)]
pub struct CollectionOutcome {
    /// Captured containers in discovery order
    containers: Vec<RawContainer>,
    /// Why the run stopped
    reason: StopReason,
    /// Passes performed
    passes: u32,
    /// Scrolls issued, including forced ones
    scrolls: u32,
}

impl CollectionOutcome {
    /// Consumes the outcome, returning the containers.
    pub fn into_containers(self) -> Vec<RawContainer> {
        self.containers
    }
}

#[derive(Debug, Default)]
struct RunState {
    containers: Vec<RawContainer>,
    seen: HashSet<String>,
    stall_count: u32,
    scroll_count: u32,
    passes: u32,
}

/// Drives passes until the target, a stall, or an interrupt.
pub struct CollectionRun<'a> {
    collector: Collector<'a>,
    config: CollectConfig,
    sink: Arc<dyn ProgressSink>,
}

impl<'a> CollectionRun<'a> {
    /// Creates a run over `driver`'s current page.
    pub fn new(
        driver: &'a dyn BrowserDriver,
        extractor: &'a dyn IdExtractor,
        config: CollectConfig,
    ) -> Self {
        Self {
            collector: Collector::new(driver, extractor, &config),
            config,
            sink: Arc::new(NullSink),
        }
    }

    /// Publishes progress to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs until a stop condition holds or `interrupt` resolves.
    ///
    /// Interrupting keeps everything collected so far.
    #[instrument(skip_all, fields(target = self.config.target_count()))]
    pub async fn run(&self, interrupt: impl Future<Output = ()>) -> CollectionOutcome {
        let mut state = RunState::default();
        let mut last_new_content = Instant::now();
        tokio::pin!(interrupt);

        let reason = loop {
            if state.seen.len() >= *self.config.target_count() {
                break StopReason::TargetReached;
            }
            if state.stall_count >= *self.config.max_stall_passes() {
                break StopReason::Stalled(state.stall_count);
            }

            let step = self.step(&mut state, &mut last_new_content);
            tokio::select! {
                _ = &mut interrupt => {
                    info!("Collection stopped manually");
                    break StopReason::Interrupted;
                }
                result = step => {
                    if let Err(e) = result {
                        warn!(error = %e, "Collection aborted by driver failure");
                        break StopReason::DriverFailed(e.to_string());
                    }
                }
            }
        };

        info!(collected = state.containers.len(), reason = %reason, "Collection finished");
        self.sink.emit(ProgressEvent::CollectionFinished {
            reason: reason.to_string(),
            total: state.containers.len(),
        });

        CollectionOutcome {
            containers: state.containers,
            reason,
            passes: state.passes,
            scrolls: state.scroll_count,
        }
    }

    async fn step(
        &self,
        state: &mut RunState,
        last_new_content: &mut Instant,
    ) -> Result<(), CollectError> {
        let outcome = self
            .collector
            .collect_pass(
                &mut state.containers,
                &mut state.seen,
                state.stall_count,
                state.scroll_count,
            )
            .await?;
        state.passes += 1;
        state.stall_count = outcome.stall_count;
        state.scroll_count = outcome.scroll_count;
        if outcome.new_items > 0 {
            *last_new_content = Instant::now();
        }
        self.sink.emit(ProgressEvent::CollectionPass {
            new_items: outcome.new_items,
            total: state.containers.len(),
        });

        let idle = last_new_content.elapsed();
        if idle > self.config.stale_after() {
            warn!(idle_secs = idle.as_secs(), "No new content, forcing a scroll");
            self.sink.emit(ProgressEvent::ForcedScroll {
                idle_secs: idle.as_secs(),
            });
            self.collector
                .driver
                .scroll_by(*self.config.scroll_fraction())
                .await?;
            state.scroll_count += 1;
            let jitter = rand::thread_rng().gen_range(2000..=4000);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
            *last_new_content = Instant::now();
            state.stall_count = 0;
        }

        tokio::time::sleep(self.config.pass_delay()).await;
        Ok(())
    }
}
