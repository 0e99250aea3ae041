//! Run discovery from stop-level feed snapshots

use super::tracker::TrackingCycle;
use super::types::{run_uid, NewRun};
use crate::events::{EventSink, RunEvent, RunEventKind};
use crate::feed::{FeedClient, FeedError};
use crate::store::{RunStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug)]
pub enum DiscoveryError {
    Feed(FeedError),
    Store(StoreError),
}

impl From<FeedError> for DiscoveryError {
    fn from(err: FeedError) -> Self {
        DiscoveryError::Feed(err)
    }
}

impl From<StoreError> for DiscoveryError {
    fn from(err: StoreError) -> Self {
        DiscoveryError::Store(err)
    }
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::Feed(e) => write!(f, "{}", e),
            DiscoveryError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Registers not-yet-tracked runs from the configured stops, then hands the
/// active batch to the tracking cycle.
pub struct DiscoveryCycle {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn RunStore>,
    events: Arc<dyn EventSink>,
    stops: Vec<String>,
    lookahead_minutes: u32,
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl DiscoveryCycle {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn RunStore>,
        events: Arc<dyn EventSink>,
        stops: Vec<String>,
        lookahead_minutes: u32,
    ) -> Self {
        Self::with_now_fn(
            feed,
            store,
            events,
            stops,
            lookahead_minutes,
            Box::new(Utc::now),
        )
    }

    /// Like [`DiscoveryCycle::new`] with an injected clock, for tests.
    pub fn with_now_fn(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn RunStore>,
        events: Arc<dyn EventSink>,
        stops: Vec<String>,
        lookahead_minutes: u32,
        now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        Self {
            feed,
            store,
            events,
            stops,
            lookahead_minutes,
            now_fn,
        }
    }

    /// One full discovery pass followed by a scheduled tracking batch.
    ///
    /// A failing stop never aborts the pass; a store failure while loading
    /// the tracking queue abandons only the tracking half.
    pub async fn run(&self, tracker: &TrackingCycle) {
        for stop_id in &self.stops {
            if let Err(e) = self.discover_stop(stop_id).await {
                log::warn!("⚠️  Discovery failed for stop {}: {}", stop_id, e);
            }
        }

        match self.store.active_runs().await {
            Ok(batch) => tracker.run_batch(&batch, false).await,
            Err(e) => log::error!("❌ Could not load the tracking queue: {}", e),
        }
    }

    async fn discover_stop(&self, stop_id: &str) -> Result<(), DiscoveryError> {
        let summaries = self
            .feed
            .stop_snapshot(stop_id, self.lookahead_minutes)
            .await?;

        let summaries: Vec<_> = summaries
            .into_iter()
            .filter(|summary| !summary.is_cancelled())
            .collect();

        if summaries.is_empty() {
            return Ok(());
        }

        log::info!("📥 Fetching data for stop ID {}", stop_id.to_uppercase());

        let now = (self.now_fn)();
        for summary in summaries {
            let new_run = NewRun {
                uid: run_uid(&summary.run_id, now),
                bus_id: summary.run_id,
                origin: summary.origin,
                destination: summary.destination,
                via: summary.via,
                suppressed: false,
                route: summary.route,
            };

            // None means the uid is already tracked; stay silent then
            if let Some(row) = self.store.insert_new(&new_run).await? {
                log::info!("➕ Adding {} to tracking queue", row.bus_id);
                self.events.publish(RunEvent {
                    kind: RunEventKind::Discovered,
                    run: row,
                });
            }
        }

        Ok(())
    }
}
