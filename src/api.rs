//! Inbound surface consumed by the REST layer
//!
//! Thin orchestration over the store, the feed and the tracking cycle. The
//! HTTP routing itself lives outside this crate; these methods are the
//! contract it mounts.

use crate::aggregate::{hourly_travel_stats, WindowStats};
use crate::feed::{FeedClient, FeedError};
use crate::store::{RunStore, StoreError};
use crate::tracking::{LegDurations, TrackedRun, TrackingCycle};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
pub enum ApiError {
    Feed(FeedError),
    Store(StoreError),
    UnknownRun(String),
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::Feed(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Feed(e) => write!(f, "{}", e),
            ApiError::Store(e) => write!(f, "{}", e),
            ApiError::UnknownRun(id) => write!(f, "Cannot retrieve data for id {}", id),
        }
    }
}

impl std::error::Error for ApiError {}

/// A completed run with its derived travel times attached.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    #[serde(flatten)]
    pub run: TrackedRun,
    pub calculated_travel_time: LegDurations,
}

pub struct TrackerApi {
    store: Arc<dyn RunStore>,
    feed: Arc<dyn FeedClient>,
    tracker: Arc<TrackingCycle>,
}

impl TrackerApi {
    pub fn new(
        store: Arc<dyn RunStore>,
        feed: Arc<dyn FeedClient>,
        tracker: Arc<TrackingCycle>,
    ) -> Self {
        Self {
            store,
            feed,
            tracker,
        }
    }

    /// All runs currently in the tracking queue.
    pub async fn list_active(&self) -> Result<Vec<TrackedRun>, ApiError> {
        Ok(self.store.active_runs().await?)
    }

    /// All completed runs, ordered by departure, with leg durations.
    pub async fn list_completed(&self) -> Result<Vec<CompletedRun>, ApiError> {
        let runs = self.store.completed_runs().await?;
        Ok(runs
            .into_iter()
            .map(|run| CompletedRun {
                calculated_travel_time: run.travel_times(),
                run,
            })
            .collect())
    }

    /// Hourly travel-time statistics for a route; `None` when the route has
    /// no completed runs at all.
    pub async fn aggregate(
        &self,
        route: &str,
    ) -> Result<Option<BTreeMap<String, WindowStats>>, ApiError> {
        let runs = self.store.completed_runs_for_route(route).await?;
        if runs.is_empty() {
            return Ok(None);
        }
        Ok(Some(hourly_travel_stats(&runs)))
    }

    /// Raw upstream progress for a run, passed through untouched.
    pub async fn inspect(&self, run_id: &str) -> Result<Value, ApiError> {
        let raw = self.feed.run_progress_raw(run_id).await?;
        raw.get("payload")
            .filter(|payload| !payload.is_null())
            .cloned()
            .ok_or_else(|| ApiError::UnknownRun(run_id.to_string()))
    }

    /// Reset a run to pending and re-track it once in manual mode (no
    /// pacing, no broadcast events).
    pub async fn manual_refresh(&self, uid: &str) -> Result<(), ApiError> {
        log::info!("🔧 Launching manual data update on bus {}", uid);

        let row = self
            .store
            .reset(uid)
            .await?
            .ok_or_else(|| ApiError::UnknownRun(uid.to_string()))?;

        self.tracker.run_batch(&[row], true).await;
        Ok(())
    }
}
