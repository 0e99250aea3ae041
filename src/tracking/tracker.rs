//! Tracking cycle effect runner
//!
//! Walks the active batch strictly sequentially, fetches each run's live
//! progress, lets `transition::evaluate_snapshot` decide the outcome, and
//! applies it: store writes first, then events. Scheduled cycles pace
//! themselves across the batch; manual invocations are unpaced and silent.

use super::detector::ConsistencyDetector;
use super::pacing::CyclePacer;
use super::transition::{evaluate_snapshot, SnapshotOutcome};
use super::types::{local_day_start, ProgressCheckpoints, TrackedRun};
use crate::events::{EventSink, RunEvent, RunEventKind};
use crate::feed::{FeedClient, FeedError};
use crate::store::{RunStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum TrackError {
    Feed(FeedError),
    Store(StoreError),
}

impl From<FeedError> for TrackError {
    fn from(err: FeedError) -> Self {
        TrackError::Feed(err)
    }
}

impl From<StoreError> for TrackError {
    fn from(err: StoreError) -> Self {
        TrackError::Store(err)
    }
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::Feed(e) => write!(f, "{}", e),
            TrackError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrackError {}

/// Drives lifecycle transitions for the active batch.
pub struct TrackingCycle {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn RunStore>,
    events: Arc<dyn EventSink>,
    detector: ConsistencyDetector,
    pacer: CyclePacer,
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl TrackingCycle {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn RunStore>,
        events: Arc<dyn EventSink>,
        pacing_budget: Duration,
    ) -> Self {
        Self::with_now_fn(feed, store, events, pacing_budget, Box::new(Utc::now))
    }

    /// Like [`TrackingCycle::new`] with an injected clock, for tests.
    pub fn with_now_fn(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn RunStore>,
        events: Arc<dyn EventSink>,
        pacing_budget: Duration,
        now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        Self {
            feed,
            store,
            events,
            detector: ConsistencyDetector::with_defaults(),
            pacer: CyclePacer::new(pacing_budget),
            now_fn,
        }
    }

    /// Process a batch of runs.
    ///
    /// `manual` marks the out-of-band single-run invocation: no pacing
    /// delays and no broadcast events, whatever the outcome.
    pub async fn run_batch(&self, runs: &[TrackedRun], manual: bool) {
        if runs.is_empty() {
            log::info!("Tracking queue is empty. Skipping update job");
            return;
        }

        log::info!("🔄 Fetching updates for {} buses", runs.len());

        let delay = self.pacer.delay_between(runs.len());
        let started = Instant::now();

        for run in runs {
            if let Err(e) = self.process_run(run, manual).await {
                log::warn!("⚠️  Update failed for bus {}: {}", run.bus_id, e);
            }
            if !manual {
                tokio::time::sleep(delay).await;
            }
        }

        log::info!(
            "✅ Update for {} buses completed in {} ms",
            runs.len(),
            started.elapsed().as_millis()
        );
    }

    async fn process_run(&self, run: &TrackedRun, manual: bool) -> Result<(), TrackError> {
        let progress = self.feed.run_progress(&run.bus_id).await?;
        let now = (self.now_fn)();
        let day_start = local_day_start(now);

        match evaluate_snapshot(&progress, day_start, now, &self.detector) {
            SnapshotOutcome::ConnectionLost => {
                log::warn!(
                    "ISSUE - Connection with bus {} lost. Tracking has stopped.",
                    run.bus_id
                );
                if let Some(row) = self.store.disable(&run.uid).await? {
                    self.emit(manual, RunEventKind::Removed, row);
                }
            }

            SnapshotOutcome::Progressing { checkpoints } => {
                self.persist_checkpoints(run, &checkpoints, manual).await?;
            }

            SnapshotOutcome::IncompleteAtTerminal { checkpoints } => {
                self.persist_checkpoints(run, &checkpoints, manual).await?;
                log::warn!(
                    "ISSUE - Bus {} has incomplete data. Tracking has stopped.",
                    run.bus_id
                );
                if let Some(row) = self.store.disable(&run.uid).await? {
                    self.emit(manual, RunEventKind::Removed, row);
                }
            }

            SnapshotOutcome::Arrived {
                checkpoints,
                arrival,
                verdict,
            } => {
                self.persist_checkpoints(run, &checkpoints, manual).await?;

                if verdict.unreliable {
                    for reason in &verdict.reasons {
                        log::warn!(
                            "ISSUE - Bus {} {}, and has been flagged as unreliable",
                            run.bus_id,
                            reason
                        );
                    }
                    if let Some(row) = self.store.mark_unreliable(&run.uid).await? {
                        self.emit(manual, RunEventKind::Updated, row);
                    }
                }

                if let Some(row) = self.store.set_arrival(&run.uid, arrival).await? {
                    self.emit(manual, RunEventKind::Removed, row.clone());
                    self.emit(manual, RunEventKind::Completed, row);
                }

                log::info!(
                    "COMPLETED - Bus ID {} has reached its destination",
                    run.bus_id
                );
            }
        }

        Ok(())
    }

    async fn persist_checkpoints(
        &self,
        run: &TrackedRun,
        checkpoints: &ProgressCheckpoints,
        manual: bool,
    ) -> Result<(), TrackError> {
        if let Some(row) = self.store.update_checkpoints(&run.uid, checkpoints).await? {
            self.emit(manual, RunEventKind::Updated, row);
        }
        Ok(())
    }

    fn emit(&self, manual: bool, kind: RunEventKind, run: TrackedRun) {
        if !manual {
            self.events.publish(RunEvent { kind, run });
        }
    }
}
