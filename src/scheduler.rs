//! Periodic poll loop
//!
//! One task owns the whole discovery + tracking pass and awaits it before
//! the next tick, so scheduled passes can never overlap. Manual refreshes
//! run outside this loop and rely on the store's row atomicity.

use crate::tracking::{DiscoveryCycle, TrackingCycle};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Run discovery + tracking on a fixed interval, forever.
pub async fn poll_scheduler_task(
    discovery: Arc<DiscoveryCycle>,
    tracker: Arc<TrackingCycle>,
    poll_interval: Duration,
) {
    log::info!(
        "⏰ Starting poll scheduler (interval: {}s)",
        poll_interval.as_secs()
    );

    let mut timer = interval(poll_interval);
    // A pass longer than the interval delays the next tick instead of
    // bursting to catch up
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;
        discovery.run(&tracker).await;
    }
}
