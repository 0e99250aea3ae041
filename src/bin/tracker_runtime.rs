//! Tracker Runtime
//!
//! Wires the production collaborators together and runs the poll loop:
//! - SQLite run store (schema bootstrapped on startup)
//! - HTTPS feed client toward the upstream travel backend
//! - Broadcast event sink for the realtime layer
//! - Poll scheduler driving discovery + tracking
//!
//! Usage:
//!   cargo run --release --bin tracker_runtime
//!
//! Environment variables:
//!   TRACKED_STOPS      - comma-separated stop ids (required)
//!   BUSFLOW_DB_PATH    - SQLite database path
//!   FEED_BASE_URL      - upstream feed base URL
//!   POLL_INTERVAL_SECS - seconds between discovery passes (default: 180)
//!   PACING_BUDGET_SECS - tracking batch pacing budget (default: 140)
//!   LOOKAHEAD_MINUTES  - stop snapshot lookahead window (default: 10)

use busflow::events::{BroadcastEventSink, EventSink};
use busflow::feed::{FeedClient, HttpFeedClient};
use busflow::scheduler::poll_scheduler_task;
use busflow::store::{RunStore, SqliteRunStore};
use busflow::tracking::{DiscoveryCycle, TrackingCycle};
use busflow::TrackerConfig;
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚍 Busflow Tracker Runtime");

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration error: {}", e);
            return Err(e.into());
        }
    };

    info!("📊 Configuration:");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Feed: {}", config.feed_base_url);
    info!("   ├─ Stops: {}", config.stops.len());
    info!("   ├─ Poll interval: {}s", config.poll_interval_secs);
    info!("   └─ Pacing budget: {}s", config.pacing_budget_secs);

    let store: Arc<dyn RunStore> = Arc::new(SqliteRunStore::new(&config.db_path)?);
    let feed: Arc<dyn FeedClient> = Arc::new(HttpFeedClient::new(&config.feed_base_url)?);
    let events: Arc<dyn EventSink> = Arc::new(BroadcastEventSink::new(256));

    let tracker = Arc::new(TrackingCycle::new(
        feed.clone(),
        store.clone(),
        events.clone(),
        Duration::from_secs(config.pacing_budget_secs),
    ));

    let discovery = Arc::new(DiscoveryCycle::new(
        feed,
        store,
        events,
        config.stops.clone(),
        config.lookahead_minutes,
    ));

    tokio::spawn(poll_scheduler_task(
        discovery,
        tracker,
        Duration::from_secs(config.poll_interval_secs),
    ));

    info!("✅ Tracker running");
    info!("🔄 Press CTRL+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("✅ Tracker runtime stopped");

    Ok(())
}
