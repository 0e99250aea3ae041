//! Core run types and time anchoring helpers

use chrono::{DateTime, Local, LocalResult, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked bus run, one row in the `buses` table.
///
/// Lifecycle state is not stored as a column; it is derived from the
/// nullable timestamps and the two flags via [`TrackedRun::phase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRun {
    /// Feed run id + calendar day (yyyymmdd); stable for one day's run.
    pub uid: String,
    /// Upstream feed identifier; not unique across days.
    pub bus_id: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub via: Option<String>,
    pub departure: Option<DateTime<Utc>>,
    pub arrival: Option<DateTime<Utc>>,
    pub intermediate_1: Option<DateTime<Utc>>,
    pub intermediate_2: Option<DateTime<Utc>>,
    pub intermediate_3: Option<DateTime<Utc>>,
    /// Cancelled upstream, or tracking abandoned.
    pub suppressed: bool,
    /// Timestamp-consistency checks failed; tracking continues.
    pub unreliable: bool,
    pub route: String,
}

/// Derived lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Inserted by discovery, no progress reported yet.
    Pending,
    /// At least one checkpoint populated, not yet arrived.
    Active,
    /// Arrival recorded; terminal.
    Completed,
    /// Cancelled or abandoned; terminal, never polled again.
    Disabled,
}

impl TrackedRun {
    /// Derive the lifecycle phase from the row.
    ///
    /// `suppressed` dominates everything, `arrival` marks completion, any
    /// populated checkpoint means the run is underway.
    pub fn phase(&self) -> RunPhase {
        if self.suppressed {
            RunPhase::Disabled
        } else if self.arrival.is_some() {
            RunPhase::Completed
        } else if self.departure.is_some()
            || self.intermediate_1.is_some()
            || self.intermediate_2.is_some()
            || self.intermediate_3.is_some()
        {
            RunPhase::Active
        } else {
            RunPhase::Pending
        }
    }

    /// Leg durations derived from the recorded checkpoints.
    pub fn travel_times(&self) -> LegDurations {
        LegDurations {
            total_travel_time: leg_minutes(self.departure, self.arrival),
            first_leg_travel_time: leg_minutes(self.departure, self.intermediate_1),
            second_leg_travel_time: leg_minutes(self.intermediate_1, self.intermediate_2),
            third_leg_travel_time: leg_minutes(self.intermediate_2, self.intermediate_3),
            final_leg_travel_time: leg_minutes(self.intermediate_3, self.arrival),
        }
    }
}

/// Insert payload for a freshly discovered run.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub uid: String,
    pub bus_id: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub via: Option<String>,
    pub suppressed: bool,
    pub route: String,
}

/// The four progress checkpoints computed from one ride snapshot.
///
/// Persisted as a single update; a later snapshot overwrites all four,
/// including back to null when the feed stops reporting a mark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressCheckpoints {
    pub departure: Option<DateTime<Utc>>,
    pub intermediate_1: Option<DateTime<Utc>>,
    pub intermediate_2: Option<DateTime<Utc>>,
    pub intermediate_3: Option<DateTime<Utc>>,
}

/// Travel times in whole minutes, zero when either endpoint is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegDurations {
    pub total_travel_time: i64,
    pub first_leg_travel_time: i64,
    pub second_leg_travel_time: i64,
    pub third_leg_travel_time: i64,
    pub final_leg_travel_time: i64,
}

/// Whole minutes from `from` to `to`, zero if either side is unknown.
pub fn leg_minutes(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> i64 {
    match (from, to) {
        (Some(from), Some(to)) => (to - from).num_minutes(),
        _ => 0,
    }
}

/// Midnight of the current local calendar day, as a UTC instant.
///
/// Progress marks arrive as seconds since local midnight; this is the
/// anchor they are added to.
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_day = now.with_timezone(&Local).date_naive();
    match local_day.and_time(NaiveTime::MIN).and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight falls into a DST gap; keep the raw instant
        LocalResult::None => now,
    }
}

/// Unique run id for one calendar day: feed run id + local yyyymmdd.
pub fn run_uid(feed_run_id: &str, now: DateTime<Utc>) -> String {
    format!("{}{}", feed_run_id, now.with_timezone(&Local).format("%Y%m%d"))
}
