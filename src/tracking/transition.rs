//! Pure per-run transition logic
//!
//! One ride snapshot maps to exactly one outcome; the effect runner in
//! `tracker` turns the outcome into store writes and events. Keeping this
//! split makes the lifecycle rules testable without a store or broadcaster.

use super::checkpoints::{compute_checkpoints, terminal_arrival};
use super::detector::{ConsistencyDetector, ConsistencyVerdict};
use super::types::ProgressCheckpoints;
use crate::feed::RideProgress;
use chrono::{DateTime, Utc};

/// What one progress snapshot means for a tracked run.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// Upstream connection to the vehicle is gone; retire the run.
    ConnectionLost,
    /// Still underway; persist the refreshed checkpoints.
    Progressing { checkpoints: ProgressCheckpoints },
    /// Destination reached but no departure was ever recorded; the data is
    /// incomplete and the run is retired unfinished.
    IncompleteAtTerminal { checkpoints: ProgressCheckpoints },
    /// Destination reached with a usable departure; the run completes.
    Arrived {
        checkpoints: ProgressCheckpoints,
        arrival: DateTime<Utc>,
        verdict: ConsistencyVerdict,
    },
}

/// Evaluate one snapshot against the lifecycle rules.
///
/// `day_start` anchors the feed's seconds-since-midnight marks; `now` feeds
/// the consistency checks.
pub fn evaluate_snapshot(
    progress: &RideProgress,
    day_start: DateTime<Utc>,
    now: DateTime<Utc>,
    detector: &ConsistencyDetector,
) -> SnapshotOutcome {
    if !progress.is_active() {
        return SnapshotOutcome::ConnectionLost;
    }

    let checkpoints = compute_checkpoints(&progress.stops, day_start);

    match terminal_arrival(&progress.stops, day_start) {
        None => SnapshotOutcome::Progressing { checkpoints },
        Some(arrival) => match checkpoints.departure {
            None => SnapshotOutcome::IncompleteAtTerminal { checkpoints },
            Some(departure) => {
                let verdict = detector.evaluate(departure, arrival, now);
                SnapshotOutcome::Arrived {
                    checkpoints,
                    arrival,
                    verdict,
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{StopProgress, VEHICLE_ACTIVE_STATE};
    use chrono::{Duration, TimeZone};

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap()
    }

    fn active_ride(stops: Vec<StopProgress>) -> RideProgress {
        RideProgress {
            vehicle_state: VEHICLE_ACTIVE_STATE.to_string(),
            stops,
        }
    }

    #[test]
    fn test_inactive_vehicle_is_connection_lost() {
        let ride = RideProgress {
            vehicle_state: "OFF".to_string(),
            stops: vec![StopProgress::with_mark(true, Some(100)); 8],
        };

        let outcome = evaluate_snapshot(
            &ride,
            day_start(),
            day_start(),
            &ConsistencyDetector::with_defaults(),
        );
        assert_eq!(outcome, SnapshotOutcome::ConnectionLost);
    }

    #[test]
    fn test_mid_route_is_progressing() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[0] = StopProgress::with_mark(true, Some(100));
        stops[2] = StopProgress::with_mark(true, Some(3600));

        let outcome = evaluate_snapshot(
            &active_ride(stops),
            day_start(),
            day_start() + Duration::hours(1),
            &ConsistencyDetector::with_defaults(),
        );

        match outcome {
            SnapshotOutcome::Progressing { checkpoints } => {
                assert_eq!(
                    checkpoints.departure,
                    Some(day_start() + Duration::seconds(100))
                );
            }
            other => panic!("expected Progressing, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_without_departure_is_incomplete() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[7] = StopProgress::with_mark(true, Some(36100));

        let outcome = evaluate_snapshot(
            &active_ride(stops),
            day_start(),
            day_start() + Duration::hours(10),
            &ConsistencyDetector::with_defaults(),
        );

        assert!(matches!(
            outcome,
            SnapshotOutcome::IncompleteAtTerminal { .. }
        ));
    }

    /// The 8-stop ride with marks 100 s and 36100 s completes with a 600
    /// minute total leg.
    #[test]
    fn test_full_ride_arrives() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[0] = StopProgress::with_mark(true, Some(100));
        stops[7] = StopProgress::with_mark(true, Some(36100));

        let now = day_start() + Duration::seconds(36200);
        let outcome = evaluate_snapshot(
            &active_ride(stops),
            day_start(),
            now,
            &ConsistencyDetector::with_defaults(),
        );

        match outcome {
            SnapshotOutcome::Arrived {
                checkpoints,
                arrival,
                verdict,
            } => {
                let departure = checkpoints.departure.unwrap();
                assert_eq!(departure, day_start() + Duration::seconds(100));
                assert_eq!(arrival, day_start() + Duration::seconds(36100));
                assert_eq!((arrival - departure).num_minutes(), 600);
                assert!(!verdict.unreliable);
            }
            other => panic!("expected Arrived, got {:?}", other),
        }
    }

    #[test]
    fn test_arrival_far_in_future_is_flagged() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[0] = StopProgress::with_mark(true, Some(100));
        stops[7] = StopProgress::with_mark(true, Some(36100));

        // Snapshot evaluated long before the reported arrival instant
        let now = day_start() + Duration::seconds(3600);
        let outcome = evaluate_snapshot(
            &active_ride(stops),
            day_start(),
            now,
            &ConsistencyDetector::with_defaults(),
        );

        match outcome {
            SnapshotOutcome::Arrived { verdict, .. } => {
                assert!(verdict.unreliable);
                assert_eq!(verdict.reasons.len(), 1);
            }
            other => panic!("expected Arrived, got {:?}", other),
        }
    }
}
