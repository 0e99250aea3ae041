//! Checkpoint derivation from a ride's stop-progress list
//!
//! Four positions are sampled along the stop sequence: the first stop and
//! three marks at 1x, 2x, 3x of `stop_count / 4`. Short sequences produce
//! duplicate indices, which is accepted; the duplicate positions then carry
//! identical timestamps.

use super::types::ProgressCheckpoints;
use crate::feed::StopProgress;
use chrono::{DateTime, Duration, Utc};

/// Sample the four checkpoint positions and anchor known marks to the day.
pub fn compute_checkpoints(
    stops: &[StopProgress],
    day_start: DateTime<Utc>,
) -> ProgressCheckpoints {
    let interval = stops.len() / 4;
    let mark_at = |index: usize| {
        stops
            .get(index)
            .and_then(|stop| stop.effective_mark())
            .map(|seconds| day_start + Duration::seconds(seconds))
    };

    ProgressCheckpoints {
        departure: mark_at(0),
        intermediate_1: mark_at(interval),
        intermediate_2: mark_at(interval * 2),
        intermediate_3: mark_at(interval * 3),
    }
}

/// Arrival timestamp once the run has reached its destination.
///
/// The run counts as arrived when the last or second-to-last stop has a
/// known mark; the last stop's mark wins when both are present.
pub fn terminal_arrival(
    stops: &[StopProgress],
    day_start: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mark = |offset_from_end: usize| {
        stops
            .len()
            .checked_sub(offset_from_end)
            .and_then(|index| stops.get(index))
            .and_then(|stop| stop.effective_mark())
    };

    mark(1)
        .or_else(|| mark(2))
        .map(|seconds| day_start + Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap()
    }

    /// An 8-stop ride samples indices 0, 2, 4, 6.
    #[test]
    fn test_eight_stop_sampling() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[0] = StopProgress::with_mark(true, Some(100));
        stops[2] = StopProgress::with_mark(true, Some(9000));
        stops[4] = StopProgress::with_mark(true, Some(18000));
        stops[6] = StopProgress::with_mark(true, Some(27000));

        let checkpoints = compute_checkpoints(&stops, day_start());
        assert_eq!(
            checkpoints.departure,
            Some(day_start() + Duration::seconds(100))
        );
        assert_eq!(
            checkpoints.intermediate_1,
            Some(day_start() + Duration::seconds(9000))
        );
        assert_eq!(
            checkpoints.intermediate_2,
            Some(day_start() + Duration::seconds(18000))
        );
        assert_eq!(
            checkpoints.intermediate_3,
            Some(day_start() + Duration::seconds(27000))
        );
    }

    #[test]
    fn test_unpassed_stop_yields_null_checkpoint() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        // Mark present but stop not passed: must stay unknown
        stops[0] = StopProgress::with_mark(false, Some(100));

        let checkpoints = compute_checkpoints(&stops, day_start());
        assert_eq!(checkpoints.departure, None);
    }

    /// Fewer than four stops collapses every sampled index onto stop 0.
    #[test]
    fn test_short_sequence_duplicates_allowed() {
        let stops = vec![
            StopProgress::with_mark(true, Some(500)),
            StopProgress::with_mark(false, None),
            StopProgress::with_mark(false, None),
        ];

        let checkpoints = compute_checkpoints(&stops, day_start());
        let expected = Some(day_start() + Duration::seconds(500));
        assert_eq!(checkpoints.departure, expected);
        assert_eq!(checkpoints.intermediate_1, expected);
        assert_eq!(checkpoints.intermediate_2, expected);
        assert_eq!(checkpoints.intermediate_3, expected);
    }

    #[test]
    fn test_terminal_prefers_last_stop() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[6] = StopProgress::with_mark(true, Some(35000));
        stops[7] = StopProgress::with_mark(true, Some(36100));

        let arrival = terminal_arrival(&stops, day_start());
        assert_eq!(arrival, Some(day_start() + Duration::seconds(36100)));
    }

    #[test]
    fn test_terminal_falls_back_to_second_to_last() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[6] = StopProgress::with_mark(true, Some(35000));

        let arrival = terminal_arrival(&stops, day_start());
        assert_eq!(arrival, Some(day_start() + Duration::seconds(35000)));
    }

    #[test]
    fn test_no_terminal_mark_means_still_running() {
        let mut stops = vec![StopProgress::with_mark(false, None); 8];
        stops[0] = StopProgress::with_mark(true, Some(100));
        stops[4] = StopProgress::with_mark(true, Some(18000));

        assert_eq!(terminal_arrival(&stops, day_start()), None);
    }

    #[test]
    fn test_empty_stop_list() {
        let checkpoints = compute_checkpoints(&[], day_start());
        assert_eq!(checkpoints, ProgressCheckpoints::default());
        assert_eq!(terminal_arrival(&[], day_start()), None);
    }
}
