//! Time-of-day travel-time aggregation
//!
//! Completed runs of a route are bucketed into 24 contiguous one-hour
//! windows by their departure's local time-of-day. Window keys are
//! day-agnostic ISO timestamps on the 1970-01-01 reference day, so
//! downstream consumers can treat them as pure times.

use crate::tracking::TrackedRun;
use chrono::{Local, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

pub const WINDOWS_PER_DAY: u32 = 24;

/// Travel-time statistics of one hourly window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub average_run_time: f64,
    pub total_run_time: i64,
    pub sample_size: u32,
}

fn window_key(hour: u32) -> String {
    format!("1970-01-01T{:02}:00:00.000Z", hour)
}

/// Bucket completed runs into hourly windows and compute per-window stats.
///
/// Runs without both endpoints and non-positive durations are discarded.
/// Every window is present in the output, zeroed when it collected no
/// samples; the caller decides what an entirely empty route means.
pub fn hourly_travel_stats(runs: &[TrackedRun]) -> BTreeMap<String, WindowStats> {
    let mut windows = BTreeMap::new();

    for hour in 0..WINDOWS_PER_DAY {
        let mut stats = WindowStats::default();

        for run in runs {
            let (departure, arrival) = match (run.departure, run.arrival) {
                (Some(departure), Some(arrival)) => (departure, arrival),
                _ => continue,
            };
            if departure.with_timezone(&Local).hour() != hour {
                continue;
            }

            let leg_duration = (arrival - departure).num_minutes();
            if leg_duration <= 0 {
                continue;
            }

            stats.sample_size += 1;
            stats.total_run_time += leg_duration;
        }

        if stats.sample_size > 0 {
            stats.average_run_time = stats.total_run_time as f64 / stats.sample_size as f64;
        }

        windows.insert(window_key(hour), stats);
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Local, TimeZone, Utc};

    /// A completed run departing at the given local wall-clock time.
    fn completed_run(uid: &str, hour: u32, minute: u32, duration_minutes: i64) -> TrackedRun {
        let departure: DateTime<Utc> = Local
            .with_ymd_and_hms(2025, 8, 6, hour, minute, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc);

        TrackedRun {
            uid: uid.to_string(),
            bus_id: uid.to_string(),
            origin: None,
            destination: None,
            via: None,
            departure: Some(departure),
            arrival: Some(departure + Duration::minutes(duration_minutes)),
            intermediate_1: None,
            intermediate_2: None,
            intermediate_3: None,
            suppressed: false,
            unreliable: false,
            route: "PI8A".to_string(),
        }
    }

    #[test]
    fn test_all_windows_present() {
        let windows = hourly_travel_stats(&[]);
        assert_eq!(windows.len(), 24);
        assert!(windows.contains_key("1970-01-01T00:00:00.000Z"));
        assert!(windows.contains_key("1970-01-01T23:00:00.000Z"));
        assert!(windows.values().all(|s| *s == WindowStats::default()));
    }

    #[test]
    fn test_runs_bucketed_by_departure_hour() {
        let runs = vec![
            completed_run("r1", 8, 10, 50),
            completed_run("r2", 8, 45, 70),
            completed_run("r3", 14, 0, 90),
        ];

        let windows = hourly_travel_stats(&runs);

        let morning = &windows["1970-01-01T08:00:00.000Z"];
        assert_eq!(morning.sample_size, 2);
        assert_eq!(morning.total_run_time, 120);
        assert_eq!(morning.average_run_time, 60.0);

        let afternoon = &windows["1970-01-01T14:00:00.000Z"];
        assert_eq!(afternoon.sample_size, 1);
        assert_eq!(afternoon.total_run_time, 90);
        assert_eq!(afternoon.average_run_time, 90.0);

        let empty = &windows["1970-01-01T03:00:00.000Z"];
        assert_eq!(empty.sample_size, 0);
        assert_eq!(empty.average_run_time, 0.0);
    }

    #[test]
    fn test_average_is_total_over_sample_size() {
        let runs = vec![
            completed_run("r1", 9, 0, 31),
            completed_run("r2", 9, 20, 40),
            completed_run("r3", 9, 40, 49),
        ];

        let windows = hourly_travel_stats(&runs);
        let stats = &windows["1970-01-01T09:00:00.000Z"];
        assert_eq!(stats.sample_size, 3);
        assert_eq!(stats.total_run_time, 120);
        assert_eq!(stats.average_run_time, 40.0);
    }

    #[test]
    fn test_non_positive_durations_discarded() {
        let mut backwards = completed_run("r1", 10, 0, 60);
        backwards.arrival = backwards.departure.map(|d| d - Duration::minutes(5));
        let zero = completed_run("r2", 10, 15, 0);
        let valid = completed_run("r3", 10, 30, 45);

        let windows = hourly_travel_stats(&[backwards, zero, valid]);
        let stats = &windows["1970-01-01T10:00:00.000Z"];
        assert_eq!(stats.sample_size, 1);
        assert_eq!(stats.total_run_time, 45);
    }

    #[test]
    fn test_runs_missing_endpoints_ignored() {
        let mut run = completed_run("r1", 11, 0, 60);
        run.arrival = None;

        let windows = hourly_travel_stats(&[run]);
        assert_eq!(windows["1970-01-01T11:00:00.000Z"].sample_size, 0);
    }
}
