//! Timestamp-consistency checks for completed progress

use chrono::{DateTime, Duration, Utc};

/// Outcome of the consistency checks, with one diagnostic per failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyVerdict {
    pub unreliable: bool,
    pub reasons: Vec<String>,
}

/// Pure predicate over `(departure, arrival, now)`.
///
/// Flags a run when its departure is chronologically after its arrival, or
/// when the arrival sits implausibly far in the future. Both rules may fire
/// at once. Never mutates anything; callers persist the result.
pub struct ConsistencyDetector {
    lookahead_tolerance: Duration,
}

impl ConsistencyDetector {
    pub fn new(lookahead_tolerance: Duration) -> Self {
        Self {
            lookahead_tolerance,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Duration::minutes(10))
    }

    pub fn evaluate(
        &self,
        departure: DateTime<Utc>,
        arrival: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ConsistencyVerdict {
        let mut reasons = Vec::new();

        if departure > arrival {
            reasons.push("departure date is after the arrival date".to_string());
        }

        if arrival > now + self.lookahead_tolerance {
            reasons.push(format!(
                "arrival date is in more than {} minutes from now",
                self.lookahead_tolerance.num_minutes()
            ));
        }

        ConsistencyVerdict {
            unreliable: !reasons.is_empty(),
            reasons,
        }
    }
}
