//! Batch pacing against the upstream rate budget
//!
//! A scheduled cycle spreads its requests across a fixed wall-clock budget
//! instead of bursting them: with a 140 s budget and 70 active runs, the
//! cycle sleeps 2 s after each run. The delay is a plain computation so it
//! can be asserted without real sleeps.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct CyclePacer {
    budget: Duration,
}

impl CyclePacer {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// The pause inserted after each run of a batch; whole milliseconds,
    /// budget divided evenly by batch size.
    pub fn delay_between(&self, batch_size: usize) -> Duration {
        if batch_size == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.budget.as_millis() as u64 / batch_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_split_evenly() {
        let pacer = CyclePacer::new(Duration::from_secs(140));
        assert_eq!(pacer.delay_between(70), Duration::from_secs(2));
        assert_eq!(pacer.delay_between(1), Duration::from_secs(140));
    }

    #[test]
    fn test_division_floors_to_whole_millis() {
        let pacer = CyclePacer::new(Duration::from_secs(140));
        // 140000 / 3 = 46666.66 -> 46666 ms
        assert_eq!(pacer.delay_between(3), Duration::from_millis(46666));
    }

    #[test]
    fn test_empty_batch_has_no_delay() {
        let pacer = CyclePacer::new(Duration::from_secs(140));
        assert_eq!(pacer.delay_between(0), Duration::ZERO);
    }
}
