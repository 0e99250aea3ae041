//! Tracking engine - run lifecycle from discovery to arrival
//!
//! The engine is split into a pure decision layer and an effect layer:
//!
//! ```text
//! RideProgress snapshot
//!     ↓
//! transition::evaluate_snapshot()   (pure: checkpoints + outcome)
//!     ↓
//! TrackingCycle::process_run()      (effects: store writes, events, logs)
//! ```
//!
//! `DiscoveryCycle` registers new runs from stop snapshots and hands the
//! active batch to `TrackingCycle`, which paces itself across the batch to
//! respect the upstream rate budget.

pub mod checkpoints;
pub mod detector;
pub mod discovery;
pub mod pacing;
pub mod tracker;
pub mod transition;
pub mod types;

pub use checkpoints::{compute_checkpoints, terminal_arrival};
pub use detector::{ConsistencyDetector, ConsistencyVerdict};
pub use discovery::DiscoveryCycle;
pub use pacing::CyclePacer;
pub use tracker::TrackingCycle;
pub use transition::{evaluate_snapshot, SnapshotOutcome};
pub use types::{LegDurations, NewRun, ProgressCheckpoints, RunPhase, TrackedRun};
