//! Fire-and-forget run event broadcasting
//!
//! Events accompany lifecycle transitions and are best-effort: publishing
//! never blocks and never fails the transition it follows. Listeners that
//! lag simply miss events; there is no backlog.

use crate::tracking::TrackedRun;
use tokio::sync::broadcast;

/// Named run lifecycle events consumed by live listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEventKind {
    Discovered,
    Updated,
    Removed,
    Completed,
}

impl RunEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEventKind::Discovered => "run-discovered",
            RunEventKind::Updated => "run-updated",
            RunEventKind::Removed => "run-removed",
            RunEventKind::Completed => "run-completed",
        }
    }
}

/// A lifecycle event carrying the full row it refers to.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub kind: RunEventKind,
    pub run: TrackedRun,
}

/// Fire-and-forget event publication.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: RunEvent);
}

/// Broadcast-channel sink; the realtime layer subscribes for delivery to
/// connected sessions.
pub struct BroadcastEventSink {
    tx: broadcast::Sender<RunEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: RunEvent) {
        // A send with no live receivers is fine; delivery is best-effort
        let _ = self.tx.send(event);
    }
}

/// Sink that drops everything; used by manual refreshes and tests.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: RunEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> TrackedRun {
        TrackedRun {
            uid: "100120250806".to_string(),
            bus_id: "1001".to_string(),
            origin: None,
            destination: None,
            via: None,
            departure: None,
            arrival: None,
            intermediate_1: None,
            intermediate_2: None,
            intermediate_3: None,
            suppressed: false,
            unreliable: false,
            route: "PI20A".to_string(),
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(RunEventKind::Discovered.as_str(), "run-discovered");
        assert_eq!(RunEventKind::Updated.as_str(), "run-updated");
        assert_eq!(RunEventKind::Removed.as_str(), "run-removed");
        assert_eq!(RunEventKind::Completed.as_str(), "run-completed");
    }

    #[tokio::test]
    async fn test_broadcast_delivery() {
        let sink = BroadcastEventSink::new(16);
        let mut rx = sink.subscribe();

        sink.publish(RunEvent {
            kind: RunEventKind::Discovered,
            run: sample_run(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, RunEventKind::Discovered);
        assert_eq!(event.run.bus_id, "1001");
    }

    #[test]
    fn test_publish_without_listeners_does_not_panic() {
        let sink = BroadcastEventSink::new(1);
        sink.publish(RunEvent {
            kind: RunEventKind::Removed,
            run: sample_run(),
        });
    }
}
