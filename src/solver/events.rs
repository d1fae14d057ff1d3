//! The Solver's event bus (4.6 "Emitted events", 5. "Event bus"): a
//! bounded `tokio::sync::broadcast` channel carrying one [`SolverEvent`]
//! per task state transition. A slow consumer never backpressures the
//! scheduler — a lagged receiver just misses events, counted rather than
//! surfaced as an error, per §5's "events for a slow consumer are dropped
//! with a counter increment."

use crate::core::model::ActionRef;
use crate::solver::TaskKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use uuid::Uuid;

/// One task state transition, as named in 4.6's "Emitted events".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// `{ts, sessionId, action: {kind,name,version}, task: kind, state, error?}`
/// from 4.6's "Emitted events".
#[derive(Debug, Clone)]
pub struct SolverEvent {
    pub ts: SystemTime,
    pub session_id: Uuid,
    pub action_ref: ActionRef,
    pub version: Option<String>,
    pub task_kind: TaskKind,
    pub state: TaskState,
    pub error: Option<String>,
}

/// The receiving end handed to logging/remote-stream consumers.
pub type EventReceiver = broadcast::Receiver<SolverEvent>;

/// A bounded, multi-consumer event bus. Cloning shares the same
/// underlying channel and drop counter.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SolverEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Build a bus with room for `capacity` buffered events per receiver
    /// before a slow consumer starts lagging.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe a new consumer. Each subscriber has its own lag buffer.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Publish an event. A `send` error only ever means "no subscribers
    /// are currently listening" (`broadcast` has no other failure mode
    /// for a sender) — never propagated, consistent with the scheduler
    /// never blocking on its consumers.
    pub fn publish(&self, event: SolverEvent) {
        if self.sender.send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total events published while no subscriber was attached. Lagged
    /// drops (a slow, but present, subscriber) are counted by the
    /// `broadcast` channel itself and surfaced to that subscriber as a
    /// `RecvError::Lagged` on its next `recv`; this counter only tracks
    /// the zero-subscriber case.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ActionKind;

    fn event() -> SolverEvent {
        SolverEvent {
            ts: SystemTime::now(),
            session_id: Uuid::nil(),
            action_ref: ActionRef::new(ActionKind::Build, "api"),
            version: Some("v-abc".to_string()),
            task_kind: TaskKind::Process,
            state: TaskState::Completed,
            error: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.task_kind, TaskKind::Process);
        assert_eq!(received.state, TaskState::Completed);
    }

    #[test]
    fn publish_with_no_subscribers_increments_dropped_count() {
        let bus = EventBus::new(8);
        bus.publish(event());
        assert_eq!(bus.dropped_count(), 1);
    }
}
