//! Event types and broadcast bus for pipeline diagnostics
//!
//! Components publish [`HerdEvent`]s on an [`EventBus`]; any number of
//! subscribers (CLI progress output, log forwarders, tests) receive every
//! event emitted after they subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Header,
    Coercion,
    Validation,
    Scoring,
    Pedigree,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Header => write!(f, "header"),
            Stage::Coercion => write!(f, "coercion"),
            Stage::Validation => write!(f, "validation"),
            Stage::Scoring => write!(f, "scoring"),
            Stage::Pedigree => write!(f, "pedigree"),
        }
    }
}

/// Events emitted by the herdbook pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HerdEvent {
    /// Human-readable, non-fatal warning
    Diagnostic {
        stage: Stage,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Ingestion batch accepted
    BatchAccepted {
        records: usize,
        diagnostics: usize,
        timestamp: DateTime<Utc>,
    },

    /// Ingestion batch rejected (schema or validation)
    BatchRejected {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Scoring epoch finished
    EpochCompleted {
        scored: usize,
        unscored: usize,
        donors: usize,
        intermediates: usize,
        recipients: usize,
        timestamp: DateTime<Utc>,
    },

    /// One pedigree prediction row failed
    PredictionRowFailed {
        target: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl HerdEvent {
    /// Convenience constructor for a diagnostic stamped with the current time
    pub fn diagnostic(stage: Stage, message: impl Into<String>) -> Self {
        HerdEvent::Diagnostic {
            stage,
            message: message.into(),
            timestamp: crate::time::now(),
        }
    }
}

/// Broadcast bus for [`HerdEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HerdEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<HerdEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: HerdEvent) -> Result<usize, broadcast::error::SendError<HerdEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: HerdEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(HerdEvent::diagnostic(Stage::Coercion, "could not normalize date"))
            .unwrap();

        match rx.recv().await.unwrap() {
            HerdEvent::Diagnostic { stage, message, .. } => {
                assert_eq!(stage, Stage::Coercion);
                assert_eq!(message, "could not normalize date");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails_but_lossy_does_not() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus
            .emit(HerdEvent::diagnostic(Stage::Header, "dropped column"))
            .is_err());
        bus.emit_lossy(HerdEvent::diagnostic(Stage::Header, "dropped column"));
        assert_eq!(bus.capacity(), 4);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = HerdEvent::BatchRejected {
            reason: "no recognizable schema".to_string(),
            timestamp: crate::time::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_rejected");
    }
}
