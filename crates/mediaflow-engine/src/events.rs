//! Event types for streaming run progress
//!
//! Events are sent from the orchestrator to the frontend (or any
//! consumer) to report run progress, per-node completion, and errors.

use serde::{Deserialize, Serialize};

/// Trait for sending flow events
///
/// This abstracts over the transport mechanism (UI channel, mpsc,
/// etc.) so the engine can be used in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel
    /// closed)
    fn send(&self, event: FlowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during a flow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    /// A run started
    #[serde(rename_all = "camelCase")]
    RunStarted { run_id: String, node_count: usize },

    /// A node started resolving
    #[serde(rename_all = "camelCase")]
    NodeStarted {
        run_id: String,
        node_id: String,
        name: String,
    },

    /// A node completed successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        run_id: String,
        node_id: String,
        output: Option<serde_json::Value>,
    },

    /// A node failed
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: String,
        node_id: String,
        error: String,
    },

    /// The run completed successfully
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        run_id: String,
        nodes_completed: u32,
        execution_time_ms: u64,
    },

    /// The run halted on its first failure
    #[serde(rename_all = "camelCase")]
    RunFailed {
        run_id: String,
        failed_node: String,
        error: String,
    },
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: FlowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<FlowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<FlowEvent> {
        self.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FlowEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: FlowEvent) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(FlowEvent::RunStarted {
            run_id: "run-1".to_string(),
            node_count: 3,
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);

        match &events[0] {
            FlowEvent::RunStarted { run_id, node_count } => {
                assert_eq!(run_id, "run-1");
                assert_eq!(*node_count, 3);
            }
            _ => panic!("Expected RunStarted event"),
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let event = FlowEvent::NodeFailed {
            run_id: "run-1".to_string(),
            node_id: "n1".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"nodeFailed\""));
        assert!(json.contains("\"runId\":\"run-1\""));
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(FlowEvent::RunCompleted {
            run_id: "run-1".to_string(),
            nodes_completed: 1,
            execution_time_ms: 10,
        })
        .unwrap();
    }
}
