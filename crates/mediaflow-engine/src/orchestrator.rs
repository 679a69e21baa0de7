//! Top-level run orchestration.
//!
//! The orchestrator validates the graph before any invocation is
//! issued, then walks the nodes strictly sequentially in their current
//! insertion order, delegating each to the executor. Dependency order
//! is honored inside `NodeExecutor::resolve`; the top-level ordering
//! deliberately follows the graph's own ordering rather than a
//! computed topological sort. The first failing node halts the run and
//! leaves every later node untouched.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityClient;
use crate::error::{FlowError, Result};
use crate::events::{EventSink, FlowEvent};
use crate::executor::NodeExecutor;
use crate::store::GraphStore;
use crate::types::{Capability, FlowNode};

/// Result of one execution pass over a flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Whether every node resolved successfully.
    pub success: bool,
    /// Display name of the first failing node, if any.
    pub failed_node: Option<String>,
    /// Error message of the first failure, if any.
    pub error: Option<String>,
    /// Number of top-level nodes that completed.
    pub nodes_completed: u32,
    /// Total run time in milliseconds.
    pub execution_time_ms: u64,
}

impl RunReport {
    /// Create a successful report.
    pub fn success(nodes_completed: u32, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            failed_node: None,
            error: None,
            nodes_completed,
            execution_time_ms,
        }
    }

    /// Create a failed report naming the first failing node.
    pub fn failure(
        failed_node: impl Into<String>,
        error: impl Into<String>,
        nodes_completed: u32,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            failed_node: Some(failed_node.into()),
            error: Some(error.into()),
            nodes_completed,
            execution_time_ms,
        }
    }
}

/// Runs a full execution pass over a flow graph.
pub struct RunOrchestrator<'a> {
    store: &'a GraphStore,
    client: &'a dyn CapabilityClient,
    event_sink: &'a dyn EventSink,
    run_id: String,
}

impl<'a> RunOrchestrator<'a> {
    /// Create an orchestrator with a generated run id.
    pub fn new(
        store: &'a GraphStore,
        client: &'a dyn CapabilityClient,
        event_sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            store,
            client,
            event_sink,
            run_id: format!("run-{}", uuid::Uuid::new_v4()),
        }
    }

    /// Set the run id.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Validate and execute the graph.
    ///
    /// Pre-flight failures return `Err(ValidationFailure)` before any
    /// invocation is issued. A node failure during the run halts the
    /// loop and is reported through the returned `RunReport`.
    pub async fn run(&self) -> Result<RunReport> {
        let nodes = self.store.nodes();
        preflight(&nodes)?;

        let start = Instant::now();
        // A run is a fresh pass; memoization applies within it only.
        self.store.clear_outputs();

        log::info!(
            "Run {} started over {} nodes",
            self.run_id,
            nodes.len()
        );
        self.emit(FlowEvent::RunStarted {
            run_id: self.run_id.clone(),
            node_count: nodes.len(),
        });

        let executor = NodeExecutor::new(self.store, self.client);
        let mut completed: u32 = 0;

        for node in &nodes {
            self.emit(FlowEvent::NodeStarted {
                run_id: self.run_id.clone(),
                node_id: node.id.clone(),
                name: node.display_name().to_string(),
            });

            match executor.resolve(&node.id).await {
                Ok(output) => {
                    completed += 1;
                    self.emit(FlowEvent::NodeCompleted {
                        run_id: self.run_id.clone(),
                        node_id: node.id.clone(),
                        output: output.success_value().cloned(),
                    });
                }
                Err(err) => {
                    let elapsed = start.elapsed().as_millis() as u64;
                    log::warn!(
                        "Run {} halted at node '{}': {}",
                        self.run_id,
                        node.display_name(),
                        err
                    );
                    self.emit(FlowEvent::NodeFailed {
                        run_id: self.run_id.clone(),
                        node_id: node.id.clone(),
                        error: err.to_string(),
                    });
                    self.emit(FlowEvent::RunFailed {
                        run_id: self.run_id.clone(),
                        failed_node: node.display_name().to_string(),
                        error: err.to_string(),
                    });
                    return Ok(RunReport::failure(
                        node.display_name(),
                        err.to_string(),
                        completed,
                        elapsed,
                    ));
                }
            }
        }

        let elapsed = start.elapsed().as_millis() as u64;
        log::info!("Run {} completed in {} ms", self.run_id, elapsed);
        self.emit(FlowEvent::RunCompleted {
            run_id: self.run_id.clone(),
            nodes_completed: completed,
            execution_time_ms: elapsed,
        });
        Ok(RunReport::success(completed, elapsed))
    }

    fn emit(&self, event: FlowEvent) {
        let _ = self.event_sink.send(event);
    }
}

/// Reject graphs that cannot run before any network call is issued.
///
/// Reports the first offending node's display name.
fn preflight(nodes: &[FlowNode]) -> Result<()> {
    if nodes.is_empty() {
        return Err(FlowError::validation(
            "the graph has no nodes; add at least one node before running",
        ));
    }

    for node in nodes {
        let required = match node.capability {
            Capability::TextGeneration | Capability::ImageGeneration => "prompt",
            Capability::AudioGeneration => "text",
            Capability::VideoComposition => continue,
        };
        if is_blank(node, required) {
            return Err(FlowError::validation(format!(
                "node '{}' has a blank required '{}' property",
                node.display_name(),
                required
            )));
        }
    }
    Ok(())
}

fn is_blank(node: &FlowNode, key: &str) -> bool {
    match node.properties.get(key) {
        None => true,
        Some(value) => value.as_str().is_some_and(|s| s.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullEventSink, VecEventSink};
    use crate::test_util::{RecordedCall, ScriptedClient};
    use serde_json::json;

    fn add_named(
        store: &GraphStore,
        capability: Capability,
        name: &str,
        properties: &[(&str, serde_json::Value)],
    ) -> FlowNode {
        let node = store.add_node(capability, (0.0, 0.0));
        store.rename_node(&node.id, name).unwrap();
        let map = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        store.set_properties(&node.id, map).unwrap();
        store.node(&node.id).unwrap()
    }

    #[tokio::test]
    async fn test_empty_graph_never_invokes() {
        let store = GraphStore::new();
        let client = ScriptedClient::default();
        let sink = NullEventSink;

        let err = RunOrchestrator::new(&store, &client, &sink)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ValidationFailure(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected_with_node_name() {
        let store = GraphStore::new();
        let client = ScriptedClient::default();
        let sink = NullEventSink;

        add_named(&store, Capability::TextGeneration, "T", &[("prompt", json!("ok"))]);
        add_named(&store, Capability::ImageGeneration, "frames", &[("prompt", json!("   "))]);

        let err = RunOrchestrator::new(&store, &client, &sink)
            .run()
            .await
            .unwrap_err();
        match err {
            FlowError::ValidationFailure(message) => {
                assert!(message.contains("frames"), "got: {}", message);
                assert!(message.contains("prompt"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_audio_text_rejected() {
        let store = GraphStore::new();
        let client = ScriptedClient::default();
        let sink = NullEventSink;

        add_named(&store, Capability::AudioGeneration, "narration", &[]);

        let err = RunOrchestrator::new(&store, &client, &sink)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ValidationFailure(m) if m.contains("narration")));
    }

    #[tokio::test]
    async fn test_full_run_resolves_dependencies_and_reports() {
        let store = GraphStore::new();
        let client = ScriptedClient::default().with_text_response(json!("Hi"));
        let sink = VecEventSink::new();

        let t = add_named(&store, Capability::TextGeneration, "T", &[("prompt", json!("hello"))]);
        let a = add_named(
            &store,
            Capability::AudioGeneration,
            "A",
            &[("text", json!("{T.output} world"))],
        );
        store.connect(&t.id, &a.id).unwrap();

        let report = RunOrchestrator::new(&store, &client, &sink)
            .with_run_id("run-test")
            .run()
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.nodes_completed, 2);

        let audio_call = client
            .calls()
            .into_iter()
            .find_map(|c| match c {
                RecordedCall::Audio(request) => Some(request),
                _ => None,
            })
            .unwrap();
        assert_eq!(audio_call.text, "Hi world");

        // exactly one output per node
        assert!(store.output(&t.id).is_some());
        assert!(store.output(&a.id).is_some());

        // events bracket the run in order
        let events = sink.events();
        assert!(matches!(events.first(), Some(FlowEvent::RunStarted { node_count: 2, .. })));
        assert!(matches!(events.last(), Some(FlowEvent::RunCompleted { nodes_completed: 2, .. })));
    }

    #[tokio::test]
    async fn test_first_failure_halts_remaining_queue() {
        let store = GraphStore::new();
        let client = ScriptedClient::default().failing_on(Capability::ImageGeneration);
        let sink = VecEventSink::new();

        let t = add_named(&store, Capability::TextGeneration, "T", &[("prompt", json!("a"))]);
        let frames =
            add_named(&store, Capability::ImageGeneration, "frames", &[("prompt", json!("b"))]);
        let narration =
            add_named(&store, Capability::AudioGeneration, "narration", &[("text", json!("c"))]);

        let report = RunOrchestrator::new(&store, &client, &sink)
            .run()
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.failed_node.as_deref(), Some("frames"));
        assert_eq!(report.nodes_completed, 1);

        // the failing node carries an error record; later nodes are untouched
        assert!(store.output(&t.id).is_some());
        assert!(store.output(&frames.id).unwrap().is_failure());
        assert!(store.output(&narration.id).is_none());
        assert_eq!(client.calls_for(Capability::AudioGeneration), 0);

        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, FlowEvent::RunFailed { failed_node, .. } if failed_node == "frames")));
    }

    #[tokio::test]
    async fn test_rerun_after_delete_ignores_removed_node() {
        let store = GraphStore::new();
        let client = ScriptedClient::default();
        let sink = NullEventSink;

        let t = add_named(&store, Capability::TextGeneration, "T", &[("prompt", json!("a"))]);
        let a = add_named(&store, Capability::AudioGeneration, "A", &[("text", json!("b"))]);
        store.connect(&t.id, &a.id).unwrap();

        RunOrchestrator::new(&store, &client, &sink).run().await.unwrap();
        assert!(store.output(&t.id).is_some());

        store.remove_nodes(&[t.id.clone()]);
        let report = RunOrchestrator::new(&store, &client, &sink).run().await.unwrap();

        assert!(report.success);
        assert_eq!(report.nodes_completed, 1);
        assert!(store.output(&t.id).is_none());
        // only A was invoked on the second run
        assert_eq!(client.calls_for(Capability::TextGeneration), 1);
        assert_eq!(client.calls_for(Capability::AudioGeneration), 2);
    }
}
