//! Node resolution with memoization and dependency ordering.
//!
//! `NodeExecutor::resolve` computes a node's upstream closure, layers
//! it topologically, and executes layers leaf-first. Nodes within a
//! layer are independent and run concurrently; the executor joins them
//! all before the next layer proceeds. Results are memoized in the
//! store's output cache, so a node is invoked at most once per run no
//! matter how many dependents reference it.

use std::collections::{HashMap, HashSet, VecDeque};

use futures_util::future::join_all;
use serde_json::Value;

use crate::capability::CapabilityClient;
use crate::dispatch::dispatch;
use crate::error::{FlowError, Result};
use crate::resolver::resolve_properties;
use crate::store::GraphStore;
use crate::types::{FlowNode, NodeId, NodeOutput};

/// Executes single nodes against a graph store and a capability client.
pub struct NodeExecutor<'a> {
    store: &'a GraphStore,
    client: &'a dyn CapabilityClient,
}

impl<'a> NodeExecutor<'a> {
    /// Create an executor over the given store and client.
    pub fn new(store: &'a GraphStore, client: &'a dyn CapabilityClient) -> Self {
        Self { store, client }
    }

    /// Resolve a node to its output, executing its dependencies first.
    ///
    /// A populated cache entry is returned immediately without any
    /// invocation. On failure the failing node's cache entry records
    /// `{error: message}`, as do all of its still-unresolved dependents
    /// within the resolution, and the first error propagates to the
    /// caller.
    pub async fn resolve(&self, node_id: &str) -> Result<NodeOutput> {
        if let Some(cached) = self.store.output(node_id) {
            return Ok(cached);
        }

        let node = self
            .store
            .node(node_id)
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
        let (closure, layers) = self.dependency_layers(&node)?;

        for layer in &layers {
            let pending: Vec<FlowNode> = layer
                .iter()
                .filter(|id| self.store.output(id).is_none())
                .filter_map(|id| self.store.node(id))
                .collect();
            if pending.is_empty() {
                continue;
            }

            // Independent siblings; all joined before the next layer.
            let results = join_all(pending.iter().map(|n| self.execute_node(n))).await;

            let first_failure = pending
                .iter()
                .zip(results)
                .find_map(|(n, result)| result.err().map(|e| (n, e)));
            if let Some((failed, err)) = first_failure {
                self.mark_dependents_failed(&closure, &failed.id, &err.to_string());
                if failed.id == node.id {
                    return Err(err);
                }
                return Err(FlowError::UpstreamResolutionFailure {
                    node: node.display_name().to_string(),
                    dependency: failed.display_name().to_string(),
                    message: err.to_string(),
                });
            }
        }

        self.store
            .output(&node.id)
            .ok_or_else(|| FlowError::NodeNotFound(node.id.clone()))
    }

    /// Execute one node: substitute placeholders, dispatch, record.
    async fn execute_node(&self, node: &FlowNode) -> Result<Value> {
        let store = self.store.clone();
        let resolved = resolve_properties(&node.properties, |name| store.output_by_name(name));
        let upstream = self.store.upstream_inputs(&node.id);

        match dispatch(node, &resolved, &upstream, self.client).await {
            Ok(result) => {
                let mut merged = resolved;
                merged.insert("output".to_string(), result.clone());
                self.store.set_properties(&node.id, merged)?;
                self.store.set_output(&node.id, NodeOutput::success(result.clone()));
                Ok(result)
            }
            Err(err) => {
                log::warn!(
                    "Node '{}' failed: {}",
                    node.display_name(),
                    err
                );
                self.store.set_output(&node.id, NodeOutput::failure(err.to_string()));
                Err(err)
            }
        }
    }

    /// The node's upstream closure (itself included) layered with
    /// Kahn's algorithm, leaf layers first.
    ///
    /// Leftover nodes after layering mean a cycle; resolution fails
    /// before anything is invoked or cached.
    fn dependency_layers(&self, node: &FlowNode) -> Result<(HashSet<NodeId>, Vec<Vec<NodeId>>)> {
        let edges = self.store.edges();

        let mut closure: HashSet<NodeId> = HashSet::from([node.id.clone()]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([node.id.clone()]);
        while let Some(current) = queue.pop_front() {
            for edge in edges.iter().filter(|e| e.target == current) {
                if closure.insert(edge.source.clone()) {
                    queue.push_back(edge.source.clone());
                }
            }
        }

        let mut in_degree: HashMap<&str, usize> =
            closure.iter().map(|id| (id.as_str(), 0)).collect();
        for edge in &edges {
            if closure.contains(&edge.source) && closure.contains(&edge.target) {
                if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut remaining: Vec<NodeId> = closure.iter().cloned().collect();
        let mut layers: Vec<Vec<NodeId>> = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<NodeId> = remaining
                .iter()
                .filter(|id| in_degree.get(id.as_str()) == Some(&0))
                .cloned()
                .collect();
            if ready.is_empty() {
                return Err(FlowError::CyclicDependency {
                    node: node.display_name().to_string(),
                });
            }
            for id in &ready {
                for edge in edges.iter().filter(|e| &e.source == id) {
                    if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
            remaining.retain(|id| !ready.contains(id));
            layers.push(ready);
        }

        Ok((closure, layers))
    }

    /// Record the failure on every still-unresolved transitive
    /// dependent of `failed` within this resolution's closure.
    fn mark_dependents_failed(&self, closure: &HashSet<NodeId>, failed: &str, message: &str) {
        let edges = self.store.edges();
        let mut queue: VecDeque<NodeId> = VecDeque::from([failed.to_string()]);
        let mut seen: HashSet<NodeId> = HashSet::new();

        while let Some(current) = queue.pop_front() {
            for edge in edges.iter().filter(|e| e.source == current) {
                if closure.contains(&edge.target) && seen.insert(edge.target.clone()) {
                    queue.push_back(edge.target.clone());
                }
            }
        }

        for id in seen {
            if self.store.output(&id).is_none() {
                self.store.set_output(&id, NodeOutput::failure(message));
            }
        }
    }
}
