//! Authoritative node/edge/output state for a flow graph.
//!
//! `GraphStore` is a cloneable handle over shared graph state. Every
//! operation acquires the inner lock exactly once, so each mutation is
//! a single observable atomic step with respect to concurrent readers;
//! the lock is never held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{FlowError, Result};
use crate::types::{Capability, FlowEdge, FlowNode, FlowSnapshot, NodeId, NodeOutput, PropertyMap};

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    outputs: HashMap<NodeId, NodeOutput>,
}

/// An upstream dependency of a node, as seen at dispatch time.
#[derive(Debug, Clone)]
pub struct UpstreamInput {
    /// The source node's id.
    pub id: NodeId,
    /// The source node's display name.
    pub name: String,
    /// The source node's capability.
    pub capability: Capability,
    /// The source node's cached output, if it has one.
    pub output: Option<NodeOutput>,
}

/// Shared, atomically mutated flow graph state.
///
/// All mutation in the engine funnels through this store; the executor
/// and orchestrator receive it explicitly rather than reaching for
/// process-wide state.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of the given capability at a canvas position.
    ///
    /// The node starts empty: no name, no properties, no output.
    pub fn add_node(&self, capability: Capability, position: (f64, f64)) -> FlowNode {
        let node = FlowNode::new(capability, position);
        let mut state = self.write();
        state.nodes.push(node.clone());
        node
    }

    /// Rename a node.
    ///
    /// Fails with `DuplicateName` if another node already holds the
    /// name; in that case nothing is mutated.
    pub fn rename_node(&self, id: &str, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut state = self.write();

        if !name.is_empty()
            && state
                .nodes
                .iter()
                .any(|n| n.name == name && n.id != id)
        {
            return Err(FlowError::DuplicateName { name });
        }

        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        node.name = name;
        Ok(())
    }

    /// Replace a node's property mapping wholesale.
    pub fn set_properties(&self, id: &str, properties: PropertyMap) -> Result<()> {
        let mut state = self.write();
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        node.properties = properties;
        Ok(())
    }

    /// Connect two nodes with a dependency edge (target depends on source).
    ///
    /// Both endpoints must exist. An already-present source→target pair
    /// is returned as-is rather than duplicated.
    pub fn connect(&self, source: &str, target: &str) -> Result<FlowEdge> {
        let mut state = self.write();

        for endpoint in [source, target] {
            if !state.nodes.iter().any(|n| n.id == endpoint) {
                return Err(FlowError::NodeNotFound(endpoint.to_string()));
            }
        }

        if let Some(existing) = state
            .edges
            .iter()
            .find(|e| e.source == source && e.target == target)
        {
            return Ok(existing.clone());
        }

        let edge = FlowEdge::new(source, target);
        state.edges.push(edge.clone());
        Ok(edge)
    }

    /// Delete a set of nodes.
    ///
    /// Incident edges and cached outputs are removed in the same
    /// transaction.
    pub fn remove_nodes(&self, ids: &[NodeId]) {
        let mut state = self.write();
        state.nodes.retain(|n| !ids.contains(&n.id));
        state
            .edges
            .retain(|e| !ids.contains(&e.source) && !ids.contains(&e.target));
        for id in ids {
            state.outputs.remove(id);
        }
    }

    /// Read a node's cached output.
    pub fn output(&self, id: &str) -> Option<NodeOutput> {
        self.read().outputs.get(id).cloned()
    }

    /// Write a node's output cache entry.
    pub fn set_output(&self, id: &str, output: NodeOutput) {
        self.write().outputs.insert(id.to_string(), output);
    }

    /// Look up a node's cached output by its display name.
    ///
    /// Returns `None` both when no node holds the name and when the
    /// named node has not produced an output yet.
    pub fn output_by_name(&self, name: &str) -> Option<NodeOutput> {
        let state = self.read();
        let node = state.nodes.iter().find(|n| n.name == name)?;
        state.outputs.get(&node.id).cloned()
    }

    /// Clear the entire output cache (start of a fresh run).
    pub fn clear_outputs(&self) {
        self.write().outputs.clear();
    }

    /// Snapshot of the nodes in insertion order.
    pub fn nodes(&self) -> Vec<FlowNode> {
        self.read().nodes.clone()
    }

    /// Snapshot of the edges in insertion order.
    pub fn edges(&self) -> Vec<FlowEdge> {
        self.read().edges.clone()
    }

    /// Find a node by id.
    pub fn node(&self, id: &str) -> Option<FlowNode> {
        self.read().nodes.iter().find(|n| n.id == id).cloned()
    }

    /// Find a node by display name.
    pub fn node_by_name(&self, name: &str) -> Option<FlowNode> {
        self.read().nodes.iter().find(|n| n.name == name).cloned()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }

    /// The upstream dependencies of a node, with their cached outputs.
    ///
    /// Sources are collected in edge insertion order; the set is
    /// semantically unordered.
    pub fn upstream_inputs(&self, id: &str) -> Vec<UpstreamInput> {
        let state = self.read();
        state
            .edges
            .iter()
            .filter(|e| e.target == id)
            .filter_map(|e| {
                let node = state.nodes.iter().find(|n| n.id == e.source)?;
                Some(UpstreamInput {
                    id: node.id.clone(),
                    name: node.display_name().to_string(),
                    capability: node.capability,
                    output: state.outputs.get(&node.id).cloned(),
                })
            })
            .collect()
    }

    /// Reorder the nodes to match the given id sequence.
    ///
    /// Ids not present in the graph are ignored; nodes missing from the
    /// sequence keep their relative order after the reordered ones.
    pub fn set_sequence(&self, order: &[NodeId]) {
        let mut state = self.write();
        let mut reordered = Vec::with_capacity(state.nodes.len());
        for id in order {
            if let Some(pos) = state.nodes.iter().position(|n| &n.id == id) {
                reordered.push(state.nodes.remove(pos));
            }
        }
        reordered.append(&mut state.nodes);
        state.nodes = reordered;
    }

    /// Replace all edges with a linear chain over the current node order.
    pub fn connect_in_sequence(&self) {
        let mut state = self.write();
        if state.nodes.len() < 2 {
            state.edges.clear();
            return;
        }
        state.edges = state
            .nodes
            .windows(2)
            .map(|pair| FlowEdge::new(pair[0].id.clone(), pair[1].id.clone()))
            .collect();
    }

    /// Export the current node/edge state for persistence.
    pub fn export_snapshot(&self) -> FlowSnapshot {
        let state = self.read();
        FlowSnapshot {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
        }
    }

    /// Replace the node/edge state with a fetched snapshot.
    ///
    /// The snapshot is validated first: edges must reference present
    /// nodes and node names must be unique. The output cache is
    /// cleared.
    pub fn load_snapshot(&self, snapshot: FlowSnapshot) -> Result<()> {
        for edge in &snapshot.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !snapshot.nodes.iter().any(|n| &n.id == endpoint) {
                    return Err(FlowError::NodeNotFound(endpoint.clone()));
                }
            }
        }
        for (idx, node) in snapshot.nodes.iter().enumerate() {
            if !node.name.is_empty()
                && snapshot.nodes[..idx].iter().any(|n| n.name == node.name)
            {
                return Err(FlowError::DuplicateName {
                    name: node.name.clone(),
                });
            }
        }

        let mut state = self.write();
        state.nodes = snapshot.nodes;
        state.edges = snapshot.edges;
        state.outputs.clear();
        log::debug!(
            "Loaded snapshot with {} nodes and {} edges",
            state.nodes.len(),
            state.edges.len()
        );
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named_node(store: &GraphStore, capability: Capability, name: &str) -> FlowNode {
        let node = store.add_node(capability, (0.0, 0.0));
        store.rename_node(&node.id, name).unwrap();
        store.node(&node.id).unwrap()
    }

    #[test]
    fn test_add_node_starts_empty() {
        let store = GraphStore::new();
        let node = store.add_node(Capability::TextGeneration, (10.0, 20.0));

        assert!(node.name.is_empty());
        assert!(node.properties.is_empty());
        assert!(store.output(&node.id).is_none());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_rename_rejects_duplicates_without_mutating() {
        let store = GraphStore::new();
        let a = named_node(&store, Capability::TextGeneration, "alpha");
        let b = named_node(&store, Capability::AudioGeneration, "beta");

        let err = store.rename_node(&b.id, "alpha").unwrap_err();
        assert!(matches!(err, FlowError::DuplicateName { name } if name == "alpha"));

        // beta keeps its old name, alpha is untouched
        assert_eq!(store.node(&b.id).unwrap().name, "beta");
        assert_eq!(store.node(&a.id).unwrap().name, "alpha");
    }

    #[test]
    fn test_rename_to_own_name_is_allowed() {
        let store = GraphStore::new();
        let a = named_node(&store, Capability::TextGeneration, "alpha");
        store.rename_node(&a.id, "alpha").unwrap();
        assert_eq!(store.node(&a.id).unwrap().name, "alpha");
    }

    #[test]
    fn test_connect_validates_endpoints_and_dedupes() {
        let store = GraphStore::new();
        let a = store.add_node(Capability::TextGeneration, (0.0, 0.0));
        let b = store.add_node(Capability::AudioGeneration, (100.0, 0.0));

        let edge = store.connect(&a.id, &b.id).unwrap();
        let again = store.connect(&a.id, &b.id).unwrap();
        assert_eq!(edge.id, again.id);
        assert_eq!(store.edges().len(), 1);

        let err = store.connect(&a.id, "missing").unwrap_err();
        assert!(matches!(err, FlowError::NodeNotFound(_)));
    }

    #[test]
    fn test_remove_nodes_cascades() {
        let store = GraphStore::new();
        let a = store.add_node(Capability::TextGeneration, (0.0, 0.0));
        let b = store.add_node(Capability::AudioGeneration, (100.0, 0.0));
        store.connect(&a.id, &b.id).unwrap();
        store.set_output(&a.id, NodeOutput::success(json!("done")));

        store.remove_nodes(&[a.id.clone()]);

        assert!(store.node(&a.id).is_none());
        assert!(store.output(&a.id).is_none());
        assert!(store.edges().is_empty());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_output_by_name() {
        let store = GraphStore::new();
        let a = named_node(&store, Capability::TextGeneration, "intro");

        assert!(store.output_by_name("intro").is_none());
        assert!(store.output_by_name("missing").is_none());

        store.set_output(&a.id, NodeOutput::success(json!("Hi")));
        assert_eq!(
            store.output_by_name("intro"),
            Some(NodeOutput::success(json!("Hi")))
        );
    }

    #[test]
    fn test_sequence_reorder_and_chain() {
        let store = GraphStore::new();
        let a = store.add_node(Capability::TextGeneration, (0.0, 0.0));
        let b = store.add_node(Capability::ImageGeneration, (100.0, 0.0));
        let c = store.add_node(Capability::AudioGeneration, (200.0, 0.0));

        store.set_sequence(&[c.id.clone(), a.id.clone(), b.id.clone()]);
        store.connect_in_sequence();

        let ids: Vec<NodeId> = store.nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c.id.clone(), a.id.clone(), b.id.clone()]);

        let edges = store.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].source.as_str(), edges[0].target.as_str()), (c.id.as_str(), a.id.as_str()));
        assert_eq!((edges[1].source.as_str(), edges[1].target.as_str()), (a.id.as_str(), b.id.as_str()));
    }

    #[test]
    fn test_snapshot_round_trip_clears_outputs() {
        let store = GraphStore::new();
        let a = named_node(&store, Capability::TextGeneration, "alpha");
        let b = named_node(&store, Capability::AudioGeneration, "beta");
        store.connect(&a.id, &b.id).unwrap();
        store.set_output(&a.id, NodeOutput::success(json!("cached")));

        let snapshot = store.export_snapshot();

        let restored = GraphStore::new();
        restored.load_snapshot(snapshot).unwrap();
        assert_eq!(restored.node_count(), 2);
        assert_eq!(restored.edges().len(), 1);
        assert!(restored.output(&a.id).is_none());
    }

    #[test]
    fn test_load_snapshot_rejects_dangling_edges() {
        let store = GraphStore::new();
        let snapshot = FlowSnapshot {
            nodes: vec![FlowNode::new(Capability::TextGeneration, (0.0, 0.0))],
            edges: vec![FlowEdge::new("ghost", "ghost2")],
        };

        let err = store.load_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, FlowError::NodeNotFound(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upstream_inputs() {
        let store = GraphStore::new();
        let image = named_node(&store, Capability::ImageGeneration, "frames");
        let audio = named_node(&store, Capability::AudioGeneration, "narration");
        let video = store.add_node(Capability::VideoComposition, (200.0, 0.0));
        store.connect(&image.id, &video.id).unwrap();
        store.connect(&audio.id, &video.id).unwrap();
        store.set_output(&image.id, NodeOutput::success(json!(["a.png"])));

        let inputs = store.upstream_inputs(&video.id);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].capability, Capability::ImageGeneration);
        assert!(inputs[0].output.is_some());
        assert!(inputs[1].output.is_none());
    }
}
