//! Core types for flow graphs
//!
//! These types define the structure of a flow graph: typed nodes,
//! directed dependency edges, node outputs, and the snapshot shape
//! used for persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FlowError;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Heterogeneous user-supplied node properties (strings, numbers)
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// The closed set of generation capabilities a node can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Text generation (chat completion)
    TextGeneration,
    /// Image generation
    ImageGeneration,
    /// Audio generation (text to speech)
    AudioGeneration,
    /// Video composition from image and audio sources
    VideoComposition,
}

impl Capability {
    /// The wire tag for this capability
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TextGeneration => "text-generation",
            Capability::ImageGeneration => "image-generation",
            Capability::AudioGeneration => "audio-generation",
            Capability::VideoComposition => "video-composition",
        }
    }

    /// Get a human-readable label for this capability
    pub fn label(&self) -> &'static str {
        match self {
            Capability::TextGeneration => "Text Generation",
            Capability::ImageGeneration => "Image Generation",
            Capability::AudioGeneration => "Audio Generation",
            Capability::VideoComposition => "Video Composition",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-generation" => Ok(Capability::TextGeneration),
            "image-generation" => Ok(Capability::ImageGeneration),
            "audio-generation" => Ok(Capability::AudioGeneration),
            "video-composition" => Ok(Capability::VideoComposition),
            other => Err(FlowError::UnsupportedNodeType {
                node_type: other.to_string(),
            }),
        }
    }
}

/// The memoized result of a node's most recent execution
///
/// Serializes as the raw success value, or as `{"error": message}`
/// for a failed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeOutput {
    /// The node's last execution failed
    Failure {
        /// The failure message
        error: String,
    },
    /// The node's last execution succeeded
    Success(serde_json::Value),
}

impl NodeOutput {
    /// Create a success output
    pub fn success(value: serde_json::Value) -> Self {
        Self::Success(value)
    }

    /// Create a failure record
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error: message.into(),
        }
    }

    /// Whether this output records a failed execution
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The success value, if any
    pub fn success_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }

    /// The failure message, if any
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success(_) => None,
        }
    }

    /// The textual form substituted for a placeholder token
    ///
    /// Already-textual outputs substitute verbatim; everything else is
    /// serialized to its canonical JSON text.
    pub fn substitution_text(&self) -> String {
        match self {
            Self::Success(serde_json::Value::String(text)) => text.clone(),
            Self::Success(value) => value.to_string(),
            Self::Failure { error } => serde_json::json!({ "error": error }).to_string(),
        }
    }
}

/// A node instance in a flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Unique identifier, stable for the session
    pub id: NodeId,
    /// The capability this node invokes when executed
    pub capability: Capability,
    /// User-assigned display name, unique across the graph
    #[serde(default)]
    pub name: String,
    /// Property mapping supplied by the user or by prior generation
    #[serde(default)]
    pub properties: PropertyMap,
    /// Position on the canvas (x, y)
    pub position: (f64, f64),
}

impl FlowNode {
    /// Create an empty node with a generated id
    pub fn new(capability: Capability, position: (f64, f64)) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            capability,
            name: String::new(),
            properties: PropertyMap::new(),
            position,
        }
    }

    /// The name to show in user-facing messages
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed Node"
        } else {
            &self.name
        }
    }

    /// A string-valued property, if present
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// A directed dependency edge: target depends on source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node id
    pub source: NodeId,
    /// Target node id
    pub target: NodeId,
}

impl FlowEdge {
    /// Create an edge between two nodes
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
        }
    }
}

/// The node/edge state exchanged with the persistence collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    /// Nodes in insertion order
    pub nodes: Vec<FlowNode>,
    /// Edges in insertion order
    pub edges: Vec<FlowEdge>,
}
