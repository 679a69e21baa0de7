//! Error types for the flow engine

use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur while editing or running a flow graph
#[derive(Debug, Error)]
pub enum FlowError {
    /// Another node already holds the requested name
    #[error("A node with the name '{name}' already exists")]
    DuplicateName { name: String },

    /// A prompt could not be parsed into a request list
    #[error("Node '{node}': invalid prompt format: {detail}")]
    InvalidPromptFormat { node: String, detail: String },

    /// A video-composition node is missing one of its sources
    #[error("Node '{node}': video composition requires both image and audio inputs (missing {missing} source)")]
    MissingCompositionInput {
        node: String,
        missing: &'static str,
    },

    /// A node type tag does not name a known capability
    #[error("Unsupported node type: {node_type}")]
    UnsupportedNodeType { node_type: String },

    /// The dependency graph contains a cycle
    #[error("Cyclic dependency detected while resolving node '{node}'")]
    CyclicDependency { node: String },

    /// An upstream dependency of this node failed to resolve
    #[error("Node '{node}': upstream node '{dependency}' failed: {message}")]
    UpstreamResolutionFailure {
        node: String,
        dependency: String,
        message: String,
    },

    /// Pre-flight validation rejected the graph before any invocation
    #[error("Pre-flight validation failed: {0}")]
    ValidationFailure(String),

    /// A node id does not exist in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A capability service call failed
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Create a service error with a message
    pub fn service(msg: impl Into<String>) -> Self {
        Self::ServiceError(msg.into())
    }

    /// Create a pre-flight validation error with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(msg.into())
    }
}
