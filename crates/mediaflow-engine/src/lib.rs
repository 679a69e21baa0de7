//! Flow Engine - node graph execution for generative-media flows
//!
//! This crate is the execution core of a visual flow builder: a graph
//! of typed nodes (text, image, audio, video composition) connected by
//! directed dependency edges. It supports:
//!
//! - Atomic shared graph state with unique node names
//! - `{nodeName.output}` placeholder substitution into properties
//! - Capability-keyed request construction behind a client trait
//! - Memoized, dependency-ordered node resolution with cycle detection
//! - Sequential run orchestration with pre-flight validation
//! - Named flow persistence (save / list / fetch)
//!
//! # Architecture
//!
//! The `GraphStore` owns all mutable state; `NodeExecutor` resolves a
//! single node (and its upstream closure) against a `CapabilityClient`;
//! `RunOrchestrator` drives one validated pass over the whole graph and
//! streams progress through an `EventSink`.
//!
//! # Example
//!
//! ```ignore
//! use mediaflow_engine::{Capability, GraphStore, NullEventSink, RunOrchestrator};
//!
//! let store = GraphStore::new();
//! let node = store.add_node(Capability::TextGeneration, (0.0, 0.0));
//! store.rename_node(&node.id, "intro")?;
//!
//! let report = RunOrchestrator::new(&store, &client, &NullEventSink)
//!     .run()
//!     .await?;
//! ```

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod executor;
pub mod library;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export key types
pub use capability::{
    AudioRequest, AudioSource, CapabilityClient, ImagePrompt, TextRequest, VideoRequest,
};
pub use error::{FlowError, Result};
pub use events::{EventSink, FlowEvent, NullEventSink, VecEventSink};
pub use executor::NodeExecutor;
pub use library::{FlowLibrary, SavedFlow, SavedFlowMetadata};
pub use orchestrator::{RunOrchestrator, RunReport};
pub use resolver::{resolve_placeholders, resolve_properties};
pub use store::{GraphStore, UpstreamInput};
pub use types::{
    Capability, EdgeId, FlowEdge, FlowNode, FlowSnapshot, NodeId, NodeOutput, PropertyMap,
};
