//! Named flow storage with file persistence.
//!
//! The library keeps saved flows in memory for fast access, with
//! optional JSON file persistence (one file per flow) for durability
//! across restarts. The engine only needs a save entry point that
//! exports the current node/edge state and a load entry point that
//! replaces it with a fetched snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::FlowSnapshot;

/// A flow saved under a user-chosen name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFlow {
    /// The user-chosen flow name.
    pub name: String,
    /// The saved node/edge state.
    pub data: FlowSnapshot,
}

/// Metadata for a saved flow (for listing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFlowMetadata {
    pub name: String,
    pub node_count: usize,
}

/// In-memory flow library with optional file persistence.
///
/// # Example
///
/// ```ignore
/// use mediaflow_engine::FlowLibrary;
///
/// let mut library = FlowLibrary::with_persistence(".mediaflow/flows");
/// let count = library.load_from_disk()?;
/// println!("Loaded {} flows", count);
///
/// library.save_flow(SavedFlow { name, data: store.export_snapshot() })?;
/// ```
#[derive(Debug, Default)]
pub struct FlowLibrary {
    /// Saved flows, keyed by name.
    flows: HashMap<String, SavedFlow>,
    /// Optional path for file persistence.
    persist_path: Option<PathBuf>,
}

impl FlowLibrary {
    /// Create a new in-memory library without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library that persists to the given directory.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            flows: HashMap::new(),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load all saved flows from the persistence directory.
    ///
    /// Returns the number of flows loaded.
    pub fn load_from_disk(&mut self) -> Result<usize> {
        let Some(ref path) = self.persist_path else {
            return Ok(0);
        };

        if !path.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if file_path.extension().is_some_and(|e| e == "json") {
                let content = std::fs::read_to_string(&file_path)?;
                match serde_json::from_str::<SavedFlow>(&content) {
                    Ok(flow) => {
                        log::info!("Loaded flow '{}' from {:?}", flow.name, file_path);
                        self.flows.insert(flow.name.clone(), flow);
                        count += 1;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse flow from {:?}: {}", file_path, e);
                    }
                }
            }
        }
        Ok(count)
    }

    /// Save or update a flow.
    ///
    /// The flow is automatically persisted to disk if persistence is
    /// enabled.
    pub fn save_flow(&mut self, flow: SavedFlow) -> Result<()> {
        self.save_to_disk(&flow)?;
        self.flows.insert(flow.name.clone(), flow);
        Ok(())
    }

    /// Fetch a saved flow by name.
    pub fn get_flow(&self, name: &str) -> Option<&SavedFlow> {
        self.flows.get(name)
    }

    /// Remove a saved flow by name.
    ///
    /// Returns the removed flow if it existed.
    pub fn remove_flow(&mut self, name: &str) -> Result<Option<SavedFlow>> {
        self.delete_from_disk(name)?;
        Ok(self.flows.remove(name))
    }

    /// List all saved flows.
    pub fn list_flows(&self) -> Vec<SavedFlowMetadata> {
        self.flows
            .values()
            .map(|f| SavedFlowMetadata {
                name: f.name.clone(),
                node_count: f.data.nodes.len(),
            })
            .collect()
    }

    /// Check if a flow exists.
    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    fn save_to_disk(&self, flow: &SavedFlow) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        std::fs::create_dir_all(path)?;
        let file_path = path.join(format!("{}.json", file_stem(&flow.name)));
        let content = serde_json::to_string_pretty(flow)?;
        std::fs::write(&file_path, content)?;
        log::debug!("Saved flow '{}' to {:?}", flow.name, file_path);
        Ok(())
    }

    fn delete_from_disk(&self, name: &str) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let file_path = path.join(format!("{}.json", file_stem(name)));
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
            log::debug!("Deleted flow '{}' from {:?}", name, file_path);
        }
        Ok(())
    }
}

/// Flow names are user-chosen free text; keep file names tame.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
