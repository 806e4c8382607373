//! On-disk asset documents.
//!
//! A document is one JSON file holding an object graph and the type
//! descriptors needed to classify its edges:
//!
//! ```json
//! { "types": { "Scene": { "name": "Scene", "reference_members": ["Selected"] } },
//!   "graph": { "objects": [ ... ], "root": 3 } }
//! ```

use anyhow::{Context, Result};
use assetgraph_quantum::QuantumConfig;
use assetgraph_reflect::{ObjectGraph, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetDocument {
    #[serde(default)]
    pub types: TypeRegistry,
    pub graph: ObjectGraph,
}

impl AssetDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing asset document {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<QuantumConfig> {
    let Some(path) = path else {
        return Ok(QuantumConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    QuantumConfig::from_json_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
