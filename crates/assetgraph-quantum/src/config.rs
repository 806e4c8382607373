//! Pass configuration.

use serde::{Deserialize, Serialize};

/// Knobs shared by the traversal passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantumConfig {
    /// Deepest object nesting a visitor will enter before failing.
    pub max_depth: usize,
    /// Mint item ids for unassigned slots during path conversion. When off,
    /// such slots are addressed by their raw index.
    pub mint_item_ids: bool,
    /// Treat two objects sharing an identifier as a hard error. When off, the
    /// collision is logged and the later object wins.
    pub strict_identifiers: bool,
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self {
            max_depth: 4096,
            mint_item_ids: true,
            strict_identifiers: true,
        }
    }
}

impl QuantumConfig {
    /// Parse a JSON config; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
