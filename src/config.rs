use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::graph_model::DEFAULT_HEADER;
use crate::graph_serializer::DEFAULT_INDENT;

const DEFAULT_NODE_LABEL: &str = "Node {n}";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncConfig {
    /// Header used when the text declares none.
    #[serde(default = "default_header")]
    pub default_header: String,
    #[serde(default = "default_indent")]
    pub indent: usize,
    /// Default offered by the add-node prompt; `{n}` becomes the next index.
    #[serde(default = "default_node_label")]
    pub new_node_label: String,
    #[serde(default = "default_true")]
    pub fit_on_load: bool,
    #[serde(default = "default_true")]
    pub confirm_clear: bool,
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}
fn default_indent() -> usize {
    DEFAULT_INDENT
}
fn default_node_label() -> String {
    DEFAULT_NODE_LABEL.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_header: default_header(),
            indent: default_indent(),
            new_node_label: default_node_label(),
            fit_on_load: true,
            confirm_clear: true,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn node_label_for(&self, index: u64) -> String {
        self.new_node_label.replace("{n}", &index.to_string())
    }
}
