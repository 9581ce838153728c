pub mod collab;
pub mod config;
pub mod error;
pub mod graph_model;
pub mod graph_parser;
pub mod graph_serializer;
pub mod mode;
pub mod preview;
pub mod prompt;
pub mod sanitize;
pub mod sync;

use config::SyncConfig;
use graph_model::GraphStore;

/// One parse/serialize round trip with default settings.
pub fn canonicalize(input: &str) -> String {
    canonicalize_with_config(input, &SyncConfig::default())
}

pub fn canonicalize_with_config(input: &str, config: &SyncConfig) -> String {
    let parsed = graph_parser::parse_graph(input);
    let store = GraphStore::from_parsed(parsed, &config.default_header);
    graph_serializer::serialize_with_indent(&store, config.indent)
}
