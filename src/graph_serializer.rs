use crate::graph_model::GraphStore;
use crate::sanitize::{escape_label, sanitize_id};

pub const DEFAULT_INDENT: usize = 4;

/// Write the store back as diagram text.
pub fn serialize(store: &GraphStore) -> String {
    serialize_with_indent(store, DEFAULT_INDENT)
}

/// Header first, then nodes in ascending id order, then edges in store
/// order. Edges with a missing endpoint are never written. No trailing
/// newline.
pub fn serialize_with_indent(store: &GraphStore, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::with_capacity(1 + store.node_count() + store.edge_count());
    lines.push(store.header().to_string());

    for node in store.nodes() {
        let label = if node.label.is_empty() { &node.id } else { &node.label };
        lines.push(format!(
            "{pad}{}[{}]",
            sanitize_id(&node.id),
            escape_label(label)
        ));
    }

    for edge in store.edges() {
        if !store.contains_node(&edge.from) || !store.contains_node(&edge.to) {
            tracing::debug!(edge = %edge.id, "dropping dangling edge");
            continue;
        }
        lines.push(format!(
            "{pad}{} --> {}",
            sanitize_id(&edge.from),
            sanitize_id(&edge.to)
        ));
    }

    lines.join("\n")
}
