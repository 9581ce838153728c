use std::collections::BTreeMap;

use crate::sanitize::normalize_label;

pub const DEFAULT_HEADER: &str = "graph TD";
pub const AUTO_ID_PREFIX: &str = "node_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
}

impl Node {
    /// An empty label falls back to the id.
    pub fn new(id: impl Into<String>, label: &str) -> Self {
        let id = id.into();
        let label = normalize_label(label);
        let label = if label.is_empty() { id.clone() } else { label };
        Self { id, label }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// Output of the text parser, before it is loaded into a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGraph {
    pub header: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub next_auto_index: u64,
}

/// Numeric suffix of an auto-generated id (`node_<n>`).
pub fn auto_index_of(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(AUTO_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Starting point for minting new auto ids: above every existing suffix and
/// above the node count.
pub fn next_auto_index<'a>(ids: impl IntoIterator<Item = &'a str>) -> u64 {
    let mut highest = 0u64;
    let mut count = 0u64;
    for id in ids {
        count += 1;
        if let Some(n) = auto_index_of(id) {
            highest = highest.max(n);
        }
    }
    highest.saturating_add(1).max(count + 1)
}

/// The authoritative node/edge collection while graph mode is live.
///
/// Nodes are keyed by id so iteration is already in serialization order.
/// Edges keep insertion order.
#[derive(Debug, Clone)]
pub struct GraphStore {
    header: String,
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    next_node_index: u64,
    next_edge_index: u64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER)
    }
}

impl GraphStore {
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_string(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            next_node_index: 1,
            next_edge_index: 0,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: &str) {
        self.header = header.trim().to_string();
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn next_node_index(&self) -> u64 {
        self.next_node_index
    }

    /// Returns false when the id is already taken.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        if let Some(n) = auto_index_of(&node.id) {
            self.next_node_index = self.next_node_index.max(n.saturating_add(1));
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn set_label(&mut self, id: &str, label: &str) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                *node = Node::new(id, label);
                true
            }
            None => false,
        }
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        self.edges.retain(|e| e.from != id && e.to != id);
        Some(node)
    }

    /// Appends an edge between two existing nodes and returns its id.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Option<String> {
        if !self.contains_node(from) || !self.contains_node(to) {
            return None;
        }
        let id = self.mint_edge_id();
        self.edges.push(Edge {
            id: id.clone(),
            from: from.to_string(),
            to: to.to_string(),
        });
        Some(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let pos = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(pos))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Mint a fresh `node_<n>` id. The existence check is authoritative; the
    /// counter only decides where the search starts.
    /// Once the counter is exhausted the lowest free index is used instead.
    pub fn generate_node_id(&mut self) -> String {
        while let Some(next) = self.next_node_index.checked_add(1) {
            let id = format!("{AUTO_ID_PREFIX}{}", self.next_node_index);
            self.next_node_index = next;
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
        let free = (1..=u64::MAX)
            .map(|n| format!("{AUTO_ID_PREFIX}{n}"))
            .find(|id| !self.nodes.contains_key(id));
        free.unwrap_or_else(|| format!("{AUTO_ID_PREFIX}0"))
    }

    /// Build a store from parsed text. Edges with a missing endpoint are
    /// dropped.
    pub fn from_parsed(parsed: ParsedGraph, default_header: &str) -> Self {
        let mut store = Self::new(default_header);
        let header = parsed.header.as_deref().unwrap_or(default_header);
        store.begin_load(header, parsed.next_auto_index);
        for node in parsed.nodes {
            store.add_node(node);
        }
        for edge in &parsed.edges {
            store.add_edge(&edge.from, &edge.to);
        }
        store
    }

    /// Empty the store ahead of a bulk load and reset its counters.
    pub fn begin_load(&mut self, header: &str, next_auto_index: u64) {
        self.clear();
        self.header = header.trim().to_string();
        self.next_node_index = next_auto_index.max(1);
        self.next_edge_index = 0;
    }

    fn mint_edge_id(&mut self) -> String {
        let id = format!("edge_{}", self.next_edge_index);
        self.next_edge_index += 1;
        id
    }
}
