use std::collections::HashMap;

use winnow::ascii::space0;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::graph_model::*;
use crate::sanitize::sanitize_id;

pub const COMMENT_MARKER: &str = "%%";
const HEADER_KEYWORDS: [&str; 2] = ["graph ", "flowchart "];

/// Parse diagram text into nodes and edges.
///
/// Parsing never fails: blank lines, `%%` comments and anything outside the
/// supported subset are skipped.
pub fn parse_graph(source: &str) -> ParsedGraph {
    let mut header: Option<String> = None;
    let mut nodes: Vec<Node> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::new();

    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }
        if is_header(line) {
            header = Some(line.to_string());
            continue;
        }

        let mut input = line;
        match graph_line(&mut input) {
            Ok(GraphLine::Edge(from, to)) => {
                let from_id = add_node(&mut nodes, &mut index, from);
                let to_id = add_node(&mut nodes, &mut index, to);
                edges.push(Edge {
                    id: format!("edge_{}", edges.len()),
                    from: from_id,
                    to: to_id,
                });
            }
            Ok(GraphLine::Node(decl)) => {
                add_node(&mut nodes, &mut index, decl);
            }
            Err(_) => tracing::trace!(line, "skipping unrecognized line"),
        }
    }

    let next_auto_index = next_auto_index(nodes.iter().map(|n| n.id.as_str()));
    ParsedGraph {
        header,
        nodes,
        edges,
        next_auto_index,
    }
}

/// `graph <direction>` or `flowchart <direction>`. A node that happens to be
/// named `graph` still parses as an edge.
fn is_header(line: &str) -> bool {
    HEADER_KEYWORDS.iter().any(|kw| line.starts_with(kw)) && !line.contains("-->")
}

/// First declaration of an id wins; later ones keep the earlier label.
fn add_node(nodes: &mut Vec<Node>, index: &mut HashMap<String, usize>, decl: NodeRef) -> String {
    let id = sanitize_id(decl.id);
    if !index.contains_key(&id) {
        let label = decl.label.unwrap_or_default();
        index.insert(id.clone(), nodes.len());
        nodes.push(Node::new(id.clone(), &label));
    }
    id
}

#[derive(Debug, PartialEq)]
struct NodeRef<'s> {
    id: &'s str,
    label: Option<String>,
}

#[derive(Debug, PartialEq)]
enum GraphLine<'s> {
    Edge(NodeRef<'s>, NodeRef<'s>),
    Node(NodeRef<'s>),
}

fn graph_line<'s>(input: &mut &'s str) -> winnow::Result<GraphLine<'s>> {
    let start = *input;
    if let Ok(line) = edge_line(input) {
        return Ok(line);
    }
    *input = start;
    node_line(input)
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn node_ref<'s>(input: &mut &'s str) -> winnow::Result<NodeRef<'s>> {
    let id = identifier.parse_next(input)?;
    let label = if input.starts_with('[') {
        Some(bracketed_label.parse_next(input)?)
    } else {
        None
    };
    Ok(NodeRef { id, label })
}

/// `[...]` with `\[`, `\]` and `\\` escapes. An unterminated bracket fails.
fn bracketed_label(input: &mut &str) -> winnow::Result<String> {
    "[".parse_next(input)?;
    let mut label = String::new();
    loop {
        let c: char = any.parse_next(input)?;
        match c {
            ']' => break,
            '\\' => {
                let next: char = any.parse_next(input)?;
                if !matches!(next, '\\' | '[' | ']') {
                    label.push('\\');
                }
                label.push(next);
            }
            _ => label.push(c),
        }
    }
    Ok(label.trim().to_string())
}

/// `<id>[<label>] --> <id>[<label>]`; anything after the target is ignored.
fn edge_line<'s>(input: &mut &'s str) -> winnow::Result<GraphLine<'s>> {
    let from = node_ref.parse_next(input)?;
    space0.parse_next(input)?;
    "-->".parse_next(input)?;
    space0.parse_next(input)?;
    let to = node_ref.parse_next(input)?;
    Ok(GraphLine::Edge(from, to))
}

/// `<id>[<label>]` and nothing else on the line.
fn node_line<'s>(input: &mut &'s str) -> winnow::Result<GraphLine<'s>> {
    let id = identifier.parse_next(input)?;
    let label = bracketed_label.parse_next(input)?;
    if !input.trim().is_empty() {
        return Err(ContextError::new());
    }
    *input = "";
    Ok(GraphLine::Node(NodeRef {
        id,
        label: Some(label),
    }))
}
