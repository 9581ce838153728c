//! The synchronization controller: owns the graph store while graph mode is
//! live and keeps the serialized text, the preview pane and the canvas in
//! step with it.
//!
//! Every committed mutation re-serializes the store and fires the change
//! handler once. While a parsed document is being bulk-loaded, commits are
//! suppressed and a single consolidated one fires when the load finishes.

use std::rc::Rc;

use crate::collab::{DiagramRenderer, GraphCanvas, StringBuffer, TextBuffer};
use crate::config::SyncConfig;
use crate::graph_model::{GraphStore, Node};
use crate::graph_parser::parse_graph;
use crate::graph_serializer::serialize_with_indent;
use crate::preview::DiagramPreview;
use crate::prompt::Prompt;

pub const PREVIEW_ID_PREFIX: &str = "graph-preview";

const ADD_NODE_MESSAGE: &str = "Enter node name";
const EDIT_NODE_MESSAGE: &str = "Edit node name";
const SELF_LOOP_MESSAGE: &str = "Create a self-loop?";
const CLEAR_ALL_MESSAGE: &str = "Clear all nodes and edges?";

pub type ChangeHandler = Box<dyn FnMut(&str)>;

/// A structural edit requested by the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    AddNode,
    EditNode { id: String },
    AddEdge { from: String, to: String },
    DeleteNode { id: String },
    DeleteEdge { id: String },
    ClearAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The user cancelled a prompt or declined a confirmation.
    Cancelled,
    /// The edit referenced something that does not exist, or graph mode is
    /// not live.
    Rejected,
    /// No canvas is available; the editor is a read-only preview.
    ReadOnly,
}

pub struct SyncController {
    config: SyncConfig,
    store: GraphStore,
    text: String,
    preview_buffer: Box<dyn TextBuffer>,
    preview: DiagramPreview,
    renderer: Rc<dyn DiagramRenderer>,
    canvas: Option<Box<dyn GraphCanvas>>,
    prompt: Box<dyn Prompt>,
    on_change: Option<ChangeHandler>,
    loading: bool,
    active: bool,
}

impl SyncController {
    /// A controller without a canvas is degraded: read-only preview only.
    pub fn new(
        config: SyncConfig,
        renderer: Rc<dyn DiagramRenderer>,
        canvas: Option<Box<dyn GraphCanvas>>,
        prompt: Box<dyn Prompt>,
    ) -> Self {
        if canvas.is_none() {
            tracing::warn!("graph canvas unavailable, graph editor is read-only");
        }
        let store = GraphStore::new(&config.default_header);
        let text = config.default_header.clone();
        Self {
            config,
            store,
            preview_buffer: Box::new(StringBuffer::new(&text)),
            text,
            preview: DiagramPreview::new(PREVIEW_ID_PREFIX),
            renderer,
            canvas,
            prompt,
            on_change: None,
            loading: false,
            active: false,
        }
    }

    pub fn with_preview_buffer(mut self, mut buffer: Box<dyn TextBuffer>) -> Self {
        buffer.set_text(&self.text);
        self.preview_buffer = buffer;
        self
    }

    /// Register the single change subscriber, replacing any previous one.
    pub fn set_change_handler(&mut self, handler: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(handler));
    }

    pub fn clear_change_handler(&mut self) {
        self.on_change = None;
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Text as of the last commit (or the seed text in degraded mode).
    pub fn current_text(&self) -> &str {
        &self.text
    }

    pub fn preview(&self) -> &DiagramPreview {
        &self.preview
    }

    pub fn preview_text(&self) -> String {
        self.preview_buffer.text()
    }

    pub fn is_degraded(&self) -> bool {
        self.canvas.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Make the store authoritative, seeded from `source`.
    pub async fn enter_graph_mode(&mut self, source: &str) {
        if self.is_degraded() {
            self.show_read_only(source).await;
            return;
        }
        self.load_from_text(source).await;
        self.active = true;
        tracing::info!(
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "entered graph mode"
        );
    }

    /// Flatten the store into text one last time and deactivate it.
    pub fn exit_graph_mode(&mut self) -> String {
        if self.is_degraded() {
            return self.text.clone();
        }
        self.text = self.serialize();
        self.active = false;
        tracing::info!("left graph mode");
        self.text.clone()
    }

    /// Replace the store with the parsed `source`. Fires one change
    /// notification however many nodes and edges the text holds.
    pub async fn load_from_text(&mut self, source: &str) {
        if self.is_degraded() {
            self.show_read_only(source).await;
            return;
        }
        let parsed = parse_graph(source);
        let header = parsed
            .header
            .clone()
            .unwrap_or_else(|| self.config.default_header.clone());

        self.loading = true;
        self.store.begin_load(&header, parsed.next_auto_index);
        for node in parsed.nodes {
            self.insert_node(node);
        }
        for edge in &parsed.edges {
            self.insert_edge(&edge.from, &edge.to);
        }
        self.loading = false;

        tracing::debug!(
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "loaded graph from text"
        );
        self.commit();
        self.refresh_preview().await;

        if self.config.fit_on_load
            && self.store.node_count() > 0
            && let Some(canvas) = self.canvas.as_mut()
        {
            canvas.fit();
        }
    }

    /// Recentre the canvas on the whole graph.
    pub fn center(&mut self) {
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fit();
        }
    }

    /// Approve and apply a structural edit from the canvas.
    pub async fn apply(&mut self, gesture: Gesture) -> EditOutcome {
        if self.is_degraded() {
            return EditOutcome::ReadOnly;
        }
        if !self.active {
            tracing::debug!(?gesture, "ignoring edit outside graph mode");
            return EditOutcome::Rejected;
        }

        let outcome = match gesture {
            Gesture::AddNode => self.add_node().await,
            Gesture::EditNode { id } => self.edit_node(&id).await,
            Gesture::AddEdge { from, to } => self.add_edge(&from, &to).await,
            Gesture::DeleteNode { id } => {
                if self.store.remove_node(&id).is_some() {
                    self.commit();
                    EditOutcome::Applied
                } else {
                    EditOutcome::Rejected
                }
            }
            Gesture::DeleteEdge { id } => {
                if self.store.remove_edge(&id).is_some() {
                    self.commit();
                    EditOutcome::Applied
                } else {
                    EditOutcome::Rejected
                }
            }
            Gesture::ClearAll => self.clear_all().await,
        };

        if outcome == EditOutcome::Applied {
            self.refresh_preview().await;
        }
        outcome
    }

    /// Back to an empty document with the configured header.
    pub fn reset(&mut self) {
        self.store = GraphStore::new(&self.config.default_header);
        self.text = self.config.default_header.clone();
        self.preview_buffer.set_text(&self.text);
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.redraw(&[], &[]);
        }
        self.preview = DiagramPreview::new(PREVIEW_ID_PREFIX);
        self.loading = false;
        self.active = false;
    }

    /// Tear down, handing back the document as text.
    pub fn dispose(mut self) -> String {
        self.on_change = None;
        if self.active {
            self.exit_graph_mode()
        } else {
            self.text
        }
    }

    /// Degraded mode: mirror the text into the preview and render it.
    async fn show_read_only(&mut self, source: &str) {
        if !source.is_empty() {
            self.text = source.to_string();
        }
        tracing::warn!("graph canvas unavailable, showing read-only preview");
        self.preview_buffer.set_text(&self.text);
        self.refresh_preview().await;
    }

    async fn add_node(&mut self) -> EditOutcome {
        let default = self.config.node_label_for(self.store.next_node_index());
        let Some(label) = self.ask_label(ADD_NODE_MESSAGE, &default).await else {
            return EditOutcome::Cancelled;
        };
        let id = self.store.generate_node_id();
        tracing::debug!(%id, %label, "adding node");
        self.insert_node(Node::new(id, &label));
        EditOutcome::Applied
    }

    async fn edit_node(&mut self, id: &str) -> EditOutcome {
        let Some(current) = self.store.node(id).map(|n| n.label.clone()) else {
            return EditOutcome::Rejected;
        };
        let Some(label) = self.ask_label(EDIT_NODE_MESSAGE, &current).await else {
            return EditOutcome::Cancelled;
        };
        self.store.set_label(id, &label);
        self.commit();
        EditOutcome::Applied
    }

    async fn add_edge(&mut self, from: &str, to: &str) -> EditOutcome {
        if from.is_empty()
            || to.is_empty()
            || !self.store.contains_node(from)
            || !self.store.contains_node(to)
        {
            tracing::debug!(from, to, "dropping edge with missing endpoint");
            return EditOutcome::Rejected;
        }
        if from == to && !self.prompt.confirm(SELF_LOOP_MESSAGE).await {
            return EditOutcome::Cancelled;
        }
        if self.insert_edge(from, to) {
            EditOutcome::Applied
        } else {
            EditOutcome::Rejected
        }
    }

    async fn clear_all(&mut self) -> EditOutcome {
        if self.config.confirm_clear && !self.prompt.confirm(CLEAR_ALL_MESSAGE).await {
            return EditOutcome::Cancelled;
        }
        self.store.clear();
        self.commit();
        EditOutcome::Applied
    }

    /// Ask for a label; cancelled or blank input yields `None`.
    async fn ask_label(&mut self, message: &str, default: &str) -> Option<String> {
        let answer = self.prompt.request_text(message, default).await?;
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn insert_node(&mut self, node: Node) -> bool {
        let added = self.store.add_node(node);
        if added {
            self.commit();
        }
        added
    }

    fn insert_edge(&mut self, from: &str, to: &str) -> bool {
        let added = self.store.add_edge(from, to).is_some();
        if added {
            self.commit();
        }
        added
    }

    fn serialize(&self) -> String {
        serialize_with_indent(&self.store, self.config.indent)
    }

    /// Publish the store: serialize, mirror into the preview buffer, redraw
    /// the canvas, notify the subscriber. Suppressed during a bulk load.
    fn commit(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.text = self.serialize();
        self.preview_buffer.set_text(&self.text);
        if let Some(canvas) = self.canvas.as_mut() {
            let nodes: Vec<Node> = self.store.nodes().cloned().collect();
            canvas.redraw(&nodes, self.store.edges());
        }
        tracing::debug!(bytes = self.text.len(), "graph changed");
        if let Some(handler) = self.on_change.as_mut() {
            handler(&self.text);
        }
        true
    }

    async fn refresh_preview(&mut self) {
        let renderer = Rc::clone(&self.renderer);
        let text = self.text.clone();
        self.preview.refresh(renderer.as_ref(), &text).await;
    }
}
