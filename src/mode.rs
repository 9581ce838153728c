use std::cell::RefCell;
use std::rc::Rc;

use crate::collab::{DiagramRenderer, TextBuffer};
use crate::preview::DiagramPreview;
use crate::sync::{EditOutcome, Gesture, SyncController};

pub const OUTPUT_ID_PREFIX: &str = "mermaid-diagram";

/// Which representation is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Text,
    Graph,
}

/// Switches between the text editor and the graph editor and routes the
/// graph's change notifications back into the text editor while graph mode
/// is live.
pub struct ModeController {
    mode: Mode,
    editor: Box<dyn TextBuffer>,
    output: DiagramPreview,
    renderer: Rc<dyn DiagramRenderer>,
    graph: SyncController,
    pending: Rc<RefCell<Option<String>>>,
}

impl ModeController {
    pub fn new(
        editor: Box<dyn TextBuffer>,
        mut graph: SyncController,
        renderer: Rc<dyn DiagramRenderer>,
    ) -> Self {
        let pending: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let inbox = Rc::clone(&pending);
        graph.set_change_handler(move |text| {
            *inbox.borrow_mut() = Some(text.to_string());
        });
        Self {
            mode: Mode::Text,
            editor,
            output: DiagramPreview::new(OUTPUT_ID_PREFIX),
            renderer,
            graph,
            pending,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn graph(&self) -> &SyncController {
        &self.graph
    }

    pub fn output(&self) -> &DiagramPreview {
        &self.output
    }

    /// Full document text, for saving.
    pub fn document_text(&self) -> String {
        self.editor.text()
    }

    /// Text mode → graph mode, seeding the store from the editor.
    pub async fn enter_graph_mode(&mut self) -> bool {
        if self.mode == Mode::Graph {
            return false;
        }
        self.mode = Mode::Graph;
        let source = self.editor.text();
        tracing::info!("switching to graph mode");
        self.graph.enter_graph_mode(&source).await;
        self.pump().await;
        true
    }

    /// Graph mode → text mode: flatten the store into the editor and render.
    pub async fn enter_text_mode(&mut self) -> bool {
        if self.mode == Mode::Text {
            return false;
        }
        self.mode = Mode::Text;
        tracing::info!("switching to text mode");
        let text = self.graph.exit_graph_mode();
        self.pending.borrow_mut().take();
        self.editor.set_text(&text);
        self.refresh_output().await;
        true
    }

    /// Forward a canvas gesture. The canvas is hidden in text mode, so
    /// gestures there are rejected.
    pub async fn apply(&mut self, gesture: Gesture) -> EditOutcome {
        if self.mode != Mode::Graph {
            return EditOutcome::Rejected;
        }
        let outcome = self.graph.apply(gesture).await;
        self.pump().await;
        outcome
    }

    pub fn center(&mut self) {
        self.graph.center();
    }

    /// The editor lost focus: re-render from its text.
    pub async fn on_editor_blur(&mut self) {
        self.refresh_output().await;
    }

    pub async fn refresh_output(&mut self) {
        let source = self.editor.text();
        let renderer = Rc::clone(&self.renderer);
        self.output.refresh(renderer.as_ref(), &source).await;
    }

    /// Start an empty document.
    pub async fn new_document(&mut self) {
        self.open_document("").await;
    }

    /// Replace the document, e.g. after a file was opened. In graph mode the
    /// store is reloaded from it.
    pub async fn open_document(&mut self, text: &str) {
        self.editor.set_text(text);
        if self.mode == Mode::Graph {
            self.graph.load_from_text(text).await;
            self.pump().await;
        }
    }

    /// Apply the latest graph change to the editor and output pane. Changes
    /// arriving outside graph mode are dropped.
    async fn pump(&mut self) {
        let Some(text) = self.pending.borrow_mut().take() else {
            return;
        };
        if self.mode != Mode::Graph {
            return;
        }
        self.editor.set_text(&text);
        self.refresh_output().await;
    }
}
