use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::executor::block_on;
use mmsync::collab::{DiagramRenderer, GraphCanvas, HeadlessCanvas, StringBuffer};
use mmsync::config::SyncConfig;
use mmsync::error::RenderError;
use mmsync::graph_model::{Edge, Node};
use mmsync::mode::{Mode, ModeController};
use mmsync::prompt::{BlockingPrompt, ModalKind, ModalPrompt, Prompt};
use mmsync::sync::{EditOutcome, Gesture, SyncController};
use pretty_assertions::assert_eq;

struct FakeRenderer;

#[async_trait(?Send)]
impl DiagramRenderer for FakeRenderer {
    async fn render(&self, render_id: &str, source: &str) -> Result<String, RenderError> {
        if source.contains("broken") {
            return Err(RenderError::Syntax("Parse error on line 2".to_string()));
        }
        Ok(format!("<svg id=\"{render_id}\"/>"))
    }
}

/// Canvas that shares its drawing state with the test.
#[derive(Clone, Default)]
struct SharedCanvas(Rc<RefCell<HeadlessCanvas>>);

impl GraphCanvas for SharedCanvas {
    fn redraw(&mut self, nodes: &[Node], edges: &[Edge]) {
        self.0.borrow_mut().redraw(nodes, edges);
    }

    fn fit(&mut self) {
        self.0.borrow_mut().fit();
    }
}

fn sync_with(prompt: impl Prompt + 'static) -> (SyncController, SharedCanvas) {
    let canvas = SharedCanvas::default();
    let ctrl = SyncController::new(
        SyncConfig::default(),
        Rc::new(FakeRenderer),
        Some(Box::new(canvas.clone())),
        Box::new(prompt),
    );
    (ctrl, canvas)
}

fn count_changes(ctrl: &mut SyncController) -> Rc<RefCell<usize>> {
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    ctrl.set_change_handler(move |_| *sink.borrow_mut() += 1);
    count
}

fn mode_with(text: &str, canvas: Option<Box<dyn GraphCanvas>>) -> ModeController {
    let renderer: Rc<dyn DiagramRenderer> = Rc::new(FakeRenderer);
    let graph = SyncController::new(
        SyncConfig::default(),
        Rc::clone(&renderer),
        canvas,
        Box::new(BlockingPrompt::accepting()),
    );
    ModeController::new(Box::new(StringBuffer::new(text)), graph, renderer)
}

// =============================================================================
// Self-loops
// =============================================================================

#[test]
fn spec_self_loop_declined_leaves_edges_unchanged() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\nA[x]\n"));
    let outcome = block_on(ctrl.apply(Gesture::AddEdge {
        from: "A".into(),
        to: "A".into(),
    }));
    assert_eq!(outcome, EditOutcome::Cancelled);
    assert_eq!(ctrl.store().edge_count(), 0);
}

#[test]
fn spec_self_loop_confirmed_adds_one_edge() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::accepting());
    block_on(ctrl.enter_graph_mode("graph TD\nA[x]\n"));
    let outcome = block_on(ctrl.apply(Gesture::AddEdge {
        from: "A".into(),
        to: "A".into(),
    }));
    assert_eq!(outcome, EditOutcome::Applied);
    assert_eq!(ctrl.store().edge_count(), 1);
    let edge = &ctrl.store().edges()[0];
    assert_eq!(edge.from, edge.to);
    assert!(ctrl.current_text().ends_with("    A --> A"));
}

#[test]
fn spec_plain_edge_needs_no_confirmation() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\nA[x]\nB[y]\n"));
    let outcome = block_on(ctrl.apply(Gesture::AddEdge {
        from: "A".into(),
        to: "B".into(),
    }));
    assert_eq!(outcome, EditOutcome::Applied);
}

// =============================================================================
// Notifications
// =============================================================================

#[test]
fn spec_bulk_load_of_many_nodes_notifies_once() {
    let (mut ctrl, canvas) = sync_with(BlockingPrompt::declining());
    let changes = count_changes(&mut ctrl);
    let text: String = (1..=50).map(|i| format!("n{i} --> n{}\n", i + 1)).collect();
    block_on(ctrl.enter_graph_mode(&text));
    assert_eq!(ctrl.store().node_count(), 51);
    assert_eq!(*changes.borrow(), 1);
    assert_eq!(canvas.0.borrow().redraws, 1);
    assert_eq!(canvas.0.borrow().fits, 1);
}

#[test]
fn spec_empty_load_does_not_recenter() {
    let (mut ctrl, canvas) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\n"));
    assert_eq!(canvas.0.borrow().fits, 0);
}

#[test]
fn spec_center_fits_without_notifying() {
    let (mut ctrl, canvas) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\nA --> B\n"));
    let changes = count_changes(&mut ctrl);
    ctrl.center();
    assert_eq!(canvas.0.borrow().fits, 2);
    assert_eq!(canvas.0.borrow().redraws, 1);
    assert_eq!(*changes.borrow(), 0);
}

#[test]
fn spec_reset_clears_the_canvas() {
    let (mut ctrl, canvas) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\nA --> B\n"));
    assert_eq!(canvas.0.borrow().nodes.len(), 2);
    ctrl.reset();
    assert!(canvas.0.borrow().nodes.is_empty());
    assert!(canvas.0.borrow().edges.is_empty());
    assert_eq!(canvas.0.borrow().redraws, 2);
}

#[test]
fn spec_add_node_after_largest_auto_id() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::accepting());
    block_on(ctrl.enter_graph_mode("graph TD\nnode_18446744073709551615[X]\n"));
    assert_eq!(block_on(ctrl.apply(Gesture::AddNode)), EditOutcome::Applied);
    assert!(ctrl.store().contains_node("node_1"));
    assert_eq!(ctrl.store().node_count(), 2);
}

#[test]
fn spec_each_edit_notifies_once() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::accepting());
    block_on(ctrl.enter_graph_mode("graph TD\nA --> B\nB --> C\n"));
    let changes = count_changes(&mut ctrl);
    block_on(ctrl.apply(Gesture::DeleteNode { id: "B".into() }));
    assert_eq!(*changes.borrow(), 1);
    assert_eq!(ctrl.store().edge_count(), 0);
    block_on(ctrl.apply(Gesture::AddNode));
    assert_eq!(*changes.borrow(), 2);
}

#[test]
fn spec_cancelled_edit_does_not_notify() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::declining());
    block_on(ctrl.enter_graph_mode("graph TD\nA[x]\n"));
    let changes = count_changes(&mut ctrl);
    assert_eq!(block_on(ctrl.apply(Gesture::AddNode)), EditOutcome::Cancelled);
    assert_eq!(*changes.borrow(), 0);
    assert_eq!(ctrl.store().node_count(), 1);
}

#[test]
fn spec_unknown_delete_is_rejected() {
    let (mut ctrl, _) = sync_with(BlockingPrompt::accepting());
    block_on(ctrl.enter_graph_mode("graph TD\nA[x]\n"));
    assert_eq!(
        block_on(ctrl.apply(Gesture::DeleteEdge { id: "edge_9".into() })),
        EditOutcome::Rejected
    );
    assert_eq!(
        block_on(ctrl.apply(Gesture::DeleteNode { id: "Z".into() })),
        EditOutcome::Rejected
    );
}

// =============================================================================
// Prompts
// =============================================================================

#[test]
fn spec_modal_prompt_adds_node() {
    let (prompt, handle) = ModalPrompt::new();
    let (mut ctrl, _) = sync_with(prompt);
    block_on(ctrl.enter_graph_mode("graph TD\nnode_5[X]\n"));
    let (outcome, submitted) = block_on(async {
        futures::join!(ctrl.apply(Gesture::AddNode), async {
            assert_eq!(handle.message().as_deref(), Some("Enter node name"));
            assert_eq!(
                handle.kind(),
                Some(ModalKind::Text {
                    default: "Node 6".to_string()
                })
            );
            handle.submit("Review")
        })
    });
    assert!(submitted);
    assert_eq!(outcome, EditOutcome::Applied);
    assert_eq!(ctrl.store().node("node_6").unwrap().label, "Review");
}

#[test]
fn spec_modal_and_blocking_blank_input_both_cancel() {
    let (prompt, handle) = ModalPrompt::new();
    let (mut modal_ctrl, _) = sync_with(prompt);
    block_on(modal_ctrl.enter_graph_mode("graph TD\nA[Start]\n"));
    let (modal_outcome, _) = block_on(async {
        futures::join!(modal_ctrl.apply(Gesture::EditNode { id: "A".into() }), async {
            handle.submit("   ")
        })
    });

    let (mut blocking_ctrl, _) = sync_with(BlockingPrompt::new(|_, _| Some("   ".into()), |_| true));
    block_on(blocking_ctrl.enter_graph_mode("graph TD\nA[Start]\n"));
    let blocking_outcome = block_on(blocking_ctrl.apply(Gesture::EditNode { id: "A".into() }));

    assert_eq!(modal_outcome, EditOutcome::Cancelled);
    assert_eq!(blocking_outcome, EditOutcome::Cancelled);
    assert_eq!(modal_ctrl.store().node("A").unwrap().label, "Start");
    assert_eq!(blocking_ctrl.store().node("A").unwrap().label, "Start");
}

#[test]
fn spec_modal_cancel_aborts_rename() {
    let (prompt, handle) = ModalPrompt::new();
    let (mut ctrl, _) = sync_with(prompt);
    block_on(ctrl.enter_graph_mode("graph TD\nA[Start]\n"));
    let (outcome, _) = block_on(async {
        futures::join!(ctrl.apply(Gesture::EditNode { id: "A".into() }), async {
            handle.cancel()
        })
    });
    assert_eq!(outcome, EditOutcome::Cancelled);
}

// =============================================================================
// Mode transitions
// =============================================================================

#[test]
fn spec_enter_then_exit_without_edits_is_stable() {
    let canonical = "graph TD\n    A[Start]\n    B[End]\n    A --> B";
    let mut ctrl = mode_with(canonical, Some(Box::new(HeadlessCanvas::default())));
    block_on(ctrl.enter_graph_mode());
    block_on(ctrl.enter_text_mode());
    assert_eq!(ctrl.mode(), Mode::Text);
    assert_eq!(ctrl.document_text(), canonical);
}

#[test]
fn spec_graph_edit_then_exit_updates_text() {
    let mut ctrl = mode_with("graph TD\nA[Start] --> B[End]", Some(Box::new(HeadlessCanvas::default())));
    block_on(ctrl.enter_graph_mode());
    block_on(ctrl.apply(Gesture::AddEdge {
        from: "B".into(),
        to: "A".into(),
    }));
    block_on(ctrl.enter_text_mode());
    assert_eq!(
        ctrl.document_text(),
        "graph TD\n    A[Start]\n    B[End]\n    A --> B\n    B --> A"
    );
}

#[test]
fn spec_render_error_keeps_previous_output() {
    let mut ctrl = mode_with("graph TD\nA --> B", Some(Box::new(HeadlessCanvas::default())));
    block_on(ctrl.on_editor_blur());
    let before = ctrl.output().markup().map(str::to_string);
    block_on(ctrl.open_document("graph TD\nbroken"));
    block_on(ctrl.on_editor_blur());
    assert_eq!(ctrl.output().markup().map(str::to_string), before);
    assert_eq!(ctrl.output().error(), Some("Error: Parse error on line 2"));
}

#[test]
fn spec_missing_canvas_degrades_to_read_only() {
    let mut ctrl = mode_with("graph TD\n  A --> B", None);
    assert!(ctrl.graph().is_degraded());
    block_on(ctrl.enter_graph_mode());
    assert_eq!(ctrl.graph().preview_text(), "graph TD\n  A --> B");
    assert_eq!(block_on(ctrl.apply(Gesture::AddNode)), EditOutcome::ReadOnly);
    block_on(ctrl.enter_text_mode());
    assert_eq!(ctrl.document_text(), "graph TD\n  A --> B");
}
