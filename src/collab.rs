//! Seams to the widgets the editor is embedded in.
//!
//! The controllers never touch a real text editor, renderer or canvas; they
//! talk to these traits. In-memory implementations are provided for headless
//! use and for tests.

use std::ops::Range;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::graph_model::{Edge, Node};

/// A text editing widget's document.
pub trait TextBuffer {
    fn text(&self) -> String;

    /// Replace `range` (byte offsets) with `insert`.
    fn replace_range(&mut self, range: Range<usize>, insert: &str);

    fn len(&self) -> usize {
        self.text().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole document. Returns false, without dispatching a
    /// change, when the content is already equal.
    fn set_text(&mut self, text: &str) -> bool {
        if self.text() == text {
            return false;
        }
        let len = self.len();
        self.replace_range(0..len, text);
        true
    }
}

/// Renders diagram text to markup. Rejects with a descriptive error.
#[async_trait(?Send)]
pub trait DiagramRenderer {
    async fn render(&self, render_id: &str, source: &str) -> Result<String, RenderError>;
}

/// An interactive node/edge canvas. It only displays what it is given;
/// structural edits come back to the controller as gestures.
pub trait GraphCanvas {
    fn redraw(&mut self, nodes: &[Node], edges: &[Edge]);

    /// Recentre the view on the whole graph.
    fn fit(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringBuffer {
    content: String,
    revision: u64,
}

impl StringBuffer {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            revision: 0,
        }
    }

    /// Number of change dispatches applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl TextBuffer for StringBuffer {
    fn text(&self) -> String {
        self.content.clone()
    }

    fn len(&self) -> usize {
        self.content.len()
    }

    fn replace_range(&mut self, range: Range<usize>, insert: &str) {
        let mut end = range.end.min(self.content.len());
        while !self.content.is_char_boundary(end) {
            end += 1;
        }
        let mut start = range.start.min(end);
        while !self.content.is_char_boundary(start) {
            start -= 1;
        }
        self.content.replace_range(start..end, insert);
        self.revision += 1;
    }
}

/// Canvas without a display: keeps the last drawn graph.
#[derive(Debug, Clone, Default)]
pub struct HeadlessCanvas {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub redraws: usize,
    pub fits: usize,
}

impl GraphCanvas for HeadlessCanvas {
    fn redraw(&mut self, nodes: &[Node], edges: &[Edge]) {
        self.nodes = nodes.to_vec();
        self.edges = edges.to_vec();
        self.redraws += 1;
    }

    fn fit(&mut self) {
        self.fits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replace_range_edits_in_place() {
        let mut buf = StringBuffer::new("graph TD\n    A --> B");
        buf.replace_range(13..14, "X");
        assert_eq!(buf.text(), "graph TD\n    X --> B");
        assert_eq!(buf.revision(), 1);
    }

    #[test]
    fn set_text_skips_identical_content() {
        let mut buf = StringBuffer::new("same");
        assert!(!buf.set_text("same"));
        assert_eq!(buf.revision(), 0);
        assert!(buf.set_text("other"));
        assert_eq!(buf.text(), "other");
        assert_eq!(buf.revision(), 1);
    }

    #[test]
    fn replace_range_clamps_out_of_bounds() {
        let mut buf = StringBuffer::new("abc");
        buf.replace_range(1..99, "Z");
        assert_eq!(buf.text(), "aZ");
    }

    #[test]
    fn replace_range_widens_to_char_boundaries() {
        let mut buf = StringBuffer::new("开始 --> B");
        buf.replace_range(1..2, "x");
        assert_eq!(buf.text(), "x始 --> B");
        buf.replace_range(2..3, "y");
        assert_eq!(buf.text(), "xy --> B");
    }
}
