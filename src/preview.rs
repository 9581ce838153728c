use crate::collab::DiagramRenderer;

/// Output pane of a rendered diagram: last good markup plus an inline error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramPreview {
    id_prefix: String,
    markup: Option<String>,
    error: Option<String>,
    renders: u64,
}

impl DiagramPreview {
    pub fn new(id_prefix: &str) -> Self {
        Self {
            id_prefix: id_prefix.to_string(),
            ..Self::default()
        }
    }

    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Render `source`. A rejection is shown as `Error: <message>` and the
    /// previous markup stays in place.
    pub async fn refresh(&mut self, renderer: &dyn DiagramRenderer, source: &str) -> bool {
        self.error = None;
        self.renders += 1;
        let render_id = format!("{}-{}", self.id_prefix, self.renders);
        match renderer.render(&render_id, source).await {
            Ok(markup) => {
                self.markup = Some(markup);
                true
            }
            Err(e) => {
                tracing::warn!(%render_id, error = %e, "diagram render failed");
                self.error = Some(format!("Error: {e}"));
                false
            }
        }
    }
}
