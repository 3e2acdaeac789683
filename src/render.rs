// Renderers - consumers of render passes
// A renderer must skip passes whose epoch is no longer current

use crate::dashboard::RenderPass;
use crate::error::Result;
use std::io::Write;
use tracing::debug;

pub trait Renderer {
    /// Draw one pass. Returns Ok(false) when the pass was stale and skipped.
    fn render(&mut self, pass: &RenderPass) -> Result<bool>;
}

/// Writes each current view-model as one JSON document.
pub struct JsonRenderer<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(writer: W) -> Self {
        JsonRenderer { writer, pretty: false }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, pass: &RenderPass) -> Result<bool> {
        if pass.is_stale() {
            debug!(epoch = pass.epoch.epoch(), "dropping stale render pass");
            return Ok(false);
        }

        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, &pass.view)?;
        } else {
            serde_json::to_writer(&mut self.writer, &pass.view)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::dashboard::Dashboard;
    use crate::filter::CriteriaUpdate;
    use crate::records::{DataStore, FlowRecord};
    use std::collections::HashMap;

    fn dashboard() -> Dashboard {
        let store = DataStore::new(
            vec![FlowRecord::new("A", "X", Some(2020)).with_value(10.0)],
            HashMap::new(),
        );
        Dashboard::with_store(DashboardConfig::default(), store)
    }

    #[test]
    fn test_json_renderer_writes_current_pass() {
        let dashboard = dashboard();
        let pass = dashboard.rebuild_view_model().unwrap();
        let mut renderer = JsonRenderer::new(Vec::new());

        assert!(renderer.render(&pass).unwrap());

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        let json: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(json["content"]["mode"], "single");
        assert_eq!(json["content"]["bar_series"][0]["code"], "A");
    }

    #[test]
    fn test_json_renderer_skips_stale_pass() {
        let mut dashboard = dashboard();
        let stale = dashboard.rebuild_view_model().unwrap();
        dashboard.set_criteria(vec![CriteriaUpdate::TopN(5)]);
        let fresh = dashboard.rebuild_view_model().unwrap();
        let mut renderer = JsonRenderer::new(Vec::new());

        assert!(!renderer.render(&stale).unwrap());
        assert!(renderer.render(&fresh).unwrap());

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("\"top_n\":5"));
    }
}
