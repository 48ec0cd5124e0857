//! Template ownership across frames.
//!
//! A view compiles its tree once and replays the template every frame.
//! The caller describes the tree's *shape* with a key; data changes flow
//! through bindings and never need a recompile, so the key only changes
//! when the structure itself does (a different screen, a new column set).

use tracing::debug;

use crate::error::CompileError;
use crate::renderer::CellBuffer;
use crate::template::{compile, Template};
use crate::tree::Node;

#[derive(Debug, Default)]
pub struct View {
    template: Option<Template>,
    shape: Option<u64>,
    compiles: u64,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `build()` unless the current template already has `shape`.
    ///
    /// Returns whether a compile happened. On error the previous template
    /// stays in place.
    pub fn ensure<F>(&mut self, shape: u64, build: F) -> Result<bool, CompileError>
    where
        F: FnOnce() -> Node,
    {
        if self.shape == Some(shape) && self.template.is_some() {
            return Ok(false);
        }
        let template = compile(&build())?;
        debug!(shape, previous = ?self.shape, ops = template.total_ops(), "view compiled");
        self.template = Some(template);
        self.shape = Some(shape);
        self.compiles += 1;
        Ok(true)
    }

    /// Drop the template; the next `ensure` compiles regardless of shape.
    pub fn invalidate(&mut self) {
        self.template = None;
        self.shape = None;
    }

    /// Lay out and render one frame at the buffer origin.
    ///
    /// With `height` the root fills it; without, the root takes its
    /// content height (inline output). Returns false if nothing is compiled.
    pub fn frame(&mut self, buf: &mut CellBuffer, width: u16, height: Option<u16>) -> bool {
        let Some(template) = self.template.as_mut() else {
            return false;
        };
        template.layout(width, height);
        template.render(buf, 0, 0, width);
        true
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn shape(&self) -> Option<u64> {
        self.shape
    }

    /// How many times this view has compiled.
    pub fn compile_count(&self) -> u64 {
        self.compiles
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use spark_signals::signal;

    use super::*;
    use crate::tree::*;

    #[test]
    fn test_same_shape_compiles_once() {
        let mut view = View::new();
        let status = signal("idle".to_string());
        let status_for_build = status.clone();
        let build = move || column().child(text(status_for_build.clone())).into();

        assert!(view.ensure(1, build.clone()).unwrap());
        assert!(!view.ensure(1, build.clone()).unwrap());
        assert_eq!(view.compile_count(), 1);

        let mut buf = CellBuffer::new(8, 2);
        assert!(view.frame(&mut buf, 8, Some(2)));
        assert_eq!(buf.row_text(0).trim_end(), "idle");

        status.set("busy".to_string());
        buf.clear();
        view.frame(&mut buf, 8, Some(2));
        assert_eq!(buf.row_text(0).trim_end(), "busy");
        assert_eq!(view.compile_count(), 1);
    }

    #[test]
    fn test_shape_change_recompiles() {
        let mut view = View::new();
        view.ensure(1, || text("one").into()).unwrap();
        assert!(view.ensure(2, || row().child(text("a")).child(text("b")).into()).unwrap());
        assert_eq!(view.shape(), Some(2));
        assert_eq!(view.template().map(Template::len), Some(3));

        view.invalidate();
        assert!(view.ensure(2, || text("again").into()).unwrap());
        assert_eq!(view.compile_count(), 3);
    }

    #[test]
    fn test_failed_compile_keeps_previous_template() {
        let mut view = View::new();
        view.ensure(1, || text("ok").into()).unwrap();

        let err = view.ensure(2, || text("bad").grow(-1.0).into()).unwrap_err();
        assert_eq!(err, CompileError::InvalidGrow { grow: -1.0 });
        assert_eq!(view.shape(), Some(1));

        let mut buf = CellBuffer::new(4, 1);
        view.frame(&mut buf, 4, None);
        assert_eq!(buf.row_text(0), "ok  ");
    }

    #[test]
    fn test_frame_without_template() {
        let mut view = View::new();
        let mut buf = CellBuffer::new(4, 1);
        assert!(!view.frame(&mut buf, 4, Some(1)));
        assert!(buf.is_clean());
    }
}
