//! Build-time errors.
//!
//! Everything here is a static definition bug in the tree. Render-time
//! conditions (empty collections, out-of-range scroll, zero-size
//! viewports) are clamped instead and never surface as errors.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An element binding appeared outside every `ForEach`.
    #[error("binding reads a `{element}` item but is not inside any for_each")]
    UnboundElement { element: &'static str },

    /// An element binding's item type matches no enclosing iteration.
    #[error("binding reads a `{element}` item but the innermost for_each iterates `{innermost}`")]
    ElementTypeMismatch {
        element: &'static str,
        innermost: &'static str,
    },

    /// A switch key was given twice.
    #[error("switch case {key} is defined more than once")]
    DuplicateCase { key: usize },

    /// A grow weight that is negative or not finite.
    #[error("grow weight {grow} must be finite and non-negative")]
    InvalidGrow { grow: f32 },
}

/// Failure inside the frame loop.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The view's tree failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Presenting or terminal I/O failed.
    #[error("terminal i/o: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_types() {
        let err = CompileError::ElementTypeMismatch {
            element: "Row",
            innermost: "u32",
        };
        assert_eq!(
            err.to_string(),
            "binding reads a `Row` item but the innermost for_each iterates `u32`"
        );
    }

    #[test]
    fn test_frame_error_wraps_compile_error() {
        let err = FrameError::from(CompileError::DuplicateCase { key: 2 });
        assert!(matches!(err, FrameError::Compile(CompileError::DuplicateCase { key: 2 })));
        assert_eq!(err.to_string(), "switch case 2 is defined more than once");
    }
}
