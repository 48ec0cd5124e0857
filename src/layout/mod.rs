//! Layout Module
//!
//! Three-pass flex layout over compiled templates, run every frame:
//!
//! ```text
//! widths (top-down) → heights (bottom-up) → vertical flex (top-down)
//! ```
//!
//! Results land in the template's `Geom` array. Nothing here allocates per
//! frame beyond the per-iteration item height lists, which keep their
//! capacity between frames.
//!
//! # Example
//!
//! ```ignore
//! use spark_stencil::{compile, tree::*};
//!
//! let mut template = compile(&column().child(text("a")).child(text("b").grow(1.0)).into())?;
//! template.layout(80, Some(24));
//! assert_eq!(template.geom()[2].height, 23);
//! ```

mod flex;
mod passes;
mod scroll;
mod text_measure;

pub use flex::distribute;
pub use scroll::{
    clamp_scroll, max_scroll, page_size, scroll_by, LINE_SCROLL, PAGE_SCROLL_FACTOR, WHEEL_SCROLL,
};
pub use text_measure::{char_width, string_width};
