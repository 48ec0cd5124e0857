//! # spark-stencil
//!
//! Compiled-template terminal UI engine.
//!
//! A declarative tree of seven node kinds is compiled once into a flat,
//! breadth-first list of ops. Every frame the template is laid out with a
//! three-pass flex algorithm and rendered into a cell buffer, reading live
//! values through the bindings resolved at compile time. Nothing is rebuilt
//! per frame; collection changes are picked up by walking the collection
//! again.
//!
//! ```text
//! Node tree ──compile──▶ Template ──layout──▶ Geom ──render──▶ CellBuffer
//!   (once)                  (every frame, same ops)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Colors, styles, cells, clip rects, borders, dimensions
//! - [`tree`] - The declarative input: nodes, bindings, iteration scope
//! - [`template`] - The compiler and the flat op list it produces
//! - [`layout`] - Width, height, and flex passes; scroll clamping
//! - [`renderer`] - Cell buffers, the double-buffer pool, `Template::render`
//! - [`pipeline`] - Views, the frame loop, the terminal driver
//! - [`config`] / [`logging`] - Runtime settings and tracing setup
//!
//! ## Example
//!
//! ```ignore
//! use spark_stencil::{compile, renderer::CellBuffer, tree::*};
//! use spark_signals::signal;
//!
//! let status = signal("ready".to_string());
//! let mut template = compile(
//!     &column()
//!         .border(Borders::ALL)
//!         .child(text("Build"))
//!         .child(text(status.clone()).grow(1.0))
//!         .into(),
//! )?;
//!
//! let mut buf = CellBuffer::new(40, 10);
//! template.layout(40, Some(10));
//! template.render(&mut buf, 0, 0, 40);
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod renderer;
pub mod template;
pub mod tree;
pub mod types;

pub use config::Config;
pub use error::{CompileError, FrameError};
pub use renderer::{BufferPool, Canvas, CellBuffer};
pub use template::{compile, Template};
pub use tree::{Binding, Items, Node, Scope};
pub use types::*;
