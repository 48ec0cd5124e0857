//! Frame Pipeline
//!
//! Connects compiled views to the terminal:
//!
//! ```text
//! input thread ──▶ RenderSignal ──▶ Pipeline::run ──▶ View (layout + render)
//!      │                                  │
//!      └──▶ TerminalSize                  └──▶ BufferPool ──▶ present
//! ```
//!
//! - [`View`]: owns a template, recompiles only when the caller's shape key changes
//! - [`RenderSignal`]: coalesced "frame needed" flag, settable from any thread
//! - [`Pipeline`]: the frame loop over a double-buffered pool
//! - [`TerminalDriver`] / [`CrosstermDriver`]: raw mode, alternate screen, output
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, atomic::AtomicBool};
//! use spark_stencil::{config::Config, pipeline::*, tree::*};
//!
//! let config = Config::from_env();
//! let mut driver = CrosstermDriver::from_config(&config);
//! let (width, height) = driver.size()?;
//! driver.enter()?;
//!
//! let mut pipeline = Pipeline::new(&config, width, height)?;
//! let running = Arc::new(AtomicBool::new(true));
//! let _input = spawn_event_reader(pipeline.signal(), pipeline.size(), running.clone(), |_key| true)?;
//!
//! pipeline.run(
//!     &running,
//!     |view| view.ensure(0, || text("hello").into()).map(|_| ()),
//!     |buf| driver.present(buf),
//! )?;
//! ```

mod frame;
mod request;
mod terminal;
mod view;

pub use frame::Pipeline;
pub use request::RenderSignal;
pub use terminal::{spawn_event_reader, write_frame, CrosstermDriver, TerminalDriver, TerminalSize};
pub use view::View;
