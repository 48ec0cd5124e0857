//! Cell output.
//!
//! - [`CellBuffer`]: a grid of styled cells with per-row dirty tracking
//! - [`Canvas`]: the clipped, box-relative view handed to custom draws
//! - [`BufferPool`]: two buffers, with the vacated one cleared off-thread
//!
//! Templates render into a buffer through `Template::render`; getting the
//! cells onto a terminal is the pipeline's job.

mod buffer;
mod pool;
mod render;

pub use buffer::{filled_cells, Canvas, CellBuffer, BAR_EMPTY, BAR_FILLED};
pub use pool::{BufferPool, FrameGuard, Owner};
