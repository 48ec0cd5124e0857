//! Double-buffered cell buffers with a background clearing worker.
//!
//! ```text
//!  render path                 pool                     clear worker
//!  ───────────                 ────                     ────────────
//!  current() ──▶ active: Idle → Render
//!  (draw, present)
//!  drop guard ─▶ active: Render → Idle
//!  swap() ─────▶ flip active; old: Idle → Queued ──────▶ Queued → Clearing
//!                                                       clear dirty rows
//!                                                       Clearing → Idle
//! ```
//!
//! Each buffer is owned by exactly one of the render path, the worker, or
//! the idle pool at any time. `current()` blocks until the active buffer is
//! idle, so it never hands out a buffer that is still queued or clearing.

use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use super::buffer::CellBuffer;

/// Who holds a buffer right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// In the pool, free to hand out.
    Idle,
    /// Borrowed by a live [`FrameGuard`].
    Render,
    /// Vacated by `swap()`, waiting for the worker.
    Queued,
    /// Being cleared by the worker.
    Clearing,
}

struct PoolState {
    active: usize,
    owners: [Owner; 2],
    shutdown: bool,
}

struct Shared {
    buffers: [Mutex<CellBuffer>; 2],
    state: Mutex<PoolState>,
    changed: Condvar,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, PoolState>) -> MutexGuard<'a, PoolState> {
        self.changed.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_buffer(&self, index: usize) -> MutexGuard<'_, CellBuffer> {
        self.buffers[index].lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_owner(&self, index: usize, owner: Owner) {
        self.lock_state().owners[index] = owner;
        self.changed.notify_all();
    }
}

// =============================================================================
// BufferPool
// =============================================================================

/// Two cell buffers: one drawn this frame, one being cleared for the next.
pub struct BufferPool {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl BufferPool {
    /// Pool with a background clearing worker.
    pub fn new(width: u16, height: u16) -> io::Result<Self> {
        Self::with_background_clear(width, height, true)
    }

    /// With `background` false, `swap()` clears inline and no thread runs.
    pub fn with_background_clear(width: u16, height: u16, background: bool) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            buffers: [
                Mutex::new(CellBuffer::new(width, height)),
                Mutex::new(CellBuffer::new(width, height)),
            ],
            state: Mutex::new(PoolState {
                active: 0,
                owners: [Owner::Idle; 2],
                shutdown: false,
            }),
            changed: Condvar::new(),
        });

        let worker = if background {
            let shared = Arc::clone(&shared);
            Some(
                thread::Builder::new()
                    .name("stencil-clear".to_string())
                    .spawn(move || clear_loop(&shared))?,
            )
        } else {
            None
        };

        debug!(width, height, background, "buffer pool created");
        Ok(Self { shared, worker })
    }

    /// This frame's write target.
    ///
    /// Blocks while the active buffer is queued, clearing, or held by
    /// another guard. The buffer is clean unless it was already drawn
    /// since the last `swap()`.
    pub fn current(&self) -> FrameGuard<'_> {
        let mut state = self.shared.lock_state();
        while state.owners[state.active] != Owner::Idle {
            state = self.shared.wait(state);
        }
        let index = state.active;
        state.owners[index] = Owner::Render;
        drop(state);

        FrameGuard {
            shared: &self.shared,
            index,
            buffer: self.shared.lock_buffer(index),
        }
    }

    /// Flip to the other buffer and hand the vacated one to the worker.
    ///
    /// Waits for any live [`FrameGuard`] to drop, so it must not be called
    /// while this thread still holds one.
    pub fn swap(&self) {
        let mut state = self.shared.lock_state();
        while state.owners[state.active] != Owner::Idle {
            state = self.shared.wait(state);
        }
        let old = state.active;
        state.active = 1 - old;

        if self.worker.is_some() {
            state.owners[old] = Owner::Queued;
            drop(state);
            self.shared.changed.notify_all();
            trace!(queued = old, "swap");
        } else {
            state.owners[old] = Owner::Clearing;
            drop(state);
            let rows = self.shared.lock_buffer(old).clear();
            self.shared.set_owner(old, Owner::Idle);
            trace!(cleared = old, rows, "swap");
        }
    }

    /// Resize both buffers. Waits until neither is in use.
    pub fn resize(&self, width: u16, height: u16) {
        let mut state = self.shared.lock_state();
        while state.owners.iter().any(|o| *o != Owner::Idle) {
            state = self.shared.wait(state);
        }
        // State lock stays held so nobody takes a buffer mid-resize
        for index in 0..2 {
            self.shared.lock_buffer(index).resize(width, height);
        }
        drop(state);
        debug!(width, height, "buffer pool resized");
    }

    /// Index of the buffer `current()` hands out.
    pub fn active(&self) -> usize {
        self.shared.lock_state().active
    }

    /// Current owner of buffer `index` (0 or 1).
    pub fn owner(&self, index: usize) -> Owner {
        self.shared.lock_state().owners[index & 1]
    }

    /// Whether a background worker clears vacated buffers.
    pub fn background_clear(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.shared.lock_state().shutdown = true;
        self.shared.changed.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn clear_loop(shared: &Shared) {
    loop {
        let mut state = shared.lock_state();
        let index = loop {
            if state.shutdown {
                return;
            }
            if let Some(i) = state.owners.iter().position(|o| *o == Owner::Queued) {
                break i;
            }
            state = shared.wait(state);
        };
        state.owners[index] = Owner::Clearing;
        drop(state);

        let rows = shared.lock_buffer(index).clear();
        trace!(index, rows, "cleared buffer");
        shared.set_owner(index, Owner::Idle);
    }
}

// =============================================================================
// FrameGuard
// =============================================================================

/// Exclusive access to the active buffer. Dropping it returns the buffer
/// to the pool.
pub struct FrameGuard<'a> {
    shared: &'a Shared,
    index: usize,
    buffer: MutexGuard<'a, CellBuffer>,
}

impl FrameGuard<'_> {
    /// Which of the two buffers this is.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for FrameGuard<'_> {
    type Target = CellBuffer;

    fn deref(&self) -> &CellBuffer {
        &self.buffer
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut CellBuffer {
        &mut self.buffer
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        // The buffer mutex is released right after this; anyone woken here
        // blocks on it only until then.
        self.shared.set_owner(self.index, Owner::Idle);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::types::Style;

    fn wait_for(pool: &BufferPool, index: usize, owner: Owner) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.owner(index) != owner {
            assert!(Instant::now() < deadline, "buffer {index} never became {owner:?}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_swap_alternates_buffers() {
        let pool = BufferPool::new(10, 3).unwrap();
        assert_eq!(pool.current().index(), 0);
        pool.swap();
        assert_eq!(pool.current().index(), 1);
        pool.swap();
        assert_eq!(pool.current().index(), 0);
    }

    #[test]
    fn test_guard_owns_buffer() {
        let pool = BufferPool::new(10, 3).unwrap();
        {
            let _frame = pool.current();
            assert_eq!(pool.owner(0), Owner::Render);
        }
        assert_eq!(pool.owner(0), Owner::Idle);
    }

    #[test]
    fn test_vacated_buffer_is_cleared_in_background() {
        let pool = BufferPool::new(10, 3).unwrap();
        {
            let mut frame = pool.current();
            frame.draw_text(0, 1, "hello", Style::PLAIN, None);
        }
        pool.swap();
        wait_for(&pool, 0, Owner::Idle);

        pool.swap();
        let frame = pool.current();
        assert_eq!(frame.index(), 0);
        assert!(frame.is_clean());
        assert_eq!(frame.row_text(1), "          ");
    }

    #[test]
    fn test_inline_clear_without_worker() {
        let pool = BufferPool::with_background_clear(4, 2, false).unwrap();
        assert!(!pool.background_clear());
        {
            let mut frame = pool.current();
            frame.draw_text(0, 0, "ab", Style::PLAIN, None);
        }
        pool.swap();
        assert_eq!(pool.owner(0), Owner::Idle);
        pool.swap();
        assert!(pool.current().is_clean());
    }

    #[test]
    fn test_resize_both_buffers() {
        let pool = BufferPool::new(4, 2).unwrap();
        pool.resize(20, 6);
        assert_eq!(pool.current().width(), 20);
        pool.swap();
        let frame = pool.current();
        assert_eq!((frame.width(), frame.height()), (20, 6));
    }
}
