//! The frame loop.
//!
//! ```text
//! request() ──▶ wait ──▶ prepare(view) ──▶ current() ──▶ layout + render
//!                                              │
//!                           present(buffer) ◀──┘
//!                                  │
//!                         drop guard, swap() ──▶ worker clears old buffer
//! ```
//!
//! The loop runs on the thread that owns the view's data; only the pool
//! and the render signal are shared with other threads.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{CompileError, FrameError};
use crate::renderer::{BufferPool, CellBuffer};

use super::request::RenderSignal;
use super::terminal::TerminalSize;
use super::view::View;

/// Longest the loop sleeps before re-checking `running`.
const IDLE_TICK: Duration = Duration::from_millis(50);

pub struct Pipeline {
    view: View,
    pool: Arc<BufferPool>,
    signal: Arc<RenderSignal>,
    size: Arc<TerminalSize>,
    /// Fill the terminal height (alternate screen) or take content height.
    fill: bool,
    buffer_size: (u16, u16),
    frames: u64,
}

impl Pipeline {
    pub fn new(config: &Config, width: u16, height: u16) -> io::Result<Self> {
        let pool = BufferPool::with_background_clear(width, height, config.background_clear)?;
        Ok(Self {
            view: View::new(),
            pool: Arc::new(pool),
            signal: Arc::new(RenderSignal::new()),
            size: Arc::new(TerminalSize::new(width, height)),
            fill: config.alt_screen,
            buffer_size: (width, height),
            frames: 0,
        })
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Handle for requesting frames from other threads.
    pub fn signal(&self) -> Arc<RenderSignal> {
        Arc::clone(&self.signal)
    }

    /// Handle the input thread writes resizes into.
    pub fn size(&self) -> Arc<TerminalSize> {
        Arc::clone(&self.size)
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Render one frame and hand it to `present`.
    ///
    /// Returns false without presenting when the view has nothing compiled.
    pub fn frame<F>(&mut self, present: F) -> Result<bool, FrameError>
    where
        F: FnOnce(&CellBuffer) -> io::Result<()>,
    {
        let (width, height) = self.size.get();
        if (width, height) != self.buffer_size {
            self.pool.resize(width, height);
            self.buffer_size = (width, height);
        }

        {
            let mut buffer = self.pool.current();
            let fill = self.fill.then_some(height);
            if !self.view.frame(&mut buffer, width, fill) {
                return Ok(false);
            }
            present(&*buffer)?;
        }
        // Guard is gone; swap would wait on it otherwise
        self.pool.swap();

        self.frames += 1;
        trace!(frame = self.frames, width, height, "frame presented");
        Ok(true)
    }

    /// Render a frame, then one more per coalesced request, until `running`
    /// is cleared.
    ///
    /// `prepare` runs before each frame and is where the caller calls
    /// [`View::ensure`]. Compile and present errors end the loop.
    pub fn run<P, F>(&mut self, running: &AtomicBool, mut prepare: P, mut present: F) -> Result<(), FrameError>
    where
        P: FnMut(&mut View) -> Result<(), CompileError>,
        F: FnMut(&CellBuffer) -> io::Result<()>,
    {
        debug!("frame loop started");
        let mut requested = true;
        while running.load(Ordering::SeqCst) {
            if requested {
                prepare(&mut self.view)?;
                self.frame(&mut present)?;
            }
            requested = self.signal.wait_timeout(IDLE_TICK);
        }
        debug!(frames = self.frames, "frame loop stopped");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;

    use super::*;
    use crate::tree::*;

    fn inline_config() -> Config {
        Config {
            alt_screen: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_frame_presents_and_swaps() {
        let mut pipeline = Pipeline::new(&Config::default(), 10, 3).unwrap();
        pipeline
            .view_mut()
            .ensure(1, || column().child(text("hello")).into())
            .unwrap();

        let mut seen = Vec::new();
        assert!(pipeline.frame(|buf| {
            seen.push(buf.row_text(0));
            Ok(())
        })
        .unwrap());

        assert_eq!(seen, vec!["hello     ".to_string()]);
        assert_eq!(pipeline.frames(), 1);
        assert_eq!(pipeline.pool().active(), 1);
    }

    #[test]
    fn test_frame_without_view_presents_nothing() {
        let mut pipeline = Pipeline::new(&inline_config(), 4, 1).unwrap();
        let presented = pipeline.frame(|_| panic!("nothing to present")).unwrap();
        assert!(!presented);
        assert_eq!(pipeline.frames(), 0);
    }

    #[test]
    fn test_resize_reaches_buffers() {
        let mut pipeline = Pipeline::new(&inline_config(), 4, 1).unwrap();
        pipeline.view_mut().ensure(1, || text("wide text").into()).unwrap();
        pipeline.size().set(12, 2);

        let mut width = 0;
        pipeline
            .frame(|buf| {
                width = buf.width();
                assert_eq!(buf.row_text(0), "wide text   ");
                Ok(())
            })
            .unwrap();
        assert_eq!(width, 12);
    }

    #[test]
    fn test_present_error_stops_frame() {
        let mut pipeline = Pipeline::new(&Config::default(), 4, 1).unwrap();
        pipeline.view_mut().ensure(1, || text("x").into()).unwrap();

        let err = pipeline
            .frame(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
            .unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
        assert_eq!(pipeline.frames(), 0);
        // The guard was released, so the next frame can proceed
        assert!(pipeline.frame(|_| Ok(())).unwrap());
    }

    #[test]
    fn test_run_coalesces_requests_until_stopped() {
        let mut pipeline = Pipeline::new(&Config::default(), 8, 1).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let signal = pipeline.signal();

        // A burst queued before the loop starts is one request
        for _ in 0..5 {
            signal.request();
        }
        let stopper = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                running.store(false, Ordering::SeqCst);
                signal.request();
            })
        };

        let prepared = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&prepared);
        pipeline
            .run(
                &running,
                |view| {
                    *counter.borrow_mut() += 1;
                    view.ensure(1, || text("tick").into()).map(|_| ())
                },
                |_| Ok(()),
            )
            .unwrap();
        stopper.join().unwrap();

        // Initial frame plus one for the burst
        assert_eq!(pipeline.frames(), 2);
        assert_eq!(*prepared.borrow(), 2);
        assert_eq!(pipeline.view().compile_count(), 1);
    }

    #[test]
    fn test_run_stops_on_compile_error() {
        let mut pipeline = Pipeline::new(&Config::default(), 8, 1).unwrap();
        let running = AtomicBool::new(true);

        let err = pipeline
            .run(
                &running,
                |view| view.ensure(1, || text("x").grow(f32::NAN).into()).map(|_| ()),
                |_| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(err, FrameError::Compile(CompileError::InvalidGrow { .. })));
    }
}
