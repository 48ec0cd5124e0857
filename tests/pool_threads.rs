//! Threading tests for the buffer pool and frame pipeline.
//!
//! Exercises the pattern the frame loop relies on:
//! - one render thread taking `current()`, drawing, and `swap()`ing
//! - the background worker clearing the vacated buffer concurrently
//! - other threads firing redraw requests as fast as they can
//!
//! Run with: cargo test --test pool_threads -- --nocapture

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use spark_signals::signal;
use spark_stencil::pipeline::{Pipeline, RenderSignal};
use spark_stencil::renderer::{BufferPool, Owner};
use spark_stencil::tree::*;
use spark_stencil::{Borders, Config, Style};

const FRAMES: usize = 2_000;

// =============================================================================
// POOL
// =============================================================================

#[test]
fn test_every_frame_starts_clean() {
    let pool = BufferPool::new(80, 24).expect("pool");
    let start = Instant::now();

    for frame in 0..FRAMES {
        let mut buffer = pool.current();
        assert!(buffer.is_clean(), "frame {frame} got a dirty buffer");

        let row = (frame % 24) as i32;
        buffer.draw_text(0, row, &format!("frame {frame}"), Style::PLAIN, None);
        buffer.draw_text(40, (row + 7) % 24, "██████", Style::PLAIN, None);
        drop(buffer);

        pool.swap();
    }

    println!("  {FRAMES} frames in {:?}", start.elapsed());
}

#[test]
fn test_guard_never_sees_queued_or_clearing_buffer() {
    let pool = Arc::new(BufferPool::new(120, 40).expect("pool"));
    let running = Arc::new(AtomicBool::new(true));
    let observed = Arc::new(AtomicU64::new(0));

    let spawn_renderer = |name: &str| {
        let pool = Arc::clone(&pool);
        let running = Arc::clone(&running);
        let observed = Arc::clone(&observed);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    {
                        let mut buffer = pool.current();
                        assert_eq!(pool.owner(buffer.index()), Owner::Render);
                        buffer.draw_text(0, 0, "x", Style::PLAIN, None);
                        observed.fetch_add(1, Ordering::Relaxed);
                    }
                    pool.swap();
                }
            })
            .expect("spawn renderer")
    };

    let a = spawn_renderer("renderer-a");
    let b = spawn_renderer("renderer-b");

    thread::sleep(Duration::from_millis(300));
    running.store(false, Ordering::Relaxed);
    a.join().expect("renderer-a");
    b.join().expect("renderer-b");

    let frames = observed.load(Ordering::Relaxed);
    println!("  two renderers drew {frames} frames");
    assert!(frames > 0);
}

#[test]
fn test_dropping_pool_stops_worker() {
    for _ in 0..50 {
        let pool = BufferPool::new(10, 2).expect("pool");
        {
            let mut buffer = pool.current();
            buffer.draw_text(0, 0, "bye", Style::PLAIN, None);
        }
        pool.swap();
        // Drop joins the worker even with a clear in flight
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

#[test]
fn test_request_storm_coalesces_into_few_frames() {
    let mut pipeline = Pipeline::new(&Config::default(), 40, 4).expect("pipeline");
    let running = Arc::new(AtomicBool::new(true));
    let sent = Arc::new(AtomicU64::new(0));

    let label = signal(String::new());
    let label_for_view = label.clone();
    let mut prepared = 0u64;

    let storm = {
        let signal = pipeline.signal();
        let running = Arc::clone(&running);
        let sent = Arc::clone(&sent);
        thread::Builder::new()
            .name("request-storm".to_string())
            .spawn(move || {
                let start = Instant::now();
                while start.elapsed() < Duration::from_millis(300) {
                    signal.request();
                    sent.fetch_add(1, Ordering::Relaxed);
                }
                running.store(false, Ordering::SeqCst);
                signal.request();
            })
            .expect("spawn storm")
    };

    let mut last_row = String::new();
    pipeline
        .run(
            &running,
            |view| {
                prepared += 1;
                label.set(format!("frame {prepared}"));
                view.ensure(0, || {
                    column()
                        .border(Borders::ALL)
                        .child(text(label_for_view.clone()).grow(1.0))
                        .into()
                })
                .map(|_| ())
            },
            |buf| {
                last_row = buf.row_text(1);
                Ok(())
            },
        )
        .expect("run");
    storm.join().expect("storm");

    let sent = sent.load(Ordering::Relaxed);
    let frames = pipeline.frames();
    println!("  {sent} requests → {frames} frames");
    assert!(frames >= 1);
    assert!(frames <= sent + 1);
    assert_eq!(pipeline.view().compile_count(), 1);
    assert_eq!(prepared, frames);
    assert!(last_row.starts_with(&format!("│frame {frames}")));
}

#[test]
fn test_signal_wait_sees_every_burst() {
    let signal = Arc::new(RenderSignal::new());
    let bursts = 100;

    let producer = {
        let signal = Arc::clone(&signal);
        thread::spawn(move || {
            for _ in 0..bursts {
                for _ in 0..10 {
                    signal.request();
                }
                thread::sleep(Duration::from_micros(200));
            }
        })
    };

    let mut woken = 0;
    let deadline = Instant::now() + Duration::from_secs(10);
    while !producer.is_finished() || signal.is_pending() {
        if signal.wait_timeout(Duration::from_millis(10)) {
            woken += 1;
        }
        assert!(Instant::now() < deadline, "producer never finished");
    }
    producer.join().expect("producer");

    assert_eq!(signal.request_count(), bursts * 10);
    assert!(woken >= 1 && woken <= bursts * 10);
}
