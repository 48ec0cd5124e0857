//! Terminal setup, teardown, input, and a plain cell writer.
//!
//! The engine only needs three things from a terminal: its size, a way in,
//! and a way out. [`CrosstermDriver`] is the stock implementation; tests and
//! embedders can supply their own [`TerminalDriver`].

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, BeginSynchronizedUpdate, EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use tracing::{debug, error, trace};

use crate::config::Config;
use crate::renderer::CellBuffer;
use crate::types::{Attr, Rgba, Style};

use super::request::RenderSignal;

/// How long the event reader blocks before re-checking `running`.
const EVENT_POLL: Duration = Duration::from_millis(50);

/// The terminal collaborator the pipeline runs against.
pub trait TerminalDriver {
    /// Columns and rows.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Enter raw mode (and the alternate screen, if configured).
    fn enter(&mut self) -> io::Result<()>;

    /// Restore the terminal. Safe to call more than once.
    fn exit(&mut self) -> io::Result<()>;
}

// =============================================================================
// TerminalSize
// =============================================================================

/// Terminal size shared between the input thread and the render loop.
#[derive(Debug)]
pub struct TerminalSize(AtomicU32);

impl TerminalSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self(AtomicU32::new(pack(width, height)))
    }

    pub fn get(&self) -> (u16, u16) {
        let packed = self.0.load(Ordering::Acquire);
        ((packed >> 16) as u16, packed as u16)
    }

    /// Store a new size. Returns whether it changed.
    pub fn set(&self, width: u16, height: u16) -> bool {
        self.0.swap(pack(width, height), Ordering::AcqRel) != pack(width, height)
    }
}

#[inline]
fn pack(width: u16, height: u16) -> u32 {
    ((width as u32) << 16) | height as u32
}

// =============================================================================
// CrosstermDriver
// =============================================================================

pub struct CrosstermDriver {
    out: Stdout,
    alt_screen: bool,
    entered: bool,
    /// First terminal row the frame occupies (non-zero only inline).
    origin: u16,
}

impl CrosstermDriver {
    pub fn new(alt_screen: bool) -> Self {
        Self {
            out: io::stdout(),
            alt_screen,
            entered: false,
            origin: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.alt_screen)
    }

    /// Write every row of `buf` to the terminal.
    ///
    /// This is a full repaint with style run tracking, not a diff.
    pub fn present(&mut self, buf: &CellBuffer) -> io::Result<()> {
        write_frame(&mut self.out, buf, self.origin)
    }
}

impl TerminalDriver for CrosstermDriver {
    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn enter(&mut self) -> io::Result<()> {
        if self.entered {
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        if self.alt_screen {
            execute!(self.out, EnterAlternateScreen, cursor::Hide)?;
            self.origin = 0;
        } else {
            execute!(self.out, cursor::Hide)?;
            self.origin = cursor::position().map(|(_, row)| row).unwrap_or(0);
        }
        self.entered = true;
        debug!(alt_screen = self.alt_screen, origin = self.origin, "terminal entered");
        Ok(())
    }

    fn exit(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;

        // Try every step even if one fails; report the first failure
        let mut first_err: Option<io::Error> = None;
        let restore = if self.alt_screen {
            execute!(self.out, SetAttribute(Attribute::Reset), cursor::Show, LeaveAlternateScreen)
        } else {
            execute!(self.out, SetAttribute(Attribute::Reset), cursor::Show, Print("\r\n"))
        };
        if let Err(err) = restore {
            first_err.get_or_insert(err);
        }
        if let Err(err) = terminal::disable_raw_mode() {
            first_err.get_or_insert(err);
        }
        debug!("terminal restored");

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for CrosstermDriver {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}

// =============================================================================
// Output
// =============================================================================

/// Queue a full repaint of `buf` into `out`, starting at terminal row
/// `origin`, and flush.
pub fn write_frame<W: Write>(out: &mut W, buf: &CellBuffer, origin: u16) -> io::Result<()> {
    queue!(out, BeginSynchronizedUpdate)?;
    let mut last: Option<Style> = None;

    for y in 0..buf.height() {
        queue!(out, cursor::MoveTo(0, origin.saturating_add(y)))?;
        let Some(row) = buf.row(y) else { continue };
        for cell in row {
            // Wide glyphs already covered this column
            let Some(glyph) = cell.glyph() else { continue };
            let style = cell.style();
            if last != Some(style) {
                queue_style(out, style, last)?;
                last = Some(style);
            }
            queue!(out, Print(glyph))?;
        }
    }

    queue!(out, SetAttribute(Attribute::Reset), EndSynchronizedUpdate)?;
    out.flush()?;
    trace!(rows = buf.height(), "frame written");
    Ok(())
}

fn queue_style<W: Write>(out: &mut W, style: Style, last: Option<Style>) -> io::Result<()> {
    let attrs_changed = last.is_none_or(|l| l.attrs != style.attrs);
    if attrs_changed {
        queue!(out, SetAttribute(Attribute::Reset))?;
        for (flag, attribute) in ATTRIBUTES {
            if style.attrs.contains(flag) {
                queue!(out, SetAttribute(attribute))?;
            }
        }
    }
    // A reset clears colors too
    if attrs_changed || last.is_some_and(|l| l.fg != style.fg) {
        queue!(out, SetForegroundColor(color(style.fg)))?;
    }
    if attrs_changed || last.is_some_and(|l| l.bg != style.bg) {
        queue!(out, SetBackgroundColor(color(style.bg)))?;
    }
    Ok(())
}

const ATTRIBUTES: [(Attr, Attribute); 8] = [
    (Attr::BOLD, Attribute::Bold),
    (Attr::DIM, Attribute::Dim),
    (Attr::ITALIC, Attribute::Italic),
    (Attr::UNDERLINE, Attribute::Underlined),
    (Attr::BLINK, Attribute::SlowBlink),
    (Attr::INVERSE, Attribute::Reverse),
    (Attr::HIDDEN, Attribute::Hidden),
    (Attr::STRIKETHROUGH, Attribute::CrossedOut),
];

/// Terminal color for a cell color. Translucent colors were blended when
/// drawn, so only the channels matter here.
fn color(rgba: Rgba) -> Color {
    if rgba.is_terminal_default() || rgba.is_transparent() {
        Color::Reset
    } else if rgba.is_ansi() {
        Color::AnsiValue(rgba.g as u8)
    } else {
        Color::Rgb {
            r: rgba.r as u8,
            g: rgba.g as u8,
            b: rgba.b as u8,
        }
    }
}

// =============================================================================
// Input
// =============================================================================

/// Spawn the input thread.
///
/// Key presses go to `on_key`; a `true` return requests a frame. Resizes
/// update `size` and always request a frame. The thread exits once
/// `running` is cleared or the terminal stops delivering events.
pub fn spawn_event_reader<F>(
    signal: Arc<RenderSignal>,
    size: Arc<TerminalSize>,
    running: Arc<AtomicBool>,
    mut on_key: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut(KeyEvent) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name("stencil-input".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                let ready = match event::poll(EVENT_POLL) {
                    Ok(ready) => ready,
                    Err(err) => {
                        error!(%err, "event poll failed");
                        break;
                    }
                };
                if !ready {
                    continue;
                }
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if on_key(key) {
                            signal.request();
                        }
                    }
                    Ok(Event::Resize(width, height)) => {
                        if size.set(width, height) {
                            debug!(width, height, "terminal resized");
                        }
                        signal.request();
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!(%err, "event read failed");
                        break;
                    }
                }
            }
            // Let the render loop notice shutdown promptly
            signal.request();
        })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_size_round_trip() {
        let size = TerminalSize::new(80, 24);
        assert_eq!(size.get(), (80, 24));
        assert!(size.set(120, 40));
        assert!(!size.set(120, 40));
        assert_eq!(size.get(), (120, 40));
    }

    #[test]
    fn test_write_frame_emits_glyphs_in_row_order() {
        let mut buf = CellBuffer::new(6, 2);
        buf.draw_text(0, 0, "top", Style::PLAIN, None);
        buf.draw_text(1, 1, "low", Style::fg(Rgba::RED), None);

        let mut out = Vec::new();
        write_frame(&mut out, &buf, 0).unwrap();
        let text = String::from_utf8_lossy(&out);

        let top = text.find("top").unwrap();
        let low = text.find("low").unwrap();
        assert!(top < low);
        // 24-bit red foreground
        assert!(text.contains("38;2;255;0;0"));
    }

    #[test]
    fn test_write_frame_skips_wide_continuations() {
        let mut buf = CellBuffer::new(4, 1);
        buf.draw_text(0, 0, "日x", Style::PLAIN, None);

        let mut out = Vec::new();
        write_frame(&mut out, &buf, 0).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("日x"));
    }

    #[test]
    fn test_color_mapping() {
        assert_eq!(color(Rgba::TERMINAL_DEFAULT), Color::Reset);
        assert_eq!(color(Rgba::ansi(4)), Color::AnsiValue(4));
        assert_eq!(color(Rgba::rgb(1, 2, 3)), Color::Rgb { r: 1, g: 2, b: 3 });
    }
}
