//! CellBuffer and drawing primitives.
//!
//! A 2D grid of [`Cell`]s plus one dirty flag per row.
//!
//! # Design Decisions
//!
//! - **Flat storage**: `Vec<Cell>` with row-major indexing.
//! - **Clipping**: every write is bounds-checked and takes an optional
//!   `ClipRect`. Coordinates are `i32` so content scrolled above or left of
//!   the buffer clips instead of wrapping.
//! - **Dirty rows**: any write marks its row. [`CellBuffer::clear`] resets
//!   only marked rows, so clearing costs what the last frame drew.
//! - **Wide characters**: CJK and emoji occupy two cells; the second holds
//!   the continuation marker `char = 0`.

use crate::layout::char_width;
use crate::types::{Attr, BorderStyle, Borders, Cell, ClipRect, Rgba, Style};

/// Glyph for the filled part of a progress bar.
pub const BAR_FILLED: char = '█';

/// Glyph for the empty part of a progress bar.
pub const BAR_EMPTY: char = '░';

// =============================================================================
// CellBuffer
// =============================================================================

/// A grid of styled terminal cells with row-level dirty tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    dirty: Vec<bool>,
}

impl CellBuffer {
    /// Create a clean buffer.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
            dirty: vec![false; height as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The full buffer as a clip rectangle.
    #[inline]
    pub fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// One row of cells.
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + self.width as usize])
        } else {
            None
        }
    }

    /// All cells, row-major.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Row glyphs as a string, continuation cells skipped.
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().filter_map(Cell::glyph).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    #[inline]
    pub fn is_row_dirty(&self, y: u16) -> bool {
        self.dirty.get(y as usize).copied().unwrap_or(false)
    }

    /// Rows written since the last clear.
    pub fn dirty_rows(&self) -> impl Iterator<Item = u16> + '_ {
        self.dirty
            .iter()
            .enumerate()
            .filter(|(_, d)| **d)
            .map(|(y, _)| y as u16)
    }

    /// No row written since the last clear.
    pub fn is_clean(&self) -> bool {
        !self.dirty.iter().any(|d| *d)
    }

    /// Reset every dirty row to default cells. Returns the number of rows
    /// reset; untouched rows are not visited.
    pub fn clear(&mut self) -> usize {
        let width = self.width as usize;
        let mut count = 0;
        for (y, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            self.cells[y * width..(y + 1) * width].fill(Cell::default());
            *dirty = false;
            count += 1;
        }
        count
    }

    /// Resize and reset to a clean buffer.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width as usize * height as usize, Cell::default());
        self.dirty.clear();
        self.dirty.resize(height as usize, false);
    }

    // =========================================================================
    // Drawing Primitives
    // =========================================================================

    /// Write one cell by absolute position. Returns true if written.
    pub fn set_cell(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        self.dirty[y as usize] = true;
        true
    }

    /// Clipped write; translucent backgrounds blend with what is there.
    fn put(&mut self, x: i32, y: i32, char: u32, style: Style, clip: Option<&ClipRect>) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let (x, y) = (x as u16, y as u16);
        if let Some(clip) = clip {
            if !clip.contains(x, y) {
                return false;
            }
        }

        let idx = self.index(x, y);
        let cell = &mut self.cells[idx];
        cell.bg = Rgba::blend(style.bg, cell.bg);
        cell.char = char;
        cell.fg = style.fg;
        cell.attrs = style.attrs;
        self.dirty[y as usize] = true;
        true
    }

    /// Draw a single character.
    pub fn draw_char(&mut self, x: i32, y: i32, char: char, style: Style, clip: Option<&ClipRect>) -> bool {
        self.put(x, y, char as u32, style, clip)
    }

    /// Draw a single line of text. Returns the columns advanced.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, style: Style, clip: Option<&ClipRect>) -> u16 {
        let right = clip.map_or(self.width, |c| c.right().min(self.width)) as i32;
        let mut col = x;

        for ch in text.chars() {
            if col >= right {
                break;
            }
            let w = char_width(ch);
            if w == 0 {
                continue;
            }
            if self.put(col, y, ch as u32, style, clip) && w == 2 {
                self.put(col + 1, y, 0, style, clip);
            }
            col += w as i32;
        }

        (col - x).max(0) as u16
    }

    /// Draw a horizontal bar: `filled` cells of [`BAR_FILLED`] then the rest
    /// of `width` as [`BAR_EMPTY`].
    pub fn draw_bar(
        &mut self,
        x: i32,
        y: i32,
        width: u16,
        filled: u16,
        filled_style: Style,
        empty_style: Style,
        clip: Option<&ClipRect>,
    ) {
        for i in 0..width {
            let (ch, style) = if i < filled {
                (BAR_FILLED, filled_style)
            } else {
                (BAR_EMPTY, empty_style)
            };
            self.put(x + i as i32, y, ch as u32, style, clip);
        }
    }

    /// Draw the selected edges of a box. Corners appear where two drawn
    /// edges meet.
    pub fn draw_border(
        &mut self,
        x: i32,
        y: i32,
        width: u16,
        height: u16,
        borders: Borders,
        style: BorderStyle,
        color: Rgba,
        clip: Option<&ClipRect>,
    ) {
        if width == 0 || height == 0 || borders.is_empty() {
            return;
        }

        let (horiz, vert, tl, tr, br, bl) = style.chars();
        let st = Style::fg(color);
        let x2 = x + width as i32 - 1;
        let y2 = y + height as i32 - 1;

        if borders.contains(Borders::TOP) {
            for col in x..=x2 {
                self.draw_char(col, y, horiz, st, clip);
            }
        }
        if borders.contains(Borders::BOTTOM) {
            for col in x..=x2 {
                self.draw_char(col, y2, horiz, st, clip);
            }
        }
        if borders.contains(Borders::LEFT) {
            for row in y..=y2 {
                self.draw_char(x, row, vert, st, clip);
            }
        }
        if borders.contains(Borders::RIGHT) {
            for row in y..=y2 {
                self.draw_char(x2, row, vert, st, clip);
            }
        }

        let corners = [
            (Borders::TOP | Borders::LEFT, x, y, tl),
            (Borders::TOP | Borders::RIGHT, x2, y, tr),
            (Borders::BOTTOM | Borders::RIGHT, x2, y2, br),
            (Borders::BOTTOM | Borders::LEFT, x, y2, bl),
        ];
        for (edges, cx, cy, ch) in corners {
            if borders.contains(edges) {
                self.draw_char(cx, cy, ch, st, clip);
            }
        }
    }

    /// Fill a rectangle with spaces on `bg`.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u16, height: u16, bg: Rgba, clip: Option<&ClipRect>) {
        let mut x1 = x.max(0);
        let mut y1 = y.max(0);
        let mut x2 = (x + width as i32).min(self.width as i32);
        let mut y2 = (y + height as i32).min(self.height as i32);
        if let Some(clip) = clip {
            x1 = x1.max(clip.x as i32);
            y1 = y1.max(clip.y as i32);
            x2 = x2.min(clip.right() as i32);
            y2 = y2.min(clip.bottom() as i32);
        }
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        for row in y1 as u16..y2 as u16 {
            let start = self.index(x1 as u16, row);
            let end = self.index(x2 as u16, row);
            for cell in &mut self.cells[start..end] {
                cell.bg = Rgba::blend(bg, cell.bg);
                cell.char = b' ' as u32;
                cell.attrs = Attr::NONE;
            }
            self.dirty[row as usize] = true;
        }
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// A node's box inside the buffer, handed to custom draw callbacks.
///
/// Coordinates are local to the box; writes outside it (or outside any
/// ancestor's clip) are dropped.
pub struct Canvas<'a> {
    buf: &'a mut CellBuffer,
    x: i32,
    y: i32,
    width: u16,
    height: u16,
    clip: ClipRect,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(buf: &'a mut CellBuffer, x: i32, y: i32, width: u16, height: u16, clip: ClipRect) -> Self {
        Self {
            buf,
            x,
            y,
            width,
            height,
            clip,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn set(&mut self, x: u16, y: u16, char: char, style: Style) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.buf
            .draw_char(self.x + x as i32, self.y + y as i32, char, style, Some(&self.clip))
    }

    pub fn text(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        if y >= self.height {
            return 0;
        }
        self.buf
            .draw_text(self.x + x as i32, self.y + y as i32, text, style, Some(&self.clip))
    }

    /// Progress bar across the full width of row `y`.
    pub fn bar(&mut self, y: u16, value: f32, filled: Style, empty: Style) {
        if y >= self.height {
            return;
        }
        let n = filled_cells(value, self.width);
        self.buf
            .draw_bar(self.x, self.y + y as i32, self.width, n, filled, empty, Some(&self.clip));
    }

    pub fn fill(&mut self, bg: Rgba) {
        self.buf
            .fill_rect(self.x, self.y, self.width, self.height, bg, Some(&self.clip));
    }
}

/// Cells of a `width`-wide bar covered by `value` (0..=1), rounded to nearest.
pub fn filled_cells(value: f32, width: u16) -> u16 {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (value * width as f32).round() as u16
}

// =============================================================================
// Tests
// =============================================================================
