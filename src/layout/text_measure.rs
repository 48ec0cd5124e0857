//! Text Measurement
//!
//! Display width of text in terminal cells, via `unicode-width`:
//! - ASCII printable: 1 cell
//! - CJK and most emoji: 2 cells
//! - Control and zero-width characters: 0 cells

use unicode_width::UnicodeWidthChar;

/// Width of one character in terminal cells.
#[inline]
pub fn char_width(c: char) -> u16 {
    if c.is_control() {
        return 0;
    }
    c.width().unwrap_or(0) as u16
}

/// Width of a string in terminal cells.
pub fn string_width(s: &str) -> u16 {
    s.chars().fold(0u16, |w, c| w.saturating_add(char_width(c)))
}
