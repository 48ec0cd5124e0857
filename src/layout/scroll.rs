//! Scroll offset clamping.
//!
//! Out-of-range offsets are never errors: they are normalized to
//! `[0, max(0, content - viewport)]`.

/// Scroll amount for arrow keys (lines).
pub const LINE_SCROLL: i32 = 1;

/// Scroll amount for the mouse wheel.
pub const WHEEL_SCROLL: i32 = 3;

/// Page Up/Down scrolls 90% of the viewport.
pub const PAGE_SCROLL_FACTOR: f32 = 0.9;

/// Largest valid offset for `content` rows shown through `viewport` rows.
#[inline]
pub fn max_scroll(content: u16, viewport: u16) -> u16 {
    content.saturating_sub(viewport)
}

/// Clamp a requested offset into the valid range.
#[inline]
pub fn clamp_scroll(offset: i32, content: u16, viewport: u16) -> u16 {
    offset.clamp(0, max_scroll(content, viewport) as i32) as u16
}

/// Offset after scrolling `delta` rows from `current`, clamped.
pub fn scroll_by(current: i32, delta: i32, content: u16, viewport: u16) -> i32 {
    clamp_scroll(current.saturating_add(delta), content, viewport) as i32
}

/// Rows moved by one page.
pub fn page_size(viewport: u16) -> i32 {
    ((viewport as f32 * PAGE_SCROLL_FACTOR) as i32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scroll() {
        assert_eq!(clamp_scroll(-5, 20, 5), 0);
        assert_eq!(clamp_scroll(120, 20, 5), 15);
        assert_eq!(clamp_scroll(7, 20, 5), 7);
    }

    #[test]
    fn test_content_fits_viewport() {
        assert_eq!(max_scroll(3, 10), 0);
        assert_eq!(clamp_scroll(4, 3, 10), 0);
        assert_eq!(clamp_scroll(1, 0, 0), 0);
    }

    #[test]
    fn test_scroll_by_and_page() {
        assert_eq!(scroll_by(14, WHEEL_SCROLL, 20, 5), 15);
        assert_eq!(scroll_by(2, -LINE_SCROLL * 5, 20, 5), 0);
        assert_eq!(page_size(10), 9);
        assert_eq!(page_size(1), 1);
    }
}
