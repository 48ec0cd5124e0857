//! Property-based invariant tests for layout and render clipping.
//!
//! 1. Flex shares always sum to exactly the leftover space
//! 2. Every share but the last is the rounded-down proportional share
//! 3. Flex children of a column tile its height with no overlap or gap drift
//! 4. Scroll offsets always clamp into `[0, content - viewport]`
//! 5. Rendering never writes outside `(x, y, max_width)`

use proptest::prelude::*;
use spark_stencil::layout::{clamp_scroll, distribute, max_scroll};
use spark_stencil::tree::*;
use spark_stencil::{compile, Cell, CellBuffer};

// ── Strategies ──────────────────────────────────────────────────────────────

fn weights_strategy() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec((1u8..=8).prop_map(f32::from), 1..=12)
}

fn words_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z ]{0,24}", 1..=5)
}

// ═════════════════════════════════════════════════════════════════════════════
// 1-2. Flex distribution
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shares_sum_to_remaining(remaining in 0u16..=2000, weights in weights_strategy()) {
        let shares = distribute(remaining, &weights);
        prop_assert_eq!(shares.len(), weights.len());
        prop_assert_eq!(shares.iter().map(|&s| s as u32).sum::<u32>(), remaining as u32);
    }

    #[test]
    fn only_last_share_absorbs_rounding(remaining in 0u16..=2000, weights in weights_strategy()) {
        let shares = distribute(remaining, &weights);
        let total: f32 = weights.iter().sum();
        let (last, rest) = shares.split_last().unwrap();

        for (share, weight) in rest.iter().zip(&weights) {
            let exact = remaining as f32 * weight / total;
            prop_assert!(*share as f32 <= exact + 1e-3, "share {} > exact {}", share, exact);
            prop_assert!(*share as f32 > exact - 1.0, "share {} lost more than rounding of {}", share, exact);
        }
        let exact_last = remaining as f32 * weights[weights.len() - 1] / total;
        prop_assert!(*last as f32 >= exact_last.floor() - 1e-3);
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// 3. Column flex tiling
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn flex_children_tile_column(
        weights in proptest::collection::vec(1u8..=5, 1..=8),
        gap in 0u16..=3,
        extra in 0u16..=50,
        width in 1u16..=80,
    ) {
        let n = weights.len() as u16;
        let height = n + gap * (n - 1) + extra;
        let tree = column()
            .gap(gap)
            .children(weights.iter().map(|&w| text("x").grow(f32::from(w)).into()));
        let mut template = compile(&tree.into()).unwrap();
        template.layout(width, Some(height));

        let geom = template.geom();
        prop_assert_eq!(geom[0].height, height);

        let mut y = 0;
        let mut total = 0;
        for child in &geom[1..=n as usize] {
            prop_assert_eq!(child.y, y);
            prop_assert_eq!(child.width, width);
            y += child.height + gap;
            total += child.height;
        }
        prop_assert_eq!(total, height - gap * (n - 1));
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// 4. Scroll clamping
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scroll_offset_stays_in_range(offset in any::<i32>(), content in 0u16..=500, viewport in 0u16..=200) {
        let clamped = clamp_scroll(offset, content, viewport);
        prop_assert!(clamped <= max_scroll(content, viewport));
        if offset >= 0 && offset <= max_scroll(content, viewport) as i32 {
            prop_assert_eq!(clamped as i32, offset);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// 5. Render clipping
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn render_stays_inside_target(
        words in words_strategy(),
        x in 0u16..=30,
        y in 0u16..=12,
        max_width in 0u16..=30,
    ) {
        let (buf_w, buf_h) = (30, 10);
        let tree = column().child(
            row().gap(1).children(words.iter().map(|w| text(w.as_str()).into())),
        )
        .child(progress(0.5).width(20u16));

        let mut template = compile(&tree.into()).unwrap();
        template.layout(max_width, None);
        let mut buf = CellBuffer::new(buf_w, buf_h);
        template.render(&mut buf, x, y, max_width);

        for r in 0..buf_h {
            for c in 0..buf_w {
                let inside = c >= x && c < x.saturating_add(max_width) && r >= y;
                if !inside {
                    prop_assert_eq!(buf.get(c, r), Some(&Cell::default()), "wrote at ({}, {})", c, r);
                }
            }
            if r < y {
                prop_assert!(!buf.is_row_dirty(r));
            }
        }
    }
}
