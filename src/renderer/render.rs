//! Template → cells.
//!
//! Walks ops top-down from the root, re-reading every binding against live
//! data and writing at absolute positions derived from the last layout.
//! Layout must run immediately before render in the same frame: iteration
//! walks the real collection again and trusts the heights layout recorded.

use tracing::trace;

use crate::layout::clamp_scroll;
use crate::template::{Geom, Op, OpKind, Template};
use crate::tree::Scope;
use crate::types::{ClipRect, Style};

use super::buffer::{filled_cells, Canvas, CellBuffer};

impl Template {
    /// Render at `(x, y)`, clipped to `max_width` columns and the buffer.
    pub fn render(&mut self, buf: &mut CellBuffer, x: u16, y: u16, max_width: u16) {
        self.render_in(buf, x, y, max_width, &Scope::root());
    }

    /// [`render`](Self::render) inside active iterations.
    pub fn render_in(&mut self, buf: &mut CellBuffer, x: u16, y: u16, max_width: u16, scope: &Scope<'_>) {
        if self.ops.is_empty() {
            return;
        }
        let area = ClipRect::new(x, y, max_width, buf.height().saturating_sub(y));
        let Some(clip) = area.intersect(&buf.bounds()) else {
            return;
        };
        self.render_at(buf, x as i32, y as i32, &clip, scope);
        trace!(x, y, max_width, "render");
    }

    pub(crate) fn render_at(&mut self, buf: &mut CellBuffer, x: i32, y: i32, clip: &ClipRect, scope: &Scope<'_>) {
        if !self.ops.is_empty() {
            render_op(&mut self.ops, &mut self.geom, 0, buf, x, y, clip, scope);
        }
    }
}

/// Where a container's children go once the container itself is drawn.
struct ChildFrame {
    x: i32,
    y: i32,
    clip: ClipRect,
}

#[allow(clippy::too_many_arguments)]
fn render_op(
    ops: &mut [Op],
    geom: &mut [Geom],
    i: usize,
    buf: &mut CellBuffer,
    ox: i32,
    oy: i32,
    clip: &ClipRect,
    scope: &Scope<'_>,
) {
    let g = &geom[i];
    let (x, y) = (ox + g.x as i32, oy + g.y as i32);
    let (width, height) = (g.width, g.height);
    let Some(bounds) = intersect_box(clip, x, y, width, height) else {
        return;
    };
    let range = ops[i].children();

    let children = match &mut ops[i].kind {
        OpKind::Nop => None,

        OpKind::Text { content, style } => {
            let style = style.get(scope).unwrap_or(Style::PLAIN);
            content.with(scope, |s| buf.draw_text(x, y, s, style, Some(&bounds)));
            None
        }

        OpKind::Progress { value, filled, empty } => {
            let n = filled_cells(value.get(scope).unwrap_or(0.0), width);
            buf.draw_bar(x, y, width, n, *filled, *empty, Some(&bounds));
            None
        }

        OpKind::Container {
            borders,
            border_style,
            border_color,
            fill,
            scroll,
            ..
        } => {
            if let Some(bg) = fill {
                buf.fill_rect(x, y, width, height, *bg, Some(&bounds));
            }
            buf.draw_border(x, y, width, height, *borders, *border_style, *border_color, Some(&bounds));

            let (left, right) = borders.horizontal();
            let (top, bottom) = borders.vertical();
            let offset = match scroll {
                Some(scroll) => {
                    let viewport = height.saturating_sub(top + bottom);
                    let content = geom[i].content_height.saturating_sub(top + bottom);
                    clamp_scroll(scroll.get(scope).unwrap_or(0), content, viewport) as i32
                }
                None => 0,
            };
            intersect_box(
                &bounds,
                x + left as i32,
                y + top as i32,
                width.saturating_sub(left + right),
                height.saturating_sub(top + bottom),
            )
            .map(|clip| ChildFrame {
                x,
                y: y - offset,
                clip,
            })
        }

        kind @ (OpKind::If { .. } | OpKind::Switch { .. }) => {
            let live = kind.select(scope);
            if live != geom[i].active {
                // Data changed since layout; fit the new branch to this box
                geom[i].active = live;
                if let Some(branch) = live.and_then(|b| kind.branch_mut(b)) {
                    branch.layout_assigned(width, Some(height), scope);
                }
                trace!(op = i, ?live, "branch switched after layout");
            }
            if let Some(branch) = live.and_then(|b| kind.branch_mut(b)) {
                branch.render_at(buf, x, y, &bounds, scope);
            }
            None
        }

        OpKind::ForEach { items, body } => {
            let heights = &geom[i].items;
            let known = items.len(scope) == heights.len();
            let mut offset = 0i32;
            items.visit(scope, &mut |n, item| {
                let top = y + offset;
                if top >= bounds.bottom() as i32 {
                    return;
                }
                if known {
                    let h = heights[n];
                    if !rows_visible(&bounds, top, h) {
                        offset += h as i32;
                        return;
                    }
                }
                let scope = scope.push(item);
                body.layout_item(width, &scope);
                let h = body.geom[0].height;
                if rows_visible(&bounds, top, h) {
                    body.render_at(buf, x, top, &bounds, &scope);
                }
                offset += h as i32;
            });
            None
        }

        OpKind::Custom { draw, .. } | OpKind::CustomLayout { draw, .. } => {
            let mut canvas = Canvas::new(buf, x, y, width, height, bounds);
            draw(&mut canvas, scope);
            None
        }
    };

    if let Some(frame) = children {
        for c in range {
            render_op(ops, geom, c, buf, frame.x, frame.y, &frame.clip, scope);
        }
    }
}

/// Intersection of `clip` with the box at `(x, y)`; `None` if empty.
fn intersect_box(clip: &ClipRect, x: i32, y: i32, width: u16, height: u16) -> Option<ClipRect> {
    let x1 = x.max(clip.x as i32);
    let y1 = y.max(clip.y as i32);
    let x2 = (x + width as i32).min(clip.right() as i32);
    let y2 = (y + height as i32).min(clip.bottom() as i32);
    if x2 > x1 && y2 > y1 {
        Some(ClipRect::new(x1 as u16, y1 as u16, (x2 - x1) as u16, (y2 - y1) as u16))
    } else {
        None
    }
}

#[inline]
fn rows_visible(clip: &ClipRect, top: i32, height: u16) -> bool {
    top < clip.bottom() as i32 && top + height as i32 > clip.y as i32
}

// =============================================================================
// Tests
// =============================================================================
