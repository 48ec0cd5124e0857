//! The three layout passes.
//!
//! Run in this order, every frame, before render:
//!
//! 1. **Widths** (top-down). Rows size non-flex children first (explicit,
//!    percent, or natural width), then split what is left among flex
//!    children by weight. Columns hand every child the full inner width.
//! 2. **Heights** (bottom-up, deepest first). Leaves report fixed heights,
//!    containers aggregate (row = max, column = sum + gaps), control flow
//!    lays out whichever branch or items are live and reports their height.
//! 3. **Vertical flex** (top-down). Columns split leftover height among flex
//!    children and re-derive child Y. Flex heights given to an `If` or
//!    `Switch` are pushed into the active branch, which re-runs this pass.
//!
//! Collapsed ops (no-ops, inactive conditionals, unmatched switches, empty
//! iterations) take no space and no gap.

use tracing::trace;

use crate::template::{Geom, Op, OpKind, Template};
use crate::tree::{Scope, Sizing};
use crate::types::{Dimension, Direction};

use super::flex::FlexSplit;
use super::text_measure::string_width;

impl Template {
    /// Lay out against a viewport `width` cells wide.
    ///
    /// With `height`, the root fills it unless it has an explicit height;
    /// without, the root takes its content height.
    pub fn layout(&mut self, width: u16, height: Option<u16>) {
        self.layout_in(width, height, &Scope::root());
    }

    /// [`layout`](Self::layout) inside active iterations.
    pub fn layout_in(&mut self, width: u16, height: Option<u16>, scope: &Scope<'_>) {
        if self.ops.is_empty() {
            return;
        }
        let sizing = self.root_sizing(scope);
        let width = sizing.width.resolve(width).unwrap_or(width);
        let fill = height.map(|h| sizing.height.resolve(h).unwrap_or(h));
        self.layout_assigned(width, fill, scope);

        trace!(
            width,
            height = self.geom[0].height,
            ops = self.ops.len(),
            "layout"
        );
    }

    /// Lay out with the root's box already decided by the caller.
    pub(crate) fn layout_assigned(&mut self, width: u16, fill: Option<u16>, scope: &Scope<'_>) {
        if self.ops.is_empty() {
            return;
        }
        self.resolve(scope);
        self.geom[0].width = width;
        self.pass_widths(scope);
        self.pass_heights(scope);
        if let Some(height) = fill {
            self.geom[0].height = height;
        }
        self.pass_flex(scope);
    }

    /// Lay out one iteration item in `width` columns; an explicit width on
    /// the body root still wins.
    pub(crate) fn layout_item(&mut self, width: u16, scope: &Scope<'_>) {
        if self.ops.is_empty() {
            return;
        }
        let width = self.root_sizing(scope).width.resolve(width).unwrap_or(width);
        self.layout_assigned(width, None, scope);
    }

    /// Give the root a new height and redistribute vertical flex below it.
    pub(crate) fn fill_height(&mut self, height: u16, scope: &Scope<'_>) {
        if self.geom.first().is_some_and(|root| root.height != height) {
            self.geom[0].height = height;
            self.pass_flex(scope);
        }
    }

    /// Sizing the root presents to its parent.
    pub(crate) fn root_sizing(&self, scope: &Scope<'_>) -> Sizing {
        self.ops
            .first()
            .map_or_else(Sizing::default, |op| effective_sizing(op, op.kind.select(scope), scope))
    }

    /// Natural width of the root for the current data.
    pub fn natural_width(&self, scope: &Scope<'_>) -> u16 {
        if self.ops.is_empty() {
            0
        } else {
            natural_width(&self.ops, 0, scope)
        }
    }

    /// Reset geometry and record which ops are live this frame.
    fn resolve(&mut self, scope: &Scope<'_>) {
        for (op, g) in self.ops.iter().zip(self.geom.iter_mut()) {
            g.x = 0;
            g.y = 0;
            g.width = 0;
            g.height = 0;
            g.content_height = 0;
            g.items.clear();
            g.active = op.kind.select(scope);
            g.collapsed = is_collapsed(op, g.active, scope);
        }
    }

    // =========================================================================
    // Pass 1: widths
    // =========================================================================

    fn pass_widths(&mut self, scope: &Scope<'_>) {
        let Template {
            ops, geom, depths, ..
        } = self;

        for bucket in depths.iter() {
            for &i in bucket {
                let i = i as usize;
                let OpKind::Container {
                    direction,
                    gap,
                    borders,
                    ..
                } = &ops[i].kind
                else {
                    continue;
                };
                if geom[i].collapsed {
                    continue;
                }

                let (left, right) = borders.horizontal();
                let (top, _) = borders.vertical();
                let inner = geom[i].width.saturating_sub(left + right);
                let range = ops[i].children();

                match direction {
                    Direction::Row => {
                        widths_row(ops, geom, range.clone(), inner, *gap, scope);
                        let mut x = left;
                        for c in range {
                            if geom[c].collapsed {
                                continue;
                            }
                            geom[c].x = x;
                            geom[c].y = top;
                            x = x.saturating_add(geom[c].width).saturating_add(*gap);
                        }
                    }
                    Direction::Column => {
                        for c in range {
                            if geom[c].collapsed {
                                continue;
                            }
                            let sizing = effective_sizing(&ops[c], geom[c].active, scope);
                            geom[c].width = sizing.width.resolve(inner).unwrap_or(inner);
                            geom[c].x = left;
                        }
                    }
                }
            }
        }
    }

    // =========================================================================
    // Pass 2: heights
    // =========================================================================

    fn pass_heights(&mut self, scope: &Scope<'_>) {
        let Template {
            ops, geom, depths, ..
        } = self;

        for bucket in depths.iter().rev() {
            for &i in bucket {
                let i = i as usize;
                if geom[i].collapsed {
                    geom[i].width = 0;
                    continue;
                }

                let width = geom[i].width;
                let range = ops[i].children();
                let explicit = ops[i].sizing.height;

                let content = match &mut ops[i].kind {
                    OpKind::Nop => 0,
                    OpKind::Text { .. } | OpKind::Progress { .. } => 1,
                    OpKind::Custom { min_height, .. } => *min_height,
                    OpKind::CustomLayout { measure, .. } => measure(width, scope),
                    kind @ (OpKind::If { .. } | OpKind::Switch { .. }) => {
                        match geom[i].active.and_then(|b| kind.branch_mut(b)) {
                            Some(branch) => {
                                branch.layout_assigned(width, None, scope);
                                branch.geom[0].height
                            }
                            None => 0,
                        }
                    }
                    OpKind::ForEach { items, body } => {
                        let heights = &mut geom[i].items;
                        let mut total = 0u16;
                        items.visit(scope, &mut |_, item| {
                            let scope = scope.push(item);
                            body.layout_item(width, &scope);
                            let h = body.geom[0].height;
                            heights.push(h);
                            total = total.saturating_add(h);
                        });
                        total
                    }
                    OpKind::Container {
                        direction,
                        gap,
                        borders,
                        ..
                    } => {
                        let (top, bottom) = borders.vertical();
                        let mut visible = 0u16;
                        let mut sum = 0u16;
                        let mut max = 0u16;
                        for c in range {
                            if geom[c].collapsed {
                                continue;
                            }
                            let h = geom[c].height;
                            if direction.is_row() {
                                max = max.max(h);
                            } else {
                                if visible > 0 {
                                    sum = sum.saturating_add(*gap);
                                }
                                geom[c].y = top.saturating_add(sum);
                                sum = sum.saturating_add(h);
                            }
                            visible += 1;
                        }
                        if visible == 0 {
                            0
                        } else {
                            let inner = if direction.is_row() { max } else { sum };
                            inner.saturating_add(top + bottom)
                        }
                    }
                };

                geom[i].content_height = content;
                geom[i].height = match explicit {
                    Dimension::Cells(n) => n,
                    _ => content,
                };
            }
        }
    }

    // =========================================================================
    // Pass 3: vertical flex
    // =========================================================================

    fn pass_flex(&mut self, scope: &Scope<'_>) {
        let Template {
            ops, geom, depths, ..
        } = self;

        for bucket in depths.iter() {
            for &i in bucket {
                let i = i as usize;
                if geom[i].collapsed {
                    continue;
                }
                let height = geom[i].height;
                let range = ops[i].children();

                let column = match &mut ops[i].kind {
                    kind @ (OpKind::If { .. } | OpKind::Switch { .. }) => {
                        if let Some(branch) = geom[i].active.and_then(|b| kind.branch_mut(b)) {
                            branch.fill_height(height, scope);
                        }
                        None
                    }
                    OpKind::Container {
                        direction,
                        gap,
                        borders,
                        scroll,
                        ..
                    } => {
                        let (top, bottom) = borders.vertical();
                        Some(FlexColumn {
                            inner: height.saturating_sub(top + bottom),
                            top,
                            gap: *gap,
                            // Viewports keep children at content height
                            grow: !direction.is_row() && scroll.is_none(),
                            stack: !direction.is_row(),
                        })
                    }
                    _ => None,
                };
                if let Some(column) = column {
                    column.apply(ops, geom, range, scope);
                }
            }
        }
    }
}

/// Vertical distribution inside one container.
struct FlexColumn {
    inner: u16,
    top: u16,
    gap: u16,
    /// Split leftover height among flex children.
    grow: bool,
    /// Children stack vertically (re-derive Y).
    stack: bool,
}

impl FlexColumn {
    fn apply(&self, ops: &[Op], geom: &mut [Geom], range: std::ops::Range<usize>, scope: &Scope<'_>) {
        let mut used = 0u16;
        let mut visible = 0u16;
        let mut total_weight = 0.0f32;
        let mut flex_count = 0usize;

        for c in range.clone() {
            if geom[c].collapsed {
                continue;
            }
            visible += 1;
            let sizing = effective_sizing(&ops[c], geom[c].active, scope);
            if let Dimension::Percent(_) = sizing.height {
                geom[c].height = sizing.height.resolve(self.inner).unwrap_or(geom[c].height);
            }
            if self.grow && sizing.is_flex(sizing.height) {
                total_weight += sizing.grow;
                flex_count += 1;
            } else {
                used = used.saturating_add(geom[c].height);
            }
        }

        if flex_count > 0 {
            let gaps = self.gap.saturating_mul(visible.saturating_sub(1));
            let remaining = self.inner.saturating_sub(used.saturating_add(gaps));
            let mut split = FlexSplit::new(remaining, total_weight, flex_count);
            for c in range.clone() {
                if geom[c].collapsed {
                    continue;
                }
                let sizing = effective_sizing(&ops[c], geom[c].active, scope);
                if sizing.is_flex(sizing.height) {
                    geom[c].height = split.next(sizing.grow);
                }
            }
        }

        if self.stack {
            let mut y = self.top;
            for c in range {
                if geom[c].collapsed {
                    continue;
                }
                geom[c].y = y;
                y = y.saturating_add(geom[c].height).saturating_add(self.gap);
            }
        }
    }
}

/// Row width distribution: non-flex children first, then flex by weight.
fn widths_row(
    ops: &[Op],
    geom: &mut [Geom],
    range: std::ops::Range<usize>,
    inner: u16,
    gap: u16,
    scope: &Scope<'_>,
) {
    let mut used = 0u16;
    let mut visible = 0u16;
    let mut total_weight = 0.0f32;
    let mut flex_count = 0usize;

    for c in range.clone() {
        if geom[c].collapsed {
            continue;
        }
        visible += 1;
        let sizing = effective_sizing(&ops[c], geom[c].active, scope);
        if sizing.is_flex(sizing.width) {
            total_weight += sizing.grow;
            flex_count += 1;
        } else {
            let w = sizing
                .width
                .resolve(inner)
                .unwrap_or_else(|| natural_width(ops, c, scope));
            geom[c].width = w;
            used = used.saturating_add(w);
        }
    }

    if flex_count == 0 {
        return;
    }
    let gaps = gap.saturating_mul(visible.saturating_sub(1));
    let remaining = inner.saturating_sub(used.saturating_add(gaps));
    let mut split = FlexSplit::new(remaining, total_weight, flex_count);
    for c in range {
        if geom[c].collapsed {
            continue;
        }
        let sizing = effective_sizing(&ops[c], geom[c].active, scope);
        if sizing.is_flex(sizing.width) {
            geom[c].width = split.next(sizing.grow);
        }
    }
}

/// Sizing an op presents to its parent. Conditionals present the sizing of
/// their active branch.
fn effective_sizing(op: &Op, active: Option<u16>, scope: &Scope<'_>) -> Sizing {
    match &op.kind {
        OpKind::If { .. } | OpKind::Switch { .. } => active
            .and_then(|b| op.kind.branch(b))
            .map_or_else(Sizing::default, |t| t.root_sizing(scope)),
        _ => op.sizing,
    }
}

fn is_collapsed(op: &Op, active: Option<u16>, scope: &Scope<'_>) -> bool {
    match &op.kind {
        OpKind::Nop => true,
        OpKind::If { .. } | OpKind::Switch { .. } => active.is_none(),
        OpKind::ForEach { items, .. } => items.len(scope) == 0,
        _ => false,
    }
}

/// Width an op wants when nothing stretches it. Reads live data.
pub(crate) fn natural_width(ops: &[Op], i: usize, scope: &Scope<'_>) -> u16 {
    let op = &ops[i];
    if let Dimension::Cells(n) = op.sizing.width {
        return n;
    }

    match &op.kind {
        OpKind::Nop | OpKind::Progress { .. } => 0,
        OpKind::Text { content, .. } => content.with(scope, |s| string_width(s)).unwrap_or(0),
        OpKind::Custom { min_width, .. } | OpKind::CustomLayout { min_width, .. } => *min_width,
        OpKind::If { .. } | OpKind::Switch { .. } => op
            .kind
            .select(scope)
            .and_then(|b| op.kind.branch(b))
            .map_or(0, |t| t.natural_width(scope)),
        OpKind::ForEach { items, body } => {
            let mut max = 0u16;
            items.visit(scope, &mut |_, item| {
                let scope = scope.push(item);
                max = max.max(body.natural_width(&scope));
            });
            max
        }
        OpKind::Container {
            direction,
            gap,
            borders,
            ..
        } => {
            let (left, right) = borders.horizontal();
            let mut visible = 0u16;
            let mut sum = 0u16;
            let mut max = 0u16;
            for c in op.children() {
                if is_collapsed(&ops[c], ops[c].kind.select(scope), scope) {
                    continue;
                }
                let w = natural_width(ops, c, scope);
                if visible > 0 {
                    sum = sum.saturating_add(*gap);
                }
                sum = sum.saturating_add(w);
                max = max.max(w);
                visible += 1;
            }
            if visible == 0 {
                return 0;
            }
            let inner = if direction.is_row() { sum } else { max };
            inner.saturating_add(left + right)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
