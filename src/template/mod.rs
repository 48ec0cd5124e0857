//! Compiled templates.
//!
//! A [`Template`] is the flat, replayable form of a tree:
//!
//! ```text
//! Node tree ──compile──▶ Template { ops, geom, depths }
//!                              │
//!                   layout ────┤  (writes geom, once per frame)
//!                   render ────┘  (reads ops + geom, writes cells)
//! ```
//!
//! Ops are stored breadth-first, so the direct children of a container are
//! one contiguous range `[start, end)`. Ops never change after compile;
//! only the parallel `geom` array is rewritten each frame.
//!
//! Conditional branches, switch cases and iteration bodies are compiled to
//! their own nested templates because they run zero, one, or many times per
//! frame and need their own geometry.

mod compile;

pub use compile::compile;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use spark_signals::Signal;

use crate::tree::{DrawFn, ElementList, ElementRead, MeasureFn, Scope, SharedList, Sizing};
use crate::types::{BorderStyle, Borders, Direction, Rgba, Style};

// =============================================================================
// Binding Sources
// =============================================================================

/// How a compiled binding is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Literal baked into the op.
    Static,
    /// Application state read fresh each frame.
    External,
    /// Field of an enclosing iteration's current item.
    Offset,
}

/// A leaf value with its binding kind resolved.
#[derive(Clone)]
pub enum Source<T: Clone + PartialEq + 'static> {
    Static(T),
    Signal(Signal<T>),
    Getter(Rc<dyn Fn() -> T>),
    Shared(Rc<RefCell<T>>),
    /// `frame` counts iterations outward from the innermost (0).
    Offset {
        frame: u16,
        read: Rc<dyn ElementRead<T>>,
    },
}

impl<T: Clone + PartialEq + 'static> Source<T> {
    pub fn kind(&self) -> BindingKind {
        match self {
            Source::Static(_) => BindingKind::Static,
            Source::Signal(_) | Source::Getter(_) | Source::Shared(_) => BindingKind::External,
            Source::Offset { .. } => BindingKind::Offset,
        }
    }

    /// Borrow the current value. `None` only for an offset binding with no
    /// matching item in scope.
    pub fn with<R>(&self, scope: &Scope<'_>, f: impl FnOnce(&T) -> R) -> Option<R> {
        match self {
            Source::Static(v) => Some(f(v)),
            Source::Signal(s) => Some(s.with(f)),
            Source::Getter(g) => Some(f(&g())),
            Source::Shared(cell) => Some(f(&*cell.borrow())),
            Source::Offset { frame, read } => {
                let element = scope.element(*frame)?;
                let mut f = Some(f);
                let mut out = None;
                read.read(element, &mut |v| {
                    if let Some(f) = f.take() {
                        out = Some(f(v));
                    }
                });
                out
            }
        }
    }

    /// Current value, cloned.
    #[inline]
    pub fn get(&self, scope: &Scope<'_>) -> Option<T> {
        self.with(scope, T::clone)
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Source::Signal(_) => f.write_str("Signal"),
            Source::Getter(_) => f.write_str("Getter"),
            Source::Shared(_) => f.write_str("Shared"),
            Source::Offset { frame, read } => f
                .debug_struct("Offset")
                .field("frame", frame)
                .field("element", &read.element().name())
                .finish(),
        }
    }
}

/// A `ForEach` collection with its binding kind resolved.
#[derive(Clone)]
pub enum ItemsSource {
    External(Rc<dyn SharedList>),
    Offset { frame: u16, list: Rc<dyn ElementList> },
}

impl ItemsSource {
    pub fn kind(&self) -> BindingKind {
        match self {
            ItemsSource::External(_) => BindingKind::External,
            ItemsSource::Offset { .. } => BindingKind::Offset,
        }
    }

    /// Live item count.
    pub fn len(&self, scope: &Scope<'_>) -> usize {
        match self {
            ItemsSource::External(list) => list.len(),
            ItemsSource::Offset { frame, list } => scope
                .element(*frame)
                .and_then(|e| list.len(e))
                .unwrap_or(0),
        }
    }

    /// Walk the live items in order.
    pub fn visit(&self, scope: &Scope<'_>, f: &mut dyn FnMut(usize, &dyn Any)) {
        match self {
            ItemsSource::External(list) => list.visit(f),
            ItemsSource::Offset { frame, list } => {
                if let Some(element) = scope.element(*frame) {
                    list.visit(element, f);
                }
            }
        }
    }
}

impl fmt::Debug for ItemsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemsSource::External(list) => f.debug_tuple("External").field(&list.item().name()).finish(),
            ItemsSource::Offset { frame, list } => f
                .debug_struct("Offset")
                .field("frame", frame)
                .field("item", &list.item().name())
                .finish(),
        }
    }
}

// =============================================================================
// Ops
// =============================================================================

/// Payload of one compiled instruction.
pub enum OpKind {
    /// Absent child.
    Nop,
    Text {
        content: Source<String>,
        style: Source<Style>,
    },
    Progress {
        value: Source<f32>,
        filled: Style,
        empty: Style,
    },
    Container {
        direction: Direction,
        gap: u16,
        borders: Borders,
        border_style: BorderStyle,
        border_color: Rgba,
        fill: Option<Rgba>,
        scroll: Option<Source<i32>>,
    },
    If {
        condition: Source<bool>,
        then: Box<Template>,
        otherwise: Option<Box<Template>>,
    },
    ForEach {
        items: ItemsSource,
        body: Box<Template>,
    },
    Switch {
        selector: Source<usize>,
        cases: Vec<(usize, Template)>,
        default: Option<Box<Template>>,
    },
    Custom {
        draw: DrawFn,
        min_width: u16,
        min_height: u16,
    },
    CustomLayout {
        draw: DrawFn,
        measure: MeasureFn,
        min_width: u16,
    },
}

/// Fieldless mirror of [`OpKind`] for comparisons and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    Nop,
    Text,
    Progress,
    Container,
    If,
    ForEach,
    Switch,
    Custom,
    CustomLayout,
}

impl OpKind {
    pub fn tag(&self) -> OpTag {
        match self {
            OpKind::Nop => OpTag::Nop,
            OpKind::Text { .. } => OpTag::Text,
            OpKind::Progress { .. } => OpTag::Progress,
            OpKind::Container { .. } => OpTag::Container,
            OpKind::If { .. } => OpTag::If,
            OpKind::ForEach { .. } => OpTag::ForEach,
            OpKind::Switch { .. } => OpTag::Switch,
            OpKind::Custom { .. } => OpTag::Custom,
            OpKind::CustomLayout { .. } => OpTag::CustomLayout,
        }
    }

    /// Kind of the op's driving binding, if it has one.
    pub fn binding_kind(&self) -> Option<BindingKind> {
        match self {
            OpKind::Text { content, .. } => Some(content.kind()),
            OpKind::Progress { value, .. } => Some(value.kind()),
            OpKind::Container { scroll, .. } => scroll.as_ref().map(Source::kind),
            OpKind::If { condition, .. } => Some(condition.kind()),
            OpKind::ForEach { items, .. } => Some(items.kind()),
            OpKind::Switch { selector, .. } => Some(selector.kind()),
            _ => None,
        }
    }

    /// Branch chosen by live data. For `If`, 0 is the then-branch and 1 the
    /// else-branch; for `Switch`, the case position or `cases.len()` for the
    /// default. `None` means nothing renders.
    pub(crate) fn select(&self, scope: &Scope<'_>) -> Option<u16> {
        match self {
            OpKind::If {
                condition, otherwise, ..
            } => {
                if condition.get(scope).unwrap_or(false) {
                    Some(0)
                } else {
                    otherwise.as_ref().map(|_| 1)
                }
            }
            OpKind::Switch {
                selector,
                cases,
                default,
            } => selector
                .get(scope)
                .and_then(|key| cases.iter().position(|(k, _)| *k == key))
                .map(|p| p as u16)
                .or_else(|| default.as_ref().map(|_| cases.len() as u16)),
            _ => None,
        }
    }

    pub(crate) fn branch(&self, branch: u16) -> Option<&Template> {
        match self {
            OpKind::If { then, otherwise, .. } => match branch {
                0 => Some(then),
                _ => otherwise.as_deref(),
            },
            OpKind::Switch { cases, default, .. } => match cases.get(branch as usize) {
                Some((_, t)) => Some(t),
                None => default.as_deref(),
            },
            _ => None,
        }
    }

    pub(crate) fn branch_mut(&mut self, branch: u16) -> Option<&mut Template> {
        match self {
            OpKind::If { then, otherwise, .. } => match branch {
                0 => Some(then),
                _ => otherwise.as_deref_mut(),
            },
            OpKind::Switch { cases, default, .. } => match cases.get_mut(branch as usize) {
                Some((_, t)) => Some(t),
                None => default.as_deref_mut(),
            },
            _ => None,
        }
    }
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Text { content, .. } => f.debug_struct("Text").field("content", content).finish(),
            OpKind::ForEach { items, body } => f
                .debug_struct("ForEach")
                .field("items", items)
                .field("body_ops", &body.len())
                .finish(),
            other => write!(f, "{:?}", other.tag()),
        }
    }
}

/// One compiled instruction.
#[derive(Debug)]
pub struct Op {
    pub kind: OpKind,
    pub sizing: Sizing,
    pub parent: Option<u32>,
    /// Direct children are ops `start..end` (empty for non-containers).
    pub start: u32,
    pub end: u32,
    pub depth: u16,
}

impl Op {
    #[inline]
    pub fn tag(&self) -> OpTag {
        self.kind.tag()
    }

    #[inline]
    pub fn children(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Per-frame layout result for one op.
///
/// Positions are local: relative to the parent's box origin (borders
/// included, scroll not applied).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geom {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Height before vertical flex (and before explicit overrides).
    pub content_height: u16,
    /// Branch laid out for `If` / `Switch`.
    pub active: Option<u16>,
    /// Takes no space this frame.
    pub collapsed: bool,
    /// Item heights for `ForEach`, in collection order.
    pub items: Vec<u16>,
}

impl Geom {
    /// Vertical offset of item `index` within a `ForEach`.
    pub fn item_offset(&self, index: usize) -> u16 {
        self.items.iter().take(index).fold(0u16, |acc, h| acc.saturating_add(*h))
    }
}

// =============================================================================
// Template
// =============================================================================

/// Flat compiled form of a tree. Op 0 is always the root.
#[derive(Debug)]
pub struct Template {
    pub(crate) ops: Vec<Op>,
    pub(crate) geom: Vec<Geom>,
    /// Op indices per depth, for bottom-up traversal.
    pub(crate) depths: Vec<Vec<u32>>,
    pub(crate) max_depth: u16,
}

impl Template {
    pub(crate) fn new(ops: Vec<Op>) -> Self {
        let max_depth = ops.iter().map(|op| op.depth).max().unwrap_or(0);
        let mut depths = vec![Vec::new(); max_depth as usize + 1];
        for (i, op) in ops.iter().enumerate() {
            depths[op.depth as usize].push(i as u32);
        }
        let geom = vec![Geom::default(); ops.len()];
        Self {
            ops,
            geom,
            depths,
            max_depth,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Geometry from the last layout.
    #[inline]
    pub fn geom(&self) -> &[Geom] {
        &self.geom
    }

    #[inline]
    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }

    /// Op indices at `depth`.
    pub fn depth_bucket(&self, depth: u16) -> &[u32] {
        self.depths.get(depth as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kind sequence, for shape comparisons.
    pub fn tags(&self) -> impl Iterator<Item = OpTag> + '_ {
        self.ops.iter().map(Op::tag)
    }

    /// Ops in this template and every nested one.
    pub fn total_ops(&self) -> usize {
        self.ops
            .iter()
            .map(|op| {
                1 + match &op.kind {
                    OpKind::If { then, otherwise, .. } => {
                        then.total_ops() + otherwise.as_ref().map_or(0, |t| t.total_ops())
                    }
                    OpKind::ForEach { body, .. } => body.total_ops(),
                    OpKind::Switch { cases, default, .. } => {
                        cases.iter().map(|(_, t)| t.total_ops()).sum::<usize>()
                            + default.as_ref().map_or(0, |t| t.total_ops())
                    }
                    _ => 0,
                }
            })
            .sum()
    }

    /// Branch template `branch` of the `If`/`Switch` op at `index`.
    pub fn branch(&self, index: usize, branch: u16) -> Option<&Template> {
        self.ops.get(index)?.kind.branch(branch)
    }

    /// Body template of the `ForEach` op at `index`.
    pub fn body(&self, index: usize) -> Option<&Template> {
        match &self.ops.get(index)?.kind {
            OpKind::ForEach { body, .. } => Some(body),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use spark_signals::signal;

    use super::*;

    thread_local! {
        static CLONES: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, PartialEq)]
    struct Label(String);

    impl Clone for Label {
        fn clone(&self) -> Self {
            CLONES.with(|c| c.set(c.get() + 1));
            Label(self.0.clone())
        }
    }

    #[test]
    fn test_signal_source_is_read_in_place() {
        let source = Source::Signal(signal(Label("status".to_string())));
        CLONES.with(|c| c.set(0));

        for _ in 0..3 {
            let len = source.with(&Scope::root(), |l| l.0.len());
            assert_eq!(len, Some(6));
        }
        assert_eq!(CLONES.with(Cell::get), 0);
        assert_eq!(source.kind(), BindingKind::External);
    }
}
