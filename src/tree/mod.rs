//! Declarative tree - the compiler's input.
//!
//! A tree is built from seven node kinds plus the `Empty` sentinel:
//!
//! - [`text`] / [`progress`] - leaves with a bound value
//! - [`row`] / [`column`] - containers
//! - [`when`] - conditional with optional else branch
//! - [`for_each`] - iteration over a collection
//! - [`switch`] - multi-way branch on a `usize` key
//! - [`custom`] - escape hatch drawing straight into the cell buffer
//!
//! The tree describes shape and bindings only. It is compiled once into a
//! [`Template`](crate::template::Template) and never walked per frame.
//!
//! ```ignore
//! use spark_stencil::tree::*;
//!
//! let files = Rc::new(RefCell::new(vec![FileEntry::new("a.txt", 12)]));
//!
//! let tree = column()
//!     .border(Borders::ALL)
//!     .child(text("Files").style(Style::fg(Rgba::CYAN)))
//!     .child(for_each(files.clone(), row()
//!         .gap(1)
//!         .child(text(Binding::field(|f: &FileEntry| &f.name)).grow(1.0))
//!         .child(text(Binding::map(|f: &FileEntry| f.size.to_string())))))
//!     .child(when(Binding::getter(move || files.borrow().is_empty()), text("(empty)")));
//! ```

mod binding;

pub use binding::*;

use std::rc::Rc;

use crate::renderer::Canvas;
use crate::types::{BorderStyle, Borders, Dimension, Direction, Rgba, Style};

// =============================================================================
// Sizing
// =============================================================================

/// How a node sizes itself inside its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    /// Explicit width; overrides the computed width.
    pub width: Dimension,
    /// Explicit height; overrides the computed height.
    pub height: Dimension,
    /// Flex-grow weight along the parent's main axis (0 = not flexible).
    pub grow: f32,
}

impl Sizing {
    /// Whether this node takes part in flex distribution along an axis
    /// whose explicit size is `main`.
    #[inline]
    pub fn is_flex(&self, main: Dimension) -> bool {
        self.grow > 0.0 && !main.is_explicit()
    }
}

impl Default for Sizing {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            grow: 0.0,
        }
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Draw callback for custom nodes. Coordinates on the canvas are local.
pub type DrawFn = Rc<dyn Fn(&mut Canvas<'_>, &Scope<'_>)>;

/// Height callback for custom nodes that lay themselves out: given the
/// assigned width, return the needed height.
pub type MeasureFn = Rc<dyn Fn(u16, &Scope<'_>) -> u16>;

// =============================================================================
// Nodes
// =============================================================================

/// One node of the declarative tree.
pub enum Node {
    /// Absent child. Compiles to a no-op.
    Empty,
    Text(TextNode),
    Progress(ProgressNode),
    Container(ContainerNode),
    If(IfNode),
    ForEach(ForEachNode),
    Switch(SwitchNode),
    Custom(CustomNode),
}

impl Node {
    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Empty => "empty",
            Node::Text(_) => "text",
            Node::Progress(_) => "progress",
            Node::Container(_) => "container",
            Node::If(_) => "if",
            Node::ForEach(_) => "for_each",
            Node::Switch(_) => "switch",
            Node::Custom(_) => "custom",
        }
    }
}

impl<N: Into<Node>> From<Option<N>> for Node {
    fn from(node: Option<N>) -> Self {
        node.map_or(Node::Empty, Into::into)
    }
}

/// Single-line text leaf.
pub struct TextNode {
    pub content: Binding<String>,
    pub style: Binding<Style>,
    pub sizing: Sizing,
}

/// Progress bar leaf. Value is a fraction in `0.0..=1.0`.
pub struct ProgressNode {
    pub value: Binding<f32>,
    pub filled: Style,
    pub empty: Style,
    pub sizing: Sizing,
}

/// Row or column container.
pub struct ContainerNode {
    pub direction: Direction,
    pub gap: u16,
    pub borders: Borders,
    pub border_style: BorderStyle,
    pub border_color: Rgba,
    pub fill: Option<Rgba>,
    /// Vertical scroll offset. When set the container is a viewport: its
    /// children keep their content heights and are clipped to its box.
    pub scroll: Option<Binding<i32>>,
    pub children: Vec<Node>,
    pub sizing: Sizing,
}

/// Conditional.
pub struct IfNode {
    pub condition: Binding<bool>,
    pub then: Box<Node>,
    pub otherwise: Option<Box<Node>>,
}

/// Iteration over a collection; `body` is replayed once per item.
pub struct ForEachNode {
    pub items: Items,
    pub body: Box<Node>,
}

/// Multi-way branch on a key.
pub struct SwitchNode {
    pub selector: Binding<usize>,
    pub cases: Vec<(usize, Node)>,
    pub default: Option<Box<Node>>,
}

/// Escape hatch: draws itself.
pub struct CustomNode {
    pub draw: DrawFn,
    pub min_width: u16,
    pub min_height: u16,
    pub measure: Option<MeasureFn>,
    pub sizing: Sizing,
}

// =============================================================================
// Constructors
// =============================================================================

pub fn text(content: impl Into<Binding<String>>) -> TextNode {
    TextNode {
        content: content.into(),
        style: Binding::Static(Style::PLAIN),
        sizing: Sizing::default(),
    }
}

pub fn progress(value: impl Into<Binding<f32>>) -> ProgressNode {
    ProgressNode {
        value: value.into(),
        filled: Style::PLAIN,
        empty: Style::fg(Rgba::GRAY),
        sizing: Sizing::default(),
    }
}

fn container(direction: Direction) -> ContainerNode {
    ContainerNode {
        direction,
        gap: 0,
        borders: Borders::NONE,
        border_style: BorderStyle::Single,
        border_color: Rgba::TERMINAL_DEFAULT,
        fill: None,
        scroll: None,
        children: Vec::new(),
        sizing: Sizing::default(),
    }
}

pub fn row() -> ContainerNode {
    container(Direction::Row)
}

pub fn column() -> ContainerNode {
    container(Direction::Column)
}

pub fn when(condition: impl Into<Binding<bool>>, then: impl Into<Node>) -> IfNode {
    IfNode {
        condition: condition.into(),
        then: Box::new(then.into()),
        otherwise: None,
    }
}

pub fn for_each(items: impl Into<Items>, body: impl Into<Node>) -> ForEachNode {
    ForEachNode {
        items: items.into(),
        body: Box::new(body.into()),
    }
}

pub fn switch(selector: impl Into<Binding<usize>>) -> SwitchNode {
    SwitchNode {
        selector: selector.into(),
        cases: Vec::new(),
        default: None,
    }
}

pub fn custom(min_height: u16, draw: impl Fn(&mut Canvas<'_>, &Scope<'_>) + 'static) -> CustomNode {
    CustomNode {
        draw: Rc::new(draw),
        min_width: 0,
        min_height,
        measure: None,
        sizing: Sizing::default(),
    }
}

// =============================================================================
// Modifiers
// =============================================================================

macro_rules! sizing_modifiers {
    ($($ty:ty),*) => {$(
        impl $ty {
            pub fn width(mut self, width: impl Into<Dimension>) -> Self {
                self.sizing.width = width.into();
                self
            }

            pub fn height(mut self, height: impl Into<Dimension>) -> Self {
                self.sizing.height = height.into();
                self
            }

            pub fn grow(mut self, weight: f32) -> Self {
                self.sizing.grow = weight;
                self
            }
        }
    )*};
}

sizing_modifiers!(TextNode, ProgressNode, ContainerNode, CustomNode);

impl TextNode {
    pub fn style(mut self, style: impl Into<Binding<Style>>) -> Self {
        self.style = style.into();
        self
    }
}

impl ProgressNode {
    pub fn styles(mut self, filled: Style, empty: Style) -> Self {
        self.filled = filled;
        self.empty = empty;
        self
    }
}

impl ContainerNode {
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn gap(mut self, gap: u16) -> Self {
        self.gap = gap;
        self
    }

    pub fn border(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    pub fn border_style(mut self, style: BorderStyle, color: Rgba) -> Self {
        self.border_style = style;
        self.border_color = color;
        self
    }

    pub fn fill(mut self, bg: Rgba) -> Self {
        self.fill = Some(bg);
        self
    }

    pub fn scroll(mut self, offset: impl Into<Binding<i32>>) -> Self {
        self.scroll = Some(offset.into());
        self
    }
}

impl IfNode {
    pub fn otherwise(mut self, node: impl Into<Node>) -> Self {
        self.otherwise = Some(Box::new(node.into()));
        self
    }
}

impl SwitchNode {
    pub fn case(mut self, key: usize, node: impl Into<Node>) -> Self {
        self.cases.push((key, node.into()));
        self
    }

    pub fn default(mut self, node: impl Into<Node>) -> Self {
        self.default = Some(Box::new(node.into()));
        self
    }
}

impl CustomNode {
    pub fn min_width(mut self, width: u16) -> Self {
        self.min_width = width;
        self
    }

    /// Make the node's height depend on its assigned width.
    pub fn measure(mut self, measure: impl Fn(u16, &Scope<'_>) -> u16 + 'static) -> Self {
        self.measure = Some(Rc::new(measure));
        self
    }
}

macro_rules! into_node {
    ($($ty:ident => $variant:ident),*) => {$(
        impl From<$ty> for Node {
            fn from(node: $ty) -> Self {
                Node::$variant(node)
            }
        }
    )*};
}

into_node!(
    TextNode => Text,
    ProgressNode => Progress,
    ContainerNode => Container,
    IfNode => If,
    ForEachNode => ForEach,
    SwitchNode => Switch,
    CustomNode => Custom
);

// =============================================================================
// Tests
// =============================================================================
