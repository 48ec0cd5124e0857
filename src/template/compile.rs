//! Tree → Template compiler.
//!
//! Walks the tree once, breadth-first per template, emitting one op per node.
//! Bindings are classified on the way:
//!
//! - `Binding::Static` stays a literal.
//! - `Signal` / `Getter` / `Shared` become external sources.
//! - `Binding::Element` is matched against the stack of enclosing
//!   iterations (innermost first) by item type and rewritten to a frame
//!   index. The body of a `ForEach` is compiled once, against the item
//!   type alone, so op count never depends on collection length.
//!
//! Anything that cannot be classified is a definition bug and fails the
//! whole compile.

use std::collections::VecDeque;

use tracing::{debug, error};

use crate::error::CompileError;
use crate::tree::{Binding, ElementType, Items, Node, Sizing};

use super::{ItemsSource, Op, OpKind, Source, Template};

/// Compile a tree into a template.
pub fn compile(root: &Node) -> Result<Template, CompileError> {
    let mut compiler = Compiler { frames: Vec::new() };
    match compiler.template(root) {
        Ok(template) => {
            debug!(
                ops = template.len(),
                total_ops = template.total_ops(),
                max_depth = template.max_depth(),
                "compiled template"
            );
            Ok(template)
        }
        Err(err) => {
            error!(%err, root = root.kind_name(), "template compile failed");
            Err(err)
        }
    }
}

struct Compiler {
    /// Item types of the enclosing iterations, innermost last.
    frames: Vec<ElementType>,
}

impl Compiler {
    fn template(&mut self, root: &Node) -> Result<Template, CompileError> {
        let mut ops: Vec<Op> = Vec::new();
        let mut queue: VecDeque<(&Node, Option<u32>, u16)> = VecDeque::new();
        queue.push_back((root, None, 0));

        while let Some((node, parent, depth)) = queue.pop_front() {
            let index = ops.len() as u32;
            let kind = self.op_kind(node)?;
            let sizing = sizing(node)?;

            // Queued nodes take the indices right after this one, so the
            // children pushed now land contiguously after them.
            let (start, end) = match node {
                Node::Container(c) => {
                    let start = index + 1 + queue.len() as u32;
                    for child in &c.children {
                        queue.push_back((child, Some(index), depth + 1));
                    }
                    (start, start + c.children.len() as u32)
                }
                _ => (0, 0),
            };

            ops.push(Op {
                kind,
                sizing,
                parent,
                start,
                end,
                depth,
            });
        }

        Ok(Template::new(ops))
    }

    fn op_kind(&mut self, node: &Node) -> Result<OpKind, CompileError> {
        Ok(match node {
            Node::Empty => OpKind::Nop,

            Node::Text(t) => OpKind::Text {
                content: self.source(&t.content)?,
                style: self.source(&t.style)?,
            },

            Node::Progress(p) => OpKind::Progress {
                value: self.source(&p.value)?,
                filled: p.filled,
                empty: p.empty,
            },

            Node::Container(c) => OpKind::Container {
                direction: c.direction,
                gap: c.gap,
                borders: c.borders,
                border_style: c.border_style,
                border_color: c.border_color,
                fill: c.fill,
                scroll: c.scroll.as_ref().map(|s| self.source(s)).transpose()?,
            },

            Node::If(i) => OpKind::If {
                condition: self.source(&i.condition)?,
                then: Box::new(self.template(&i.then)?),
                otherwise: match &i.otherwise {
                    Some(node) => Some(Box::new(self.template(node)?)),
                    None => None,
                },
            },

            Node::ForEach(f) => {
                // The collection itself is read in the enclosing scope.
                let items = self.items(&f.items)?;
                self.frames.push(f.items.item());
                let body = self.template(&f.body);
                self.frames.pop();
                OpKind::ForEach {
                    items,
                    body: Box::new(body?),
                }
            }

            Node::Switch(s) => {
                let mut cases = Vec::with_capacity(s.cases.len());
                for (key, node) in &s.cases {
                    if cases.iter().any(|(k, _)| k == key) {
                        return Err(CompileError::DuplicateCase { key: *key });
                    }
                    cases.push((*key, self.template(node)?));
                }
                OpKind::Switch {
                    selector: self.source(&s.selector)?,
                    cases,
                    default: match &s.default {
                        Some(node) => Some(Box::new(self.template(node)?)),
                        None => None,
                    },
                }
            }

            Node::Custom(c) => match &c.measure {
                Some(measure) => OpKind::CustomLayout {
                    draw: c.draw.clone(),
                    measure: measure.clone(),
                    min_width: c.min_width,
                },
                None => OpKind::Custom {
                    draw: c.draw.clone(),
                    min_width: c.min_width,
                    min_height: c.min_height,
                },
            },
        })
    }

    fn source<T: Clone + PartialEq + 'static>(
        &self,
        binding: &Binding<T>,
    ) -> Result<Source<T>, CompileError> {
        Ok(match binding {
            Binding::Static(v) => Source::Static(v.clone()),
            Binding::Signal(s) => Source::Signal(s.clone()),
            Binding::Getter(g) => Source::Getter(g.clone()),
            Binding::Shared(cell) => Source::Shared(cell.clone()),
            Binding::Element(read) => Source::Offset {
                frame: self.frame(read.element())?,
                read: read.clone(),
            },
        })
    }

    fn items(&self, items: &Items) -> Result<ItemsSource, CompileError> {
        Ok(match items {
            Items::Shared(list) => ItemsSource::External(list.clone()),
            Items::Element(list) => ItemsSource::Offset {
                frame: self.frame(list.element())?,
                list: list.clone(),
            },
        })
    }

    /// Frame index of the innermost iteration over `element`.
    fn frame(&self, element: ElementType) -> Result<u16, CompileError> {
        let Some(innermost) = self.frames.last() else {
            return Err(CompileError::UnboundElement {
                element: element.name(),
            });
        };
        self.frames
            .iter()
            .rev()
            .position(|f| f.id() == element.id())
            .map(|p| p as u16)
            .ok_or(CompileError::ElementTypeMismatch {
                element: element.name(),
                innermost: innermost.name(),
            })
    }
}

fn sizing(node: &Node) -> Result<Sizing, CompileError> {
    let sizing = match node {
        Node::Text(n) => n.sizing,
        Node::Progress(n) => n.sizing,
        Node::Container(n) => n.sizing,
        Node::Custom(n) => n.sizing,
        _ => Sizing::default(),
    };
    if !sizing.grow.is_finite() || sizing.grow < 0.0 {
        return Err(CompileError::InvalidGrow { grow: sizing.grow });
    }
    Ok(sizing)
}

// =============================================================================
// Tests
// =============================================================================
