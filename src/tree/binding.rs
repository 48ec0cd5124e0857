//! Leaf-value bindings, iteration element access, and collections.
//!
//! A leaf value in the tree is one of three flavors:
//!
//! - **Static** - a literal baked into the template at compile time.
//! - **External** - a reference to application state read fresh every frame
//!   (`Signal`, `Getter`, or `Shared`).
//! - **Element** - a field of "the current item" of an enclosing `ForEach`.
//!
//! Element bindings never hold an item. They hold a typed accessor plus the
//! item type it expects; the compiler matches that type against the stack
//! of enclosing iterations and rewrites it to a frame index. At render time
//! the frame index is looked up in the [`Scope`], which holds borrowed
//! references to the items currently being iterated. One compiled body is
//! replayed against every item without allocating per item.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use spark_signals::Signal;

// =============================================================================
// Element Type
// =============================================================================

/// Identity of an iteration item type: the Rust-native stand-in for an
/// element's base address and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
    size: usize,
}

impl ElementType {
    pub fn of<E: Any>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            size: std::mem::size_of::<E>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

// =============================================================================
// Scope - active element bases
// =============================================================================

/// The stack of items currently being iterated, innermost first.
///
/// Lives on the call stack only: each `ForEach` pushes a child scope for
/// the duration of one item's layout or render and drops it afterwards.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    element: Option<&'a dyn Any>,
    parent: Option<&'a Scope<'a>>,
    depth: u16,
}

impl Scope<'static> {
    /// Scope with no active iteration.
    pub const fn root() -> Self {
        Self {
            element: None,
            parent: None,
            depth: 0,
        }
    }
}

impl<'a> Scope<'a> {
    /// Enter one iteration item.
    pub fn push<'b>(&'b self, element: &'b dyn Any) -> Scope<'b> {
        Scope {
            element: Some(element),
            parent: Some(self),
            depth: self.depth + 1,
        }
    }

    /// Number of active iterations.
    #[inline]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Item at `frame` iterations out from the innermost (0 = innermost).
    pub fn element(&self, frame: u16) -> Option<&'a dyn Any> {
        let mut scope = self;
        for _ in 0..frame {
            scope = scope.parent?;
        }
        scope.element
    }

    /// Innermost item of type `E`, for custom nodes.
    pub fn nearest<E: Any>(&self) -> Option<&'a E> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(e) = s.element.and_then(|e| e.downcast_ref::<E>()) {
                return Some(e);
            }
            scope = s.parent;
        }
        None
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("depth", &self.depth).finish()
    }
}

// =============================================================================
// Element Fields
// =============================================================================

/// Typed read access into one iteration item.
pub trait ElementRead<T: ?Sized> {
    /// The item type this accessor expects.
    fn element(&self) -> ElementType;

    /// Hand the field of `element` to `f`. Returns false if `element` is not
    /// of the expected type.
    fn read(&self, element: &dyn Any, f: &mut dyn FnMut(&T)) -> bool;
}

struct FieldRef<E, F> {
    read: F,
    _element: PhantomData<fn(&E)>,
}

impl<E: Any, T: ?Sized, F: Fn(&E) -> &T> ElementRead<T> for FieldRef<E, F> {
    fn element(&self) -> ElementType {
        ElementType::of::<E>()
    }

    fn read(&self, element: &dyn Any, f: &mut dyn FnMut(&T)) -> bool {
        match element.downcast_ref::<E>() {
            Some(e) => {
                f((self.read)(e));
                true
            }
            None => false,
        }
    }
}

struct FieldMap<E, F> {
    map: F,
    _element: PhantomData<fn(&E)>,
}

impl<E: Any, T, F: Fn(&E) -> T> ElementRead<T> for FieldMap<E, F> {
    fn element(&self) -> ElementType {
        ElementType::of::<E>()
    }

    fn read(&self, element: &dyn Any, f: &mut dyn FnMut(&T)) -> bool {
        match element.downcast_ref::<E>() {
            Some(e) => {
                let value = (self.map)(e);
                f(&value);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Binding
// =============================================================================

/// A leaf value as written in the tree.
///
/// ```ignore
/// use spark_stencil::tree::Binding;
/// use spark_signals::signal;
///
/// let title: Binding<String> = "Files".into();               // static
/// let count = signal(3usize);
/// let shown: Binding<usize> = count.clone().into();           // external
/// let name = Binding::field(|f: &FileEntry| &f.name);          // element
/// ```
#[derive(Clone)]
pub enum Binding<T: Clone + PartialEq + 'static> {
    /// Literal value baked into the template.
    Static(T),
    /// Reactive signal, read every frame.
    Signal(Signal<T>),
    /// Getter function, called every frame.
    Getter(Rc<dyn Fn() -> T>),
    /// Shared application state, borrowed every frame without cloning.
    Shared(Rc<RefCell<T>>),
    /// Field of the current iteration item.
    Element(Rc<dyn ElementRead<T>>),
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Bind to a field of the current iteration item by reference.
    pub fn field<E: Any>(read: impl Fn(&E) -> &T + 'static) -> Self {
        Binding::Element(Rc::new(FieldRef {
            read,
            _element: PhantomData,
        }))
    }

    /// Bind to a value computed from the current iteration item.
    pub fn map<E: Any>(map: impl Fn(&E) -> T + 'static) -> Self {
        Binding::Element(Rc::new(FieldMap {
            map,
            _element: PhantomData,
        }))
    }

    /// Bind to a getter function.
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        Binding::Getter(Rc::new(f))
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Binding<T> {
    fn default() -> Self {
        Binding::Static(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> From<T> for Binding<T> {
    fn from(value: T) -> Self {
        Binding::Static(value)
    }
}

impl<T: Clone + PartialEq + 'static> From<Signal<T>> for Binding<T> {
    fn from(signal: Signal<T>) -> Self {
        Binding::Signal(signal)
    }
}

impl<T: Clone + PartialEq + 'static> From<Rc<RefCell<T>>> for Binding<T> {
    fn from(shared: Rc<RefCell<T>>) -> Self {
        Binding::Shared(shared)
    }
}

impl From<&str> for Binding<String> {
    fn from(value: &str) -> Self {
        Binding::Static(value.to_string())
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Binding::Signal(_) => f.write_str("Signal"),
            Binding::Getter(_) => f.write_str("Getter"),
            Binding::Shared(_) => f.write_str("Shared"),
            Binding::Element(read) => f.debug_tuple("Element").field(&read.element().name()).finish(),
        }
    }
}

// =============================================================================
// Collections
// =============================================================================

/// A collection owned by application state.
pub trait SharedList {
    /// Type of the items.
    fn item(&self) -> ElementType;
    fn len(&self) -> usize;
    /// Walk the live items in order.
    fn visit(&self, f: &mut dyn FnMut(usize, &dyn Any));
}

impl<U: Any> SharedList for RefCell<Vec<U>> {
    fn item(&self) -> ElementType {
        ElementType::of::<U>()
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn visit(&self, f: &mut dyn FnMut(usize, &dyn Any)) {
        let items = self.borrow();
        for (i, item) in items.iter().enumerate() {
            f(i, item);
        }
    }
}

/// A collection reached through a field of an enclosing iteration item.
pub trait ElementList {
    /// Type of the enclosing item holding the collection.
    fn element(&self) -> ElementType;
    /// Type of the collection's items.
    fn item(&self) -> ElementType;
    fn len(&self, element: &dyn Any) -> Option<usize>;
    fn visit(&self, element: &dyn Any, f: &mut dyn FnMut(usize, &dyn Any)) -> bool;
}

struct ListField<E, U, F> {
    read: F,
    _types: PhantomData<fn(&E) -> &U>,
}

impl<E: Any, U: Any, F: Fn(&E) -> &[U]> ElementList for ListField<E, U, F> {
    fn element(&self) -> ElementType {
        ElementType::of::<E>()
    }

    fn item(&self) -> ElementType {
        ElementType::of::<U>()
    }

    fn len(&self, element: &dyn Any) -> Option<usize> {
        element.downcast_ref::<E>().map(|e| (self.read)(e).len())
    }

    fn visit(&self, element: &dyn Any, f: &mut dyn FnMut(usize, &dyn Any)) -> bool {
        match element.downcast_ref::<E>() {
            Some(e) => {
                for (i, item) in (self.read)(e).iter().enumerate() {
                    f(i, item);
                }
                true
            }
            None => false,
        }
    }
}

/// The collection a `ForEach` walks.
#[derive(Clone)]
pub enum Items {
    /// Application-owned vector, walked live each frame.
    Shared(Rc<dyn SharedList>),
    /// Slice inside the current item of an enclosing iteration.
    Element(Rc<dyn ElementList>),
}

impl Items {
    pub fn shared<U: Any>(list: Rc<RefCell<Vec<U>>>) -> Self {
        Items::Shared(list)
    }

    pub fn field<E: Any, U: Any>(read: impl Fn(&E) -> &[U] + 'static) -> Self {
        Items::Element(Rc::new(ListField {
            read,
            _types: PhantomData,
        }))
    }

    /// Type of the items this collection yields.
    pub fn item(&self) -> ElementType {
        match self {
            Items::Shared(list) => list.item(),
            Items::Element(list) => list.item(),
        }
    }
}

impl<U: Any> From<Rc<RefCell<Vec<U>>>> for Items {
    fn from(list: Rc<RefCell<Vec<U>>>) -> Self {
        Items::Shared(list)
    }
}

impl fmt::Debug for Items {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Items::Shared(list) => f.debug_tuple("Shared").field(&list.item().name()).finish(),
            Items::Element(list) => f.debug_tuple("Element").field(&list.item().name()).finish(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: String,
        size: u64,
        tags: Vec<&'static str>,
    }

    fn row() -> Row {
        Row {
            name: "a.txt".to_string(),
            size: 42,
            tags: vec!["x", "y"],
        }
    }

    #[test]
    fn test_scope_frames() {
        let outer = row();
        let inner = 7u32;
        let root = Scope::root();
        let s1 = root.push(&outer);
        let s2 = s1.push(&inner);

        assert_eq!(root.depth(), 0);
        assert_eq!(s2.depth(), 2);
        assert!(s2.element(0).unwrap().downcast_ref::<u32>().is_some());
        assert!(s2.element(1).unwrap().downcast_ref::<Row>().is_some());
        assert!(s2.element(2).is_none());
        assert_eq!(s2.nearest::<Row>().unwrap().size, 42);
    }

    #[test]
    fn test_field_reads_by_reference() {
        let binding: Binding<String> = Binding::field(|r: &Row| &r.name);
        let Binding::Element(read) = binding else {
            panic!("expected element binding");
        };
        assert_eq!(read.element(), ElementType::of::<Row>());

        let item = row();
        let mut seen = String::new();
        assert!(read.read(&item, &mut |s| seen.push_str(s)));
        assert_eq!(seen, "a.txt");

        // Wrong element type is rejected, not misread
        assert!(!read.read(&5u8, &mut |_| panic!("must not be called")));
    }

    #[test]
    fn test_map_computes_value() {
        let binding: Binding<u64> = Binding::map(|r: &Row| r.size * 2);
        let Binding::Element(read) = binding else {
            panic!("expected element binding");
        };
        let mut out = 0;
        read.read(&row(), &mut |v| out = *v);
        assert_eq!(out, 84);
    }

    #[test]
    fn test_shared_items_visit_live() {
        let list = Rc::new(RefCell::new(vec![1u32, 2, 3]));
        let items = Items::shared(list.clone());
        let Items::Shared(shared) = &items else {
            panic!("expected shared items");
        };
        assert_eq!(shared.len(), 3);

        list.borrow_mut().push(4);
        let mut sum = 0;
        shared.visit(&mut |_, item| sum += *item.downcast_ref::<u32>().unwrap());
        assert_eq!(sum, 10);
        assert_eq!(items.item(), ElementType::of::<u32>());
    }

    #[test]
    fn test_element_items() {
        let items = Items::field(|r: &Row| r.tags.as_slice());
        let Items::Element(list) = &items else {
            panic!("expected element items");
        };
        let item = row();
        assert_eq!(list.len(&item), Some(2));
        assert_eq!(list.element(), ElementType::of::<Row>());
        assert_eq!(list.item(), ElementType::of::<&'static str>());

        let mut out = Vec::new();
        list.visit(&item, &mut |i, tag| out.push((i, *tag.downcast_ref::<&'static str>().unwrap())));
        assert_eq!(out, vec![(0, "x"), (1, "y")]);
    }
}
