//! The element model.
//!
//! Mirrors the host annotation-processing framework's language-model elements
//! just closely enough for metadata extraction and code synthesis. Elements
//! live in an [`ElementArena`] and reference each other by [`ElementId`], so
//! decorators can override linkage without cloning subtrees.

use smol_str::SmolStr;
use source_span::Span;

/// Index of an element in its [`ElementArena`].
pub type ElementId = u32;

/// The kind of a source element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A top-level or nested class.
    Class,
    /// An interface.
    Interface,
    /// A field declaration.
    Field,
    /// A method declaration.
    Method,
    /// A method parameter.
    Parameter,
}

/// An annotation attached to an element, with its `key=value` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Simple annotation name without the `@`.
    pub name: SmolStr,
    /// Arguments in declaration order. A bare value is stored under `value`.
    pub args: Vec<(SmolStr, String)>,
    /// Location of the annotation in the source file.
    pub span: Span,
}

impl Annotation {
    /// Creates an annotation with no arguments.
    pub fn marker(name: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            span,
        }
    }

    /// Looks up an argument by key.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the `value` argument, or the first positional one.
    pub fn value(&self) -> Option<&str> {
        self.arg("value").or_else(|| {
            self.args.first().map(|(_, v)| v.as_str())
        })
    }

    /// Returns an argument interpreted as a boolean flag, defaulting to
    /// `default` when absent.
    pub fn bool_arg(&self, key: &str, default: bool) -> bool {
        match self.arg(key) {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }
}

/// A possibly partially-qualified type reference.
///
/// Array suffixes (`[]`) and nested-type paths (`Outer.Inner`) are retained
/// verbatim; resolution against an import table happens in
/// [`crate::CompilationUnitImports::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeRef {
    raw: String,
}

impl TypeRef {
    /// Creates a type reference from source text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The reference exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The reference with any trailing `[]` suffix removed.
    pub fn without_array_suffix(&self) -> &str {
        self.raw.trim_end_matches("[]")
    }

    /// The trailing `[]` suffix, possibly multi-dimensional, or `""`.
    pub fn array_suffix(&self) -> &str {
        let base = self.without_array_suffix();
        &self.raw[base.len()..]
    }

    /// The last `.`-separated segment, without array suffix.
    pub fn simple_name(&self) -> &str {
        let base = self.without_array_suffix();
        base.rsplit('.').next().unwrap_or(base)
    }

    /// Returns true if the reference carries an array suffix.
    pub fn is_array(&self) -> bool {
        !self.array_suffix().is_empty()
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One source element: a class, field, method or parameter.
#[derive(Debug, Clone)]
pub struct Element {
    /// Arena index of this element.
    pub id: ElementId,
    /// The kind of element.
    pub kind: ElementKind,
    /// Simple name.
    pub name: SmolStr,
    /// Fully qualified name for types; empty for members.
    pub qualified_name: String,
    /// Declared type: field type, method return type, or the type itself.
    pub ty: TypeRef,
    /// Attached annotations in declaration order.
    pub annotations: Vec<Annotation>,
    /// Enclosing element, if any.
    pub enclosing: Option<ElementId>,
    /// Modifier keywords (`public`, `static`, ...).
    pub modifiers: Vec<SmolStr>,
    /// Location of the declaration.
    pub span: Span,
}

/// Read access to an element's characteristics.
///
/// Both plain [`Element`]s and [`VirtualElement`] decorators implement this;
/// code synthesis only ever sees the trait, so substituted characteristics
/// are indistinguishable from declared ones.
pub trait ElementView {
    /// The kind of element.
    fn kind(&self) -> ElementKind;
    /// Simple name.
    fn name(&self) -> &str;
    /// Declared type reference.
    fn type_ref(&self) -> &TypeRef;
    /// Attached annotations.
    fn annotations(&self) -> &[Annotation];
    /// Enclosing element id, if any.
    fn enclosing(&self) -> Option<ElementId>;
    /// Declaration location.
    fn span(&self) -> Span;

    /// Finds an annotation by simple name.
    fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.name == name)
    }

    /// Returns true if the element carries the named modifier.
    fn has_modifier(&self, _modifier: &str) -> bool {
        false
    }
}

impl ElementView for Element {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn enclosing(&self) -> Option<ElementId> {
        self.enclosing
    }

    fn span(&self) -> Span {
        self.span
    }

    fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }
}

/// A decorator over an immutable [`Element`] with substituted characteristics.
///
/// Holds an owned copy of the wrapped element plus override fields; the
/// original in the arena is never mutated. Used when a handler needs to
/// process an element "as if" it were enclosed elsewhere or carried extra
/// annotations.
///
/// The built-in pipeline reads elements straight from the arena and does
/// not construct virtual elements itself; this type is the extension
/// surface for host adapters that re-route an element through a handler
/// under a different enclosing element or annotation set.
#[derive(Debug, Clone)]
pub struct VirtualElement {
    inner: Element,
    enclosing_override: Option<ElementId>,
    annotations_override: Option<Vec<Annotation>>,
}

impl VirtualElement {
    /// Wraps an element with no overrides yet.
    pub fn wrap(inner: Element) -> Self {
        Self {
            inner,
            enclosing_override: None,
            annotations_override: None,
        }
    }

    /// Overrides the enclosing element.
    pub fn with_enclosing(mut self, enclosing: ElementId) -> Self {
        self.enclosing_override = Some(enclosing);
        self
    }

    /// Replaces the visible annotation list.
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations_override = Some(annotations);
        self
    }

    /// Adds one annotation on top of the wrapped element's own.
    pub fn with_added_annotation(mut self, annotation: Annotation) -> Self {
        let mut annotations = self
            .annotations_override
            .take()
            .unwrap_or_else(|| self.inner.annotations.clone());
        annotations.push(annotation);
        self.annotations_override = Some(annotations);
        self
    }

    /// The wrapped element.
    pub fn inner(&self) -> &Element {
        &self.inner
    }
}

impl ElementView for VirtualElement {
    fn kind(&self) -> ElementKind {
        self.inner.kind
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn type_ref(&self) -> &TypeRef {
        &self.inner.ty
    }

    fn annotations(&self) -> &[Annotation] {
        self.annotations_override
            .as_deref()
            .unwrap_or(&self.inner.annotations)
    }

    fn enclosing(&self) -> Option<ElementId> {
        self.enclosing_override.or(self.inner.enclosing)
    }

    fn span(&self) -> Span {
        self.inner.span
    }

    fn has_modifier(&self, modifier: &str) -> bool {
        self.inner.modifiers.iter().any(|m| m == modifier)
    }
}

/// Flat storage for all elements discovered in one round.
#[derive(Debug, Default)]
pub struct ElementArena {
    elements: Vec<Element>,
}

impl ElementArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an element, assigning its id. The `id` field of the input
    /// is overwritten with the arena index.
    pub fn alloc(&mut self, mut element: Element) -> ElementId {
        let id = self.elements.len() as ElementId;
        element.id = id;
        self.elements.push(element);
        id
    }

    /// Looks up an element by id.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id as usize)
    }

    /// Iterates all elements in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Iterates the direct children of `parent`.
    pub fn children(&self, parent: ElementId) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |e| e.enclosing == Some(parent))
    }

    /// Number of elements in the arena.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if no elements have been allocated.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str) -> Element {
        Element {
            id: 0,
            kind: ElementKind::Field,
            name: name.into(),
            qualified_name: String::new(),
            ty: TypeRef::new(ty),
            annotations: Vec::new(),
            enclosing: None,
            modifiers: Vec::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_type_ref_suffixes() {
        let ty = TypeRef::new("Map.Entry[]");
        assert_eq!(ty.without_array_suffix(), "Map.Entry");
        assert_eq!(ty.array_suffix(), "[]");
        assert_eq!(ty.simple_name(), "Entry");
        assert!(ty.is_array());
    }

    #[test]
    fn test_virtual_element_overrides_enclosing() {
        let mut arena = ElementArena::new();
        let class_id = arena.alloc(field("Outer", "Outer"));
        let f = field("title", "String");

        let virtual_f = VirtualElement::wrap(f).with_enclosing(class_id);
        assert_eq!(virtual_f.enclosing(), Some(class_id));
        // the wrapped copy is untouched
        assert_eq!(virtual_f.inner().enclosing, None);
    }

    #[test]
    fn test_virtual_element_adds_annotation() {
        let f = field("v", "View");
        let virtual_f = VirtualElement::wrap(f)
            .with_added_annotation(Annotation::marker("Click", Span::default()));

        assert!(virtual_f.annotation("Click").is_some());
        assert!(virtual_f.inner().annotations.is_empty());
    }

    #[test]
    fn test_arena_children() {
        let mut arena = ElementArena::new();
        let parent = arena.alloc(field("A", "A"));
        let mut child = field("b", "B");
        child.enclosing = Some(parent);
        arena.alloc(child);

        let names: Vec<_> = arena.children(parent).map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }
}
