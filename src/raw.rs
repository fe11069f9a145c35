//! Node storage and the links between nodes.
//!
//! `Storage` owns what a node *is* (names, attributes, namespace
//! declarations, text), `Connections` owns where it *is* (parent and
//! ordered children). Both are addressed by plain indices so that a
//! child never owns its parent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::iter;

use super::string_pool::{InternedString, StringPool};
use super::{Protocol, QName};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChildOfElement {
    Element(ElementId),
    Text(TextId),
}

/// The role an element plays inside its message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Any element without a SOAP defined role
    Element,
    Envelope,
    Header,
    /// An immediate child of the `Header`
    HeaderElement,
    Body,
    /// An immediate child of the `Body`
    BodyElement,
}

impl ElementKind {
    /// Envelope, Header and Body have fixed names and content rules.
    pub fn is_fixed(self) -> bool {
        matches!(self, ElementKind::Envelope | ElementKind::Header | ElementKind::Body)
    }

    /// The kind an element takes when attached below this kind.
    pub fn child_kind(self) -> ElementKind {
        match self {
            ElementKind::Header => ElementKind::HeaderElement,
            ElementKind::Body => ElementKind::BodyElement,
            _ => ElementKind::Element,
        }
    }
}

#[derive(Copy, Clone)]
struct InternedQName {
    namespace_uri: Option<InternedString>,
    local_part: InternedString,
    prefix: Option<InternedString>,
}

#[derive(Copy, Clone)]
struct Attribute {
    name: InternedQName,
    value: InternedString,
}

#[derive(Copy, Clone)]
struct Namespace {
    prefix: InternedString,
    uri: InternedString,
}

struct Element {
    name: InternedQName,
    kind: ElementKind,
    attributes: Vec<Attribute>,
    namespaces: Vec<Namespace>,
}

struct Text {
    text: InternedString,
}

pub struct Storage {
    protocol: Protocol,
    strings: StringPool,
    elements: RefCell<Vec<Element>>,
    texts: RefCell<Vec<Text>>,
}

impl Storage {
    pub fn new(protocol: Protocol) -> Storage {
        Storage {
            protocol,
            strings: StringPool::new(),
            elements: RefCell::new(Vec::new()),
            texts: RefCell::new(Vec::new()),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn intern_qname(&self, name: QName) -> InternedQName {
        InternedQName {
            namespace_uri: name.namespace_uri.map(|uri| self.strings.intern(uri)),
            local_part: self.strings.intern(name.local_part),
            prefix: name.prefix.map(|prefix| self.strings.intern(prefix)),
        }
    }

    fn qname(&self, name: InternedQName) -> QName<'_> {
        QName {
            namespace_uri: name.namespace_uri.map(|uri| self.strings.get(uri)),
            local_part: self.strings.get(name.local_part),
            prefix: name.prefix.map(|prefix| self.strings.get(prefix)),
        }
    }

    pub fn create_element(&self, name: QName, kind: ElementKind) -> ElementId {
        let name = self.intern_qname(name);
        let mut elements = self.elements.borrow_mut();
        elements.push(Element {
            name,
            kind,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        });
        ElementId(elements.len() - 1)
    }

    pub fn create_text(&self, text: &str) -> TextId {
        let text = self.strings.intern(text);
        let mut texts = self.texts.borrow_mut();
        texts.push(Text { text });
        TextId(texts.len() - 1)
    }

    pub fn element_name(&self, element: ElementId) -> QName<'_> {
        let name = self.elements.borrow()[element.0].name;
        self.qname(name)
    }

    pub fn element_set_name(&self, element: ElementId, name: QName) {
        let name = self.intern_qname(name);
        self.elements.borrow_mut()[element.0].name = name;
    }

    pub fn element_kind(&self, element: ElementId) -> ElementKind {
        self.elements.borrow()[element.0].kind
    }

    pub fn element_set_kind(&self, element: ElementId, kind: ElementKind) {
        self.elements.borrow_mut()[element.0].kind = kind;
    }

    pub fn text(&self, text: TextId) -> &str {
        let text = self.texts.borrow()[text.0].text;
        self.strings.get(text)
    }

    fn attribute_position(&self, element: &Element, name: QName) -> Option<usize> {
        element
            .attributes
            .iter()
            .position(|a| self.qname(a.name) == name)
    }

    pub fn attribute_value(&self, element: ElementId, name: QName) -> Option<&str> {
        let elements = self.elements.borrow();
        let element = &elements[element.0];
        self.attribute_position(element, name)
            .map(|idx| self.strings.get(element.attributes[idx].value))
    }

    /// Replaces the value in place when the name is already present.
    pub fn set_attribute(&self, element: ElementId, name: QName, value: &str) {
        let attribute = Attribute {
            name: self.intern_qname(name),
            value: self.strings.intern(value),
        };

        let mut elements = self.elements.borrow_mut();
        let element = &mut elements[element.0];
        match self.attribute_position(element, name) {
            Some(idx) => element.attributes[idx] = attribute,
            None => element.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&self, element: ElementId, name: QName) -> bool {
        let mut elements = self.elements.borrow_mut();
        let element = &mut elements[element.0];
        match self.attribute_position(element, name) {
            Some(idx) => {
                element.attributes.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn attributes(&self, element: ElementId) -> Vec<(QName<'_>, &str)> {
        self.elements.borrow()[element.0]
            .attributes
            .iter()
            .map(|a| (self.qname(a.name), self.strings.get(a.value)))
            .collect()
    }

    /// Map a prefix to a namespace URI on this element only. An
    /// existing declaration of the same prefix is replaced.
    pub fn element_register_prefix(&self, element: ElementId, prefix: &str, namespace_uri: &str) {
        let namespace = Namespace {
            prefix: self.strings.intern(prefix),
            uri: self.strings.intern(namespace_uri),
        };

        let mut elements = self.elements.borrow_mut();
        let namespaces = &mut elements[element.0].namespaces;
        match namespaces.iter_mut().find(|ns| self.strings.get(ns.prefix) == prefix) {
            Some(existing) => *existing = namespace,
            None => namespaces.push(namespace),
        }
    }

    pub fn element_remove_prefix(&self, element: ElementId, prefix: &str) -> bool {
        let mut elements = self.elements.borrow_mut();
        let namespaces = &mut elements[element.0].namespaces;
        let before = namespaces.len();
        namespaces.retain(|ns| self.strings.get(ns.prefix) != prefix);
        namespaces.len() != before
    }

    /// The URI bound to `prefix` by a declaration on this element.
    pub fn element_declared_namespace_uri(&self, element: ElementId, prefix: &str) -> Option<&str> {
        self.elements.borrow()[element.0]
            .namespaces
            .iter()
            .find(|ns| self.strings.get(ns.prefix) == prefix)
            .map(|ns| self.strings.get(ns.uri))
    }

    /// Declarations made on this element, in declaration order.
    pub fn element_namespaces(&self, element: ElementId) -> Vec<(&str, &str)> {
        self.elements.borrow()[element.0]
            .namespaces
            .iter()
            .map(|ns| (self.strings.get(ns.prefix), self.strings.get(ns.uri)))
            .collect()
    }
}

pub struct Connections {
    root: ElementId,
    element_parents: RefCell<HashMap<ElementId, ElementId>>,
    text_parents: RefCell<HashMap<TextId, ElementId>>,
    children: RefCell<HashMap<ElementId, Vec<ChildOfElement>>>,
}

impl Connections {
    pub fn new(root: ElementId) -> Connections {
        Connections {
            root,
            element_parents: RefCell::new(HashMap::new()),
            text_parents: RefCell::new(HashMap::new()),
            children: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn parent(&self, child: ChildOfElement) -> Option<ElementId> {
        match child {
            ChildOfElement::Element(e) => self.element_parents.borrow().get(&e).copied(),
            ChildOfElement::Text(t) => self.text_parents.borrow().get(&t).copied(),
        }
    }

    pub fn element_parent(&self, element: ElementId) -> Option<ElementId> {
        self.parent(ChildOfElement::Element(element))
    }

    fn set_parent(&self, child: ChildOfElement, parent: Option<ElementId>) {
        match (child, parent) {
            (ChildOfElement::Element(e), Some(p)) => {
                self.element_parents.borrow_mut().insert(e, p);
            }
            (ChildOfElement::Element(e), None) => {
                self.element_parents.borrow_mut().remove(&e);
            }
            (ChildOfElement::Text(t), Some(p)) => {
                self.text_parents.borrow_mut().insert(t, p);
            }
            (ChildOfElement::Text(t), None) => {
                self.text_parents.borrow_mut().remove(&t);
            }
        }
    }

    /// A snapshot of the children; later mutation does not affect it.
    pub fn element_children(&self, parent: ElementId) -> Vec<ChildOfElement> {
        self.children
            .borrow()
            .get(&parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Appends `child`, first removing it from any previous parent.
    pub fn append_element_child(&self, parent: ElementId, child: ChildOfElement) {
        self.remove_from_parent(child);
        self.children.borrow_mut().entry(parent).or_default().push(child);
        self.set_parent(child, Some(parent));
    }

    /// Places `child` directly before `reference`, which must be a
    /// child of `parent`. Appends when it is not.
    pub fn insert_element_child_before(&self, parent: ElementId, child: ChildOfElement, reference: ChildOfElement) {
        self.remove_from_parent(child);
        {
            let mut children = self.children.borrow_mut();
            let siblings = children.entry(parent).or_default();
            match siblings.iter().position(|c| *c == reference) {
                Some(idx) => siblings.insert(idx, child),
                None => siblings.push(child),
            }
        }
        self.set_parent(child, Some(parent));
    }

    pub fn remove_from_parent(&self, child: ChildOfElement) {
        if let Some(parent) = self.parent(child) {
            if let Some(siblings) = self.children.borrow_mut().get_mut(&parent) {
                siblings.retain(|c| *c != child);
            }
            self.set_parent(child, None);
        }
    }

    /// Detaches every child at once, returning how many there were.
    /// Detaches every child, returning them in document order.
    pub fn clear_element_children(&self, parent: ElementId) -> Vec<ChildOfElement> {
        let removed = self.children.borrow_mut().remove(&parent).unwrap_or_default();
        for child in &removed {
            self.set_parent(*child, None);
        }
        removed
    }

    pub fn ancestors_or_self(&self, element: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        iter::successors(Some(element), move |&e| self.element_parent(e))
    }

    pub fn is_ancestor_or_self(&self, ancestor: ElementId, element: ElementId) -> bool {
        self.ancestors_or_self(element).any(|e| e == ancestor)
    }

    /// Every element of the subtree rooted at `element`, in document order.
    pub fn descendants_or_self(&self, element: ElementId) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut todo = vec![element];

        while let Some(e) = todo.pop() {
            found.push(e);
            let children = self.element_children(e);
            todo.extend(children.into_iter().rev().filter_map(|c| match c {
                ChildOfElement::Element(child) => Some(child),
                ChildOfElement::Text(_) => None,
            }));
        }

        found
    }

    /// Recursively resolve the prefix to a namespace URI. The nearest
    /// declaration wins; an empty URI is an undeclared default namespace.
    pub fn element_namespace_uri_for_prefix<'s>(
        &self,
        storage: &'s Storage,
        element: ElementId,
        prefix: &str,
    ) -> Option<&'s str> {
        self.ancestors_or_self(element)
            .find_map(|e| storage.element_declared_namespace_uri(e, prefix))
    }

    /// Retrieve all namespace declarations that are in scope,
    /// recursively walking up the tree. Declarations closer to
    /// `element` shadow those of its ancestors.
    pub fn element_namespaces_in_scope<'s>(&self, storage: &'s Storage, element: ElementId) -> Vec<(&'s str, &'s str)> {
        let mut namespaces: Vec<(&str, &str)> = Vec::new();

        for e in self.ancestors_or_self(element) {
            for (prefix, uri) in storage.element_namespaces(e) {
                if !namespaces.iter().any(|(p, _)| *p == prefix) {
                    namespaces.push((prefix, uri));
                }
            }
        }

        namespaces
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn element(storage: &Storage, name: &str) -> ElementId {
        storage.create_element(QName::new(name), ElementKind::Element)
    }

    #[test]
    fn appending_moves_a_child_between_parents() {
        let storage = Storage::new(Protocol::Soap11);
        let parent1 = element(&storage, "parent1");
        let parent2 = element(&storage, "parent2");
        let child = element(&storage, "child");
        let connections = Connections::new(parent1);

        connections.append_element_child(parent1, ChildOfElement::Element(child));
        connections.append_element_child(parent2, ChildOfElement::Element(child));

        assert!(connections.element_children(parent1).is_empty());
        assert_eq!(vec![ChildOfElement::Element(child)], connections.element_children(parent2));
        assert_eq!(Some(parent2), connections.element_parent(child));
    }

    #[test]
    fn inserting_before_keeps_sibling_order() {
        let storage = Storage::new(Protocol::Soap11);
        let parent = element(&storage, "parent");
        let a = ChildOfElement::Element(element(&storage, "a"));
        let b = ChildOfElement::Element(element(&storage, "b"));
        let c = ChildOfElement::Text(storage.create_text("c"));
        let connections = Connections::new(parent);

        connections.append_element_child(parent, a);
        connections.append_element_child(parent, b);
        connections.insert_element_child_before(parent, c, b);

        assert_eq!(vec![a, c, b], connections.element_children(parent));
    }

    #[test]
    fn clearing_children_detaches_them() {
        let storage = Storage::new(Protocol::Soap11);
        let parent = element(&storage, "parent");
        let child = element(&storage, "child");
        let text = storage.create_text("hello");
        let connections = Connections::new(parent);
        connections.append_element_child(parent, ChildOfElement::Element(child));
        connections.append_element_child(parent, ChildOfElement::Text(text));

        assert_eq!(
            vec![ChildOfElement::Element(child), ChildOfElement::Text(text)],
            connections.clear_element_children(parent)
        );
        assert!(connections.clear_element_children(parent).is_empty());
        assert_eq!(None, connections.element_parent(child));
        assert_eq!(None, connections.parent(ChildOfElement::Text(text)));
    }

    #[test]
    fn descendants_are_listed_in_document_order() {
        let storage = Storage::new(Protocol::Soap11);
        let a = element(&storage, "a");
        let b = element(&storage, "b");
        let c = element(&storage, "c");
        let d = element(&storage, "d");
        let connections = Connections::new(a);
        connections.append_element_child(a, ChildOfElement::Element(b));
        connections.append_element_child(b, ChildOfElement::Element(c));
        connections.append_element_child(a, ChildOfElement::Element(d));

        assert_eq!(vec![a, b, c, d], connections.descendants_or_self(a));
        assert!(connections.is_ancestor_or_self(a, c));
        assert!(!connections.is_ancestor_or_self(d, c));
    }

    #[test]
    fn nearest_namespace_declaration_wins() {
        let storage = Storage::new(Protocol::Soap11);
        let parent = element(&storage, "parent");
        let child = element(&storage, "child");
        let connections = Connections::new(parent);
        connections.append_element_child(parent, ChildOfElement::Element(child));

        storage.element_register_prefix(parent, "p", "uri1");
        storage.element_register_prefix(parent, "q", "uri3");
        storage.element_register_prefix(child, "p", "uri2");

        assert_eq!(Some("uri2"), connections.element_namespace_uri_for_prefix(&storage, child, "p"));
        assert_eq!(Some("uri1"), connections.element_namespace_uri_for_prefix(&storage, parent, "p"));

        let in_scope = connections.element_namespaces_in_scope(&storage, child);
        assert_eq!(vec![("p", "uri2"), ("q", "uri3")], in_scope);
    }

    #[test]
    fn attributes_are_replaced_in_place() {
        let storage = Storage::new(Protocol::Soap11);
        let e = element(&storage, "e");

        storage.set_attribute(e, QName::new("a"), "1");
        storage.set_attribute(e, QName::new("b"), "2");
        storage.set_attribute(e, QName::new("a"), "3");

        let attributes = storage.attributes(e);
        assert_eq!(2, attributes.len());
        assert_eq!((QName::new("a"), "3"), attributes[0]);
    }
}
