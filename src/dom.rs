//! The SOAP element tree: navigating and manipulating the nodes of a
//! message.

use std::{fmt, hash, ptr, vec};

use super::constants::{XMLNS_NAMESPACE, XML_NAMESPACE};
use super::error::{rejected, Error, Result};
use super::header::HeaderElement;
use super::raw;
use super::{Protocol, QName};

pub use super::raw::ElementKind;

const ENCODING_STYLE: &str = "encodingStyle";

/// A SOAP message
#[derive(Copy, Clone)]
pub struct Document<'d> {
    storage: &'d raw::Storage,
    connections: &'d raw::Connections,
}

impl<'d> Document<'d> {
    #[doc(hidden)]
    pub fn new(storage: &'d raw::Storage, connections: &'d raw::Connections) -> Document<'d> {
        Document { storage, connections }
    }

    fn wrap_element(self, node: raw::ElementId) -> Element<'d> {
        Element { document: self, node }
    }

    fn wrap_text(self, node: raw::TextId) -> Text<'d> {
        Text { document: self, node }
    }

    fn wrap_child_of_element(self, node: raw::ChildOfElement) -> ChildOfElement<'d> {
        match node {
            raw::ChildOfElement::Element(n) => ChildOfElement::Element(self.wrap_element(n)),
            raw::ChildOfElement::Text(n) => ChildOfElement::Text(self.wrap_text(n)),
        }
    }

    fn same_package(self, other: Document<'_>) -> bool {
        ptr::eq(self.storage, other.storage) && ptr::eq(self.connections, other.connections)
    }

    pub fn protocol(self) -> Protocol {
        self.storage.protocol()
    }

    pub fn envelope(self) -> Element<'d> {
        self.wrap_element(self.connections.root())
    }

    fn envelope_child(self, kind: ElementKind) -> Option<Element<'d>> {
        self.envelope()
            .child_elements()
            .filter_map(|c| c.element())
            .find(|e| e.kind() == kind)
    }

    pub fn header(self) -> Option<Element<'d>> {
        self.envelope_child(ElementKind::Header)
    }

    pub fn body(self) -> Option<Element<'d>> {
        self.envelope_child(ElementKind::Body)
    }

    fn create_envelope_child(self, local_part: &str, kind: ElementKind) -> Element<'d> {
        let protocol = self.protocol();
        let name = QName::with_prefix(protocol.envelope_namespace(), local_part, protocol.envelope_prefix());
        self.wrap_element(self.storage.create_element(name, kind))
    }

    /// Recreate the `Header` of a message whose header was removed.
    /// It is placed before every other child of the envelope.
    pub fn add_header(self) -> Result<Element<'d>> {
        if self.header().is_some() {
            return Err(rejected(Error::structure("the envelope already has a Header")));
        }

        let envelope = self.envelope();
        let header = self.create_envelope_child("Header", ElementKind::Header);
        let child = raw::ChildOfElement::Element(header.node);
        match self.connections.element_children(envelope.node).first() {
            Some(&first) => self.connections.insert_element_child_before(envelope.node, child, first),
            None => self.connections.append_element_child(envelope.node, child),
        }
        header.declare_own_namespaces();

        tracing::trace!("added Header");
        Ok(header)
    }

    /// Recreate the `Body` of a message whose body was removed.
    pub fn add_body(self) -> Result<Element<'d>> {
        if self.body().is_some() {
            return Err(rejected(Error::structure("the envelope already has a Body")));
        }

        let envelope = self.envelope();
        let body = self.create_envelope_child("Body", ElementKind::Body);
        self.connections
            .append_element_child(envelope.node, raw::ChildOfElement::Element(body.node));
        body.declare_own_namespaces();

        tracing::trace!("added Body");
        Ok(body)
    }

    /// Create an element that is not yet part of the tree. Attach it
    /// with [`Element::add_existing_element`].
    pub fn create_element<'n, N>(self, name: N) -> Result<Element<'d>>
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        name.validate().map_err(rejected)?;

        let element = self.wrap_element(self.storage.create_element(name, ElementKind::Element));
        element.declare_own_namespaces();
        Ok(element)
    }

    /// Envelope, Header and Body in this message's envelope namespace
    fn is_reserved_name(self, name: QName<'_>) -> bool {
        let namespace_uri = self.protocol().envelope_namespace();
        ["Envelope", "Header", "Body"]
            .iter()
            .any(|local_part| name.is_in(namespace_uri, local_part))
    }

    /// Copy an element from another package, along with all of its
    /// descendants, into this one.
    fn import(self, source: Element<'_>, kind: ElementKind) -> raw::ElementId {
        let from_storage = source.document.storage;
        let from_connections = source.document.connections;

        let copy_element = |from: raw::ElementId, kind: ElementKind| {
            let to = self.storage.create_element(from_storage.element_name(from), kind);
            for (prefix, uri) in from_storage.element_namespaces(from) {
                self.storage.element_register_prefix(to, prefix, uri);
            }
            for (name, value) in from_storage.attributes(from) {
                self.storage.set_attribute(to, name, value);
            }
            to
        };

        let root = copy_element(source.node, kind);
        let mut todo = vec![(source.node, root)];

        while let Some((from, to)) = todo.pop() {
            for child in from_connections.element_children(from) {
                let copied = match child {
                    raw::ChildOfElement::Element(e) => {
                        let copied = copy_element(e, ElementKind::Element);
                        todo.push((e, copied));
                        raw::ChildOfElement::Element(copied)
                    }
                    raw::ChildOfElement::Text(t) => {
                        raw::ChildOfElement::Text(self.storage.create_text(from_storage.text(t)))
                    }
                };
                self.connections.append_element_child(to, copied);
            }
        }

        root
    }
}

impl<'d> PartialEq for Document<'d> {
    fn eq(&self, other: &Document<'d>) -> bool {
        self.same_package(*other)
    }
}

impl<'d> fmt::Debug for Document<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Document {{ protocol: {:?} }}", self.protocol())
    }
}

macro_rules! node(
    ($name:ident, $raw:ty, $doc:expr) => (
        #[doc = $doc]
        #[derive(Copy, Clone)]
        pub struct $name<'d> {
            document: Document<'d>,
            node: $raw,
        }

        impl<'d> $name<'d> {
            pub fn document(&self) -> Document<'d> { self.document }
        }

        impl<'d> PartialEq for $name<'d> {
            fn eq(&self, other: &$name<'d>) -> bool {
                self.document == other.document && self.node == other.node
            }
        }

        impl<'d> Eq for $name<'d> {}

        impl<'d> hash::Hash for $name<'d> {
            fn hash<H>(&self, state: &mut H)
            where
                H: hash::Hasher,
            {
                self.node.hash(state)
            }
        }
    )
);

/// A mapping from a prefix to a URI
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Namespace<'d> {
    prefix: &'d str,
    uri: &'d str,
}

impl<'d> Namespace<'d> {
    pub fn prefix(&self) -> &'d str { self.prefix }
    pub fn uri(&self) -> &'d str { self.uri }
}

/// A name and value pair stored on an element
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Attribute<'d> {
    name: QName<'d>,
    value: &'d str,
}

impl<'d> Attribute<'d> {
    pub fn name(&self) -> QName<'d> { self.name }
    pub fn value(&self) -> &'d str { self.value }
}

/// How the name of a new child element is given.
///
/// The tuple conversions follow the argument order of the classic
/// `addChildElement` overloads: `(local_part, prefix)` and
/// `(local_part, prefix, namespace_uri)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChildName<'n> {
    /// A fully resolved name
    Qualified(QName<'n>),
    /// Takes the default namespace in scope at the parent
    Local(&'n str),
    /// The prefix must already be bound at the parent
    Prefixed { local_part: &'n str, prefix: &'n str },
    /// The binding is declared on the new child
    Declared {
        local_part: &'n str,
        prefix: &'n str,
        namespace_uri: &'n str,
    },
}

impl<'n> From<QName<'n>> for ChildName<'n> {
    fn from(v: QName<'n>) -> ChildName<'n> {
        ChildName::Qualified(v)
    }
}

impl<'n> From<&'n str> for ChildName<'n> {
    fn from(v: &'n str) -> ChildName<'n> {
        ChildName::Local(v)
    }
}

impl<'n> From<(&'n str, &'n str)> for ChildName<'n> {
    fn from(v: (&'n str, &'n str)) -> ChildName<'n> {
        ChildName::Prefixed { local_part: v.0, prefix: v.1 }
    }
}

impl<'n> From<(&'n str, &'n str, &'n str)> for ChildName<'n> {
    fn from(v: (&'n str, &'n str, &'n str)) -> ChildName<'n> {
        ChildName::Declared {
            local_part: v.0,
            prefix: v.1,
            namespace_uri: v.2,
        }
    }
}

/// Selects child elements by name
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChildFilter<'n> {
    /// Namespace URI and local part must both match
    Qualified(QName<'n>),
    /// Matched against the default namespace in scope at the parent
    Local(&'n str),
}

impl<'n> From<QName<'n>> for ChildFilter<'n> {
    fn from(v: QName<'n>) -> ChildFilter<'n> {
        ChildFilter::Qualified(v)
    }
}

impl<'n> From<&'n str> for ChildFilter<'n> {
    fn from(v: &'n str) -> ChildFilter<'n> {
        ChildFilter::Local(v)
    }
}

/// The children of an element as they were when the iterator was
/// created. Ask the element again for a fresh view.
pub struct Children<'d> {
    document: Document<'d>,
    nodes: vec::IntoIter<raw::ChildOfElement>,
}

impl<'d> Iterator for Children<'d> {
    type Item = ChildOfElement<'d>;

    fn next(&mut self) -> Option<ChildOfElement<'d>> {
        let document = self.document;
        self.nodes.next().map(|n| document.wrap_child_of_element(n))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<'d> ExactSizeIterator for Children<'d> {}

impl<'d> fmt::Debug for Children<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Children {{ remaining: {} }}", self.nodes.len())
    }
}

node!(
    Element, raw::ElementId,
    "A node of the message tree. The same handle type serves the
    envelope, the header and body, their entries and any element below
    them; `kind` tells them apart."
);

impl<'d> Element<'d> {
    pub fn name(&self) -> QName<'d> {
        self.document.storage.element_name(self.node)
    }

    pub fn kind(&self) -> ElementKind {
        self.document.storage.element_kind(self.node)
    }

    fn protocol(&self) -> Protocol {
        self.document.protocol()
    }

    /// Rename the element. Envelope, Header and Body cannot be renamed.
    ///
    /// The returned handle is the one to keep using.
    pub fn set_name<'n, N>(&self, name: N) -> Result<Element<'d>>
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        if self.kind().is_fixed() {
            return Err(rejected(Error::structure(format!(
                "{} cannot be renamed",
                self.name()
            ))));
        }
        name.validate().map_err(rejected)?;
        if self.document.is_reserved_name(name) {
            return Err(rejected(Error::structure(format!(
                "{} is reserved for the envelope structure",
                name
            ))));
        }
        self.check_name_for_kind(self.kind(), name)?;

        self.document.storage.element_set_name(self.node, name);
        self.declare_own_namespaces();

        tracing::trace!(element = %name, "renamed element");
        Ok(*self)
    }

    /// Header entries must be namespace qualified.
    fn check_name_for_kind(&self, kind: ElementKind, name: QName<'_>) -> Result<()> {
        if kind == ElementKind::HeaderElement && name.namespace_uri().is_none() {
            return Err(rejected(Error::namespace(format!(
                "header entry `{}` must be namespace qualified",
                name
            ))));
        }
        Ok(())
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.document
            .connections
            .element_parent(self.node)
            .map(|n| self.document.wrap_element(n))
    }

    /// Detach this element and its subtree. The envelope has no parent
    /// and is left in place.
    pub fn remove_from_parent(&self) {
        let connections = self.document.connections;
        if connections.element_parent(self.node).is_none() {
            return;
        }

        connections.remove_from_parent(raw::ChildOfElement::Element(self.node));
        if !self.kind().is_fixed() {
            self.document.storage.element_set_kind(self.node, ElementKind::Element);
        }
        tracing::trace!(element = %self.name(), "removed element from parent");
    }

    fn resolve_child_name<'n>(&self, name: ChildName<'n>) -> Result<(QName<'n>, Option<Namespace<'n>>)>
    where
        'd: 'n,
    {
        let resolved = match name {
            ChildName::Qualified(name) => (name, None),
            ChildName::Local(local_part) => {
                let namespace_uri = self.namespace_uri("");
                (QName::with_namespace_uri(namespace_uri, local_part), None)
            }
            ChildName::Prefixed { local_part, prefix } => (self.create_qname(local_part, prefix)?, None),
            ChildName::Declared {
                local_part,
                prefix,
                namespace_uri,
            } => {
                check_namespace_binding(prefix, namespace_uri).map_err(rejected)?;
                let declaration = Namespace { prefix, uri: namespace_uri };
                (QName::with_prefix(namespace_uri, local_part, prefix), Some(declaration))
            }
        };

        resolved.0.validate().map_err(rejected)?;
        Ok(resolved)
    }

    /// Build a new element and append it as the last child.
    ///
    /// The child takes the role its position implies: below the
    /// `Header` it is a header entry, below the `Body` a body element.
    pub fn add_child_element<'n, N>(&self, name: N) -> Result<Element<'d>>
    where
        N: Into<ChildName<'n>>,
    {
        let (name, declaration) = self.resolve_child_name(name.into())?;

        if self.document.is_reserved_name(name) {
            return Err(rejected(Error::structure(format!(
                "{} cannot be added below {}",
                name,
                self.name()
            ))));
        }
        let kind = self.kind().child_kind();
        self.check_name_for_kind(kind, name)?;

        let storage = self.document.storage;
        let child = storage.create_element(name, kind);
        if let Some(ns) = declaration.filter(|ns| ns.prefix != "xml") {
            storage.element_register_prefix(child, ns.prefix, ns.uri);
        }
        self.document
            .connections
            .append_element_child(self.node, raw::ChildOfElement::Element(child));

        let child = self.document.wrap_element(child);
        child.declare_own_namespaces();

        tracing::trace!(parent = %self.name(), child = %name, ?kind, "added child element");
        Ok(child)
    }

    /// Attach an element that is not part of this tree yet, or move
    /// one that is.
    ///
    /// An element of this package is moved, keeping its identity. An
    /// element of another package is copied along with its subtree;
    /// the returned handle refers to the copy and the one passed in is
    /// no longer part of this message.
    ///
    /// Nothing changes when the fragment is refused.
    pub fn add_existing_element(&self, element: Element<'_>) -> Result<Element<'d>> {
        let from = element.document;

        for e in from.connections.descendants_or_self(element.node) {
            let name = from.storage.element_name(e);
            if from.storage.element_kind(e).is_fixed() || self.document.is_reserved_name(name) {
                return Err(rejected(Error::structure(format!(
                    "a fragment containing {} cannot be added below {}",
                    name,
                    self.name()
                ))));
            }
        }

        let kind = self.kind().child_kind();
        self.check_name_for_kind(kind, element.name())?;

        let same_package = self.document.same_package(from);
        if same_package && self.document.connections.is_ancestor_or_self(element.node, self.node) {
            return Err(rejected(Error::structure(format!(
                "{} cannot be added below itself",
                element.name()
            ))));
        }

        let child = if same_package {
            self.document.storage.element_set_kind(element.node, kind);
            element.node
        } else {
            self.document.import(element, kind)
        };
        self.document
            .connections
            .append_element_child(self.node, raw::ChildOfElement::Element(child));

        let child = self.document.wrap_element(child);
        for e in self.document.connections.descendants_or_self(child.node) {
            self.document.wrap_element(e).declare_own_namespaces();
        }

        tracing::trace!(
            parent = %self.name(),
            child = %child.name(),
            copied = !same_package,
            "added existing element"
        );
        Ok(child)
    }

    /// Append text. Envelope, Header and Body do not accept text.
    pub fn add_text_node(&self, text: &str) -> Result<Element<'d>> {
        if self.kind().is_fixed() {
            return Err(rejected(Error::content(format!(
                "{} does not accept text content",
                self.name()
            ))));
        }

        let text = self.document.storage.create_text(text);
        self.document
            .connections
            .append_element_child(self.node, raw::ChildOfElement::Text(text));

        tracing::trace!(element = %self.name(), "added text node");
        Ok(*self)
    }

    /// Detach every child. Attributes and namespace declarations stay.
    ///
    /// Detached children are not freed; their storage lives as long as
    /// the package.
    pub fn remove_contents(&self) {
        let removed = self.document.connections.clear_element_children(self.node);
        let storage = self.document.storage;
        for child in &removed {
            if let raw::ChildOfElement::Element(e) = *child {
                if !storage.element_kind(e).is_fixed() {
                    storage.element_set_kind(e, ElementKind::Element);
                }
            }
        }
        tracing::trace!(element = %self.name(), removed = removed.len(), "removed contents");
    }

    /// Every child, text included, in document order.
    pub fn child_elements(&self) -> Children<'d> {
        Children {
            document: self.document,
            nodes: self.document.connections.element_children(self.node).into_iter(),
        }
    }

    /// The child elements with the given name, in document order.
    pub fn child_elements_named<'n, F>(&self, filter: F) -> Children<'d>
    where
        F: Into<ChildFilter<'n>>,
    {
        let (namespace_uri, local_part) = match filter.into() {
            ChildFilter::Qualified(name) => (name.namespace_uri(), name.local_part()),
            ChildFilter::Local(local_part) => (self.namespace_uri(""), local_part),
        };

        let storage = self.document.storage;
        let nodes: Vec<_> = self
            .document
            .connections
            .element_children(self.node)
            .into_iter()
            .filter(|c| match *c {
                raw::ChildOfElement::Element(e) => {
                    let name = storage.element_name(e);
                    name.namespace_uri() == namespace_uri && name.local_part() == local_part
                }
                raw::ChildOfElement::Text(_) => false,
            })
            .collect();

        Children {
            document: self.document,
            nodes: nodes.into_iter(),
        }
    }

    /// Set an attribute, replacing any previous value for the same name.
    pub fn add_attribute<'n, N>(&self, name: N, value: &str) -> Result<Element<'d>>
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        name.validate().map_err(rejected)?;

        let is_declaration = name.namespace_uri() == Some(XMLNS_NAMESPACE)
            || (name.namespace_uri().is_none() && name.local_part() == "xmlns");
        if is_declaration {
            return Err(rejected(Error::namespace(
                "namespace declarations are not attributes; use add_namespace_declaration",
            )));
        }
        if let (Some(prefix), Some(uri)) = (name.prefix(), name.namespace_uri()) {
            check_namespace_binding(prefix, uri).map_err(rejected)?;
            let storage = self.document.storage;
            match storage.element_declared_namespace_uri(self.node, prefix) {
                Some(bound) if bound != uri => {
                    return Err(rejected(Error::namespace(format!(
                        "prefix `{}` is already bound to `{}` on this element",
                        prefix, bound
                    ))));
                }
                _ => {}
            }
        }

        self.document.storage.set_attribute(self.node, name, value);
        if let (Some(prefix), Some(uri)) = (name.prefix(), name.namespace_uri()) {
            self.ensure_namespace(prefix, uri);
        }

        tracing::trace!(element = %self.name(), attribute = %name, "set attribute");
        Ok(*self)
    }

    pub fn attribute_value<'n, N>(&self, name: N) -> Option<&'d str>
    where
        N: Into<QName<'n>>,
    {
        self.document.storage.attribute_value(self.node, name.into())
    }

    /// Returns whether the attribute was present.
    pub fn remove_attribute<'n, N>(&self, name: N) -> bool
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        let removed = self.document.storage.remove_attribute(self.node, name);
        if removed {
            tracing::trace!(element = %self.name(), attribute = %name, "removed attribute");
        }
        removed
    }

    /// The attribute names, in the order they were first set.
    pub fn attribute_names(&self) -> impl Iterator<Item = QName<'d>> {
        self.document
            .storage
            .attributes(self.node)
            .into_iter()
            .map(|(name, _)| name)
    }

    pub fn attributes(&self) -> Vec<Attribute<'d>> {
        self.document
            .storage
            .attributes(self.node)
            .into_iter()
            .map(|(name, value)| Attribute { name, value })
            .collect()
    }

    /// Bind a prefix on this element, replacing a binding of the same
    /// prefix made here before. The empty prefix sets the default
    /// namespace; binding it to the empty URI undeclares the default.
    pub fn add_namespace_declaration(&self, prefix: &str, uri: &str) -> Result<Element<'d>> {
        check_namespace_binding(prefix, uri).map_err(rejected)?;
        if prefix == "xml" {
            return Ok(*self);
        }

        self.document.storage.element_register_prefix(self.node, prefix, uri);
        tracing::trace!(element = %self.name(), prefix, uri, "declared namespace");
        Ok(*self)
    }

    /// Returns whether this element declared the prefix.
    pub fn remove_namespace_declaration(&self, prefix: &str) -> bool {
        let removed = self.document.storage.element_remove_prefix(self.node, prefix);
        if removed {
            tracing::trace!(element = %self.name(), prefix, "removed namespace declaration");
        }
        removed
    }

    /// Recursively resolve the prefix to a namespace URI. The empty
    /// prefix resolves the default namespace.
    pub fn namespace_uri(&self, prefix: &str) -> Option<&'d str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }

        self.document
            .connections
            .element_namespace_uri_for_prefix(self.document.storage, self.node, prefix)
            .filter(|uri| !uri.is_empty())
    }

    /// Bindings declared on this element, in declaration order. An
    /// undeclared default namespace has an empty URI.
    pub fn namespace_declarations(&self) -> Vec<Namespace<'d>> {
        self.document
            .storage
            .element_namespaces(self.node)
            .into_iter()
            .map(|(prefix, uri)| Namespace { prefix, uri })
            .collect()
    }

    /// Prefixes declared on this element only.
    pub fn namespace_prefixes(&self) -> Vec<&'d str> {
        self.namespace_declarations().iter().map(|ns| ns.prefix()).collect()
    }

    /// Prefixes usable at this element, whether declared here or on
    /// an ancestor.
    pub fn visible_namespace_prefixes(&self) -> Vec<&'d str> {
        self.namespaces_in_scope().iter().map(|ns| ns.prefix()).collect()
    }

    /// Retrieve all namespaces that are in scope, recursively walking
    /// up the document tree. An undeclared default namespace is not
    /// listed.
    pub fn namespaces_in_scope(&self) -> Vec<Namespace<'d>> {
        self.document
            .connections
            .element_namespaces_in_scope(self.document.storage, self.node)
            .into_iter()
            .filter(|(_, uri)| !uri.is_empty())
            .map(|(prefix, uri)| Namespace { prefix, uri })
            .collect()
    }

    /// Build a name whose prefix is bound in the scope of this element.
    pub fn create_qname<'n>(&self, local_part: &'n str, prefix: &'n str) -> Result<QName<'n>>
    where
        'd: 'n,
    {
        match self.namespace_uri(prefix) {
            Some(uri) => Ok(QName::with_prefix(uri, local_part, prefix)),
            None if prefix.is_empty() => Ok(QName::new(local_part)),
            None => Err(rejected(Error::namespace(format!(
                "prefix `{}` is not bound at {}",
                prefix,
                self.name()
            )))),
        }
    }

    /// Declare the bindings this element's own name and attributes
    /// rely on when the scope does not already provide them.
    fn declare_own_namespaces(&self) {
        let name = self.name();
        match (name.prefix(), name.namespace_uri()) {
            (prefix, Some(uri)) => self.ensure_namespace(prefix.unwrap_or(""), uri),
            (None, None) => {
                if self.namespace_uri("").is_some() {
                    self.ensure_namespace("", "");
                }
            }
            (Some(_), None) => {}
        }

        for (name, _) in self.document.storage.attributes(self.node) {
            if let (Some(prefix), Some(uri)) = (name.prefix(), name.namespace_uri()) {
                self.ensure_namespace(prefix, uri);
            }
        }
    }

    fn ensure_namespace(&self, prefix: &str, uri: &str) {
        let storage = self.document.storage;
        if storage.element_declared_namespace_uri(self.node, prefix).is_some() {
            return;
        }
        let visible = self
            .document
            .connections
            .element_namespace_uri_for_prefix(storage, self.node, prefix)
            .unwrap_or("");
        if visible != uri && !(prefix == "xml" && uri == XML_NAMESPACE) {
            storage.element_register_prefix(self.node, prefix, uri);
        }
    }

    /// Set an attribute of the envelope namespace. The envelope prefix
    /// is used unless this element binds it to another namespace.
    pub(crate) fn set_envelope_attribute(&self, local_part: &str, value: &str) -> Result<Element<'d>> {
        let protocol = self.protocol();
        let uri = protocol.envelope_namespace();
        let prefix = self.prefix_for_attribute(uri, protocol.envelope_prefix());
        self.add_attribute(QName::with_prefix(uri, local_part, &prefix), value)
    }

    fn prefix_for_attribute(&self, uri: &str, preferred: &str) -> String {
        match self.document.storage.element_declared_namespace_uri(self.node, preferred) {
            Some(bound) if bound != uri => {}
            _ => return preferred.to_owned(),
        }

        let in_scope = self.namespaces_in_scope();
        if let Some(ns) = in_scope.iter().find(|ns| !ns.prefix().is_empty() && ns.uri() == uri) {
            return ns.prefix().to_owned();
        }

        let mut n = 0;
        loop {
            let prefix = format!("ns{}", n);
            if self.namespace_uri(&prefix).is_none() {
                return prefix;
            }
            n += 1;
        }
    }

    fn encoding_style_name(&self) -> QName<'static> {
        let protocol = self.protocol();
        QName::with_prefix(protocol.envelope_namespace(), ENCODING_STYLE, protocol.envelope_prefix())
    }

    /// Set the encoding style URIs of this element's content. The
    /// empty string removes the style.
    pub fn set_encoding_style(&self, style: &str) -> Result<Element<'d>> {
        if self.protocol() == Protocol::Soap12 && self.kind().is_fixed() {
            return Err(rejected(Error::structure(format!(
                "encodingStyle is not permitted on {} in SOAP 1.2",
                self.name()
            ))));
        }

        let name = self.encoding_style_name();
        if style.trim().is_empty() {
            self.remove_attribute(name);
            return Ok(*self);
        }

        for token in style.split_whitespace() {
            url::Url::parse(token).map_err(|e| {
                rejected(Error::validation(format!(
                    "encoding style `{}` is not an absolute URI: {}",
                    token, e
                )))
            })?;
        }

        self.set_envelope_attribute(ENCODING_STYLE, style)
    }

    pub fn encoding_style(&self) -> Option<&'d str> {
        self.attribute_value(self.encoding_style_name())
    }

    /// The header entry view of this element, if it is one.
    pub fn to_header_element(&self) -> Option<HeaderElement<'d>> {
        if self.kind() == ElementKind::HeaderElement {
            Some(HeaderElement::new(*self))
        } else {
            None
        }
    }

    /// Add a header entry. Only the `Header` accepts them.
    pub fn add_header_element<'n, N>(&self, name: N) -> Result<HeaderElement<'d>>
    where
        N: Into<ChildName<'n>>,
    {
        if self.kind() != ElementKind::Header {
            return Err(rejected(Error::structure(format!(
                "header entries can only be added to the Header, not {}",
                self.name()
            ))));
        }

        self.add_child_element(name).map(HeaderElement::new)
    }

    pub fn header_elements(&self) -> Vec<HeaderElement<'d>> {
        self.child_elements()
            .filter_map(|c| c.element())
            .filter_map(|e| e.to_header_element())
            .collect()
    }
}

impl<'d> fmt::Debug for Element<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Element {{ name: {:?}, kind: {:?} }}", self.name(), self.kind())
    }
}

/// Rules every prefix to namespace binding obeys.
fn check_namespace_binding(prefix: &str, uri: &str) -> Result<()> {
    if prefix.contains(':') || prefix.contains(char::is_whitespace) {
        return Err(Error::namespace(format!("`{}` is not a valid prefix", prefix)));
    }
    if prefix == "xmlns" || uri == XMLNS_NAMESPACE {
        return Err(Error::namespace("the xmlns prefix and namespace cannot be bound"));
    }
    if (prefix == "xml") != (uri == XML_NAMESPACE) {
        return Err(Error::namespace(
            "the xml prefix is bound to the XML namespace and nothing else",
        ));
    }
    if !prefix.is_empty() && uri.is_empty() {
        return Err(Error::namespace(format!(
            "prefix `{}` cannot be bound to an empty namespace",
            prefix
        )));
    }
    Ok(())
}

node!(
    Text, raw::TextId,
    "Textual data"
);

impl<'d> Text<'d> {
    pub fn text(&self) -> &'d str {
        self.document.storage.text(self.node)
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.document
            .connections
            .parent(raw::ChildOfElement::Text(self.node))
            .map(|n| self.document.wrap_element(n))
    }

    pub fn remove_from_parent(&self) {
        self.document
            .connections
            .remove_from_parent(raw::ChildOfElement::Text(self.node));
    }
}

impl<'d> fmt::Debug for Text<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Text {{ text: {:?} }}", self.text())
    }
}

macro_rules! unpack(
    ($enum_name:ident, $name:ident, $wrapper:ident, $inner:ident) => (
        pub fn $name(self) -> Option<$inner<'d>> {
            match self {
                $enum_name::$wrapper(n) => Some(n),
                _ => None,
            }
        }
    )
);

/// Nodes that may occur as a child of an element node
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ChildOfElement<'d> {
    Element(Element<'d>),
    Text(Text<'d>),
}

impl<'d> ChildOfElement<'d> {
    unpack!(ChildOfElement, element, Element, Element);
    unpack!(ChildOfElement, text, Text, Text);
}

macro_rules! conversion_trait(
    ($res_type:ident, {
        $($leaf_type:ident => $variant:expr),*
    }) => (
        $(impl<'d> From<$leaf_type<'d>> for $res_type<'d> {
            fn from(v: $leaf_type<'d>) -> $res_type<'d> {
                $variant(v)
            }
        })*

        $(impl<'a, 'd> From<&'a $leaf_type<'d>> for $res_type<'d> {
            fn from(v: &'a $leaf_type<'d>) -> $res_type<'d> {
                $variant(*v)
            }
        })*
    )
);

conversion_trait!(
    ChildOfElement, {
        Element => ChildOfElement::Element,
        Text    => ChildOfElement::Text
    }
);
