//! A namespace-aware element tree for SOAP 1.1 and SOAP 1.2 messages.
//!
//! ```
//! use sxd_soap::{Package, Protocol, QName};
//!
//! let package = Package::with_protocol(Protocol::Soap12);
//! let doc = package.as_document();
//!
//! let body = doc.body().expect("new messages have a body");
//! let order = body.add_child_element(QName::with_prefix("urn:shop", "Order", "shop"))?;
//! order.add_child_element(("Item", "shop"))?.add_text_node("coffee")?;
//!
//! let header = doc.header().expect("new messages have a header");
//! let trace = header.add_header_element(QName::with_prefix("urn:trace", "Trace", "t"))?;
//! trace.set_must_understand(true)?;
//! trace.set_role(sxd_soap::constants::URI_SOAP_1_2_ROLE_NEXT)?;
//! # Ok::<(), sxd_soap::Error>(())
//! ```
//!
//! ### Design decisions
//!
//! Nodes live in an arena owned by the `Package` and are handed out as
//! small `Copy` handles that borrow it. Parents are looked up, never
//! owned, and a detached node simply stops being reachable.
//!
//! Specialised SOAP elements (header blocks, body elements) are a
//! tag on the node assigned when it is attached, not a different
//! type. Use the explicit conversions, such as
//! [`dom::Element::to_header_element`], to obtain the specialised
//! view.
//!
//! A package is not `Sync`; sharing one between threads requires
//! external synchronization.

use std::{fmt, hash};

mod raw;
mod string_pool;

pub mod constants;
pub mod dom;
pub mod error;
pub mod header;
pub mod protocol;
pub mod writer;

pub use crate::error::{Error, Result};
pub use crate::protocol::Protocol;

#[doc(hidden)]
#[cfg(feature = "__internal_expose_string_pool")]
pub mod __internal {
    pub use crate::string_pool::StringPool;
}

/// A namespace-qualified name.
///
/// Two names are equal when their namespace URI and local part are
/// equal; the prefix is only a presentation hint.
#[derive(Debug, Copy, Clone)]
pub struct QName<'s> {
    namespace_uri: Option<&'s str>,
    local_part: &'s str,
    prefix: Option<&'s str>,
}

impl<'s> QName<'s> {
    pub const fn new(local_part: &'s str) -> QName<'s> {
        QName {
            namespace_uri: None,
            local_part,
            prefix: None,
        }
    }

    pub const fn with_namespace_uri(namespace_uri: Option<&'s str>, local_part: &'s str) -> QName<'s> {
        let namespace_uri = match namespace_uri {
            Some(uri) if uri.is_empty() => None,
            other => other,
        };

        QName {
            namespace_uri,
            local_part,
            prefix: None,
        }
    }

    pub const fn with_prefix(namespace_uri: &'s str, local_part: &'s str, prefix: &'s str) -> QName<'s> {
        let name = QName::with_namespace_uri(Some(namespace_uri), local_part);
        QName {
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
            ..name
        }
    }

    pub fn namespace_uri(&self) -> Option<&'s str> {
        self.namespace_uri
    }

    pub fn local_part(&self) -> &'s str {
        self.local_part
    }

    pub fn prefix(&self) -> Option<&'s str> {
        self.prefix
    }

    /// Checks the invariants every stored name must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.local_part.is_empty() {
            return Err(Error::validation("a name must have a local part"));
        }
        if self.local_part.contains(':') || self.local_part.contains(char::is_whitespace) {
            return Err(Error::validation(format!(
                "`{}` is not a valid local name",
                self.local_part
            )));
        }
        if let Some(prefix) = self.prefix {
            if self.namespace_uri.is_none() {
                return Err(Error::namespace(format!(
                    "prefix `{}` requires a namespace URI",
                    prefix
                )));
            }
            if prefix.contains(':') || prefix.eq_ignore_ascii_case("xmlns") {
                return Err(Error::namespace(format!("`{}` is not a usable prefix", prefix)));
            }
        }
        Ok(())
    }

    pub(crate) fn is_in(&self, namespace_uri: &str, local_part: &str) -> bool {
        self.namespace_uri == Some(namespace_uri) && self.local_part == local_part
    }
}

impl<'s> PartialEq for QName<'s> {
    fn eq(&self, other: &QName<'s>) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_part == other.local_part
    }
}

impl<'s> Eq for QName<'s> {}

impl<'s> hash::Hash for QName<'s> {
    fn hash<H>(&self, state: &mut H)
    where
        H: hash::Hasher,
    {
        self.namespace_uri.hash(state);
        self.local_part.hash(state);
    }
}

/// Clark notation: `{namespace}local`
impl<'s> fmt::Display for QName<'s> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.namespace_uri {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local_part),
            None => f.write_str(self.local_part),
        }
    }
}

impl<'s> From<&'s str> for QName<'s> {
    fn from(local_part: &'s str) -> QName<'s> {
        QName::new(local_part)
    }
}

impl<'s> From<(&'s str, &'s str)> for QName<'s> {
    fn from(v: (&'s str, &'s str)) -> QName<'s> {
        QName::with_namespace_uri(Some(v.0), v.1)
    }
}

/// Owns every node of one SOAP message.
///
/// A package is created with an `Envelope` containing an empty
/// `Header` followed by an empty `Body`, all in the envelope namespace
/// of its protocol.
///
/// Nodes cannot outlive their package:
///
/// ```compile_fail
/// use sxd_soap::Package;
///
/// let _node = {
///     let package = Package::new();
///     let doc = package.as_document();
///     doc.create_element("hello").unwrap()
/// };
/// ```
///
/// Neither can a child listing:
///
/// ```compile_fail
/// use sxd_soap::{Package, QName};
///
/// let _children = {
///     let package = Package::new();
///     let body = package.as_document().body().unwrap();
///     body.add_child_element(QName::new("hello")).unwrap();
///     body.child_elements()
/// };
/// ```
///
/// Packages cannot be shared between threads:
///
/// ```compile_fail
/// use sxd_soap::Package;
///
/// fn is_sync<T: Sync>(_: &T) {}
///
/// let package = Package::new();
/// is_sync(&package);
/// ```
pub struct Package {
    storage: raw::Storage,
    connections: raw::Connections,
}

impl Package {
    pub fn new() -> Package {
        Package::with_protocol(Protocol::default())
    }

    pub fn with_protocol(protocol: Protocol) -> Package {
        let storage = raw::Storage::new(protocol);
        let namespace_uri = protocol.envelope_namespace();
        let prefix = protocol.envelope_prefix();

        let envelope = storage.create_element(
            QName::with_prefix(namespace_uri, "Envelope", prefix),
            raw::ElementKind::Envelope,
        );
        storage.element_register_prefix(envelope, prefix, namespace_uri);

        let connections = raw::Connections::new(envelope);
        for (local_part, kind) in [("Header", raw::ElementKind::Header), ("Body", raw::ElementKind::Body)] {
            let child = storage.create_element(QName::with_prefix(namespace_uri, local_part, prefix), kind);
            connections.append_element_child(envelope, raw::ChildOfElement::Element(child));
        }

        tracing::trace!(%protocol, "created message package");

        Package { storage, connections }
    }

    pub fn protocol(&self) -> Protocol {
        self.storage.protocol()
    }

    pub fn as_document(&self) -> dom::Document<'_> {
        dom::Document::new(&self.storage, &self.connections)
    }
}

impl Default for Package {
    fn default() -> Self {
        Package::new()
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Package) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Package {{ protocol: {:?} }}", self.protocol())
    }
}

#[cfg(test)]
mod test {
    use super::{Error, Package, Protocol, QName};

    #[test]
    fn names_compare_without_their_prefix() {
        let a = QName::with_prefix("http://example.org", "Foo", "a");
        let b = QName::with_prefix("http://example.org", "Foo", "b");

        assert_eq!(a, b);
        assert_eq!(Some("a"), a.prefix());
    }

    #[test]
    fn names_in_different_namespaces_differ() {
        let a = QName::with_namespace_uri(Some("urn:one"), "Foo");
        let b = QName::with_namespace_uri(Some("urn:two"), "Foo");

        assert_ne!(a, b);
        assert_ne!(a, QName::new("Foo"));
    }

    #[test]
    fn an_empty_namespace_uri_means_no_namespace() {
        assert_eq!(QName::with_namespace_uri(Some(""), "Foo"), QName::new("Foo"));
        assert_eq!(None, QName::with_namespace_uri(Some(""), "Foo").namespace_uri());
    }

    #[test]
    fn a_prefix_without_a_namespace_is_invalid() {
        let name = QName::with_prefix("", "Foo", "ex");

        assert!(matches!(name.validate(), Err(Error::Namespace(_))));
    }

    #[test]
    fn an_empty_local_part_is_invalid() {
        assert!(matches!(QName::new("").validate(), Err(Error::Validation(_))));
        assert!(matches!(QName::new("a:b").validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn names_display_in_clark_notation() {
        assert_eq!("{urn:x}Foo", QName::with_prefix("urn:x", "Foo", "x").to_string());
        assert_eq!("Foo", QName::new("Foo").to_string());
    }

    #[test]
    fn packages_start_with_an_envelope_header_and_body() {
        let package = Package::with_protocol(Protocol::Soap12);
        let doc = package.as_document();

        let envelope = doc.envelope();
        assert_eq!(QName::with_namespace_uri(Some(Protocol::Soap12.envelope_namespace()), "Envelope"), envelope.name());

        let children: Vec<_> = envelope.child_elements().filter_map(|c| c.element()).collect();
        assert_eq!(2, children.len());
        assert_eq!("Header", children[0].name().local_part());
        assert_eq!("Body", children[1].name().local_part());
    }

    #[test]
    fn new_packages_use_the_default_protocol() {
        assert_eq!(Protocol::Soap11, Package::new().protocol());
    }
}
