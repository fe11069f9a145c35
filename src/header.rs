//! Header entries and the attributes that steer their processing.
//!
//! SOAP 1.1 names the intended processor of an entry its *actor*;
//! SOAP 1.2 calls the same thing its *role* and adds the *relay*
//! flag. Both versions share *mustUnderstand* but spell its values
//! differently.

use std::fmt;

use super::dom::Element;
use super::error::{rejected, Error, Result};
use super::{Protocol, QName};

/// A view of an immediate child of the `Header`.
///
/// Obtained from [`Element::add_header_element`] or
/// [`Element::to_header_element`]. An entry with no actor or role is
/// meant for the ultimate receiver; that is not the same as naming
/// the next node explicitly.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct HeaderElement<'d> {
    element: Element<'d>,
}

impl<'d> HeaderElement<'d> {
    pub(crate) fn new(element: Element<'d>) -> HeaderElement<'d> {
        HeaderElement { element }
    }

    pub fn element(&self) -> Element<'d> {
        self.element
    }

    pub fn name(&self) -> QName<'d> {
        self.element.name()
    }

    fn protocol(&self) -> Protocol {
        self.element.document().protocol()
    }

    fn attribute_name(&self, local_part: &'static str) -> QName<'static> {
        let protocol = self.protocol();
        QName::with_prefix(protocol.envelope_namespace(), local_part, protocol.envelope_prefix())
    }

    fn attribute(&self, local_part: &'static str) -> Option<&'d str> {
        self.element.attribute_value(self.attribute_name(local_part))
    }

    fn set_attribute(&self, local_part: &'static str, value: &str) -> Result<HeaderElement<'d>> {
        self.element.set_envelope_attribute(local_part, value)?;
        Ok(*self)
    }

    fn require_soap_1_2(&self, operation: &str) -> Result<()> {
        match self.protocol() {
            Protocol::Soap12 => Ok(()),
            Protocol::Soap11 => Err(rejected(Error::unsupported(format!(
                "{} is not defined in SOAP 1.1",
                operation
            )))),
        }
    }

    /// Under SOAP 1.2 this sets the role.
    pub fn set_actor(&self, actor: &str) -> Result<HeaderElement<'d>> {
        match self.protocol() {
            Protocol::Soap11 => {
                if actor.is_empty() {
                    return Err(rejected(Error::validation("an actor must be a non-empty URI")));
                }
                tracing::trace!(header = %self.name(), actor, "set actor");
                self.set_attribute("actor", actor)
            }
            Protocol::Soap12 => self.set_role(actor),
        }
    }

    /// `None` when no actor was given.
    pub fn actor(&self) -> Option<&'d str> {
        match self.protocol() {
            Protocol::Soap11 => self.attribute("actor"),
            Protocol::Soap12 => self.attribute("role"),
        }
    }

    pub fn set_role(&self, role: &str) -> Result<HeaderElement<'d>> {
        self.require_soap_1_2("role")?;
        if role.is_empty() {
            return Err(rejected(Error::validation("a role must be a non-empty URI")));
        }

        tracing::trace!(header = %self.name(), role, "set role");
        self.set_attribute("role", role)
    }

    pub fn role(&self) -> Result<Option<&'d str>> {
        self.require_soap_1_2("role")?;
        Ok(self.attribute("role"))
    }

    pub fn set_must_understand(&self, must_understand: bool) -> Result<HeaderElement<'d>> {
        let value = self.protocol().boolean_literal(must_understand);
        tracing::trace!(header = %self.name(), must_understand, "set mustUnderstand");
        self.set_attribute("mustUnderstand", value)
    }

    /// Accepts both the `1`/`0` and `true`/`false` spellings.
    pub fn must_understand(&self) -> bool {
        self.attribute("mustUnderstand").map_or(false, parse_boolean)
    }

    pub fn set_relay(&self, relay: bool) -> Result<HeaderElement<'d>> {
        self.require_soap_1_2("relay")?;

        let value = self.protocol().boolean_literal(relay);
        tracing::trace!(header = %self.name(), relay, "set relay");
        self.set_attribute("relay", value)
    }

    pub fn relay(&self) -> Result<bool> {
        self.require_soap_1_2("relay")?;
        Ok(self.attribute("relay").map_or(false, parse_boolean))
    }
}

fn parse_boolean(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

impl<'d> From<HeaderElement<'d>> for Element<'d> {
    fn from(v: HeaderElement<'d>) -> Element<'d> {
        v.element
    }
}

impl<'d> fmt::Debug for HeaderElement<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HeaderElement {{ name: {:?} }}", self.name())
    }
}
