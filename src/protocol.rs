//! The SOAP version a message is bound to.

use std::fmt;
use std::str::FromStr;

use super::constants::*;
use super::error::Error;

/// Chosen once when a package is created and never changed for that
/// tree. Every version-dependent behaviour keys off this tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Soap11,
    Soap12,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Soap11 => SOAP_1_1_PROTOCOL,
            Protocol::Soap12 => SOAP_1_2_PROTOCOL,
        }
    }

    pub fn envelope_namespace(self) -> &'static str {
        match self {
            Protocol::Soap11 => URI_NS_SOAP_1_1_ENVELOPE,
            Protocol::Soap12 => URI_NS_SOAP_1_2_ENVELOPE,
        }
    }

    pub fn encoding_namespace(self) -> &'static str {
        match self {
            Protocol::Soap11 => URI_NS_SOAP_ENCODING,
            Protocol::Soap12 => URI_NS_SOAP_1_2_ENCODING,
        }
    }

    /// The prefix used for the envelope namespace of new messages
    pub fn envelope_prefix(self) -> &'static str {
        match self {
            Protocol::Soap11 => "SOAP-ENV",
            Protocol::Soap12 => SOAP_ENV_PREFIX,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Protocol::Soap11 => SOAP_1_1_CONTENT_TYPE,
            Protocol::Soap12 => SOAP_1_2_CONTENT_TYPE,
        }
    }

    /// The literal written for a `mustUnderstand` or `relay` flag.
    pub(crate) fn boolean_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Protocol::Soap11, true) => "1",
            (Protocol::Soap11, false) => "0",
            (Protocol::Soap12, true) => "true",
            (Protocol::Soap12, false) => "false",
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Protocol, Error> {
        match s {
            SOAP_1_1_PROTOCOL => Ok(Protocol::Soap11),
            SOAP_1_2_PROTOCOL => Ok(Protocol::Soap12),
            DYNAMIC_SOAP_PROTOCOL => Err(Error::unsupported(
                "a message tree must be bound to SOAP 1.1 or SOAP 1.2",
            )),
            other => Err(Error::validation(format!("unknown SOAP protocol `{}`", other))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::Protocol;
    use crate::constants::*;
    use crate::Error;

    #[test]
    fn the_default_protocol_is_soap_1_1() {
        assert_eq!(Protocol::Soap11, Protocol::default());
        assert_eq!(Ok(Protocol::default()), DEFAULT_SOAP_PROTOCOL.parse());
    }

    #[test]
    fn protocols_parse_from_their_names() {
        assert_eq!(Ok(Protocol::Soap12), SOAP_1_2_PROTOCOL.parse());
        assert_eq!(SOAP_1_2_PROTOCOL, Protocol::Soap12.to_string());
    }

    #[test]
    fn the_dynamic_protocol_cannot_bind_a_message() {
        let err = DYNAMIC_SOAP_PROTOCOL.parse::<Protocol>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn unknown_protocol_names_are_rejected() {
        let err = "SOAP 2.0 Protocol".parse::<Protocol>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn each_version_has_its_own_namespaces() {
        assert_eq!(URI_NS_SOAP_ENVELOPE, Protocol::Soap11.envelope_namespace());
        assert_eq!(URI_NS_SOAP_1_2_ENCODING, Protocol::Soap12.encoding_namespace());
        assert_eq!(SOAP_1_2_CONTENT_TYPE, Protocol::Soap12.content_type());
        assert_eq!("env", Protocol::Soap12.envelope_prefix());
    }
}
