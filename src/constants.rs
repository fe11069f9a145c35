//! Identifiers shared by every SOAP implementation.
//!
//! These are exchanged verbatim on the wire or between factories and
//! are never computed.

use super::QName;

/// Used to create factories that build plain elements, not messages
pub const DYNAMIC_SOAP_PROTOCOL: &str = "Dynamic Protocol";
pub const SOAP_1_1_PROTOCOL: &str = "SOAP 1.1 Protocol";
pub const SOAP_1_2_PROTOCOL: &str = "SOAP 1.2 Protocol";
pub const DEFAULT_SOAP_PROTOCOL: &str = SOAP_1_1_PROTOCOL;

pub const URI_NS_SOAP_1_1_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const URI_NS_SOAP_1_2_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const URI_NS_SOAP_ENVELOPE: &str = URI_NS_SOAP_1_1_ENVELOPE;

pub const URI_NS_SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const URI_NS_SOAP_1_2_ENCODING: &str = "http://www.w3.org/2003/05/soap-encoding";

pub const SOAP_1_1_CONTENT_TYPE: &str = "text/xml";
pub const SOAP_1_2_CONTENT_TYPE: &str = "application/soap+xml";

/// The SOAP 1.1 actor of the next node on the message path
pub const URI_SOAP_ACTOR_NEXT: &str = "http://schemas.xmlsoap.org/soap/actor/next";

pub const URI_SOAP_1_2_ROLE_NEXT: &str = "http://www.w3.org/2003/05/soap-envelope/role/next";
pub const URI_SOAP_1_2_ROLE_NONE: &str = "http://www.w3.org/2003/05/soap-envelope/role/none";
pub const URI_SOAP_1_2_ROLE_ULTIMATE_RECEIVER: &str =
    "http://www.w3.org/2003/05/soap-envelope/role/ultimateReceiver";

/// The prefix the SOAP 1.2 specification uses for its envelope namespace
pub const SOAP_ENV_PREFIX: &str = "env";

pub const SOAP_VERSIONMISMATCH_FAULT: QName<'static> =
    QName::with_prefix(URI_NS_SOAP_1_2_ENVELOPE, "VersionMismatch", SOAP_ENV_PREFIX);
pub const SOAP_MUSTUNDERSTAND_FAULT: QName<'static> =
    QName::with_prefix(URI_NS_SOAP_1_2_ENVELOPE, "MustUnderstand", SOAP_ENV_PREFIX);
pub const SOAP_DATAENCODINGUNKNOWN_FAULT: QName<'static> =
    QName::with_prefix(URI_NS_SOAP_1_2_ENVELOPE, "DataEncodingUnknown", SOAP_ENV_PREFIX);
pub const SOAP_SENDER_FAULT: QName<'static> =
    QName::with_prefix(URI_NS_SOAP_1_2_ENVELOPE, "Sender", SOAP_ENV_PREFIX);
pub const SOAP_RECEIVER_FAULT: QName<'static> =
    QName::with_prefix(URI_NS_SOAP_1_2_ENVELOPE, "Receiver", SOAP_ENV_PREFIX);

pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub(crate) const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
