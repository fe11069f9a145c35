//! Errors reported by tree mutations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a tree operation can be refused.
///
/// Operations are atomic: when one of these is returned the tree is
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An unresolvable prefix or an invalid prefix / URI combination
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Illegal nesting, renaming a fixed envelope element, or an
    /// attribute that is not permitted on this element
    #[error("structure error: {0}")]
    Structure(String),

    /// Content the element does not accept, such as text under a Body
    #[error("content error: {0}")]
    Content(String),

    /// An operation that does not exist in the bound SOAP version
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A malformed name or attribute value
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    pub(crate) fn namespace(message: impl Into<String>) -> Self {
        Error::Namespace(message.into())
    }

    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Error::Structure(message.into())
    }

    pub(crate) fn content(message: impl Into<String>) -> Self {
        Error::Content(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedOperation(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

/// Report a refused mutation before handing the error back.
pub(crate) fn rejected(error: Error) -> Error {
    tracing::debug!(%error, "rejected tree mutation");
    error
}
