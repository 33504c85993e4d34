//! Error types
//!
//! The crate-level [`Error`] is what a publish admission or a service call can
//! fail with. Transport and URI failures never reach callers: the bridge handles
//! them by tearing the affected context down.

use std::fmt;

use crate::multicast::RequestError;
use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Publish request failed validation
    Request(RequestError),
    /// Registry rejected an operation
    Registry(RegistryError),
    /// The bridge service is no longer running
    ServiceClosed,
    /// The bridge service mailbox is full
    MailboxFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Request(e) => write!(f, "Invalid publish request: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::ServiceClosed => write!(f, "Bridge service closed"),
            Error::MailboxFull => write!(f, "Bridge service mailbox full"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Request(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::ServiceClosed | Error::MailboxFull => None,
        }
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Error::Request(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

/// Error rewriting a client URI onto the loopback protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// URI has no `scheme:` prefix
    MissingScheme(String),
    /// Replacement protocol is empty
    EmptyProtocol,
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriError::MissingScheme(uri) => write!(f, "URI has no scheme: {}", uri),
            UriError::EmptyProtocol => write!(f, "Loopback protocol is empty"),
        }
    }
}

impl std::error::Error for UriError {}
