//! Error types.
//!
//! None of these are ever returned from a resource's consumption interface:
//! fetch failures are recorded as state. [`RegistryError`] and
//! [`ConfigError`](crate::config::ConfigError) surface at wiring time only.

use std::fmt;

use crate::key::KeyError;

/// Why a fetch did not produce data.
///
/// # Examples
///
/// ```
/// use millpond::FetchError;
///
/// let err: FetchError<&str> = FetchError::Rejected("network down");
/// assert_eq!(err.rejection(), Some(&"network down"));
/// assert_eq!(err.to_string(), "fetch rejected: network down");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError<E> {
    /// The fetch function failed. The payload is carried verbatim.
    Rejected(E),
    /// The fetch function, or the future it returned, panicked.
    Panicked(String),
    /// The arguments could not be turned into a cache key; no fetch ran.
    InvalidArgs(KeyError),
    /// The request was issued outside a Tokio runtime; no fetch ran.
    NoRuntime,
}

impl<E> FetchError<E> {
    /// The fetch function's own error, if that is what this is.
    pub fn rejection(&self) -> Option<&E> {
        match self {
            FetchError::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the fetch function itself failed.
    pub fn is_rejected(&self) -> bool {
        matches!(self, FetchError::Rejected(_))
    }

    /// Returns true if the fetch panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, FetchError::Panicked(_))
    }
}

impl<E: fmt::Display> fmt::Display for FetchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Rejected(e) => write!(f, "fetch rejected: {}", e),
            FetchError::Panicked(msg) => write!(f, "fetch panicked: {}", msg),
            FetchError::InvalidArgs(e) => write!(f, "{}", e),
            FetchError::NoRuntime => write!(f, "no async runtime available to run the fetch"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for FetchError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Rejected(e) => Some(e),
            FetchError::InvalidArgs(e) => Some(e),
            FetchError::Panicked(_) | FetchError::NoRuntime => None,
        }
    }
}

/// Errors raised while wiring resources into a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A resource with this name is already registered.
    Duplicate(String),
    /// No resource with this name is registered.
    NotFound(String),
    /// The resource exists but with different argument, data or error types.
    TypeMismatch(String),
    /// Mock mode is on and the resource was registered without a fixture.
    MissingFixture(String),
}

impl RegistryError {
    /// Name of the resource the error is about.
    pub fn resource(&self) -> &str {
        match self {
            RegistryError::Duplicate(name)
            | RegistryError::NotFound(name)
            | RegistryError::TypeMismatch(name)
            | RegistryError::MissingFixture(name) => name,
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate(name) => {
                write!(f, "resource '{}' is already registered", name)
            }
            RegistryError::NotFound(name) => write!(f, "no resource named '{}'", name),
            RegistryError::TypeMismatch(name) => {
                write!(f, "resource '{}' is registered with different types", name)
            }
            RegistryError::MissingFixture(name) => {
                write!(f, "mock mode is enabled but resource '{}' has no fixture", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
