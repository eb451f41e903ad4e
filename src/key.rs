//! Argument-key derivation.
//!
//! Two requests address the same cached entry when their argument keys are
//! equal. The default derivation serialises the arguments to JSON with every
//! object's keys sorted, so structurally equal arguments produce the same key
//! regardless of field or map iteration order.
//!
//! # Examples
//!
//! ```
//! use millpond::ArgKey;
//! use std::collections::HashMap;
//!
//! let mut a = HashMap::new();
//! a.insert("site", 3);
//! a.insert("page", 1);
//!
//! let mut b = HashMap::new();
//! b.insert("page", 1);
//! b.insert("site", 3);
//!
//! assert_eq!(ArgKey::canonical(&a).unwrap(), ArgKey::canonical(&b).unwrap());
//! assert_eq!(ArgKey::canonical(&a).unwrap().as_str(), r#"{"page":1,"site":3}"#);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Cache identity of a request's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgKey(String);

impl ArgKey {
    /// Wrap an already-derived key.
    ///
    /// Use this from custom key functions that know a cheaper identity for
    /// their arguments than full serialisation (a numeric id, say).
    pub fn new(key: impl Into<String>) -> Self {
        ArgKey(key.into())
    }

    /// Derive the canonical key of `args`.
    ///
    /// Fails when the arguments cannot be represented as JSON, for example a
    /// map whose keys are not strings or integers.
    pub fn canonical<A: Serialize + ?Sized>(args: &A) -> Result<Self, KeyError> {
        let value = serde_json::to_value(args).map_err(|e| KeyError::new(e.to_string()))?;
        Ok(ArgKey(sorted(value).to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// serde_json may be built with `preserve_order`, so ordering is enforced here
// rather than relying on the map type.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Error raised when arguments cannot be turned into an [`ArgKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyError {
    message: String,
}

impl KeyError {
    /// Create a key error with a description of what went wrong.
    pub fn new(message: impl Into<String>) -> Self {
        KeyError {
            message: message.into(),
        }
    }

    /// Description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot derive argument key: {}", self.message)
    }
}

impl std::error::Error for KeyError {}

/// Shared key-derivation function stored by each resource.
pub type KeyFn<A> = Arc<dyn Fn(&A) -> Result<ArgKey, KeyError> + Send + Sync>;

/// The default key function: [`ArgKey::canonical`].
pub fn canonical_key_fn<A: Serialize + 'static>() -> KeyFn<A> {
    Arc::new(|args: &A| ArgKey::canonical(args))
}
