//! Namespaced keys.
//!
//! Keys are stable `namespace:path` identifiers used for item materials and
//! for the entries of an item's metadata blob (e.g. `bulkstore:stored`).
//! They are ordered and validated so metadata serializes deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace owned by the storage units themselves.
pub const PLUGIN_NAMESPACE: &str = "bulkstore";

/// Namespace shared with other systems reading item metadata.
pub const INTEROP_NAMESPACE: &str = "minecraft";

/// Error returned when parsing an invalid [`NamespacedKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct KeyError {
    message: String,
}

impl KeyError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A key of the form `namespace:path`.
///
/// Serialized as its string form so it can be used as a map key in any format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NamespacedKey {
    namespace: String,
    path: String,
}

impl NamespacedKey {
    /// Parse a key, defaulting the namespace to [`INTEROP_NAMESPACE`] when omitted.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        Self::parse_with_default_namespace(input, INTEROP_NAMESPACE)
    }

    /// Parse a key using a caller-provided default namespace.
    pub fn parse_with_default_namespace(
        input: &str,
        default_namespace: &str,
    ) -> Result<Self, KeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(KeyError::new("NamespacedKey cannot be empty"));
        }

        let (namespace, path) = input.split_once(':').unwrap_or((default_namespace, input));
        let namespace = namespace.trim();
        let path = path.trim();

        validate_part("namespace", namespace, 64, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
        })?;
        validate_part("path", path, 128, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
        })?;

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Key in the storage-unit namespace. `path` must already be a valid path.
    pub fn plugin(path: &'static str) -> Self {
        Self::from_static(PLUGIN_NAMESPACE, path)
    }

    /// Key in the interop namespace. `path` must already be a valid path.
    pub fn interop(path: &'static str) -> Self {
        Self::from_static(INTEROP_NAMESPACE, path)
    }

    fn from_static(namespace: &'static str, path: &'static str) -> Self {
        debug_assert!(Self::parse(&format!("{namespace}:{path}")).is_ok());
        Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        }
    }

    /// Key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for NamespacedKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NamespacedKey> for String {
    fn from(key: NamespacedKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for NamespacedKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

fn validate_part(
    what: &str,
    value: &str,
    max_len: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::new(format!("NamespacedKey {what} cannot be empty")));
    }
    if value.len() > max_len {
        return Err(KeyError::new(format!(
            "NamespacedKey {what} too long (max {max_len})"
        )));
    }
    if !value.chars().all(allowed) {
        return Err(KeyError::new(format!(
            "NamespacedKey {what} has invalid characters: {value:?}"
        )));
    }
    Ok(())
}
