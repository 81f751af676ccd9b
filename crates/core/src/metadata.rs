//! Persistent metadata attached to item stacks.
//!
//! A [`MetadataBlob`] is a typed key-value container keyed by
//! [`NamespacedKey`]. Entries are kept in a `BTreeMap` so two blobs with the
//! same contents compare and serialize identically.

use crate::key::NamespacedKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A single typed metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaValue {
    /// Single byte, used for flags.
    Byte(u8),
    /// 32-bit signed integer.
    Int(i32),
    /// UTF-8 string.
    Str(String),
    /// Opaque serialized payload.
    Bytes(Vec<u8>),
}

/// Errors raised by best-effort metadata writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The namespace refuses writes from this writer.
    #[error("metadata namespace `{0}` is sealed")]
    NamespaceSealed(String),
}

/// Typed key-value container carried by an item's metadata.
///
/// Equality and serialization only see the entries. Sealed namespaces are a
/// property of the live blob, not of the data it carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataBlob {
    entries: BTreeMap<NamespacedKey, MetaValue>,
    /// Namespaces that refuse [`MetadataBlob::try_insert`] writes.
    #[serde(skip)]
    sealed: BTreeSet<String>,
}

impl PartialEq for MetadataBlob {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for MetadataBlob {}

impl MetadataBlob {
    /// Create an empty blob.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an entry unconditionally, replacing any previous value.
    pub fn insert(&mut self, key: NamespacedKey, value: MetaValue) {
        self.entries.insert(key, value);
    }

    /// Write an entry unless its namespace has been sealed.
    pub fn try_insert(&mut self, key: NamespacedKey, value: MetaValue) -> Result<(), MetadataError> {
        if self.sealed.contains(key.namespace()) {
            return Err(MetadataError::NamespaceSealed(key.namespace().to_string()));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Mark a namespace read-only for best-effort writers.
    pub fn seal_namespace(&mut self, namespace: impl Into<String>) {
        self.sealed.insert(namespace.into());
    }

    /// Remove an entry, returning its previous value.
    pub fn remove(&mut self, key: &NamespacedKey) -> Option<MetaValue> {
        self.entries.remove(key)
    }

    /// Raw value lookup.
    pub fn get(&self, key: &NamespacedKey) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    /// Whether any value is stored under `key`.
    pub fn contains(&self, key: &NamespacedKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Integer lookup; `None` when absent or stored with another type.
    pub fn get_int(&self, key: &NamespacedKey) -> Option<i32> {
        match self.entries.get(key) {
            Some(MetaValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Byte lookup; `None` when absent or stored with another type.
    pub fn get_byte(&self, key: &NamespacedKey) -> Option<u8> {
        match self.entries.get(key) {
            Some(MetaValue::Byte(value)) => Some(*value),
            _ => None,
        }
    }

    /// String lookup; `None` when absent or stored with another type.
    pub fn get_str(&self, key: &NamespacedKey) -> Option<&str> {
        match self.entries.get(key) {
            Some(MetaValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Payload lookup; `None` when absent or stored with another type.
    pub fn get_bytes(&self, key: &NamespacedKey) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(MetaValue::Bytes(value)) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&NamespacedKey, &MetaValue)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the blob holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
