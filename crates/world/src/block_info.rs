//! Durable per-location block attributes.
//!
//! The host keeps a small string map for every placed block. Storage units
//! record their instance id there and mirror their contents so a cache can be
//! rebuilt after an unload or an administrative edit.

use bulkstore_core::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key holding the unit's instance id.
pub const STORAGE_ID: &str = "storage_id";

/// Key mirroring the stored quantity.
pub const STORED_AMOUNT: &str = "stored";

/// Key mirroring the stored item (JSON).
pub const STORED_ITEM: &str = "stored_item";

/// Key holding buffered input items while the unit is unloaded (JSON).
pub const INPUT_BUFFER: &str = "input_buffer";

/// Key holding buffered output items while the unit is unloaded (JSON).
pub const OUTPUT_BUFFER: &str = "output_buffer";

/// String attributes keyed by block location.
pub trait BlockInfoStore {
    fn get_string(&self, pos: BlockPos, key: &str) -> Option<String>;

    fn set_string(&mut self, pos: BlockPos, key: &str, value: String);

    fn remove_string(&mut self, pos: BlockPos, key: &str);

    /// Forget everything recorded for a location.
    fn clear_location(&mut self, pos: BlockPos);
}

/// In-memory attribute store with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlockInfo {
    locations: BTreeMap<BlockPos, BTreeMap<String, String>>,
}

impl MemoryBlockInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locations with at least one attribute.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Locations with recorded attributes.
    pub fn locations(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.locations.keys().copied()
    }

    /// All attributes of a location.
    pub fn attributes(&self, pos: BlockPos) -> Option<&BTreeMap<String, String>> {
        self.locations.get(&pos)
    }
}

impl BlockInfoStore for MemoryBlockInfo {
    fn get_string(&self, pos: BlockPos, key: &str) -> Option<String> {
        self.locations.get(&pos)?.get(key).cloned()
    }

    fn set_string(&mut self, pos: BlockPos, key: &str, value: String) {
        self.locations
            .entry(pos)
            .or_default()
            .insert(key.to_string(), value);
    }

    fn remove_string(&mut self, pos: BlockPos, key: &str) {
        if let Some(attributes) = self.locations.get_mut(&pos) {
            attributes.remove(key);
            if attributes.is_empty() {
                self.locations.remove(&pos);
            }
        }
    }

    fn clear_location(&mut self, pos: BlockPos) {
        self.locations.remove(&pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_last_attribute_drops_location() {
        let mut store = MemoryBlockInfo::new();
        let pos = BlockPos::new(1, 64, -3);
        store.set_string(pos, STORAGE_ID, "abc".into());
        store.set_string(pos, STORED_AMOUNT, "12".into());
        assert_eq!(store.get_string(pos, STORAGE_ID).as_deref(), Some("abc"));

        store.remove_string(pos, STORAGE_ID);
        assert_eq!(store.len(), 1);
        store.remove_string(pos, STORED_AMOUNT);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_location_is_scoped() {
        let mut store = MemoryBlockInfo::new();
        let a = BlockPos::new(0, 0, 0);
        let b = BlockPos::new(0, 1, 0);
        store.set_string(a, STORAGE_ID, "a".into());
        store.set_string(b, STORAGE_ID, "b".into());
        store.clear_location(a);
        assert_eq!(store.get_string(a, STORAGE_ID), None);
        assert_eq!(store.get_string(b, STORAGE_ID).as_deref(), Some("b"));
    }
}
