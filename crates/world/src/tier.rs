//! Storage unit tiers.

use crate::catalog::ItemCatalog;
use crate::error::StorageError;
use bulkstore_core::{ItemStack, NamespacedKey};

/// A storage unit variant: registry id, name and fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTier {
    id: String,
    name: String,
    max: u32,
}

impl StorageTier {
    /// Validate a tier definition. Capacities must fit the 32-bit metadata integer.
    pub fn new(id: impl Into<String>, name: impl Into<String>, max: u64) -> Result<Self, StorageError> {
        let id = id.into().trim().to_uppercase();
        if id.is_empty() || max == 0 {
            return Err(StorageError::InvalidTier(id));
        }
        let max = i32::try_from(max)
            .ok()
            .and_then(|max| u32::try_from(max).ok())
            .ok_or_else(|| StorageError::CapacityTooLarge { id: id.clone(), max })?;
        Ok(Self {
            id,
            name: name.into(),
            max,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in items.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Register the tier's item in `catalog` and return one unit item.
    pub fn register(&self, catalog: &mut ItemCatalog) -> ItemStack {
        catalog.register(
            self.id.clone(),
            NamespacedKey::interop("barrel"),
            self.name.clone(),
            vec![
                "Stores a single item type in bulk".to_string(),
                format!("Capacity: {} items", self.max),
            ],
        );
        catalog
            .create(&self.id, 1)
            .unwrap_or_else(|| ItemStack::new(NamespacedKey::interop("barrel"), 1))
    }
}

/// The five built-in tiers.
pub fn default_tiers() -> Vec<StorageTier> {
    [
        ("BASIC_STORAGE", "Basic Storage Unit", 6_400),
        ("ADVANCED_STORAGE", "Advanced Storage Unit", 25_600),
        ("REINFORCED_STORAGE", "Reinforced Storage Unit", 102_400),
        ("VOID_STORAGE", "Void Storage Unit", 409_600),
        ("INFINITY_STORAGE", "Infinity Storage Unit", 1_600_000_000),
    ]
    .into_iter()
    .filter_map(|(id, name, max)| StorageTier::new(id, name, max).ok())
    .collect()
}
