//! Item registry lookup.
//!
//! The host world resolves items to canonical registry ids and display names
//! through [`ItemRegistry`]. [`ItemCatalog`] is the in-memory implementation
//! used by the headless driver and the tests: custom items carry their id in
//! metadata under [`registry_id_key`], and only ids registered in the catalog
//! resolve.

use bulkstore_core::{ItemMeta, ItemStack, MetaValue, NamespacedKey};
use std::collections::BTreeMap;

/// Registry lookups consumed by storage units. Failing to resolve is normal.
pub trait ItemRegistry {
    /// Canonical registry id of a custom item.
    fn resolve_id(&self, item: &ItemStack) -> Option<String>;

    /// Display name of the item, when it has one.
    fn display_name(&self, item: &ItemStack) -> Option<String>;
}

/// Metadata key under which custom items carry their registry id.
pub fn registry_id_key() -> NamespacedKey {
    NamespacedKey::plugin("item_id")
}

/// A registered custom item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Canonical id, e.g. `BASIC_STORAGE`.
    pub id: String,
    /// Base material.
    pub material: NamespacedKey,
    /// Display name.
    pub name: String,
    /// Descriptive lines.
    pub lore: Vec<String>,
}

/// In-memory item registry.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a custom item.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        material: NamespacedKey,
        name: impl Into<String>,
        lore: Vec<String>,
    ) -> &CatalogEntry {
        let id = id.into();
        let entry = CatalogEntry {
            id: id.clone(),
            material,
            name: name.into(),
            lore,
        };
        self.entries.insert(id.clone(), entry);
        &self.entries[&id]
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a stack of a registered item.
    pub fn create(&self, id: &str, count: u32) -> Option<ItemStack> {
        let entry = self.entries.get(id)?;
        let mut meta = ItemMeta {
            display_name: Some(entry.name.clone()),
            lore: (!entry.lore.is_empty()).then(|| entry.lore.clone()),
            ..ItemMeta::default()
        };
        meta.data
            .insert(registry_id_key(), MetaValue::Str(entry.id.clone()));
        Some(ItemStack::with_meta(entry.material.clone(), count, meta))
    }
}

impl ItemRegistry for ItemCatalog {
    fn resolve_id(&self, item: &ItemStack) -> Option<String> {
        let tagged = item.meta()?.data.get_str(&registry_id_key())?;
        self.entries.get(tagged).map(|entry| entry.id.clone())
    }

    fn display_name(&self, item: &ItemStack) -> Option<String> {
        if let Some(custom) = item.display_name() {
            return Some(custom.to_string());
        }
        let id = self.resolve_id(item)?;
        self.entries.get(&id).map(|entry| entry.name.clone())
    }
}

/// Human-readable item name: registry name, else a title-cased material path.
pub fn item_name(item: &ItemStack, registry: &dyn ItemRegistry) -> String {
    registry
        .display_name(item)
        .unwrap_or_else(|| humanize(item.material.path()))
}

fn humanize(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog.register(
            "COPPER_WIRE",
            NamespacedKey::parse("string").unwrap(),
            "Copper Wire",
            vec!["Conducts power".into()],
        );
        catalog
    }

    #[test]
    fn created_items_resolve_to_their_id() {
        let catalog = catalog();
        let wire = catalog.create("COPPER_WIRE", 8).unwrap();
        assert_eq!(wire.count, 8);
        assert_eq!(catalog.resolve_id(&wire).as_deref(), Some("COPPER_WIRE"));
        assert_eq!(catalog.display_name(&wire).as_deref(), Some("Copper Wire"));
    }

    #[test]
    fn unregistered_tags_do_not_resolve() {
        let catalog = catalog();
        let mut forged = ItemStack::new(NamespacedKey::parse("stone").unwrap(), 1);
        forged
            .meta_mut()
            .data
            .insert(registry_id_key(), MetaValue::Str("UNKNOWN".into()));
        assert_eq!(catalog.resolve_id(&forged), None);
    }

    #[test]
    fn item_name_falls_back_to_material() {
        let catalog = catalog();
        let ingot = ItemStack::new(NamespacedKey::parse("iron_ingot").unwrap(), 1);
        assert_eq!(item_name(&ingot, &catalog), "Iron Ingot");
        assert_eq!(catalog.create("MISSING", 1), None);
    }
}
