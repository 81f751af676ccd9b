//! Item stacks and their descriptive metadata.

use crate::key::NamespacedKey;
use crate::metadata::MetadataBlob;
use serde::{Deserialize, Serialize};

/// Maximum stack size for every material.
pub const DEFAULT_STACK_SIZE: u32 = 64;

/// Descriptive and persistent data attached to an item stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Custom display name, if any.
    pub display_name: Option<String>,
    /// Descriptive lines shown under the name.
    pub lore: Option<Vec<String>>,
    /// Persistent key-value data.
    pub data: MetadataBlob,
}

impl ItemMeta {
    /// Whether the meta carries any descriptive lines.
    pub fn has_lore(&self) -> bool {
        self.lore.as_ref().is_some_and(|lore| !lore.is_empty())
    }
}

/// A stack of items in a slot or on the ground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Base material.
    pub material: NamespacedKey,
    /// Quantity in stack.
    pub count: u32,
    /// Optional metadata (custom items always carry some).
    pub meta: Option<ItemMeta>,
}

impl ItemStack {
    /// Create a plain stack without metadata.
    pub fn new(material: NamespacedKey, count: u32) -> Self {
        Self {
            material,
            count,
            meta: None,
        }
    }

    /// Create a stack carrying metadata.
    pub fn with_meta(material: NamespacedKey, count: u32, meta: ItemMeta) -> Self {
        Self {
            material,
            count,
            meta: Some(meta),
        }
    }

    /// Clone of this stack with a different count.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            count,
            ..self.clone()
        }
    }

    /// Maximum stack size for this item.
    pub fn max_stack_size(&self) -> u32 {
        DEFAULT_STACK_SIZE
    }

    /// Same material and metadata, ignoring count.
    pub fn is_similar(&self, other: &ItemStack) -> bool {
        self.material == other.material && self.meta == other.meta
    }

    /// Check if this stack is at max capacity.
    pub fn is_full(&self) -> bool {
        self.count >= self.max_stack_size()
    }

    /// Remaining space in this stack.
    pub fn remaining_space(&self) -> u32 {
        self.max_stack_size().saturating_sub(self.count)
    }

    /// Try to add items to this stack, returning the amount that didn't fit.
    pub fn add(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.remaining_space());
        self.count += added;
        amount - added
    }

    /// Try to remove items from this stack, returning the amount actually removed.
    pub fn remove(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.count);
        self.count -= removed;
        removed
    }

    /// Split off `amount` items into a new stack.
    pub fn split(&mut self, amount: u32) -> Option<ItemStack> {
        if amount == 0 || amount > self.count {
            return None;
        }
        self.count -= amount;
        Some(self.with_count(amount))
    }

    /// Metadata, if present.
    pub fn meta(&self) -> Option<&ItemMeta> {
        self.meta.as_ref()
    }

    /// Metadata, created empty on first access.
    pub fn meta_mut(&mut self) -> &mut ItemMeta {
        self.meta.get_or_insert_with(ItemMeta::default)
    }

    /// Custom display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.meta.as_ref()?.display_name.as_deref()
    }

    /// Descriptive lines (empty when absent).
    pub fn lore(&self) -> &[String] {
        self.meta
            .as_ref()
            .and_then(|meta| meta.lore.as_deref())
            .unwrap_or(&[])
    }

    /// Split `total` items into stacks of at most one stack's worth.
    pub fn chunked(template: &ItemStack, total: u64) -> Vec<ItemStack> {
        let per_stack = u64::from(template.max_stack_size().max(1));
        let mut remaining = total;
        let mut stacks = Vec::new();
        while remaining > 0 {
            let take = remaining.min(per_stack);
            stacks.push(template.with_count(take as u32));
            remaining -= take;
        }
        stacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetaValue;

    fn iron(count: u32) -> ItemStack {
        ItemStack::new(NamespacedKey::parse("iron_ingot").unwrap(), count)
    }

    #[test]
    fn stack_add_reports_overflow() {
        let mut stack = iron(60);
        assert_eq!(stack.add(10), 6);
        assert_eq!(stack.count, 64);
        assert!(stack.is_full());
    }

    #[test]
    fn split_keeps_metadata() {
        let mut meta = ItemMeta::default();
        meta.data
            .insert(NamespacedKey::plugin("marker"), MetaValue::Byte(1));
        let mut stack = ItemStack::with_meta(NamespacedKey::parse("stone").unwrap(), 32, meta);

        let split = stack.split(12).unwrap();
        assert_eq!(split.count, 12);
        assert_eq!(stack.count, 20);
        assert!(split.is_similar(&stack));
        assert!(stack.split(21).is_none());
    }

    #[test]
    fn metadata_breaks_similarity() {
        let plain = iron(1);
        let mut named = iron(1);
        named.meta_mut().display_name = Some("Shiny".into());
        assert!(!plain.is_similar(&named));
        assert!(plain.is_similar(&iron(40)));
    }

    #[test]
    fn chunked_splits_into_full_stacks() {
        let stacks = ItemStack::chunked(&iron(1), 150);
        let counts: Vec<u32> = stacks.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![64, 64, 22]);
        assert!(ItemStack::chunked(&iron(1), 0).is_empty());
    }
}
