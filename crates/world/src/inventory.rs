//! Player inventory used by the quick-action slot.
//!
//! Provides a 36-slot inventory with stack merging and capacity queries so
//! withdrawals never hand out more than the player can carry.

use bulkstore_core::ItemStack;
use serde::{Deserialize, Serialize};

/// Number of slots in player inventory.
pub const INVENTORY_SIZE: usize = 36;

/// Player inventory with fixed slots.
#[derive(Debug, Clone)]
pub struct PlayerInventory {
    slots: [Option<ItemStack>; INVENTORY_SIZE],
}

impl Serialize for PlayerInventory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(INVENTORY_SIZE))?;
        for slot in &self.slots {
            seq.serialize_element(slot)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PlayerInventory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let slots: Vec<Option<ItemStack>> = Vec::deserialize(deserializer)?;
        let len = slots.len();
        let slots: [Option<ItemStack>; INVENTORY_SIZE] = slots.try_into().map_err(|_| {
            serde::de::Error::custom(format!("Expected {INVENTORY_SIZE} slots, got {len}"))
        })?;
        Ok(Self { slots })
    }
}

impl Default for PlayerInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerInventory {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot)?.as_ref()
    }

    pub fn set(&mut self, slot: usize, stack: Option<ItemStack>) -> bool {
        match self.slots.get_mut(slot) {
            Some(existing) => {
                *existing = stack;
                true
            }
            None => false,
        }
    }

    /// Mutable access to every slot, for bulk deposits.
    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut Option<ItemStack>> {
        self.slots.iter_mut()
    }

    /// Add a stack, merging first, returning whatever didn't fit.
    pub fn add_item(&mut self, mut stack: ItemStack) -> Option<ItemStack> {
        for existing in self.slots.iter_mut().flatten() {
            if existing.is_similar(&stack) && !existing.is_full() {
                stack.count = existing.add(stack.count);
                if stack.count == 0 {
                    return None;
                }
            }
        }

        for slot in &mut self.slots {
            if slot.is_none() {
                let fits = stack.count.min(stack.max_stack_size());
                let rest = stack.split(stack.count - fits);
                *slot = Some(stack);
                match rest {
                    Some(rest) => stack = rest,
                    None => return None,
                }
            }
        }

        Some(stack)
    }

    /// How many more items similar to `template` fit.
    pub fn space_for(&self, template: &ItemStack) -> u64 {
        self.slots
            .iter()
            .map(|slot| match slot {
                None => u64::from(template.max_stack_size()),
                Some(existing) if existing.is_similar(template) => {
                    u64::from(existing.remaining_space())
                }
                Some(_) => 0,
            })
            .sum()
    }

    /// Total count of items similar to `template`.
    pub fn count_similar(&self, template: &ItemStack) -> u64 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.is_similar(template))
            .map(|stack| u64::from(stack.count))
            .sum()
    }

    pub fn empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }
}
