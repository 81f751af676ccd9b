//! Storage unit menu layout and slot state.
//!
//! A unit's menu is a 3×9 grid. Only the input and output slots hold real
//! items; every other slot carries presentation items that are rebuilt from
//! the cache and never dropped.

use crate::codec;
use bulkstore_core::{ItemMeta, ItemStack, MetaValue, NamespacedKey};
use serde::{Deserialize, Serialize};

/// Number of slots in a storage unit menu (3 rows × 9 columns).
pub const MENU_SIZE: usize = 27;

pub const STATUS_SLOT: usize = 4;
pub const INPUT_SLOT: usize = 10;
pub const DISPLAY_SLOT: usize = 13;
pub const OUTPUT_SLOT: usize = 16;
pub const INTERACT_SLOT: usize = 22;

pub const INPUT_BORDER: [usize; 8] = [0, 1, 2, 9, 11, 18, 19, 20];
pub const BACKGROUND: [usize; 6] = [3, 5, 12, 14, 21, 23];
pub const OUTPUT_BORDER: [usize; 8] = [6, 7, 8, 15, 17, 24, 25, 26];

/// Click on the quick-action slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    /// Withdraw one item.
    Left,
    /// Withdraw one stack.
    Right,
    /// Deposit every matching item from the inventory.
    ShiftLeft,
    /// Withdraw as much as the inventory can hold.
    ShiftRight,
}

impl ClickAction {
    /// Parse `left`, `right`, `shift_left` or `shift_right`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "shift_left" => Some(Self::ShiftLeft),
            "shift_right" => Some(Self::ShiftRight),
            _ => None,
        }
    }
}

/// Slot contents of one unit's menu.
#[derive(Debug, Clone)]
pub struct StorageMenu {
    slots: [Option<ItemStack>; MENU_SIZE],
}

impl Default for StorageMenu {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMenu {
    /// Menu with borders, quick-action and loading items drawn.
    pub fn new() -> Self {
        let mut slots: [Option<ItemStack>; MENU_SIZE] = std::array::from_fn(|_| None);
        for slot in INPUT_BORDER {
            slots[slot] = Some(pane("blue_stained_glass_pane", "Input", &[]));
        }
        for slot in BACKGROUND {
            slots[slot] = Some(pane("gray_stained_glass_pane", " ", &[]));
        }
        for slot in OUTPUT_BORDER {
            slots[slot] = Some(pane("orange_stained_glass_pane", "Output", &[]));
        }
        slots[INTERACT_SLOT] = Some(interaction_item());
        slots[STATUS_SLOT] = Some(pane("cyan_stained_glass_pane", "Status", &["Loading..."]));
        Self { slots }
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

    pub fn take(&mut self, slot: usize) -> Option<ItemStack> {
        self.slots.get_mut(slot)?.take()
    }

    /// Merge `stack` into a slot, returning whatever did not fit.
    pub fn push_into(&mut self, slot: usize, mut stack: ItemStack) -> Option<ItemStack> {
        let Some(target) = self.slots.get_mut(slot) else {
            return Some(stack);
        };
        if let Some(existing) = target.as_mut() {
            if !existing.is_similar(&stack) {
                return Some(stack);
            }
            let remainder = existing.add(stack.count);
            return (remainder > 0).then(|| stack.with_count(remainder));
        }

        let fits = stack.count.min(stack.max_stack_size());
        let rest = stack.split(stack.count - fits);
        *target = Some(stack);
        rest
    }

    /// Empty the given slots, returning their contents.
    pub fn drop_items(&mut self, slots: &[usize]) -> Vec<ItemStack> {
        slots
            .iter()
            .filter_map(|&slot| self.take(slot))
            .filter(|stack| stack.count > 0)
            .collect()
    }
}

fn pane(material: &'static str, name: &str, lore: &[&str]) -> ItemStack {
    let meta = ItemMeta {
        display_name: Some(name.to_string()),
        lore: (!lore.is_empty()).then(|| lore.iter().map(|line| line.to_string()).collect()),
        ..ItemMeta::default()
    };
    ItemStack::with_meta(NamespacedKey::interop(material), 1, meta)
}

fn interaction_item() -> ItemStack {
    pane(
        "lime_stained_glass_pane",
        "Quick Actions",
        &[
            "Left Click: Withdraw 1 item",
            "Right Click: Withdraw 1 stack",
            "Shift Left Click: Deposit inventory",
            "Shift Right Click: Withdraw inventory",
        ],
    )
}

/// Status pane showing fill level.
pub fn status_item(amount: u32, max: u32) -> ItemStack {
    let percent = if max == 0 {
        0
    } else {
        (u64::from(amount) * 100 / u64::from(max)) as u32
    };
    pane(
        "cyan_stained_glass_pane",
        "Status",
        &[
            &format!("Stored: {amount} / {max}"),
            &format!("Filled: {percent}%"),
        ],
    )
}

/// The stored item, marked so it can never be inserted anywhere.
pub fn display_item(template: &ItemStack, label: &str, amount: u32) -> ItemStack {
    let mut display = template.with_count(1);
    let meta = display.meta_mut();
    meta.display_name = Some(label.to_string());
    meta.lore
        .get_or_insert_with(Vec::new)
        .push(format!("Amount: {amount}"));
    meta.data.insert(codec::display_key(), MetaValue::Byte(1));
    display
}

/// Placeholder shown while a unit holds nothing.
pub fn empty_display_item() -> ItemStack {
    let mut item = pane("barrier", "Empty", &["Insert an item to start storing"]);
    item.meta_mut()
        .data
        .insert(codec::empty_key(), MetaValue::Byte(1));
    item
}
