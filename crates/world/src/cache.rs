//! Per-location storage cache.
//!
//! A cache is either empty or holds a single item type with a positive
//! quantity. The two never diverge: whenever the quantity reaches zero the
//! stored type is cleared. Items only enter the count through the input
//! buffer (or a restore) and only leave through the output buffer, a quick
//! action, or [`StorageCache::destroy`].
//!
//! Every change is written through to the block attribute store so the cache
//! can be rebuilt from durable state by [`StorageCache::reload_data`].

use crate::admission::AdmissionFilter;
use crate::block_info::{
    BlockInfoStore, INPUT_BUFFER, OUTPUT_BUFFER, STORAGE_ID, STORED_AMOUNT, STORED_ITEM,
};
use crate::catalog::{item_name, ItemRegistry};
use crate::codec;
use crate::error::StorageError;
use crate::inventory::PlayerInventory;
use crate::menu::{self, ClickAction, StorageMenu, DISPLAY_SLOT, INPUT_SLOT, OUTPUT_SLOT, STATUS_SLOT};
use bulkstore_core::{BlockPos, ItemStack};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Identity of the one item kind a cache holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoredType {
    /// Canonical registry id, uppercase.
    Registry(String),
    /// Hash of the full item representation for items the registry doesn't know.
    Fingerprint([u8; 32]),
}

impl StoredType {
    /// Resolve the stored type of `item`. Count is ignored.
    pub fn of(item: &ItemStack, registry: &dyn ItemRegistry) -> Self {
        match registry.resolve_id(item) {
            Some(id) => Self::Registry(id.trim().to_uppercase()),
            None => Self::Fingerprint(fingerprint(item)),
        }
    }
}

impl fmt::Display for StoredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(id) => f.write_str(id),
            Self::Fingerprint(hash) => {
                f.write_str("#")?;
                for byte in &hash[..8] {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

fn fingerprint(item: &ItemStack) -> [u8; 32] {
    fn field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }

    let mut hasher = blake3::Hasher::new();
    field(&mut hasher, item.material.to_string().as_bytes());
    if let Some(meta) = item.meta() {
        field(&mut hasher, meta.display_name.as_deref().unwrap_or("").as_bytes());
        let lore = meta.lore.as_deref().unwrap_or(&[]);
        hasher.update(&(lore.len() as u64).to_le_bytes());
        for line in lore {
            field(&mut hasher, line.as_bytes());
        }
        for (key, value) in meta.data.iter() {
            field(&mut hasher, key.to_string().as_bytes());
            match serde_json::to_vec(value) {
                Ok(bytes) => field(&mut hasher, &bytes),
                Err(_) => field(&mut hasher, &[]),
            }
        }
    }
    *hasher.finalize().as_bytes()
}

/// Registry and admission policy needed to classify incoming items.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    pub registry: &'a dyn ItemRegistry,
    pub filter: &'a AdmissionFilter,
}

impl<'a> Lookup<'a> {
    pub fn new(registry: &'a dyn ItemRegistry, filter: &'a AdmissionFilter) -> Self {
        Self { registry, filter }
    }

    fn admits(&self, item: &ItemStack) -> bool {
        self.filter.is_admissible(item, self.registry)
    }
}

#[derive(Debug, Clone)]
struct Holding {
    kind: StoredType,
    /// Single item used to materialise withdrawals.
    template: ItemStack,
    label: String,
}

impl Holding {
    fn new(item: &ItemStack, registry: &dyn ItemRegistry) -> Self {
        Self {
            kind: StoredType::of(item, registry),
            template: item.with_count(1),
            label: item_name(item, registry),
        }
    }
}

/// Serializable view of a cache for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub pos: BlockPos,
    pub instance_id: String,
    pub stored: Option<String>,
    pub amount: u32,
    pub max: u32,
    pub input: u32,
    pub output: u32,
}

/// Storage state of one placed unit.
#[derive(Debug, Clone)]
pub struct StorageCache {
    pos: BlockPos,
    max: u32,
    instance_id: String,
    holding: Option<Holding>,
    amount: u32,
    menu: StorageMenu,
}

impl StorageCache {
    /// Empty cache with a drawn menu.
    pub fn new(pos: BlockPos, max: u32, instance_id: impl Into<String>) -> Self {
        let mut cache = Self {
            pos,
            max,
            instance_id: instance_id.into(),
            holding: None,
            amount: 0,
            menu: StorageMenu::new(),
        };
        cache.refresh_menu();
        cache
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    /// Tier capacity.
    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn stored_type(&self) -> Option<&StoredType> {
        self.holding.as_ref().map(|holding| &holding.kind)
    }

    /// One item of the stored kind.
    pub fn stored_item(&self) -> Option<&ItemStack> {
        self.holding.as_ref().map(|holding| &holding.template)
    }

    pub fn label(&self) -> Option<&str> {
        self.holding.as_ref().map(|holding| holding.label.as_str())
    }

    pub fn menu(&self) -> &StorageMenu {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut StorageMenu {
        &mut self.menu
    }

    pub fn is_empty(&self) -> bool {
        self.holding.is_none()
    }

    /// True when the cache holds items of the same type as `item`.
    pub fn matches(&self, item: &ItemStack, registry: &dyn ItemRegistry) -> bool {
        self.holding
            .as_ref()
            .is_some_and(|holding| holding.kind == StoredType::of(item, registry))
    }

    /// Commit the cache to `item` and add `amount` to its quantity.
    ///
    /// An empty cache takes the type of `item`; a holding cache of the same
    /// type adds to what it already counts. Returns how many items did not fit
    /// under the capacity; the caller must materialise them. Loading a
    /// different type than the one held is rejected and leaves the cache
    /// untouched.
    pub fn load(
        &mut self,
        item: &ItemStack,
        amount: u32,
        store: &mut dyn BlockInfoStore,
        lookup: Lookup<'_>,
    ) -> Result<u32, StorageError> {
        let incoming = Holding::new(item, lookup.registry);
        if let Some(holding) = &self.holding {
            if holding.kind != incoming.kind {
                warn!(
                    pos = %self.pos,
                    held = %holding.label,
                    incoming = %incoming.label,
                    "refusing to load a different item type"
                );
                return Err(StorageError::TypeMismatch {
                    pos: self.pos,
                    held: holding.label.clone(),
                    incoming: incoming.label,
                });
            }
        }
        if amount == 0 {
            return Ok(0);
        }

        let accepted = amount.min(self.max - self.amount);
        if accepted == 0 {
            return Ok(amount);
        }
        if self.holding.is_none() {
            self.holding = Some(incoming);
        }
        self.amount += accepted;
        self.persist(store);
        self.refresh_menu();
        Ok(amount - accepted)
    }

    /// Administrative override of the quantity.
    ///
    /// Zero empties the cache. A positive amount requires a loaded type.
    pub fn set_amount(
        &mut self,
        amount: u32,
        store: &mut dyn BlockInfoStore,
    ) -> Result<(), StorageError> {
        if amount > self.max {
            warn!(pos = %self.pos, amount, max = self.max, "amount above capacity");
            return Err(StorageError::OverCapacity {
                amount,
                max: self.max,
            });
        }
        if amount > 0 && self.holding.is_none() {
            warn!(pos = %self.pos, amount, "amount set on an empty storage");
            return Err(StorageError::NotLoaded {
                pos: self.pos,
                amount,
            });
        }

        self.amount = amount;
        if amount == 0 {
            self.holding = None;
        }
        self.persist(store);
        self.refresh_menu();
        Ok(())
    }

    /// Absorb the input buffer into the count. Returns the absorbed amount.
    pub fn input(&mut self, store: &mut dyn BlockInfoStore, lookup: Lookup<'_>) -> u32 {
        let absorbed = self.absorb(lookup);
        if absorbed > 0 {
            self.persist(store);
            self.refresh_menu();
        }
        absorbed
    }

    /// One scheduled step: absorb the input buffer, then drain up to one
    /// stack into the output buffer, then redraw the menu.
    pub fn tick(&mut self, store: &mut dyn BlockInfoStore, lookup: Lookup<'_>) {
        let absorbed = self.absorb(lookup);
        let drained = self.drain();
        if absorbed > 0 || drained > 0 {
            self.persist(store);
        }
        self.refresh_menu();
    }

    fn absorb(&mut self, lookup: Lookup<'_>) -> u32 {
        let Some(mut buffer) = self.menu.take(INPUT_SLOT) else {
            return 0;
        };
        if buffer.count == 0 {
            return 0;
        }

        let admitted = lookup.admits(&buffer)
            && self
                .holding
                .as_ref()
                .map_or(true, |holding| holding.kind == StoredType::of(&buffer, lookup.registry));
        let space = self.max - self.amount;
        let taken = if admitted { buffer.count.min(space) } else { 0 };

        if taken > 0 {
            if self.holding.is_none() {
                self.holding = Some(Holding::new(&buffer, lookup.registry));
            }
            self.amount += taken;
            buffer.remove(taken);
        }
        if buffer.count > 0 {
            self.menu.set(INPUT_SLOT, Some(buffer));
        }
        taken
    }

    fn drain(&mut self) -> u32 {
        let Some(template) = self.stored_item().cloned() else {
            return 0;
        };
        let room = match self.menu.get(OUTPUT_SLOT) {
            None => template.max_stack_size(),
            Some(existing) if existing.is_similar(&template) => existing.remaining_space(),
            Some(_) => 0,
        };
        let moved = self.amount.min(room);
        if moved == 0 {
            return 0;
        }

        if let Some(rest) = self.menu.push_into(OUTPUT_SLOT, template.with_count(moved)) {
            warn!(pos = %self.pos, count = rest.count, "output buffer refused items");
            self.take_out(moved - rest.count);
            return moved - rest.count;
        }
        self.take_out(moved);
        moved
    }

    fn take_out(&mut self, count: u32) {
        self.amount -= count.min(self.amount);
        if self.amount == 0 {
            self.holding = None;
        }
    }

    /// Run a quick action against `inventory`. Returns the number of items moved.
    pub fn interact(
        &mut self,
        action: ClickAction,
        inventory: &mut PlayerInventory,
        store: &mut dyn BlockInfoStore,
        lookup: Lookup<'_>,
    ) -> u32 {
        let moved = match action {
            ClickAction::Left => self.withdraw_to(inventory, 1),
            ClickAction::Right => {
                let stack = self
                    .stored_item()
                    .map_or(0, |template| u64::from(template.max_stack_size()));
                self.withdraw_to(inventory, stack)
            }
            ClickAction::ShiftLeft => self.deposit_from(inventory, lookup),
            ClickAction::ShiftRight => self.withdraw_to(inventory, u64::MAX),
        };
        if moved > 0 {
            debug!(pos = %self.pos, ?action, moved, "quick action");
            self.persist(store);
            self.refresh_menu();
        }
        moved
    }

    fn withdraw_to(&mut self, inventory: &mut PlayerInventory, wanted: u64) -> u32 {
        let Some(template) = self.stored_item().cloned() else {
            return 0;
        };
        let count = wanted
            .min(inventory.space_for(&template))
            .min(u64::from(self.amount));
        let mut returned = 0;
        for stack in ItemStack::chunked(&template, count) {
            if let Some(rest) = inventory.add_item(stack) {
                returned += rest.count;
            }
        }
        let moved = count as u32 - returned;
        self.take_out(moved);
        moved
    }

    fn deposit_from(&mut self, inventory: &mut PlayerInventory, lookup: Lookup<'_>) -> u32 {
        let Some(kind) = self.stored_type().cloned() else {
            return 0;
        };
        let mut deposited = 0;
        for slot in inventory.slots_mut() {
            let space = self.max - self.amount;
            if space == 0 {
                break;
            }
            let Some(stack) = slot.as_mut() else {
                continue;
            };
            if StoredType::of(stack, lookup.registry) != kind || !lookup.admits(stack) {
                continue;
            }
            let taken = stack.remove(space);
            self.amount += taken;
            deposited += taken;
            if stack.count == 0 {
                *slot = None;
            }
        }
        deposited
    }

    /// Rebuild identity and contents from the block attribute store.
    ///
    /// The durable state is adopted when it is consistent and fits the
    /// capacity. Otherwise the in-memory state wins and is written back, so a
    /// broken mirror never costs stored items. Buffers saved by an unload are
    /// put back into empty buffer slots.
    pub fn reload_data(&mut self, store: &mut dyn BlockInfoStore, registry: &dyn ItemRegistry) {
        if let Some(id) = store
            .get_string(self.pos, STORAGE_ID)
            .filter(|id| !id.is_empty())
        {
            if id != self.instance_id {
                debug!(pos = %self.pos, old = %self.instance_id, new = %id, "adopting durable storage id");
                self.instance_id = id;
            }
        }

        let amount = store
            .get_string(self.pos, STORED_AMOUNT)
            .map(|raw| raw.trim().parse::<u32>());
        let item = store
            .get_string(self.pos, STORED_ITEM)
            .map(|raw| serde_json::from_str::<ItemStack>(&raw));

        match (amount, item) {
            (Some(Ok(0)), None) => {
                self.holding = None;
                self.amount = 0;
            }
            (Some(Ok(amount)), Some(Ok(item))) if amount > 0 && amount <= self.max => {
                self.holding = Some(Holding::new(&item, registry));
                self.amount = amount;
            }
            (None, None) if self.is_empty() => {}
            _ => {
                warn!(
                    pos = %self.pos,
                    amount = self.amount,
                    "durable storage state unusable, keeping cached contents"
                );
                self.persist(store);
            }
        }

        self.restore_buffer(store, INPUT_SLOT, INPUT_BUFFER);
        self.restore_buffer(store, OUTPUT_SLOT, OUTPUT_BUFFER);
        self.refresh_menu();
    }

    fn restore_buffer(&mut self, store: &mut dyn BlockInfoStore, slot: usize, key: &str) {
        if self.menu.get(slot).is_some() {
            return;
        }
        let Some(raw) = store.get_string(self.pos, key) else {
            return;
        };
        match serde_json::from_str::<ItemStack>(&raw) {
            Ok(stack) => {
                self.menu.set(slot, Some(stack));
                store.remove_string(self.pos, key);
            }
            Err(err) => warn!(pos = %self.pos, key, %err, "discarding unreadable buffer record"),
        }
    }

    /// Move buffered items into the store ahead of an unload.
    pub fn save_buffers(&mut self, store: &mut dyn BlockInfoStore) {
        for (slot, key) in [(INPUT_SLOT, INPUT_BUFFER), (OUTPUT_SLOT, OUTPUT_BUFFER)] {
            let Some(stack) = self.menu.get(slot) else {
                store.remove_string(self.pos, key);
                continue;
            };
            match serde_json::to_string(stack) {
                Ok(json) => {
                    store.set_string(self.pos, key, json);
                    self.menu.take(slot);
                }
                Err(err) => warn!(pos = %self.pos, key, %err, "failed to save buffer"),
            }
        }
    }

    /// Tear the cache down, appending the unit item to `drops`.
    ///
    /// A holding cache produces a single item carrying the whole contents.
    /// Buffers are not touched; the caller drops them separately.
    pub fn destroy(self, base_item: &ItemStack, drops: &mut Vec<ItemStack>) {
        let mut unit = base_item.with_count(1);
        let Some(holding) = self.holding else {
            drops.push(unit);
            return;
        };

        match codec::encode(
            unit.meta_mut(),
            &holding.template,
            &holding.label,
            self.amount,
            Some(&self.instance_id),
        ) {
            Ok(()) => drops.push(unit),
            Err(err) => {
                warn!(pos = %self.pos, %err, "storage payload not encodable, dropping contents loose");
                drops.push(base_item.with_count(1));
                drops.extend(ItemStack::chunked(
                    &holding.template,
                    u64::from(self.amount),
                ));
            }
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let count = |slot| self.menu.get(slot).map_or(0, |stack: &ItemStack| stack.count);
        CacheSnapshot {
            pos: self.pos,
            instance_id: self.instance_id.clone(),
            stored: self.label().map(str::to_string),
            amount: self.amount,
            max: self.max,
            input: count(INPUT_SLOT),
            output: count(OUTPUT_SLOT),
        }
    }

    fn persist(&self, store: &mut dyn BlockInfoStore) {
        store.set_string(self.pos, STORED_AMOUNT, self.amount.to_string());
        match self.stored_item().map(serde_json::to_string) {
            Some(Ok(json)) => store.set_string(self.pos, STORED_ITEM, json),
            Some(Err(err)) => warn!(pos = %self.pos, %err, "failed to mirror stored item"),
            None => store.remove_string(self.pos, STORED_ITEM),
        }
    }

    fn refresh_menu(&mut self) {
        self.menu
            .set(STATUS_SLOT, Some(menu::status_item(self.amount, self.max)));
        let display = match &self.holding {
            Some(holding) => menu::display_item(&holding.template, &holding.label, self.amount),
            None => menu::empty_display_item(),
        };
        self.menu.set(DISPLAY_SLOT, Some(display));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_info::MemoryBlockInfo;
    use crate::catalog::ItemCatalog;
    use bulkstore_core::NamespacedKey;

    struct Fixture {
        catalog: ItemCatalog,
        filter: AdmissionFilter,
        store: MemoryBlockInfo,
    }

    impl Fixture {
        fn new() -> Self {
            let mut catalog = ItemCatalog::new();
            catalog.register(
                "BASIC_STORAGE",
                NamespacedKey::interop("barrel"),
                "Basic Storage Unit",
                vec![],
            );
            Self {
                catalog,
                filter: AdmissionFilter::new(),
                store: MemoryBlockInfo::new(),
            }
        }
    }

    fn item(name: &str, count: u32) -> ItemStack {
        ItemStack::new(NamespacedKey::parse(name).unwrap(), count)
    }

    fn pos() -> BlockPos {
        BlockPos::new(0, 64, 0)
    }

    fn tick(cache: &mut StorageCache, fx: &mut Fixture) {
        let Fixture {
            catalog,
            filter,
            store,
        } = fx;
        cache.tick(store, Lookup::new(catalog, filter));
    }

    fn assert_invariants(cache: &StorageCache) {
        assert_eq!(cache.amount() == 0, cache.is_empty());
        assert!(cache.amount() <= cache.max());
    }

    #[test]
    fn fresh_input_then_tick_drains_one_stack() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 576, "id");
        cache.menu_mut().set(INPUT_SLOT, Some(item("cobblestone", 64)));

        tick(&mut cache, &mut fx);

        assert!(cache.is_empty());
        assert_eq!(cache.amount(), 0);
        assert_eq!(cache.menu().get(OUTPUT_SLOT).unwrap().count, 64);
        assert!(cache.menu().get(INPUT_SLOT).is_none());
        assert_eq!(fx.store.get_string(pos(), STORED_AMOUNT).as_deref(), Some("0"));
    }

    #[test]
    fn input_leaves_excess_in_buffer() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 100, "id");
        cache.menu_mut().set(INPUT_SLOT, Some(item("stone", 64)));
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        assert_eq!(cache.input(store, Lookup::new(catalog, filter)), 64);

        cache.menu_mut().set(INPUT_SLOT, Some(item("stone", 64)));
        assert_eq!(cache.input(store, Lookup::new(catalog, filter)), 36);
        assert_eq!(cache.amount(), 100);
        assert_eq!(cache.menu().get(INPUT_SLOT).unwrap().count, 28);
        assert_invariants(&cache);
    }

    #[test]
    fn input_ignores_other_types_and_containers() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "id");
        let unit = fx.catalog.create("BASIC_STORAGE", 1).unwrap();
        cache.menu_mut().set(INPUT_SLOT, Some(unit));
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        assert_eq!(cache.input(store, Lookup::new(catalog, filter)), 0);
        assert!(cache.is_empty());

        cache.menu_mut().set(INPUT_SLOT, Some(item("dirt", 10)));
        assert_eq!(cache.input(store, Lookup::new(catalog, filter)), 10);
        cache.menu_mut().set(INPUT_SLOT, Some(item("sand", 10)));
        assert_eq!(cache.input(store, Lookup::new(catalog, filter)), 0);
        assert_eq!(cache.menu().get(INPUT_SLOT).unwrap().count, 10);
        assert!(cache.matches(&item("dirt", 1), catalog));
        assert!(!cache.matches(&item("sand", 1), catalog));
    }

    #[test]
    fn load_rejects_mismatched_type() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "id");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        let lookup = Lookup::new(catalog, filter);
        assert_eq!(cache.load(&item("iron_ingot", 1), 300, store, lookup), Ok(0));
        let err = cache
            .load(&item("gold_ingot", 1), 5, store, lookup)
            .unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
        assert_eq!(cache.amount(), 300);
        assert_eq!(cache.label(), Some("Iron Ingot"));
    }

    #[test]
    fn load_reports_overflow_and_zero_stays_empty() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 500, "id");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        let lookup = Lookup::new(catalog, filter);
        assert_eq!(cache.load(&item("stone", 1), 0, store, lookup), Ok(0));
        assert!(cache.is_empty());
        assert_eq!(cache.load(&item("stone", 1), 800, store, lookup), Ok(300));
        assert_eq!(cache.amount(), 500);
    }

    #[test]
    fn load_of_same_type_adds_to_count() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 500, "id");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        let lookup = Lookup::new(catalog, filter);
        assert_eq!(cache.load(&item("stone", 1), 100, store, lookup), Ok(0));
        assert_eq!(cache.load(&item("stone", 1), 50, store, lookup), Ok(0));
        assert_eq!(cache.amount(), 150);
        assert_eq!(store.get_string(pos(), STORED_AMOUNT).as_deref(), Some("150"));

        let overflow = cache.load(&item("stone", 1), 400, store, lookup).unwrap();
        assert_eq!(cache.amount(), 500);
        assert_eq!(cache.amount() + overflow, 550);
        assert_eq!(cache.load(&item("stone", 1), 7, store, lookup), Ok(7));
        assert_eq!(cache.amount(), 500);
        assert_invariants(&cache);
    }

    #[test]
    fn tick_without_work_changes_nothing() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 500, "id");
        let before = fx.store.clone();
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        for _ in 0..3 {
            cache.tick(store, Lookup::new(catalog, filter));
        }
        assert!(cache.is_empty());
        assert_eq!(cache.amount(), 0);
        assert!(cache.menu().get(INPUT_SLOT).is_none());
        assert!(cache.menu().get(OUTPUT_SLOT).is_none());
        assert_eq!(*store, before);
    }

    #[test]
    fn set_amount_guards_invariants() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 500, "id");
        assert!(matches!(
            cache.set_amount(5, &mut fx.store),
            Err(StorageError::NotLoaded { .. })
        ));
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        cache
            .load(&item("stone", 1), 10, store, Lookup::new(catalog, filter))
            .unwrap();
        assert!(cache.set_amount(501, store).is_err());
        cache.set_amount(0, store).unwrap();
        assert!(cache.is_empty());
        assert_eq!(store.get_string(pos(), STORED_ITEM), None);
    }

    #[test]
    fn destroy_carries_whole_contents() {
        let mut fx = Fixture::new();
        let base = fx.catalog.create("BASIC_STORAGE", 1).unwrap();
        let mut cache = StorageCache::new(pos(), 6400, "unit-1");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        cache
            .load(&item("cobblestone", 1), 4200, store, Lookup::new(catalog, filter))
            .unwrap();

        let mut drops = Vec::new();
        cache.destroy(&base, &mut drops);
        assert_eq!(drops.len(), 1);
        assert_eq!(codec::decode(&drops[0]), Some((item("cobblestone", 1), 4200)));
        assert_eq!(codec::storage_id(&drops[0]).as_deref(), Some("unit-1"));

        let mut drops = Vec::new();
        StorageCache::new(pos(), 6400, "unit-2").destroy(&base, &mut drops);
        assert_eq!(drops.len(), 1);
        assert_eq!(codec::decode(&drops[0]), None);
    }

    #[test]
    fn quick_actions_move_items() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "id");
        let mut inventory = PlayerInventory::new();
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        let lookup = Lookup::new(catalog, filter);
        cache.load(&item("stone", 1), 200, store, lookup).unwrap();

        assert_eq!(cache.interact(ClickAction::Left, &mut inventory, store, lookup), 1);
        assert_eq!(cache.interact(ClickAction::Right, &mut inventory, store, lookup), 64);
        assert_eq!(inventory.count_similar(&item("stone", 1)), 65);

        inventory.add_item(item("dirt", 5));
        assert_eq!(cache.interact(ClickAction::ShiftLeft, &mut inventory, store, lookup), 65);
        assert_eq!(cache.amount(), 200);
        assert_eq!(inventory.count_similar(&item("dirt", 1)), 5);

        assert_eq!(cache.interact(ClickAction::ShiftRight, &mut inventory, store, lookup), 200);
        assert!(cache.is_empty());
        assert_eq!(cache.interact(ClickAction::Left, &mut inventory, store, lookup), 0);
    }

    #[test]
    fn reload_adopts_external_id_without_losing_items() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "old-id");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        cache
            .load(&item("stone", 1), 640, store, Lookup::new(catalog, filter))
            .unwrap();
        store.set_string(pos(), STORAGE_ID, "edited-id".into());

        cache.reload_data(store, catalog);
        assert_eq!(cache.instance_id(), "edited-id");
        assert_eq!(cache.amount(), 640);
        assert!(cache.matches(&item("stone", 1), catalog));
    }

    #[test]
    fn reload_keeps_memory_when_mirror_is_broken() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "id");
        let Fixture {
            catalog,
            filter,
            store,
        } = &mut fx;
        cache
            .load(&item("stone", 1), 640, store, Lookup::new(catalog, filter))
            .unwrap();
        store.set_string(pos(), STORED_AMOUNT, "lots".into());

        cache.reload_data(store, catalog);
        assert_eq!(cache.amount(), 640);
        assert_eq!(store.get_string(pos(), STORED_AMOUNT).as_deref(), Some("640"));

        store.set_string(pos(), STORED_AMOUNT, "99".into());
        cache.reload_data(store, catalog);
        assert_eq!(cache.amount(), 99);
    }

    #[test]
    fn buffers_survive_unload_cycle() {
        let mut fx = Fixture::new();
        let mut cache = StorageCache::new(pos(), 1000, "id");
        cache.menu_mut().set(INPUT_SLOT, Some(item("stone", 7)));
        cache.save_buffers(&mut fx.store);
        assert!(cache.menu().get(INPUT_SLOT).is_none());

        let mut fresh = StorageCache::new(pos(), 1000, "id");
        fresh.reload_data(&mut fx.store, &fx.catalog);
        assert_eq!(fresh.menu().get(INPUT_SLOT).unwrap().count, 7);
        assert_eq!(fx.store.get_string(pos(), INPUT_BUFFER), None);
    }

    #[test]
    fn fingerprint_tracks_metadata() {
        let catalog = ItemCatalog::new();
        let plain = item("diamond_sword", 1);
        let mut named = plain.clone();
        named.meta_mut().display_name = Some("Excalibur".into());
        assert_eq!(StoredType::of(&plain, &catalog), StoredType::of(&item("diamond_sword", 9), &catalog));
        assert_ne!(StoredType::of(&plain, &catalog), StoredType::of(&named, &catalog));
        assert!(StoredType::of(&plain, &catalog).to_string().starts_with('#'));
    }
}
