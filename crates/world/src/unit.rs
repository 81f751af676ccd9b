//! Storage unit controller.
//!
//! One controller exists per tier. It exclusively owns the caches of every
//! active unit of that tier and wires placement, breakage, ticking and slot
//! routing to them. Nothing else holds a reference into the cache map.

use crate::admission::AdmissionFilter;
use crate::block_info::{BlockInfoStore, STORAGE_ID};
use crate::cache::{Lookup, StorageCache};
use crate::catalog::ItemRegistry;
use crate::codec;
use crate::error::StorageError;
use crate::inventory::PlayerInventory;
use crate::menu::{ClickAction, INPUT_SLOT, OUTPUT_SLOT};
use crate::tier::StorageTier;
use bulkstore_core::{BlockPos, ItemStack};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Controller for all placed units of one tier.
pub struct StorageUnit {
    tier: StorageTier,
    base_item: ItemStack,
    filter: AdmissionFilter,
    caches: BTreeMap<BlockPos, StorageCache>,
    ids: StdRng,
}

impl StorageUnit {
    /// `base_item` is the plain unit item dropped when a unit is broken.
    pub fn new(tier: StorageTier, base_item: ItemStack, filter: AdmissionFilter) -> Self {
        Self {
            tier,
            base_item,
            filter,
            caches: BTreeMap::new(),
            ids: StdRng::from_entropy(),
        }
    }

    /// Generate instance ids from a fixed seed (for reproducible runs).
    pub fn with_id_seed(mut self, seed: u64) -> Self {
        self.ids = StdRng::seed_from_u64(seed);
        self
    }

    pub fn tier(&self) -> &StorageTier {
        &self.tier
    }

    pub fn base_item(&self) -> &ItemStack {
        &self.base_item
    }

    pub fn filter(&self) -> &AdmissionFilter {
        &self.filter
    }

    /// Make the unit at `pos` active, creating its cache on first use.
    ///
    /// A location without a recorded instance id gets a fresh one. Contents
    /// mirrored in the store (from an earlier session or unload) are restored.
    pub fn activate(
        &mut self,
        pos: BlockPos,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> &mut StorageCache {
        open_cache(
            &mut self.caches,
            &mut self.ids,
            &self.tier,
            pos,
            store,
            registry,
        )
    }

    /// Handle a unit item being placed at `pos`.
    ///
    /// The cache is created first and any carried contents are restored into
    /// it right away. The carried instance id is only adopted by a location
    /// with no unit recorded. Returns items that could not be restored (over
    /// capacity, or conflicting with contents already recorded at the
    /// location).
    pub fn place(
        &mut self,
        pos: BlockPos,
        placed: &ItemStack,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> Vec<ItemStack> {
        let occupied =
            self.caches.contains_key(&pos) || StorageUnit::storage_id(pos, store).is_some();
        match codec::storage_id(placed) {
            Some(_) if occupied => {
                warn!(%pos, "placement over an existing storage unit, keeping its id");
            }
            Some(id) => store.set_string(pos, STORAGE_ID, id),
            None if occupied => warn!(%pos, "placement over an existing storage unit"),
            None => {}
        }
        let lookup = Lookup::new(registry, &self.filter);
        let cache = open_cache(
            &mut self.caches,
            &mut self.ids,
            &self.tier,
            pos,
            store,
            registry,
        );

        let Some((stored, amount)) = codec::decode(placed) else {
            info!(%pos, tier = self.tier.id(), "placed empty storage unit");
            return Vec::new();
        };
        let overflow = match cache.load(&stored, amount, store, lookup) {
            Ok(overflow) => overflow,
            Err(err) => {
                warn!(%pos, %err, "carried contents not restorable, ejecting them");
                amount
            }
        };
        info!(
            %pos,
            tier = self.tier.id(),
            amount = amount - overflow,
            overflow,
            "placed storage unit with contents"
        );
        ItemStack::chunked(&stored, u64::from(overflow))
    }

    /// Handle breakage at `pos`: tear the cache down and return every drop.
    ///
    /// The first drop is the unit item carrying the counted contents; buffer
    /// contents follow. A location with no recorded unit yields nothing.
    pub fn break_block(
        &mut self,
        pos: BlockPos,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> Vec<ItemStack> {
        if !self.caches.contains_key(&pos) {
            if StorageUnit::storage_id(pos, store).is_none() {
                debug!(%pos, "no storage unit recorded, nothing to break");
                return Vec::new();
            }
            self.activate(pos, store, registry);
        }
        let Some(mut cache) = self.caches.remove(&pos) else {
            return Vec::new();
        };

        let buffers = cache.menu_mut().drop_items(&[INPUT_SLOT, OUTPUT_SLOT]);
        let amount = cache.amount();
        let mut drops = Vec::with_capacity(buffers.len() + 1);
        cache.destroy(&self.base_item, &mut drops);
        drops.extend(buffers);
        store.clear_location(pos);
        info!(%pos, tier = self.tier.id(), amount, drops = drops.len(), "storage unit broken");
        drops
    }

    /// Deactivate the unit at `pos` without producing drops.
    ///
    /// Buffered items are parked in the store until the next activation.
    pub fn unload(&mut self, pos: BlockPos, store: &mut dyn BlockInfoStore) -> bool {
        match self.caches.remove(&pos) {
            Some(mut cache) => {
                cache.save_buffers(store);
                debug!(%pos, "storage unit unloaded");
                true
            }
            None => false,
        }
    }

    /// Tick one unit. Returns `false` when no unit is active there.
    pub fn tick(
        &mut self,
        pos: BlockPos,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> bool {
        let lookup = Lookup::new(registry, &self.filter);
        match self.caches.get_mut(&pos) {
            Some(cache) => {
                cache.tick(store, lookup);
                true
            }
            None => false,
        }
    }

    /// Tick every active unit in location order.
    pub fn tick_all(&mut self, store: &mut dyn BlockInfoStore, registry: &dyn ItemRegistry) {
        let lookup = Lookup::new(registry, &self.filter);
        for cache in self.caches.values_mut() {
            cache.tick(store, lookup);
        }
    }

    /// Slots `item` may be moved into at `pos`. Empty when it is refused.
    pub fn input_slots(
        &self,
        pos: BlockPos,
        item: &ItemStack,
        registry: &dyn ItemRegistry,
    ) -> &'static [usize] {
        let Some(cache) = self.caches.get(&pos) else {
            return &[];
        };
        if !self.filter.is_admissible(item, registry) {
            return &[];
        }
        if !cache.is_empty() && !cache.matches(item, registry) {
            return &[];
        }
        &[INPUT_SLOT]
    }

    /// Move `stack` into the input buffer at `pos`, returning what stayed out.
    pub fn insert(
        &mut self,
        pos: BlockPos,
        stack: ItemStack,
        registry: &dyn ItemRegistry,
    ) -> Option<ItemStack> {
        if self.input_slots(pos, &stack, registry).is_empty() {
            return Some(stack);
        }
        match self.caches.get_mut(&pos) {
            Some(cache) => cache.menu_mut().push_into(INPUT_SLOT, stack),
            None => Some(stack),
        }
    }

    /// Run a quick action on the unit at `pos`.
    pub fn interact(
        &mut self,
        pos: BlockPos,
        action: ClickAction,
        inventory: &mut PlayerInventory,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> Result<u32, StorageError> {
        let lookup = Lookup::new(registry, &self.filter);
        let cache = self
            .caches
            .get_mut(&pos)
            .ok_or(StorageError::NoUnit(pos))?;
        Ok(cache.interact(action, inventory, store, lookup))
    }

    pub fn get_cache(&self, pos: BlockPos) -> Option<&StorageCache> {
        self.caches.get(&pos)
    }

    /// Resynchronise the cache at `pos` with the durable store.
    pub fn reload_cache(
        &mut self,
        pos: BlockPos,
        store: &mut dyn BlockInfoStore,
        registry: &dyn ItemRegistry,
    ) -> Result<(), StorageError> {
        let cache = self
            .caches
            .get_mut(&pos)
            .ok_or(StorageError::NoUnit(pos))?;
        cache.reload_data(store, registry);
        Ok(())
    }

    /// Instance id recorded for `pos`, active or not.
    pub fn storage_id(pos: BlockPos, store: &dyn BlockInfoStore) -> Option<String> {
        store.get_string(pos, STORAGE_ID).filter(|id| !id.is_empty())
    }

    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.caches.keys().copied()
    }

    pub fn caches(&self) -> impl Iterator<Item = &StorageCache> {
        self.caches.values()
    }

    /// Number of active units.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

fn open_cache<'a>(
    caches: &'a mut BTreeMap<BlockPos, StorageCache>,
    ids: &mut StdRng,
    tier: &StorageTier,
    pos: BlockPos,
    store: &mut dyn BlockInfoStore,
    registry: &dyn ItemRegistry,
) -> &'a mut StorageCache {
    match caches.entry(pos) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            let id = match StorageUnit::storage_id(pos, store) {
                Some(id) => id,
                None => {
                    let id = next_instance_id(ids);
                    store.set_string(pos, STORAGE_ID, id.clone());
                    id
                }
            };
            debug!(%pos, tier = tier.id(), storage_id = %id, "storage unit activated");
            let cache = entry.insert(StorageCache::new(pos, tier.max(), id));
            cache.reload_data(store, registry);
            cache
        }
    }
}

fn next_instance_id(rng: &mut StdRng) -> String {
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}
