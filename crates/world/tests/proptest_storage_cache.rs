//! Property-based tests for the storage payload codec and cache accounting
//!
//! Validates storage invariants:
//! - Encoded payloads decode to the same item and quantity
//! - Quantity never exceeds capacity after any input/tick sequence
//! - A cache is empty exactly when its quantity is zero
//! - Items are conserved between buffers and the counted total

use bulkstore_core::{BlockPos, ItemMeta, ItemStack, NamespacedKey};
use bulkstore_world::{
    codec, AdmissionFilter, ItemCatalog, Lookup, MemoryBlockInfo, StorageCache, INPUT_SLOT,
    OUTPUT_SLOT,
};
use proptest::prelude::*;

fn material() -> impl Strategy<Value = NamespacedKey> {
    prop_oneof![
        Just("cobblestone"),
        Just("iron_ingot"),
        Just("oak_log"),
        Just("redstone"),
    ]
    .prop_map(NamespacedKey::interop)
}

#[derive(Debug, Clone)]
enum Step {
    Insert(u32),
    Tick,
    TakeOutput,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u32..=64).prop_map(Step::Insert),
        Just(Step::Tick),
        Just(Step::TakeOutput),
    ]
}

proptest! {
    /// Property: decode(encode(t, q)) == (t, q)
    #[test]
    fn payload_roundtrip(
        material in material(),
        amount in 0u32..=1_600_000_000,
        name in proptest::option::of("[A-Za-z ]{1,16}"),
        storage_id in proptest::option::of("[a-f0-9-]{8,36}"),
    ) {
        let stored = ItemStack::with_meta(
            material,
            1,
            ItemMeta { display_name: name, ..ItemMeta::default() },
        );
        let mut carrier = ItemStack::new(NamespacedKey::interop("barrel"), 1);
        codec::encode(carrier.meta_mut(), &stored, "Label", amount, storage_id.as_deref())
            .expect("amount fits the metadata integer");

        prop_assert_eq!(codec::decode(&carrier), Some((stored, amount)));
        prop_assert_eq!(codec::storage_id(&carrier), storage_id.filter(|id| !id.is_empty()));
    }

    /// Property: capacity bound, empty/type equivalence and conservation
    #[test]
    fn cache_accounting_holds(
        max in 1u32..=600,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let catalog = ItemCatalog::new();
        let filter = AdmissionFilter::new();
        let lookup = Lookup::new(&catalog, &filter);
        let mut store = MemoryBlockInfo::new();
        let mut cache = StorageCache::new(BlockPos::new(0, 64, 0), max, "prop");
        let stone = ItemStack::new(NamespacedKey::interop("stone"), 1);

        let mut inserted = 0u64;
        let mut taken = 0u64;
        for step in steps {
            match step {
                Step::Insert(count) => {
                    let rest = cache.menu_mut().push_into(INPUT_SLOT, stone.with_count(count));
                    inserted += u64::from(count - rest.map_or(0, |r| r.count));
                }
                Step::Tick => cache.tick(&mut store, lookup),
                Step::TakeOutput => {
                    taken += cache.menu_mut().take(OUTPUT_SLOT).map_or(0, |s| u64::from(s.count));
                }
            }

            prop_assert!(cache.amount() <= cache.max());
            prop_assert_eq!(cache.amount() == 0, cache.is_empty());
            prop_assert_eq!(cache.amount() == 0, cache.stored_item().is_none());

            let buffered: u64 = [INPUT_SLOT, OUTPUT_SLOT]
                .iter()
                .filter_map(|&slot| cache.menu().get(slot))
                .map(|s| u64::from(s.count))
                .sum();
            prop_assert_eq!(inserted, taken + buffered + u64::from(cache.amount()));
        }
    }
}
