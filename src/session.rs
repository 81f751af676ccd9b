//! Headless storage session: applies scripted commands to the storage
//! controllers on a fixed tick schedule.

use crate::command_script::CommandScriptPlayer;
use crate::commands::{parse_command, CommandError, StorageCommand, HELP_TEXT};
use crate::config::StorageConfig;
use bulkstore_core::{BlockPos, ItemStack, SimTick};
use bulkstore_world::{
    codec, item_name, BlockInfoStore, CacheSnapshot, ItemCatalog, ItemRegistry, MemoryBlockInfo,
    PlayerInventory, StorageUnit, INVENTORY_SIZE, STORAGE_ID,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Block info key recording which tier a location holds.
pub const UNIT_TIER: &str = "unit_tier";

#[derive(Debug, Clone, Serialize)]
pub struct DropSummary {
    pub index: usize,
    pub material: String,
    pub count: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub tick: u64,
    pub units: Vec<CacheSnapshot>,
    pub drops: Vec<DropSummary>,
    pub inventory: BTreeMap<String, u64>,
}

pub struct StorageSession {
    catalog: ItemCatalog,
    units: BTreeMap<String, StorageUnit>,
    placed: BTreeMap<BlockPos, String>,
    store: MemoryBlockInfo,
    inventory: PlayerInventory,
    drops: Vec<Option<ItemStack>>,
    tick: SimTick,
    tick_interval: u64,
}

impl StorageSession {
    /// Build controllers for every configured tier and reactivate the units
    /// recorded in `store`.
    pub fn new(config: &StorageConfig, store: MemoryBlockInfo) -> Self {
        let tiers = config.build_tiers();
        let filter = config.admission_filter(&tiers);
        let mut catalog = ItemCatalog::new();
        let mut units = BTreeMap::new();
        for (index, tier) in tiers.into_iter().enumerate() {
            let base = tier.register(&mut catalog);
            let mut unit = StorageUnit::new(tier, base, filter.clone());
            if let Some(seed) = config.id_seed {
                unit = unit.with_id_seed(seed.wrapping_add(index as u64));
            }
            units.insert(unit.tier().id().to_string(), unit);
        }

        let placed: BTreeMap<BlockPos, String> = store
            .locations()
            .filter_map(|pos| {
                store
                    .get_string(pos, UNIT_TIER)
                    .filter(|tier| units.contains_key(tier))
                    .map(|tier| (pos, tier))
            })
            .collect();

        let mut session = Self {
            catalog,
            units,
            placed,
            store,
            inventory: PlayerInventory::new(),
            drops: Vec::new(),
            tick: SimTick::ZERO,
            tick_interval: config.tick_interval,
        };
        for (pos, tier) in &session.placed {
            if let Some(unit) = session.units.get_mut(tier) {
                unit.activate(*pos, &mut session.store, &session.catalog);
            }
        }
        if !session.placed.is_empty() {
            info!(units = session.placed.len(), "restored storage units");
        }
        session
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    pub fn store(&self) -> &MemoryBlockInfo {
        &self.store
    }

    /// Advance one simulation tick, running storage ticks on schedule.
    pub fn step(&mut self) {
        self.tick = self.tick.advance(1);
        if self.tick.is_multiple_of(self.tick_interval) {
            for unit in self.units.values_mut() {
                unit.tick_all(&mut self.store, &self.catalog);
            }
        }
    }

    /// Play a command script to completion (or until `max_ticks`).
    pub fn run(&mut self, script: &mut CommandScriptPlayer, max_ticks: Option<u64>) {
        loop {
            for line in script.drain_ready_commands(self.tick) {
                match parse_command(&line).and_then(|command| self.apply(command)) {
                    Ok(message) => info!(tick = self.tick.0, command = %line, "{message}"),
                    Err(err) => warn!(tick = self.tick.0, command = %line, %err, "command failed"),
                }
            }
            if script.is_finished() {
                break;
            }
            if max_ticks.is_some_and(|max| self.tick.0 >= max) {
                warn!(tick = self.tick.0, "stopping before the command script finished");
                break;
            }
            self.step();
        }
    }

    pub fn apply(&mut self, command: StorageCommand) -> Result<String, CommandError> {
        match command {
            StorageCommand::Help => Ok(HELP_TEXT.to_string()),
            StorageCommand::Place { tier, pos } => {
                let unit = self
                    .units
                    .get(&tier)
                    .ok_or_else(|| CommandError::new(format!("Unknown storage tier {tier}")))?;
                let item = unit.base_item().clone();
                self.place_item(tier, pos, &item)
            }
            StorageCommand::Replace { drop, pos } => {
                let item = self
                    .drops
                    .get(drop)
                    .and_then(Option::as_ref)
                    .ok_or_else(|| CommandError::new(format!("No drop at index {drop}")))?
                    .with_count(1);
                let tier = self
                    .catalog
                    .resolve_id(&item)
                    .filter(|id| self.units.contains_key(id))
                    .ok_or_else(|| CommandError::new(format!("Drop {drop} is not a storage unit")))?;
                let message = self.place_item(tier, pos, &item)?;
                self.consume_drop(drop);
                Ok(message)
            }
            StorageCommand::Insert { pos, item, count } => {
                let unit = unit_at(&mut self.units, &self.placed, pos)?;
                unit.activate(pos, &mut self.store, &self.catalog);
                let mut inserted = 0;
                for stack in ItemStack::chunked(&ItemStack::new(item, 1), u64::from(count)) {
                    let offered = stack.count;
                    let rest = unit.insert(pos, stack, &self.catalog);
                    inserted += offered - rest.map_or(0, |rest| rest.count);
                }
                Ok(format!("Inserted {inserted} of {count} at {pos}"))
            }
            StorageCommand::Give { item, count } => {
                let template = ItemStack::new(item, 1);
                for stack in ItemStack::chunked(&template, u64::from(count)) {
                    if let Some(rest) = self.inventory.add_item(stack) {
                        self.drops.push(Some(rest));
                    }
                }
                Ok(format!("Gave {count} {}", template.material))
            }
            StorageCommand::Click { pos, action } => {
                let unit = unit_at(&mut self.units, &self.placed, pos)?;
                unit.activate(pos, &mut self.store, &self.catalog);
                let moved = unit
                    .interact(pos, action, &mut self.inventory, &mut self.store, &self.catalog)
                    .map_err(|err| CommandError::new(err.to_string()))?;
                Ok(format!("{action:?} moved {moved} items"))
            }
            StorageCommand::Break { pos } => {
                let unit = unit_at(&mut self.units, &self.placed, pos)?;
                let drops = unit.break_block(pos, &mut self.store, &self.catalog);
                self.placed.remove(&pos);
                let first = self.drops.len();
                let count = drops.len();
                self.drops.extend(drops.into_iter().map(Some));
                Ok(format!("Broke unit at {pos}, drops {first}..{}", first + count))
            }
            StorageCommand::Unload { pos } => {
                let unit = unit_at(&mut self.units, &self.placed, pos)?;
                if unit.unload(pos, &mut self.store) {
                    Ok(format!("Unloaded unit at {pos}"))
                } else {
                    Ok(format!("Unit at {pos} was not loaded"))
                }
            }
            StorageCommand::Reload { pos } => {
                let unit = unit_at(&mut self.units, &self.placed, pos)?;
                unit.activate(pos, &mut self.store, &self.catalog);
                unit.reload_cache(pos, &mut self.store, &self.catalog)
                    .map_err(|err| CommandError::new(err.to_string()))?;
                Ok(format!("Reloaded unit at {pos}"))
            }
            StorageCommand::SetId { pos, id } => {
                if !self.placed.contains_key(&pos) {
                    return Err(CommandError::new(format!("No storage unit at {pos}")));
                }
                self.store.set_string(pos, STORAGE_ID, id.clone());
                Ok(format!("Recorded storage id {id} at {pos}"))
            }
            StorageCommand::Status { pos } => {
                let snapshots: Vec<CacheSnapshot> = match pos {
                    Some(pos) => {
                        let unit = unit_at(&mut self.units, &self.placed, pos)?;
                        unit.activate(pos, &mut self.store, &self.catalog);
                        unit.get_cache(pos).map(|cache| cache.snapshot()).into_iter().collect()
                    }
                    None => self.snapshots(),
                };
                serde_json::to_string(&snapshots).map_err(|err| CommandError::new(err.to_string()))
            }
        }
    }

    fn place_item(
        &mut self,
        tier: String,
        pos: BlockPos,
        item: &ItemStack,
    ) -> Result<String, CommandError> {
        if self.placed.contains_key(&pos) {
            return Err(CommandError::new(format!("{pos} is already occupied")));
        }
        let unit = self
            .units
            .get_mut(&tier)
            .ok_or_else(|| CommandError::new(format!("Unknown storage tier {tier}")))?;
        let overflow = unit.place(pos, item, &mut self.store, &self.catalog);
        let amount = unit.get_cache(pos).map_or(0, |cache| cache.amount());
        self.store.set_string(pos, UNIT_TIER, tier.clone());
        self.placed.insert(pos, tier.clone());
        let ejected: u32 = overflow.iter().map(|stack| stack.count).sum();
        self.drops.extend(overflow.into_iter().map(Some));
        Ok(format!("Placed {tier} at {pos} holding {amount}, ejected {ejected}"))
    }

    fn consume_drop(&mut self, index: usize) {
        if let Some(slot) = self.drops.get_mut(index) {
            if let Some(stack) = slot.as_mut() {
                stack.remove(1);
                if stack.count == 0 {
                    *slot = None;
                }
            }
        }
    }

    fn snapshots(&self) -> Vec<CacheSnapshot> {
        self.units
            .values()
            .flat_map(|unit| unit.caches().map(|cache| cache.snapshot()))
            .collect()
    }

    pub fn report(&self) -> SessionReport {
        let drops = self
            .drops
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|stack| (index, stack)))
            .map(|(index, stack)| {
                let payload = codec::decode(stack);
                DropSummary {
                    index,
                    material: stack.material.to_string(),
                    count: stack.count,
                    name: item_name(stack, &self.catalog),
                    stored: payload
                        .as_ref()
                        .map(|(stored, _)| item_name(stored, &self.catalog)),
                    amount: payload.as_ref().map(|(_, amount)| *amount),
                    storage_id: codec::storage_id(stack),
                }
            })
            .collect();

        let mut inventory = BTreeMap::new();
        for slot in 0..INVENTORY_SIZE {
            if let Some(stack) = self.inventory.get(slot) {
                *inventory.entry(stack.material.to_string()).or_insert(0) += u64::from(stack.count);
            }
        }

        SessionReport {
            tick: self.tick.0,
            units: self.snapshots(),
            drops,
            inventory,
        }
    }
}

fn unit_at<'a>(
    units: &'a mut BTreeMap<String, StorageUnit>,
    placed: &BTreeMap<BlockPos, String>,
    pos: BlockPos,
) -> Result<&'a mut StorageUnit, CommandError> {
    placed
        .get(&pos)
        .and_then(|tier| units.get_mut(tier))
        .ok_or_else(|| CommandError::new(format!("No storage unit at {pos}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> StorageSession {
        let config = StorageConfig {
            id_seed: Some(1),
            ..StorageConfig::default()
        };
        StorageSession::new(&config, MemoryBlockInfo::new())
    }

    fn run(session: &mut StorageSession, line: &str) -> String {
        let command = parse_command(line).expect("valid command");
        session.apply(command).expect("command succeeds")
    }

    #[test]
    fn deposit_tick_and_withdraw() {
        let mut session = session();
        run(&mut session, "/place basic_storage 0 64 0");
        run(&mut session, "/insert 0 64 0 cobblestone 64");
        session.step();

        let report = session.report();
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].amount, 0);
        assert_eq!(report.units[0].output, 64);

        run(&mut session, "/insert 0 64 0 cobblestone 64");
        session.step();
        let report = session.report();
        assert_eq!(report.units[0].amount, 64, "output buffer is full");

        let message = run(&mut session, "/click 0 64 0 right");
        assert!(message.contains("moved 64"));
        let report = session.report();
        assert_eq!(report.inventory.get("minecraft:cobblestone"), Some(&64));
        assert_eq!(report.units[0].amount, 0);
    }

    #[test]
    fn break_and_replace_through_drops() {
        let mut session = session();
        run(&mut session, "/place advanced_storage 1 64 1");
        run(&mut session, "/insert 1 64 1 iron_ingot 64");
        session.step();
        run(&mut session, "/insert 1 64 1 iron_ingot 64");
        session.step();
        run(&mut session, "/give iron_ingot 100");
        run(&mut session, "/click 1 64 1 shift_left");
        assert_eq!(session.report().units[0].amount, 164);
        assert!(session.report().inventory.is_empty());

        let message = run(&mut session, "/break 1 64 1");
        assert!(message.contains("drops 0..2"));
        let report = session.report();
        assert_eq!(report.drops[0].amount, Some(164));
        assert_eq!(report.drops[1].count, 64);
        assert!(report.units.is_empty());

        run(&mut session, "/replace 0 5 70 5");
        let report = session.report();
        assert_eq!(report.units[0].amount, 164);
        assert_eq!(report.drops.len(), 1, "unit item consumed, output stack left");
    }

    #[test]
    fn occupied_and_unknown_targets_are_errors() {
        let mut session = session();
        run(&mut session, "/place basic_storage 0 64 0");
        let message = run(&mut session, "/insert 0 64 0 stone 10");
        assert!(message.contains("Inserted 10 of 10"));

        let err = session
            .apply(parse_command("/place basic_storage 0 64 0").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("occupied"));
        assert!(session
            .apply(parse_command("/break 9 9 9").unwrap())
            .is_err());
        assert!(session
            .apply(parse_command("/place mystery 1 1 1").unwrap())
            .is_err());
    }

    #[test]
    fn restored_store_reactivates_units() {
        let mut session = session();
        run(&mut session, "/place basic_storage 2 64 2");
        run(&mut session, "/insert 2 64 2 sand 30");
        run(&mut session, "/unload 2 64 2");
        run(&mut session, "/setid 2 64 2 restored-id");

        let store = session.store().clone();
        let restored = StorageSession::new(&StorageConfig::default(), store);
        let report = restored.report();
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].instance_id, "restored-id");
        assert_eq!(report.units[0].input, 30);
    }

    #[test]
    fn script_runs_to_completion() {
        let mut session = session();
        let mut script = CommandScriptPlayer::parse(
            r#"{"steps": [
                {"tick": 0, "command": "/place basic_storage 0 64 0"},
                {"tick": 0, "command": "/insert 0 64 0 oak_log 64"},
                {"tick": 3, "command": "/break 0 64 0"}
            ]}"#,
        )
        .unwrap();
        session.run(&mut script, None);
        assert_eq!(session.tick(), SimTick(3));
        let report = session.report();
        assert_eq!(report.drops.len(), 2);
        assert_eq!(report.drops[1].count, 64);
    }
}
