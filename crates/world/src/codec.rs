//! Storage payload codec.
//!
//! A broken storage unit carries its contents in the metadata of the dropped
//! item. The primary region lives in the plugin namespace and is
//! authoritative:
//!
//! | key                    | value                             |
//! |------------------------|-----------------------------------|
//! | `bulkstore:item`       | serialized stored item            |
//! | `bulkstore:stored`     | quantity (`Int`)                  |
//! | `bulkstore:storage_id` | instance id (`Str`, optional)     |
//!
//! When the quantity is positive a second interop region is written under the
//! `minecraft` namespace (`stored`, `storage_id`, `infinite_storage = 1`).
//! That write is best-effort and never fails the encode.

use crate::catalog::{item_name, ItemRegistry};
use crate::error::CodecError;
use bincode::Options;
use bulkstore_core::{ItemMeta, ItemStack, MetaValue, MetadataBlob, MetadataError, NamespacedKey};
use tracing::debug;

/// Upper bound for an embedded item payload.
const MAX_PAYLOAD_BYTES: u64 = 64 * 1024;

/// Prefix of the lore line appended by [`encode`].
pub const STORED_LINE_PREFIX: &str = "Stored: ";

/// Embedded stored item.
pub fn item_key() -> NamespacedKey {
    NamespacedKey::plugin("item")
}

/// Stored quantity.
pub fn amount_key() -> NamespacedKey {
    NamespacedKey::plugin("stored")
}

/// Instance id of the unit the payload came from.
pub fn storage_id_key() -> NamespacedKey {
    NamespacedKey::plugin("storage_id")
}

/// Marker carried by menu items rendering a unit's contents.
pub fn display_key() -> NamespacedKey {
    NamespacedKey::plugin("display")
}

/// Marker carried by the placeholder shown in an empty unit.
pub fn empty_key() -> NamespacedKey {
    NamespacedKey::plugin("empty")
}

fn interop_amount_key() -> NamespacedKey {
    NamespacedKey::interop("stored")
}

fn interop_storage_id_key() -> NamespacedKey {
    NamespacedKey::interop("storage_id")
}

fn interop_flag_key() -> NamespacedKey {
    NamespacedKey::interop("infinite_storage")
}

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_PAYLOAD_BYTES)
}

/// Write a storage payload into `meta`.
///
/// Existing lore is kept and a `Stored: <label> x <amount>` line is appended
/// to it.
pub fn encode(
    meta: &mut ItemMeta,
    stored: &ItemStack,
    label: &str,
    amount: u32,
    storage_id: Option<&str>,
) -> Result<(), CodecError> {
    let amount_value = i32::try_from(amount).map_err(|_| CodecError::AmountTooLarge(amount))?;
    let payload = payload_options()
        .serialize(stored)
        .map_err(|err| CodecError::Payload(err.to_string()))?;

    if let Some(lore) = meta.lore.as_mut().filter(|lore| !lore.is_empty()) {
        lore.push(format!("{STORED_LINE_PREFIX}{label} x {amount}"));
    }

    meta.data.insert(item_key(), MetaValue::Bytes(payload));
    meta.data.insert(amount_key(), MetaValue::Int(amount_value));
    if let Some(id) = storage_id {
        meta.data
            .insert(storage_id_key(), MetaValue::Str(id.to_string()));
    }

    if amount > 0 {
        if let Err(err) = write_interop(&mut meta.data, amount_value, storage_id) {
            debug!(%err, "interop metadata region refused storage payload");
        }
    }

    Ok(())
}

fn write_interop(
    data: &mut MetadataBlob,
    amount: i32,
    storage_id: Option<&str>,
) -> Result<(), MetadataError> {
    data.try_insert(interop_amount_key(), MetaValue::Int(amount))?;
    if let Some(id) = storage_id.filter(|id| !id.is_empty()) {
        data.try_insert(interop_storage_id_key(), MetaValue::Str(id.to_string()))?;
    }
    data.try_insert(interop_flag_key(), MetaValue::Byte(1))
}

/// Read a storage payload. Absent or malformed fields mean "no payload".
pub fn decode(item: &ItemStack) -> Option<(ItemStack, u32)> {
    let data = &item.meta()?.data;
    let amount = u32::try_from(data.get_int(&amount_key())?).ok()?;
    let stored = decode_embedded(item)?;
    Some((stored, amount))
}

/// The embedded stored item alone, regardless of quantity.
pub fn decode_embedded(item: &ItemStack) -> Option<ItemStack> {
    let bytes = item.meta()?.data.get_bytes(&item_key())?;
    payload_options().deserialize(bytes).ok()
}

/// Instance id carried by an item, primary region first.
pub fn storage_id(item: &ItemStack) -> Option<String> {
    let data = &item.meta()?.data;
    data.get_str(&storage_id_key())
        .or_else(|| data.get_str(&interop_storage_id_key()))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Copy the payload carried by `source` onto `target`, relabelling it.
///
/// Returns `false` when `source` carries no payload.
pub fn transfer_to_stack(
    source: &ItemStack,
    target: &mut ItemStack,
    registry: &dyn ItemRegistry,
) -> bool {
    let Some((stored, amount)) = decode(source) else {
        return false;
    };
    let label = item_name(&stored, registry);
    let storage_id = storage_id(source);
    match encode(target.meta_mut(), &stored, &label, amount, storage_id.as_deref()) {
        Ok(()) => true,
        Err(err) => {
            debug!(%err, "failed to transfer storage payload");
            false
        }
    }
}

/// Two unit items stack only when their metadata blobs are identical.
pub fn can_stack(a: &ItemMeta, b: &ItemMeta) -> bool {
    a.data == b.data
}
