//! Typed errors for storage-unit operations.

use bulkstore_core::BlockPos;
use thiserror::Error;

/// Precondition violations and configuration errors raised by storage units.
///
/// None of these are fatal: the offending operation is rejected as a no-op and
/// the cache is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// `load` was called on a cache already holding a different item.
    #[error("storage at {pos} holds {held}, refusing to load {incoming}")]
    TypeMismatch {
        /// Cache location.
        pos: BlockPos,
        /// Currently stored type.
        held: String,
        /// Type that was offered.
        incoming: String,
    },
    /// A non-zero amount was set on a cache that holds nothing.
    #[error("storage at {pos} is empty, cannot set amount {amount} without loading an item")]
    NotLoaded {
        /// Cache location.
        pos: BlockPos,
        /// Requested amount.
        amount: u32,
    },
    /// An amount larger than the tier capacity was requested.
    #[error("amount {amount} exceeds storage capacity {max}")]
    OverCapacity {
        /// Requested amount.
        amount: u32,
        /// Tier capacity.
        max: u32,
    },
    /// A tier was configured with a capacity the metadata format cannot carry.
    #[error("tier {id} capacity {max} exceeds the 32-bit metadata limit")]
    CapacityTooLarge {
        /// Tier id.
        id: String,
        /// Requested capacity.
        max: u64,
    },
    /// A tier was configured with an empty id or zero capacity.
    #[error("invalid storage tier `{0}`")]
    InvalidTier(String),
    /// No storage unit is active at the location.
    #[error("no storage unit active at {0}")]
    NoUnit(BlockPos),
}

/// Errors raised while writing a storage payload into item metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The amount does not fit the 32-bit metadata integer.
    #[error("stored amount {0} does not fit the metadata integer")]
    AmountTooLarge(u32),
    /// The stored item could not be serialized.
    #[error("failed to serialize stored item: {0}")]
    Payload(String),
}
