#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod item;
pub mod key;
pub mod metadata;
pub mod pos;

use serde::{Deserialize, Serialize};

pub use item::{ItemMeta, ItemStack, DEFAULT_STACK_SIZE};
pub use key::{KeyError, NamespacedKey, INTEROP_NAMESPACE, PLUGIN_NAMESPACE};
pub use metadata::{MetaValue, MetadataBlob, MetadataError};
pub use pos::{BlockPos, DimensionId};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// True when this tick lands on a multiple of `interval` (0 and 1 mean every tick).
    pub fn is_multiple_of(self, interval: u64) -> bool {
        interval <= 1 || self.0 % interval == 0
    }
}
