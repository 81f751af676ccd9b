//! World positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a world dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum DimensionId {
    /// The Overworld dimension.
    #[default]
    Overworld = 0,
    /// The Nether dimension.
    Nether = 1,
    /// The End dimension.
    End = 2,
}

impl DimensionId {
    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Nether => "nether",
            Self::End => "end",
        }
    }
}

/// Location of a single block.
///
/// Ordering is `(dimension, x, y, z)` so maps keyed by position iterate
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// Dimension the block lives in.
    pub dimension: DimensionId,
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Position in the default dimension.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            dimension: DimensionId::Overworld,
            x,
            y,
            z,
        }
    }

    /// Same coordinates in another dimension.
    pub const fn in_dimension(self, dimension: DimensionId) -> Self {
        Self { dimension, ..self }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {})",
            self.dimension.as_str(),
            self.x,
            self.y,
            self.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_groups_by_dimension_first() {
        let overworld = BlockPos::new(100, 0, 0);
        let nether = BlockPos::new(-100, 0, 0).in_dimension(DimensionId::Nether);
        assert!(overworld < nether);
        assert_eq!(nether.to_string(), "nether(-100, 0, 0)");
    }
}
