//! Bulk single-item storage units: payload codec, admission filter, per-unit
//! cache state machine and the controller that owns placed units.

mod admission;
mod block_info;
mod cache;
mod catalog;
pub mod codec;
mod error;
mod inventory;
mod menu;
mod persist;
mod tier;
mod unit;

pub use admission::*;
pub use block_info::*;
pub use cache::*;
pub use catalog::*;
pub use error::*;
pub use inventory::*;
pub use menu::*;
pub use persist::*;
pub use tier::*;
pub use unit::*;
