//! Mutable battle state: live entities, per-side collections, and the
//! root aggregate with its structural mutation and snapshot operations.

pub mod entity;
pub mod player;
pub mod state;

pub use entity::{Entity, VariableStore};
pub use player::{CharacterSlot, PlayerSide};
pub use state::{BattleState, Phase};
