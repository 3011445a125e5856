//! Core types: identifiers, versions, errors, and the dice RNG.

pub mod error;
pub mod id;
pub mod rng;
pub mod version;

pub use error::{EngineError, EngineResult};
pub use id::{DefinitionId, EntityId, PlayerId, PlayerPair};
pub use rng::{DiceRng, DiceRngState};
pub use version::{GameVersion, VersionRange};
