//! # tcg-core
//!
//! Rule evaluation engine for a two-player collectible card battle
//! game: versioned card definitions, live entities, and event-driven
//! handler dispatch.
//!
//! ## Design Principles
//!
//! 1. **Definitions are immutable, instances are cheap**: card rules
//!    compile once into a shared `RuleRegistry`; every live `Entity`
//!    holds only its mutable counters plus an `Arc` to its definition.
//!
//! 2. **Versioned rules**: one definition id can carry several rule
//!    texts with disjoint `[since, until)` version ranges. A battle
//!    resolves everything against a single pinned `GameVersion`.
//!
//! 3. **Breadth-first cascade**: effects never recurse. Everything a
//!    handler causes goes through one FIFO queue, so follow-up events
//!    resolve only after the current event finished fanning out.
//!
//! 4. **Snapshot-friendly**: `BattleState::snapshot` deep-copies every
//!    mutable field, so speculative lines (search, AI, what-if UIs)
//!    run on cheap isolated copies.
//!
//! ## Modules
//!
//! - `core`: ids, versions, errors, deterministic dice RNG
//! - `defs`: definitions, handlers, the authoring builder, the registry
//! - `battle`: live entities, per-side collections, the battle state
//! - `query`: read-only entity filters in battle order
//! - `dispatch`: events, player actions, the evaluation engine
//! - `export`: serializable battle projections

pub mod battle;
pub mod core;
pub mod defs;
pub mod dispatch;
pub mod export;
pub mod query;

// Re-export commonly used types
pub use crate::core::{
    DefinitionId, DiceRng, DiceRngState, EngineError, EngineResult, EntityId, GameVersion,
    PlayerId, PlayerPair, VersionRange,
};

pub use crate::defs::{CardMeta, DefinitionBuilder, EntityInfo, EntityKind, RuleRegistry};

pub use crate::battle::{BattleState, CharacterSlot, Entity, Phase, PlayerSide, VariableStore};

pub use crate::query::EntityQuery;

pub use crate::dispatch::{
    ActionContext, DispatchLog, Dispatcher, Event, EventKind, EventScope, GuardContext,
    PlayerAction,
};

pub use crate::export::{project, BattleView, CharacterView, EntityView, SideView};
