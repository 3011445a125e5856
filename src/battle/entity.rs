//! Live entity instances.
//!
//! An `Entity` is one live instance of a definition inside a battle:
//! its identity, remaining usage budgets, free-form value, variable
//! store, and the non-owning master relation. The shared `EntityInfo`
//! is referenced through an `Arc` and never copied.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{DefinitionId, EntityId, PlayerId};
use crate::defs::{EntityInfo, EntityKind};

/// Per-instance named integer variables with declared caps.
///
/// Handlers use this for extra card state ("layer", "counter", ...).
/// Growth is bounded: a variable with a declared cap clamps instead of
/// exceeding it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: FxHashMap<String, i32>,
}

impl VariableStore {
    /// Get a variable, defaulting to 0.
    #[must_use]
    pub fn get(&self, name: &str) -> i32 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Set a variable directly, clamping to `cap` when one is declared.
    pub fn set(&mut self, name: impl Into<String>, value: i32, cap: Option<i32>) {
        let clamped = match cap {
            Some(cap) => value.min(cap),
            None => value,
        };
        self.values.insert(name.into(), clamped);
    }

    /// Add a delta, clamping to `cap` when one is declared.
    ///
    /// Returns `(old, new)`; callers use `old != new` to detect
    /// whether the stored value actually moved (a clamped increment at
    /// the cap is a no-op).
    pub fn add(&mut self, name: &str, delta: i32, cap: Option<i32>) -> (i32, i32) {
        let old = self.get(name);
        let mut new = old.saturating_add(delta);
        if let Some(cap) = cap {
            new = new.min(cap);
        }
        if new != old {
            self.values.insert(name.to_string(), new);
        }
        (old, new)
    }

    /// Iterate all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// One live instance of a definition.
///
/// Cloning deep-copies every mutable field (usage, value, variables);
/// the `EntityInfo` arc is shared, which is safe because definitions
/// are immutable after load.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Battle-unique instance id.
    pub entity_id: EntityId,
    /// Shared immutable definition.
    info: Arc<EntityInfo>,
    /// The side that owns this entity.
    pub owner: PlayerId,
    /// Non-owning back-reference to the master character, for
    /// equipment/status/skill entities. Resolved through the state's
    /// lookup table, never traversed for lifetime.
    pub master: Option<EntityId>,
    /// Remaining total usage. `None` = unlimited.
    pub usage: Option<i32>,
    /// Remaining usage this round. `None` = unlimited.
    pub usage_per_round: Option<i32>,
    /// Free-form numeric payload used by some card effects.
    pub value: i64,
    /// Current health; meaningful for characters only.
    pub health: i32,
    /// Per-instance variables.
    pub vars: VariableStore,
}

impl Entity {
    /// Create an instance from its definition.
    pub fn from_info(entity_id: EntityId, info: Arc<EntityInfo>, owner: PlayerId) -> Self {
        Self {
            entity_id,
            owner,
            master: None,
            usage: info.usage,
            usage_per_round: info.usage_per_round,
            value: info.initial_value,
            health: info.max_health,
            vars: VariableStore::default(),
            info,
        }
    }

    /// The shared definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<EntityInfo> {
        &self.info
    }

    /// The definition id.
    #[must_use]
    pub fn definition_id(&self) -> DefinitionId {
        self.info.id
    }

    /// The type tag.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.info.kind
    }

    /// A defeated character: health at or below zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.info.kind == EntityKind::Character && self.health <= 0
    }

    /// Whether both usage budgets allow another invocation.
    #[must_use]
    pub fn usage_available(&self) -> bool {
        self.usage.map_or(true, |u| u > 0) && self.usage_per_round.map_or(true, |u| u > 0)
    }

    /// Consume one use from each bounded counter. Counters never go
    /// negative.
    pub fn consume_usage(&mut self) {
        if let Some(u) = self.usage.as_mut() {
            *u = u.saturating_sub(1).max(0);
        }
        if let Some(u) = self.usage_per_round.as_mut() {
            *u = u.saturating_sub(1).max(0);
        }
    }

    /// Total usage spent down to zero.
    #[must_use]
    pub fn used_up(&self) -> bool {
        self.usage == Some(0)
    }

    /// Reset the per-round counter to the definition default.
    pub fn reset_usage_per_round(&mut self) {
        self.usage_per_round = self.info.usage_per_round;
    }
}
