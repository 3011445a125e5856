//! Entity definitions - immutable shared rule data.
//!
//! `EntityInfo` holds everything that is true of *every* instance of a
//! card id: type tag, cost, usage defaults, variable caps, version
//! range, and the ordered handler list. It is built once at registry
//! load, never mutated afterwards, and shared via `Arc` by all live
//! instances.
//!
//! Instance-specific data (remaining usage, value, variables) lives in
//! `battle::Entity`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{DefinitionId, VersionRange};
use crate::dispatch::EventKind;

use super::handler::HandlerEntry;

/// The type tag of a definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A playable character with health; the anchor for attachments.
    Character,
    /// Equipment attached to one character.
    Equipment,
    /// A status attached to one character.
    Status,
    /// A status attached to a whole side rather than one character.
    CombatStatus,
    /// A summon owned by a side's summon collection.
    Summon,
    /// A support card owned by a side's support collection.
    Support,
    /// An active skill, owned by the character that can invoke it.
    Skill,
}

impl EntityKind {
    /// Kinds that live attached to a master character.
    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(self, EntityKind::Equipment | EntityKind::Status | EntityKind::Skill)
    }
}

/// Immutable, shared definition data for one card/skill id.
///
/// Never mutated after registration; all live instances of the id hold
/// an `Arc` to the same info.
pub struct EntityInfo {
    /// The definition id this info implements.
    pub id: DefinitionId,
    /// Type tag.
    pub kind: EntityKind,
    /// Display name. Treated as opaque metadata by the engine.
    pub name: String,
    /// Display description. Treated as opaque metadata by the engine.
    pub description: String,
    /// Dice cost to play/invoke.
    pub cost: i32,
    /// Maximum health; meaningful for characters only.
    pub max_health: i32,
    /// Total usage budget. `None` = unlimited.
    pub usage: Option<i32>,
    /// Per-round usage budget, reset at each action phase. `None` = unlimited.
    pub usage_per_round: Option<i32>,
    /// Dispose the entity when its total usage reaches zero.
    pub dispose_when_used_up: bool,
    /// Initial free-form numeric payload for new instances.
    pub initial_value: i64,
    /// Declared caps for the per-instance variable store.
    pub var_caps: FxHashMap<String, i32>,
    /// Versions for which this definition is active.
    pub range: VersionRange,
    /// Ordered handler list, registration order.
    pub handlers: Vec<HandlerEntry>,
}

impl EntityInfo {
    /// Iterate handlers registered for one event, in registration order.
    pub fn handlers_for(&self, event: EventKind) -> impl Iterator<Item = &HandlerEntry> {
        self.handlers.iter().filter(move |h| h.event == event)
    }

    /// Check whether any handler listens for the event.
    #[must_use]
    pub fn has_handler(&self, event: EventKind) -> bool {
        self.handlers.iter().any(|h| h.event == event)
    }

    /// The declared cap for a variable, if any.
    #[must_use]
    pub fn var_cap(&self, name: &str) -> Option<i32> {
        self.var_caps.get(name).copied()
    }
}

impl std::fmt::Debug for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityInfo")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Display metadata for one definition, keyed by id in the versioned
/// data snapshot handed to the asset layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMeta {
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
}
