//! Read-only entity queries.
//!
//! `EntityQuery` is the filter surface handlers and drivers use to
//! find entities without hand-walking the side collections. Results
//! come back in battle order (characters in seat order, each followed
//! by its attachments, then combat statuses, summons, supports; side
//! 0 before side 1 unless a side filter narrows it), so query results
//! are deterministic for identical states.

use crate::battle::{BattleState, Entity};
use crate::core::{DefinitionId, EntityId, PlayerId};
use crate::defs::EntityKind;

/// Builder-style filter over the live entities of a battle.
///
/// ## Example
///
/// ```
/// use tcg_core::battle::BattleState;
/// use tcg_core::core::{GameVersion, PlayerId};
/// use tcg_core::defs::EntityKind;
/// use tcg_core::query::EntityQuery;
///
/// let state = BattleState::new(GameVersion::new(4, 0, 0), 1);
/// let summons = EntityQuery::new(&state)
///     .side(PlayerId::P1)
///     .kind(EntityKind::Summon)
///     .collect();
/// assert!(summons.is_empty());
/// ```
#[must_use]
pub struct EntityQuery<'a> {
    state: &'a BattleState,
    side: Option<PlayerId>,
    kind: Option<EntityKind>,
    definition: Option<DefinitionId>,
    master: Option<EntityId>,
    include_defeated: bool,
}

impl<'a> EntityQuery<'a> {
    /// Start a query over every live entity.
    pub fn new(state: &'a BattleState) -> Self {
        Self {
            state,
            side: None,
            kind: None,
            definition: None,
            master: None,
            include_defeated: false,
        }
    }

    /// Keep one side only.
    pub fn side(mut self, side: PlayerId) -> Self {
        self.side = Some(side);
        self
    }

    /// Keep one entity kind only.
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Keep instances of one definition only.
    pub fn definition(mut self, definition: DefinitionId) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Keep entities attached to the given master only.
    pub fn attached_to(mut self, master: EntityId) -> Self {
        self.master = Some(master);
        self
    }

    /// Also match defeated characters, which are excluded by default.
    pub fn include_defeated(mut self) -> Self {
        self.include_defeated = true;
        self
    }

    fn matches(&self, entity: &Entity) -> bool {
        if let Some(kind) = self.kind {
            if entity.kind() != kind {
                return false;
            }
        }
        if let Some(def) = self.definition {
            if entity.definition_id() != def {
                return false;
            }
        }
        if let Some(master) = self.master {
            if entity.master != Some(master) {
                return false;
            }
        }
        if !self.include_defeated && entity.is_defeated() {
            return false;
        }
        true
    }

    /// Iterate matches in battle order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Entity> + '_ {
        let sides = match self.side {
            Some(side) => vec![side],
            None => PlayerId::both().to_vec(),
        };
        sides
            .into_iter()
            .flat_map(move |p| self.state.side(p).ordered_ids())
            .filter_map(move |id| self.state.entity(id))
            .filter(move |ent| self.matches(ent))
    }

    /// All matching entity ids, battle order.
    #[must_use]
    pub fn collect(&self) -> Vec<EntityId> {
        self.iter().map(|e| e.entity_id).collect()
    }

    /// The first match in battle order.
    #[must_use]
    pub fn first(&self) -> Option<&'a Entity> {
        self.iter().next()
    }

    /// Number of matches.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

/// A side's live characters, seat order, defeated excluded.
#[must_use]
pub fn characters(state: &BattleState, side: PlayerId) -> Vec<EntityId> {
    EntityQuery::new(state)
        .side(side)
        .kind(EntityKind::Character)
        .collect()
}

/// A side's combat statuses, registration order.
#[must_use]
pub fn combat_statuses(state: &BattleState, side: PlayerId) -> Vec<EntityId> {
    EntityQuery::new(state)
        .side(side)
        .kind(EntityKind::CombatStatus)
        .collect()
}

/// The attachments of a character, in attachment order.
#[must_use]
pub fn attachments(state: &BattleState, character: EntityId) -> Vec<EntityId> {
    EntityQuery::new(state).attached_to(character).collect()
}

/// A side's characters whose health reached zero.
#[must_use]
pub fn defeated_characters(state: &BattleState, side: PlayerId) -> Vec<EntityId> {
    EntityQuery::new(state)
        .side(side)
        .kind(EntityKind::Character)
        .include_defeated()
        .iter()
        .filter(|e| e.is_defeated())
        .map(|e| e.entity_id)
        .collect()
}
