//! Serializable battle projections.
//!
//! `BattleView` is the flattened, handler-free snapshot of a battle
//! for drivers, UIs, and learned agents: plain data, stable field
//! order, no `Arc`s and no closures. Variables are emitted sorted by
//! name so two identical states always encode to identical bytes.

use serde::{Deserialize, Serialize};

use crate::battle::{BattleState, Entity, Phase};
use crate::core::{DefinitionId, EngineError, EngineResult, EntityId, PlayerId};

/// Projection of one non-character entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    /// Instance id.
    pub entity_id: EntityId,
    /// Rule definition id.
    pub definition: DefinitionId,
    /// Remaining total usage.
    pub usage: Option<i32>,
    /// Remaining per-round usage.
    pub usage_per_round: Option<i32>,
    /// Free-form value.
    pub value: i64,
    /// Named variables, sorted by name.
    pub vars: Vec<(String, i32)>,
}

/// Projection of one character and its attachments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterView {
    /// Instance id.
    pub entity_id: EntityId,
    /// Rule definition id.
    pub definition: DefinitionId,
    /// Current health.
    pub health: i32,
    /// Health ceiling from the definition.
    pub max_health: i32,
    /// Health at or below zero.
    pub defeated: bool,
    /// Named variables, sorted by name.
    pub vars: Vec<(String, i32)>,
    /// Attached equipment/statuses/skills, attachment order.
    pub attachments: Vec<EntityView>,
}

/// Projection of one side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideView {
    /// Characters in seat order.
    pub characters: Vec<CharacterView>,
    /// The active character, if any.
    pub active: Option<EntityId>,
    /// Combat statuses, registration order.
    pub combat_statuses: Vec<EntityView>,
    /// Summons, registration order.
    pub summons: Vec<EntityView>,
    /// Supports, registration order.
    pub supports: Vec<EntityView>,
    /// Available dice.
    pub dice: u8,
    /// Cards in hand.
    pub hand_size: u8,
    /// Declared end of round.
    pub declared_end: bool,
}

/// Full serializable snapshot of a battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleView {
    /// Rules version as `(major, minor, patch)`.
    pub version: (u8, u8, u8),
    /// Round number.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    /// Side to act.
    pub turn: PlayerId,
    /// Both sides, player 0 first.
    pub sides: Vec<SideView>,
}

fn sorted_vars(entity: &Entity) -> Vec<(String, i32)> {
    let mut vars: Vec<(String, i32)> = entity
        .vars
        .iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    vars.sort();
    vars
}

fn entity_view(entity: &Entity) -> EntityView {
    EntityView {
        entity_id: entity.entity_id,
        definition: entity.definition_id(),
        usage: entity.usage,
        usage_per_round: entity.usage_per_round,
        value: entity.value,
        vars: sorted_vars(entity),
    }
}

fn entity_views(state: &BattleState, ids: &[EntityId]) -> Vec<EntityView> {
    ids.iter()
        .filter_map(|&id| state.entity(id))
        .map(entity_view)
        .collect()
}

/// Project a battle into its serializable view.
#[must_use]
pub fn project(state: &BattleState) -> BattleView {
    let sides = PlayerId::both()
        .into_iter()
        .map(|player| {
            let side = state.side(player);
            let characters = side
                .characters
                .iter()
                .filter_map(|slot| {
                    let ch = state.entity(slot.character)?;
                    Some(CharacterView {
                        entity_id: ch.entity_id,
                        definition: ch.definition_id(),
                        health: ch.health,
                        max_health: ch.definition().max_health,
                        defeated: ch.is_defeated(),
                        vars: sorted_vars(ch),
                        attachments: entity_views(state, &slot.attachments),
                    })
                })
                .collect();
            SideView {
                characters,
                active: side.active,
                combat_statuses: entity_views(state, &side.combat_statuses),
                summons: entity_views(state, &side.summons),
                supports: entity_views(state, &side.supports),
                dice: side.dice,
                hand_size: side.hand_size,
                declared_end: side.declared_end,
            }
        })
        .collect();

    let v = state.version();
    BattleView {
        version: (v.major, v.minor, v.patch),
        round: state.round,
        phase: state.phase,
        turn: state.turn,
        sides,
    }
}

/// Encode a battle view to its compact binary form.
pub fn to_bytes(view: &BattleView) -> EngineResult<Vec<u8>> {
    bincode::serialize(view)
        .map_err(|e| EngineError::invalid(format!("view encoding failed: {e}")))
}

/// Decode a battle view from its binary form.
pub fn from_bytes(bytes: &[u8]) -> EngineResult<BattleView> {
    bincode::deserialize(bytes)
        .map_err(|e| EngineError::invalid(format!("view decoding failed: {e}")))
}
