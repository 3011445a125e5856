//! Player-facing actions.
//!
//! The driver submits one `PlayerAction` at a time; the dispatcher
//! validates it against the current state, runs any cost aggregation,
//! and fans out the resulting event cascade.

use serde::{Deserialize, Serialize};

use crate::core::{DefinitionId, EntityId};

/// One action a player can take on their turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// The active character uses one of its skills.
    UseSkill {
        /// The acting character.
        character: EntityId,
        /// The skill entity attached to that character.
        skill: EntityId,
    },
    /// Play a card from hand.
    PlayCard {
        /// The card's definition.
        definition: DefinitionId,
        /// Optional target (e.g. the character receiving equipment).
        target: Option<EntityId>,
    },
    /// Switch the active character.
    SwitchActive {
        /// The character to make active.
        to: EntityId,
    },
    /// Discard a card to re-roll one die. A fast action: the turn
    /// stays with the actor.
    TuneDice,
    /// Pass for the rest of the round.
    DeclareEnd,
}
