//! Event descriptors.
//!
//! Every notification the engine fans out to handlers is an `Event`: a
//! kind, a scope that prunes the candidate set, and the optional
//! payload fields the kind makes meaningful. Events are plain data so
//! they queue, clone, and log cheaply.

use serde::{Deserialize, Serialize};

use crate::core::{DefinitionId, EntityId, PlayerId};

/// The closed set of engine events handlers can listen for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The battle begins, after initial placement.
    BattleStart,
    /// The action phase of a round begins. Per-round usage counters
    /// are already reset when this fires.
    ActionPhaseStart,
    /// End-of-round resolution.
    RoundEnd,
    /// A character used a skill.
    UseSkill,
    /// A side switched its active character.
    SwitchActive,
    /// A card was played from hand.
    CardPlayed,
    /// Aggregation pass over pending damage. Handlers adjust the
    /// running total through the context; nothing is applied yet.
    ModifyDamage,
    /// Aggregation pass over an action's dice cost.
    ModifyCost,
    /// Damage has been applied to a character.
    DamageDealt,
    /// A character's health reached zero.
    Defeated,
    /// A character was healed.
    Healed,
    /// A per-instance variable actually changed value.
    VariableChanged,
    /// An entity left the battle.
    Disposed,
    /// A side declared the end of its round.
    DeclareEnd,
}

/// Which entities an event is offered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventScope {
    /// Every live entity, acting side first.
    All,
    /// Entities of one side only.
    Side(PlayerId),
    /// Exactly one entity.
    Entity(EntityId),
    /// A character and its attachments.
    AttachmentsOf(EntityId),
}

/// One event instance moving through the dispatch queue.
#[derive(Clone, Debug)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Who is offered the event.
    pub scope: EventScope,
    /// The entity the event originated from, when one exists.
    pub source: Option<EntityId>,
    /// The entity the event is about, when one exists.
    pub target: Option<EntityId>,
    /// The side whose action produced the event.
    pub side: PlayerId,
    /// Relevant definition (played card, used skill).
    pub definition: Option<DefinitionId>,
    /// Numeric payload: damage amount, heal amount, new variable value.
    pub value: i64,
    /// Variable name for `VariableChanged`.
    pub variable: Option<String>,
}

impl Event {
    /// Create an event with the given kind and acting side, offered to
    /// everyone.
    #[must_use]
    pub fn new(kind: EventKind, side: PlayerId) -> Self {
        Self {
            kind,
            scope: EventScope::All,
            source: None,
            target: None,
            side,
            definition: None,
            value: 0,
            variable: None,
        }
    }

    /// Restrict the candidate set.
    #[must_use]
    pub fn with_scope(mut self, scope: EventScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the originating entity.
    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the subject entity.
    #[must_use]
    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the relevant definition.
    #[must_use]
    pub fn with_definition(mut self, definition: DefinitionId) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Set the numeric payload.
    #[must_use]
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    /// Set the variable name.
    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }
}
