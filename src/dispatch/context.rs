//! Handler execution contexts.
//!
//! Guards see an immutable `GuardContext`; effects get a mutable
//! `ActionContext` whose operations either mutate state directly
//! (values, usage, variables) or enqueue follow-up work (events,
//! damage, heals, draws) for the breadth-first queue. Effects never
//! recurse into dispatch; everything cascades through the queue.

use std::collections::VecDeque;

use crate::battle::{BattleState, Entity};
use crate::core::{DefinitionId, EngineError, EngineResult, EntityId, PlayerId};
use crate::defs::RuleRegistry;

use super::event::{Event, EventKind, EventScope};

/// Work items the queue drains in FIFO order.
#[derive(Clone, Debug)]
pub(crate) enum QueuedWork {
    /// Fan an event out to its candidates.
    Event(Event),
    /// Pending damage: aggregate `ModifyDamage`, then apply the net
    /// once.
    Damage {
        source: Option<EntityId>,
        target: EntityId,
        amount: i64,
        side: PlayerId,
    },
    /// Pending heal, applied up to max health.
    Heal { target: EntityId, amount: i64 },
    /// Pending card draw for a side.
    Draw { side: PlayerId, count: u8 },
}

/// What an aggregation pass is collecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AggregateKind {
    Damage,
    Cost,
}

/// Running total of one collect phase.
///
/// Handlers contribute deltas (or a veto) during the collect pass;
/// the engine applies the net exactly once afterwards. No handler
/// observes a partially-applied amount.
#[derive(Clone, Debug)]
pub(crate) struct Aggregate {
    pub kind: AggregateKind,
    pub base: i64,
    pub delta: i64,
    pub vetoed: bool,
}

impl Aggregate {
    pub(crate) fn new(kind: AggregateKind, base: i64) -> Self {
        Self { kind, base, delta: 0, vetoed: false }
    }

    /// The final amount: base plus deltas, floored at zero.
    pub(crate) fn net(&self) -> i64 {
        if self.vetoed {
            0
        } else {
            (self.base + self.delta).max(0)
        }
    }
}

/// Immutable view a guard evaluates against.
pub struct GuardContext<'a> {
    pub(crate) state: &'a BattleState,
    pub(crate) event: &'a Event,
    pub(crate) entity: EntityId,
}

impl<'a> GuardContext<'a> {
    /// The entity whose handler is being considered.
    pub fn this(&self) -> EngineResult<&Entity> {
        self.state.expect_entity(self.entity)
    }

    /// The id of the entity whose handler is being considered.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// The event under consideration.
    #[must_use]
    pub fn event(&self) -> &Event {
        self.event
    }

    /// The full battle state, read-only.
    #[must_use]
    pub fn state(&self) -> &BattleState {
        self.state
    }

    /// Whether this entity is the event's source. Skills use this to
    /// fire only on their own use, not on every `UseSkill`.
    #[must_use]
    pub fn self_sourced(&self) -> bool {
        self.event.source == Some(self.entity)
    }

    /// Whether the event was produced by this entity's own side.
    #[must_use]
    pub fn own_side_acted(&self) -> bool {
        self.state
            .entity(self.entity)
            .map_or(false, |e| e.owner == self.event.side)
    }
}

/// Mutable context an effect runs in.
///
/// Direct mutation is limited to the handler's own entity and the
/// collections it may spawn into; everything that should cascade goes
/// through `emit`, `deal_damage`, `heal`, or `draw` and resolves in
/// breadth-first order after this effect returns.
pub struct ActionContext<'a> {
    pub(crate) state: &'a mut BattleState,
    pub(crate) registry: &'a RuleRegistry,
    pub(crate) event: &'a Event,
    pub(crate) entity: EntityId,
    pub(crate) queue: &'a mut VecDeque<QueuedWork>,
    pub(crate) aggregate: Option<&'a mut Aggregate>,
}

impl<'a> ActionContext<'a> {
    /// The entity whose handler is running.
    pub fn this(&self) -> EngineResult<&Entity> {
        self.state.expect_entity(self.entity)
    }

    /// The id of the entity whose handler is running.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// The event being handled.
    #[must_use]
    pub fn event(&self) -> &Event {
        self.event
    }

    /// The full battle state, read-only.
    #[must_use]
    pub fn state(&self) -> &BattleState {
        self.state
    }

    fn owner(&self) -> EngineResult<PlayerId> {
        Ok(self.this()?.owner)
    }

    // === Own-entity mutation ===

    /// Set this entity's free-form value.
    pub fn set_value(&mut self, value: i64) -> EngineResult<()> {
        let entity = self.entity;
        let ent = self
            .state
            .entity_mut(entity)
            .ok_or_else(|| EngineError::invalid(format!("{entity} is not live")))?;
        ent.value = value;
        Ok(())
    }

    /// Add to this entity's free-form value.
    pub fn add_value(&mut self, delta: i64) -> EngineResult<()> {
        let current = self.this()?.value;
        self.set_value(current + delta)
    }

    /// Overwrite this entity's remaining total usage.
    pub fn set_usage(&mut self, usage: i32) -> EngineResult<()> {
        let entity = self.entity;
        let ent = self
            .state
            .entity_mut(entity)
            .ok_or_else(|| EngineError::invalid(format!("{entity} is not live")))?;
        ent.usage = Some(usage.max(0));
        Ok(())
    }

    /// Add to a named variable on this entity, clamping to its
    /// declared cap.
    ///
    /// Emits `VariableChanged` only when the stored value actually
    /// moves; a clamped increment at the cap is silent, so a
    /// threshold guard on the new value fires at most once.
    pub fn add_variable(&mut self, name: &str, delta: i32) -> EngineResult<i32> {
        let entity = self.entity;
        let side = self.owner()?;
        let cap = self.this()?.definition().var_cap(name);
        let ent = self
            .state
            .entity_mut(entity)
            .ok_or_else(|| EngineError::invalid(format!("{entity} is not live")))?;
        let (old, new) = ent.vars.add(name, delta, cap);
        if old != new {
            self.queue.push_back(QueuedWork::Event(
                Event::new(EventKind::VariableChanged, side)
                    .with_scope(EventScope::Entity(entity))
                    .with_target(entity)
                    .with_value(i64::from(new))
                    .with_variable(name),
            ));
        }
        Ok(new)
    }

    /// Read a named variable on this entity.
    pub fn variable(&self, name: &str) -> EngineResult<i32> {
        Ok(self.this()?.vars.get(name))
    }

    // === Lifecycle ===

    /// Dispose this entity. Its remaining queued events find no
    /// candidate and skip silently.
    pub fn dispose_self(&mut self) -> EngineResult<()> {
        self.dispose(self.entity)
    }

    /// Dispose another entity.
    pub fn dispose(&mut self, entity: EntityId) -> EngineResult<()> {
        let side = self.state.expect_entity(entity)?.owner;
        let definition = self.state.expect_entity(entity)?.definition_id();
        self.state.dispose(entity)?;
        self.queue.push_back(QueuedWork::Event(
            Event::new(EventKind::Disposed, side)
                .with_target(entity)
                .with_definition(definition),
        ));
        Ok(())
    }

    /// Spawn a new attachment on a master character.
    pub fn attach(&mut self, definition: DefinitionId, master: EntityId) -> EngineResult<EntityId> {
        let owner = self.state.expect_entity(master)?.owner;
        let id = self.state.spawn(self.registry, definition, owner)?;
        self.state.attach(id, master)?;
        Ok(id)
    }

    /// Detach an entity from its master without disposing it. The
    /// entity stays live but leaves battle order until re-attached.
    pub fn detach(&mut self, entity: EntityId) -> EngineResult<()> {
        self.state.detach(entity)
    }

    /// Spawn a summon on this entity's side.
    pub fn summon(&mut self, definition: DefinitionId) -> EngineResult<EntityId> {
        let owner = self.owner()?;
        self.state.spawn(self.registry, definition, owner)
    }

    /// Spawn a support on this entity's side.
    pub fn add_support(&mut self, definition: DefinitionId) -> EngineResult<EntityId> {
        let owner = self.owner()?;
        self.state.spawn(self.registry, definition, owner)
    }

    /// Spawn a combat status on a side.
    pub fn add_combat_status(
        &mut self,
        definition: DefinitionId,
        side: PlayerId,
    ) -> EngineResult<EntityId> {
        self.state.spawn(self.registry, definition, side)
    }

    // === Cascading work ===

    /// Queue a follow-up event. It resolves after every candidate of
    /// the current event has been offered it.
    pub fn emit(&mut self, event: Event) {
        self.queue.push_back(QueuedWork::Event(event));
    }

    /// Queue damage against a character. The amount runs through a
    /// `ModifyDamage` collect pass before it is applied.
    pub fn deal_damage(&mut self, target: EntityId, amount: i64) {
        self.queue.push_back(QueuedWork::Damage {
            source: Some(self.entity),
            target,
            amount,
            side: self.event.side,
        });
    }

    /// Queue a heal on a character.
    pub fn heal(&mut self, target: EntityId, amount: i64) {
        self.queue.push_back(QueuedWork::Heal { target, amount });
    }

    /// Queue card draws for this entity's side.
    pub fn draw(&mut self, count: u8) -> EngineResult<()> {
        let side = self.owner()?;
        self.queue.push_back(QueuedWork::Draw { side, count });
        Ok(())
    }

    /// Add dice to this entity's side.
    pub fn gain_dice(&mut self, count: u8) -> EngineResult<()> {
        let side = self.owner()?;
        let dice = &mut self.state.side_mut(side).dice;
        *dice = dice.saturating_add(count);
        Ok(())
    }

    // === Convenience lookups ===

    /// The active character opposing this entity's side.
    pub fn opposing_active(&self) -> EngineResult<EntityId> {
        let opponent = self.owner()?.opponent();
        self.state
            .active_character(opponent)
            .map(|e| e.entity_id)
            .ok_or_else(|| EngineError::invalid(format!("{opponent} has no active character")))
    }

    /// The active character on this entity's side.
    pub fn own_active(&self) -> EngineResult<EntityId> {
        let owner = self.owner()?;
        self.state
            .active_character(owner)
            .map(|e| e.entity_id)
            .ok_or_else(|| EngineError::invalid(format!("{owner} has no active character")))
    }

    // === Aggregation contributions ===

    fn aggregate_of(&mut self, kind: AggregateKind) -> EngineResult<&mut Aggregate> {
        match self.aggregate.as_deref_mut() {
            Some(agg) if agg.kind == kind => Ok(agg),
            _ => Err(EngineError::invalid(format!(
                "no {kind:?} aggregation in progress"
            ))),
        }
    }

    /// Increase the pending damage. Valid only inside `ModifyDamage`.
    pub fn increase_damage(&mut self, amount: i64) -> EngineResult<()> {
        self.aggregate_of(AggregateKind::Damage)?.delta += amount;
        Ok(())
    }

    /// Decrease the pending damage. Valid only inside `ModifyDamage`.
    pub fn decrease_damage(&mut self, amount: i64) -> EngineResult<()> {
        self.aggregate_of(AggregateKind::Damage)?.delta -= amount;
        Ok(())
    }

    /// Cancel the pending damage outright. Valid only inside
    /// `ModifyDamage`.
    pub fn veto_damage(&mut self) -> EngineResult<()> {
        self.aggregate_of(AggregateKind::Damage)?.vetoed = true;
        Ok(())
    }

    /// The pending amount as contributed so far.
    pub fn pending_amount(&self) -> EngineResult<i64> {
        match self.aggregate.as_deref() {
            Some(agg) => Ok(agg.net()),
            None => Err(EngineError::invalid("no aggregation in progress")),
        }
    }

    /// Reduce the pending dice cost. Valid only inside `ModifyCost`.
    pub fn reduce_cost(&mut self, amount: i64) -> EngineResult<()> {
        self.aggregate_of(AggregateKind::Cost)?.delta -= amount;
        Ok(())
    }

    /// Increase the pending dice cost. Valid only inside `ModifyCost`.
    pub fn increase_cost(&mut self, amount: i64) -> EngineResult<()> {
        self.aggregate_of(AggregateKind::Cost)?.delta += amount;
        Ok(())
    }
}
