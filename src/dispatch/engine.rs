//! Breadth-first event dispatch.
//!
//! The dispatcher owns no battle state; it binds a compiled
//! `RuleRegistry` to whichever `BattleState` the caller passes in.
//! One queue drives everything: player actions and handler effects
//! push work items, and the engine drains them FIFO, so an effect's
//! follow-ups resolve only after every candidate of the current event
//! has been offered it.
//!
//! ## Delivery
//!
//! Candidates for an event are fixed when the event is popped: acting
//! side first, each side in battle order (characters in seat order,
//! each followed by its attachments, then combat statuses, summons,
//! supports). An entity disposed while the event was still queued is
//! skipped silently. A candidate fires at most once per event: its
//! usage budgets are checked before the guard runs and consumed once
//! after any of its handlers' effects ran.
//!
//! ## Aggregation
//!
//! Damage and cost resolve in two phases. The collect phase fans out
//! `ModifyDamage`/`ModifyCost` with a running total the handlers
//! adjust through the context; the apply phase applies the net exactly
//! once. No handler ever observes a partially-applied amount.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, trace};

use crate::battle::{BattleState, Phase};
use crate::core::{DefinitionId, EngineError, EngineResult, EntityId, PlayerId};
use crate::defs::{EntityKind, RuleRegistry};

use super::action::PlayerAction;
use super::context::{ActionContext, Aggregate, AggregateKind, GuardContext, QueuedWork};
use super::event::{Event, EventKind, EventScope};

/// Ordered record of handler invocations, `(entity, event kind)` per
/// fire. Cheap to clone alongside state snapshots.
pub type DispatchLog = im::Vector<(EntityId, EventKind)>;

/// Hard bound on work items per dispatch. A cascade that exceeds it is
/// a rules bug (two cards feeding each other), not a legal game line.
const CASCADE_LIMIT: usize = 1_000;

/// The rule evaluation engine.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<RuleRegistry>,
}

impl Dispatcher {
    /// Bind a compiled registry.
    #[must_use]
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// The bound registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Fan out a single event and everything it cascades into.
    pub fn dispatch(&self, state: &mut BattleState, event: Event) -> EngineResult<DispatchLog> {
        let mut queue = VecDeque::new();
        let mut log = DispatchLog::new();
        queue.push_back(QueuedWork::Event(event));
        self.run_queue(state, &mut queue, &mut log)?;
        Ok(log)
    }

    /// Announce the start of the battle.
    pub fn begin_battle(&self, state: &mut BattleState) -> EngineResult<DispatchLog> {
        debug!("battle start, version {}", state.version());
        self.dispatch(state, Event::new(EventKind::BattleStart, state.turn))
    }

    /// Enter the action phase of the current round.
    ///
    /// Per-round usage is reset for every live entity before
    /// `ActionPhaseStart` fires, so phase-start handlers already see
    /// fresh budgets.
    pub fn begin_action_phase(&self, state: &mut BattleState) -> EngineResult<DispatchLog> {
        debug!("round {} action phase", state.round);
        state.phase = Phase::Action;
        state.reset_usage_per_round();
        self.dispatch(state, Event::new(EventKind::ActionPhaseStart, state.turn))
    }

    /// Resolve the end of the round and advance to the next one.
    pub fn end_round(&self, state: &mut BattleState) -> EngineResult<DispatchLog> {
        debug!("round {} end", state.round);
        state.phase = Phase::End;
        let log = self.dispatch(state, Event::new(EventKind::RoundEnd, state.turn))?;
        state.advance_round();
        Ok(log)
    }

    /// Validate and resolve one player action.
    ///
    /// On success the turn passes to the opponent unless they have
    /// declared the end of the round. An action rejected by validation
    /// leaves the turn indicator untouched; an error later in the
    /// cascade may leave a partially-resolved state, and callers
    /// wanting atomicity resolve against a snapshot.
    pub fn perform(
        &self,
        state: &mut BattleState,
        side: PlayerId,
        action: &PlayerAction,
    ) -> EngineResult<DispatchLog> {
        let mut queue = VecDeque::new();
        let mut log = DispatchLog::new();

        match action {
            PlayerAction::UseSkill { character, skill } => {
                self.validate_skill(state, side, *character, *skill)?;
                let definition = state.expect_entity(*skill)?.definition_id();
                let base_cost = i64::from(state.expect_entity(*skill)?.definition().cost);
                self.charge(state, &mut queue, &mut log, side, base_cost, definition)?;
                queue.push_back(QueuedWork::Event(
                    Event::new(EventKind::UseSkill, side)
                        .with_source(*skill)
                        .with_target(*character)
                        .with_definition(definition),
                ));
            }
            PlayerAction::PlayCard { definition, target } => {
                if state.side(side).hand_size == 0 {
                    return Err(EngineError::invalid("no cards in hand"));
                }
                let info = self.registry.resolve(*definition, state.version())?.clone();
                self.charge(state, &mut queue, &mut log, side, i64::from(info.cost), *definition)?;
                state.side_mut(side).hand_size -= 1;

                let spawned = state.spawn(&self.registry, *definition, side)?;
                if info.kind.is_attachment() {
                    let master = target.ok_or_else(|| {
                        EngineError::invalid(format!("{definition} requires a target character"))
                    })?;
                    state.attach(spawned, master)?;
                }
                queue.push_back(QueuedWork::Event(
                    Event::new(EventKind::CardPlayed, side)
                        .with_source(spawned)
                        .with_definition(*definition),
                ));
            }
            PlayerAction::SwitchActive { to } => {
                let previous = self.validate_switch(state, side, *to)?;
                state.side_mut(side).active = Some(*to);
                let mut ev = Event::new(EventKind::SwitchActive, side).with_target(*to);
                if let Some(prev) = previous {
                    ev = ev.with_source(prev);
                }
                queue.push_back(QueuedWork::Event(ev));
            }
            PlayerAction::TuneDice => {
                if state.side(side).hand_size == 0 {
                    return Err(EngineError::invalid("no cards in hand"));
                }
                state.side_mut(side).hand_size -= 1;
                let face = state.rng.roll_die();
                trace!("{side} tuned a die to face {face}");
                // Fast action: no event, the turn stays with the actor.
                state.turn = side;
                return Ok(log);
            }
            PlayerAction::DeclareEnd => {
                state.side_mut(side).declared_end = true;
                queue.push_back(QueuedWork::Event(Event::new(EventKind::DeclareEnd, side)));
            }
        }

        // Validation passed and the primary work is queued; only now
        // does the action count as started.
        state.turn = side;
        self.run_queue(state, &mut queue, &mut log)?;

        if !state.side(side.opponent()).declared_end {
            state.turn = side.opponent();
        }
        Ok(log)
    }

    /// Resolve an action against a snapshot, leaving `state` untouched.
    ///
    /// Returns the resulting state and its dispatch log, for
    /// speculative evaluation of candidate actions.
    pub fn simulate(
        &self,
        state: &BattleState,
        side: PlayerId,
        action: &PlayerAction,
    ) -> EngineResult<(BattleState, DispatchLog)> {
        let mut speculative = state.snapshot();
        let log = self.perform(&mut speculative, side, action)?;
        Ok((speculative, log))
    }

    // === Validation ===

    fn validate_skill(
        &self,
        state: &BattleState,
        side: PlayerId,
        character: EntityId,
        skill: EntityId,
    ) -> EngineResult<()> {
        let ch = state.expect_entity(character)?;
        if ch.kind() != EntityKind::Character || ch.owner != side {
            return Err(EngineError::invalid(format!(
                "{character} is not {side}'s character"
            )));
        }
        if ch.is_defeated() {
            return Err(EngineError::invalid(format!("{character} is defeated")));
        }
        if state.side(side).active != Some(character) {
            return Err(EngineError::invalid(format!("{character} is not active")));
        }
        let sk = state.expect_entity(skill)?;
        if sk.kind() != EntityKind::Skill || sk.master != Some(character) {
            return Err(EngineError::invalid(format!(
                "{skill} is not a skill of {character}"
            )));
        }
        Ok(())
    }

    fn validate_switch(
        &self,
        state: &BattleState,
        side: PlayerId,
        to: EntityId,
    ) -> EngineResult<Option<EntityId>> {
        let ch = state.expect_entity(to)?;
        if ch.kind() != EntityKind::Character || ch.owner != side {
            return Err(EngineError::invalid(format!("{to} is not {side}'s character")));
        }
        if ch.is_defeated() {
            return Err(EngineError::invalid(format!("{to} is defeated")));
        }
        let previous = state.side(side).active;
        if previous == Some(to) {
            return Err(EngineError::invalid(format!("{to} is already active")));
        }
        Ok(previous)
    }

    /// Run the `ModifyCost` collect phase and deduct the net dice cost
    /// exactly once.
    fn charge(
        &self,
        state: &mut BattleState,
        queue: &mut VecDeque<QueuedWork>,
        log: &mut DispatchLog,
        side: PlayerId,
        base_cost: i64,
        definition: DefinitionId,
    ) -> EngineResult<()> {
        let mut aggregate = Aggregate::new(AggregateKind::Cost, base_cost);
        let event = Event::new(EventKind::ModifyCost, side)
            .with_definition(definition)
            .with_value(base_cost);
        self.deliver(state, queue, &event, Some(&mut aggregate), log)?;

        let net = aggregate.net();
        let available = i64::from(state.side(side).dice);
        if available < net {
            return Err(EngineError::invalid(format!(
                "cost {net} exceeds {available} dice"
            )));
        }
        state.side_mut(side).dice = (available - net) as u8;
        trace!("charged {net} dice ({base_cost} base) to {side}");
        Ok(())
    }

    // === The queue ===

    fn run_queue(
        &self,
        state: &mut BattleState,
        queue: &mut VecDeque<QueuedWork>,
        log: &mut DispatchLog,
    ) -> EngineResult<()> {
        let mut processed = 0usize;
        while let Some(work) = queue.pop_front() {
            processed += 1;
            if processed > CASCADE_LIMIT {
                return Err(EngineError::invalid(format!(
                    "event cascade exceeded {CASCADE_LIMIT} items"
                )));
            }
            match work {
                QueuedWork::Event(event) => {
                    self.deliver(state, queue, &event, None, log)?;
                }
                QueuedWork::Damage { source, target, amount, side } => {
                    self.resolve_damage(state, queue, log, source, target, amount, side)?;
                }
                QueuedWork::Heal { target, amount } => {
                    self.resolve_heal(state, queue, target, amount);
                }
                QueuedWork::Draw { side, count } => {
                    let hand = &mut state.side_mut(side).hand_size;
                    *hand = hand.saturating_add(count);
                }
            }
        }
        Ok(())
    }

    fn resolve_damage(
        &self,
        state: &mut BattleState,
        queue: &mut VecDeque<QueuedWork>,
        log: &mut DispatchLog,
        source: Option<EntityId>,
        target: EntityId,
        amount: i64,
        side: PlayerId,
    ) -> EngineResult<()> {
        // Target disposed or already down while this was queued.
        let Some(ent) = state.entity(target) else {
            trace!("damage target {target} gone, skipping");
            return Ok(());
        };
        if ent.kind() != EntityKind::Character || ent.is_defeated() {
            return Ok(());
        }

        let mut aggregate = Aggregate::new(AggregateKind::Damage, amount);
        let mut collect = Event::new(EventKind::ModifyDamage, side)
            .with_target(target)
            .with_value(amount);
        if let Some(src) = source {
            collect = collect.with_source(src);
        }
        self.deliver(state, queue, &collect, Some(&mut aggregate), log)?;

        let net = aggregate.net();
        if net == 0 {
            trace!("damage on {target} reduced to nothing");
            return Ok(());
        }
        let Some(ent) = state.entity_mut(target) else {
            return Ok(());
        };
        let applied = net.min(i64::from(i32::MAX)) as i32;
        ent.health = ent.health.saturating_sub(applied);
        let defeated = ent.is_defeated();
        debug!("{target} takes {net} damage{}", if defeated { ", defeated" } else { "" });

        let mut dealt = Event::new(EventKind::DamageDealt, side)
            .with_target(target)
            .with_value(net);
        if let Some(src) = source {
            dealt = dealt.with_source(src);
        }
        queue.push_back(QueuedWork::Event(dealt));

        if defeated {
            // A defeated character keeps its seat but loses its
            // attachments and can no longer act or fire handlers.
            let owner = state.expect_entity(target)?.owner;
            let attachments: Vec<EntityId> = state
                .side(owner)
                .slot(target)
                .map(|s| s.attachments.to_vec())
                .unwrap_or_default();
            for attached in attachments {
                state.dispose(attached)?;
            }
            if state.side(owner).active == Some(target) {
                state.side_mut(owner).active = None;
            }
            queue.push_back(QueuedWork::Event(
                Event::new(EventKind::Defeated, side).with_target(target),
            ));
        }
        Ok(())
    }

    fn resolve_heal(
        &self,
        state: &mut BattleState,
        queue: &mut VecDeque<QueuedWork>,
        target: EntityId,
        amount: i64,
    ) {
        let Some(ent) = state.entity_mut(target) else {
            trace!("heal target {target} gone, skipping");
            return;
        };
        if ent.kind() != EntityKind::Character || ent.is_defeated() {
            return;
        }
        let max = ent.definition().max_health;
        let before = ent.health;
        ent.health = (before + amount as i32).min(max);
        let healed = i64::from(ent.health - before);
        let owner = ent.owner;
        if healed > 0 {
            queue.push_back(QueuedWork::Event(
                Event::new(EventKind::Healed, owner)
                    .with_target(target)
                    .with_value(healed),
            ));
        }
    }

    // === Delivery ===

    /// Every candidate for the event, in battle order, acting side
    /// first. Fixed at delivery time.
    fn candidates(&self, state: &BattleState, event: &Event) -> Vec<EntityId> {
        let sides = [event.side, event.side.opponent()];
        let all = sides
            .iter()
            .flat_map(|&p| state.side(p).ordered_ids());
        match event.scope {
            EventScope::All => all.collect(),
            EventScope::Side(p) => state.side(p).ordered_ids().collect(),
            EventScope::Entity(id) => all.filter(|&e| e == id).collect(),
            EventScope::AttachmentsOf(ch) => {
                let Some(owner) = state.entity(ch).map(|e| e.owner) else {
                    return Vec::new();
                };
                match state.side(owner).slot(ch) {
                    Some(slot) => std::iter::once(ch)
                        .chain(slot.attachments.iter().copied())
                        .collect(),
                    None => Vec::new(),
                }
            }
        }
    }

    fn deliver(
        &self,
        state: &mut BattleState,
        queue: &mut VecDeque<QueuedWork>,
        event: &Event,
        mut aggregate: Option<&mut Aggregate>,
        log: &mut DispatchLog,
    ) -> EngineResult<()> {
        trace!("deliver {:?} (scope {:?})", event.kind, event.scope);
        for candidate in self.candidates(state, event) {
            // Disposed between queueing and delivery: silent skip.
            let Some(ent) = state.entity(candidate) else {
                continue;
            };
            if ent.is_defeated() || !ent.usage_available() {
                continue;
            }
            let info = ent.definition().clone();
            if !info.has_handler(event.kind) {
                continue;
            }

            let mut fired = false;
            for handler in info.handlers_for(event.kind) {
                if !state.is_live(candidate) {
                    // An earlier handler of this same entity disposed it.
                    break;
                }
                if let Some(guard) = &handler.guard {
                    let gctx = GuardContext { state, event, entity: candidate };
                    if !guard(&gctx)? {
                        continue;
                    }
                }
                let mut actx = ActionContext {
                    state,
                    registry: &self.registry,
                    event,
                    entity: candidate,
                    queue,
                    aggregate: aggregate.as_deref_mut(),
                };
                (handler.effect)(&mut actx)?;
                fired = true;
            }

            if fired {
                log.push_back((candidate, event.kind));
                trace!("{candidate} fired on {:?}", event.kind);
                // Usage is consumed once per event, however many of
                // the entity's handlers matched.
                if let Some(ent) = state.entity_mut(candidate) {
                    ent.consume_usage();
                    if ent.used_up() && ent.definition().dispose_when_used_up {
                        let owner = ent.owner;
                        let definition = ent.definition_id();
                        state.dispose(candidate)?;
                        queue.push_back(QueuedWork::Event(
                            Event::new(EventKind::Disposed, owner)
                                .with_target(candidate)
                                .with_definition(definition),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
