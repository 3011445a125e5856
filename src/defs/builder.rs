//! Authoring surface for card definitions.
//!
//! `DefinitionBuilder` is the declarative registration call the rule
//! authoring layer uses: type tag, cost, usage defaults, a version
//! range, and zero or more (event, optional guard, effect) triples in
//! source order.
//!
//! Builders are transient. `register` consumes the builder by value
//! and compiles it into an immutable `EntityInfo`; nothing
//! authoring-time survives once the table is built.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{DefinitionId, EngineResult, GameVersion, VersionRange};
use crate::dispatch::{ActionContext, EventKind, GuardContext};

use super::definition::{EntityInfo, EntityKind};
use super::handler::HandlerEntry;
use super::registry::RuleRegistry;

/// Fluent builder for one `EntityInfo`.
///
/// ## Example
///
/// ```
/// use tcg_core::core::DefinitionId;
/// use tcg_core::defs::{DefinitionBuilder, RuleRegistry};
/// use tcg_core::dispatch::EventKind;
///
/// let mut registry = RuleRegistry::new();
/// DefinitionBuilder::summon(DefinitionId::new(115011), "Large Wind Spirit")
///     .usage(3)
///     .vanish_when_used_up()
///     .on(EventKind::RoundEnd, |ctx| {
///         let target = ctx.opposing_active()?;
///         ctx.deal_damage(target, 2);
///         Ok(())
///     })
///     .register(&mut registry)
///     .unwrap();
/// ```
#[must_use]
pub struct DefinitionBuilder {
    id: DefinitionId,
    kind: EntityKind,
    name: String,
    description: String,
    cost: i32,
    max_health: i32,
    usage: Option<i32>,
    usage_per_round: Option<i32>,
    dispose_when_used_up: bool,
    initial_value: i64,
    var_caps: FxHashMap<String, i32>,
    range: VersionRange,
    handlers: Vec<HandlerEntry>,
}

impl DefinitionBuilder {
    /// Start a definition with an explicit kind.
    pub fn new(id: DefinitionId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            description: String::new(),
            cost: 0,
            max_health: 0,
            usage: None,
            usage_per_round: None,
            dispose_when_used_up: false,
            initial_value: 0,
            var_caps: FxHashMap::default(),
            range: VersionRange::any(),
            handlers: Vec::new(),
        }
    }

    /// Start a character definition.
    pub fn character(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Character, name)
    }

    /// Start an equipment definition.
    pub fn equipment(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Equipment, name)
    }

    /// Start a character status definition.
    pub fn status(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Status, name)
    }

    /// Start a combat (side-wide) status definition.
    pub fn combat_status(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::CombatStatus, name)
    }

    /// Start a summon definition.
    pub fn summon(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Summon, name)
    }

    /// Start a support definition.
    pub fn support(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Support, name)
    }

    /// Start a skill definition.
    pub fn skill(id: DefinitionId, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Skill, name)
    }

    /// Set the dice cost.
    pub fn cost(mut self, cost: i32) -> Self {
        self.cost = cost;
        self
    }

    /// Set maximum health (characters).
    pub fn health(mut self, max_health: i32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Set the total usage budget.
    pub fn usage(mut self, usage: i32) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set the per-round usage budget.
    pub fn usage_per_round(mut self, usage: i32) -> Self {
        self.usage_per_round = Some(usage);
        self
    }

    /// Dispose instances when total usage reaches zero.
    pub fn vanish_when_used_up(mut self) -> Self {
        self.dispose_when_used_up = true;
        self
    }

    /// Set the initial free-form value for new instances.
    pub fn initial_value(mut self, value: i64) -> Self {
        self.initial_value = value;
        self
    }

    /// Declare a capped variable. Increments past the cap clamp.
    pub fn var_cap(mut self, name: impl Into<String>, cap: i32) -> Self {
        self.var_caps.insert(name.into(), cap);
        self
    }

    /// Set the full version range.
    pub fn range(mut self, range: VersionRange) -> Self {
        self.range = range;
        self
    }

    /// Set the inclusive lower version bound.
    pub fn since(mut self, version: GameVersion) -> Self {
        self.range.since = Some(version);
        self
    }

    /// Set the exclusive upper version bound.
    pub fn until(mut self, version: GameVersion) -> Self {
        self.range.until = Some(version);
        self
    }

    /// Attach opaque display metadata.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Register an unguarded handler. Source order is preserved.
    pub fn on<F>(mut self, event: EventKind, effect: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> EngineResult<()> + Send + Sync + 'static,
    {
        self.handlers.push(HandlerEntry::new(event, Arc::new(effect)));
        self
    }

    /// Register a handler with an infallible guard.
    pub fn on_if<G, F>(mut self, event: EventKind, guard: G, effect: F) -> Self
    where
        G: Fn(&GuardContext<'_>) -> bool + Send + Sync + 'static,
        F: Fn(&mut ActionContext<'_>) -> EngineResult<()> + Send + Sync + 'static,
    {
        self.handlers.push(HandlerEntry::guarded(
            event,
            Arc::new(move |ctx: &GuardContext<'_>| Ok(guard(ctx))),
            Arc::new(effect),
        ));
        self
    }

    /// Register a handler with a fallible guard. Guard errors abort
    /// the dispatch as `InvalidMutation`.
    pub fn on_try<G, F>(mut self, event: EventKind, guard: G, effect: F) -> Self
    where
        G: Fn(&GuardContext<'_>) -> EngineResult<bool> + Send + Sync + 'static,
        F: Fn(&mut ActionContext<'_>) -> EngineResult<()> + Send + Sync + 'static,
    {
        self.handlers
            .push(HandlerEntry::guarded(event, Arc::new(guard), Arc::new(effect)));
        self
    }

    /// Compile into an immutable `EntityInfo`, consuming the builder.
    #[must_use]
    pub fn build(self) -> EntityInfo {
        EntityInfo {
            id: self.id,
            kind: self.kind,
            name: self.name,
            description: self.description,
            cost: self.cost,
            max_health: self.max_health,
            usage: self.usage,
            usage_per_round: self.usage_per_round,
            dispose_when_used_up: self.dispose_when_used_up,
            initial_value: self.initial_value,
            var_caps: self.var_caps,
            range: self.range,
            handlers: self.handlers,
        }
    }

    /// Compile and register in one step, consuming the builder.
    pub fn register(self, registry: &mut RuleRegistry) -> EngineResult<()> {
        registry.register(self.build())
    }
}
