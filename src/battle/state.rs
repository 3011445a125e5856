//! The root battle aggregate.
//!
//! `BattleState` owns every live entity, the two player sides, and the
//! shared round/phase/turn counters. All structural mutation (spawn,
//! attach, detach, dispose) goes through it so the invariants hold:
//! entity ids are unique, every attachment's master resolves to a live
//! character on the same side, and usage counters never go negative.
//!
//! `snapshot` produces an independent deep copy for speculative
//! lookahead; the shared `EntityInfo` arcs are the only aliasing, and
//! they are immutable.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{
    DefinitionId, DiceRng, EngineError, EngineResult, EntityId, GameVersion, PlayerId, PlayerPair,
};
use crate::defs::{EntityKind, RuleRegistry};

use super::entity::Entity;
use super::player::{CharacterSlot, PlayerSide};

/// The phase within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Dice rolling at the start of a round.
    Roll,
    /// Players alternate actions.
    #[default]
    Action,
    /// End-of-round resolution.
    End,
}

/// Complete state of one battle.
#[derive(Clone, Debug)]
pub struct BattleState {
    version: GameVersion,
    /// Round number, starting at 1.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    /// The side whose action is being resolved.
    pub turn: PlayerId,
    sides: PlayerPair<PlayerSide>,
    entities: FxHashMap<EntityId, Entity>,
    next_entity_id: u32,
    /// Deterministic dice RNG.
    pub rng: DiceRng,
}

impl BattleState {
    /// Create a new battle at the given rules version.
    #[must_use]
    pub fn new(version: GameVersion, seed: u64) -> Self {
        Self {
            version,
            round: 1,
            phase: Phase::default(),
            turn: PlayerId::P0,
            sides: PlayerPair::with_default(),
            entities: FxHashMap::default(),
            next_entity_id: 1,
            rng: DiceRng::new(seed),
        }
    }

    /// The rules version this battle resolves against.
    #[must_use]
    pub fn version(&self) -> GameVersion {
        self.version
    }

    /// One side's state.
    #[must_use]
    pub fn side(&self, player: PlayerId) -> &PlayerSide {
        &self.sides[player]
    }

    /// One side's mutable state.
    pub fn side_mut(&mut self, player: PlayerId) -> &mut PlayerSide {
        &mut self.sides[player]
    }

    // === Entity lifecycle ===

    fn alloc_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    /// Create a live entity from a definition id and place it in the
    /// owner's collections.
    ///
    /// Fails with the registry's resolution errors when the id has no
    /// definition at this battle's version. Attachment kinds
    /// (equipment/status/skill) are created unattached; they join
    /// dispatch once `attach`ed to a character.
    pub fn spawn(
        &mut self,
        registry: &RuleRegistry,
        definition: DefinitionId,
        owner: PlayerId,
    ) -> EngineResult<EntityId> {
        let info = registry.resolve(definition, self.version)?.clone();
        let entity_id = self.alloc_entity_id();
        let kind = info.kind;
        let entity = Entity::from_info(entity_id, info, owner);
        self.entities.insert(entity_id, entity);

        let side = &mut self.sides[owner];
        match kind {
            EntityKind::Character => {
                side.characters.push(CharacterSlot::new(entity_id));
                if side.active.is_none() {
                    side.active = Some(entity_id);
                }
            }
            EntityKind::CombatStatus => side.combat_statuses.push(entity_id),
            EntityKind::Summon => side.summons.push(entity_id),
            EntityKind::Support => side.supports.push(entity_id),
            EntityKind::Equipment | EntityKind::Status | EntityKind::Skill => {}
        }
        Ok(entity_id)
    }

    /// Attach an equipment/status/skill entity to a master character.
    ///
    /// The master must be a live character owned by the same side.
    pub fn attach(&mut self, entity: EntityId, master: EntityId) -> EngineResult<()> {
        let (kind, owner) = {
            let ent = self.expect_entity(entity)?;
            (ent.kind(), ent.owner)
        };
        if !kind.is_attachment() {
            return Err(EngineError::invalid(format!(
                "{entity} is a {kind:?}, not an attachment"
            )));
        }
        let master_ent = self
            .entities
            .get(&master)
            .ok_or_else(|| EngineError::invalid(format!("master {master} does not exist")))?;
        if master_ent.kind() != EntityKind::Character || master_ent.owner != owner {
            return Err(EngineError::invalid(format!(
                "master {master} is not a live character on {owner}"
            )));
        }

        let side = &mut self.sides[owner];
        let slot = side
            .slot_mut(master)
            .ok_or_else(|| EngineError::invalid(format!("{master} has no seat")))?;
        slot.attachments.push(entity);
        if let Some(ent) = self.entities.get_mut(&entity) {
            ent.master = Some(master);
        }
        Ok(())
    }

    /// Detach an entity from its master without disposing it.
    pub fn detach(&mut self, entity: EntityId) -> EngineResult<()> {
        let (owner, master) = {
            let ent = self.expect_entity(entity)?;
            (ent.owner, ent.master)
        };
        let master = master
            .ok_or_else(|| EngineError::invalid(format!("{entity} is not attached")))?;
        if let Some(slot) = self.sides[owner].slot_mut(master) {
            slot.attachments.retain(|e| *e != entity);
        }
        if let Some(ent) = self.entities.get_mut(&entity) {
            ent.master = None;
        }
        Ok(())
    }

    /// Dispose an entity, removing it from the battle.
    ///
    /// Disposing a character also disposes its attachments. Disposing
    /// an entity that is already gone is an `InvalidMutation`.
    pub fn dispose(&mut self, entity: EntityId) -> EngineResult<()> {
        let ent = self
            .entities
            .remove(&entity)
            .ok_or_else(|| EngineError::invalid(format!("{entity} is already disposed")))?;
        let owner = ent.owner;

        if ent.kind() == EntityKind::Character {
            let attachments: Vec<EntityId> = self.sides[owner]
                .slot(entity)
                .map(|s| s.attachments.to_vec())
                .unwrap_or_default();
            for attached in attachments {
                self.entities.remove(&attached);
            }
        }
        self.sides[owner].remove(entity);
        Ok(())
    }

    // === Lookup ===

    /// Look up a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up a live entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Look up a live entity, erroring when disposed or unknown.
    pub fn expect_entity(&self, id: EntityId) -> EngineResult<&Entity> {
        self.entities
            .get(&id)
            .ok_or_else(|| EngineError::invalid(format!("{id} is not a live entity")))
    }

    /// Whether an entity is still live.
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The active character of a side.
    #[must_use]
    pub fn active_character(&self, player: PlayerId) -> Option<&Entity> {
        self.sides[player].active.and_then(|id| self.entity(id))
    }

    // === Round bookkeeping ===

    /// Reset every live entity's per-round usage to its definition
    /// default. Runs unconditionally at the action-phase boundary,
    /// before any other action-phase effect resolves.
    pub fn reset_usage_per_round(&mut self) {
        for entity in self.entities.values_mut() {
            entity.reset_usage_per_round();
        }
    }

    /// Advance to the next round: bump the counter, clear declared-end
    /// flags, return to the roll phase.
    pub fn advance_round(&mut self) {
        self.round += 1;
        self.phase = Phase::Roll;
        for (_, side) in self.sides.iter_mut() {
            side.declared_end = false;
        }
    }

    // === Snapshot ===

    /// Produce an independent deep copy for speculative evaluation.
    ///
    /// Mutating the snapshot never aliases back: every entity's
    /// mutable fields are copied, only the immutable `EntityInfo` arcs
    /// are shared. The RNG position is copied verbatim so lookahead
    /// sees the same dice stream the real continuation would.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::DefinitionBuilder;

    const V4: GameVersion = GameVersion::new(4, 0, 0);

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        DefinitionBuilder::character(DefinitionId::new(1), "Fighter")
            .health(10)
            .register(&mut registry)
            .unwrap();
        DefinitionBuilder::equipment(DefinitionId::new(2), "Blade")
            .usage_per_round(1)
            .register(&mut registry)
            .unwrap();
        DefinitionBuilder::summon(DefinitionId::new(3), "Spirit")
            .usage(2)
            .register(&mut registry)
            .unwrap();
        registry
    }

    #[test]
    fn test_spawn_unknown_definition() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let err = state
            .spawn(&registry, DefinitionId::new(99), PlayerId::P0)
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownDefinition(DefinitionId::new(99)));
    }

    #[test]
    fn test_spawn_places_by_kind() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);

        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();
        let su = state.spawn(&registry, DefinitionId::new(3), PlayerId::P0).unwrap();

        assert_eq!(state.side(PlayerId::P0).characters.len(), 1);
        assert_eq!(state.side(PlayerId::P0).summons, vec![su]);
        // First character becomes active
        assert_eq!(state.side(PlayerId::P0).active, Some(ch));
        assert_ne!(ch, su); // ids unique
    }

    #[test]
    fn test_attach_requires_live_character_master() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);

        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();
        let eq = state.spawn(&registry, DefinitionId::new(2), PlayerId::P0).unwrap();

        state.attach(eq, ch).unwrap();
        assert_eq!(state.entity(eq).unwrap().master, Some(ch));
        assert_eq!(state.side(PlayerId::P0).slot(ch).unwrap().attachments.to_vec(), vec![eq]);

        // Attaching to a non-existent master fails
        let eq2 = state.spawn(&registry, DefinitionId::new(2), PlayerId::P0).unwrap();
        let err = state.attach(eq2, EntityId(999)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMutation(_)));
    }

    #[test]
    fn test_detach_keeps_entity_live() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();
        let eq = state.spawn(&registry, DefinitionId::new(2), PlayerId::P0).unwrap();
        state.attach(eq, ch).unwrap();

        state.detach(eq).unwrap();
        assert!(state.is_live(eq));
        assert_eq!(state.entity(eq).unwrap().master, None);
        assert!(state.side(PlayerId::P0).slot(ch).unwrap().attachments.is_empty());

        // Detaching an unattached entity is invalid.
        let err = state.detach(eq).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMutation(_)));
    }

    #[test]
    fn test_dispose_twice_is_invalid() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let su = state.spawn(&registry, DefinitionId::new(3), PlayerId::P0).unwrap();

        state.dispose(su).unwrap();
        assert!(!state.is_live(su));
        let err = state.dispose(su).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMutation(_)));
    }

    #[test]
    fn test_dispose_character_takes_attachments() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();
        let eq = state.spawn(&registry, DefinitionId::new(2), PlayerId::P0).unwrap();
        state.attach(eq, ch).unwrap();

        state.dispose(ch).unwrap();
        assert!(!state.is_live(ch));
        assert!(!state.is_live(eq));
        assert!(state.side(PlayerId::P0).characters.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();

        let mut snap = state.snapshot();
        snap.entity_mut(ch).unwrap().health = 1;
        snap.entity_mut(ch).unwrap().vars.set("mark", 3, None);
        snap.side_mut(PlayerId::P1).dice = 7;

        assert_eq!(state.entity(ch).unwrap().health, 10);
        assert_eq!(state.entity(ch).unwrap().vars.get("mark"), 0);
        assert_eq!(state.side(PlayerId::P1).dice, 0);
    }

    #[test]
    fn test_two_snapshots_share_nothing_mutable() {
        let registry = registry();
        let mut state = BattleState::new(V4, 1);
        let ch = state.spawn(&registry, DefinitionId::new(1), PlayerId::P0).unwrap();

        let mut a = state.snapshot();
        let mut b = state.snapshot();
        a.entity_mut(ch).unwrap().health = 2;
        b.entity_mut(ch).unwrap().health = 8;

        assert_eq!(a.entity(ch).unwrap().health, 2);
        assert_eq!(b.entity(ch).unwrap().health, 8);
        assert_eq!(state.entity(ch).unwrap().health, 10);
    }

    #[test]
    fn test_advance_round_clears_declared_end() {
        let mut state = BattleState::new(V4, 1);
        state.side_mut(PlayerId::P0).declared_end = true;
        state.side_mut(PlayerId::P1).declared_end = true;

        state.advance_round();
        assert_eq!(state.round, 2);
        assert_eq!(state.phase, Phase::Roll);
        assert!(!state.side(PlayerId::P0).declared_end);
        assert!(!state.side(PlayerId::P1).declared_end);
    }
}
