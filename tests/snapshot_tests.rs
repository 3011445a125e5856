//! Snapshot isolation tests.
//!
//! A snapshot must be a fully independent copy: mutating it never
//! shows through to the parent, two snapshots never alias each other,
//! and the copied RNG continues the parent's exact dice stream.

use std::sync::Arc;

use proptest::prelude::*;

use tcg_core::battle::BattleState;
use tcg_core::core::{DefinitionId, GameVersion, PlayerId};
use tcg_core::defs::{DefinitionBuilder, RuleRegistry};
use tcg_core::dispatch::{Dispatcher, EventKind, PlayerAction};

const V4: GameVersion = GameVersion::new(4, 0, 0);

const FIGHTER: DefinitionId = DefinitionId::new(1);
const STRIKE: DefinitionId = DefinitionId::new(2);
const SPIRIT: DefinitionId = DefinitionId::new(3);

fn registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    DefinitionBuilder::character(FIGHTER, "Fighter")
        .health(10)
        .register(&mut registry)
        .unwrap();
    DefinitionBuilder::skill(STRIKE, "Strike")
        .cost(1)
        .on_if(
            EventKind::UseSkill,
            |g| g.self_sourced(),
            |ctx| {
                let target = ctx.opposing_active()?;
                ctx.deal_damage(target, 2);
                Ok(())
            },
        )
        .register(&mut registry)
        .unwrap();
    DefinitionBuilder::summon(SPIRIT, "Spirit")
        .usage(2)
        .on(EventKind::RoundEnd, |ctx| {
            let target = ctx.opposing_active()?;
            ctx.deal_damage(target, 1);
            Ok(())
        })
        .register(&mut registry)
        .unwrap();
    registry
}

fn battle(seed: u64) -> (Dispatcher, BattleState) {
    let registry = registry();
    let mut state = BattleState::new(V4, seed);
    for side in PlayerId::both() {
        let ch = state.spawn(&registry, FIGHTER, side).unwrap();
        let sk = state.spawn(&registry, STRIKE, side).unwrap();
        state.attach(sk, ch).unwrap();
        state.side_mut(side).dice = 8;
    }
    state.spawn(&registry, SPIRIT, PlayerId::P1).unwrap();
    (Dispatcher::new(Arc::new(registry)), state)
}

/// `simulate` resolves against a copy; the parent state is untouched.
#[test]
fn test_simulate_leaves_original_untouched() {
    let (dispatcher, state) = battle(42);
    let ch0 = state.side(PlayerId::P0).active.unwrap();
    let sk0 = state.side(PlayerId::P0).slot(ch0).unwrap().attachments[0];
    let ch1 = state.side(PlayerId::P1).active.unwrap();
    let before = tcg_core::export::to_bytes(&tcg_core::export::project(&state)).unwrap();

    let (speculative, log) = dispatcher
        .simulate(&state, PlayerId::P0, &PlayerAction::UseSkill { character: ch0, skill: sk0 })
        .unwrap();

    assert_eq!(speculative.entity(ch1).unwrap().health, 8);
    assert!(!log.is_empty());
    let after = tcg_core::export::to_bytes(&tcg_core::export::project(&state)).unwrap();
    assert_eq!(before, after);
    assert_eq!(state.entity(ch1).unwrap().health, 10);
}

/// Running a full cascade on the snapshot mutates collections, usage
/// counters, and health without touching the parent.
#[test]
fn test_cascade_on_snapshot_is_isolated() {
    let (dispatcher, state) = battle(7);
    let ch0 = state.side(PlayerId::P0).active.unwrap();

    let mut snap = state.snapshot();
    dispatcher.end_round(&mut snap).unwrap();

    assert_eq!(snap.entity(ch0).unwrap().health, 9);
    assert_eq!(snap.round, 2);
    assert_eq!(state.entity(ch0).unwrap().health, 10);
    assert_eq!(state.round, 1);
}

/// A snapshot's RNG continues the parent's exact stream.
#[test]
fn test_snapshot_rng_continues_parent_stream() {
    let (_, mut state) = battle(42);
    for _ in 0..17 {
        state.rng.roll_die();
    }

    let mut snap = state.snapshot();
    let parent: Vec<_> = (0..32).map(|_| state.rng.roll_die()).collect();
    let copied: Vec<_> = (0..32).map(|_| snap.rng.roll_die()).collect();
    assert_eq!(parent, copied);
}

proptest! {
    /// Arbitrary variable churn on a snapshot never leaks to the
    /// parent or to a sibling snapshot.
    #[test]
    fn prop_snapshot_isolation(
        seed in any::<u64>(),
        deltas in prop::collection::vec(-5i32..5, 1..8),
    ) {
        let (_, state) = battle(seed);
        let ch0 = state.side(PlayerId::P0).active.unwrap();

        let mut a = state.snapshot();
        let mut b = state.snapshot();
        for (i, delta) in deltas.iter().enumerate() {
            a.entity_mut(ch0).unwrap().vars.add("layer", *delta, None);
            a.entity_mut(ch0).unwrap().health -= 1;
            if i % 2 == 0 {
                b.side_mut(PlayerId::P1).dice = b.side(PlayerId::P1).dice.saturating_sub(1);
            }
        }

        prop_assert_eq!(state.entity(ch0).unwrap().vars.get("layer"), 0);
        prop_assert_eq!(state.entity(ch0).unwrap().health, 10);
        prop_assert_eq!(state.side(PlayerId::P1).dice, 8);
        prop_assert_eq!(b.entity(ch0).unwrap().vars.get("layer"), 0);
        prop_assert_eq!(b.entity(ch0).unwrap().health, 10);
        let expected: i32 = deltas.iter().sum();
        prop_assert_eq!(a.entity(ch0).unwrap().vars.get("layer"), expected);
    }

    /// Simulating the same action from the same state twice gives
    /// byte-identical results.
    #[test]
    fn prop_simulate_deterministic(seed in any::<u64>()) {
        let (dispatcher, state) = battle(seed);
        let ch0 = state.side(PlayerId::P0).active.unwrap();
        let sk0 = state.side(PlayerId::P0).slot(ch0).unwrap().attachments[0];
        let action = PlayerAction::UseSkill { character: ch0, skill: sk0 };

        let (s1, l1) = dispatcher.simulate(&state, PlayerId::P0, &action).unwrap();
        let (s2, l2) = dispatcher.simulate(&state, PlayerId::P0, &action).unwrap();

        prop_assert_eq!(l1, l2);
        let b1 = tcg_core::export::to_bytes(&tcg_core::export::project(&s1)).unwrap();
        let b2 = tcg_core::export::to_bytes(&tcg_core::export::project(&s2)).unwrap();
        prop_assert_eq!(b1, b2);
    }
}
