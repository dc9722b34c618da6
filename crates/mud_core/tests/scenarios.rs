//! End-to-end scenarios against the public engine surface.

use mud_core::ai::{is_aggr_to, AggrScan};
use mud_core::damage::damage_evasion;
use mud_core::prelude::*;
use mud_core::rng::GameRng;
use mud_test_utils::fixtures::{aggressive_mob, mob, player, Arena};

fn delayed_casts(engine: &Engine, owner: CharId) -> usize {
    engine
        .scheduler()
        .owned_by(owner)
        .filter(|(_, e)| matches!(e, GameEvent::DelayedCast(_)))
        .count()
}

#[test]
fn test_bless_wears_off_after_three_sweeps() {
    let mut arena = Arena::new(Sector::City);
    let cleric = arena.spawn(player(20, Class::Cleric));
    let acolyte = arena.spawn(mob("an acolyte", 10, 100));
    let bless = arena.spell("bless");

    // Power 10 gives 3 + 10 / 20 = 3 ticks on both records.
    let result = arena.engine.cast(cleric, bless, CastTarget::Char(acolyte), 10);
    assert_eq!(result, CastResult::SUCCESS);
    assert_eq!(arena.log.count_containing("You feel righteous."), 1);

    let records: Vec<_> = arena.ch(acolyte).effects().iter().filter(|e| e.spell == bless).cloned().collect();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|e| e.duration == 3));
    assert!(arena.ch(acolyte).has(EffectFlag::Bless));
    assert_eq!(arena.ch(acolyte).effects().modifier(ApplyLocation::Hitroll), 1);
    assert_eq!(arena.ch(acolyte).effects().modifier(ApplyLocation::SaveSpell), -2);

    let first = arena.engine.effect_sweep();
    let second = arena.engine.effect_sweep();
    assert_eq!(first.wear_offs + second.wear_offs, 0);
    assert!(arena.ch(acolyte).has(EffectFlag::Bless));

    let third = arena.engine.effect_sweep();
    assert_eq!(third.expired, 2);
    assert_eq!(third.wear_offs, 1);
    assert!(!arena.ch(acolyte).has(EffectFlag::Bless));
    assert!(!arena.ch(acolyte).affected_by(bless));
    assert_eq!(arena.ch(acolyte).effects().modifier(ApplyLocation::Hitroll), 0);
    assert_eq!(arena.log.count_containing("You feel less righteous."), 1);
}

#[test]
fn test_recast_bless_joins_without_duplicating() {
    let mut arena = Arena::new(Sector::City);
    let cleric = arena.spawn(player(20, Class::Cleric));
    let acolyte = arena.spawn(mob("an acolyte", 10, 100));
    let bless = arena.spell("bless");

    arena.engine.cast(cleric, bless, CastTarget::Char(acolyte), 10);
    arena.engine.effect_sweep();
    arena.engine.cast(cleric, bless, CastTarget::Char(acolyte), 10);

    let count = arena.ch(acolyte).effects().iter().filter(|e| e.spell == bless).count();
    assert_eq!(count, 2);
    assert_eq!(arena.ch(acolyte).effects().modifier(ApplyLocation::Hitroll), 1);
}

#[test]
fn test_ether_body_evades_unblessed_blades() {
    let mut arena = Arena::new(Sector::City);
    let ghost = arena.spawn(CharacterSpawn {
        composition: Composition::Ether,
        ..mob("a ghost", 20, 200)
    });
    let soldier = arena.spawn(player(20, Class::Warrior));
    let mut rng = GameRng::seeded(99);
    let world = arena.engine.world();
    let (Some(ghost), Some(soldier)) = (world.character(ghost), world.character(soldier)) else {
        panic!("fixture characters missing");
    };
    for _ in 0..500 {
        assert!(damage_evasion(ghost, Some(soldier), None, DamageType::Slash, &mut rng));
    }
}

#[test]
fn test_blessed_blade_strikes_ether() {
    let mut arena = Arena::new(Sector::City);
    let ghost = arena.spawn(CharacterSpawn {
        composition: Composition::Ether,
        ..mob("a ghost", 20, 200)
    });
    let paladin = arena.spawn(player(20, Class::Paladin));
    let bless = arena.spell("bless");
    arena
        .engine
        .world_mut()
        .apply_effect(paladin, Effect::new(bless, 3).with_flag(EffectFlag::Bless), JoinMode::REFRESH)
        .unwrap();
    let mut rng = GameRng::seeded(4);
    let world = arena.engine.world();
    let (Some(ghost), Some(paladin)) = (world.character(ghost), world.character(paladin)) else {
        panic!("fixture characters missing");
    };
    assert!(!damage_evasion(ghost, Some(paladin), None, DamageType::Slash, &mut rng));
}

#[test]
fn test_aggressive_mob_spares_its_own_group() {
    let mut arena = Arena::new(Sector::Forest);
    let ranger = arena.spawn(player(30, Class::Ranger));
    let wolf = arena.spawn(aggressive_mob("a dire wolf", 20));
    let stranger = arena.spawn(player(30, Class::Thief));
    arena.engine.world_mut().join_group(wolf, ranger).unwrap();

    let world = arena.engine.world();
    let config = arena.engine.config();
    assert!(!is_aggr_to(world, config, wolf, ranger));
    assert!(is_aggr_to(world, config, wolf, stranger));
    assert_eq!(arena.engine.find_aggr_target(wolf), Some(stranger));
}

#[test]
fn test_delayed_cast_survives_victim_extraction() {
    let mut arena = Arena::new(Sector::Field);
    let druid = arena.spawn(player(60, Class::Druid));
    let golem = arena.spawn(mob("a mud golem", 30, 100_000));
    let doom = arena.spell("creeping doom");

    arena.engine.cast(druid, doom, CastTarget::Char(golem), 60);
    assert_eq!(delayed_casts(&arena.engine, druid), 1);

    arena.engine.advance(20);
    assert_eq!(delayed_casts(&arena.engine, druid), 1);
    let removed = arena.engine.extract_character(golem);
    assert!(removed.is_some());

    arena.engine.advance(20);
    assert_eq!(delayed_casts(&arena.engine, druid), 0);
    assert!(arena.engine.is_alive(druid));
    assert!(arena.engine.scheduler().owned_by(golem).next().is_none());
}

fn crowd(seed: u64, intelligence: i32) -> (Arena, CharId) {
    let mut arena = Arena::seeded(seed, Sector::City);
    let hunter = arena.spawn(CharacterSpawn {
        stats: Stats {
            intelligence,
            ..Stats::default()
        },
        ..aggressive_mob("a bandit chief", 40)
    });
    for n in 0..25 {
        arena.spawn(CharacterSpawn {
            name: format!("traveller{n}"),
            ..player(10, Class::Layman)
        });
    }
    (arena, hunter)
}

fn sample(arena: &mut Arena, hunter: CharId) -> Vec<CharId> {
    match arena.engine.scan_aggr_targets(hunter) {
        AggrScan::Candidates(found) => found.into_iter().map(|(id, _)| id).collect(),
        other => panic!("expected candidates, got {other:?}"),
    }
}

#[test]
fn test_aggression_sample_is_bounded_and_reproducible() {
    let (mut a, hunter_a) = crowd(42, 60);
    let (mut b, hunter_b) = crowd(42, 60);
    let k = a.engine.config().targeting_k;
    let expected = usize::try_from((60 * k / 100).max(1)).unwrap();

    let picked_a = sample(&mut a, hunter_a);
    let picked_b = sample(&mut b, hunter_b);
    assert_eq!(picked_a.len(), expected);
    assert_eq!(picked_a, picked_b);

    let mut unique = picked_a.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), picked_a.len());
}

#[test]
fn test_dull_hunter_still_samples_one() {
    let (mut arena, hunter) = crowd(3, 5);
    assert_eq!(sample(&mut arena, hunter).len(), 1);
}
