//! Routine dispatch through the public casting surface.

use std::sync::Arc;

use mud_core::magic::SpellContext;
use mud_core::prelude::*;
use mud_test_utils::fixtures::{mob, player, Arena};

const CUSTOM: &str = r#"SpellCatalog(spells: [
    SpellData(
        id: 200,
        name: "beacon",
        routines: "MANUAL",
        targets: "IGNORE",
    ),
    SpellData(
        id: 201,
        name: "smite",
        routines: "DAMAGE | MANUAL",
        targets: "CHAR_ROOM",
        damage: Some(DamageSpec(formula: Const(1000))),
    ),
    SpellData(
        id: 202,
        name: "spark",
        routines: "DAMAGE",
        targets: "CHAR_ROOM | OBJ_ROOM",
        damage: Some(DamageSpec(formula: Const(5))),
    ),
])"#;

#[derive(Debug)]
struct Flare;

impl SpellEffectHandler for Flare {
    fn manual(&self, engine: &mut Engine, cast: &SpellContext) -> CastResult {
        engine.act("A beacon flares above you.", Some(cast.caster), None, Audience::Actor);
        CastResult::SUCCESS
    }
}

struct Rig {
    engine: Engine,
    room: RoomId,
    log: MessageLog,
}

fn rig() -> Rig {
    let catalog = Arc::new(SpellCatalog::from_ron_str(CUSTOM).unwrap());
    let mut handlers = HandlerRegistry::standard(&catalog);
    for name in ["beacon", "smite"] {
        handlers.register(catalog.require(name).unwrap(), Arc::new(Flare));
    }
    let (sink, log) = RecordingSink::new();
    let mut engine = Engine::with_handlers(EngineConfig::default(), catalog, handlers, Box::new(sink));
    let room = engine
        .world_mut()
        .add_room("A chapel", Sector::Structure, RoomFlags::empty());
    Rig { engine, room, log }
}

#[test]
fn test_manual_routine_runs_registered_handler() {
    let mut rig = rig();
    let priest = rig.engine.spawn_character(player(20, Class::Priest), rig.room).unwrap();
    let beacon = rig.engine.catalog().require("beacon").unwrap();

    let result = rig.engine.cast(priest, beacon, CastTarget::None, 50);
    assert_eq!(result, CastResult::SUCCESS);
    assert_eq!(rig.log.count_containing("A beacon flares"), 1);
}

#[test]
fn test_lethal_damage_skips_later_routines() {
    let mut rig = rig();
    let priest = rig.engine.spawn_character(player(20, Class::Priest), rig.room).unwrap();
    let rat = rig.engine.spawn_character(mob("a rat", 1, 5), rig.room).unwrap();
    let smite = rig.engine.catalog().require("smite").unwrap();

    let result = rig.engine.cast(priest, smite, CastTarget::Char(rat), 50);
    assert!(result.contains(CastResult::SUCCESS));
    assert!(!rig.engine.is_alive(rat));
    assert_eq!(rig.log.count_containing("A beacon flares"), 0);
}

#[test]
fn test_surviving_victim_runs_every_routine() {
    let mut rig = rig();
    let priest = rig.engine.spawn_character(player(20, Class::Priest), rig.room).unwrap();
    let giant = rig
        .engine
        .spawn_character(mob("a hill giant", 40, 50_000), rig.room)
        .unwrap();
    let smite = rig.engine.catalog().require("smite").unwrap();

    rig.engine.cast(priest, smite, CastTarget::Char(giant), 50);
    assert!(rig.engine.is_alive(giant));
    assert!(rig.engine.world().character(giant).unwrap().hit < 50_000);
    assert_eq!(rig.log.count_containing("A beacon flares"), 1);
}

#[test]
fn test_object_target_skips_character_routines() {
    let mut rig = rig();
    let priest = rig.engine.spawn_character(player(20, Class::Priest), rig.room).unwrap();
    let crate_ = rig
        .engine
        .world_mut()
        .spawn_object(
            ObjectSpawn {
                name: "a wooden crate".into(),
                ..ObjectSpawn::default()
            },
            ObjLocation::Room(rig.room),
        )
        .unwrap();
    let spark = rig.engine.catalog().require("spark").unwrap();

    let result = rig.engine.cast(priest, spark, CastTarget::Obj(crate_), 50);
    assert!(result.is_empty());
    assert!(rig.engine.world().object(crate_).is_some());
    assert_eq!(rig.engine.world().character(priest).unwrap().hit, 100);
}

#[test]
fn test_missing_victim_is_refused() {
    let mut rig = rig();
    let priest = rig.engine.spawn_character(player(20, Class::Priest), rig.room).unwrap();
    let spark = rig.engine.catalog().require("spark").unwrap();
    let gone = rig.engine.spawn_character(mob("a wisp", 1, 1), rig.room).unwrap();
    rig.engine.extract_character(gone);

    assert!(rig.engine.cast(priest, spark, CastTarget::Char(gone), 50).is_empty());
}

#[test]
fn test_area_spells_need_company() {
    let mut arena = Arena::new(Sector::Field);
    let druid = arena.spawn(player(50, Class::Druid));
    for name in ["earthquake", "nightmare", "group armor"] {
        let spell = arena.spell(name);
        let result = arena.engine.cast(druid, spell, CastTarget::None, 60);
        assert_eq!(result, CastResult::CHARGE, "{name}");
    }
    assert_eq!(arena.ch(druid).hit, 100);
}
