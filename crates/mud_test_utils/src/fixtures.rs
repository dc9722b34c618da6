//! Test fixtures and helpers.
//!
//! Pre-built worlds and character templates for consistent testing.

use std::sync::Arc;

use mud_core::prelude::*;

/// The shipped spell catalog, embedded at compile time.
pub const SPELLS_RON: &str = include_str!("../../../assets/data/spells.ron");

/// The shipped engine configuration.
pub const ENGINE_RON: &str = include_str!("../../../assets/data/engine.ron");

/// Parse the shipped spell catalog.
///
/// # Panics
///
/// Panics if the embedded catalog does not load; every test depends on it.
#[must_use]
pub fn standard_catalog() -> Arc<SpellCatalog> {
    match SpellCatalog::from_ron_str(SPELLS_RON) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => panic!("shipped spell catalog is broken: {e}"),
    }
}

/// Parse the shipped engine configuration.
///
/// # Panics
///
/// Panics if the embedded configuration does not load.
#[must_use]
pub fn standard_config() -> EngineConfig {
    match EngineConfig::from_ron_str(ENGINE_RON) {
        Ok(config) => config,
        Err(e) => panic!("shipped engine config is broken: {e}"),
    }
}

/// A player of the given level and class with 100 hit points.
#[must_use]
pub fn player(level: i32, class: Class) -> CharacterSpawn {
    CharacterSpawn {
        name: format!("{class:?}{level}").to_lowercase(),
        is_npc: false,
        level,
        class,
        max_hit: 100,
        max_mana: 20,
        ..CharacterSpawn::default()
    }
}

/// A mobile with the given name, level and hit points.
#[must_use]
pub fn mob(name: &str, level: i32, max_hit: i32) -> CharacterSpawn {
    CharacterSpawn {
        name: name.into(),
        level,
        max_hit,
        ..CharacterSpawn::default()
    }
}

/// An aggressive mobile.
#[must_use]
pub fn aggressive_mob(name: &str, level: i32) -> CharacterSpawn {
    CharacterSpawn {
        mob_flags: MobFlags::AGGRESSIVE,
        ..mob(name, level, 10 * level.max(1))
    }
}

/// One room, an engine and a shared message log.
pub struct Arena {
    /// The engine.
    pub engine: Engine,
    /// The only room to begin with.
    pub room: RoomId,
    /// Every message the engine has produced.
    pub log: MessageLog,
}

impl Arena {
    /// An arena on the default seed.
    #[must_use]
    pub fn new(sector: Sector) -> Self {
        Self::with_config(EngineConfig::default(), sector)
    }

    /// An arena whose random stream starts from `seed`.
    #[must_use]
    pub fn seeded(seed: u64, sector: Sector) -> Self {
        Self::with_config(
            EngineConfig {
                seed,
                ..EngineConfig::default()
            },
            sector,
        )
    }

    /// An arena with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig, sector: Sector) -> Self {
        let (sink, log) = RecordingSink::new();
        let mut engine = Engine::new(config, standard_catalog(), Box::new(sink));
        let room = engine.world_mut().add_room("The arena", sector, RoomFlags::empty());
        Self { engine, room, log }
    }

    /// Spawn into the arena's room.
    ///
    /// # Panics
    ///
    /// Panics if the room has gone missing.
    pub fn spawn(&mut self, spawn: CharacterSpawn) -> CharId {
        match self.engine.spawn_character(spawn, self.room) {
            Ok(id) => id,
            Err(e) => panic!("arena spawn failed: {e}"),
        }
    }

    /// Look up a catalog spell by name.
    ///
    /// # Panics
    ///
    /// Panics if the catalog has no such spell.
    #[must_use]
    pub fn spell(&self, name: &str) -> SpellId {
        match self.engine.catalog().id_of(name) {
            Some(id) => id,
            None => panic!("no spell named {name}"),
        }
    }

    /// Shorthand for a character lookup.
    ///
    /// # Panics
    ///
    /// Panics if the character is gone.
    #[must_use]
    pub fn ch(&self, id: CharId) -> &Character {
        match self.engine.world().character(id) {
            Some(c) => c,
            None => panic!("character {id:?} is gone"),
        }
    }
}

/// A busy world for determinism runs and benchmarks.
///
/// Several rooms, each with a druid grinding a golem down with a delayed
/// spell, a berserker hunting aggressive mobiles, wounded bystanders
/// regenerating, and a handful of timed effects waiting for the sweep.
///
/// # Panics
///
/// Panics if the shipped catalog lacks the spells the fixture casts.
#[must_use]
pub fn skirmish(seed: u64, rooms: usize) -> Engine {
    let config = EngineConfig {
        seed,
        ..standard_config()
    };
    let mut engine = Engine::new(config, standard_catalog(), Box::new(NullSink));
    let doom = engine.catalog().id_of("creeping doom");
    let armor = engine.catalog().id_of("armor");
    let (Some(doom), Some(armor)) = (doom, armor) else {
        panic!("shipped catalog lacks the skirmish spells");
    };

    for n in 0..rooms {
        let room = engine
            .world_mut()
            .add_room(format!("Battlefield {n}"), Sector::Field, RoomFlags::empty());
        let spawn = |engine: &mut Engine, spawn: CharacterSpawn| match engine.spawn_character(spawn, room) {
            Ok(id) => id,
            Err(e) => panic!("skirmish spawn failed: {e}"),
        };

        let druid = spawn(&mut engine, player(60, Class::Druid));
        let golem = spawn(&mut engine, mob("a mud golem", 40, 5000));
        engine.cast(druid, doom, CastTarget::Char(golem), 60);

        let berserker = spawn(&mut engine, player(30, Class::Berserker));
        if let Some(c) = engine.world_mut().character_mut(berserker) {
            c.rage = 600;
        }
        engine.start_berserking(berserker);
        for i in 0..4 {
            spawn(&mut engine, aggressive_mob(&format!("a kobold {i}"), 5 + i));
        }

        let cleric = spawn(&mut engine, player(40, Class::Cleric));
        engine.cast(cleric, armor, CastTarget::None, 40);
        engine.damage(None, cleric, 60);
        engine.set_cooldown(cleric, CooldownKind::ALL[0], 300);
    }
    tracing::debug!(seed, rooms, "skirmish world built");
    engine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_data_loads() {
        let catalog = standard_catalog();
        assert!(catalog.validate().is_empty());
        assert!(catalog.id_of("magic missile").is_some());
        assert_eq!(standard_config().seed, 20_240_601);
    }

    #[test]
    fn test_arena_spawns_in_room() {
        let mut arena = Arena::new(Sector::Field);
        let hero = arena.spawn(player(10, Class::Warrior));
        assert_eq!(arena.ch(hero).room, Some(arena.room));
        assert_eq!(arena.ch(hero).max_hit(), 100);
    }

    #[test]
    fn test_skirmish_has_work_queued() {
        let engine = skirmish(1, 2);
        assert_eq!(engine.world().room_count(), 2);
        assert!(!engine.scheduler().is_empty());
    }
}
