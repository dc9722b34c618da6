//! # MUD Core
//!
//! Deterministic effect and magic resolution engine for a text MUD.
//!
//! This crate contains **only** the rules of play:
//! - No sockets
//! - No persistence
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless hosting with a pulse loop driven from outside
//! - Data-driven spells loaded from RON
//! - Replayable fights from a seed
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`components`] - Handles, levels, stances and other plain data
//! - [`flags`] - Status, mobile, room and routine flag sets
//! - [`effects`] - Timed effects and the per-holder effect list
//! - [`world`] - Rooms, characters, objects and room conditions
//! - [`engine`] - The pulse loop, damage and death
//! - [`magic`] - Spell casting and the routine dispatcher
//! - [`data`] - Spell catalog definitions
//! - [`regen`] - Regeneration, rage and cooldown timers
//! - [`ai`] - Mobile aggression and target appraisal
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod character;
pub mod combat;
pub mod components;
pub mod composition;
pub mod config;
pub mod cooldowns;
pub mod damage;
pub mod data;
pub mod effects;
pub mod engine;
pub mod error;
pub mod flags;
pub mod magic;
pub mod math;
pub mod messaging;
pub mod object;
pub mod regen;
pub mod rng;
pub mod scheduler;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::character::{Character, CharacterSpawn, Skill};
    pub use crate::components::*;
    pub use crate::composition::{Composition, LifeForce};
    pub use crate::config::EngineConfig;
    pub use crate::cooldowns::{CooldownKind, Cooldowns};
    pub use crate::damage::DamageType;
    pub use crate::data::{Formula, SpellCatalog, SpellData};
    pub use crate::effects::{Effect, EffectList, JoinMode};
    pub use crate::engine::{DamageOutcome, Engine, GameEvent, PulseReport, SweepReport};
    pub use crate::error::{GameError, Result};
    pub use crate::flags::{
        CastResult, EffectFlag, EffectFlags, ItemFlags, MobFlags, PrefFlags, RoomEffectFlags,
        RoomFlags, Routines, TargetFlags,
    };
    pub use crate::magic::{CastTarget, HandlerRegistry, SpellEffectHandler};
    pub use crate::math::Fixed;
    pub use crate::messaging::{Audience, MessageLog, MessageSink, NullSink, RecordingSink};
    pub use crate::object::{ObjKind, ObjLocation, Object, ObjectSpawn};
    pub use crate::world::World;
}

/// Fixtures for unit tests inside the crate.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::character::CharacterSpawn;
    use crate::components::{CharId, Class, RoomId, Sector, SpellId};
    use crate::config::EngineConfig;
    use crate::data::SpellCatalog;
    use crate::engine::Engine;
    use crate::flags::RoomFlags;
    use crate::messaging::{MessageLog, NullSink, RecordingSink};

    /// The shipped spell catalog.
    pub const SPELLS: &str = include_str!("../../../assets/data/spells.ron");

    pub fn catalog() -> Arc<SpellCatalog> {
        Arc::new(SpellCatalog::from_ron_str(SPELLS).unwrap())
    }

    /// An engine with one room of the given sector.
    pub fn test_engine(sector: Sector) -> (Engine, RoomId) {
        let mut engine = Engine::new(EngineConfig::default(), catalog(), Box::new(NullSink));
        let room = engine.world_mut().add_room("A clearing", sector, RoomFlags::empty());
        (engine, room)
    }

    /// Like [`test_engine`], keeping every message sent.
    pub fn recording_engine(sector: Sector) -> (Engine, RoomId, MessageLog) {
        let (sink, log) = RecordingSink::new();
        let mut engine = Engine::new(EngineConfig::default(), catalog(), Box::new(sink));
        let room = engine.world_mut().add_room("A clearing", sector, RoomFlags::empty());
        (engine, room, log)
    }

    pub fn pc_spawn(level: i32) -> CharacterSpawn {
        CharacterSpawn {
            name: format!("player{level}"),
            is_npc: false,
            level,
            max_hit: 100,
            ..CharacterSpawn::default()
        }
    }

    pub fn npc_spawn(name: &str, level: i32) -> CharacterSpawn {
        CharacterSpawn {
            name: name.into(),
            level,
            ..CharacterSpawn::default()
        }
    }

    /// A player cleric standing in `room`.
    pub fn caster_in(engine: &mut Engine, room: RoomId, level: i32) -> CharId {
        let spawn = CharacterSpawn {
            class: Class::Cleric,
            max_mana: 20,
            ..pc_spawn(level)
        };
        engine.spawn_character(spawn, room).unwrap()
    }

    pub fn spell(engine: &Engine, name: &str) -> SpellId {
        engine
            .catalog()
            .id_of(name)
            .unwrap_or_else(|| panic!("no spell named {name}"))
    }
}
