//! Seeded duels.
//!
//! A caster stands in an empty room and casts one spell at a single
//! opponent every combat round until the opponent dies or the round limit
//! runs out. The same seed always produces the same fight and the same
//! final state hash, which makes a duel a compact reproduction for
//! balance questions and bug reports.

use std::sync::Arc;

use serde::Serialize;

use mud_core::prelude::*;

use crate::error::{Result, ToolError};

/// Duel parameters.
#[derive(Debug, Clone)]
pub struct DuelConfig {
    /// Engine configuration; its seed drives the fight.
    pub engine: EngineConfig,
    /// Spell the caster repeats.
    pub spell: String,
    /// Caster class name, as written in the catalog.
    pub class: String,
    /// Caster level.
    pub caster_level: i32,
    /// Casting proficiency.
    pub power: i32,
    /// Opponent level.
    pub opponent_level: i32,
    /// Opponent hit points.
    pub opponent_hit: i32,
    /// Give up after this many rounds.
    pub max_rounds: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            spell: "magic missile".into(),
            class: "Sorcerer".into(),
            caster_level: 30,
            power: 60,
            opponent_level: 20,
            opponent_hit: 300,
            max_rounds: 50,
        }
    }
}

/// How a duel went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuelReport {
    /// Seed used.
    pub seed: u64,
    /// Rounds fought.
    pub rounds: u32,
    /// Casts that landed.
    pub landed: u32,
    /// Hit points the opponent lost.
    pub damage_dealt: i32,
    /// Whether the opponent died.
    pub opponent_killed: bool,
    /// Pulses simulated.
    pub pulses: u64,
    /// Engine state hash at the end.
    pub state_hash: u64,
}

/// Parse a class name the way the catalog spells it.
///
/// # Errors
///
/// Returns [`ToolError::UnknownClass`] for anything that is not a class.
pub fn parse_class(name: &str) -> Result<Class> {
    ron::from_str::<Class>(name).map_err(|_| ToolError::UnknownClass(name.to_string()))
}

/// Run a duel.
///
/// # Errors
///
/// Returns an error for an unknown spell or class.
pub fn run_duel(catalog: Arc<SpellCatalog>, config: &DuelConfig) -> Result<DuelReport> {
    let spell = catalog.require(&config.spell)?;
    let class = parse_class(&config.class)?;
    let round_pulses = config.engine.violence_pulses();

    let mut engine = Engine::new(config.engine.clone(), catalog, Box::new(NullSink));
    let room = engine
        .world_mut()
        .add_room("The duelling ground", Sector::Field, RoomFlags::empty());
    let caster = engine.spawn_character(
        CharacterSpawn {
            name: "the duellist".into(),
            is_npc: false,
            level: config.caster_level,
            class,
            max_hit: 500,
            max_mana: 100,
            ..CharacterSpawn::default()
        },
        room,
    )?;
    let opponent = engine.spawn_character(
        CharacterSpawn {
            name: "a sparring golem".into(),
            level: config.opponent_level,
            max_hit: config.opponent_hit,
            ..CharacterSpawn::default()
        },
        room,
    )?;

    let mut report = DuelReport {
        seed: config.engine.seed,
        rounds: 0,
        landed: 0,
        damage_dealt: 0,
        opponent_killed: false,
        pulses: 0,
        state_hash: 0,
    };

    while report.rounds < config.max_rounds {
        if !engine.is_alive(caster) || !engine.is_alive(opponent) {
            break;
        }
        report.rounds += 1;
        let before = engine.world().character(opponent).map_or(0, |c| c.hit);
        let result = engine.cast(caster, spell, CastTarget::Char(opponent), config.power);
        if result.contains(CastResult::SUCCESS) {
            report.landed += 1;
        }
        let after = engine.world().character(opponent).map_or(0, |c| c.hit);
        report.damage_dealt += (before - after).max(0);
        tracing::debug!(round = report.rounds, ?result, before, after, "duel round");

        engine.advance(round_pulses);
    }

    report.opponent_killed = !engine.is_alive(opponent);
    report.pulses = engine.pulse_count();
    report.state_hash = engine.state_hash();
    tracing::info!(
        seed = report.seed,
        rounds = report.rounds,
        killed = report.opponent_killed,
        "duel finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_test_utils::fixtures::standard_catalog;

    #[test]
    fn test_duel_is_reproducible() {
        let config = DuelConfig {
            max_rounds: 10,
            ..DuelConfig::default()
        };
        let a = run_duel(standard_catalog(), &config).unwrap();
        let b = run_duel(standard_catalog(), &config).unwrap();
        assert_eq!(a, b);
        assert!(a.rounds > 0);
        assert!(a.damage_dealt > 0);
    }

    #[test]
    fn test_weak_opponent_dies() {
        let config = DuelConfig {
            opponent_hit: 5,
            ..DuelConfig::default()
        };
        let report = run_duel(standard_catalog(), &config).unwrap();
        assert!(report.opponent_killed);
        assert_eq!(report.rounds, 1);
    }

    #[test]
    fn test_bad_inputs() {
        let config = DuelConfig {
            spell: "wish".into(),
            ..DuelConfig::default()
        };
        assert!(matches!(
            run_duel(standard_catalog(), &config),
            Err(ToolError::Game(GameError::UnknownSpellName(_)))
        ));
        assert!(parse_class("Druid").is_ok());
        assert!(matches!(parse_class("Wizard"), Err(ToolError::UnknownClass(_))));
    }
}
