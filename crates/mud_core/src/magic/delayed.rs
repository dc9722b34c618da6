//! Multi-round spells.
//!
//! A delayed cast is a typed continuation carried in the scheduler. Each
//! time it fires it checks that its participants still exist (and, for
//! sustained casts, that the caster can keep concentrating), runs one round,
//! and either asks to be re-armed or finishes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handler::SpellContext;
use crate::components::{CharId, RoomId, SaveKind, SpellId, Stance};
use crate::engine::Engine;
use crate::flags::{CastResult, Routines};
use crate::scheduler::EventOutcome;

/// State of a multi-round cast between rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedCast {
    /// Caster.
    pub caster: CharId,
    /// Victim, if the spell has one.
    pub victim: Option<CharId>,
    /// Spell.
    pub spell: SpellId,
    /// Room the cast began in.
    pub room: RoomId,
    /// Routines run each round.
    pub routines: Routines,
    /// Rounds left, including the next one.
    pub rounds: i32,
    /// Pulses between rounds.
    pub wait: u64,
    /// Caster proficiency.
    pub power: i32,
    /// Save the victim rolls.
    pub save: SaveKind,
    /// Whether preconditions are re-checked every round.
    pub sustained: bool,
}

impl Engine {
    fn delayed_participants_valid(&self, cast: &DelayedCast) -> bool {
        let Some(caster) = self.world.character(cast.caster) else {
            return false;
        };
        if caster.is_dead() {
            return false;
        }
        match cast.victim {
            Some(v) => self.world.character(v).is_some_and(|c| !c.is_dead()),
            None => true,
        }
    }

    fn sustained_preconditions(&self, cast: &DelayedCast) -> bool {
        let Some(caster) = self.world.character(cast.caster) else {
            return false;
        };
        if caster.room != Some(cast.room) || caster.stance < Stance::Resting || caster.is_helpless() {
            return false;
        }
        if let Some(victim) = cast.victim.and_then(|v| self.world.character(v)) {
            if victim.room != caster.room {
                return false;
            }
        }
        true
    }

    /// Run one round. Returns the round's result and what the event should
    /// do next.
    pub(crate) fn run_round(&mut self, cast: &mut DelayedCast) -> (CastResult, EventOutcome) {
        if !self.delayed_participants_valid(cast) {
            debug!(spell = %cast.spell, "delayed cast lost a participant");
            return (CastResult::empty(), EventOutcome::Finished);
        }
        if cast.sustained && !self.sustained_preconditions(cast) {
            debug!(spell = %cast.spell, "sustained cast interrupted");
            self.send(cast.caster, "Your concentration is broken and the spell fades.");
            return (CastResult::empty(), EventOutcome::Finished);
        }

        let ctx = SpellContext {
            spell: cast.spell,
            caster: cast.caster,
            victim: cast.victim,
            power: cast.power,
        };
        let result = self.call_magic(&ctx, None, cast.routines, cast.save);

        let victim_gone = cast.victim.is_some_and(|v| !self.is_alive(v));
        cast.rounds -= 1;
        let finished = victim_gone || cast.rounds <= 0 || !self.is_alive(cast.caster);

        let handler = self.handlers.get(cast.spell);
        handler.after_round(self, cast, finished);

        if finished {
            (result, EventOutcome::Finished)
        } else {
            (result, EventOutcome::Reschedule(cast.wait.max(1)))
        }
    }

    /// One scheduled round.
    pub(crate) fn delayed_round(&mut self, cast: &mut DelayedCast) -> EventOutcome {
        self.run_round(cast).1
    }
}
