//! Regeneration, rage, and cooldown countdown.
//!
//! Each resource regenerates through its own recurring event that restores
//! one point and reschedules itself `pulses_per_hour / gain` pulses later.
//! The event finishes as soon as the resource is full; damage or spending
//! re-arms it. A character at or below stunned decays one hit point every
//! quarter hour instead, and dies when the next point would be fatal.

use tracing::{debug, info, warn};

use crate::character::{Character, Skill};
use crate::components::{
    ApplyLocation, CharId, Position, Race, SpellId, Stance, HIT_DEAD, HIT_MORTALLYW,
    RAGE_CRAZED,
};
use crate::cooldowns::CooldownKind;
use crate::effects::{Effect, JoinMode};
use crate::engine::{Engine, GameEvent};
use crate::flags::EffectFlag;
use crate::messaging::Audience;
use crate::rng::RandomSource;
use crate::scheduler::EventOutcome;

/// Berserk lasts until rage runs out, not until this many ticks pass.
const BERSERK_DURATION: i32 = 1000;

/// Hit points regained per in-game hour.
#[must_use]
pub fn hit_gain(ch: &Character) -> i32 {
    let mut gain = if ch.is_npc {
        ch.level
    } else {
        let hitgain = ch.effects().modifier(ApplyLocation::HitRegen).min(100);
        let mut gain = ch.max_hit() * 5 / 100 + hitgain + 2;
        if ch.race == Race::Troll {
            gain *= 3;
        }
        let resting = matches!(ch.stance, Stance::Sleeping | Stance::Resting);
        if ch.has(EffectFlag::SongOfRest) && resting {
            gain *= 3;
        }
        match ch.stance {
            Stance::Sleeping => gain * 5,
            Stance::Resting => gain * 3,
            Stance::Fighting => gain / 2,
            _ if ch.position == Position::Sitting => gain + gain / 2,
            _ => gain,
        }
    };
    if ch.has(EffectFlag::Poison) {
        gain /= 4;
    }
    gain
}

/// Movement points regained per in-game hour.
#[must_use]
pub fn move_gain(ch: &Character) -> i32 {
    if ch.is_npc {
        return ch.max_moves() / 10 + ch.level;
    }
    let mut gain = ch.max_moves() / 10;
    let resting = matches!(ch.stance, Stance::Sleeping | Stance::Resting);
    if ch.has(EffectFlag::SongOfRest) && resting {
        gain += gain / 2;
    }
    gain = match ch.stance {
        Stance::Sleeping => gain * 5,
        Stance::Resting => gain * 3,
        Stance::Fighting => gain / 2,
        _ if ch.position == Position::Sitting => gain + gain / 2,
        _ => gain,
    };
    if ch.has(EffectFlag::Poison) {
        gain /= 4;
    }
    gain + gain / 2
}

/// Spell slots restored per in-game hour.
#[must_use]
pub fn mana_gain(ch: &Character) -> i32 {
    if ch.is_npc {
        return ch.level / 5 + 1;
    }
    let gain = ch.level / 10 + ch.wisdom() / 20 + 1;
    match ch.stance {
        Stance::Sleeping => gain * 2,
        Stance::Resting => gain + gain / 2,
        _ => gain,
    }
}

/// Subtract `amount` hit points. Negative amounts heal.
///
/// With `cap`, healing never lifts a character past its maximum, though a
/// character already above it (temporary hit points) is only brought down
/// by damage.
pub fn alter_hit(ch: &mut Character, amount: i32, cap: bool) {
    let old = ch.hit;
    ch.hit = ch.hit.saturating_sub(amount);
    if cap && ch.hit > ch.max_hit() {
        if old < ch.max_hit() {
            ch.hit = ch.max_hit();
        } else if amount < 0 {
            ch.hit = old;
        }
    }
}

/// Pulses between single-point gains.
fn regen_delay(gain: i32, pulses_per_hour: u64) -> u64 {
    match u64::try_from(gain) {
        Ok(g) if g >= 1 && g <= pulses_per_hour => pulses_per_hour / g,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regen {
    Hit,
    Moves,
    Mana,
    Rage,
}

impl Engine {
    /// Change hit points, update stance, and make sure recovery is running.
    pub(crate) fn hurt_char(&mut self, victim: CharId, attacker: Option<CharId>, amount: i32, cap: bool) {
        let Some(v) = self.world.character_mut(victim) else {
            return;
        };
        if v.room.is_none() {
            warn!(victim = victim.raw(), "hurt_char on a character in no room");
            return;
        }
        alter_hit(v, amount, cap);
        let (hit, max_hit, awake) = (v.hit, v.max_hit(), v.is_awake());

        self.update_stance_from_hit(victim);
        if awake && amount > 0 && hit > HIT_DEAD {
            if amount > max_hit / 4 {
                self.send(victim, "That really did HURT!");
            }
            if hit < max_hit / 4 {
                self.send(victim, "You wish that your wounds would stop BLEEDING so much!");
            }
        }
        if attacker.is_some() {
            debug!(victim = victim.raw(), amount, hit, "hurt");
        }
        if hit > HIT_DEAD && hit < max_hit {
            self.arm_regen(victim, Regen::Hit);
        }
    }

    /// Bring stance in line with current hit points.
    pub(crate) fn update_stance_from_hit(&mut self, ch: CharId) {
        let Some(c) = self.world.character_mut(ch) else {
            return;
        };
        if c.is_dead() {
            return;
        }
        let mut stance = Stance::from_hit(c.hit, c.stance);
        if stance == Stance::Resting && c.stance <= Stance::Stunned && c.has(EffectFlag::Sleep) {
            stance = Stance::Sleeping;
        }
        if stance == c.stance {
            return;
        }
        let collapsed = stance <= Stance::Stunned;
        c.stance = stance;
        if collapsed {
            c.position = Position::Prone;
            c.casting = None;
            self.stop_fighting(ch);
        }
    }

    /// Arm every regeneration event the character currently needs.
    pub fn start_regen(&mut self, ch: CharId) {
        for kind in [Regen::Hit, Regen::Moves, Regen::Mana, Regen::Rage] {
            self.arm_regen(ch, kind);
        }
    }

    fn arm_regen(&mut self, ch: CharId, kind: Regen) {
        let pph = self.config.pulses_per_hour();
        let rage_delay = self.config.seconds(self.config.rage_seconds).max(1);
        let Some(c) = self.world.character(ch) else {
            return;
        };
        if c.room.is_none() || c.is_dead() {
            return;
        }
        let (armed, needed, event, delay) = match kind {
            Regen::Hit => {
                let delay = if c.stance <= Stance::Stunned {
                    (pph / 4).max(1)
                } else {
                    regen_delay(hit_gain(c), pph)
                };
                (c.events.hit, c.hit < c.max_hit(), GameEvent::RegenHit, delay)
            }
            Regen::Moves => (
                c.events.moves,
                c.moves < c.max_moves(),
                GameEvent::RegenMove,
                regen_delay(move_gain(c), pph),
            ),
            Regen::Mana => (c.events.mana, c.mana < c.max_mana, GameEvent::RegenMana, regen_delay(mana_gain(c), pph)),
            Regen::Rage => (
                c.events.rage,
                c.rage > 0 || (c.skill(Skill::Berserk) > 0 && c.has(EffectFlag::Meditate)),
                GameEvent::Rage,
                rage_delay,
            ),
        };
        if armed.is_some() || !needed {
            return;
        }
        let handle = self.schedule(Some(ch), event, delay);
        if let Some(c) = self.world.character_mut(ch) {
            match kind {
                Regen::Hit => c.events.hit = Some(handle),
                Regen::Moves => c.events.moves = Some(handle),
                Regen::Mana => c.events.mana = Some(handle),
                Regen::Rage => c.events.rage = Some(handle),
            }
        }
    }

    /// One point of healing, or one point of dying decay.
    pub(crate) fn hp_regen(&mut self, ch: CharId) -> EventOutcome {
        let Some(c) = self.world.character(ch) else {
            return EventOutcome::Finished;
        };
        if c.hit >= c.max_hit() {
            return EventOutcome::Finished;
        }
        let dying = c.stance <= Stance::Stunned;
        if dying {
            if c.hit - 1 <= HIT_DEAD {
                self.slow_death(ch);
            } else {
                self.hurt_char(ch, None, 1, true);
            }
        } else {
            self.hurt_char(ch, None, -1, true);
        }

        let pph = self.config.pulses_per_hour();
        match self.world.character(ch) {
            Some(c) if !c.is_dead() && c.hit < c.max_hit() => {
                if dying {
                    EventOutcome::Reschedule((pph / 4).max(1))
                } else {
                    EventOutcome::Reschedule(regen_delay(hit_gain(c), pph))
                }
            }
            _ => EventOutcome::Finished,
        }
    }

    /// Die of wounds, unless someone is still fighting the character.
    fn slow_death(&mut self, ch: CharId) {
        let attacked = self.world.characters().any(|o| o.fighting == Some(ch));
        if attacked {
            if let Some(c) = self.world.character_mut(ch) {
                c.hit = HIT_MORTALLYW;
            }
            self.update_stance_from_hit(ch);
            return;
        }
        self.act("With a soft groan, $n slips off into the cold sleep of death.", Some(ch), None, Audience::Bystanders);
        info!(character = ch.raw(), "bled to death");
        self.die(ch, None);
    }

    pub(crate) fn move_regen(&mut self, ch: CharId) -> EventOutcome {
        let pph = self.config.pulses_per_hour();
        let Some(c) = self.world.character_mut(ch) else {
            return EventOutcome::Finished;
        };
        if c.moves >= c.max_moves() {
            return EventOutcome::Finished;
        }
        c.moves = (c.moves + 1).min(c.max_moves());
        if c.moves >= c.max_moves() {
            return EventOutcome::Finished;
        }
        EventOutcome::Reschedule(regen_delay(move_gain(c), pph))
    }

    pub(crate) fn mana_regen(&mut self, ch: CharId) -> EventOutcome {
        let pph = self.config.pulses_per_hour();
        let Some(c) = self.world.character_mut(ch) else {
            return EventOutcome::Finished;
        };
        if c.mana >= c.max_mana {
            return EventOutcome::Finished;
        }
        c.mana = (c.mana + 1).min(c.max_mana);
        if c.mana >= c.max_mana {
            return EventOutcome::Finished;
        }
        EventOutcome::Reschedule(regen_delay(mana_gain(c), pph))
    }

    /// Rage decays, grows through meditation, or overflows into berserk.
    pub(crate) fn rage_tick(&mut self, ch: CharId) -> EventOutcome {
        let Some(c) = self.world.character(ch) else {
            return EventOutcome::Finished;
        };
        let berserk = c.has(EffectFlag::Berserk);
        let wrath = c.has(EffectFlag::Wrath);
        let meditating = c.has(EffectFlag::Meditate);
        let meditate_skill = c.skill(Skill::Meditate).max(10);
        let idle = c.fighting.is_none();

        let delta = if berserk {
            if wrath {
                -self.rng.number(10, 15)
            } else {
                -self.rng.number(20, 30)
            }
        } else if meditating {
            self.rng.number(10, meditate_skill)
        } else {
            -self.rng.number(2, 4)
        };
        let rage = match self.world.character_mut(ch) {
            Some(c) => {
                c.rage = (c.rage + delta).max(0);
                c.rage
            }
            None => return EventOutcome::Finished,
        };

        if berserk && idle {
            if let Some(target) = self.find_aggr_target(ch) {
                self.schedule(Some(ch), GameEvent::QuickAggro { target }, 0);
            }
        }

        if rage > RAGE_CRAZED && !berserk {
            if let Some(effects) = self.world.char_effects_mut(ch) {
                effects.remove_where(|e| e.flags.contains(EffectFlag::Meditate));
            }
            self.start_berserking(ch);
            self.send(ch, "Your rage consumes you, taking control of your body...");
            self.act("$n shudders as $s rage causes $m to go berserk!", Some(ch), None, Audience::Bystanders);
        }

        if rage > 0 {
            EventOutcome::Reschedule(self.config.seconds(self.config.rage_seconds).max(1))
        } else {
            self.send(ch, "Your rage recedes and you feel calmer.");
            self.stop_berserking(ch);
            EventOutcome::Finished
        }
    }

    /// Enter a berserk rage.
    pub fn start_berserking(&mut self, ch: CharId) {
        let rage = Effect::new(SpellId::BERSERK, BERSERK_DURATION).with_flag(EffectFlag::Berserk);
        if let Err(e) = self.world.apply_effect(ch, rage, JoinMode::REFRESH) {
            warn!(error = %e, "berserk rejected");
            return;
        }
        if let Some(c) = self.world.character_mut(ch) {
            c.stance = Stance::Alert;
            c.position = Position::Standing;
        }
        self.start_regen(ch);
    }

    /// Leave berserk and drop all rage.
    pub fn stop_berserking(&mut self, ch: CharId) {
        if let Some(effects) = self.world.char_effects_mut(ch) {
            effects.remove_where(|e| e.spell == SpellId::BERSERK || e.flags.contains(EffectFlag::Wrath));
        }
        if let Some(c) = self.world.character_mut(ch) {
            c.rage = 0;
        }
    }

    /// Start a cooldown, arming the shared countdown event if it is idle.
    pub fn set_cooldown(&mut self, ch: CharId, kind: CooldownKind, pulses: i32) {
        let interval = u64::from(self.config.pulses_per_second.max(1));
        let Some(c) = self.world.character_mut(ch) else {
            return;
        };
        c.cooldowns.set(kind, pulses);
        if pulses > 0 && c.events.cooldowns.is_none() {
            let handle = self.schedule(Some(ch), GameEvent::Cooldowns, interval);
            if let Some(c) = self.world.character_mut(ch) {
                c.events.cooldowns = Some(handle);
            }
        }
    }

    pub(crate) fn cooldown_tick(&mut self, ch: CharId) -> EventOutcome {
        let interval = self.config.pulses_per_second.max(1);
        let Some(c) = self.world.character_mut(ch) else {
            return EventOutcome::Finished;
        };
        if c.cooldowns.elapse(i32::try_from(interval).unwrap_or(i32::MAX)) {
            EventOutcome::Reschedule(u64::from(interval))
        } else {
            EventOutcome::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterSpawn;
    use crate::components::Sector;
    use crate::test_support::{pc_spawn, test_engine};

    fn pc(max_hit: i32) -> Character {
        let mut spawn = pc_spawn(20);
        spawn.max_hit = max_hit;
        Character::from_spawn(CharId(1), spawn)
    }

    #[test]
    fn test_hit_gain_stance_multipliers() {
        let mut ch = pc(200);
        assert_eq!(hit_gain(&ch), 12);
        ch.stance = Stance::Sleeping;
        assert_eq!(hit_gain(&ch), 60);
        ch.stance = Stance::Resting;
        assert_eq!(hit_gain(&ch), 36);
        ch.stance = Stance::Fighting;
        assert_eq!(hit_gain(&ch), 6);
    }

    #[test]
    fn test_npc_hit_gain_is_level() {
        let npc = Character::from_spawn(CharId(2), CharacterSpawn {
            level: 17,
            ..CharacterSpawn::default()
        });
        assert_eq!(hit_gain(&npc), 17);
    }

    #[test]
    fn test_alter_hit_caps_healing() {
        let mut ch = pc(100);
        ch.hit = 95;
        alter_hit(&mut ch, -20, true);
        assert_eq!(ch.hit, 100);
        ch.hit = 120;
        alter_hit(&mut ch, -5, true);
        assert_eq!(ch.hit, 120);
        alter_hit(&mut ch, 10, true);
        assert_eq!(ch.hit, 110);
    }

    #[test]
    fn test_regen_delay_bounds() {
        assert_eq!(regen_delay(0, 750), 1);
        assert_eq!(regen_delay(10, 750), 75);
        assert_eq!(regen_delay(1000, 750), 1);
    }

    #[test]
    fn test_damage_arms_regen_and_heals_to_full() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        engine.damage(None, ch, 10);
        assert!(engine.world().character(ch).unwrap().events().hit.is_some());
        engine.advance(engine.config().pulses_per_hour() * 4);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.hit, c.max_hit());
        assert!(c.events().hit.is_none());
    }

    #[test]
    fn test_stunned_character_decays() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        engine.damage(None, ch, 100);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.hit, 0);
        assert_eq!(c.stance, Stance::Stunned);
        engine.advance(engine.config().pulses_per_hour() / 4 + 1);
        assert!(engine.world().character(ch).unwrap().hit < 0);
    }

    #[test]
    fn test_incapacitated_character_bleeds_out() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        let outcome = engine.damage(None, ch, 105);
        assert!(!outcome.killed);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.hit, -5);
        assert_eq!(c.stance, Stance::Incapacitated);
        assert!(c.events().hit.is_some());

        let quarter = engine.config().pulses_per_hour() / 4;
        engine.advance(quarter);
        assert_eq!(engine.world().character(ch).unwrap().hit, -6);

        engine.advance(quarter * 6);
        assert!(!engine.is_alive(ch));
        assert!(engine.scheduler().owned_by(ch).next().is_none());
    }

    #[test]
    fn test_incapacitated_character_recovers_when_healed() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        engine.damage(None, ch, 108);
        assert_eq!(engine.world().character(ch).unwrap().stance, Stance::Incapacitated);

        engine.hurt_char(ch, None, -30, true);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.hit, 22);
        assert!(c.stance > Stance::Stunned);

        engine.advance(engine.config().pulses_per_hour() * 8);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.hit, c.max_hit());
        assert!(c.events().hit.is_none());
    }

    #[test]
    fn test_rage_runs_out_and_ends_berserk() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        engine.world_mut().character_mut(ch).unwrap().rage = 40;
        engine.start_berserking(ch);
        assert!(engine.world().character(ch).unwrap().has(EffectFlag::Berserk));
        engine.advance(engine.config().seconds(engine.config().rage_seconds) * 4);
        let c = engine.world().character(ch).unwrap();
        assert_eq!(c.rage, 0);
        assert!(!c.has(EffectFlag::Berserk));
        assert!(c.events().rage.is_none());
    }

    #[test]
    fn test_cooldown_counts_down_and_finishes() {
        let (mut engine, room) = test_engine(Sector::Field);
        let ch = engine.spawn_character(pc_spawn(20), room).unwrap();
        let second = u64::from(engine.config().pulses_per_second);
        engine.set_cooldown(ch, CooldownKind::Bash, i32::try_from(second * 3).unwrap());
        assert!(engine.world().character(ch).unwrap().cooldowns.is_active(CooldownKind::Bash));
        engine.advance(second * 3);
        let c = engine.world().character(ch).unwrap();
        assert!(!c.cooldowns.is_active(CooldownKind::Bash));
        assert!(c.events().cooldowns.is_none());
    }
}
