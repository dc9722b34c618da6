//! The damage routine and its secondary effects.

use std::sync::Arc;

use tracing::{debug, error};

use super::handler::SpellContext;
use super::spell_for;
use crate::combat::attack_ok;
use crate::components::{CharId, SaveKind, SpellId, LVL_IMMORT};
use crate::damage::{mag_savingthrow, susceptibility, DamageType};
use crate::data::{DamageSpec, DamageStep, Requirement, SpellData, SpellMessages};
use crate::effects::{Effect, Erosion, JoinMode};
use crate::engine::{Engine, GameEvent};
use crate::flags::{CastResult, EffectFlag, MobFlags, TargetFlags};
use crate::math::{percent_of, ratio, scale, Fixed};
use crate::messaging::Audience;
use crate::rng::RandomSource;

/// Damage multiplier for an NPC caster: `0.3 + 0.7 * (power / 100)^2`.
#[must_use]
pub fn npc_damage_factor(power: i32) -> Fixed {
    let p = power.clamp(0, 100);
    // Kept as one ratio over 100_000 so full power is exactly one.
    ratio(30_000 + 7 * p * p, 100_000)
}

impl Engine {
    fn requirement_met(&self, caster: CharId, victim: CharId, requirement: Requirement) -> bool {
        let (Some(c), Some(v)) = (self.world.character(caster), self.world.character(victim)) else {
            return false;
        };
        match requirement {
            Requirement::VictimLifeForce(life) => v.life_force == life,
            Requirement::VictimEvil => v.is_evil(),
            Requirement::VictimGood => v.is_good(),
            Requirement::CasterAlignAbove(align) => c.alignment >= align,
            Requirement::CasterAlignBelow(align) => c.alignment <= align,
        }
    }

    /// Send a spell's caster, victim and room templates.
    pub(crate) fn spell_messages(&mut self, messages: &SpellMessages, caster: CharId, victim: Option<CharId>) {
        if let Some(text) = &messages.to_caster {
            self.act(text, Some(caster), victim, Audience::Actor);
        }
        if let (Some(text), Some(v)) = (&messages.to_victim, victim) {
            if v != caster {
                self.act(text, Some(caster), Some(v), Audience::Target);
            }
        }
        if let Some(text) = &messages.to_room {
            self.act(text, Some(caster), victim, Audience::Bystanders);
        }
    }

    /// Run the damage pipeline for one victim.
    pub fn mag_damage(&mut self, ctx: &SpellContext, save: SaveKind) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_damage") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.damage else {
            error!(spell = %ctx.spell, "SYSERR: damage routine without damage data");
            return CastResult::CHARGE;
        };
        let Some(victim) = ctx.victim.filter(|v| self.is_alive(*v)) else {
            return CastResult::empty();
        };
        if !self.is_alive(ctx.caster) {
            return CastResult::empty();
        }

        for guard in &spec.guards {
            if !self.requirement_met(ctx.caster, victim, guard.requirement) {
                self.send(ctx.caster, &guard.message);
                return CastResult::CHARGE;
            }
        }

        if victim != ctx.caster && self.evades_spell(ctx.caster, victim, ctx.spell, ctx.power) {
            return CastResult::CHARGE | CastResult::IMPROVE;
        }

        let handler = self.handlers.get(ctx.spell);
        let fctx = ctx.formula_context(&self.world, data);
        let base = handler.base_damage(data, &fctx, &mut self.rng);

        let victim = self.check_guard(ctx.caster, victim);
        if !attack_ok(&self.world, &self.config, ctx.caster, victim) {
            self.send(ctx.caster, "You feel ashamed trying to disturb the peace of this room.");
            return CastResult::CHARGE;
        }

        let dam = self.run_damage_pipeline(ctx, data, spec, victim, base, save);
        debug!(spell = %ctx.spell, base, dam, "spell damage");

        self.spell_messages(&data.messages, ctx.caster, Some(victim));
        let outcome = self.damage(Some(ctx.caster), victim, dam);

        if spec.heals_caster && outcome.dealt > 0 {
            if let Some(c) = self.world.character_mut(ctx.caster) {
                c.hit = (c.hit + outcome.dealt).min(c.max_hit().max(c.hit));
            }
        }
        if outcome.killed {
            return CastResult::SUCCESS;
        }

        if let Some(name) = &spec.erodes {
            if data.targets.intersects(TargetFlags::DIRECT | TargetFlags::CONTACT) {
                self.erode(victim, name);
            }
        }

        let caster_illusory = self
            .world
            .character(ctx.caster)
            .is_some_and(|c| c.mob_flagged(MobFlags::ILLUSORY));
        let vlevel = self.world.character(victim).map_or(0, |v| v.level);
        if outcome.dealt > 0 && vlevel < LVL_IMMORT && !caster_illusory {
            match data.damage_type {
                Some(DamageType::Fire) => self.fire_secondary(ctx, victim, vlevel),
                Some(DamageType::Cold) => self.cold_secondary(ctx, data, victim, vlevel),
                _ => {}
            }
        }
        CastResult::SUCCESS
    }

    fn run_damage_pipeline(
        &mut self,
        ctx: &SpellContext,
        data: &SpellData,
        spec: &DamageSpec,
        victim: CharId,
        base: i32,
        save: SaveKind,
    ) -> i32 {
        let mut dam = base;
        for step in &spec.pipeline {
            let (Some(c), Some(v)) = (self.world.character(ctx.caster), self.world.character(victim)) else {
                return 0;
            };
            match step {
                DamageStep::NpcReduction => {
                    if c.is_npc {
                        dam = scale(dam, npc_damage_factor(ctx.power)).max(1);
                    }
                }
                DamageStep::ClassBonus => {
                    if let Some(bonus) = &spec.class_bonus {
                        if bonus.classes.contains(&c.class) {
                            dam += percent_of(dam, bonus.percent);
                        }
                    }
                }
                DamageStep::SavingThrow => {
                    if mag_savingthrow(v, save, &mut self.rng) {
                        dam /= 2;
                    }
                }
                DamageStep::Harness => {
                    if c.has(EffectFlag::Harness) {
                        dam += percent_of(dam, v.level);
                        self.send(ctx.caster, "Your harnessed energy surges into the spell!");
                        if let Some(effects) = self.world.char_effects_mut(ctx.caster) {
                            effects.remove_where(|e| e.flags.contains(EffectFlag::Harness));
                        }
                    }
                }
                DamageStep::Susceptibility => {
                    let Some(dtype) = data.damage_type else {
                        continue;
                    };
                    let sus = susceptibility(v, dtype);
                    dam = percent_of(dam, sus);
                    if sus == 0 {
                        self.act("Your spell has no effect on $N!", Some(ctx.caster), Some(victim), Audience::Actor);
                    } else if sus > 119 {
                        if self.rng.one_in(4) {
                            self.act("$n cries out in pain!", Some(victim), None, Audience::Room);
                        }
                    } else if sus > 104 && self.rng.one_in(4) {
                        self.act("$n winces visibly.", Some(victim), None, Audience::Room);
                    }
                }
            }
        }
        dam.max(0)
    }

    fn erode(&mut self, victim: CharId, spell_name: &str) {
        let Some(spell) = self.catalog.id_of(spell_name) else {
            error!(spell_name, "SYSERR: eroding unknown spell");
            return;
        };
        let immobilized = self
            .world
            .character(victim)
            .is_some_and(|v| v.has(EffectFlag::Immobilized));
        if !immobilized {
            return;
        }
        let erosion = self
            .world
            .char_effects_mut(victim)
            .map_or(Erosion::Absent, |effects| effects.decrease_modifier(spell));
        if let Erosion::Removed(_) = erosion {
            if self.world.character(victim).is_some_and(|v| !v.affected_by(spell)) {
                self.wear_off(victim, spell);
            }
        }
    }

    fn fire_secondary(&mut self, ctx: &SpellContext, victim: CharId, vlevel: i32) {
        let Some(v) = self.world.character(victim) else {
            return;
        };
        let sus = susceptibility(v, DamageType::Fire);
        if sus <= 60 || v.has(EffectFlag::OnFire) {
            return;
        }
        let chance = ((3 + ctx.power - vlevel) * sus / 100).clamp(1, 90);
        if chance > self.rng.number(0, 100) {
            self.catch_fire(victim);
        }
    }

    fn cold_secondary(&mut self, ctx: &SpellContext, data: &SpellData, victim: CharId, vlevel: i32) {
        let (Some(c), Some(v)) = (self.world.character(ctx.caster), self.world.character(victim)) else {
            return;
        };
        if v.has(EffectFlag::MinorParalysis) {
            return;
        }
        let sus = susceptibility(v, DamageType::Cold);
        let chance = (ctx.power + data.level_for(c.class)) * sus / 100 - 2 * vlevel + 20;
        if chance > self.rng.number(0, 500) {
            self.freeze_up(victim, ctx.power);
        }
    }

    /// Set a character alight.
    pub fn catch_fire(&mut self, ch: CharId) {
        if !self.is_alive(ch) {
            return;
        }
        let duration = self.config.burning_duration;
        let burning = Effect::new(SpellId::IGNITION, duration).with_flag(EffectFlag::OnFire);
        if let Err(e) = self.world.apply_effect(ch, burning, JoinMode::REFRESH) {
            tracing::warn!(error = %e, "could not ignite");
            return;
        }
        self.act("$n bursts into flame!", Some(ch), None, Audience::Bystanders);
        self.send(ch, "You burst into flame!");
    }

    /// Freeze a character in place: a wait state, no casting, and a fight
    /// broken off at the start of the next pulse.
    pub fn freeze_up(&mut self, ch: CharId, power: i32) {
        let violence = i32::try_from(self.config.violence_pulses()).unwrap_or(i32::MAX);
        let Some(c) = self.world.character_mut(ch) else {
            return;
        };
        let wait = (violence.saturating_mul(power - c.level) / 20).max(3);
        c.wait = c.wait.max(wait);
        c.casting = None;
        self.act("$n freezes up!", Some(ch), None, Audience::Bystanders);
        self.send(ch, "You are frozen in place!");
        self.schedule(Some(ch), GameEvent::BattleParalysis, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npc_damage_factor_bounds() {
        assert_eq!(npc_damage_factor(100), Fixed::ONE);
        assert_eq!(npc_damage_factor(0), ratio(3, 10));
        assert!(npc_damage_factor(50) > ratio(3, 10));
        assert!(npc_damage_factor(50) < Fixed::ONE);
        assert_eq!(npc_damage_factor(500), Fixed::ONE);
    }

    #[test]
    fn test_full_power_npc_keeps_every_point() {
        for dam in [1, 7, 57, 250, 1999] {
            assert_eq!(scale(dam, npc_damage_factor(100)), dam);
        }
    }
}
