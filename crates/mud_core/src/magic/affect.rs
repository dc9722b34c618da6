//! The affect routine: timed effects on a character.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::handler::SpellContext;
use super::spell_for;
use super::summon::ControlVerdict;
use crate::components::{ApplyLocation, CharId, SaveKind, SpellId, Stance};
use crate::damage::mag_savingthrow;
use crate::data::{AffectSpec, SpellData};
use crate::effects::Effect;
use crate::engine::Engine;
use crate::flags::{CastResult, EffectFlag, EffectFlags};
use crate::messaging::Audience;
use crate::world::World;

/// Whether `victim`'s body can hold a spell that needs a rigid form.
#[must_use]
pub fn check_fluid_spell_ok(world: &World, victim: CharId, data: &SpellData) -> bool {
    let Some(v) = world.character(victim) else {
        return false;
    };
    let rigid_only = data.affects.as_ref().is_some_and(|a| a.rigid_only);
    !rigid_only || v.composition.is_rigid() || v.is_immortal()
}

impl Engine {
    fn exclusion_hit(&self, victim: CharId, spec: &AffectSpec) -> Option<String> {
        let v = self.world.character(victim)?;
        spec.exclusions.iter().find_map(|ex| {
            let by_spell = self
                .catalog
                .ids_of(&ex.spells)
                .into_iter()
                .any(|s| v.affected_by(s));
            let by_flag = ex.flags.iter().any(|f| v.has(*f));
            (by_spell || by_flag).then(|| ex.message.clone())
        })
    }

    /// Apply a spell's timed effects to its victim.
    pub fn mag_affect(&mut self, ctx: &SpellContext, save: SaveKind) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_affect") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.affects else {
            error!(spell = %ctx.spell, "SYSERR: affect routine without affect data");
            return CastResult::CHARGE;
        };
        let caster = ctx.caster;
        let victim = ctx.victim.unwrap_or(caster);
        let (Some(c), Some(v)) = (self.world.character(caster), self.world.character(victim)) else {
            return CastResult::empty();
        };
        if c.is_dead() || v.is_dead() {
            return CastResult::empty();
        }

        if v.is_immortal() && c.level < v.level {
            self.act("Your spell is too weak to affect $N.", Some(caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }
        if !check_fluid_spell_ok(&self.world, victim, data) {
            self.act("$N's body is too fluid to hold that spell.", Some(caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }
        if let Some(message) = self.exclusion_hit(victim, spec) {
            self.act(&message, Some(caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }

        let flags = spec.flag_set();
        let Some(v) = self.world.character(victim) else {
            return CastResult::empty();
        };
        if v.is_npc && v.mob_flags.intersects(spec.npc_immune) {
            debug!(spell = %ctx.spell, "npc immune");
            self.act("$N seems unaffected.", Some(caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }
        if v.is_npc && !flags.is_empty() && innate_provides(v.effects().iter(), flags) {
            return CastResult::CHARGE;
        }
        let mode = spec.join_mode();
        if v.affected_by(ctx.spell) && !mode.joins() {
            self.send(caster, "Nothing seems to happen.");
            return CastResult::CHARGE;
        }

        if victim != caster && self.evades_spell(caster, victim, ctx.spell, ctx.power) {
            return CastResult::CHARGE | CastResult::IMPROVE;
        }
        if spec.saving_throw && victim != caster {
            let saved = self
                .world
                .character(victim)
                .is_some_and(|v| mag_savingthrow(v, save, &mut self.rng));
            if saved {
                self.act("$N resists your spell!", Some(caster), Some(victim), Audience::Actor);
                return CastResult::CHARGE;
            }
        }

        if flags.contains(EffectFlag::Charm) {
            if victim == caster {
                self.send(caster, "You like yourself even better!");
                return CastResult::CHARGE;
            }
            let pc = self.world.character(victim).is_some_and(|v| v.is_pc());
            if pc || self.ch_can_control_mob(caster, victim) != ControlVerdict::Yes {
                self.act("$N resists your charms.", Some(caster), Some(victim), Audience::Actor);
                return CastResult::CHARGE;
            }
        }

        let handler = self.handlers.get(ctx.spell);
        let fctx = ctx.formula_context(&self.world, data);
        let batch = handler.build_affects(data, &fctx, &mut self.rng);
        let mut applied = EffectFlags::empty();
        let mut raised_max_hit = false;
        for effect in batch {
            let carried = effect.flags;
            raised_max_hit |= effect.location == ApplyLocation::MaxHit;
            match self.world.apply_effect(victim, effect, mode) {
                Ok(outcome) => {
                    debug!(spell = %ctx.spell, ?outcome, "effect applied");
                    applied = applied.union(carried);
                }
                Err(e) => warn!(spell = %ctx.spell, error = %e, "effect rejected"),
            }
        }

        if spec.messages.is_empty() {
            self.spell_messages(&data.messages, caster, Some(victim));
        } else {
            self.spell_messages(&spec.messages, caster, Some(victim));
        }

        self.interrupt(victim, applied);
        if applied.contains(EffectFlag::Charm) {
            self.take_charm(caster, victim);
        }
        if raised_max_hit {
            self.start_regen(victim);
        }
        CastResult::SUCCESS
    }

    /// Break off whatever a new status prevents.
    fn interrupt(&mut self, victim: CharId, applied: EffectFlags) {
        let silenced = applied.contains(EffectFlag::Silence);
        let held = applied.contains(EffectFlag::MinorParalysis)
            || applied.contains(EffectFlag::MajorParalysis)
            || applied.contains(EffectFlag::Mesmerized);
        let asleep = applied.contains(EffectFlag::Sleep);
        if !(silenced || held || asleep) {
            return;
        }
        if let Some(v) = self.world.character_mut(victim) {
            v.casting = None;
        }
        if held || asleep {
            self.stop_fighting(victim);
            self.stop_attackers(victim);
        }
        if asleep {
            if let Some(v) = self.world.character_mut(victim) {
                if v.is_awake() {
                    v.stance = Stance::Sleeping;
                }
            }
            self.act("You feel very sleepy...  Zzzz......", Some(victim), None, Audience::Actor);
            self.act("$n goes to sleep.", Some(victim), None, Audience::Bystanders);
        }
    }

    fn take_charm(&mut self, caster: CharId, victim: CharId) {
        if self.world.character(victim).is_some_and(|v| v.master.is_some()) {
            if let Err(e) = self.world.stop_following(victim) {
                warn!(error = %e, "charm could not detach follower");
            }
        }
        if let Err(e) = self.world.add_follower(victim, caster) {
            warn!(error = %e, "charm could not attach follower");
        }
        self.stop_fighting(victim);
        if self.world.character(caster).is_some_and(|c| c.fighting == Some(victim)) {
            self.stop_fighting(caster);
        }
    }

    /// Strip effects the character's current body can no longer hold.
    pub fn remove_unsuitable_spells(&mut self, ch: CharId) {
        let Some(c) = self.world.character(ch) else {
            return;
        };
        if c.composition.is_rigid() || c.is_immortal() {
            return;
        }
        let mut doomed: Vec<SpellId> = Vec::new();
        for e in c.effects().iter() {
            let rigid_only = self
                .catalog
                .get(e.spell)
                .and_then(|d| d.affects.as_ref())
                .is_some_and(|a| a.rigid_only);
            if rigid_only && !doomed.contains(&e.spell) {
                doomed.push(e.spell);
            }
        }
        for spell in doomed {
            self.remove_effect(ch, spell);
        }
    }
}

/// Whether a mobile's prototype already grants every flag in `flags`.
fn innate_provides<'a>(effects: impl Iterator<Item = &'a Effect>, flags: EffectFlags) -> bool {
    let innate = effects
        .filter(|e| e.spell == SpellId::INNATE)
        .fold(EffectFlags::empty(), |acc, e| acc.union(e.flags));
    flags.iter().all(|f| innate.contains(f))
}
