//! Spell resolution.
//!
//! [`Engine::cast`] validates the target, then either runs the spell's
//! routines once through the dispatcher or starts a [`DelayedCast`]. Each
//! routine lives in its own module and returns a [`CastResult`]; the
//! dispatcher ORs them together in a fixed order.
//!
//! ## Routine order
//!
//! damage, affect, unaffect, point, alter-object, group, mass, area,
//! summon, creation, room, bulk objects, manual. A victim killed by the
//! damage routine stops the rest.

mod affect;
mod damage;
mod delayed;
mod handler;
mod objects;
mod points;
mod room;
mod shapes;
mod summon;
mod unaffect;

use std::sync::Arc;

use tracing::{debug, error};

pub use delayed::DelayedCast;
pub use handler::{
    CatalogHandler, HandlerRegistry, PointAmounts, PyreHandler, SpellContext, SpellEffectHandler,
    VitalityHandler,
};
pub use summon::ControlVerdict;

use crate::components::{CharId, ObjId, SaveKind, SpellId};
use crate::damage::{boolean_attack_evasion, susceptibility};
use crate::data::{SpellCatalog, SpellData};
use crate::engine::{Engine, GameEvent};
use crate::flags::{CastResult, EffectFlag, RoomFlags, Routines, TargetFlags};
use crate::messaging::Audience;
use crate::scheduler::EventOutcome;

/// What a spell is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastTarget {
    /// Let the spell pick: the caster, or the caster's opponent for violent
    /// spells.
    #[default]
    None,
    /// A character.
    Char(CharId),
    /// An object.
    Obj(ObjId),
}

/// Look a spell up for a routine, logging a configuration error when the
/// id is unknown.
pub(crate) fn spell_for<'a>(catalog: &'a SpellCatalog, spell: SpellId, routine: &str) -> Option<&'a SpellData> {
    let data = catalog.get(spell);
    if data.is_none() {
        error!(spell = %spell, routine, "SYSERR: unknown spell reached routine");
    }
    data
}

impl Engine {
    /// Cast `spell` at `target`.
    ///
    /// Returns an empty result when the cast never started (bad target,
    /// wrong stance, no-magic room); otherwise whatever the routines report.
    pub fn cast(&mut self, caster: CharId, spell: SpellId, target: CastTarget, power: i32) -> CastResult {
        let span = tracing::debug_span!("cast", spell = %spell, caster = caster.raw());
        let _guard = span.enter();

        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, spell, "cast") else {
            return CastResult::empty();
        };
        let Some(ch) = self.world.character(caster).filter(|c| !c.is_dead()) else {
            return CastResult::empty();
        };
        let Some(room) = ch.room else {
            tracing::warn!(caster = caster.raw(), "caster is nowhere");
            return CastResult::empty();
        };

        if ch.stance < data.min_stance {
            self.send(caster, "You can't concentrate enough!");
            return CastResult::empty();
        }
        if ch.fighting.is_some() && !data.fighting_ok {
            self.send(caster, "Impossible!  You can't concentrate enough!");
            return CastResult::empty();
        }
        if self
            .world
            .room(room)
            .is_some_and(|r| r.flags.contains(RoomFlags::NOMAGIC))
        {
            self.send(caster, "Your magic fizzles out and dies.");
            self.act("$n's magic fizzles out and dies.", Some(caster), None, Audience::Bystanders);
            return CastResult::empty();
        }

        let (victim, obj) = match target {
            CastTarget::None => (self.default_victim(caster, data), None),
            CastTarget::Char(v) => {
                if !self.is_alive(v) {
                    return CastResult::empty();
                }
                (Some(v), None)
            }
            CastTarget::Obj(o) => {
                if self.world.object(o).is_none() {
                    return CastResult::empty();
                }
                (None, Some(o))
            }
        };

        if data.targets.contains(TargetFlags::SELF_ONLY) && victim.is_some_and(|v| v != caster) {
            self.send(caster, "You can only cast this spell upon yourself!");
            return CastResult::empty();
        }
        if data.targets.contains(TargetFlags::NOT_SELF) && victim == Some(caster) {
            self.send(caster, "You cannot cast this spell upon yourself!");
            return CastResult::empty();
        }
        let needs_victim = Routines::DAMAGE | Routines::AFFECT | Routines::UNAFFECT | Routines::POINT;
        if data.routines.intersects(needs_victim) && victim.is_none() && obj.is_none() {
            self.send(caster, "Who should the spell be cast upon?");
            return CastResult::empty();
        }
        if data.routines.contains(Routines::ALTER_OBJ) && !data.routines.intersects(needs_victim) && obj.is_none() {
            self.send(caster, "What should the spell be cast upon?");
            return CastResult::empty();
        }

        let result = if let Some(delayed) = data.delayed {
            let mut cast = DelayedCast {
                caster,
                victim,
                spell,
                room,
                routines: data.routines,
                rounds: delayed.rounds,
                wait: delayed.wait,
                power,
                save: data.save,
                sustained: delayed.sustained,
            };
            let (result, outcome) = self.run_round(&mut cast);
            if let EventOutcome::Reschedule(delay) = outcome {
                self.schedule(Some(caster), GameEvent::DelayedCast(cast), delay);
            }
            result
        } else {
            let ctx = SpellContext {
                spell,
                caster,
                victim,
                power,
            };
            self.call_magic(&ctx, obj, data.routines, data.save)
        };

        if data.violent {
            if let Some(v) = victim.filter(|v| *v != caster) {
                self.retaliate(v, caster);
            }
        }
        debug!(?result, "cast resolved");
        result
    }

    fn default_victim(&self, caster: CharId, data: &SpellData) -> Option<CharId> {
        let ch = self.world.character(caster)?;
        if data.targets.contains(TargetFlags::SELF_ONLY) {
            return Some(caster);
        }
        if data.violent || data.targets.contains(TargetFlags::FIGHT_VICT) {
            return ch.fighting;
        }
        if data.targets.intersects(TargetFlags::CHAR_ROOM) {
            return Some(caster);
        }
        None
    }

    /// A mobile that was attacked with magic fights back.
    fn retaliate(&mut self, victim: CharId, caster: CharId) {
        let (Some(v), Some(c)) = (self.world.character(victim), self.world.character(caster)) else {
            return;
        };
        if v.is_npc && v.fighting.is_none() && v.is_awake() && !v.is_helpless() && v.room == c.room && !c.is_dead() {
            self.set_fighting(victim, caster);
        }
    }

    /// Run `routines` for one cast and combine their results.
    pub(crate) fn call_magic(
        &mut self,
        ctx: &SpellContext,
        obj: Option<ObjId>,
        routines: Routines,
        save: SaveKind,
    ) -> CastResult {
        let mut result = CastResult::empty();
        let victim_died = |engine: &Self| ctx.victim.is_some_and(|v| !engine.is_alive(v));
        // An object target takes only the object routines.
        let routines = if obj.is_some() && ctx.victim.is_none() {
            routines - (Routines::DAMAGE | Routines::AFFECT | Routines::UNAFFECT | Routines::POINT)
        } else {
            routines
        };

        if routines.contains(Routines::DAMAGE) {
            result |= self.mag_damage(ctx, save);
            if victim_died(self) {
                return result;
            }
        }
        if routines.contains(Routines::AFFECT) {
            result |= self.mag_affect(ctx, save);
        }
        if routines.contains(Routines::UNAFFECT) {
            result |= self.mag_unaffect(ctx);
        }
        if routines.contains(Routines::POINT) {
            result |= self.mag_point(ctx);
        }
        if routines.contains(Routines::ALTER_OBJ) {
            if let Some(o) = obj {
                result |= self.mag_alter_obj(ctx, o);
            }
        }
        if routines.contains(Routines::GROUP) {
            result |= self.mag_group(ctx);
        }
        if routines.contains(Routines::MASS) {
            result |= self.mag_mass(ctx, save);
        }
        if routines.contains(Routines::AREA) {
            result |= self.mag_area(ctx, save);
        }
        if routines.contains(Routines::SUMMON) {
            result |= self.mag_summon(ctx, obj);
        }
        if routines.contains(Routines::CREATION) {
            result |= self.mag_creation(ctx);
        }
        if routines.contains(Routines::ROOM) {
            result |= self.mag_room(ctx);
        }
        if routines.contains(Routines::BULK_OBJS) {
            result |= self.mag_bulk_objs(ctx);
        }
        if routines.contains(Routines::MANUAL) {
            let handler = self.handlers.get(ctx.spell);
            result |= handler.manual(self, ctx);
        }
        result
    }

    /// Whether `victim` shrugs off a violent spell before it takes hold.
    ///
    /// Sends the caster (and for immortals, the victim and room) the
    /// matching feedback when it does.
    pub fn evades_spell(&mut self, caster: CharId, victim: CharId, spell: SpellId, power: i32) -> bool {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, spell, "evades_spell") else {
            return false;
        };
        if !data.violent || data.always_lands {
            return false;
        }
        let (Some(c), Some(v)) = (self.world.character(caster), self.world.character(victim)) else {
            return false;
        };

        if data.circle <= 3 && v.has(EffectFlag::MinorGlobe) {
            self.act("$N's globe of invulnerability absorbs your spell.", Some(caster), Some(victim), Audience::Actor);
            self.act("Your globe absorbs $n's spell.", Some(caster), Some(victim), Audience::Target);
            self.act("$N's globe flares as it absorbs $n's spell.", Some(caster), Some(victim), Audience::Bystanders);
            return true;
        }
        if data.circle <= 6 && v.has(EffectFlag::MajorGlobe) {
            self.act("$N's shimmering globe wipes out your spell!", Some(caster), Some(victim), Audience::Actor);
            self.act("Your globe wipes out $n's spell!", Some(caster), Some(victim), Audience::Target);
            self.act("$N's shimmering globe wipes out $n's spell!", Some(caster), Some(victim), Audience::Bystanders);
            return true;
        }

        let Some(dtype) = data.damage_type else {
            return false;
        };
        let sus = susceptibility(v, dtype);
        if sus == 0 {
            self.act("Your spell has no effect on $N!", Some(caster), Some(victim), Audience::Actor);
            return true;
        }
        if v.is_immortal() && !c.is_immortal() {
            self.act("$N ignores your feeble spell.", Some(caster), Some(victim), Audience::Actor);
            self.act("You ignore $n's feeble spell.", Some(caster), Some(victim), Audience::Target);
            self.act("$N ignores $n's feeble spell.", Some(caster), Some(victim), Audience::Bystanders);
            return true;
        }
        if data.routines.intersects(Routines::DAMAGE | Routines::MANUAL) {
            return false;
        }
        if boolean_attack_evasion(v, power, dtype, &mut self.rng) {
            debug!(spell = %spell, sus, "boolean evasion");
            self.act("Your spell passes over $N harmlessly!", Some(caster), Some(victim), Audience::Actor);
            return true;
        }
        false
    }
}
