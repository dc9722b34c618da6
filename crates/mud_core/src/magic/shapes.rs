//! Targeting shapes: group, mass, area and bulk-object wrappers.
//!
//! Each shape enumerates its targets from a snapshot of the room, then
//! re-validates every target before acting on it, since an earlier victim's
//! death can change the room mid-loop. A shape with no valid target fizzles
//! to a charge.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::handler::SpellContext;
use super::spell_for;
use crate::combat::{area_attack_target, mass_attack_ok};
use crate::components::{CharId, RoomId, SaveKind};
use crate::data::{Alignment, GroupRoutine, SpellData};
use crate::engine::Engine;
use crate::flags::CastResult;
use crate::messaging::Audience;

fn alignment_matches(align: Alignment, good: bool, evil: bool) -> bool {
    match align {
        Alignment::Good => good,
        Alignment::Evil => evil,
    }
}

impl Engine {
    /// Run the spell's group steps on every group member in the room, the
    /// caster last.
    pub fn mag_group(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_group") else {
            return CastResult::CHARGE;
        };
        if data.group.is_empty() {
            error!(spell = %ctx.spell, "SYSERR: group routine without group steps");
            return CastResult::CHARGE;
        }
        let Some(room) = self.world.character(ctx.caster).filter(|c| !c.is_dead()).and_then(|c| c.room) else {
            return CastResult::empty();
        };
        if self.world.character(ctx.caster).is_some_and(|c| !c.in_group()) {
            self.send(ctx.caster, "You don't have a group!");
            return CastResult::CHARGE;
        }

        let mut members: Vec<CharId> = self
            .world
            .people_in(room)
            .into_iter()
            .filter(|p| *p != ctx.caster && self.world.is_grouped(ctx.caster, *p))
            .collect();
        members.push(ctx.caster);

        self.spell_messages(&data.messages, ctx.caster, None);
        for member in members {
            if !self.is_alive(member) {
                continue;
            }
            for step in &data.group {
                let Some(spell) = catalog.id_of(&step.spell) else {
                    error!(spell = %ctx.spell, step = %step.spell, "SYSERR: group step names unknown spell");
                    continue;
                };
                let sub = SpellContext {
                    spell,
                    victim: Some(member),
                    ..*ctx
                };
                let save = catalog.get(spell).map_or(SaveKind::Spell, |d| d.save);
                match step.routine {
                    GroupRoutine::Affect => {
                        self.mag_affect(&sub, save);
                    }
                    GroupRoutine::Point => {
                        self.mag_point(&sub);
                    }
                    GroupRoutine::Unaffect => {
                        self.mag_unaffect(&sub);
                    }
                }
            }
        }
        CastResult::SUCCESS
    }

    /// Affect everyone else in the room who may be attacked, sparing the
    /// caster's group.
    pub fn mag_mass(&mut self, ctx: &SpellContext, save: SaveKind) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_mass") else {
            return CastResult::CHARGE;
        };
        let Some(room) = self.world.character(ctx.caster).filter(|c| !c.is_dead()).and_then(|c| c.room) else {
            return CastResult::empty();
        };

        let targets: Vec<CharId> = self
            .world
            .people_in(room)
            .into_iter()
            .filter(|t| {
                *t != ctx.caster
                    && !self.world.is_grouped(ctx.caster, *t)
                    && mass_attack_ok(&self.world, &self.config, ctx.caster, *t)
            })
            .collect();
        if targets.is_empty() {
            self.send(ctx.caster, "There is nobody here to affect.");
            return CastResult::CHARGE;
        }

        self.spell_messages(&data.messages, ctx.caster, None);
        for target in targets {
            if !self.is_alive(target) || !self.is_alive(ctx.caster) {
                continue;
            }
            let sub = SpellContext {
                victim: Some(target),
                ..*ctx
            };
            self.mag_affect(&sub, save);
            if data.violent && self.world.character(target).is_some_and(|t| t.fighting.is_none()) {
                self.set_fighting(target, ctx.caster);
            }
        }
        CastResult::SUCCESS
    }

    /// Strike every valid area target in the room.
    pub fn mag_area(&mut self, ctx: &SpellContext, save: SaveKind) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_area") else {
            return CastResult::CHARGE;
        };
        let spec = data.area.clone().unwrap_or_default();
        let Some(c) = self.world.character(ctx.caster).filter(|c| !c.is_dead()) else {
            return CastResult::empty();
        };
        let Some(room) = c.room else {
            return CastResult::empty();
        };
        let (good, evil) = (c.is_good(), c.is_evil());

        if spec.needs_ground {
            let grounded = self
                .world
                .room(room)
                .is_some_and(|r| !r.sector.is_water() && !r.sector.is_air());
            if !grounded {
                self.send(ctx.caster, "Quake the earth?  What earth?  There's no ground here!");
                return CastResult::CHARGE;
            }
        }
        if spec.backfires_on.is_some_and(|a| alignment_matches(a, good, evil)) {
            self.send(ctx.caster, "The power of your spell turns back upon you!");
            self.act("$n is consumed by $s own spell!", Some(ctx.caster), None, Audience::Bystanders);
            info!(caster = ctx.caster.raw(), spell = %ctx.spell, "area spell backfired");
            self.die(ctx.caster, None);
            return CastResult::CHARGE;
        }

        let targets = self.area_targets(ctx.caster, room, spec.only);
        if targets.is_empty() {
            self.send(ctx.caster, "There is nobody here to affect.");
            return CastResult::CHARGE;
        }
        self.spell_messages(&data.messages, ctx.caster, None);
        for target in targets {
            if !self.is_alive(target) || !self.is_alive(ctx.caster) {
                continue;
            }
            let sub = SpellContext {
                victim: Some(target),
                ..*ctx
            };
            self.area_hit(&sub, data, save);
        }
        CastResult::SUCCESS
    }

    fn area_targets(&self, caster: CharId, room: RoomId, only: Option<Alignment>) -> Vec<CharId> {
        self.world
            .people_in(room)
            .into_iter()
            .filter(|t| area_attack_target(&self.world, &self.config, caster, *t))
            .filter(|t| match only {
                Some(align) => self
                    .world
                    .character(*t)
                    .is_some_and(|v| alignment_matches(align, v.is_good(), v.is_evil())),
                None => true,
            })
            .collect()
    }

    fn area_hit(&mut self, sub: &SpellContext, data: &SpellData, save: SaveKind) {
        if data.damage.is_some() {
            self.mag_damage(sub, save);
        } else if data.affects.is_some() {
            self.mag_affect(sub, save);
        } else {
            error!(spell = %sub.spell, "SYSERR: area spell with neither damage nor affects");
        }
    }

    /// Alter every object lying in the room.
    pub fn mag_bulk_objs(&mut self, ctx: &SpellContext) -> CastResult {
        let Some(room) = self.world.character(ctx.caster).filter(|c| !c.is_dead()).and_then(|c| c.room) else {
            return CastResult::empty();
        };
        let objects = self.world.objects_in(room);
        if objects.is_empty() {
            self.send(ctx.caster, "There is nothing here to affect.");
            return CastResult::CHARGE;
        }
        let mut result = CastResult::CHARGE;
        for obj in objects {
            if self.world.object(obj).is_some() {
                result |= self.mag_alter_obj(ctx, obj);
            }
        }
        result
    }

    /// One round of a pyre: the flames scorch every area target.
    pub fn pyre_round(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "pyre_round") else {
            return CastResult::CHARGE;
        };
        let Some(room) = self.world.character(ctx.caster).filter(|c| !c.is_dead()).and_then(|c| c.room) else {
            return CastResult::empty();
        };
        self.act("Flames roar up around $n!", Some(ctx.caster), None, Audience::Bystanders);
        self.send(ctx.caster, "Flames roar up around you!");

        let targets = self.area_targets(ctx.caster, room, None);
        debug!(spell = %ctx.spell, targets = targets.len(), "pyre round");
        if data.damage.is_some() {
            for target in targets {
                if !self.is_alive(target) || !self.is_alive(ctx.caster) {
                    continue;
                }
                let sub = SpellContext {
                    victim: Some(target),
                    ..*ctx
                };
                self.mag_damage(&sub, data.save);
            }
        }
        CastResult::SUCCESS
    }
}
