//! Object alteration and creation routines.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::handler::SpellContext;
use super::spell_for;
use crate::components::ObjId;
use crate::data::{AlterObj, CreationSpec, FoodChoice};
use crate::effects::{Effect, JoinMode};
use crate::engine::Engine;
use crate::flags::{CastResult, EffectFlag, ItemFlags};
use crate::messaging::Audience;
use crate::object::{ObjKind, ObjLocation, ObjectSpawn};

/// Item flags that make a weapon unreceptive to a blessing or hex.
fn impurities() -> ItemFlags {
    ItemFlags::GLOW | ItemFlags::HUM | ItemFlags::INVISIBLE | ItemFlags::MAGIC | ItemFlags::NODROP
}

/// Pick the richest food the caster qualifies for.
fn best_food<'a>(menu: &'a [FoodChoice], class: crate::components::Class, power: i32) -> Option<&'a FoodChoice> {
    menu.iter()
        .filter(|f| f.min_power <= power && (f.classes.is_empty() || f.classes.contains(&class)))
        .max_by_key(|f| f.min_power)
        .or_else(|| menu.first())
}

impl Engine {
    fn act_obj(&mut self, template: &str, ch: crate::components::CharId, obj: ObjId, audience: Audience) {
        let name = self.world.object(obj).map_or_else(|| "something".to_owned(), |o| o.name.clone());
        let text = template.replace("$p", &name);
        self.act(&text, Some(ch), None, audience);
    }

    /// Alter an object in place.
    pub fn mag_alter_obj(&mut self, ctx: &SpellContext, obj: ObjId) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_alter_obj") else {
            return CastResult::CHARGE;
        };
        let Some(alteration) = data.alter_obj else {
            error!(spell = %ctx.spell, "SYSERR: alter_obj routine without an alteration");
            return CastResult::CHARGE;
        };
        let Some(godly) = self.world.character(ctx.caster).map(|c| c.is_immortal()) else {
            return CastResult::empty();
        };
        if self.world.object(obj).is_none() {
            return CastResult::empty();
        }

        let mut result = CastResult::CHARGE | CastResult::IMPROVE;
        let message: Option<&str> = match alteration {
            AlterObj::BlessWeapon | AlterObj::HexWeapon => {
                let (text, outcome) = self.enchant_weapon(ctx, obj, alteration, godly);
                result = outcome;
                text
            }
            AlterObj::Curse => {
                let changed = self.world.object_mut(obj).is_some_and(|o| {
                    if o.item_flags.contains(ItemFlags::NODROP) {
                        return false;
                    }
                    o.item_flags.insert(ItemFlags::NODROP);
                    if let ObjKind::Weapon { dice_size, .. } = &mut o.kind {
                        *dice_size = (*dice_size - 1).max(1);
                    }
                    true
                });
                changed.then_some("$p briefly glows red.")
            }
            AlterObj::RemoveCurse => {
                let changed = self.world.object_mut(obj).is_some_and(|o| {
                    if !o.item_flags.contains(ItemFlags::NODROP) {
                        return false;
                    }
                    o.item_flags.remove(ItemFlags::NODROP);
                    if let ObjKind::Weapon { dice_size, .. } = &mut o.kind {
                        *dice_size += 1;
                    }
                    true
                });
                changed.then_some("$p briefly glows blue.")
            }
            AlterObj::Invisibility => self
                .world
                .object(obj)
                .is_some_and(|o| !o.item_flags.intersects(ItemFlags::NOINVIS | ItemFlags::INVISIBLE))
                .then_some("$p vanishes."),
            AlterObj::Poison | AlterObj::RemovePoison => {
                let poison = alteration == AlterObj::Poison;
                let changed = self.world.object_mut(obj).is_some_and(|o| {
                    let consumable = matches!(o.kind, ObjKind::Food { .. } | ObjKind::Drink { .. } | ObjKind::Fountain);
                    if !consumable || o.item_flags.contains(ItemFlags::POISONED) == poison {
                        return false;
                    }
                    o.item_flags.set(ItemFlags::POISONED, poison);
                    true
                });
                changed.then_some("$p steams briefly.")
            }
        };

        match message {
            Some(text) => {
                self.act_obj(text, ctx.caster, obj, Audience::Actor);
                self.act_obj(text, ctx.caster, obj, Audience::Bystanders);
            }
            None => self.send(ctx.caster, "Nothing seems to happen."),
        }
        // The vanishing is described before it happens.
        if alteration == AlterObj::Invisibility && message.is_some() {
            if let Some(o) = self.world.object_mut(obj) {
                o.item_flags.insert(ItemFlags::INVISIBLE);
            }
        }
        debug!(spell = %ctx.spell, ?alteration, ?result, "object altered");
        result
    }

    fn enchant_weapon(
        &mut self,
        ctx: &SpellContext,
        obj: ObjId,
        alteration: AlterObj,
        godly: bool,
    ) -> (Option<&'static str>, CastResult) {
        let bless = alteration == AlterObj::BlessWeapon;
        let (flag, anti, opposed) = if bless {
            (EffectFlag::Bless, ItemFlags::ANTI_EVIL, ItemFlags::ANTI_GOOD)
        } else {
            (EffectFlag::Hex, ItemFlags::ANTI_GOOD, ItemFlags::ANTI_EVIL)
        };
        let done = if bless { "$p glows briefly." } else { "$p is imbued with a dark aura." };
        let Some(o) = self.world.object(obj) else {
            return (None, CastResult::empty());
        };

        if godly {
            if o.has(flag) {
                let text = if bless { "It's already blessed." } else { "It's already hexed." };
                return (Some(text), CastResult::CHARGE | CastResult::IMPROVE);
            }
        } else if !o.is_weapon() {
            return (Some("This spell is only effective on weapons."), CastResult::empty());
        } else if o.level > ctx.power {
            let text = if bless { "$p is too powerful for you to bless." } else { "$p is too powerful for you to hex." };
            return (Some(text), CastResult::CHARGE);
        } else if o.weight > 5 * ctx.power {
            let text = if bless { "$p is too large for you to bless." } else { "$p is too large for you to hex." };
            return (Some(text), CastResult::CHARGE);
        } else if o.item_flags.intersects(impurities() | opposed) {
            let text = if bless {
                "$p doesn't seem receptive to the blessing."
            } else {
                "$p doesn't seem receptive to the malediction."
            };
            return (Some(text), CastResult::CHARGE);
        } else if !o.effects().flags().is_empty() || o.applies > 0 {
            let text = if bless { "The blessing is repelled from $p." } else { "The hex is repelled from $p." };
            return (Some(text), CastResult::CHARGE);
        }

        let enchantment = Effect::new(ctx.spell, Effect::PERMANENT).with_flag(flag);
        if let Some(effects) = self.world.obj_effects_mut(obj) {
            if let Err(e) = effects.apply(enchantment, JoinMode::ADD_ONLY) {
                warn!(error = %e, "weapon enchantment rejected");
            }
        }
        if let Some(o) = self.world.object_mut(obj) {
            o.item_flags.insert(anti);
        }
        (Some(done), CastResult::CHARGE | CastResult::IMPROVE)
    }

    /// Conjure a spring into the room or food into the caster's hands.
    pub fn mag_creation(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_creation") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.creation else {
            error!(spell = %ctx.spell, "SYSERR: creation routine without creation data");
            return CastResult::CHARGE;
        };
        let Some(c) = self.world.character(ctx.caster).filter(|c| !c.is_dead()) else {
            return CastResult::empty();
        };
        let Some(room) = c.room else {
            return CastResult::empty();
        };
        let class = c.class;

        let (spawn, location) = match spec {
            CreationSpec::Spring { name, timer } => {
                let sector = self.world.room(room).map(|r| r.sector);
                if sector.is_some_and(|s| s.is_water() || s.is_air()) {
                    self.send(ctx.caster, "Nothing happens.");
                    self.act("$n completes $s spell, but nothing happens.", Some(ctx.caster), None, Audience::Bystanders);
                    return CastResult::CHARGE;
                }
                let spawn = ObjectSpawn {
                    name: name.clone(),
                    kind: ObjKind::Fountain,
                    weight: 0,
                    timer: *timer,
                    ..ObjectSpawn::default()
                };
                (spawn, ObjLocation::Room(room))
            }
            CreationSpec::Food { menu } => {
                let Some(food) = best_food(menu, class, ctx.power) else {
                    error!(spell = %ctx.spell, "SYSERR: creation menu is empty");
                    self.send(ctx.caster, "I seem to have goofed.");
                    return CastResult::empty();
                };
                let spawn = ObjectSpawn {
                    name: food.name.clone(),
                    kind: ObjKind::Food { filling: food.filling },
                    ..ObjectSpawn::default()
                };
                (spawn, ObjLocation::Carried(ctx.caster))
            }
        };

        let created = match self.world.spawn_object(spawn, location) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "created object could not be placed");
                self.send(ctx.caster, "I seem to have goofed.");
                return CastResult::empty();
            }
        };
        info!(spell = %ctx.spell, object = created.raw(), "object created");

        let (to_caster, to_room) = match spec {
            CreationSpec::Spring { .. } => (
                "A fresh clear spring of water bursts through the ground here.",
                "A fresh clear spring of water bursts through the ground here.",
            ),
            CreationSpec::Food { .. } => ("You create $p.", "$n creates $p."),
        };
        let to_caster = data.messages.to_caster.as_deref().unwrap_or(to_caster);
        let to_room = data.messages.to_room.as_deref().unwrap_or(to_room);
        self.act_obj(to_room, ctx.caster, created, Audience::Bystanders);
        self.act_obj(to_caster, ctx.caster, created, Audience::Actor);
        CastResult::CHARGE | CastResult::IMPROVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Class, Sector};
    use crate::magic::CastTarget;
    use crate::test_support::{caster_in, spell, test_engine};

    fn sword(engine: &mut Engine, room: crate::components::RoomId, level: i32, weight: i32) -> ObjId {
        engine
            .world_mut()
            .spawn_object(
                ObjectSpawn {
                    name: "a short sword".into(),
                    kind: ObjKind::Weapon {
                        dice_count: 2,
                        dice_size: 6,
                        damage_type: crate::damage::DamageType::Slash,
                    },
                    level,
                    weight,
                    ..ObjectSpawn::default()
                },
                ObjLocation::Room(room),
            )
            .unwrap()
    }

    #[test]
    fn test_bless_weapon_enchants_and_marks_anti_evil() {
        let (mut engine, room) = test_engine(Sector::Field);
        let cleric = caster_in(&mut engine, room, 40);
        let blade = sword(&mut engine, room, 10, 5);
        let result = engine.cast(cleric, spell(&engine, "bless"), CastTarget::Obj(blade), 40);
        assert!(result.contains(CastResult::IMPROVE));
        let o = engine.world().object(blade).unwrap();
        assert!(o.has(EffectFlag::Bless));
        assert!(o.item_flags.contains(ItemFlags::ANTI_EVIL));
        let blessing = o.effects().find(spell(&engine, "bless")).unwrap();
        assert!(blessing.is_permanent());
        assert!(blessing.flags.contains(EffectFlag::Bless));
    }

    #[test]
    fn test_bless_refuses_heavy_weapon() {
        let (mut engine, room) = test_engine(Sector::Field);
        let cleric = caster_in(&mut engine, room, 10);
        let blade = sword(&mut engine, room, 5, 200);
        let result = engine.cast(cleric, spell(&engine, "bless"), CastTarget::Obj(blade), 10);
        assert_eq!(result, CastResult::CHARGE);
        assert!(!engine.world().object(blade).unwrap().has(EffectFlag::Bless));
    }

    #[test]
    fn test_curse_then_remove_restores_dice() {
        let (mut engine, room) = test_engine(Sector::Field);
        let cleric = caster_in(&mut engine, room, 40);
        let blade = sword(&mut engine, room, 10, 5);
        engine.cast(cleric, spell(&engine, "curse"), CastTarget::Obj(blade), 40);
        let o = engine.world().object(blade).unwrap();
        assert!(o.item_flags.contains(ItemFlags::NODROP));
        assert!(matches!(o.kind, ObjKind::Weapon { dice_size: 5, .. }));
        engine.cast(cleric, spell(&engine, "remove curse"), CastTarget::Obj(blade), 40);
        let o = engine.world().object(blade).unwrap();
        assert!(!o.item_flags.contains(ItemFlags::NODROP));
        assert!(matches!(o.kind, ObjKind::Weapon { dice_size: 6, .. }));
    }

    #[test]
    fn test_create_spring_refused_over_water() {
        let (mut engine, room) = test_engine(Sector::Water);
        let cleric = caster_in(&mut engine, room, 30);
        let before = engine.world().object_count();
        let result = engine.cast(cleric, spell(&engine, "create spring"), CastTarget::None, 30);
        assert_eq!(result, CastResult::CHARGE);
        assert_eq!(engine.world().object_count(), before);
    }

    #[test]
    fn test_create_food_lands_in_inventory() {
        let (mut engine, room) = test_engine(Sector::Field);
        let cleric = caster_in(&mut engine, room, 30);
        engine.cast(cleric, spell(&engine, "create food"), CastTarget::None, 30);
        let carried = &engine.world().character(cleric).unwrap().inventory;
        assert_eq!(carried.len(), 1);
        let food = engine.world().object(carried[0]).unwrap();
        assert!(matches!(food.kind, ObjKind::Food { .. }));
    }

    #[test]
    fn test_best_food_respects_class() {
        let menu = vec![
            FoodChoice { min_power: 0, classes: vec![], name: "a waybread".into(), filling: 10 },
            FoodChoice { min_power: 20, classes: vec![Class::Druid], name: "a nut cake".into(), filling: 20 },
            FoodChoice { min_power: 40, classes: vec![], name: "a honey loaf".into(), filling: 30 },
        ];
        assert_eq!(best_food(&menu, Class::Druid, 30).unwrap().name, "a nut cake");
        assert_eq!(best_food(&menu, Class::Cleric, 30).unwrap().name, "a waybread");
        assert_eq!(best_food(&menu, Class::Cleric, 90).unwrap().name, "a honey loaf");
    }
}
