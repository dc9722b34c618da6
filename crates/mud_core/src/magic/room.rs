//! The room routine: conditions laid over a whole room.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::handler::SpellContext;
use super::spell_for;
use crate::engine::Engine;
use crate::flags::CastResult;
use crate::messaging::Audience;
use crate::world::RoomEffect;

impl Engine {
    /// Raise a timed room condition in the caster's room.
    ///
    /// Refused when the sector forbids it or the condition is already up.
    pub fn mag_room(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_room") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.room_effect else {
            error!(spell = %ctx.spell, "SYSERR: room routine without room effect data");
            return CastResult::CHARGE;
        };
        let Some(room_id) = self.world.character(ctx.caster).filter(|c| !c.is_dead()).and_then(|c| c.room) else {
            return CastResult::empty();
        };
        let Some(room) = self.world.room(room_id) else {
            return CastResult::empty();
        };
        if spec.forbidden_sectors.contains(&room.sector) || room.effect_flags().intersects(spec.flag) {
            self.send(ctx.caster, &spec.refused);
            return CastResult::CHARGE;
        }

        let fctx = ctx.formula_context(&self.world, data);
        let timer = spec.duration.eval(&fctx, &mut self.rng).max(1);
        let effect = RoomEffect {
            room: room_id,
            spell: ctx.spell,
            flag: spec.flag,
            timer,
        };
        if let Err(e) = self.world.add_room_effect(effect) {
            warn!(error = %e, "room effect rejected");
            return CastResult::CHARGE;
        }
        info!(spell = %ctx.spell, room = room_id.0, timer, "room effect raised");

        if let Some(text) = &data.messages.to_caster {
            self.send(ctx.caster, text);
        }
        if let Some(text) = &data.messages.to_room {
            self.act(text, Some(ctx.caster), None, Audience::Bystanders);
        }
        CastResult::CHARGE | CastResult::IMPROVE
    }
}

#[cfg(test)]
mod tests {
    use crate::components::Sector;
    use crate::flags::{CastResult, RoomEffectFlags};
    use crate::magic::CastTarget;
    use crate::test_support::{caster_in, spell, test_engine};

    #[test]
    fn test_circle_of_fire_raises_room_flag() {
        let (mut engine, room) = test_engine(Sector::Field);
        let mage = caster_in(&mut engine, room, 50);
        let result = engine.cast(mage, spell(&engine, "circle of fire"), CastTarget::None, 50);
        assert!(result.contains(CastResult::CHARGE));
        let flags = engine.world().room(room).unwrap().effect_flags();
        assert!(flags.contains(RoomEffectFlags::CIRCLE_FIRE));
    }

    #[test]
    fn test_circle_of_fire_refused_on_water() {
        let (mut engine, room) = test_engine(Sector::Water);
        let mage = caster_in(&mut engine, room, 50);
        let result = engine.cast(mage, spell(&engine, "circle of fire"), CastTarget::None, 50);
        assert_eq!(result, CastResult::CHARGE);
        assert!(engine.world().room_effects().is_empty());
    }

    #[test]
    fn test_second_circle_refused() {
        let (mut engine, room) = test_engine(Sector::Field);
        let mage = caster_in(&mut engine, room, 50);
        let fire = spell(&engine, "circle of fire");
        engine.cast(mage, fire, CastTarget::None, 50);
        let again = engine.cast(mage, fire, CastTarget::None, 50);
        assert_eq!(again, CastResult::CHARGE);
        assert_eq!(engine.world().room_effects().len(), 1);
    }
}
