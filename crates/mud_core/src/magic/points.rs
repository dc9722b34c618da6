//! The point routine: one-off resource adjustments.

use std::sync::Arc;

use tracing::error;

use super::handler::SpellContext;
use super::spell_for;
use crate::damage::susceptibility;
use crate::engine::Engine;
use crate::flags::CastResult;
use crate::math::percent_of;
use crate::messaging::Audience;

/// Hunger and thirst ceiling.
pub const MAX_CONDITION: i32 = 24;

/// Hiddenness ceiling.
pub const MAX_HIDDENNESS: i32 = 1000;

impl Engine {
    /// Heal, restore movement, feed, water or conceal the victim.
    ///
    /// Negative hit point amounts are dealt as damage.
    pub fn mag_point(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_point") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.points else {
            error!(spell = %ctx.spell, "SYSERR: point routine without point data");
            return CastResult::CHARGE;
        };
        let victim = ctx.victim.unwrap_or(ctx.caster);
        if !self.is_alive(victim) {
            return CastResult::empty();
        }

        let handler = self.handlers.get(ctx.spell);
        let fctx = ctx.formula_context(&self.world, data);
        let amounts = handler.point_amounts(data, &fctx, &mut self.rng);

        let mut hit = amounts.hit;
        if let (Some(dtype), Some(v)) = (spec.scale_by, self.world.character(victim)) {
            hit = percent_of(hit, susceptibility(v, dtype));
        }

        if let Some(v) = self.world.character_mut(victim) {
            if hit > 0 {
                v.hit = (v.hit + hit).min(v.max_hit().max(v.hit));
            }
            if amounts.moves != 0 {
                v.moves = (v.moves + amounts.moves).clamp(0, v.max_moves().max(v.moves));
            }
            if amounts.hunger != 0 {
                v.hunger = (v.hunger + amounts.hunger).clamp(0, MAX_CONDITION);
            }
            if amounts.thirst != 0 {
                v.thirst = (v.thirst + amounts.thirst).clamp(0, MAX_CONDITION);
            }
            if amounts.hiddenness != 0 {
                v.hiddenness = (v.hiddenness + amounts.hiddenness).clamp(0, MAX_HIDDENNESS);
            }
        }
        if hit > 0 {
            self.update_stance_from_hit(victim);
        }

        if let Some(text) = &spec.message {
            if victim == ctx.caster {
                self.send(victim, text);
            } else {
                self.act(text, Some(ctx.caster), Some(victim), Audience::Target);
            }
        }
        self.spell_messages(&data.messages, ctx.caster, Some(victim));

        if hit < 0 {
            self.damage(Some(ctx.caster), victim, -hit);
        } else {
            self.start_regen(victim);
        }
        CastResult::SUCCESS
    }
}
