//! The unaffect routine: cures and dispels.

use std::sync::Arc;

use tracing::{debug, error};

use super::handler::SpellContext;
use super::spell_for;
use crate::components::SpellId;
use crate::data::UnaffectRule;
use crate::engine::Engine;
use crate::flags::{CastResult, EffectFlag};
use crate::messaging::Audience;

impl Engine {
    /// Remove one category of condition from the victim.
    ///
    /// When several rules match, only the last one listed is applied, so a
    /// single cast never strips unrelated effects. Innate effects are never
    /// removed.
    pub fn mag_unaffect(&mut self, ctx: &SpellContext) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_unaffect") else {
            return CastResult::CHARGE;
        };
        if data.unaffect.is_empty() {
            error!(spell = %ctx.spell, "SYSERR: unaffect routine without rules");
            return CastResult::CHARGE;
        }
        let victim = ctx.victim.unwrap_or(ctx.caster);
        let Some(v) = self.world.character(victim).filter(|v| !v.is_dead()) else {
            return CastResult::empty();
        };

        let matches = |rule: &UnaffectRule| -> bool {
            let ids = catalog.ids_of(&rule.spells);
            v.effects().iter().any(|e| {
                e.spell != SpellId::INNATE
                    && (ids.contains(&e.spell) || rule.flags.iter().any(|f| e.flags.contains(*f)))
            })
        };
        let Some(rule) = data.unaffect.iter().rev().find(|r| matches(r)) else {
            if victim == ctx.caster {
                self.send(ctx.caster, "Nothing seems to happen.");
            } else {
                self.act("Nothing seems to happen to $N.", Some(ctx.caster), Some(victim), Audience::Actor);
            }
            return CastResult::CHARGE;
        };

        let ids = catalog.ids_of(&rule.spells);
        let removed = self
            .world
            .char_effects_mut(victim)
            .map(|effects| {
                effects.remove_where(|e| {
                    e.spell != SpellId::INNATE
                        && (ids.contains(&e.spell) || rule.flags.iter().any(|f| e.flags.contains(*f)))
                })
            })
            .unwrap_or_default();
        debug!(spell = %ctx.spell, removed = removed.len(), "unaffect");

        if let Some(text) = &rule.message {
            if victim == ctx.caster {
                self.send(victim, text);
            } else {
                self.act(text, Some(ctx.caster), Some(victim), Audience::Target);
            }
        }
        if let Some(text) = &rule.to_room {
            self.act(text, Some(victim), None, Audience::Bystanders);
        }

        let lost_charm = removed.iter().any(|e| e.flags.contains(EffectFlag::Charm));
        if lost_charm && self.world.character(victim).is_some_and(|v| !v.has(EffectFlag::Charm)) {
            self.release_charm(victim);
        }
        CastResult::SUCCESS
    }
}
