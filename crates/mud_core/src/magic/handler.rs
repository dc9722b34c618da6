//! Per-spell behaviour behind a trait.
//!
//! Every spell resolves through a [`SpellEffectHandler`]. The default
//! [`CatalogHandler`] reads the spell's catalog data; built-in handlers
//! override the capabilities data cannot express, and embedders can
//! register their own in the [`HandlerRegistry`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::error;

use super::delayed::DelayedCast;
use crate::components::{ApplyLocation, CharId, SpellId};
use crate::data::{Formula, FormulaContext, HandlerKind, SpellCatalog, SpellData, VitalityTier};
use crate::effects::{Effect, EffectBatch};
use crate::engine::Engine;
use crate::flags::{CastResult, EffectFlag};
use crate::rng::RandomSource;
use crate::world::World;

/// Who is casting what on whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellContext {
    /// Spell.
    pub spell: SpellId,
    /// Caster.
    pub caster: CharId,
    /// Victim, if any.
    pub victim: Option<CharId>,
    /// Caster proficiency.
    pub power: i32,
}

impl SpellContext {
    /// Formula inputs for this cast.
    #[must_use]
    pub fn formula_context(&self, world: &World, data: &SpellData) -> FormulaContext {
        let caster_level = world.character(self.caster).map_or(0, |c| c.level);
        let victim_level = self
            .victim
            .and_then(|v| world.character(v))
            .map_or(0, |c| c.level);
        FormulaContext {
            power: self.power,
            caster_level,
            victim_level,
            min_level: data.min_level,
            circle: i32::from(data.circle),
        }
    }
}

/// Direct resource changes computed for one point cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointAmounts {
    /// Hit points; negative hurts.
    pub hit: i32,
    /// Movement points.
    pub moves: i32,
    /// Hunger relief.
    pub hunger: i32,
    /// Thirst relief.
    pub thirst: i32,
    /// Hiddenness change.
    pub hiddenness: i32,
}

/// The capabilities a spell resolves through.
pub trait SpellEffectHandler: Send + Sync + fmt::Debug {
    /// Base damage before the pipeline runs.
    fn base_damage(&self, data: &SpellData, ctx: &FormulaContext, rng: &mut dyn RandomSource) -> i32 {
        data.damage.as_ref().map_or(0, |d| d.formula.eval(ctx, rng))
    }

    /// Effect records an affect cast produces.
    fn build_affects(&self, data: &SpellData, ctx: &FormulaContext, rng: &mut dyn RandomSource) -> EffectBatch {
        let mut batch = EffectBatch::new();
        let Some(spec) = &data.affects else {
            return batch;
        };
        let duration = spec.duration.eval(ctx, rng);
        for template in &spec.effects {
            let mut effect = Effect::new(
                data.id,
                template
                    .duration
                    .as_ref()
                    .map_or(duration, |d| d.eval(ctx, &mut *rng)),
            );
            if template.location != ApplyLocation::None {
                effect = effect.with_modifier(template.location, template.modifier.eval(ctx, rng));
            }
            for flag in &template.flags {
                effect = effect.with_flag(*flag);
            }
            if batch.try_push(effect).is_err() {
                error!(spell = %data.id, "affect batch overflow");
                break;
            }
        }
        batch
    }

    /// Resource changes a point cast produces.
    fn point_amounts(&self, data: &SpellData, ctx: &FormulaContext, rng: &mut dyn RandomSource) -> PointAmounts {
        let Some(spec) = &data.points else {
            return PointAmounts::default();
        };
        let mut eval = |f: &Option<Formula>| f.as_ref().map_or(0, |f| f.eval(ctx, &mut *rng));
        PointAmounts {
            hit: eval(&spec.hit),
            moves: eval(&spec.moves),
            hunger: eval(&spec.hunger),
            thirst: eval(&spec.thirst),
            hiddenness: eval(&spec.hiddenness),
        }
    }

    /// The manual routine.
    fn manual(&self, _engine: &mut Engine, cast: &SpellContext) -> CastResult {
        error!(spell = %cast.spell, "manual routine without a handler");
        CastResult::CHARGE
    }

    /// Called after each round of a delayed cast.
    fn after_round(&self, _engine: &mut Engine, _cast: &DelayedCast, _finished: bool) {}
}

/// Interprets catalog data.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogHandler;

impl SpellEffectHandler for CatalogHandler {}

/// Temporary hit points from the endurance family.
#[derive(Debug, Clone, Copy)]
pub struct VitalityHandler {
    tier: VitalityTier,
}

impl VitalityHandler {
    /// Handler for a tier.
    #[must_use]
    pub const fn new(tier: VitalityTier) -> Self {
        Self { tier }
    }

    /// Hit points gained before the random shave.
    #[must_use]
    pub const fn base_gain(&self, power: i32) -> i32 {
        let (div, base) = match self.tier {
            VitalityTier::LesserEndurance => (80, 25),
            VitalityTier::Endurance => (60, 40),
            VitalityTier::GreaterEndurance => (40, 50),
            VitalityTier::Vitality => (35, 75),
            VitalityTier::GreaterVitality => (30, 75),
            VitalityTier::DragonsHealth => (20, 90),
        };
        power * power / div + base
    }

    /// Duration in ticks.
    #[must_use]
    pub const fn duration(&self, power: i32) -> i32 {
        match self.tier {
            VitalityTier::LesserEndurance => {
                let d = power / 30;
                if d == 0 {
                    2
                } else {
                    d
                }
            }
            VitalityTier::Endurance | VitalityTier::Vitality => {
                if power > 95 {
                    5
                } else if power > 0 && power / 20 == 0 {
                    2
                } else {
                    power / 20
                }
            }
            VitalityTier::GreaterEndurance | VitalityTier::GreaterVitality => {
                if power > 95 {
                    7
                } else {
                    power / 15
                }
            }
            VitalityTier::DragonsHealth => power / 10,
        }
    }
}

impl SpellEffectHandler for VitalityHandler {
    fn build_affects(&self, data: &SpellData, ctx: &FormulaContext, rng: &mut dyn RandomSource) -> EffectBatch {
        let hp = self.base_gain(ctx.power) - rng.number(2, 10);
        let mut batch = EffectBatch::new();
        batch.push(
            Effect::new(data.id, self.duration(ctx.power))
                .with_modifier(ApplyLocation::MaxHit, hp)
                .with_flag(EffectFlag::Vitality),
        );
        batch
    }
}

/// Sustained self-immolation: each round scorches the caster's enemies and
/// the final round sets the caster alight.
#[derive(Debug, Clone, Copy, Default)]
pub struct PyreHandler;

impl SpellEffectHandler for PyreHandler {
    fn manual(&self, engine: &mut Engine, cast: &SpellContext) -> CastResult {
        engine.pyre_round(cast)
    }

    fn after_round(&self, engine: &mut Engine, cast: &DelayedCast, finished: bool) {
        if finished && engine.is_alive(cast.caster) {
            engine.catch_fire(cast.caster);
        }
    }
}

/// Handlers keyed by spell.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    default: Arc<dyn SpellEffectHandler>,
    overrides: BTreeMap<SpellId, Arc<dyn SpellEffectHandler>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            default: Arc::new(CatalogHandler),
            overrides: BTreeMap::new(),
        }
    }
}

impl HandlerRegistry {
    /// Built-in handlers for every catalog spell that names one.
    #[must_use]
    pub fn standard(catalog: &SpellCatalog) -> Self {
        let mut registry = Self::default();
        for spell in catalog.iter() {
            match spell.handler {
                Some(HandlerKind::Vitality(tier)) => {
                    registry.register(spell.id, Arc::new(VitalityHandler::new(tier)));
                }
                Some(HandlerKind::Pyre) => registry.register(spell.id, Arc::new(PyreHandler)),
                None => {}
            }
        }
        registry
    }

    /// Install a handler, replacing any previous one for the spell.
    pub fn register(&mut self, spell: SpellId, handler: Arc<dyn SpellEffectHandler>) {
        self.overrides.insert(spell, handler);
    }

    /// Handler for a spell.
    #[must_use]
    pub fn get(&self, spell: SpellId) -> Arc<dyn SpellEffectHandler> {
        self.overrides
            .get(&spell)
            .map_or_else(|| Arc::clone(&self.default), Arc::clone)
    }

    /// Number of spells with their own handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Whether every spell uses the catalog handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
