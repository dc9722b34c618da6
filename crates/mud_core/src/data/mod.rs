//! Spell catalog data.
//!
//! Pure data structures for spell definitions, deserialized from RON, plus
//! the [`Formula`] expressions they use for amounts and durations.

mod catalog;
mod formula;
mod spell_data;

pub use catalog::SpellCatalog;
pub use formula::{sorcerer_exponent, Formula, FormulaContext};
pub use spell_data::{
    AffectSpec, AffectTemplate, AlterObj, Alignment, AreaSpec, ClassBonus, ClassLevel, Cost,
    CreationSpec, DamageSpec, DamageStep, DelayedSpec, Exclusion, FoodChoice, GroupRoutine,
    GroupStep, Guard, HandlerKind, PointSpec, Requirement, RoomEffectSpec, SpellData,
    SpellMessages, Sphere, SummonKind, SummonSpec, UnaffectRule, VitalityTier,
};
