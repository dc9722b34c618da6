//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the effect store and resistance model.

use proptest::prelude::*;

use mud_core::components::{ApplyLocation, SpellId};
use mud_core::composition::Composition;
use mud_core::damage::DamageType;
use mud_core::effects::{Effect, JoinMode};
use mud_core::flags::EffectFlag;

/// One mutation of an effect list.
#[derive(Debug, Clone)]
pub enum EffectOp {
    /// Apply an effect with a join mode.
    Apply(Effect, JoinMode),
    /// Remove every record of a spell.
    RemoveSpell(SpellId),
    /// Age everything by one tick.
    Sweep,
}

/// Any status flag.
pub fn arb_effect_flag() -> impl Strategy<Value = EffectFlag> {
    proptest::sample::select(EffectFlag::ALL)
}

/// Any modifier location.
pub fn arb_location() -> impl Strategy<Value = ApplyLocation> {
    proptest::sample::select(ApplyLocation::ALL.to_vec())
}

/// A small pool of catalog spell ids so operations collide.
pub fn arb_spell() -> impl Strategy<Value = SpellId> {
    (10u16..16u16).prop_map(SpellId)
}

/// A duration from one to twenty ticks.
pub fn arb_duration() -> impl Strategy<Value = i32> {
    1i32..=20
}

/// Any damage type.
pub fn arb_damage_type() -> impl Strategy<Value = DamageType> {
    proptest::sample::select(DamageType::ALL.to_vec())
}

/// Any body composition.
pub fn arb_composition() -> impl Strategy<Value = Composition> {
    proptest::sample::select(Composition::ALL.to_vec())
}

/// Any of the three stock join modes.
pub fn arb_join_mode() -> impl Strategy<Value = JoinMode> {
    prop_oneof![
        Just(JoinMode::ADD_ONLY),
        Just(JoinMode::REFRESH),
        Just(JoinMode::STACK_DURATION),
    ]
}

/// A valid effect: it always carries a flag and sometimes a modifier.
pub fn arb_effect() -> impl Strategy<Value = Effect> {
    (
        arb_spell(),
        prop_oneof![4 => arb_duration(), 1 => Just(Effect::PERMANENT)],
        arb_effect_flag(),
        proptest::option::of((arb_location(), -5i32..=5)),
    )
        .prop_map(|(spell, duration, flag, modifier)| {
            let effect = Effect::new(spell, duration).with_flag(flag);
            match modifier {
                Some((location, amount)) if location != ApplyLocation::None && amount != 0 => {
                    effect.with_modifier(location, amount)
                }
                _ => effect,
            }
        })
}

/// One effect-list operation.
pub fn arb_effect_op() -> impl Strategy<Value = EffectOp> {
    prop_oneof![
        3 => (arb_effect(), arb_join_mode()).prop_map(|(e, m)| EffectOp::Apply(e, m)),
        1 => arb_spell().prop_map(EffectOp::RemoveSpell),
        2 => Just(EffectOp::Sweep),
    ]
}

/// A sequence of effect-list operations.
pub fn arb_effect_ops(max_len: usize) -> impl Strategy<Value = Vec<EffectOp>> {
    proptest::collection::vec(arb_effect_op(), 0..max_len)
}
