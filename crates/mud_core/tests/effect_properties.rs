//! Property tests for the effect store and the evasion curve.

use mud_core::components::ApplyLocation;
use mud_core::damage::{curve_evades, evasion_threshold};
use mud_core::effects::{Effect, EffectList, JoinMode};
use mud_core::rng::GameRng;
use mud_test_utils::proptest::prelude::*;
use mud_test_utils::strategies::{arb_effect, arb_effect_ops, EffectOp};

fn run(ops: &[EffectOp]) -> EffectList {
    let mut list = EffectList::new();
    for op in ops {
        match op {
            EffectOp::Apply(effect, mode) => {
                let _ = list.apply(effect.clone(), *mode);
            }
            EffectOp::RemoveSpell(spell) => {
                list.remove_spell(*spell);
            }
            EffectOp::Sweep => {
                list.sweep();
            }
        }
    }
    list
}

proptest! {
    #[test]
    fn prop_flags_match_records(ops in arb_effect_ops(40)) {
        let list = run(&ops);
        for flag in list.flags().iter() {
            prop_assert!(list.iter().any(|e| e.flags.contains(flag)));
        }
        for effect in list.iter() {
            for flag in effect.flags.iter() {
                prop_assert!(list.has_flag(flag));
            }
        }
    }

    #[test]
    fn prop_modifiers_match_records(ops in arb_effect_ops(40)) {
        let list = run(&ops);
        for location in ApplyLocation::ALL {
            if location == ApplyLocation::None {
                continue;
            }
            let sum: i32 = list
                .iter()
                .filter(|e| e.location == location)
                .map(|e| e.modifier)
                .sum();
            prop_assert_eq!(list.modifier(location), sum);
        }
    }

    #[test]
    fn prop_no_spent_records_survive(ops in arb_effect_ops(40)) {
        let list = run(&ops);
        prop_assert!(list.iter().all(|e| e.duration > 0 || e.is_permanent()));
    }

    #[test]
    fn prop_sweep_removes_after_exactly_duration(effect in arb_effect()) {
        let mut list = EffectList::new();
        list.apply(effect.clone(), JoinMode::ADD_ONLY).unwrap();

        if effect.is_permanent() {
            for _ in 0..50 {
                prop_assert!(list.sweep().is_empty());
            }
            prop_assert_eq!(list.len(), 1);
        } else {
            for _ in 1..effect.duration {
                prop_assert!(list.sweep().is_empty());
                prop_assert!(list.has_spell(effect.spell));
            }
            let expired = list.sweep();
            prop_assert_eq!(expired.len(), 1);
            prop_assert!(list.is_empty());
            prop_assert!(list.flags().is_empty());
        }
    }

    #[test]
    fn prop_refresh_is_idempotent(effect in arb_effect(), times in 1usize..6) {
        let mut once = EffectList::new();
        once.apply(effect.clone(), JoinMode::REFRESH).unwrap();

        let mut many = EffectList::new();
        for _ in 0..times {
            many.apply(effect.clone(), JoinMode::REFRESH).unwrap();
        }
        prop_assert_eq!(once.effects(), many.effects());
        prop_assert_eq!(once.flags(), many.flags());
    }

    #[test]
    fn prop_add_only_keeps_first(first in arb_effect(), extra in 1i32..20) {
        let mut list = EffectList::new();
        list.apply(first.clone(), JoinMode::ADD_ONLY).unwrap();
        let later = Effect { duration: first.duration.max(1) + extra, ..first.clone() };
        list.apply(later, JoinMode::ADD_ONLY).unwrap();
        prop_assert_eq!(list.effects(), std::slice::from_ref(&first));
    }

    #[test]
    fn prop_stacked_durations_add(effect in arb_effect(), d1 in 1i32..20, d2 in 1i32..20) {
        let mut list = EffectList::new();
        list.apply(Effect { duration: d1, ..effect.clone() }, JoinMode::STACK_DURATION).unwrap();
        list.apply(Effect { duration: d2, ..effect.clone() }, JoinMode::STACK_DURATION).unwrap();
        prop_assert_eq!(list.len(), 1);
        prop_assert_eq!(list.find(effect.spell).map(|e| e.duration), Some(d1 + d2));
    }

    #[test]
    fn prop_threshold_grows_with_susceptibility(a in -50i32..150, b in -50i32..150) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(evasion_threshold(lo) <= evasion_threshold(hi));
    }

    #[test]
    fn prop_curve_endpoints(seed in any::<u64>()) {
        let mut rng = GameRng::seeded(seed);
        for _ in 0..64 {
            prop_assert!(curve_evades(&mut rng, 0));
            prop_assert!(!curve_evades(&mut rng, 100));
            prop_assert!(!curve_evades(&mut rng, 250));
        }
    }
}
