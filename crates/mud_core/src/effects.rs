//! The effect store.
//!
//! An [`EffectList`] owns the timed modifiers attached to one character or
//! object and the status flags and attribute totals derived from them. Every
//! structural change recomputes the derived state before returning, so a
//! caller can never observe a flag that no effect declares.
//!
//! # Duration semantics
//!
//! A sweep decrements every positive duration and then removes effects that
//! sit at zero. An effect created with duration `d > 0` is therefore removed
//! by the `d`-th sweep after its creation; duration `0` survives until the
//! next sweep; `-1` ([`Effect::PERMANENT`]) is never swept.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::components::{ApplyLocation, SpellId};
use crate::error::{GameError, Result};
use crate::flags::{EffectFlag, EffectFlags};

/// Most effects a single cast can produce.
pub const MAX_BATCH: usize = 9;

/// Effects produced by one cast, applied together.
pub type EffectBatch = ArrayVec<Effect, MAX_BATCH>;

/// A timed modifier instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Effect {
    /// Spell or skill that created the effect.
    pub spell: SpellId,
    /// Attribute modified, or [`ApplyLocation::None`] for pure flag effects.
    pub location: ApplyLocation,
    /// Amount added to `location`.
    pub modifier: i32,
    /// Remaining sweeps; `-1` is permanent.
    pub duration: i32,
    /// Status flags contributed while active.
    pub flags: EffectFlags,
}

impl Effect {
    /// Duration marking an effect that only explicit removal ends.
    pub const PERMANENT: i32 = -1;

    /// A bare effect with no location and no flags. Add at least one before
    /// applying it.
    #[must_use]
    pub const fn new(spell: SpellId, duration: i32) -> Self {
        Self {
            spell,
            location: ApplyLocation::None,
            modifier: 0,
            duration,
            flags: EffectFlags::empty(),
        }
    }

    /// Set the modified attribute.
    #[must_use]
    pub const fn with_modifier(mut self, location: ApplyLocation, modifier: i32) -> Self {
        self.location = location;
        self.modifier = modifier;
        self
    }

    /// Add a contributed flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: EffectFlag) -> Self {
        self.flags = self.flags.with(flag);
        self
    }

    /// Whether the sweep ignores this effect.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.duration == Self::PERMANENT
    }

    /// Reject effects that contribute nothing or carry a nonsense duration.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidEffect`] when the effect declares neither
    /// a location nor a flag, or when its duration is below `-1`.
    pub fn validate(&self) -> Result<()> {
        if self.location == ApplyLocation::None && self.flags.is_empty() {
            return Err(GameError::InvalidEffect {
                spell: self.spell.0,
                reason: "effect declares neither a location nor any flags".into(),
            });
        }
        if self.duration < Self::PERMANENT {
            return Err(GameError::InvalidEffect {
                spell: self.spell.0,
                reason: format!("duration {} is below -1", self.duration),
            });
        }
        Ok(())
    }
}

/// How a new effect combines with an existing one of the same spell and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinMode {
    /// Add the new duration to the existing one.
    pub accumulate_duration: bool,
    /// Add the new modifier to the existing one.
    pub accumulate_modifier: bool,
    /// Replace the existing duration and modifier.
    pub refresh: bool,
}

impl JoinMode {
    /// Only add when absent.
    pub const ADD_ONLY: Self = Self {
        accumulate_duration: false,
        accumulate_modifier: false,
        refresh: false,
    };

    /// Replace an existing record.
    pub const REFRESH: Self = Self {
        accumulate_duration: false,
        accumulate_modifier: false,
        refresh: true,
    };

    /// Stack durations.
    pub const STACK_DURATION: Self = Self {
        accumulate_duration: true,
        accumulate_modifier: false,
        refresh: false,
    };

    /// Whether an existing record may be touched at all.
    #[must_use]
    pub const fn joins(self) -> bool {
        self.accumulate_duration || self.accumulate_modifier || self.refresh
    }
}

/// What [`EffectList::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No matching record existed; the effect was appended.
    Added,
    /// Merged into an existing record by accumulation.
    Accumulated,
    /// Replaced an existing record.
    Refreshed,
    /// A matching record existed and the mode forbids joining.
    Ignored,
}

/// Result of wearing one point off an eroding effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Erosion {
    /// The spell is not active.
    Absent,
    /// The modifier dropped by one.
    Decremented(i32),
    /// The effect was at its last point and is gone.
    Removed(Effect),
}

/// Active effects of one entity plus their derived state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectList {
    effects: Vec<Effect>,
    flags: EffectFlags,
    modifiers: [i32; ApplyLocation::COUNT],
}

impl EffectList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active effects in application order.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Iterate active effects.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Number of effect records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effects are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Derived status flags.
    #[must_use]
    pub fn flags(&self) -> EffectFlags {
        self.flags
    }

    /// Whether a derived flag is set.
    #[must_use]
    pub fn has_flag(&self, flag: EffectFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Summed modifier for an attribute.
    #[must_use]
    pub fn modifier(&self, location: ApplyLocation) -> i32 {
        self.modifiers[location.index()]
    }

    /// Whether any record of `spell` is active.
    #[must_use]
    pub fn has_spell(&self, spell: SpellId) -> bool {
        self.effects.iter().any(|e| e.spell == spell)
    }

    /// First record of `spell`.
    #[must_use]
    pub fn find(&self, spell: SpellId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.spell == spell)
    }

    /// Whether `spell` is active through a permanent record.
    #[must_use]
    pub fn has_permanent(&self, spell: SpellId) -> bool {
        self.effects
            .iter()
            .any(|e| e.spell == spell && e.is_permanent())
    }

    /// Attach or join an effect.
    ///
    /// Records are matched on spell and location, so a multi-record spell
    /// such as bless joins each of its records independently.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidEffect`] for an effect that fails
    /// [`Effect::validate`]; the list is left untouched.
    pub fn apply(&mut self, effect: Effect, mode: JoinMode) -> Result<JoinOutcome> {
        effect.validate()?;

        let existing = self
            .effects
            .iter_mut()
            .find(|e| e.spell == effect.spell && e.location == effect.location);

        let outcome = match existing {
            None => {
                self.effects.push(effect);
                JoinOutcome::Added
            }
            Some(_) if !mode.joins() => return Ok(JoinOutcome::Ignored),
            Some(current) => {
                let mut merged = effect;
                let accumulated = mode.accumulate_duration || mode.accumulate_modifier;
                if mode.accumulate_duration {
                    if current.is_permanent() {
                        merged.duration = Effect::PERMANENT;
                    } else if !merged.is_permanent() {
                        merged.duration += current.duration;
                    }
                }
                if mode.accumulate_modifier {
                    merged.modifier += current.modifier;
                }
                *current = merged;
                if accumulated {
                    JoinOutcome::Accumulated
                } else {
                    JoinOutcome::Refreshed
                }
            }
        };

        self.recompute();
        Ok(outcome)
    }

    /// Remove every record of `spell`, returning them.
    pub fn remove_spell(&mut self, spell: SpellId) -> Vec<Effect> {
        self.remove_where(|e| e.spell == spell)
    }

    /// Remove every record matching `pred`, returning them in list order.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<Effect>
    where
        F: FnMut(&Effect) -> bool,
    {
        let mut removed = Vec::new();
        self.effects.retain(|e| {
            if pred(e) {
                removed.push(e.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.recompute();
        }
        removed
    }

    /// Remove the record at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Effect> {
        if index >= self.effects.len() {
            return None;
        }
        let removed = self.effects.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Drop everything.
    pub fn clear(&mut self) -> Vec<Effect> {
        let removed = std::mem::take(&mut self.effects);
        self.recompute();
        removed
    }

    /// Wear one point off the first record of `spell`, removing it when the
    /// modifier is already at one or below.
    pub fn decrease_modifier(&mut self, spell: SpellId) -> Erosion {
        let Some(index) = self.effects.iter().position(|e| e.spell == spell) else {
            return Erosion::Absent;
        };
        if self.effects[index].modifier > 1 {
            self.effects[index].modifier -= 1;
            let left = self.effects[index].modifier;
            self.recompute();
            Erosion::Decremented(left)
        } else {
            let removed = self.effects.remove(index);
            self.recompute();
            Erosion::Removed(removed)
        }
    }

    /// One tick of expiry. Returns the expired records in list order.
    pub fn sweep(&mut self) -> Vec<Effect> {
        let mut expired = Vec::new();
        self.effects.retain_mut(|e| {
            if e.is_permanent() {
                return true;
            }
            if e.duration > 0 {
                e.duration -= 1;
            }
            if e.duration == 0 {
                expired.push(e.clone());
                false
            } else {
                true
            }
        });
        if !expired.is_empty() {
            self.recompute();
        }
        expired
    }

    fn recompute(&mut self) {
        self.flags.clear();
        self.modifiers = [0; ApplyLocation::COUNT];
        for effect in &self.effects {
            for flag in effect.flags.iter() {
                self.flags.insert(flag);
            }
            if effect.location != ApplyLocation::None {
                let slot = &mut self.modifiers[effect.location.index()];
                *slot = slot.saturating_add(effect.modifier);
            }
        }
        #[cfg(feature = "debug-validation")]
        debug_assert!(
            self.flags
                .iter()
                .all(|f| self.effects.iter().any(|e| e.flags.contains(f))),
            "status flag without a backing effect"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLESS: SpellId = SpellId(10);
    const ARMOR: SpellId = SpellId(11);

    fn bless(duration: i32) -> [Effect; 2] {
        [
            Effect::new(BLESS, duration)
                .with_modifier(ApplyLocation::Hitroll, 1)
                .with_flag(EffectFlag::Bless),
            Effect::new(BLESS, duration)
                .with_modifier(ApplyLocation::SaveSpell, -2)
                .with_flag(EffectFlag::Bless),
        ]
    }

    #[test]
    fn test_apply_sets_flags_and_modifiers() {
        let mut list = EffectList::new();
        for e in bless(3) {
            assert_eq!(list.apply(e, JoinMode::ADD_ONLY).unwrap(), JoinOutcome::Added);
        }
        assert!(list.has_flag(EffectFlag::Bless));
        assert_eq!(list.modifier(ApplyLocation::Hitroll), 1);
        assert_eq!(list.modifier(ApplyLocation::SaveSpell), -2);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_invalid_effect_rejected() {
        let mut list = EffectList::new();
        let err = list.apply(Effect::new(ARMOR, 3), JoinMode::ADD_ONLY);
        assert!(matches!(err, Err(GameError::InvalidEffect { .. })));
        assert!(list.is_empty());

        let bad_duration = Effect::new(ARMOR, -4).with_flag(EffectFlag::Blur);
        assert!(bad_duration.validate().is_err());
    }

    #[test]
    fn test_add_only_ignores_existing() {
        let mut list = EffectList::new();
        let armor = Effect::new(ARMOR, 5).with_modifier(ApplyLocation::ArmorClass, -10);
        list.apply(armor.clone(), JoinMode::ADD_ONLY).unwrap();
        let again = Effect::new(ARMOR, 9).with_modifier(ApplyLocation::ArmorClass, -20);
        assert_eq!(list.apply(again, JoinMode::ADD_ONLY).unwrap(), JoinOutcome::Ignored);
        assert_eq!(list.effects(), &[armor]);
    }

    #[test]
    fn test_refresh_replaces_values() {
        let mut list = EffectList::new();
        list.apply(
            Effect::new(ARMOR, 5).with_modifier(ApplyLocation::ArmorClass, -10),
            JoinMode::REFRESH,
        )
        .unwrap();
        let outcome = list
            .apply(
                Effect::new(ARMOR, 2).with_modifier(ApplyLocation::ArmorClass, -15),
                JoinMode::REFRESH,
            )
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Refreshed);
        assert_eq!(list.len(), 1);
        assert_eq!(list.effects()[0].duration, 2);
        assert_eq!(list.modifier(ApplyLocation::ArmorClass), -15);
    }

    #[test]
    fn test_accumulate_duration_and_modifier() {
        let mut list = EffectList::new();
        let mode = JoinMode {
            accumulate_duration: true,
            accumulate_modifier: true,
            refresh: false,
        };
        list.apply(Effect::new(ARMOR, 4).with_modifier(ApplyLocation::Str, 2), mode)
            .unwrap();
        list.apply(Effect::new(ARMOR, 3).with_modifier(ApplyLocation::Str, 1), mode)
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.effects()[0].duration, 7);
        assert_eq!(list.modifier(ApplyLocation::Str), 3);
    }

    #[test]
    fn test_sweep_removes_after_exact_duration() {
        let mut list = EffectList::new();
        for e in bless(3) {
            list.apply(e, JoinMode::ADD_ONLY).unwrap();
        }
        assert!(list.sweep().is_empty());
        assert!(list.sweep().is_empty());
        let expired = list.sweep();
        assert_eq!(expired.len(), 2);
        assert!(list.is_empty());
        assert!(!list.has_flag(EffectFlag::Bless));
        assert_eq!(list.modifier(ApplyLocation::Hitroll), 0);
    }

    #[test]
    fn test_zero_duration_survives_until_next_sweep() {
        let mut list = EffectList::new();
        list.apply(Effect::new(ARMOR, 0).with_flag(EffectFlag::Blur), JoinMode::ADD_ONLY)
            .unwrap();
        assert!(list.has_flag(EffectFlag::Blur));
        assert_eq!(list.sweep().len(), 1);
        assert!(!list.has_flag(EffectFlag::Blur));
    }

    #[test]
    fn test_permanent_never_swept() {
        let mut list = EffectList::new();
        list.apply(
            Effect::new(SpellId::INNATE, Effect::PERMANENT).with_flag(EffectFlag::Infravision),
            JoinMode::ADD_ONLY,
        )
        .unwrap();
        for _ in 0..1000 {
            assert!(list.sweep().is_empty());
        }
        assert!(list.has_permanent(SpellId::INNATE));
    }

    #[test]
    fn test_stacking_onto_permanent_stays_permanent() {
        let mut list = EffectList::new();
        list.apply(Effect::new(BLESS, Effect::PERMANENT).with_flag(EffectFlag::Bless), JoinMode::ADD_ONLY)
            .unwrap();
        let outcome = list
            .apply(Effect::new(BLESS, 4).with_flag(EffectFlag::Bless), JoinMode::STACK_DURATION)
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Accumulated);
        assert!(list.find(BLESS).unwrap().is_permanent());
        for _ in 0..10 {
            assert!(list.sweep().is_empty());
        }
        assert!(list.has_spell(BLESS));
    }

    #[test]
    fn test_flag_survives_while_another_effect_declares_it() {
        let mut list = EffectList::new();
        list.apply(Effect::new(ARMOR, 1).with_flag(EffectFlag::Blur), JoinMode::ADD_ONLY)
            .unwrap();
        list.apply(Effect::new(BLESS, 5).with_flag(EffectFlag::Blur), JoinMode::ADD_ONLY)
            .unwrap();
        list.sweep();
        assert!(list.has_flag(EffectFlag::Blur));
        list.remove_spell(BLESS);
        assert!(!list.has_flag(EffectFlag::Blur));
    }

    #[test]
    fn test_decrease_modifier() {
        let mut list = EffectList::new();
        list.apply(
            Effect::new(ARMOR, 10)
                .with_modifier(ApplyLocation::ArmorClass, 2)
                .with_flag(EffectFlag::StoneSkin),
            JoinMode::ADD_ONLY,
        )
        .unwrap();
        assert_eq!(list.decrease_modifier(ARMOR), Erosion::Decremented(1));
        assert!(matches!(list.decrease_modifier(ARMOR), Erosion::Removed(_)));
        assert_eq!(list.decrease_modifier(ARMOR), Erosion::Absent);
        assert!(!list.has_flag(EffectFlag::StoneSkin));
    }
}
