//! Skill cooldowns.
//!
//! Each character has one countdown slot per [`CooldownKind`], in pulses.
//! A single recurring event per character decrements every running slot and
//! finishes once all of them reach zero.

use serde::{Deserialize, Serialize};

macro_rules! cooldown_kinds {
    ($($(#[$meta:meta])* $name:ident => $label:literal,)*) => {
        /// A cooldown slot.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum CooldownKind {
            $($(#[$meta])* $name,)*
        }

        impl CooldownKind {
            /// Every kind in slot order.
            pub const ALL: &'static [Self] = &[$(Self::$name,)*];

            /// Display label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$name => $label,)*
                }
            }
        }
    };
}

cooldown_kinds! {
    /// Backstab.
    Backstab => "backstab",
    /// Bash.
    Bash => "bash",
    /// Instant kill.
    InstantKill => "instant kill",
    /// Disarm.
    Disarm => "disarm",
    /// Fumbling a primary weapon.
    FumblingPrimary => "fumbling primary weapon",
    /// Picking up a dropped primary weapon.
    DroppedPrimary => "dropped primary weapon",
    /// Fumbling a secondary weapon.
    FumblingSecondary => "fumbling secondary weapon",
    /// Picking up a dropped secondary weapon.
    DroppedSecondary => "dropped secondary weapon",
    /// Summon mount.
    SummonMount => "summon mount",
    /// Lay hands.
    LayHands => "lay hands",
    /// First aid.
    FirstAid => "first aid",
    /// Eye gouge.
    EyeGouge => "eye gouge",
    /// Throat cut.
    Throatcut => "throatcut",
    /// Shapechange.
    Shapechange => "shapechange",
    /// Monk chant.
    Chant => "chant",
    /// Innate invisibility.
    InnateInvisible => "innate invisible",
    /// Innate strength.
    InnateStrength => "innate strength",
    /// Innate darkness.
    InnateDarkness => "innate darkness",
    /// Innate levitation.
    InnateLevitate => "innate levitate",
    /// Innate illumination.
    InnateIllumination => "innate illumination",
    /// Innate feather fall.
    InnateFeatherFall => "innate feather fall",
    /// Innate harness.
    InnateHarness => "innate harness",
    /// Breath weapon.
    Breathe => "breathe",
    /// Innate food creation.
    InnateCreate => "innate create",
    /// Innate barkskin.
    InnateBarkskin => "innate barkskin",
    /// Innate ascension.
    InnateAscen => "innate ascen",
    /// Innate brilliance.
    InnateBrill => "innate brill",
    /// Innate tass.
    InnateTass => "innate tass",
    /// Innate tren.
    InnateTren => "innate tren",
    /// Innate statue.
    InnateStatue => "innate statue",
    /// Innate blinding beauty.
    InnateBlindingBeauty => "innate blinding beauty",
    /// Innate faerie step.
    InnateFaerieStep => "innate faerie step",
    /// Offensive chant.
    OffenseChant => "offense chant",
    /// Defensive chant.
    DefenseChant => "defense chant",
}

impl CooldownKind {
    /// Number of slots.
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Per-character cooldown slots, in pulses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldowns {
    remaining: Vec<i32>,
    max: Vec<i32>,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            remaining: vec![0; CooldownKind::COUNT],
            max: vec![0; CooldownKind::COUNT],
        }
    }
}

impl Cooldowns {
    /// Pulses left on a slot.
    #[must_use]
    pub fn get(&self, kind: CooldownKind) -> i32 {
        self.remaining.get(kind.index()).copied().unwrap_or(0)
    }

    /// The length the slot was last set to.
    #[must_use]
    pub fn max(&self, kind: CooldownKind) -> i32 {
        self.max.get(kind.index()).copied().unwrap_or(0)
    }

    /// Whether a slot is still counting down.
    #[must_use]
    pub fn is_active(&self, kind: CooldownKind) -> bool {
        self.get(kind) > 0
    }

    /// Whether any slot is counting down.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.remaining.iter().any(|r| *r > 0)
    }

    /// Start a slot. Negative lengths clear it.
    pub fn set(&mut self, kind: CooldownKind, pulses: i32) {
        let pulses = pulses.max(0);
        if let Some(slot) = self.remaining.get_mut(kind.index()) {
            *slot = pulses;
        }
        if let Some(slot) = self.max.get_mut(kind.index()) {
            *slot = pulses;
        }
    }

    /// Clear a slot.
    pub fn clear(&mut self, kind: CooldownKind) {
        if let Some(slot) = self.remaining.get_mut(kind.index()) {
            *slot = 0;
        }
    }

    /// Subtract `elapsed` pulses from every running slot. Returns whether any
    /// slot is still running.
    pub fn elapse(&mut self, elapsed: i32) -> bool {
        for slot in &mut self.remaining {
            if *slot > 0 {
                *slot = (*slot - elapsed).max(0);
            }
        }
        self.any_active()
    }

    /// Running slots with their remaining pulses.
    pub fn active(&self) -> impl Iterator<Item = (CooldownKind, i32)> + '_ {
        CooldownKind::ALL
            .iter()
            .map(move |k| (*k, self.get(*k)))
            .filter(|(_, r)| *r > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_four_kinds() {
        assert_eq!(CooldownKind::COUNT, 34);
        for (i, kind) in CooldownKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_elapse_clamps_at_zero() {
        let mut cd = Cooldowns::default();
        cd.set(CooldownKind::Bash, 15);
        cd.set(CooldownKind::Backstab, 5);
        assert!(cd.elapse(10));
        assert_eq!(cd.get(CooldownKind::Bash), 5);
        assert_eq!(cd.get(CooldownKind::Backstab), 0);
        assert_eq!(cd.max(CooldownKind::Bash), 15);
        assert!(!cd.elapse(10));
        assert!(!cd.any_active());
    }

    #[test]
    fn test_active_lists_running_slots() {
        let mut cd = Cooldowns::default();
        cd.set(CooldownKind::LayHands, 30);
        let active: Vec<_> = cd.active().collect();
        assert_eq!(active, vec![(CooldownKind::LayHands, 30)]);
    }
}
