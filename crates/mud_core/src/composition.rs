//! Body composition and life force tables.
//!
//! Composition governs physical and elemental susceptibility plus the phase
//! of matter a body is in. Life force governs healing, dispelling, and
//! mental susceptibility.

use serde::{Deserialize, Serialize};

use crate::damage::DamageType;

/// Phase of matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Solid.
    Solid,
    /// Liquid.
    Liquid,
    /// Gas.
    Gas,
    /// Ether: no physical substance at all.
    Ether,
}

/// Static composition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionInfo {
    /// Display name.
    pub name: &'static str,
    /// Phase of matter.
    pub phase: Phase,
    /// Susceptibility per physical damage type, indexed by
    /// [`DamageType::physical_index`].
    pub sus: [i32; 9],
}

/// Material a body is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Composition {
    /// Ordinary flesh.
    #[default]
    Flesh,
    /// Earth.
    Earth,
    /// Air.
    Air,
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Ice.
    Ice,
    /// Mist.
    Mist,
    /// Ether.
    Ether,
    /// Metal.
    Metal,
    /// Stone.
    Stone,
    /// Bone.
    Bone,
    /// Lava.
    Lava,
    /// Plant matter.
    Plant,
}

//                     slash pierce crush shock fire water cold acid poison
const FLESH: [i32; 9] = [100, 100, 100, 100, 100, 100, 100, 100, 100];
const EARTH: [i32; 9] = [90, 50, 120, 50, 60, 110, 75, 110, 0];
const AIR: [i32; 9] = [30, 30, 30, 120, 75, 50, 100, 0, 0];
const FIRE: [i32; 9] = [30, 30, 30, 75, 0, 150, 150, 50, 0];
const WATER: [i32; 9] = [40, 40, 40, 150, 50, 0, 120, 50, 0];
const ICE: [i32; 9] = [75, 50, 120, 75, 150, 25, 0, 75, 0];
const MIST: [i32; 9] = [25, 25, 25, 100, 75, 25, 100, 75, 0];
const ETHER: [i32; 9] = [0, 0, 0, 50, 50, 50, 50, 50, 0];
const METAL: [i32; 9] = [50, 40, 75, 150, 80, 100, 75, 125, 0];
const STONE: [i32; 9] = [60, 40, 110, 50, 50, 75, 50, 75, 0];
const BONE: [i32; 9] = [75, 50, 125, 75, 75, 75, 75, 75, 0];
const LAVA: [i32; 9] = [50, 50, 75, 75, 0, 150, 125, 25, 0];
const PLANT: [i32; 9] = [110, 75, 90, 110, 150, 25, 125, 100, 75];

impl Composition {
    /// Every composition.
    pub const ALL: [Self; 13] = [
        Self::Flesh,
        Self::Earth,
        Self::Air,
        Self::Fire,
        Self::Water,
        Self::Ice,
        Self::Mist,
        Self::Ether,
        Self::Metal,
        Self::Stone,
        Self::Bone,
        Self::Lava,
        Self::Plant,
    ];

    /// Table row.
    #[must_use]
    pub const fn info(self) -> CompositionInfo {
        let (name, phase, sus) = match self {
            Self::Flesh => ("flesh", Phase::Solid, FLESH),
            Self::Earth => ("earth", Phase::Solid, EARTH),
            Self::Air => ("air", Phase::Gas, AIR),
            Self::Fire => ("fire", Phase::Gas, FIRE),
            Self::Water => ("water", Phase::Liquid, WATER),
            Self::Ice => ("ice", Phase::Solid, ICE),
            Self::Mist => ("mist", Phase::Gas, MIST),
            Self::Ether => ("ether", Phase::Ether, ETHER),
            Self::Metal => ("metal", Phase::Solid, METAL),
            Self::Stone => ("stone", Phase::Solid, STONE),
            Self::Bone => ("bone", Phase::Solid, BONE),
            Self::Lava => ("lava", Phase::Liquid, LAVA),
            Self::Plant => ("plant", Phase::Solid, PLANT),
        };
        CompositionInfo { name, phase, sus }
    }

    /// Phase of matter.
    #[must_use]
    pub const fn phase(self) -> Phase {
        self.info().phase
    }

    /// Solid bodies can hold skin and armor spells.
    #[must_use]
    pub const fn is_rigid(self) -> bool {
        matches!(self.phase(), Phase::Solid)
    }

    /// Unmodified susceptibility for a physical or elemental damage type.
    #[must_use]
    pub fn base_susceptibility(self, dtype: DamageType) -> Option<i32> {
        dtype.physical_index().map(|i| self.info().sus[i])
    }
}

/// Animating principle of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifeForce {
    /// Living.
    #[default]
    Life,
    /// Undead.
    Undead,
    /// Magical construct.
    Magic,
    /// Celestial.
    Celestial,
    /// Demonic.
    Demonic,
    /// Elemental.
    Elemental,
}

/// Static life force row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeForceInfo {
    /// Display name.
    pub name: &'static str,
    /// Healing susceptibility.
    pub sus_heal: i32,
    /// Discorporation susceptibility.
    pub sus_discorporate: i32,
    /// Dispel susceptibility.
    pub sus_dispel: i32,
    /// Mental susceptibility.
    pub sus_mental: i32,
}

impl LifeForce {
    /// Table row.
    #[must_use]
    pub const fn info(self) -> LifeForceInfo {
        let (name, sus_heal, sus_discorporate, sus_dispel, sus_mental) = match self {
            Self::Life => ("life", 100, 0, 0, 100),
            Self::Undead => ("undead", 75, 100, 0, 0),
            Self::Magic => ("magic", 0, 0, 100, 0),
            Self::Celestial => ("celestial", 100, 0, 50, 100),
            Self::Demonic => ("demonic", 100, 0, 50, 100),
            Self::Elemental => ("elemental", 50, 0, 100, 50),
        };
        LifeForceInfo {
            name,
            sus_heal,
            sus_discorporate,
            sus_dispel,
            sus_mental,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ether_is_immune_to_weapons() {
        for dtype in [DamageType::Slash, DamageType::Pierce, DamageType::Crush] {
            assert_eq!(Composition::Ether.base_susceptibility(dtype), Some(0));
        }
    }

    #[test]
    fn test_rigidity_follows_phase() {
        assert!(Composition::Flesh.is_rigid());
        assert!(!Composition::Water.is_rigid());
        assert!(!Composition::Mist.is_rigid());
        assert!(!Composition::Ether.is_rigid());
    }

    #[test]
    fn test_non_physical_types_have_no_base() {
        assert_eq!(Composition::Flesh.base_susceptibility(DamageType::Heal), None);
    }
}
