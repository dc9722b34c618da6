//! Plain data components shared by characters, objects, and rooms.
//!
//! Handles are small `Copy` newtypes over arena indices. They are never
//! reused within a world, so a stale handle simply fails to resolve.

use serde::{Deserialize, Serialize};

/// Level at which a character is considered immortal.
pub const LVL_IMMORT: i32 = 100;

/// Level of a god.
pub const LVL_GOD: i32 = 101;

/// HP at or below which a character is incapacitated.
pub const HIT_INCAP: i32 = -3;

/// HP at or below which a character is mortally wounded.
pub const HIT_MORTALLYW: i32 = -6;

/// HP at or below which a character dies.
pub const HIT_DEAD: i32 = -11;

/// Alignment at or above which a character counts as good.
pub const ALIGN_GOOD: i32 = 350;

/// Alignment at or below which a character counts as evil.
pub const ALIGN_EVIL: i32 = -350;

/// Rage threshold: annoyed.
pub const RAGE_ANNOYED: i32 = 250;
/// Rage threshold: angry.
pub const RAGE_ANGRY: i32 = 500;
/// Rage threshold: irate.
pub const RAGE_IRATE: i32 = 750;
/// Rage threshold: crazed. Crossing it forces berserk.
pub const RAGE_CRAZED: i32 = 1000;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Raw arena index.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle_type!(
    /// Handle to a character in the world arena.
    CharId
);
handle_type!(
    /// Handle to an object in the world arena.
    ObjId
);
handle_type!(
    /// Handle to a room.
    RoomId
);

/// Dense spell/skill identifier, the catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellId(pub u16);

impl SpellId {
    /// Effects granted by a mob's prototype rather than by any cast.
    pub const INNATE: Self = Self(0);
    /// The burning condition started by catch-fire secondaries.
    pub const IGNITION: Self = Self(1);
    /// The brief paralysis of a freeze-up.
    pub const FROZEN: Self = Self(2);
    /// Berserk rage.
    pub const BERSERK: Self = Self(3);
    /// The animation holding a raised or conjured creature together, kept
    /// apart from the charm binding it to its master.
    pub const ANIMATION: Self = Self(4);
    /// First id available to catalog entries.
    pub const FIRST_CATALOG: u16 = 10;

    /// Whether this id is reserved for engine-owned effects.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_CATALOG
    }
}

impl std::fmt::Display for SpellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consciousness / combat-readiness, ordered from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Stance {
    /// Dead.
    Dead,
    /// Mortally wounded or incapacitated; losing HP.
    Incapacitated,
    /// Stunned.
    Stunned,
    /// Asleep.
    Sleeping,
    /// Resting.
    Resting,
    /// Awake and ready.
    #[default]
    Alert,
    /// In combat.
    Fighting,
}

impl Stance {
    /// Stance implied by a hit point total for a character that is not fighting.
    #[must_use]
    pub const fn from_hit(hit: i32, current: Self) -> Self {
        if hit <= HIT_DEAD {
            Self::Dead
        } else if hit <= HIT_INCAP {
            Self::Incapacitated
        } else if hit <= 0 {
            Self::Stunned
        } else if matches!(current, Self::Dead | Self::Incapacitated | Self::Stunned) {
            Self::Resting
        } else {
            current
        }
    }

    /// Awake means at least resting.
    #[must_use]
    pub const fn is_awake(self) -> bool {
        matches!(self, Self::Resting | Self::Alert | Self::Fighting)
    }
}

/// Physical posture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Position {
    /// Lying down.
    Prone,
    /// Sitting.
    Sitting,
    /// Kneeling.
    Kneeling,
    /// Standing.
    #[default]
    Standing,
    /// Airborne.
    Flying,
}

/// Character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Class {
    /// Arcane caster.
    Sorcerer,
    /// Divine caster.
    Cleric,
    /// Rogue base class.
    Rogue,
    /// Fighter base class.
    Warrior,
    /// Thief.
    Thief,
    /// Assassin.
    Assassin,
    /// Mercenary.
    Mercenary,
    /// Bard.
    Bard,
    /// Paladin.
    Paladin,
    /// Anti-paladin.
    AntiPaladin,
    /// Ranger.
    Ranger,
    /// Monk.
    Monk,
    /// Berserker.
    Berserker,
    /// Hunter.
    Hunter,
    /// Druid.
    Druid,
    /// Shaman.
    Shaman,
    /// Priest.
    Priest,
    /// Diabolist.
    Diabolist,
    /// Mystic.
    Mystic,
    /// Necromancer.
    Necromancer,
    /// Conjurer.
    Conjurer,
    /// Pyromancer.
    Pyromancer,
    /// Cryomancer.
    Cryomancer,
    /// Illusionist.
    Illusionist,
    /// No class.
    #[default]
    Layman,
}

impl Class {
    /// The base class this class is a subclass of (or itself).
    #[must_use]
    pub const fn base(self) -> Self {
        match self {
            Self::Pyromancer
            | Self::Cryomancer
            | Self::Illusionist
            | Self::Necromancer
            | Self::Conjurer => Self::Sorcerer,
            Self::Priest | Self::Diabolist | Self::Druid | Self::Shaman | Self::Mystic => {
                Self::Cleric
            }
            Self::Paladin
            | Self::AntiPaladin
            | Self::Ranger
            | Self::Monk
            | Self::Berserker
            | Self::Hunter => Self::Warrior,
            Self::Thief | Self::Assassin | Self::Mercenary | Self::Bard => Self::Rogue,
            other => other,
        }
    }

    /// Sorcerer family.
    #[must_use]
    pub const fn is_magic_user(self) -> bool {
        matches!(self.base(), Self::Sorcerer)
    }

    /// Cleric family.
    #[must_use]
    pub const fn is_cleric(self) -> bool {
        matches!(self.base(), Self::Cleric)
    }

    /// Warrior family.
    #[must_use]
    pub const fn is_warrior(self) -> bool {
        matches!(self.base(), Self::Warrior)
    }

    /// Rogue family.
    #[must_use]
    pub const fn is_rogue(self) -> bool {
        matches!(self.base(), Self::Rogue)
    }

    /// Hit point regeneration factor, percent.
    #[must_use]
    pub const fn hit_regen_factor(self) -> i32 {
        match self {
            Self::Monk => 120,
            Self::Berserker => 110,
            Self::Sorcerer | Self::Necromancer | Self::Pyromancer | Self::Cryomancer => 90,
            _ => 100,
        }
    }

    /// Movement regeneration factor, percent.
    #[must_use]
    pub const fn move_regen_factor(self) -> i32 {
        match self {
            Self::Ranger | Self::Monk | Self::Hunter => 120,
            _ => 100,
        }
    }
}

/// Racial alignment grouping used by race-based aggression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceAlign {
    /// Races of the light.
    Good,
    /// Races of the dark.
    Evil,
}

/// Character race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Race {
    /// Human.
    #[default]
    Human,
    /// Elf.
    Elf,
    /// Gnome.
    Gnome,
    /// Dwarf.
    Dwarf,
    /// Halfling.
    Halfling,
    /// Half-elf.
    HalfElf,
    /// Barbarian.
    Barbarian,
    /// Troll.
    Troll,
    /// Drow.
    Drow,
    /// Duergar.
    Duergar,
    /// Ogre.
    Ogre,
    /// Orc.
    Orc,
    /// Animal.
    Animal,
    /// Undead.
    Undead,
    /// Elemental.
    Elemental,
    /// Demon.
    Demon,
    /// Dragon.
    Dragon,
    /// Generic humanoid.
    Humanoid,
}

impl Race {
    /// Racial alignment.
    #[must_use]
    pub const fn align(self) -> RaceAlign {
        match self {
            Self::Human
            | Self::Elf
            | Self::Gnome
            | Self::Dwarf
            | Self::Halfling
            | Self::HalfElf
            | Self::Barbarian
            | Self::Animal
            | Self::Humanoid => RaceAlign::Good,
            _ => RaceAlign::Evil,
        }
    }
}

/// Base ability scores on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Strength.
    pub strength: i32,
    /// Intelligence.
    pub intelligence: i32,
    /// Wisdom.
    pub wisdom: i32,
    /// Dexterity.
    pub dexterity: i32,
    /// Constitution.
    pub constitution: i32,
    /// Charisma.
    pub charisma: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            strength: 60,
            intelligence: 60,
            wisdom: 60,
            dexterity: 60,
            constitution: 60,
            charisma: 60,
        }
    }
}

/// Saving throw categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveKind {
    /// Paralysis.
    Paralysis,
    /// Rods and wands.
    Rod,
    /// Petrification.
    Petrification,
    /// Breath weapons.
    Breath,
    /// Spells.
    Spell,
}

impl SaveKind {
    /// All save kinds in table order.
    pub const ALL: [Self; 5] = [
        Self::Paralysis,
        Self::Rod,
        Self::Petrification,
        Self::Breath,
        Self::Spell,
    ];

    /// Index into per-save arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Terrain of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sector {
    /// Indoors.
    Structure,
    /// City street.
    #[default]
    City,
    /// Open field.
    Field,
    /// Forest.
    Forest,
    /// Hills.
    Hills,
    /// Mountains.
    Mountains,
    /// Wading-depth water.
    Shallows,
    /// Deep water.
    Water,
    /// Below the surface.
    Underwater,
    /// Open air.
    Air,
    /// Road.
    Road,
    /// Swamp.
    Swamp,
}

impl Sector {
    /// Any kind of water.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Shallows | Self::Water | Self::Underwater)
    }

    /// Nothing to stand on.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }
}

/// Numeric attribute an effect modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApplyLocation {
    /// Pure flag effect.
    #[default]
    None,
    /// Strength.
    Str,
    /// Dexterity.
    Dex,
    /// Intelligence.
    Int,
    /// Wisdom.
    Wis,
    /// Constitution.
    Con,
    /// Charisma.
    Cha,
    /// Maximum hit points.
    MaxHit,
    /// Maximum movement.
    MaxMove,
    /// Armor class.
    ArmorClass,
    /// To-hit bonus.
    Hitroll,
    /// Damage bonus.
    Damroll,
    /// Paralysis save.
    SaveParalysis,
    /// Rod save.
    SaveRod,
    /// Petrification save.
    SavePetrification,
    /// Breath save.
    SaveBreath,
    /// Spell save.
    SaveSpell,
    /// Body size.
    Size,
    /// Hit point regeneration.
    HitRegen,
    /// Perception.
    Perception,
    /// Hiddenness.
    Hiddenness,
    /// Spell focus.
    Focus,
}

impl ApplyLocation {
    /// Every location in table order.
    pub const ALL: [Self; 22] = [
        Self::None,
        Self::Str,
        Self::Dex,
        Self::Int,
        Self::Wis,
        Self::Con,
        Self::Cha,
        Self::MaxHit,
        Self::MaxMove,
        Self::ArmorClass,
        Self::Hitroll,
        Self::Damroll,
        Self::SaveParalysis,
        Self::SaveRod,
        Self::SavePetrification,
        Self::SaveBreath,
        Self::SaveSpell,
        Self::Size,
        Self::HitRegen,
        Self::Perception,
        Self::Hiddenness,
        Self::Focus,
    ];

    /// Number of locations.
    pub const COUNT: usize = Self::ALL.len();

    /// Index into modifier arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The save location for a save kind.
    #[must_use]
    pub const fn for_save(kind: SaveKind) -> Self {
        match kind {
            SaveKind::Paralysis => Self::SaveParalysis,
            SaveKind::Rod => Self::SaveRod,
            SaveKind::Petrification => Self::SavePetrification,
            SaveKind::Breath => Self::SaveBreath,
            SaveKind::Spell => Self::SaveSpell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_from_hit_thresholds() {
        assert_eq!(Stance::from_hit(-11, Stance::Alert), Stance::Dead);
        assert_eq!(Stance::from_hit(-5, Stance::Alert), Stance::Incapacitated);
        assert_eq!(Stance::from_hit(0, Stance::Alert), Stance::Stunned);
        assert_eq!(Stance::from_hit(5, Stance::Stunned), Stance::Resting);
        assert_eq!(Stance::from_hit(5, Stance::Sleeping), Stance::Sleeping);
    }

    #[test]
    fn test_class_families() {
        assert!(Class::Pyromancer.is_magic_user());
        assert!(Class::Diabolist.is_cleric());
        assert!(Class::Berserker.is_warrior());
        assert!(Class::Bard.is_rogue());
        assert!(!Class::Layman.is_warrior());
    }

    #[test]
    fn test_apply_location_indices_are_dense() {
        for (i, loc) in ApplyLocation::ALL.iter().enumerate() {
            assert_eq!(loc.index(), i);
        }
    }

    #[test]
    fn test_reserved_spell_ids() {
        assert!(SpellId::INNATE.is_reserved());
        assert!(SpellId::IGNITION.is_reserved());
        assert!(SpellId::FROZEN.is_reserved());
        assert!(SpellId::ANIMATION.is_reserved());
        assert!(!SpellId(SpellId::FIRST_CATALOG).is_reserved());
    }
}
