//! Status and classification flag sets.
//!
//! [`EffectFlags`] is the derived status set of a character or object. Its
//! mutators are crate-private and only the effect store calls them, which
//! keeps every bit backed by at least one active effect. The remaining sets
//! are static classification data and use `bitflags`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

macro_rules! effect_flags {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        /// A single status condition contributed by an effect.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum EffectFlag {
            $($(#[$doc])* $name,)*
        }

        impl EffectFlag {
            /// Every flag in bit order.
            pub const ALL: &'static [Self] = &[$(Self::$name,)*];
        }
    };
}

effect_flags! {
    /// Cannot see.
    Blind,
    /// Invisible to those without detect invisibility.
    Invisible,
    /// Sees alignment auras.
    DetectAlign,
    /// Sees invisible things.
    DetectInvis,
    /// Sees magical auras.
    DetectMagic,
    /// Senses hidden life.
    SenseLife,
    /// Walks on water.
    Waterwalk,
    /// Damage halved.
    Sanctuary,
    /// Acts erratically.
    Confusion,
    /// Cursed.
    Curse,
    /// Sees warm bodies in the dark.
    Infravision,
    /// Poisoned.
    Poison,
    /// Protected from evil.
    ProtectEvil,
    /// Protected from good.
    ProtectGood,
    /// Magically asleep.
    Sleep,
    /// Leaves no tracks.
    NoTrack,
    /// Berserk rage.
    Berserk,
    /// Moves silently.
    Sneak,
    /// Harder to notice.
    Stealth,
    /// Flying.
    Fly,
    /// Charmed by a master.
    Charm,
    /// Skin of stone.
    StoneSkin,
    /// Sees far.
    Farsee,
    /// Hasted.
    Haste,
    /// Blurred outline.
    Blur,
    /// Temporary vitality.
    Vitality,
    /// Glorious appearance distracts aggressors.
    Glory,
    /// Fully paralyzed.
    MajorParalysis,
    /// Seen as a familiar face by aggressors.
    Familiarity,
    /// Mesmerized.
    Mesmerized,
    /// Held in place.
    Immobilized,
    /// Emits light.
    Light,
    /// Briefly paralyzed.
    MinorParalysis,
    /// Throat injured.
    HurtThroat,
    /// Levitating.
    Levitate,
    /// Breathes water.
    WaterBreath,
    /// Soul shielded.
    Soulshield,
    /// Cannot speak.
    Silence,
    /// Resists fire.
    ProtectFire,
    /// Resists cold.
    ProtectCold,
    /// Resists air.
    ProtectAir,
    /// Resists earth.
    ProtectEarth,
    /// Wreathed in flame.
    Fireshield,
    /// Wreathed in frost.
    Coldshield,
    /// Blocks low-circle spells.
    MinorGlobe,
    /// Blocks mid-circle spells.
    MajorGlobe,
    /// Next damage spell is empowered.
    Harness,
    /// Burning.
    OnFire,
    /// Frightened.
    Fear,
    /// Understands all tongues.
    Tongues,
    /// Diseased.
    Disease,
    /// Insane.
    Insanity,
    /// Sees in darkness.
    Ultravision,
    /// Immune to heat.
    NegateHeat,
    /// Immune to cold.
    NegateCold,
    /// Immune to air.
    NegateAir,
    /// Immune to earth.
    NegateEarth,
    /// Aggressive acts do not reveal.
    RemoteAggr,
    /// Hard to surprise.
    Aware,
    /// Red aura.
    RedAura,
    /// Kept alive by magic.
    Animated,
    /// Blessed.
    Bless,
    /// Hexed.
    Hex,
    /// Wrathful; rage burns slower.
    Wrath,
    /// Soothed by the song of rest.
    SongOfRest,
    /// Enlarged.
    Enlarge,
    /// Reduced.
    Reduce,
    /// Meditating.
    Meditate,
    /// Weapon burns.
    FireWeapon,
    /// Weapon freezes.
    IceWeapon,
    /// Weapon poisons.
    PoisonWeapon,
    /// Weapon corrodes.
    AcidWeapon,
    /// Weapon shocks.
    ShockWeapon,
    /// Weapon radiates holy light.
    RadiantWeapon,
}

impl EffectFlag {
    /// Bit index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Flag at a bit index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Fixed-size set of [`EffectFlag`]s.
///
/// Public API is read-only plus value-building (`with`, `union`); in-place
/// mutation is reserved for the effect store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EffectFlags {
    bits: [u64; 2],
}

impl EffectFlags {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: [0; 2] }
    }

    /// A set holding one flag.
    #[must_use]
    pub const fn single(flag: EffectFlag) -> Self {
        Self::empty().with(flag)
    }

    /// A copy of this set with `flag` added.
    #[must_use]
    pub const fn with(self, flag: EffectFlag) -> Self {
        let i = flag.index();
        let mut bits = self.bits;
        bits[i / 64] |= 1 << (i % 64);
        Self { bits }
    }

    /// Whether `flag` is present.
    #[must_use]
    pub const fn contains(self, flag: EffectFlag) -> bool {
        let i = flag.index();
        self.bits[i / 64] & (1 << (i % 64)) != 0
    }

    /// Whether any flag is shared with `other`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.bits[0] & other.bits[0]) != 0 || (self.bits[1] & other.bits[1]) != 0
    }

    /// Whether no flags are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits[0] == 0 && self.bits[1] == 0
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: [self.bits[0] | other.bits[0], self.bits[1] | other.bits[1]],
        }
    }

    /// Number of flags set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.bits[0].count_ones() + self.bits[1].count_ones()
    }

    /// Iterate flags in bit order.
    pub fn iter(self) -> impl Iterator<Item = EffectFlag> {
        EffectFlag::ALL
            .iter()
            .copied()
            .filter(move |flag| self.contains(*flag))
    }

    pub(crate) fn insert(&mut self, flag: EffectFlag) {
        *self = self.with(flag);
    }

    pub(crate) fn clear(&mut self) {
        self.bits = [0; 2];
    }
}

impl FromIterator<EffectFlag> for EffectFlags {
    fn from_iter<I: IntoIterator<Item = EffectFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<&[EffectFlag]> for EffectFlags {
    fn from(flags: &[EffectFlag]) -> Self {
        flags.iter().copied().collect()
    }
}

bitflags! {
    /// Behavioural flags of a non-player character.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MobFlags: u64 {
        /// Never wanders.
        const SENTINEL = 1 << 0;
        /// Hard to surprise.
        const AWARE = 1 << 1;
        /// Attacks anyone.
        const AGGRESSIVE = 1 << 2;
        /// Flees when hurt and avoids alert targets.
        const WIMPY = 1 << 3;
        /// Remembers attackers.
        const MEMORY = 1 << 4;
        /// Assists anyone in a fight.
        const HELPER = 1 << 5;
        /// Immune to charm.
        const NOCHARM = 1 << 6;
        /// Immune to sleep.
        const NOSLEEP = 1 << 7;
        /// Immune to blindness.
        const NOBLIND = 1 << 8;
        /// Immune to poison.
        const NOPOISON = 1 << 9;
        /// Immune to silence.
        const NOSILENCE = 1 << 10;
        /// An illusion.
        const ILLUSORY = 1 << 11;
        /// Raised by magic; dies without its animating effect.
        const ANIMATED = 1 << 12;
        /// Cannot be attacked.
        const PEACEFUL = 1 << 13;
        /// Town guard: fights evil and good extremes.
        const PEACEKEEPER = 1 << 14;
        /// Defends players.
        const PROTECTOR = 1 << 15;
        /// Attacks evil players.
        const AGGR_EVIL = 1 << 16;
        /// Attacks good players.
        const AGGR_GOOD = 1 << 17;
        /// Attacks neutral players.
        const AGGR_NEUTRAL = 1 << 18;
        /// Attacks evil-race players.
        const AGGR_EVIL_RACE = 1 << 19;
        /// Attacks good-race players.
        const AGGR_GOOD_RACE = 1 << 20;
        /// A phantasm treated as a player by aggressors.
        const PLAYER_PHANTASM = 1 << 21;
        /// Immune to summoning.
        const NOSUMMON = 1 << 22;
    }
}

impl MobFlags {
    /// Any of the player-directed aggression flags.
    #[must_use]
    pub fn aggr_to_players(self) -> bool {
        self.intersects(
            Self::AGGR_EVIL
                | Self::AGGR_GOOD
                | Self::AGGR_NEUTRAL
                | Self::AGGR_EVIL_RACE
                | Self::AGGR_GOOD_RACE,
        )
    }
}

bitflags! {
    /// Player preference flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PrefFlags: u32 {
        /// Immune to aggression.
        const NOHASSLE = 1 << 0;
        /// Attacks helpless targets.
        const VICIOUS = 1 << 1;
        /// Sees everything.
        const HOLYLIGHT = 1 << 2;
    }
}

bitflags! {
    /// Static room flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RoomFlags: u32 {
        /// No violence.
        const PEACEFUL = 1 << 0;
        /// Player killing allowed.
        const ARENA = 1 << 1;
        /// Dark.
        const DARK = 1 << 2;
        /// No magic.
        const NOMAGIC = 1 << 3;
    }
}

bitflags! {
    /// Room-wide conditions maintained by room effects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RoomEffectFlags: u32 {
        /// Magical fog.
        const FOG = 1 << 0;
        /// Ring of fire.
        const CIRCLE_FIRE = 1 << 1;
        /// Magical darkness.
        const DARKNESS = 1 << 2;
        /// Overgrown by urban renewal.
        const FOREST = 1 << 3;
        /// Magical light.
        const ILLUMINATION = 1 << 4;
    }
}

bitflags! {
    /// Extra object flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ItemFlags: u32 {
        /// Glows.
        const GLOW = 1 << 0;
        /// Hums.
        const HUM = 1 << 1;
        /// Invisible.
        const INVISIBLE = 1 << 2;
        /// Magical.
        const MAGIC = 1 << 3;
        /// Cannot be dropped.
        const NODROP = 1 << 4;
        /// Good characters cannot use it.
        const ANTI_GOOD = 1 << 5;
        /// Evil characters cannot use it.
        const ANTI_EVIL = 1 << 6;
        /// Cannot be made invisible.
        const NOINVIS = 1 << 7;
        /// Poisoned (food and drink).
        const POISONED = 1 << 8;
    }
}

bitflags! {
    /// Which dispatcher routines a spell invokes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Routines: u32 {
        /// Single-target damage.
        const DAMAGE = 1 << 0;
        /// Single-target affect.
        const AFFECT = 1 << 1;
        /// Remove effects.
        const UNAFFECT = 1 << 2;
        /// Resource adjustment.
        const POINT = 1 << 3;
        /// Alter an object.
        const ALTER_OBJ = 1 << 4;
        /// Affect the caster's group.
        const GROUP = 1 << 5;
        /// Affect everyone in the room.
        const MASS = 1 << 6;
        /// Attack everyone in the room.
        const AREA = 1 << 7;
        /// Summon creatures.
        const SUMMON = 1 << 8;
        /// Create objects.
        const CREATION = 1 << 9;
        /// Custom handler hook.
        const MANUAL = 1 << 10;
        /// Room effect.
        const ROOM = 1 << 11;
        /// Alter every object in the room.
        const BULK_OBJS = 1 << 12;
    }
}

bitflags! {
    /// Valid target kinds of a spell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TargetFlags: u32 {
        /// No target.
        const IGNORE = 1 << 0;
        /// Character in the room.
        const CHAR_ROOM = 1 << 1;
        /// Only the caster.
        const SELF_ONLY = 1 << 2;
        /// Never the caster.
        const NOT_SELF = 1 << 3;
        /// Current opponent.
        const FIGHT_VICT = 1 << 4;
        /// Object in inventory.
        const OBJ_INV = 1 << 5;
        /// Object in the room.
        const OBJ_ROOM = 1 << 6;
        /// Direct bolt.
        const DIRECT = 1 << 7;
        /// Touch.
        const CONTACT = 1 << 8;
        /// Ground-based.
        const GROUND = 1 << 9;
    }
}

bitflags! {
    /// Outcome codes of a routine. Empty means the cast fizzled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CastResult: u8 {
        /// Resource cost is deducted.
        const CHARGE = 1 << 0;
        /// Proficiency improves.
        const IMPROVE = 1 << 1;
    }
}

impl CastResult {
    /// Charged and improved.
    pub const SUCCESS: Self = Self::CHARGE.union(Self::IMPROVE);

    /// Whether the cast did nothing at all.
    #[must_use]
    pub fn is_fizzle(self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_flag_count_fits() {
        assert!(EffectFlag::ALL.len() <= 128);
        for (i, flag) in EffectFlag::ALL.iter().enumerate() {
            assert_eq!(flag.index(), i);
            assert_eq!(EffectFlag::from_index(i), Some(*flag));
        }
    }

    #[test]
    fn test_effect_flags_set_operations() {
        let a = EffectFlags::single(EffectFlag::Bless).with(EffectFlag::RadiantWeapon);
        assert!(a.contains(EffectFlag::Bless));
        assert!(a.contains(EffectFlag::RadiantWeapon));
        assert!(!a.contains(EffectFlag::Curse));
        assert_eq!(a.len(), 2);

        let b = EffectFlags::single(EffectFlag::RadiantWeapon);
        assert!(a.intersects(b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![EffectFlag::Bless, EffectFlag::RadiantWeapon]);
    }

    #[test]
    fn test_flag_sets_read_as_bare_strings() {
        let routines: Routines = ron::from_str(r#""DAMAGE | AFFECT""#).unwrap();
        assert_eq!(routines, Routines::DAMAGE | Routines::AFFECT);
        let targets: TargetFlags = ron::from_str(r#""CHAR_ROOM""#).unwrap();
        assert_eq!(targets, TargetFlags::CHAR_ROOM);
        let mobs: MobFlags = ron::from_str(r#""""#).unwrap();
        assert!(mobs.is_empty());

        let text = ron::to_string(&RoomEffectFlags::all()).unwrap();
        assert!(text.starts_with('"'));
        assert_eq!(ron::from_str::<RoomEffectFlags>(&text).unwrap(), RoomEffectFlags::all());
    }

    #[test]
    fn test_cast_result_success() {
        assert!(CastResult::SUCCESS.contains(CastResult::CHARGE));
        assert!(CastResult::SUCCESS.contains(CastResult::IMPROVE));
        assert!(CastResult::empty().is_fizzle());
    }

    #[test]
    fn test_aggr_to_players() {
        assert!(MobFlags::AGGR_EVIL.aggr_to_players());
        assert!(!MobFlags::AGGRESSIVE.aggr_to_players());
    }
}
