//! Damage types, susceptibility, evasion, and saving throws.
//!
//! Susceptibility is a percentage: 0 is immunity, 100 is normal, anything
//! above 100 is a vulnerability. The evasion curve maps it to a probability
//! of avoiding an attack outright:
//!
//! ```text
//! P(evade) = (100 - s)^3 / 1_000_000      for s in [0, 100]
//! ```
//!
//! which is certain at 0, impossible at 100 and above, and stays small
//! until `s` falls well below 100.

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::components::{Class, SaveKind};
use crate::composition::{Composition, Phase};
use crate::flags::{EffectFlag, MobFlags};
use crate::math::percent_of;
use crate::object::Object;
use crate::rng::RandomSource;

/// Denominator of the evasion curve.
pub const EVASION_SCALE: i32 = 1_000_000;

/// Kind of harm an attack or spell deals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageType {
    /// Edged weapons.
    Slash,
    /// Pointed weapons.
    Pierce,
    /// Blunt force.
    Crush,
    /// Electricity.
    Shock,
    /// Heat.
    Fire,
    /// Drowning.
    Water,
    /// Cold.
    Cold,
    /// Corrosion.
    Acid,
    /// Poison.
    Poison,
    /// Healing energy; harms what it cannot heal.
    Heal,
    /// Holy or unholy retribution.
    Align,
    /// Unravels magical bodies.
    Dispel,
    /// Unbinds spirits from undead bodies.
    Discorporate,
    /// Mental assault.
    Mental,
}

impl DamageType {
    /// Every damage type.
    pub const ALL: [Self; 14] = [
        Self::Slash,
        Self::Pierce,
        Self::Crush,
        Self::Shock,
        Self::Fire,
        Self::Water,
        Self::Cold,
        Self::Acid,
        Self::Poison,
        Self::Heal,
        Self::Align,
        Self::Dispel,
        Self::Discorporate,
        Self::Mental,
    ];

    /// Column in composition tables, for the nine physical and elemental types.
    #[must_use]
    pub const fn physical_index(self) -> Option<usize> {
        match self {
            Self::Slash => Some(0),
            Self::Pierce => Some(1),
            Self::Crush => Some(2),
            Self::Shock => Some(3),
            Self::Fire => Some(4),
            Self::Water => Some(5),
            Self::Cold => Some(6),
            Self::Acid => Some(7),
            Self::Poison => Some(8),
            _ => None,
        }
    }

    /// Weapon damage that cannot touch a non-rigid body.
    #[must_use]
    pub const fn is_physical(self) -> bool {
        matches!(self, Self::Slash | Self::Pierce | Self::Crush)
    }

    /// Lower-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Slash => "slash",
            Self::Pierce => "pierce",
            Self::Crush => "crush",
            Self::Shock => "shock",
            Self::Fire => "fire",
            Self::Water => "water",
            Self::Cold => "cold",
            Self::Acid => "acid",
            Self::Poison => "poison",
            Self::Heal => "heal",
            Self::Align => "align",
            Self::Dispel => "dispel",
            Self::Discorporate => "discorporate",
            Self::Mental => "mental",
        }
    }
}

/// Reduce by a quarter.
const fn quarter_off(sus: i32) -> i32 {
    sus * 75 / 100
}

/// Susceptibility of `ch` to `dtype`, including protective effects.
#[must_use]
pub fn susceptibility(ch: &Character, dtype: DamageType) -> i32 {
    let comp = ch.composition.info().sus;
    let life = ch.life_force.info();
    match dtype {
        DamageType::Slash => comp[0],
        DamageType::Pierce => comp[1],
        DamageType::Crush | DamageType::Acid => {
            let base = if dtype == DamageType::Crush { comp[2] } else { comp[7] };
            if ch.has(EffectFlag::NegateEarth) {
                0
            } else if ch.has(EffectFlag::ProtectEarth) {
                quarter_off(base)
            } else {
                base
            }
        }
        DamageType::Shock => {
            if ch.has(EffectFlag::NegateAir) {
                0
            } else if ch.has(EffectFlag::ProtectAir) {
                quarter_off(comp[3])
            } else {
                comp[3]
            }
        }
        DamageType::Fire => {
            if ch.has(EffectFlag::NegateHeat) {
                return 0;
            }
            let mut sus = comp[4];
            if ch.has(EffectFlag::Coldshield) {
                sus = quarter_off(sus);
            }
            if ch.has(EffectFlag::ProtectFire) {
                sus = quarter_off(sus);
            }
            sus
        }
        DamageType::Water => comp[5],
        DamageType::Cold => {
            if ch.has(EffectFlag::NegateCold) {
                return 0;
            }
            let mut sus = comp[6];
            if ch.has(EffectFlag::Fireshield) {
                sus = quarter_off(sus);
            }
            if ch.has(EffectFlag::ProtectCold) {
                sus = quarter_off(sus);
            }
            sus
        }
        DamageType::Poison => {
            if ch.mob_flagged(MobFlags::NOPOISON) || ch.mob_flagged(MobFlags::ILLUSORY) {
                0
            } else {
                comp[8]
            }
        }
        DamageType::Heal => life.sus_heal,
        DamageType::Align => 100,
        DamageType::Dispel => life.sus_dispel,
        DamageType::Discorporate => life.sus_discorporate,
        DamageType::Mental => life.sus_mental,
    }
}

/// Evasion threshold for a susceptibility: the draw must exceed it.
#[must_use]
pub const fn evasion_threshold(sus: i32) -> i32 {
    let gap = 100 - clamp_percent(sus);
    EVASION_SCALE - gap * gap * gap
}

const fn clamp_percent(sus: i32) -> i32 {
    if sus < 0 {
        0
    } else if sus > 100 {
        100
    } else {
        sus
    }
}

/// One roll on the evasion curve.
pub fn curve_evades<R: RandomSource + ?Sized>(rng: &mut R, sus: i32) -> bool {
    rng.number(1, EVASION_SCALE) > evasion_threshold(sus)
}

fn weapon_element_flags() -> [(EffectFlag, DamageType); 5] {
    [
        (EffectFlag::FireWeapon, DamageType::Fire),
        (EffectFlag::IceWeapon, DamageType::Cold),
        (EffectFlag::PoisonWeapon, DamageType::Poison),
        (EffectFlag::AcidWeapon, DamageType::Acid),
        (EffectFlag::ShockWeapon, DamageType::Shock),
    ]
}

/// Whether `victim` avoids a physical or weapon attack entirely.
///
/// An ether body shrugs off weapon damage from anyone who is not blessed,
/// a radiant weapon always connects, and an elementally enchanted weapon
/// uses whichever of its base and elemental damage the victim is more
/// susceptible to.
pub fn damage_evasion<R: RandomSource + ?Sized>(
    victim: &Character,
    attacker: Option<&Character>,
    weapon: Option<&Object>,
    dtype: DamageType,
    rng: &mut R,
) -> bool {
    if let Some(attacker) = attacker {
        if dtype.is_physical() && victim.composition == Composition::Ether {
            return !attacker.has(EffectFlag::Bless);
        }
    }

    let mut sus = susceptibility(victim, dtype);
    if let (Some(_), Some(weapon)) = (attacker, weapon) {
        if weapon.has(EffectFlag::RadiantWeapon) {
            return false;
        }
        let base = weapon
            .weapon_damage_type()
            .map_or(sus, |base| susceptibility(victim, base));
        let elemental = weapon_element_flags()
            .into_iter()
            .filter(|(flag, _)| weapon.has(*flag))
            .map(|(_, element)| susceptibility(victim, element))
            .max();
        if let Some(elemental) = elemental {
            sus = base.max(elemental);
        }
    }
    curve_evades(rng, sus)
}

/// All-or-nothing evasion for spells that carry a damage type but deal no
/// direct damage, such as sleep or word of command.
pub fn boolean_attack_evasion<R: RandomSource + ?Sized>(
    victim: &Character,
    power: i32,
    dtype: DamageType,
    rng: &mut R,
) -> bool {
    let chance = (110 + victim.level - susceptibility(victim, dtype) - power).max(3);
    rng.number(1, 100) < chance
}

/// Blessed attackers strike ether bodies at full force.
#[must_use]
pub fn blessed_blow(attacker: &Character) -> bool {
    attacker.has(EffectFlag::Bless)
}

/// Scale `dam` by the victim's susceptibility.
#[must_use]
pub fn dam_suscept_adjust(
    attacker: Option<&Character>,
    victim: &Character,
    dam: i32,
    dtype: DamageType,
) -> i32 {
    match attacker {
        Some(a) if !(victim.composition.phase() == Phase::Ether && blessed_blow(a)) => {
            percent_of(dam, susceptibility(victim, dtype))
        }
        _ => dam,
    }
}

/// Class-family base saves, in [`SaveKind`] order.
#[must_use]
pub const fn class_base_saves(class: Class) -> [i32; 5] {
    match class.base() {
        Class::Sorcerer => [90, 85, 95, 105, 80],
        Class::Cleric => [85, 110, 85, 115, 90],
        Class::Rogue => [95, 90, 100, 110, 110],
        Class::Warrior => [105, 115, 100, 100, 110],
        _ => [105, 115, 105, 110, 110],
    }
}

/// Effective save number; lower is better.
#[must_use]
pub fn save_value(ch: &Character, kind: SaveKind) -> i32 {
    class_base_saves(ch.class)[kind.index()] - ch.level / 2 + ch.save(kind)
}

/// Whether `ch` makes a saving throw.
pub fn mag_savingthrow<R: RandomSource + ?Sized>(ch: &Character, kind: SaveKind, rng: &mut R) -> bool {
    save_value(ch, kind).max(1) < rng.number(0, 99)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterSpawn;
    use crate::components::{ApplyLocation, CharId, SpellId};
    use crate::effects::{Effect, JoinMode, JoinOutcome};
    use crate::rng::GameRng;

    fn body(composition: Composition) -> Character {
        Character::from_spawn(
            CharId(1),
            CharacterSpawn {
                composition,
                ..CharacterSpawn::default()
            },
        )
    }

    /// Grant `flag` through its own record so several flags can stack.
    fn with_flag(mut ch: Character, flag: EffectFlag) -> Character {
        let spell = SpellId(40 + u16::try_from(flag.index()).unwrap());
        let outcome = ch
            .effects_mut()
            .apply(Effect::new(spell, 5).with_flag(flag), JoinMode::ADD_ONLY)
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Added);
        ch
    }

    #[test]
    fn test_threshold_endpoints() {
        assert_eq!(evasion_threshold(0), 0);
        assert_eq!(evasion_threshold(100), EVASION_SCALE);
        assert_eq!(evasion_threshold(250), EVASION_SCALE);
        assert_eq!(evasion_threshold(-20), 0);
        assert_eq!(evasion_threshold(90), EVASION_SCALE - 1000);
    }

    #[test]
    fn test_curve_is_monotone() {
        let mut last = evasion_threshold(0);
        for s in 1..=100 {
            let t = evasion_threshold(s);
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn test_protections_reduce_fire() {
        let plain = body(Composition::Flesh);
        assert_eq!(susceptibility(&plain, DamageType::Fire), 100);
        let shielded = with_flag(body(Composition::Flesh), EffectFlag::Coldshield);
        assert_eq!(susceptibility(&shielded, DamageType::Fire), 75);
        let both = with_flag(shielded, EffectFlag::ProtectFire);
        assert!(both.has(EffectFlag::Coldshield) && both.has(EffectFlag::ProtectFire));
        assert_eq!(susceptibility(&both, DamageType::Fire), 56);
        let negated = with_flag(body(Composition::Flesh), EffectFlag::NegateHeat);
        assert_eq!(susceptibility(&negated, DamageType::Fire), 0);
    }

    #[test]
    fn test_acid_uses_earth_protection() {
        let ch = with_flag(body(Composition::Flesh), EffectFlag::ProtectEarth);
        assert_eq!(susceptibility(&ch, DamageType::Acid), 75);
        assert_eq!(susceptibility(&ch, DamageType::Crush), 75);
    }

    #[test]
    fn test_illusions_ignore_poison() {
        let mut ch = body(Composition::Flesh);
        ch.mob_flags |= MobFlags::ILLUSORY;
        assert_eq!(susceptibility(&ch, DamageType::Poison), 0);
    }

    #[test]
    fn test_ether_needs_blessing() {
        let victim = body(Composition::Ether);
        let attacker = body(Composition::Flesh);
        let mut rng = GameRng::seeded(9);
        for _ in 0..50 {
            assert!(damage_evasion(&victim, Some(&attacker), None, DamageType::Slash, &mut rng));
        }
        let blessed = with_flag(body(Composition::Flesh), EffectFlag::Bless);
        for _ in 0..50 {
            assert!(!damage_evasion(&victim, Some(&blessed), None, DamageType::Slash, &mut rng));
        }
    }

    #[test]
    fn test_boolean_evasion_floor() {
        // A weak victim still evades when the draw is 1 or 2.
        let mut victim = body(Composition::Flesh);
        victim.level = 1;
        struct Low;
        impl RandomSource for Low {
            fn number(&mut self, low: i32, _high: i32) -> i32 {
                low
            }
        }
        assert!(boolean_attack_evasion(&victim, 100, DamageType::Mental, &mut Low));
    }

    #[test]
    fn test_saves_improve_with_level_and_modifiers() {
        let mut ch = body(Composition::Flesh);
        ch.class = Class::Sorcerer;
        ch.level = 20;
        assert_eq!(save_value(&ch, SaveKind::Spell), 70);
        ch.effects_mut()
            .apply(
                Effect::new(SpellId(41), 5).with_modifier(ApplyLocation::SaveSpell, -10),
                JoinMode::ADD_ONLY,
            )
            .unwrap();
        assert_eq!(save_value(&ch, SaveKind::Spell), 60);
    }

    #[test]
    fn test_susceptibility_scaling() {
        let attacker = body(Composition::Flesh);
        let earth = body(Composition::Earth);
        assert_eq!(dam_suscept_adjust(Some(&attacker), &earth, 100, DamageType::Crush), 120);
        assert_eq!(dam_suscept_adjust(None, &earth, 100, DamageType::Crush), 100);
    }
}
