//! Spell definition data structures.
//!
//! A [`SpellData`] declares what a spell does; the dispatcher and the
//! default handler interpret it. Spells refer to each other by name.

use serde::{Deserialize, Serialize};

use super::formula::Formula;
use crate::components::{ApplyLocation, Class, SaveKind, Sector, SpellId, Stance};
use crate::damage::DamageType;
use crate::effects::{JoinMode, MAX_BATCH};
use crate::flags::{EffectFlag, EffectFlags, MobFlags, RoomEffectFlags, Routines, TargetFlags};

/// Complete spell definition.
///
/// # Example RON
///
/// ```ron
/// SpellData(
///     id: 10,
///     name: "armor",
///     circle: 1,
///     routines: "AFFECT",
///     affects: Some(AffectSpec(
///         effects: [AffectTemplate(location: ArmorClass, modifier: Const(10))],
///         duration: Const(10),
///     )),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellData {
    /// Dense numeric id.
    pub id: SpellId,

    /// Unique lower-case name.
    pub name: String,

    /// Spell circle, 1 through 9.
    #[serde(default = "default_circle")]
    pub circle: u8,

    /// Lowest level at which any class learns the spell.
    #[serde(default = "default_min_level")]
    pub min_level: i32,

    /// Per-class level overrides.
    #[serde(default)]
    pub levels: Vec<ClassLevel>,

    /// Whether casting it is an attack.
    #[serde(default)]
    pub violent: bool,

    /// Ignores globes and immunities.
    #[serde(default)]
    pub always_lands: bool,

    /// Dispatcher routines, applied in fixed order.
    pub routines: Routines,

    /// Valid target kinds.
    #[serde(default)]
    pub targets: TargetFlags,

    /// Damage type for evasion and susceptibility.
    #[serde(default)]
    pub damage_type: Option<DamageType>,

    /// Proficiency grouping.
    #[serde(default)]
    pub sphere: Sphere,

    /// Saving throw the victim rolls.
    #[serde(default = "default_save")]
    pub save: SaveKind,

    /// Worst stance the caster may be in.
    #[serde(default = "default_min_stance")]
    pub min_stance: Stance,

    /// Castable while fighting.
    #[serde(default)]
    pub fighting_ok: bool,

    /// Resource cost range.
    #[serde(default)]
    pub cost: Cost,

    /// Sent to the victim when the last effect of this spell wears off.
    #[serde(default)]
    pub wear_off: Option<String>,

    /// Damage routine parameters.
    #[serde(default)]
    pub damage: Option<DamageSpec>,

    /// Affect routine parameters.
    #[serde(default)]
    pub affects: Option<AffectSpec>,

    /// Point routine parameters.
    #[serde(default)]
    pub points: Option<PointSpec>,

    /// Unaffect rules; when several match, the last one wins.
    #[serde(default)]
    pub unaffect: Vec<UnaffectRule>,

    /// Area routine parameters.
    #[serde(default)]
    pub area: Option<AreaSpec>,

    /// What each group member receives.
    #[serde(default)]
    pub group: Vec<GroupStep>,

    /// Summon routine parameters.
    #[serde(default)]
    pub summon: Option<SummonSpec>,

    /// Room routine parameters.
    #[serde(default)]
    pub room_effect: Option<RoomEffectSpec>,

    /// Object alteration performed.
    #[serde(default)]
    pub alter_obj: Option<AlterObj>,

    /// Creation routine parameters.
    #[serde(default)]
    pub creation: Option<CreationSpec>,

    /// Multi-round resolution.
    #[serde(default)]
    pub delayed: Option<DelayedSpec>,

    /// Feedback templates.
    #[serde(default)]
    pub messages: SpellMessages,

    /// Built-in handler overriding parts of the data-driven behaviour.
    #[serde(default)]
    pub handler: Option<HandlerKind>,
}

const fn default_circle() -> u8 {
    1
}

const fn default_min_level() -> i32 {
    1
}

const fn default_save() -> SaveKind {
    SaveKind::Spell
}

const fn default_min_stance() -> Stance {
    Stance::Alert
}

const fn default_true() -> bool {
    true
}

/// Skill-improvement grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sphere {
    /// Unassigned.
    #[default]
    Generic,
    /// Fire.
    Fire,
    /// Water and ice.
    Water,
    /// Earth.
    Earth,
    /// Air.
    Air,
    /// Healing.
    Healing,
    /// Protection.
    Protection,
    /// Enchantment.
    Enchantment,
    /// Summoning.
    Summoning,
    /// Death.
    Death,
    /// Divination.
    Divination,
}

/// Level at which one class learns the spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLevel {
    /// Class.
    pub class: Class,
    /// Level.
    pub level: i32,
}

/// Resource cost range; cost falls from `max` to `min` with proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Cost at full proficiency.
    pub min: i32,
    /// Cost when first learned.
    pub max: i32,
}

/// Caster/victim/room message templates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellMessages {
    /// To the caster.
    #[serde(default)]
    pub to_caster: Option<String>,
    /// To the victim.
    #[serde(default)]
    pub to_victim: Option<String>,
    /// To everyone else.
    #[serde(default)]
    pub to_room: Option<String>,
}

impl SpellMessages {
    /// Whether any template is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_caster.is_none() && self.to_victim.is_none() && self.to_room.is_none()
    }
}

/// One step of the damage pipeline after the base amount is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageStep {
    /// Weak NPC casters deal a fraction of balanced damage.
    NpcReduction,
    /// Bonus for casters of listed classes.
    ClassBonus,
    /// A successful save halves damage.
    SavingThrow,
    /// An active harness adds one percent per victim level.
    Harness,
    /// Scale by the victim's susceptibility.
    Susceptibility,
}

fn default_pipeline() -> Vec<DamageStep> {
    vec![
        DamageStep::SavingThrow,
        DamageStep::Harness,
        DamageStep::Susceptibility,
    ]
}

/// Class-based damage bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBonus {
    /// Classes that receive it.
    pub classes: Vec<Class>,
    /// Bonus percent.
    pub percent: i32,
}

/// A precondition on caster or victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// Victim's life force.
    VictimLifeForce(crate::composition::LifeForce),
    /// Victim must be evil.
    VictimEvil,
    /// Victim must be good.
    VictimGood,
    /// Caster alignment at least this.
    CasterAlignAbove(i32),
    /// Caster alignment at most this.
    CasterAlignBelow(i32),
}

/// A requirement with the message sent when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    /// Condition.
    pub requirement: Requirement,
    /// Sent to the caster on failure.
    pub message: String,
}

/// Damage routine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSpec {
    /// Base amount.
    pub formula: Formula,
    /// Steps after the base roll, in order.
    #[serde(default = "default_pipeline")]
    pub pipeline: Vec<DamageStep>,
    /// Bonus for listed classes, used by [`DamageStep::ClassBonus`].
    #[serde(default)]
    pub class_bonus: Option<ClassBonus>,
    /// Preconditions; a failure charges without damage.
    #[serde(default)]
    pub guards: Vec<Guard>,
    /// Caster regains hit points equal to damage dealt.
    #[serde(default)]
    pub heals_caster: bool,
    /// Effect worn down by one point per hit on an immobilized victim.
    #[serde(default)]
    pub erodes: Option<String>,
}

/// One effect record a cast produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectTemplate {
    /// Attribute modified.
    #[serde(default)]
    pub location: ApplyLocation,
    /// Modifier amount.
    #[serde(default)]
    pub modifier: Formula,
    /// Overrides the spec-wide duration.
    #[serde(default)]
    pub duration: Option<Formula>,
    /// Contributed flags.
    #[serde(default)]
    pub flags: Vec<EffectFlag>,
}

impl AffectTemplate {
    /// Contributed flags as a set.
    #[must_use]
    pub fn flag_set(&self) -> EffectFlags {
        self.flags.iter().copied().collect()
    }
}

/// Refuse the affect when the victim already has something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Spells by name.
    #[serde(default)]
    pub spells: Vec<String>,
    /// Status flags.
    #[serde(default)]
    pub flags: Vec<EffectFlag>,
    /// Sent to the caster.
    #[serde(default = "default_exclusion_message")]
    pub message: String,
}

fn default_exclusion_message() -> String {
    "Nothing happens.".into()
}

/// Affect routine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectSpec {
    /// Records to apply, at most nine.
    pub effects: Vec<AffectTemplate>,
    /// Duration of templates without their own.
    #[serde(default)]
    pub duration: Formula,
    /// Add the new duration to an existing record.
    #[serde(default)]
    pub accumulate_duration: bool,
    /// Add the new modifier to an existing record.
    #[serde(default)]
    pub accumulate_modifier: bool,
    /// Replace an existing record.
    #[serde(default = "default_true")]
    pub refresh: bool,
    /// Conditions that refuse the affect.
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    /// Only rigid bodies can hold it.
    #[serde(default)]
    pub rigid_only: bool,
    /// A successful save negates it.
    #[serde(default)]
    pub saving_throw: bool,
    /// NPCs with any of these flags are unaffected.
    #[serde(default)]
    pub npc_immune: MobFlags,
    /// Messages on success.
    #[serde(default)]
    pub messages: SpellMessages,
}

impl AffectSpec {
    /// Join mode for applying the records.
    #[must_use]
    pub const fn join_mode(&self) -> JoinMode {
        JoinMode {
            accumulate_duration: self.accumulate_duration,
            accumulate_modifier: self.accumulate_modifier,
            refresh: self.refresh,
        }
    }

    /// Union of every template's flags.
    #[must_use]
    pub fn flag_set(&self) -> EffectFlags {
        self.effects
            .iter()
            .fold(EffectFlags::empty(), |acc, t| acc.union(t.flag_set()))
    }

    /// Whether the template count fits a single batch.
    #[must_use]
    pub fn fits_batch(&self) -> bool {
        self.effects.len() <= MAX_BATCH
    }
}

/// Direct resource adjustments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointSpec {
    /// Hit points.
    #[serde(default)]
    pub hit: Option<Formula>,
    /// Movement points.
    #[serde(default)]
    pub moves: Option<Formula>,
    /// Hunger relief.
    #[serde(default)]
    pub hunger: Option<Formula>,
    /// Thirst relief.
    #[serde(default)]
    pub thirst: Option<Formula>,
    /// Hiddenness change.
    #[serde(default)]
    pub hiddenness: Option<Formula>,
    /// Scale hit point changes by the victim's susceptibility.
    #[serde(default)]
    pub scale_by: Option<DamageType>,
    /// Sent to the victim.
    #[serde(default)]
    pub message: Option<String>,
}

/// One removable category of condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaffectRule {
    /// Spells by name whose records are removed.
    #[serde(default)]
    pub spells: Vec<String>,
    /// Records contributing any of these flags are removed.
    #[serde(default)]
    pub flags: Vec<EffectFlag>,
    /// Sent to the victim.
    #[serde(default)]
    pub message: Option<String>,
    /// Sent to the room.
    #[serde(default)]
    pub to_room: Option<String>,
}

/// Alignment filter for area spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Good.
    Good,
    /// Evil.
    Evil,
}

/// Area routine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaSpec {
    /// Refused where there is no ground.
    #[serde(default)]
    pub needs_ground: bool,
    /// Only victims of this alignment are hit.
    #[serde(default)]
    pub only: Option<Alignment>,
    /// A caster of this alignment is destroyed by the spell.
    #[serde(default)]
    pub backfires_on: Option<Alignment>,
}

/// Which routine a group step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupRoutine {
    /// Apply the named spell's affects.
    Affect,
    /// Apply the named spell's points.
    Point,
    /// Apply the named spell's unaffect rules.
    Unaffect,
}

/// One thing each group member receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStep {
    /// Spell by name.
    pub spell: String,
    /// Routine to run with it.
    pub routine: GroupRoutine,
}

/// What a summon produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummonKind {
    /// Raise a corpse as undead.
    AnimateDead,
    /// Conjure an illusory creature.
    Phantasm,
    /// Copy a living victim.
    Simulacrum,
}

/// Summon routine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonSpec {
    /// Kind.
    pub kind: SummonKind,
}

/// Room routine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEffectSpec {
    /// Condition raised.
    pub flag: RoomEffectFlags,
    /// Sweeps it lasts.
    pub duration: Formula,
    /// Sectors where it cannot be cast.
    #[serde(default)]
    pub forbidden_sectors: Vec<Sector>,
    /// Sent to the caster on a forbidden sector or an existing condition.
    #[serde(default = "default_exclusion_message")]
    pub refused: String,
    /// Broadcast when it expires.
    #[serde(default)]
    pub wear_off: Option<String>,
}

/// Object alteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlterObj {
    /// Radiant blessing on a weapon.
    BlessWeapon,
    /// Unholy hex on a weapon.
    HexWeapon,
    /// Curse an item.
    Curse,
    /// Lift a curse.
    RemoveCurse,
    /// Make invisible.
    Invisibility,
    /// Poison food or drink.
    Poison,
    /// Purify food or drink.
    RemovePoison,
}

/// A food the creation routine can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodChoice {
    /// Proficiency needed.
    pub min_power: i32,
    /// Only for these classes; empty means everyone.
    #[serde(default)]
    pub classes: Vec<Class>,
    /// Name.
    pub name: String,
    /// Nourishment.
    pub filling: i32,
}

/// Creation routine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreationSpec {
    /// A spring in the caster's room.
    Spring {
        /// Name of the spring.
        name: String,
        /// Ticks before it dries up.
        timer: i32,
    },
    /// Food in the caster's inventory; the best eligible choice wins.
    Food {
        /// Candidates.
        menu: Vec<FoodChoice>,
    },
}

/// Multi-round resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedSpec {
    /// Rounds in total.
    pub rounds: i32,
    /// Pulses between rounds.
    pub wait: u64,
    /// Re-check preconditions every round.
    #[serde(default)]
    pub sustained: bool,
}

/// Built-in handlers selectable from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerKind {
    /// Temporary hit point spells.
    Vitality(VitalityTier),
    /// Sustained self-immolation.
    Pyre,
}

/// Strength of a temporary hit point spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalityTier {
    /// Lesser endurance.
    LesserEndurance,
    /// Endurance.
    Endurance,
    /// Greater endurance.
    GreaterEndurance,
    /// Vitality.
    Vitality,
    /// Greater vitality.
    GreaterVitality,
    /// Dragon's health.
    DragonsHealth,
}

impl SpellData {
    /// Level at which `class` learns the spell.
    #[must_use]
    pub fn level_for(&self, class: Class) -> i32 {
        self.levels
            .iter()
            .find(|l| l.class == class)
            .map_or(self.min_level, |l| l.level)
    }

    /// Whether the spell runs a routine.
    #[must_use]
    pub fn has_routine(&self, routine: Routines) -> bool {
        self.routines.intersects(routine)
    }

    /// Whether the spell resolves over several rounds.
    #[must_use]
    pub fn is_delayed(&self) -> bool {
        self.delayed.is_some()
    }

    /// Every spell name this definition refers to.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        if let Some(affects) = &self.affects {
            for ex in &affects.exclusions {
                refs.extend(ex.spells.iter().map(String::as_str));
            }
        }
        for rule in &self.unaffect {
            refs.extend(rule.spells.iter().map(String::as_str));
        }
        for step in &self.group {
            refs.push(step.spell.as_str());
        }
        if let Some(name) = self.damage.as_ref().and_then(|d| d.erodes.as_deref()) {
            refs.push(name);
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armor() -> SpellData {
        ron::from_str(
            r#"SpellData(
                id: 10,
                name: "armor",
                routines: "AFFECT",
                affects: Some(AffectSpec(
                    effects: [AffectTemplate(location: ArmorClass, modifier: Const(10))],
                    duration: Const(10),
                    exclusions: [Exclusion(spells: ["barkskin"])],
                )),
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let spell = armor();
        assert_eq!(spell.circle, 1);
        assert_eq!(spell.save, SaveKind::Spell);
        assert_eq!(spell.min_stance, Stance::Alert);
        assert!(!spell.violent);
        let affects = spell.affects.as_ref().unwrap();
        assert!(affects.refresh);
        assert_eq!(affects.exclusions[0].message, "Nothing happens.");
    }

    #[test]
    fn test_references() {
        assert_eq!(armor().references(), vec!["barkskin"]);
    }

    #[test]
    fn test_level_for_class() {
        let mut spell = armor();
        spell.levels.push(ClassLevel {
            class: Class::Cleric,
            level: 5,
        });
        assert_eq!(spell.level_for(Class::Cleric), 5);
        assert_eq!(spell.level_for(Class::Warrior), 1);
    }

    #[test]
    fn test_default_damage_pipeline() {
        let spec: DamageSpec = ron::from_str("DamageSpec(formula: Dice(1, 8))").unwrap();
        assert_eq!(
            spec.pipeline,
            vec![DamageStep::SavingThrow, DamageStep::Harness, DamageStep::Susceptibility]
        );
    }
}
