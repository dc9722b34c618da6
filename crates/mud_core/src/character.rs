//! Characters: players and mobiles.
//!
//! A character's status flags are never stored directly. They are read
//! from its [`EffectList`], which only the effect store mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::components::{
    ApplyLocation, CharId, Class, ObjId, Position, Race, RoomId, SaveKind, SpellId, Stance,
    Stats, ALIGN_EVIL, ALIGN_GOOD, LVL_IMMORT,
};
use crate::composition::{Composition, LifeForce};
use crate::cooldowns::Cooldowns;
use crate::effects::{Effect, EffectList, JoinMode};
use crate::flags::{EffectFlag, EffectFlags, MobFlags, PrefFlags};
use crate::math::{ratio, Fixed};
use crate::scheduler::EventHandle;

/// Non-spell proficiencies the engine consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    /// Intercepting attacks aimed at a guarded ally.
    Guard,
    /// Building rage through meditation.
    Meditate,
    /// Entering a berserk rage.
    Berserk,
}

/// Recurring per-character events currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharEvents {
    /// Hit point regeneration.
    pub hit: Option<EventHandle>,
    /// Movement regeneration.
    pub moves: Option<EventHandle>,
    /// Spell slot restoration.
    pub mana: Option<EventHandle>,
    /// Rage decay or growth.
    pub rage: Option<EventHandle>,
    /// Shared cooldown countdown.
    pub cooldowns: Option<EventHandle>,
}

/// A player or mobile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Arena handle.
    pub id: CharId,
    /// Short name used in messages.
    pub name: String,
    /// Whether this is a mobile.
    pub is_npc: bool,
    /// Players only: whether a connection is attached.
    pub connected: bool,
    /// Level.
    pub level: i32,
    /// Class.
    pub class: Class,
    /// Race.
    pub race: Race,
    /// Alignment, -1000 to 1000.
    pub alignment: i32,
    /// Body composition.
    pub composition: Composition,
    /// Life force.
    pub life_force: LifeForce,
    /// Natural ability scores.
    pub stats: Stats,
    /// Current hit points.
    pub hit: i32,
    /// Base maximum hit points, before effects.
    pub base_max_hit: i32,
    /// Current movement points.
    pub moves: i32,
    /// Base maximum movement points.
    pub base_max_moves: i32,
    /// Available spell slots.
    pub mana: i32,
    /// Maximum spell slots.
    pub max_mana: i32,
    /// Hunger; higher is more sated.
    pub hunger: i32,
    /// Thirst; higher is more sated.
    pub thirst: i32,
    /// How well hidden the character is.
    pub hiddenness: i32,
    /// Berserker rage.
    pub rage: i32,
    /// Consciousness.
    pub stance: Stance,
    /// Posture.
    pub position: Position,
    /// Current room.
    pub room: Option<RoomId>,
    /// Combat target.
    pub fighting: Option<CharId>,
    /// Character being followed.
    pub master: Option<CharId>,
    /// Characters following this one.
    pub followers: Vec<CharId>,
    /// Group leader, set on every member including the leader.
    pub group_leader: Option<CharId>,
    /// Who intercepts attacks aimed at this character.
    pub guarded_by: Option<CharId>,
    /// Mobile behaviour flags.
    pub mob_flags: MobFlags,
    /// Player preferences.
    pub prefs: PrefFlags,
    /// Players: flee below this many hit points.
    pub wimp_level: i32,
    /// Players: auto-attack while above this many hit points.
    pub aggr_level: i32,
    /// Base saving throws, indexed by [`SaveKind::index`].
    pub base_saves: [i32; 5],
    /// Non-spell proficiencies.
    pub skills: BTreeMap<Skill, i32>,
    /// Enemies remembered by a memory mobile.
    pub memory: Vec<CharId>,
    /// Spell being prepared.
    pub casting: Option<SpellId>,
    /// Pulses of enforced inaction.
    pub wait: i32,
    /// Cooldown slots.
    pub cooldowns: Cooldowns,
    /// Carried objects.
    pub inventory: Vec<ObjId>,
    /// Wielded weapon.
    pub wielded: Option<ObjId>,
    pub(crate) events: CharEvents,
    effects: EffectList,
}

/// Parameters for spawning a character.
#[derive(Debug, Clone)]
pub struct CharacterSpawn {
    /// Name.
    pub name: String,
    /// Mobile or player.
    pub is_npc: bool,
    /// Level.
    pub level: i32,
    /// Class.
    pub class: Class,
    /// Race.
    pub race: Race,
    /// Alignment.
    pub alignment: i32,
    /// Composition.
    pub composition: Composition,
    /// Life force.
    pub life_force: LifeForce,
    /// Ability scores.
    pub stats: Stats,
    /// Maximum hit points; the character spawns at full health.
    pub max_hit: i32,
    /// Maximum movement points.
    pub max_moves: i32,
    /// Maximum spell slots.
    pub max_mana: i32,
    /// Mobile flags.
    pub mob_flags: MobFlags,
    /// Preference flags.
    pub prefs: PrefFlags,
    /// Proficiencies.
    pub skills: Vec<(Skill, i32)>,
    /// Permanent innate conditions.
    pub innate: Vec<EffectFlag>,
    /// Wimpy threshold.
    pub wimp_level: i32,
    /// Auto-aggression threshold.
    pub aggr_level: i32,
}

impl Default for CharacterSpawn {
    fn default() -> Self {
        Self {
            name: "someone".into(),
            is_npc: true,
            level: 10,
            class: Class::Layman,
            race: Race::Human,
            alignment: 0,
            composition: Composition::Flesh,
            life_force: LifeForce::Life,
            stats: Stats::default(),
            max_hit: 100,
            max_moves: 100,
            max_mana: 0,
            mob_flags: MobFlags::empty(),
            prefs: PrefFlags::empty(),
            skills: Vec::new(),
            innate: Vec::new(),
            wimp_level: 0,
            aggr_level: 0,
        }
    }
}

impl Character {
    /// Build a character from spawn parameters. Innate conditions become
    /// permanent effects so the flag invariant holds for them too.
    #[must_use]
    pub fn from_spawn(id: CharId, spawn: CharacterSpawn) -> Self {
        let mut effects = EffectList::new();
        if !spawn.innate.is_empty() {
            let flags: EffectFlags = spawn.innate.iter().copied().collect();
            let mut innate = Effect::new(SpellId::INNATE, Effect::PERMANENT);
            innate.flags = flags;
            if let Err(e) = effects.apply(innate, JoinMode::ADD_ONLY) {
                warn!(name = %spawn.name, error = %e, "innate effects rejected");
            }
        }
        Self {
            id,
            name: spawn.name,
            is_npc: spawn.is_npc,
            connected: !spawn.is_npc,
            level: spawn.level,
            class: spawn.class,
            race: spawn.race,
            alignment: spawn.alignment,
            composition: spawn.composition,
            life_force: spawn.life_force,
            stats: spawn.stats,
            hit: spawn.max_hit,
            base_max_hit: spawn.max_hit,
            moves: spawn.max_moves,
            base_max_moves: spawn.max_moves,
            mana: spawn.max_mana,
            max_mana: spawn.max_mana,
            hunger: 24,
            thirst: 24,
            hiddenness: 0,
            rage: 0,
            stance: Stance::Alert,
            position: Position::Standing,
            room: None,
            fighting: None,
            master: None,
            followers: Vec::new(),
            group_leader: None,
            guarded_by: None,
            mob_flags: spawn.mob_flags,
            prefs: spawn.prefs,
            wimp_level: spawn.wimp_level,
            aggr_level: spawn.aggr_level,
            base_saves: [0; 5],
            skills: spawn.skills.into_iter().collect(),
            memory: Vec::new(),
            casting: None,
            wait: 0,
            cooldowns: Cooldowns::default(),
            inventory: Vec::new(),
            wielded: None,
            events: CharEvents::default(),
            effects,
        }
    }

    /// Active effects.
    #[must_use]
    pub fn effects(&self) -> &EffectList {
        &self.effects
    }

    pub(crate) fn effects_mut(&mut self) -> &mut EffectList {
        &mut self.effects
    }

    /// Armed recurring events.
    #[must_use]
    pub fn events(&self) -> CharEvents {
        self.events
    }

    /// Whether a derived status flag is set.
    #[must_use]
    pub fn has(&self, flag: EffectFlag) -> bool {
        self.effects.has_flag(flag)
    }

    /// Whether any record of `spell` is active.
    #[must_use]
    pub fn affected_by(&self, spell: SpellId) -> bool {
        self.effects.has_spell(spell)
    }

    /// Whether this is a player.
    #[must_use]
    pub const fn is_pc(&self) -> bool {
        !self.is_npc
    }

    /// Mobile flag check; always false for players.
    #[must_use]
    pub fn mob_flagged(&self, flag: MobFlags) -> bool {
        self.is_npc && self.mob_flags.contains(flag)
    }

    /// Preference flag check.
    #[must_use]
    pub fn pref_flagged(&self, flag: PrefFlags) -> bool {
        self.prefs.contains(flag)
    }

    /// Proficiency in a skill, zero when untrained.
    #[must_use]
    pub fn skill(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Effective maximum hit points.
    #[must_use]
    pub fn max_hit(&self) -> i32 {
        (self.base_max_hit + self.effects.modifier(ApplyLocation::MaxHit)).max(1)
    }

    /// Effective maximum movement points.
    #[must_use]
    pub fn max_moves(&self) -> i32 {
        (self.base_max_moves + self.effects.modifier(ApplyLocation::MaxMove)).max(1)
    }

    /// Effective strength.
    #[must_use]
    pub fn strength(&self) -> i32 {
        self.stats.strength + self.effects.modifier(ApplyLocation::Str)
    }

    /// Effective intelligence.
    #[must_use]
    pub fn intelligence(&self) -> i32 {
        self.stats.intelligence + self.effects.modifier(ApplyLocation::Int)
    }

    /// Effective wisdom.
    #[must_use]
    pub fn wisdom(&self) -> i32 {
        self.stats.wisdom + self.effects.modifier(ApplyLocation::Wis)
    }

    /// Effective charisma.
    #[must_use]
    pub fn charisma(&self) -> i32 {
        self.stats.charisma + self.effects.modifier(ApplyLocation::Cha)
    }

    /// Effective to-hit bonus.
    #[must_use]
    pub fn hitroll(&self) -> i32 {
        self.effects.modifier(ApplyLocation::Hitroll)
    }

    /// Effective damage bonus.
    #[must_use]
    pub fn damroll(&self) -> i32 {
        self.effects.modifier(ApplyLocation::Damroll)
    }

    /// Saving throw modifier for a save kind; lower is better.
    #[must_use]
    pub fn save(&self, kind: SaveKind) -> i32 {
        self.base_saves[kind.index()] + self.effects.modifier(ApplyLocation::for_save(kind))
    }

    /// Good alignment.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.alignment >= ALIGN_GOOD
    }

    /// Evil alignment.
    #[must_use]
    pub const fn is_evil(&self) -> bool {
        self.alignment <= ALIGN_EVIL
    }

    /// Neither good nor evil.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        !self.is_good() && !self.is_evil()
    }

    /// At least resting.
    #[must_use]
    pub const fn is_awake(&self) -> bool {
        self.stance.is_awake()
    }

    /// Dead and awaiting removal.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.stance == Stance::Dead
    }

    /// Immortal player.
    #[must_use]
    pub const fn is_immortal(&self) -> bool {
        !self.is_npc && self.level >= LVL_IMMORT
    }

    /// Paralyzed or mesmerized.
    #[must_use]
    pub fn is_helpless(&self) -> bool {
        self.has(EffectFlag::MinorParalysis)
            || self.has(EffectFlag::MajorParalysis)
            || self.has(EffectFlag::Mesmerized)
    }

    /// This character's group leader, or itself when ungrouped.
    #[must_use]
    pub fn leader(&self) -> CharId {
        self.group_leader.unwrap_or(self.id)
    }

    /// Whether this character belongs to a group.
    #[must_use]
    pub const fn in_group(&self) -> bool {
        self.group_leader.is_some()
    }

    /// How much controlling this creature costs a summoner.
    ///
    /// `level × Π(stat / 250 + 0.8)` over intelligence, wisdom and charisma.
    #[must_use]
    pub fn control_value(&self) -> Fixed {
        let mult = |stat: i32| ratio(stat + 200, 250);
        Fixed::from_num(self.level)
            .saturating_mul(mult(self.intelligence()))
            .saturating_mul(mult(self.wisdom()))
            .saturating_mul(mult(self.charisma()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(level: i32) -> Character {
        Character::from_spawn(
            CharId(1),
            CharacterSpawn {
                level,
                ..CharacterSpawn::default()
            },
        )
    }

    #[test]
    fn test_innate_flags_are_effects() {
        let ch = Character::from_spawn(
            CharId(1),
            CharacterSpawn {
                innate: vec![EffectFlag::Infravision, EffectFlag::Sanctuary],
                ..CharacterSpawn::default()
            },
        );
        assert!(ch.has(EffectFlag::Infravision));
        assert!(ch.has(EffectFlag::Sanctuary));
        assert!(ch.effects().has_permanent(SpellId::INNATE));
    }

    #[test]
    fn test_effective_max_hit_includes_modifiers() {
        let mut ch = spawn(10);
        ch.effects_mut()
            .apply(
                Effect::new(SpellId(20), 3).with_modifier(ApplyLocation::MaxHit, 25),
                JoinMode::ADD_ONLY,
            )
            .unwrap();
        assert_eq!(ch.max_hit(), 125);
    }

    #[test]
    fn test_control_value_scales_with_level() {
        // Stats of 50 give a multiplier of exactly 1.0 each.
        let mut ch = spawn(30);
        ch.stats.intelligence = 50;
        ch.stats.wisdom = 50;
        ch.stats.charisma = 50;
        assert_eq!(ch.control_value(), Fixed::from_num(30));
    }

    #[test]
    fn test_leader_defaults_to_self() {
        let ch = spawn(1);
        assert_eq!(ch.leader(), CharId(1));
        assert!(!ch.in_group());
    }
}
