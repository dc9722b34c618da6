//! The summon routine: raised undead, phantasms, and simulacra.
//!
//! Every summoned creature carries an animation effect for its lifetime.
//! When the effect sweep finds one without it, undead collapse and
//! illusions dissolve.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::handler::SpellContext;
use super::spell_for;
use crate::character::CharacterSpawn;
use crate::components::{CharId, Class, ObjId, SpellId, Stats, LVL_IMMORT};
use crate::composition::{Composition, LifeForce};
use crate::data::SummonKind;
use crate::effects::{Effect, JoinMode};
use crate::engine::Engine;
use crate::flags::{CastResult, EffectFlag, MobFlags};
use crate::math::{ratio, scale, Fixed};
use crate::messaging::Audience;
use crate::object::{CorpseData, ObjKind};
use crate::rng::RandomSource;

/// Charm duration given to illusions; they vanish long before it matters.
const ILLUSION_CHARM: i32 = 1000;

/// Whether a summoner can hold a creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVerdict {
    /// Far beyond the summoner's power, even with no other pets.
    HellNo,
    /// Too much alongside the pets already held.
    No,
    /// Controllable.
    Yes,
}

/// Flags a freshly made servant never keeps.
fn servant_strip() -> MobFlags {
    MobFlags::AGGRESSIVE
        | MobFlags::AGGR_EVIL
        | MobFlags::AGGR_GOOD
        | MobFlags::AGGR_NEUTRAL
        | MobFlags::AGGR_EVIL_RACE
        | MobFlags::AGGR_GOOD_RACE
        | MobFlags::PROTECTOR
        | MobFlags::PEACEKEEPER
        | MobFlags::HELPER
        | MobFlags::MEMORY
        | MobFlags::WIMPY
        | MobFlags::NOSUMMON
        | MobFlags::PEACEFUL
}

/// What a corpse rises as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndeadKind {
    /// The common case.
    Zombie,
    /// One in three.
    Skeleton,
    /// Risen rogues.
    Spectre,
    /// Risen magic users.
    Wraith,
    /// Risen archmages, very rarely.
    Lich,
}

/// Stat changes for one kind of undead, in tenths.
struct UndeadProfile {
    composition: Composition,
    class: Class,
    vigor: i32,
    stats: [i32; 6],
}

impl UndeadKind {
    /// Roll the kind of undead a corpse produces.
    pub fn roll<R: RandomSource + ?Sized>(corpse: &CorpseData, rng: &mut R) -> Self {
        if corpse.player {
            return Self::Zombie;
        }
        if corpse.level > 94 && corpse.class.is_magic_user() && rng.number(0, 250) == 0 {
            Self::Lich
        } else if corpse.level > 40 && corpse.class.is_magic_user() && rng.number(0, 6) == 0 {
            Self::Wraith
        } else if corpse.level > 25 && corpse.class.is_rogue() && rng.number(0, 4) == 0 {
            Self::Spectre
        } else if rng.number(0, 2) == 0 {
            Self::Skeleton
        } else {
            Self::Zombie
        }
    }

    const fn profile(self) -> UndeadProfile {
        // str, int, wis, dex, con, cha
        match self {
            Self::Zombie => UndeadProfile {
                composition: Composition::Flesh,
                class: Class::Warrior,
                vigor: 11,
                stats: [12, 5, 7, 7, 12, 5],
            },
            Self::Skeleton => UndeadProfile {
                composition: Composition::Bone,
                class: Class::Warrior,
                vigor: 12,
                stats: [12, 7, 9, 10, 12, 7],
            },
            Self::Spectre => UndeadProfile {
                composition: Composition::Ether,
                class: Class::Assassin,
                vigor: 14,
                stats: [12, 10, 10, 12, 12, 10],
            },
            Self::Wraith => UndeadProfile {
                composition: Composition::Ether,
                class: Class::Sorcerer,
                vigor: 16,
                stats: [13, 13, 13, 13, 13, 13],
            },
            Self::Lich => UndeadProfile {
                composition: Composition::Flesh,
                class: Class::Necromancer,
                vigor: 20,
                stats: [15, 15, 15, 15, 15, 15],
            },
        }
    }

    fn name(self, corpse: &CorpseData) -> String {
        if corpse.player {
            return "a rotting, fetid zombie".into();
        }
        let dead = corpse.name.as_str();
        match self {
            Self::Zombie => format!("the zombie of {dead}"),
            Self::Skeleton => format!("the skeleton of {dead}"),
            Self::Spectre => "a spectre".into(),
            Self::Wraith => "a wraith".into(),
            Self::Lich => "a lich".into(),
        }
    }
}

fn tenths(value: i32, factor: i32) -> i32 {
    scale(value, ratio(factor, 10))
}

/// Creatures a phantasm can take the shape of, with their levels.
const PHANTASM_FORMS: [(&str, i32); 13] = [
    ("an ant", 1),
    ("a mouse", 1),
    ("a garter snake", 3),
    ("a lesser shade", 10),
    ("a sparrow", 1),
    ("a rabbit", 2),
    ("a cat", 3),
    ("the familiar", 8),
    ("a cow", 5),
    ("a ceiling monkey", 6),
    ("a snow troll", 15),
    ("a gnome", 5),
    ("a tiny mist beast", 8),
];

impl Engine {
    /// Whether `ch` can take `mob` on as a pet.
    ///
    /// A single creature may be worth at most `min((100 - L) / 2 + L, 2L)`
    /// control; all charmed followers together at most the summoner's own
    /// control value, and never more than the configured number of pets.
    #[must_use]
    pub fn ch_can_control_mob(&self, ch: CharId, mob: CharId) -> ControlVerdict {
        let (Some(c), Some(m)) = (self.world.character(ch), self.world.character(mob)) else {
            return ControlVerdict::HellNo;
        };
        if c.level >= LVL_IMMORT {
            return ControlVerdict::Yes;
        }
        let max_single = ((LVL_IMMORT - c.level) / 2 + c.level).min(c.level * 2);
        let wanted = m.control_value();
        if wanted > Fixed::from_num(max_single) {
            return ControlVerdict::HellNo;
        }

        let mut current = Fixed::ZERO;
        let mut pets = 0;
        for follower in c.followers.iter().filter_map(|f| self.world.character(*f)) {
            if follower.has(EffectFlag::Charm) {
                current = current.saturating_add(follower.control_value());
                pets += 1;
            }
        }
        if current.saturating_add(wanted) > c.control_value() || pets >= self.config.max_pets {
            return ControlVerdict::No;
        }
        ControlVerdict::Yes
    }

    /// Bring a creature into being for the caster.
    pub fn mag_summon(&mut self, ctx: &SpellContext, obj: Option<ObjId>) -> CastResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(data) = spell_for(&catalog, ctx.spell, "mag_summon") else {
            return CastResult::CHARGE;
        };
        let Some(spec) = &data.summon else {
            error!(spell = %ctx.spell, "SYSERR: summon routine without summon data");
            return CastResult::CHARGE;
        };
        let Some(c) = self.world.character(ctx.caster).filter(|c| !c.is_dead()) else {
            return CastResult::empty();
        };
        if c.has(EffectFlag::Charm) && !c.mob_flagged(MobFlags::ANIMATED) {
            self.send(ctx.caster, "You are too giddy to have any followers!");
            return CastResult::CHARGE;
        }
        match spec.kind {
            SummonKind::AnimateDead => self.animate_dead(ctx, obj),
            SummonKind::Phantasm => self.phantasm(ctx),
            SummonKind::Simulacrum => self.simulacrum(ctx),
        }
    }

    fn bind_servant(&mut self, caster: CharId, servant: CharId, spell: SpellId, charm: i32) {
        let charm = Effect::new(spell, charm).with_flag(EffectFlag::Charm);
        if let Err(e) = self.world.apply_effect(servant, charm, JoinMode::REFRESH) {
            warn!(error = %e, "servant charm rejected");
        }
        if let Err(e) = self.world.add_follower(servant, caster) {
            warn!(error = %e, "servant could not follow");
        }
        if let Some(m) = self.world.character_mut(servant) {
            m.mob_flags.remove(servant_strip());
        }
    }

    fn animate(&mut self, creature: CharId, duration: i32) {
        let animated = Effect::new(SpellId::ANIMATION, duration).with_flag(EffectFlag::Animated);
        if let Err(e) = self.world.apply_effect(creature, animated, JoinMode::REFRESH) {
            warn!(error = %e, "animation rejected");
        }
    }

    fn animate_dead(&mut self, ctx: &SpellContext, obj: Option<ObjId>) -> CastResult {
        let corpse = match obj.and_then(|o| self.world.object(o)).map(|o| &o.kind) {
            Some(ObjKind::Corpse(corpse)) => corpse.clone(),
            _ => {
                self.send(ctx.caster, "A corpse would help, don't you think?");
                return CastResult::CHARGE;
            }
        };
        let Some(corpse_id) = obj else {
            return CastResult::CHARGE;
        };
        if corpse.player && !self.config.pk_allowed {
            self.send(ctx.caster, "Raising PC corpses is not currently allowed.");
            return CastResult::CHARGE;
        }
        if !corpse.player && !corpse.raisable {
            self.send(ctx.caster, "That corpse is much too decayed to raise.");
            return CastResult::CHARGE;
        }
        let Some(c) = self.world.character(ctx.caster) else {
            return CastResult::empty();
        };
        let Some(room) = c.room else {
            return CastResult::empty();
        };
        let (caster_level, caster_max_hit) = (c.level, c.max_hit());

        let kind = UndeadKind::roll(&corpse, &mut self.rng);
        let profile = kind.profile();
        let level = corpse.level.max(1);
        let lvl_mult = ratio(caster_level, level).min(Fixed::from_num(2));
        let max_hit = scale(tenths(caster_max_hit * 21 / 10, profile.vigor), lvl_mult).max(1);
        let base = Stats::default();
        let cap = |v: i32, f: i32| tenths(v, f).min(100);
        let spawn = CharacterSpawn {
            name: kind.name(&corpse),
            is_npc: true,
            level,
            class: profile.class,
            alignment: -1000,
            composition: profile.composition,
            life_force: LifeForce::Undead,
            stats: Stats {
                strength: cap(base.strength, profile.stats[0]),
                intelligence: cap(base.intelligence, profile.stats[1]),
                wisdom: cap(base.wisdom, profile.stats[2]),
                dexterity: cap(base.dexterity, profile.stats[3]),
                constitution: cap(base.constitution, profile.stats[4]),
                charisma: cap(base.charisma, profile.stats[5]),
            },
            max_hit,
            max_moves: scale(tenths(100, profile.vigor), lvl_mult).max(1),
            mob_flags: MobFlags::ANIMATED,
            ..CharacterSpawn::default()
        };
        let undead = match self.world.spawn_character(spawn, room) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "undead not created");
                return CastResult::CHARGE;
            }
        };

        let verdict = self.ch_can_control_mob(ctx.caster, undead);
        if verdict == ControlVerdict::HellNo {
            self.act("You begin to raise $N beyond your power, but you stop the spell in time.", Some(ctx.caster), Some(undead), Audience::Actor);
            self.act("$n begins to raise $N beyond $s power, but $e stops the spell in time.", Some(ctx.caster), Some(undead), Audience::Bystanders);
            self.extract_character(undead);
            if let Some(ObjKind::Corpse(corpse)) = self.world.object_mut(corpse_id).map(|o| &mut o.kind) {
                corpse.raisable = false;
            }
            return CastResult::CHARGE | CastResult::IMPROVE;
        }

        let duration = ((ctx.power - 20) / 5 + 5) * 3;
        self.animate(undead, duration);

        if verdict == ControlVerdict::Yes {
            self.act("You raise $N.", Some(ctx.caster), Some(undead), Audience::Actor);
            self.act("$n raises $N.", Some(ctx.caster), Some(undead), Audience::Bystanders);
            self.bind_servant(ctx.caster, undead, ctx.spell, duration + 1);
        } else {
            self.act("You raise $N, and $E doesn't seem too happy about it.", Some(ctx.caster), Some(undead), Audience::Actor);
            self.act("$n raises $N, and $E doesn't seem too happy about it.", Some(ctx.caster), Some(undead), Audience::Bystanders);
            if let Some(m) = self.world.character_mut(undead) {
                m.mob_flags.remove(servant_strip());
                m.mob_flags.insert(MobFlags::AGGRESSIVE);
            }
            self.set_fighting(undead, ctx.caster);
        }

        self.world.remove_object(corpse_id);
        info!(caster = ctx.caster.raw(), undead = undead.raw(), ?kind, ?verdict, "corpse raised");
        CastResult::CHARGE | CastResult::IMPROVE
    }

    fn phantasm(&mut self, ctx: &SpellContext) -> CastResult {
        let Some(room) = self.world.character(ctx.caster).and_then(|c| c.room) else {
            return CastResult::empty();
        };
        let duration = 2 + ctx.power / 5;
        let last = i32::try_from(PHANTASM_FORMS.len()).unwrap_or(1) - 1;
        let pick = usize::try_from(self.rng.number(0, last)).unwrap_or(0);
        let (name, level) = PHANTASM_FORMS[pick.min(PHANTASM_FORMS.len() - 1)];

        let spawn = CharacterSpawn {
            name: format!("the illusion of {name}"),
            level,
            life_force: LifeForce::Magic,
            max_hit: level * 10,
            mob_flags: MobFlags::ILLUSORY,
            ..CharacterSpawn::default()
        };
        let phantasm = match self.world.spawn_character(spawn, room) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "phantasm not created");
                self.send(ctx.caster, "The spell fizzles.");
                return CastResult::empty();
            }
        };
        self.animate(phantasm, duration);
        self.bind_servant(ctx.caster, phantasm, ctx.spell, ILLUSION_CHARM);
        self.act("From scattered motes of light, $n coalesces.", Some(phantasm), None, Audience::Room);
        info!(caster = ctx.caster.raw(), phantasm = phantasm.raw(), "phantasm conjured");
        CastResult::CHARGE | CastResult::IMPROVE
    }

    fn simulacrum(&mut self, ctx: &SpellContext) -> CastResult {
        let Some(victim) = ctx.victim.filter(|v| *v != ctx.caster) else {
            self.send(ctx.caster, "Who did you want to duplicate?");
            return CastResult::empty();
        };
        let (Some(c), Some(model)) = (self.world.character(ctx.caster), self.world.character(victim)) else {
            return CastResult::empty();
        };
        let Some(room) = c.room else {
            return CastResult::empty();
        };
        if model.level > ctx.power {
            self.act("$N is far too powerful!", Some(ctx.caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }
        if model.mob_flagged(MobFlags::ILLUSORY) {
            self.act("You cannot copy another illusion!", Some(ctx.caster), Some(victim), Audience::Actor);
            return CastResult::CHARGE;
        }

        let mob_flags = if model.is_pc() {
            MobFlags::MEMORY | MobFlags::PLAYER_PHANTASM | MobFlags::ILLUSORY
        } else {
            (model.mob_flags - servant_strip()) | MobFlags::ILLUSORY
        };
        let spawn = CharacterSpawn {
            name: format!("the illusion of {}", model.name),
            level: model.level,
            class: model.class,
            race: model.race,
            composition: model.composition,
            life_force: LifeForce::Magic,
            stats: model.stats,
            max_hit: model.max_hit(),
            max_moves: model.max_moves(),
            mob_flags,
            ..CharacterSpawn::default()
        };
        let duration = 3 + ctx.power / 4;
        let copy = match self.world.spawn_character(spawn, room) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "simulacrum not created");
                self.send(ctx.caster, "The spell fizzles.");
                return CastResult::empty();
            }
        };
        self.animate(copy, duration);
        self.bind_servant(ctx.caster, copy, ctx.spell, ILLUSION_CHARM);
        if let Some(m) = self.world.character_mut(copy) {
            m.mob_flags.insert(mob_flags & MobFlags::PLAYER_PHANTASM);
        }
        self.act("From scattered motes of light, $n coalesces.", Some(copy), None, Audience::Room);
        info!(caster = ctx.caster.raw(), model = victim.raw(), copy = copy.raw(), "simulacrum conjured");
        CastResult::CHARGE | CastResult::IMPROVE
    }
}
