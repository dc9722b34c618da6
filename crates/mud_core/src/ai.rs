//! Aggression and target selection for mobiles and berserkers.
//!
//! [`is_aggr_to`] decides whether one character wants to attack another;
//! [`Engine::scan_aggr_targets`] draws a bounded random sample of everyone
//! in the room it is aggressive to, and [`Engine::find_aggr_target`] picks a
//! victim from that sample.

use tracing::debug;

use crate::combat::{attack_ok, can_see, player_ally};
use crate::components::{CharId, RaceAlign};
use crate::config::EngineConfig;
use crate::engine::{Engine, GameEvent};
use crate::flags::{EffectFlag, MobFlags, PrefFlags, RoomFlags};
use crate::messaging::Audience;
use crate::rng::RandomSource;
use crate::world::World;

/// Alignment gap at which a peacekeeper turns on a mobile.
const PEACEKEEPER_ALIGN_GAP: i32 = 1350;

/// Difficulty above any real appraisal.
const UNREACHABLE: i32 = 100_000_000;

fn appears_player(world: &World, id: CharId) -> bool {
    world
        .character(id)
        .is_some_and(|c| c.is_pc() || c.mob_flagged(MobFlags::PLAYER_PHANTASM))
}

/// Whether mobile `ch` would join `vict`'s fight.
#[must_use]
pub fn will_assist(world: &World, ch: CharId, vict: CharId) -> bool {
    let (Some(me), Some(them)) = (world.character(ch), world.character(vict)) else {
        return false;
    };
    if me.fighting.is_some() || ch == vict {
        return false;
    }
    let Some(foe_id) = them.fighting.filter(|f| *f != ch) else {
        return false;
    };
    let Some(foe) = world.character(foe_id).filter(|f| f.room == me.room) else {
        return false;
    };
    let foe_keeps_peace = foe.mob_flagged(MobFlags::PROTECTOR) || foe.mob_flagged(MobFlags::PEACEKEEPER);

    if appears_player(world, vict) {
        return me.mob_flagged(MobFlags::PROTECTOR) && !foe_keeps_peace && !appears_player(world, foe_id);
    }

    if me.mob_flagged(MobFlags::PEACEKEEPER) || me.mob_flagged(MobFlags::PROTECTOR) {
        if foe_keeps_peace {
            return false;
        }
        if them.mob_flagged(MobFlags::PEACEKEEPER) || them.mob_flagged(MobFlags::PROTECTOR) {
            return true;
        }
        if me.mob_flagged(MobFlags::PEACEKEEPER) && (me.alignment - foe.alignment).abs() > PEACEKEEPER_ALIGN_GAP {
            return true;
        }
    }
    me.mob_flagged(MobFlags::HELPER)
}

/// Whether `ch` wants to attack `tch`.
///
/// Mobiles check their aggression flags in a fixed order and the first
/// match wins. A player is aggressive only while berserk, or when its
/// aggression threshold allows and the mobile would attack it anyway.
#[must_use]
pub fn is_aggr_to(world: &World, config: &EngineConfig, ch: CharId, tch: CharId) -> bool {
    aggr_to(world, config, ch, tch, true)
}

fn aggr_to(world: &World, config: &EngineConfig, ch: CharId, tch: CharId, mirror: bool) -> bool {
    if ch == tch {
        return false;
    }
    let (Some(me), Some(them)) = (world.character(ch), world.character(tch)) else {
        return false;
    };
    if !me.is_awake() || me.is_helpless() {
        return false;
    }
    if !can_see(world, me, them) || them.pref_flagged(PrefFlags::NOHASSLE) || them.has(EffectFlag::Familiarity) {
        return false;
    }
    if world.is_grouped(ch, tch) || !attack_ok(world, config, ch, tch) {
        return false;
    }

    if me.is_npc {
        if me.mob_flagged(MobFlags::WIMPY)
            && them.is_awake()
            && !me.mob_flagged(MobFlags::PROTECTOR)
            && !me.mob_flagged(MobFlags::PEACEKEEPER)
        {
            return false;
        }
        if them.is_npc
            && me.mob_flagged(MobFlags::PEACEKEEPER)
            && (me.alignment - them.alignment).abs() > PEACEKEEPER_ALIGN_GAP
        {
            return true;
        }
        if me.mob_flagged(MobFlags::PROTECTOR) && them.is_npc && them.mob_flags.aggr_to_players() {
            return true;
        }
        if them.is_npc && !them.mob_flagged(MobFlags::PLAYER_PHANTASM) {
            return false;
        }
        let race_align = them.race.align();
        return me.mob_flagged(MobFlags::AGGRESSIVE)
            || (me.mob_flagged(MobFlags::AGGR_GOOD_RACE) && race_align == RaceAlign::Good)
            || (me.mob_flagged(MobFlags::AGGR_EVIL_RACE) && race_align == RaceAlign::Evil)
            || (me.mob_flagged(MobFlags::AGGR_EVIL) && them.is_evil())
            || (me.mob_flagged(MobFlags::AGGR_NEUTRAL) && them.is_neutral())
            || (me.mob_flagged(MobFlags::AGGR_GOOD) && them.is_good())
            || (me.mob_flagged(MobFlags::MEMORY) && me.memory.contains(&tch));
    }

    if them.is_npc && me.has(EffectFlag::Berserk) {
        return true;
    }
    if me.wimp_level >= me.hit || me.aggr_level <= 0 || me.aggr_level > me.hit {
        return false;
    }
    let defenceless = !them.is_awake() || them.is_helpless();
    if !me.pref_flagged(PrefFlags::VICIOUS) && defenceless {
        return false;
    }
    // Only ever mirrored onto a mobile, which never mirrors back.
    mirror && them.is_npc && aggr_to(world, config, tch, ch, false)
}

/// How hard `vict` looks to `ch`; lower is easier. Players don't appraise.
pub fn appraise_opponent<R: RandomSource + ?Sized>(world: &World, ch: CharId, vict: CharId, rng: &mut R) -> i32 {
    let (Some(me), Some(them)) = (world.character(ch), world.character(vict)) else {
        return UNREACHABLE;
    };
    if me.is_pc() {
        return -1;
    }
    let mut val = them.hit;
    if them.class.is_cleric() || them.class.is_magic_user() {
        val = val * 2 / 3;
    } else if them.class.is_warrior() {
        val *= 2;
    }
    if them.fighting.is_none() {
        val /= if me.class.is_rogue() { 4 } else { 2 };
    }
    if them.has(EffectFlag::Aware) && me.class.is_rogue() {
        val += val / 2;
    }
    if them.level < 60 {
        val /= rng.number(40 + them.level, 160 - them.level).max(1);
    }
    val
}

/// What a scan of the room turned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggrScan {
    /// Nobody to attack.
    Nothing,
    /// A glorious player ally caught the searcher's eye.
    Distracted(CharId),
    /// The sampled candidates with their appraised difficulty.
    Candidates(Vec<(CharId, i32)>),
}

impl Engine {
    /// Scan `ch`'s room for attack candidates.
    ///
    /// Samples at most `max(1, int * K / 100)` eligible targets with
    /// reservoir sampling. Any glorious player ally in the room distracts
    /// the searcher instead.
    pub fn scan_aggr_targets(&mut self, ch: CharId) -> AggrScan {
        let Some(me) = self.world.character(ch) else {
            return AggrScan::Nothing;
        };
        let Some(room) = me.room else {
            return AggrScan::Nothing;
        };
        if self.world.room(room).is_some_and(|r| r.flags.contains(RoomFlags::PEACEFUL)) {
            return AggrScan::Nothing;
        }
        if me.is_pc()
            && !me.has(EffectFlag::Berserk)
            && (me.wimp_level >= me.hit || me.aggr_level <= 0 || me.aggr_level > me.hit)
        {
            return AggrScan::Nothing;
        }
        if !me.is_awake() || me.is_helpless() {
            return AggrScan::Nothing;
        }
        let capacity = usize::try_from((me.intelligence() * self.config.targeting_k / 100).max(1)).unwrap_or(1);

        let mut sample: Vec<(CharId, i32)> = Vec::with_capacity(capacity);
        let mut seen = 0_i32;
        let mut glorion: Option<CharId> = None;
        let mut glorions = 0;
        for tch in self.world.people_in(room) {
            if tch == ch {
                continue;
            }
            let (Some(me), Some(them)) = (self.world.character(ch), self.world.character(tch)) else {
                continue;
            };
            if !can_see(&self.world, me, them) {
                continue;
            }
            if them.has(EffectFlag::Glory) && player_ally(&self.world, them) {
                glorions += 1;
                if self.rng.number(1, glorions) == 1 {
                    glorion = Some(tch);
                }
            } else if is_aggr_to(&self.world, &self.config, ch, tch) {
                let slot = if sample.len() < capacity {
                    Some(sample.len())
                } else {
                    usize::try_from(self.rng.number(0, seen)).ok().filter(|j| *j < capacity)
                };
                if let Some(slot) = slot {
                    let difficulty = appraise_opponent(&self.world, ch, tch, &mut self.rng);
                    if slot == sample.len() {
                        sample.push((tch, difficulty));
                    } else {
                        sample[slot] = (tch, difficulty);
                    }
                }
                seen += 1;
            }
        }

        if let Some(glorion) = glorion {
            return AggrScan::Distracted(glorion);
        }
        debug!(searcher = ch.raw(), eligible = seen, sampled = sample.len(), "aggression scan");
        if sample.is_empty() {
            AggrScan::Nothing
        } else {
            AggrScan::Candidates(sample)
        }
    }

    /// Pick a victim for `ch` in its room, or `None`.
    ///
    /// Players and player phantasms pick at random from the sample; mobiles
    /// take the easiest-looking candidate.
    pub fn find_aggr_target(&mut self, ch: CharId) -> Option<CharId> {
        let sample = match self.scan_aggr_targets(ch) {
            AggrScan::Nothing => return None,
            AggrScan::Distracted(glorion) => {
                self.glory_distraction(ch, glorion);
                return None;
            }
            AggrScan::Candidates(sample) => sample,
        };
        let picks_randomly = self
            .world
            .character(ch)
            .is_some_and(|me| me.is_pc() || me.mob_flagged(MobFlags::PLAYER_PHANTASM));
        if picks_randomly {
            let last = i32::try_from(sample.len()).unwrap_or(1) - 1;
            let pick = usize::try_from(self.rng.number(0, last)).unwrap_or(0);
            return sample.get(pick).map(|(t, _)| *t);
        }
        sample
            .iter()
            .fold(None, |best: Option<(CharId, i32)>, &(t, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((t, d)),
            })
            .map(|(t, _)| t)
    }

    fn glory_distraction(&mut self, ch: CharId, glorion: CharId) {
        let Some(me) = self.world.character(ch) else {
            return;
        };
        let steadfast = me.mob_flagged(MobFlags::PEACEKEEPER)
            || me.mob_flagged(MobFlags::HELPER)
            || me.mob_flagged(MobFlags::PEACEFUL)
            || me.mob_flagged(MobFlags::PROTECTOR);
        let shielded = self
            .world
            .character(glorion)
            .is_some_and(|g| g.pref_flagged(PrefFlags::NOHASSLE));

        if self.rng.number(1, 100) < 3 && !shielded && !steadfast {
            self.act("$n forgets $s appreciation of $N's glorious appearance, and attacks!", Some(ch), Some(glorion), Audience::Bystanders);
            self.act("The look of awe in $N's eyes falters, and $E attacks!", Some(ch), Some(glorion), Audience::Target);
            self.act("You see right through $N's magical disguise!", Some(ch), Some(glorion), Audience::Actor);
            self.schedule(Some(ch), GameEvent::QuickAggro { target: glorion }, 0);
        } else if self.rng.number(1, 8) == 1 {
            self.act("$n looks upon $N with awe in $s eyes.", Some(ch), Some(glorion), Audience::Bystanders);
            self.act("$n gazes at you in wonder.", Some(ch), Some(glorion), Audience::Target);
            self.act("You are distracted by $N's unearthly beauty.", Some(ch), Some(glorion), Audience::Actor);
        }
    }

    /// Open a fight chosen by the aggression engine, if it still makes sense.
    pub(crate) fn quick_aggro(&mut self, ch: CharId, target: CharId) {
        let (Some(me), Some(them)) = (self.world.character(ch), self.world.character(target)) else {
            return;
        };
        if me.is_dead() || them.is_dead() || me.room != them.room || me.fighting.is_some() || !me.is_awake() {
            return;
        }
        if !attack_ok(&self.world, &self.config, ch, target) {
            return;
        }
        self.act("$n attacks $N!", Some(ch), Some(target), Audience::Bystanders);
        self.act("$n attacks you!", Some(ch), Some(target), Audience::Target);
        self.set_fighting(ch, target);
        if self.world.character(target).is_some_and(|t| t.fighting.is_none() && t.is_awake()) {
            self.set_fighting(target, ch);
        }
    }
}
