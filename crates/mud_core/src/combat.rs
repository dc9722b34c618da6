//! Attack permission and fight relations.
//!
//! The permission checks are free functions over a read-only [`World`] so
//! the aggression engine and area routines can call them while scanning a
//! room. Anything that starts or stops a fight goes through the engine.

use tracing::debug;

use crate::character::{Character, Skill};
use crate::components::{CharId, Position, Stance};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::flags::{EffectFlag, MobFlags, PrefFlags, RoomEffectFlags, RoomFlags};
use crate::messaging::Audience;
use crate::rng::RandomSource;
use crate::world::World;

fn room_flagged(world: &World, ch: &Character, flag: RoomFlags) -> bool {
    ch.room
        .and_then(|r| world.room(r))
        .is_some_and(|r| r.flags.contains(flag))
}

/// Whether `ch` may attack `victim` at all.
///
/// Charmed creatures are judged by their masters for player-killing
/// purposes, so a pet cannot be used to attack a player.
#[must_use]
pub fn attack_ok(world: &World, config: &EngineConfig, ch: CharId, victim: CharId) -> bool {
    let (Some(attacker), Some(target)) = (world.character(ch), world.character(victim)) else {
        return false;
    };
    if attacker.is_helpless() {
        return false;
    }
    if ch != victim
        && (room_flagged(world, attacker, RoomFlags::PEACEFUL)
            || room_flagged(world, target, RoomFlags::PEACEFUL))
    {
        return false;
    }
    if target.mob_flagged(MobFlags::PEACEFUL) || target.is_dead() {
        return false;
    }
    if config.pk_allowed {
        return true;
    }
    if room_flagged(world, attacker, RoomFlags::ARENA) && room_flagged(world, target, RoomFlags::ARENA) {
        return true;
    }

    let controller = |c: &Character| -> CharId {
        if c.has(EffectFlag::Charm) {
            c.master.unwrap_or(c.id)
        } else {
            c.id
        }
    };
    let (ch, victim) = (controller(attacker), controller(target));
    if ch == victim {
        return true;
    }
    match (world.character(ch), world.character(victim)) {
        (Some(a), Some(v)) => !(a.is_pc() && v.is_pc()),
        _ => true,
    }
}

/// Whether a creature counts as being on the players' side.
#[must_use]
pub fn player_ally(world: &World, ch: &Character) -> bool {
    if ch.is_pc() || ch.mob_flagged(MobFlags::PLAYER_PHANTASM) {
        return true;
    }
    ch.has(EffectFlag::Charm)
        && ch
            .master
            .and_then(|m| world.character(m))
            .is_some_and(Character::is_pc)
}

/// [`attack_ok`] for attacks that hit many targets: players never hit
/// player allies outside an arena.
#[must_use]
pub fn mass_attack_ok(world: &World, config: &EngineConfig, ch: CharId, victim: CharId) -> bool {
    if !attack_ok(world, config, ch, victim) {
        return false;
    }
    let (Some(attacker), Some(target)) = (world.character(ch), world.character(victim)) else {
        return false;
    };
    if attacker.is_pc()
        && player_ally(world, target)
        && !room_flagged(world, target, RoomFlags::ARENA)
    {
        return false;
    }
    true
}

/// Whether `tch` is already in a fight with `ch` or `ch`'s group.
#[must_use]
pub fn battling_my_group(world: &World, ch: CharId, tch: CharId) -> bool {
    let (Some(me), Some(them)) = (world.character(ch), world.character(tch)) else {
        return false;
    };
    if let Some(target) = them.fighting {
        if target == ch || world.is_grouped(target, ch) {
            return true;
        }
    }
    if let Some(target) = me.fighting {
        if target == tch || world.is_grouped(target, tch) {
            return true;
        }
    }
    let Some(room) = me.room else {
        return false;
    };
    for i in world.people_in(room) {
        let Some(fighting) = world.character(i).and_then(|c| c.fighting) else {
            continue;
        };
        if world.is_grouped(i, ch) {
            if fighting == tch || world.is_grouped(fighting, tch) {
                return true;
            }
        } else if world.is_grouped(i, tch) && (fighting == ch || world.is_grouped(fighting, ch)) {
            return true;
        }
    }
    false
}

/// Whether an area attack by `ch` includes `tch`.
#[must_use]
pub fn area_attack_target(world: &World, config: &EngineConfig, ch: CharId, tch: CharId) -> bool {
    if ch == tch || world.is_grouped(ch, tch) {
        return false;
    }
    let (Some(me), Some(them)) = (world.character(ch), world.character(tch)) else {
        return false;
    };
    if them.master == Some(ch) || me.master == Some(tch) {
        return false;
    }
    if !config.room_effects_allowed && me.is_pc() && them.is_pc() {
        return false;
    }
    if !mass_attack_ok(world, config, ch, tch) {
        return false;
    }
    if !battling_my_group(world, ch, tch) {
        if !player_ally(world, me) && !player_ally(world, them) {
            return false;
        }
        if them.pref_flagged(PrefFlags::NOHASSLE) {
            return false;
        }
    }
    true
}

/// Whether `ch` can see `target`.
#[must_use]
pub fn can_see(world: &World, ch: &Character, target: &Character) -> bool {
    if ch.id == target.id || ch.pref_flagged(PrefFlags::HOLYLIGHT) {
        return true;
    }
    if ch.has(EffectFlag::Blind) {
        return false;
    }
    if target.has(EffectFlag::Invisible) && !ch.has(EffectFlag::DetectInvis) {
        return false;
    }
    let dark = ch.room.and_then(|r| world.room(r)).is_some_and(|r| {
        (r.flags.contains(RoomFlags::DARK) || r.effect_flags().contains(RoomEffectFlags::DARKNESS))
            && !r.effect_flags().contains(RoomEffectFlags::ILLUMINATION)
    });
    if dark && !ch.has(EffectFlag::Infravision) && !ch.has(EffectFlag::Ultravision) {
        return false;
    }
    true
}

impl Engine {
    /// Make `ch` fight `victim`.
    pub fn set_fighting(&mut self, ch: CharId, victim: CharId) {
        if ch == victim || !self.is_alive(victim) {
            return;
        }
        if let Some(c) = self.world.character_mut(ch) {
            if c.fighting.is_some() || c.is_dead() {
                return;
            }
            c.fighting = Some(victim);
            if c.stance == Stance::Alert {
                c.stance = Stance::Fighting;
            }
        }
        debug!(attacker = ch.raw(), victim = victim.raw(), "fight started");
    }

    /// End `ch`'s fight.
    pub fn stop_fighting(&mut self, ch: CharId) {
        if let Some(c) = self.world.character_mut(ch) {
            c.fighting = None;
            if c.stance == Stance::Fighting {
                c.stance = Stance::Alert;
            }
        }
    }

    /// End every fight aimed at `ch`.
    pub fn stop_attackers(&mut self, ch: CharId) {
        let attackers: Vec<CharId> = self
            .world
            .characters()
            .filter(|c| c.fighting == Some(ch))
            .map(|c| c.id)
            .collect();
        for a in attackers {
            self.stop_fighting(a);
        }
    }

    /// Let a guard step in front of an attack on `victim`. Returns whoever
    /// takes the hit.
    pub fn check_guard(&mut self, ch: CharId, victim: CharId) -> CharId {
        let Some(guard) = self.world.character(victim).and_then(|v| v.guarded_by) else {
            return victim;
        };
        let able = match (
            self.world.character(guard),
            self.world.character(victim),
        ) {
            (Some(g), Some(v)) => {
                g.room == v.room
                    && can_see(&self.world, g, v)
                    && g.skill(Skill::Guard) > 0
                    && g.wait <= 0
                    && g.position == Position::Standing
                    && g.is_awake()
                    && !g.is_helpless()
            }
            _ => false,
        };
        if !able || !attack_ok(&self.world, &self.config, ch, guard) {
            return victim;
        }

        let skill = self.world.character(guard).map_or(0, |g| g.skill(Skill::Guard));
        if skill > self.rng.number(1, 1100) {
            self.act("$n jumps in front of $N, shielding $M from the assault.", Some(guard), Some(victim), Audience::Bystanders);
            self.act("You jump in front of $N, shielding $M from the assault.", Some(guard), Some(victim), Audience::Actor);
            self.act("$n jumps in front of you, shielding you from the assault.", Some(guard), Some(victim), Audience::Target);
            guard
        } else {
            self.act("$n tries to shield $N, but is too slow.", Some(guard), Some(victim), Audience::Bystanders);
            self.act("You try to shield $N, but are too slow.", Some(guard), Some(victim), Audience::Actor);
            victim
        }
    }
}
