//! The engine: world state, the event scheduler, and the pulse loop.
//!
//! An [`Engine`] owns everything that changes during play. Player commands
//! and AI decisions enter through methods such as [`Engine::cast`]; time
//! enters only through [`Engine::pulse`].
//!
//! # Pulse order
//!
//! Each pulse:
//! 1. **Events** - every event due on this pulse fires, in scheduling order
//! 2. **Effect sweep** - on in-game hour boundaries, effects age and expire
//!
//! # Determinism
//!
//! The engine holds the only random stream, world iteration follows handle
//! order, and the scheduler is FIFO within a pulse. The same seed, catalog,
//! and sequence of calls always produce the same [`Engine::state_hash`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::character::{Character, CharacterSpawn};
use crate::components::{CharId, RoomId, SpellId, Stance};
use crate::composition::Composition;
use crate::config::EngineConfig;
use crate::data::SpellCatalog;
use crate::effects::Effect;
use crate::error::{GameError, Result};
use crate::flags::{EffectFlag, MobFlags};
use crate::magic::{DelayedCast, HandlerRegistry};
use crate::messaging::{render, Audience, Message, MessageSink};
use crate::object::{CorpseData, ObjKind, ObjLocation, ObjectSpawn};
use crate::rng::GameRng;
use crate::scheduler::{EventHandle, EventOutcome, Fired, Scheduler};
use crate::world::World;

/// A scheduled continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Next round of a multi-round spell.
    DelayedCast(DelayedCast),
    /// One point of hit point regeneration or dying decay.
    RegenHit,
    /// One point of movement regeneration.
    RegenMove,
    /// One spell slot restored.
    RegenMana,
    /// Rage decay, growth, or forced berserk.
    Rage,
    /// Countdown of every running cooldown slot.
    Cooldowns,
    /// Attack a target chosen by the aggression engine.
    QuickAggro {
        /// Chosen victim.
        target: CharId,
    },
    /// Stop a frozen character's fight and hold it in place.
    BattleParalysis,
}

/// Result of applying damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Hit points actually removed.
    pub dealt: i32,
    /// Whether the victim died.
    pub killed: bool,
}

/// What happened during one pulse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PulseReport {
    /// Pulse number after advancing.
    pub pulse: u64,
    /// Events fired.
    pub events_fired: usize,
    /// Effect sweep results, on hour boundaries.
    pub sweep: Option<SweepReport>,
    /// Characters that died.
    pub deaths: Vec<CharId>,
}

/// What one effect sweep did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Character effect records removed.
    pub expired: usize,
    /// Wear-off messages delivered.
    pub wear_offs: usize,
    /// Room effects removed.
    pub room_effects_expired: usize,
    /// Creatures destroyed because their animation ended.
    pub destroyed: Vec<CharId>,
}

#[derive(Serialize)]
struct StateRef<'a> {
    world: &'a World,
    scheduler: &'a Scheduler<GameEvent>,
    rng: &'a GameRng,
    pulse: u64,
}

#[derive(Deserialize)]
struct StateOwned {
    world: World,
    scheduler: Scheduler<GameEvent>,
    rng: GameRng,
    pulse: u64,
}

/// The effect and magic resolution engine.
pub struct Engine {
    pub(crate) world: World,
    pub(crate) catalog: Arc<SpellCatalog>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) scheduler: Scheduler<GameEvent>,
    pub(crate) rng: GameRng,
    pub(crate) config: EngineConfig,
    sink: Box<dyn MessageSink>,
    pulse: u64,
    deaths: Vec<CharId>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pulse", &self.pulse)
            .field("characters", &self.world.character_count())
            .field("objects", &self.world.object_count())
            .field("pending_events", &self.scheduler.len())
            .field("spells", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with the standard handler set for `catalog`.
    #[must_use]
    pub fn new(config: EngineConfig, catalog: Arc<SpellCatalog>, sink: Box<dyn MessageSink>) -> Self {
        let handlers = HandlerRegistry::standard(&catalog);
        Self::with_handlers(config, catalog, handlers, sink)
    }

    /// Create an engine with a custom handler registry.
    #[must_use]
    pub fn with_handlers(
        config: EngineConfig,
        catalog: Arc<SpellCatalog>,
        handlers: HandlerRegistry,
        sink: Box<dyn MessageSink>,
    ) -> Self {
        let rng = GameRng::seeded(config.seed);
        Self {
            world: World::new(),
            catalog,
            handlers,
            scheduler: Scheduler::new(),
            rng,
            config,
            sink,
            pulse: 0,
            deaths: Vec::new(),
        }
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The world, for setup and external collaborators.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The spell catalog.
    #[must_use]
    pub fn catalog(&self) -> &SpellCatalog {
        &self.catalog
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pending events.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<GameEvent> {
        &self.scheduler
    }

    /// The engine's random stream.
    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// Pulses elapsed.
    #[must_use]
    pub const fn pulse_count(&self) -> u64 {
        self.pulse
    }

    /// Spawn a character into a room.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] for an unknown room.
    pub fn spawn_character(&mut self, spawn: CharacterSpawn, room: RoomId) -> Result<CharId> {
        self.world.spawn_character(spawn, room)
    }

    /// Whether a handle resolves to a character that is not dead.
    #[must_use]
    pub fn is_alive(&self, id: CharId) -> bool {
        self.world.character(id).is_some_and(|c| !c.is_dead())
    }

    // ----- time -----

    /// Advance one pulse.
    pub fn pulse(&mut self) -> PulseReport {
        self.pulse += 1;
        let span = tracing::trace_span!("pulse", n = self.pulse);
        let _guard = span.enter();

        let mut report = PulseReport {
            pulse: self.pulse,
            ..PulseReport::default()
        };
        while let Some(fired) = self.scheduler.pop_due(self.pulse) {
            report.events_fired += 1;
            self.fire(fired);
        }
        if self.pulse % self.config.pulses_per_hour() == 0 {
            report.sweep = Some(self.effect_sweep());
        }
        report.deaths = std::mem::take(&mut self.deaths);
        report
    }

    /// Advance several pulses, returning every death along the way.
    pub fn advance(&mut self, pulses: u64) -> Vec<CharId> {
        let mut deaths = Vec::new();
        for _ in 0..pulses {
            deaths.extend(self.pulse().deaths);
        }
        deaths
    }

    /// Queue an event.
    pub(crate) fn schedule(&mut self, owner: Option<CharId>, event: GameEvent, delay: u64) -> EventHandle {
        self.scheduler.schedule(owner, event, delay)
    }

    fn fire(&mut self, fired: Fired<GameEvent>) {
        let Fired {
            handle,
            owner,
            payload,
            ..
        } = fired;
        trace!(handle = handle.raw(), ?owner, "event fired");

        match payload {
            GameEvent::DelayedCast(mut cast) => {
                if let EventOutcome::Reschedule(delay) = self.delayed_round(&mut cast) {
                    if delay > 0 {
                        self.scheduler
                            .rearm(handle, owner, GameEvent::DelayedCast(cast), delay);
                    }
                }
            }
            GameEvent::QuickAggro { target } => {
                if let Some(ch) = owner {
                    self.quick_aggro(ch, target);
                }
            }
            GameEvent::BattleParalysis => {
                if let Some(ch) = owner {
                    self.battle_paralysis(ch);
                }
            }
            recurring => {
                let Some(ch) = owner else {
                    return;
                };
                let outcome = match recurring {
                    GameEvent::RegenHit => self.hp_regen(ch),
                    GameEvent::RegenMove => self.move_regen(ch),
                    GameEvent::RegenMana => self.mana_regen(ch),
                    GameEvent::Rage => self.rage_tick(ch),
                    _ => self.cooldown_tick(ch),
                };
                match outcome {
                    EventOutcome::Reschedule(delay) if delay > 0 => {
                        self.scheduler.rearm(handle, owner, recurring, delay);
                    }
                    _ => self.release_event(ch, &recurring),
                }
            }
        }
    }

    fn release_event(&mut self, ch: CharId, event: &GameEvent) {
        let Some(c) = self.world.character_mut(ch) else {
            return;
        };
        match event {
            GameEvent::RegenHit => c.events.hit = None,
            GameEvent::RegenMove => c.events.moves = None,
            GameEvent::RegenMana => c.events.mana = None,
            GameEvent::Rage => c.events.rage = None,
            GameEvent::Cooldowns => c.events.cooldowns = None,
            _ => {}
        }
    }

    fn battle_paralysis(&mut self, ch: CharId) {
        if !self.is_alive(ch) {
            return;
        }
        self.stop_fighting(ch);
        self.stop_attackers(ch);
        let frozen = Effect::new(SpellId::FROZEN, 2).with_flag(EffectFlag::MinorParalysis);
        if let Err(e) = self.world.apply_effect(ch, frozen, crate::effects::JoinMode::REFRESH) {
            tracing::warn!(error = %e, "could not apply freeze");
        }
    }

    // ----- effect sweep -----

    /// Age every effect by one tick.
    ///
    /// Expired records are removed; a spell's wear-off message is sent once,
    /// when its last record goes. Room effects expire the same way. Then the
    /// domain rules run: animated creatures that lost their animation are
    /// destroyed and expired charms release their followers.
    pub fn effect_sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();

        for id in self.world.character_ids() {
            let Some(effects) = self.world.char_effects_mut(id) else {
                continue;
            };
            let expired = effects.sweep();
            if expired.is_empty() {
                continue;
            }
            report.expired += expired.len();

            let mut spells: Vec<SpellId> = Vec::new();
            for e in &expired {
                if !spells.contains(&e.spell) {
                    spells.push(e.spell);
                }
            }
            for spell in spells {
                if self.world.character(id).is_some_and(|c| !c.affected_by(spell))
                    && self.wear_off(id, spell)
                {
                    report.wear_offs += 1;
                }
            }

            let lost_charm = expired.iter().any(|e| e.flags.contains(EffectFlag::Charm));
            if lost_charm && self.world.character(id).is_some_and(|c| !c.has(EffectFlag::Charm)) {
                self.release_charm(id);
            }
        }

        for id in self.world.object_ids() {
            if let Some(effects) = self.world.obj_effects_mut(id) {
                effects.sweep();
            }
        }

        for expired in self.world.sweep_room_effects() {
            report.room_effects_expired += 1;
            let message = self
                .catalog
                .get(expired.spell)
                .and_then(|s| s.room_effect.as_ref())
                .and_then(|r| r.wear_off.clone());
            if let Some(text) = message {
                self.act_in_room(expired.room, &text);
            }
        }

        for id in self.world.character_ids() {
            let Some(ch) = self.world.character(id) else {
                continue;
            };
            if ch.has(EffectFlag::Animated) {
                continue;
            }
            if ch.mob_flagged(MobFlags::ANIMATED) {
                self.act("$n stops moving and collapses.", Some(id), None, Audience::Room);
                self.die(id, None);
                report.destroyed.push(id);
            } else if ch.mob_flagged(MobFlags::ILLUSORY) {
                self.act("$n dissolves into nothingness.", Some(id), None, Audience::Room);
                self.extract_character(id);
                report.destroyed.push(id);
            }
        }

        debug!(
            expired = report.expired,
            wear_offs = report.wear_offs,
            destroyed = report.destroyed.len(),
            "effect sweep"
        );
        report
    }

    /// Send a spell's wear-off message. Returns whether one was delivered.
    pub(crate) fn wear_off(&mut self, ch: CharId, spell: SpellId) -> bool {
        let Some(c) = self.world.character(ch) else {
            return false;
        };
        if !c.is_awake() || (c.is_pc() && !c.connected) {
            return false;
        }
        let text = match reserved_wear_off(spell) {
            Some(text) => Some(text.to_string()),
            None => self.catalog.get(spell).and_then(|s| s.wear_off.clone()),
        };
        match text {
            Some(text) => {
                self.act(&text, Some(ch), None, Audience::Actor);
                true
            }
            None => false,
        }
    }

    /// Strip every record of `spell` from a character and announce the
    /// wear-off if anything was removed.
    pub fn remove_effect(&mut self, ch: CharId, spell: SpellId) -> Vec<Effect> {
        let removed = self
            .world
            .char_effects_mut(ch)
            .map(|effects| effects.remove_spell(spell))
            .unwrap_or_default();
        if !removed.is_empty() {
            self.wear_off(ch, spell);
        }
        removed
    }

    pub(crate) fn release_charm(&mut self, id: CharId) {
        let Some(master) = self.world.character(id).and_then(|c| c.master) else {
            return;
        };
        if self.world.stop_following(id).is_ok() {
            self.act("$n stops following $N.", Some(id), Some(master), Audience::Room);
            if self.world.character(id).is_some_and(|c| c.fighting == Some(master)) {
                self.stop_fighting(id);
            }
        }
    }

    /// Change a character's body composition, stripping spells the new body
    /// cannot hold.
    pub fn set_composition(&mut self, ch: CharId, composition: Composition) {
        let Some(c) = self.world.character_mut(ch) else {
            return;
        };
        c.composition = composition;
        self.remove_unsuitable_spells(ch);
    }

    // ----- damage and death -----

    /// Remove hit points from `victim`, starting fights and handling death.
    pub fn damage(&mut self, attacker: Option<CharId>, victim: CharId, dam: i32) -> DamageOutcome {
        let Some(v) = self.world.character(victim) else {
            return DamageOutcome::default();
        };
        if v.is_dead() {
            return DamageOutcome::default();
        }

        let mut dam = dam.max(0);
        if v.is_immortal() {
            dam = 0;
        } else if v.has(EffectFlag::Sanctuary) {
            dam /= 2;
        }

        if let Some(a) = attacker.filter(|a| *a != victim) {
            let same_room = self.world.character(a).and_then(|c| c.room) == v.room;
            if same_room && self.is_alive(a) {
                if v.fighting.is_none() && v.is_awake() {
                    self.set_fighting(victim, a);
                }
                if self.world.character(a).is_some_and(|c| c.fighting.is_none()) {
                    self.set_fighting(a, victim);
                }
            }
        }

        self.hurt_char(victim, attacker, dam, true);

        let Some(v) = self.world.character(victim) else {
            return DamageOutcome {
                dealt: dam,
                killed: true,
            };
        };
        if v.hit <= crate::components::HIT_DEAD {
            self.die(victim, attacker);
            return DamageOutcome {
                dealt: dam,
                killed: true,
            };
        }
        match v.stance {
            Stance::Incapacitated => {
                self.act("$n is mortally wounded, and will die soon, if not aided.", Some(victim), None, Audience::Room);
            }
            Stance::Stunned => {
                self.act("$n is stunned, but will probably regain consciousness again.", Some(victim), None, Audience::Room);
            }
            _ => {}
        }
        DamageOutcome {
            dealt: dam,
            killed: false,
        }
    }

    /// Kill a character: leave a corpse and remove it from the world.
    pub fn die(&mut self, victim: CharId, killer: Option<CharId>) {
        let Some(v) = self.world.character(victim) else {
            return;
        };
        let room = v.room;
        let illusory = v.mob_flagged(MobFlags::ILLUSORY);
        let corpse = CorpseData {
            name: v.name.clone(),
            level: v.level,
            class: v.class,
            max_hit: v.max_hit(),
            player: v.is_pc(),
            raisable: !v.mob_flagged(MobFlags::ANIMATED),
        };
        info!(victim = victim.raw(), killer = ?killer.map(CharId::raw), "character died");

        if let Some(c) = self.world.character_mut(victim) {
            c.stance = Stance::Dead;
            c.fighting = None;
        }
        self.act("$n is dead!  R.I.P.", Some(victim), None, Audience::Room);

        if let (Some(room), false) = (room, illusory) {
            let spawn = ObjectSpawn {
                name: format!("the corpse of {}", corpse.name),
                level: corpse.level,
                weight: 100,
                timer: if corpse.player { 20 } else { 5 },
                kind: ObjKind::Corpse(corpse),
                ..ObjectSpawn::default()
            };
            if let Err(e) = self.world.spawn_object(spawn, ObjLocation::Room(room)) {
                tracing::warn!(error = %e, "corpse not created");
            }
        }
        self.extract_character(victim);
        self.deaths.push(victim);
    }

    /// Remove a character and every event it owns.
    pub fn extract_character(&mut self, id: CharId) -> Option<Character> {
        let cancelled = self.scheduler.cancel_owned_by(id);
        let removed = self.world.remove_character(id);
        if removed.is_some() {
            debug!(character = id.raw(), cancelled, "character extracted");
        }
        removed
    }

    // ----- messaging -----

    /// Render and deliver an `act`-style message.
    ///
    /// The room is the actor's, or the target's when there is no actor.
    pub fn act(&mut self, template: &str, actor: Option<CharId>, target: Option<CharId>, audience: Audience) {
        let actor_ch = actor.and_then(|a| self.world.character(a));
        let target_ch = target.and_then(|t| self.world.character(t));
        let room = actor_ch.and_then(|c| c.room).or_else(|| target_ch.and_then(|c| c.room));
        let text = render(
            template,
            actor_ch.map(|c| c.name.as_str()),
            target_ch.map(|c| c.name.as_str()),
        );
        self.sink.deliver(Message {
            pulse: self.pulse,
            room,
            actor,
            target,
            audience,
            text,
        });
    }

    /// Deliver a message to everyone in a room.
    pub fn act_in_room(&mut self, room: RoomId, text: &str) {
        self.sink.deliver(Message {
            pulse: self.pulse,
            room: Some(room),
            actor: None,
            target: None,
            audience: Audience::Room,
            text: text.to_string(),
        });
    }

    /// Send the same template to the actor alone.
    pub(crate) fn send(&mut self, ch: CharId, template: &str) {
        self.act(template, Some(ch), None, Audience::Actor);
    }

    // ----- snapshots -----

    /// Serialize world, scheduler, random stream, and clock.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let state = StateRef {
            world: &self.world,
            scheduler: &self.scheduler,
            rng: &self.rng,
            pulse: self.pulse,
        };
        bincode::serialize(&state)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize engine: {e}")))
    }

    /// Replace the current state with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the bytes do not decode; the
    /// engine is left untouched.
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let state: StateOwned = bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize engine: {e}")))?;
        self.world = state.world;
        self.scheduler = state.scheduler;
        self.rng = state.rng;
        self.pulse = state.pulse;
        self.deaths.clear();
        Ok(())
    }

    /// Hash of the full serialized state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.pulse.hash(&mut hasher);
        match self.snapshot() {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => tracing::warn!(error = %e, "state hash without snapshot"),
        }
        hasher.finish()
    }
}

/// Wear-off text for engine-owned effects.
const fn reserved_wear_off(spell: SpellId) -> Option<&'static str> {
    match spell.0 {
        1 => Some("The flames around you die out."),
        2 => Some("You can move again."),
        3 => Some("Your rage subsides."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ApplyLocation, Sector};
    use crate::effects::JoinMode;
    use crate::flags::RoomFlags;
    use crate::messaging::{NullSink, RecordingSink};

    fn engine() -> (Engine, RoomId) {
        let mut engine = Engine::new(
            EngineConfig::default(),
            Arc::new(SpellCatalog::default()),
            Box::new(NullSink),
        );
        let room = engine.world_mut().add_room("Arena", Sector::City, RoomFlags::empty());
        (engine, room)
    }

    #[test]
    fn test_sweep_happens_on_hour_boundary() {
        let (mut engine, room) = engine();
        let ch = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        engine
            .world_mut()
            .apply_effect(ch, Effect::new(SpellId(20), 1).with_flag(EffectFlag::Haste), JoinMode::ADD_ONLY)
            .unwrap();

        let hour = engine.config().pulses_per_hour();
        for _ in 1..hour {
            assert!(engine.pulse().sweep.is_none());
        }
        assert!(engine.world().character(ch).unwrap().has(EffectFlag::Haste));
        let report = engine.pulse();
        assert_eq!(report.sweep.unwrap().expired, 1);
        assert!(!engine.world().character(ch).unwrap().has(EffectFlag::Haste));
    }

    #[test]
    fn test_damage_kills_and_leaves_corpse() {
        let (mut engine, room) = engine();
        let a = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        let b = engine.spawn_character(CharacterSpawn::default(), room).unwrap();

        let outcome = engine.damage(Some(a), b, 50);
        assert!(!outcome.killed);
        assert_eq!(engine.world().character(b).unwrap().hit, 50);
        assert_eq!(engine.world().character(b).unwrap().fighting, Some(a));
        assert_eq!(engine.world().character(a).unwrap().fighting, Some(b));

        let outcome = engine.damage(Some(a), b, 500);
        assert!(outcome.killed);
        assert!(!engine.world().contains_character(b));
        assert!(engine.world().character(a).unwrap().fighting.is_none());
        let floor = engine.world().objects_in(room);
        assert_eq!(floor.len(), 1);
        assert!(engine.world().object(floor[0]).unwrap().is_corpse());
    }

    #[test]
    fn test_immortal_takes_no_damage() {
        let (mut engine, room) = engine();
        let god = engine
            .spawn_character(
                CharacterSpawn {
                    is_npc: false,
                    level: 105,
                    ..CharacterSpawn::default()
                },
                room,
            )
            .unwrap();
        assert_eq!(engine.damage(None, god, 1000).dealt, 0);
        assert_eq!(engine.world().character(god).unwrap().hit, 100);
    }

    #[test]
    fn test_extract_cancels_owned_events() {
        let (mut engine, room) = engine();
        let ch = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        engine.damage(None, ch, 10);
        assert!(engine.world().character(ch).unwrap().events().hit.is_some());
        assert!(!engine.scheduler().is_empty());
        engine.extract_character(ch);
        assert!(engine.scheduler().is_empty());
    }

    #[test]
    fn test_wear_off_skips_sleepers() {
        let (sink, log) = RecordingSink::new();
        let mut engine = Engine::new(
            EngineConfig::default(),
            Arc::new(SpellCatalog::default()),
            Box::new(sink),
        );
        let room = engine.world_mut().add_room("Inn", Sector::City, RoomFlags::empty());
        let ch = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        engine
            .world_mut()
            .apply_effect(
                ch,
                Effect::new(SpellId::IGNITION, 1).with_flag(EffectFlag::OnFire),
                JoinMode::ADD_ONLY,
            )
            .unwrap();
        engine.world_mut().character_mut(ch).unwrap().stance = Stance::Sleeping;
        engine.effect_sweep();
        assert_eq!(log.count_containing("flames"), 0);
        assert!(!engine.world().character(ch).unwrap().has(EffectFlag::OnFire));
    }

    #[test]
    fn test_remove_effect_announces_once() {
        let (sink, log) = RecordingSink::new();
        let mut engine = Engine::new(
            EngineConfig::default(),
            Arc::new(SpellCatalog::default()),
            Box::new(sink),
        );
        let room = engine.world_mut().add_room("Forge", Sector::City, RoomFlags::empty());
        let ch = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        for (duration, location) in [(3, ApplyLocation::Hitroll), (Effect::PERMANENT, ApplyLocation::Damroll)] {
            engine
                .world_mut()
                .apply_effect(
                    ch,
                    Effect::new(SpellId::IGNITION, duration)
                        .with_modifier(location, -1)
                        .with_flag(EffectFlag::OnFire),
                    JoinMode::ADD_ONLY,
                )
                .unwrap();
        }

        assert_eq!(engine.remove_effect(ch, SpellId::IGNITION).len(), 2);
        assert!(!engine.world().character(ch).unwrap().has(EffectFlag::OnFire));
        assert_eq!(log.count_containing("flames around you die out"), 1);
        assert!(engine.remove_effect(ch, SpellId::IGNITION).is_empty());
        assert_eq!(log.count_containing("flames around you die out"), 1);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let (mut engine, room) = engine();
        let ch = engine.spawn_character(CharacterSpawn::default(), room).unwrap();
        engine.damage(None, ch, 30);
        engine.advance(5);
        let bytes = engine.snapshot().unwrap();
        let hash = engine.state_hash();

        engine.advance(100);
        assert_ne!(engine.state_hash(), hash);
        engine.restore(&bytes).unwrap();
        assert_eq!(engine.state_hash(), hash);
        assert!(engine.restore(&[1, 2, 3]).is_err());
    }
}
