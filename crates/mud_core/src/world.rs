//! The world: arenas of characters, objects and rooms.
//!
//! Entities reference each other by handle. Handles are never reused, so a
//! handle held across a destructive call simply stops resolving.
//!
//! # Determinism
//!
//! Arenas are ordered maps, so iteration and serialization follow handle
//! order. Room occupancy lists keep insertion order. Every scan that may
//! kill or extract works on a snapshot returned by [`World::people_in`] or
//! [`World::objects_in`] and re-resolves each handle before use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::character::{Character, CharacterSpawn};
use crate::components::{CharId, ObjId, RoomId, Sector, SpellId};
use crate::effects::{Effect, EffectList, JoinMode, JoinOutcome};
use crate::error::{GameError, Result};
use crate::flags::{RoomEffectFlags, RoomFlags};
use crate::object::{ObjLocation, Object, ObjectSpawn};

/// A room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Handle.
    pub id: RoomId,
    /// Name.
    pub name: String,
    /// Terrain.
    pub sector: Sector,
    /// Static flags.
    pub flags: RoomFlags,
    effect_flags: RoomEffectFlags,
    people: Vec<CharId>,
    contents: Vec<ObjId>,
}

impl Room {
    /// Conditions maintained by active room effects.
    #[must_use]
    pub fn effect_flags(&self) -> RoomEffectFlags {
        self.effect_flags
    }

    /// Occupants in arrival order.
    #[must_use]
    pub fn people(&self) -> &[CharId] {
        &self.people
    }

    /// Objects on the floor in arrival order.
    #[must_use]
    pub fn contents(&self) -> &[ObjId] {
        &self.contents
    }

    /// Whether violence is forbidden here.
    #[must_use]
    pub fn is_peaceful(&self) -> bool {
        self.flags.contains(RoomFlags::PEACEFUL)
    }
}

/// A timed condition on a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEffect {
    /// Affected room.
    pub room: RoomId,
    /// Spell that created it.
    pub spell: SpellId,
    /// Room condition it maintains.
    pub flag: RoomEffectFlags,
    /// Sweeps remaining.
    pub timer: i32,
}

/// Entity arenas plus the global room-effect list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct World {
    characters: BTreeMap<CharId, Character>,
    objects: BTreeMap<ObjId, Object>,
    rooms: BTreeMap<RoomId, Room>,
    room_effects: Vec<RoomEffect>,
    next_char: u32,
    next_obj: u32,
    next_room: u32,
}

impl World {
    /// Empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ----- rooms -----

    /// Create a room.
    pub fn add_room(&mut self, name: impl Into<String>, sector: Sector, flags: RoomFlags) -> RoomId {
        let id = RoomId(self.next_room);
        self.next_room += 1;
        self.rooms.insert(
            id,
            Room {
                id,
                name: name.into(),
                sector,
                flags,
                effect_flags: RoomEffectFlags::empty(),
                people: Vec::new(),
                contents: Vec::new(),
            },
        );
        id
    }

    /// Look up a room.
    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Look up a room mutably.
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Number of rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Snapshot of a room's occupants. Empty for unknown rooms.
    #[must_use]
    pub fn people_in(&self, room: RoomId) -> Vec<CharId> {
        self.rooms
            .get(&room)
            .map(|r| r.people.clone())
            .unwrap_or_default()
    }

    /// Snapshot of a room's floor objects. Empty for unknown rooms.
    #[must_use]
    pub fn objects_in(&self, room: RoomId) -> Vec<ObjId> {
        self.rooms
            .get(&room)
            .map(|r| r.contents.clone())
            .unwrap_or_default()
    }

    // ----- characters -----

    /// Create a character in a room.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] for an unknown room.
    pub fn spawn_character(&mut self, spawn: CharacterSpawn, room: RoomId) -> Result<CharId> {
        if !self.rooms.contains_key(&room) {
            return Err(GameError::RoomNotFound(room.0));
        }
        let id = CharId(self.next_char);
        self.next_char += 1;
        let mut ch = Character::from_spawn(id, spawn);
        ch.room = Some(room);
        self.characters.insert(id, ch);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.people.push(id);
        }
        Ok(id)
    }

    /// Insert a fully built character, assigning it a fresh handle.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] for an unknown room.
    pub fn insert_character(&mut self, mut ch: Character, room: RoomId) -> Result<CharId> {
        if !self.rooms.contains_key(&room) {
            return Err(GameError::RoomNotFound(room.0));
        }
        let id = CharId(self.next_char);
        self.next_char += 1;
        ch.id = id;
        ch.room = Some(room);
        ch.fighting = None;
        ch.master = None;
        ch.followers.clear();
        ch.group_leader = None;
        ch.guarded_by = None;
        ch.inventory.clear();
        ch.wielded = None;
        ch.events = crate::character::CharEvents::default();
        self.characters.insert(id, ch);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.people.push(id);
        }
        Ok(id)
    }

    /// Look up a character.
    #[must_use]
    pub fn character(&self, id: CharId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Look up a character mutably.
    pub fn character_mut(&mut self, id: CharId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Whether a handle resolves.
    #[must_use]
    pub fn contains_character(&self, id: CharId) -> bool {
        self.characters.contains_key(&id)
    }

    /// Number of characters.
    #[must_use]
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// All character handles in ascending order.
    #[must_use]
    pub fn character_ids(&self) -> Vec<CharId> {
        self.characters.keys().copied().collect()
    }

    /// Iterate characters in handle order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Move a character to another room.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle does not resolve.
    pub fn move_character(&mut self, id: CharId, to: RoomId) -> Result<()> {
        if !self.rooms.contains_key(&to) {
            return Err(GameError::RoomNotFound(to.0));
        }
        let from = self
            .characters
            .get(&id)
            .ok_or(GameError::CharacterNotFound(id.0))?
            .room;
        if let Some(from) = from.and_then(|r| self.rooms.get_mut(&r)) {
            from.people.retain(|p| *p != id);
        }
        if let Some(r) = self.rooms.get_mut(&to) {
            r.people.push(id);
        }
        if let Some(ch) = self.characters.get_mut(&id) {
            ch.room = Some(to);
        }
        Ok(())
    }

    /// Remove a character and every reference to it.
    ///
    /// Followers are released, a group it led is dissolved, opponents stop
    /// fighting it, and its carried objects drop to the floor.
    pub fn remove_character(&mut self, id: CharId) -> Option<Character> {
        let mut ch = self.characters.remove(&id)?;

        if let Some(room) = ch.room.and_then(|r| self.rooms.get_mut(&r)) {
            room.people.retain(|p| *p != id);
        }
        if let Some(master) = ch.master.and_then(|m| self.characters.get_mut(&m)) {
            master.followers.retain(|f| *f != id);
        }
        for follower in std::mem::take(&mut ch.followers) {
            if let Some(f) = self.characters.get_mut(&follower) {
                f.master = None;
            }
        }
        for other in self.characters.values_mut() {
            if other.fighting == Some(id) {
                other.fighting = None;
                if other.stance == crate::components::Stance::Fighting {
                    other.stance = crate::components::Stance::Alert;
                }
            }
            if other.group_leader == Some(id) {
                other.group_leader = None;
            }
            if other.guarded_by == Some(id) {
                other.guarded_by = None;
            }
            other.memory.retain(|m| *m != id);
        }

        let drop_to = ch.room;
        for obj in std::mem::take(&mut ch.inventory) {
            let location = drop_to.map_or(ObjLocation::Nowhere, ObjLocation::Room);
            if let Err(e) = self.move_object(obj, location) {
                warn!(obj = obj.raw(), error = %e, "inventory item not dropped");
            }
        }
        ch.wielded = None;
        ch.room = None;
        ch.fighting = None;
        Some(ch)
    }

    /// Make `follower` follow `master`.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle does not resolve.
    pub fn add_follower(&mut self, follower: CharId, master: CharId) -> Result<()> {
        if !self.characters.contains_key(&master) {
            return Err(GameError::CharacterNotFound(master.0));
        }
        self.stop_following(follower)?;
        if let Some(f) = self.characters.get_mut(&follower) {
            f.master = Some(master);
        }
        if let Some(m) = self.characters.get_mut(&master) {
            m.followers.push(follower);
        }
        Ok(())
    }

    /// Release a follower from its master.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle does not resolve.
    pub fn stop_following(&mut self, follower: CharId) -> Result<()> {
        let master = self
            .characters
            .get_mut(&follower)
            .ok_or(GameError::CharacterNotFound(follower.0))?
            .master
            .take();
        if let Some(m) = master.and_then(|m| self.characters.get_mut(&m)) {
            m.followers.retain(|f| *f != follower);
        }
        Ok(())
    }

    /// Put `member` in the group led by `leader`.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle does not resolve.
    pub fn join_group(&mut self, member: CharId, leader: CharId) -> Result<()> {
        if !self.characters.contains_key(&member) {
            return Err(GameError::CharacterNotFound(member.0));
        }
        let leader_ch = self
            .characters
            .get_mut(&leader)
            .ok_or(GameError::CharacterNotFound(leader.0))?;
        leader_ch.group_leader = Some(leader);
        if let Some(m) = self.characters.get_mut(&member) {
            m.group_leader = Some(leader);
        }
        Ok(())
    }

    /// Whether two characters share a group leader.
    #[must_use]
    pub fn is_grouped(&self, a: CharId, b: CharId) -> bool {
        match (self.characters.get(&a), self.characters.get(&b)) {
            (Some(a), Some(b)) => a.leader() == b.leader(),
            _ => false,
        }
    }

    /// Attach an effect to a character through the effect store.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown character or an invalid effect.
    pub fn apply_effect(&mut self, id: CharId, effect: Effect, mode: JoinMode) -> Result<JoinOutcome> {
        self.characters
            .get_mut(&id)
            .ok_or(GameError::CharacterNotFound(id.0))?
            .effects_mut()
            .apply(effect, mode)
    }

    /// Effect list of a character, for engine-internal mutation.
    pub(crate) fn char_effects_mut(&mut self, id: CharId) -> Option<&mut EffectList> {
        self.characters.get_mut(&id).map(Character::effects_mut)
    }

    /// Effect list of an object, for engine-internal mutation.
    pub(crate) fn obj_effects_mut(&mut self, id: ObjId) -> Option<&mut EffectList> {
        self.objects.get_mut(&id).map(Object::effects_mut)
    }

    // ----- objects -----

    /// Create an object at a location.
    ///
    /// # Errors
    ///
    /// Returns an error if the location does not resolve.
    pub fn spawn_object(&mut self, spawn: ObjectSpawn, location: ObjLocation) -> Result<ObjId> {
        self.check_location(location)?;
        let id = ObjId(self.next_obj);
        self.next_obj += 1;
        self.objects.insert(id, Object::from_spawn(id, spawn));
        self.move_object(id, location)?;
        Ok(id)
    }

    fn check_location(&self, location: ObjLocation) -> Result<()> {
        match location {
            ObjLocation::Room(r) if !self.rooms.contains_key(&r) => Err(GameError::RoomNotFound(r.0)),
            ObjLocation::Carried(c) if !self.characters.contains_key(&c) => {
                Err(GameError::CharacterNotFound(c.0))
            }
            _ => Ok(()),
        }
    }

    /// Look up an object.
    #[must_use]
    pub fn object(&self, id: ObjId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Look up an object mutably.
    pub fn object_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    /// Number of objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// All object handles in ascending order.
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjId> {
        self.objects.keys().copied().collect()
    }

    /// Move an object to a new location.
    ///
    /// # Errors
    ///
    /// Returns an error if the object or destination does not resolve.
    pub fn move_object(&mut self, id: ObjId, to: ObjLocation) -> Result<()> {
        self.check_location(to)?;
        let from = self
            .objects
            .get(&id)
            .ok_or(GameError::ObjectNotFound(id.0))?
            .location;
        self.unlink_object(id, from);
        match to {
            ObjLocation::Room(r) => {
                if let Some(room) = self.rooms.get_mut(&r) {
                    room.contents.push(id);
                }
            }
            ObjLocation::Carried(c) => {
                if let Some(ch) = self.characters.get_mut(&c) {
                    ch.inventory.push(id);
                }
            }
            ObjLocation::Nowhere => {}
        }
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.location = to;
        }
        Ok(())
    }

    fn unlink_object(&mut self, id: ObjId, from: ObjLocation) {
        match from {
            ObjLocation::Room(r) => {
                if let Some(room) = self.rooms.get_mut(&r) {
                    room.contents.retain(|o| *o != id);
                }
            }
            ObjLocation::Carried(c) => {
                if let Some(ch) = self.characters.get_mut(&c) {
                    ch.inventory.retain(|o| *o != id);
                    if ch.wielded == Some(id) {
                        ch.wielded = None;
                    }
                }
            }
            ObjLocation::Nowhere => {}
        }
    }

    /// Wield a carried weapon.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle does not resolve.
    pub fn wield(&mut self, ch: CharId, obj: ObjId) -> Result<()> {
        if !self.objects.contains_key(&obj) {
            return Err(GameError::ObjectNotFound(obj.0));
        }
        self.move_object(obj, ObjLocation::Carried(ch))?;
        if let Some(c) = self.characters.get_mut(&ch) {
            c.wielded = Some(obj);
        }
        Ok(())
    }

    /// Remove an object from the world.
    pub fn remove_object(&mut self, id: ObjId) -> Option<Object> {
        let location = self.objects.get(&id)?.location;
        self.unlink_object(id, location);
        self.objects.remove(&id)
    }

    // ----- room effects -----

    /// Active room effects.
    #[must_use]
    pub fn room_effects(&self) -> &[RoomEffect] {
        &self.room_effects
    }

    /// Whether a room holds an effect of `spell`.
    #[must_use]
    pub fn room_affected_by(&self, room: RoomId, spell: SpellId) -> bool {
        self.room_effects
            .iter()
            .any(|e| e.room == room && e.spell == spell)
    }

    /// Attach a room effect and raise its room flag.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] for an unknown room.
    pub fn add_room_effect(&mut self, effect: RoomEffect) -> Result<()> {
        let room = effect.room;
        if !self.rooms.contains_key(&room) {
            return Err(GameError::RoomNotFound(room.0));
        }
        self.room_effects.push(effect);
        self.recompute_room_flags(room);
        Ok(())
    }

    /// One tick of room-effect expiry. Returns the expired effects.
    pub fn sweep_room_effects(&mut self) -> Vec<RoomEffect> {
        let mut expired = Vec::new();
        self.room_effects.retain_mut(|e| {
            e.timer -= 1;
            if e.timer <= 0 {
                expired.push(e.clone());
                false
            } else {
                true
            }
        });
        let mut touched: Vec<RoomId> = expired.iter().map(|e| e.room).collect();
        touched.dedup();
        for room in touched {
            self.recompute_room_flags(room);
        }
        expired
    }

    fn recompute_room_flags(&mut self, room: RoomId) {
        let flags = self
            .room_effects
            .iter()
            .filter(|e| e.room == room)
            .fold(RoomEffectFlags::empty(), |acc, e| acc | e.flag);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.effect_flags = flags;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EffectFlag;
    use crate::object::ObjKind;

    fn world_with_room() -> (World, RoomId) {
        let mut world = World::new();
        let room = world.add_room("Temple", Sector::City, RoomFlags::empty());
        (world, room)
    }

    #[test]
    fn test_spawn_places_in_room() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let b = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        assert_eq!(world.people_in(room), vec![a, b]);
        assert!(world.spawn_character(CharacterSpawn::default(), RoomId(99)).is_err());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        world.remove_character(a);
        let b = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        assert_ne!(a, b);
        assert!(world.character(a).is_none());
    }

    #[test]
    fn test_remove_character_clears_references() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let b = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        world.character_mut(b).unwrap().fighting = Some(a);
        world.add_follower(b, a).unwrap();
        world.join_group(b, a).unwrap();
        let sword = world
            .spawn_object(ObjectSpawn::default(), ObjLocation::Carried(a))
            .unwrap();

        world.remove_character(a);
        let b_ch = world.character(b).unwrap();
        assert_eq!(b_ch.fighting, None);
        assert_eq!(b_ch.master, None);
        assert_eq!(b_ch.group_leader, None);
        assert_eq!(world.object(sword).unwrap().location, ObjLocation::Room(room));
        assert_eq!(world.people_in(room), vec![b]);
    }

    #[test]
    fn test_stale_inventory_handle_does_not_block_removal() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let ring = world
            .spawn_object(ObjectSpawn::default(), ObjLocation::Carried(a))
            .unwrap();
        world.character_mut(a).unwrap().inventory.insert(0, ObjId(999));

        assert!(world.remove_character(a).is_some());
        assert_eq!(world.objects_in(room), vec![ring]);
        assert!(world.object(ObjId(999)).is_none());
    }

    #[test]
    fn test_grouping() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let b = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let c = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        assert!(!world.is_grouped(a, b));
        world.join_group(b, a).unwrap();
        assert!(world.is_grouped(a, b));
        assert!(!world.is_grouped(a, c));
    }

    #[test]
    fn test_room_effect_lifecycle() {
        let (mut world, room) = world_with_room();
        world
            .add_room_effect(RoomEffect {
                room,
                spell: SpellId(30),
                flag: RoomEffectFlags::FOG,
                timer: 2,
            })
            .unwrap();
        assert!(world.room(room).unwrap().effect_flags().contains(RoomEffectFlags::FOG));
        assert!(world.sweep_room_effects().is_empty());
        assert_eq!(world.sweep_room_effects().len(), 1);
        assert!(world.room(room).unwrap().effect_flags().is_empty());
    }

    #[test]
    fn test_apply_effect_through_world() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        world
            .apply_effect(a, Effect::new(SpellId(5), 2).with_flag(EffectFlag::Haste), JoinMode::ADD_ONLY)
            .unwrap();
        assert!(world.character(a).unwrap().has(EffectFlag::Haste));
    }

    #[test]
    fn test_object_moves_between_locations() {
        let (mut world, room) = world_with_room();
        let a = world.spawn_character(CharacterSpawn::default(), room).unwrap();
        let bread = world
            .spawn_object(
                ObjectSpawn {
                    kind: ObjKind::Food { filling: 5 },
                    ..ObjectSpawn::default()
                },
                ObjLocation::Room(room),
            )
            .unwrap();
        assert_eq!(world.objects_in(room), vec![bread]);
        world.move_object(bread, ObjLocation::Carried(a)).unwrap();
        assert!(world.objects_in(room).is_empty());
        assert_eq!(world.character(a).unwrap().inventory, vec![bread]);
        world.remove_object(bread);
        assert!(world.character(a).unwrap().inventory.is_empty());
    }
}
