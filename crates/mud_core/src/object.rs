//! Objects: weapons, consumables, corpses, and everything else lying around.

use serde::{Deserialize, Serialize};

use crate::components::{CharId, Class, ObjId, RoomId};
use crate::damage::DamageType;
use crate::effects::EffectList;
use crate::flags::{EffectFlag, ItemFlags};

/// Type-specific object data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjKind {
    /// A weapon.
    Weapon {
        /// Number of damage dice.
        dice_count: i32,
        /// Sides per damage die.
        dice_size: i32,
        /// Physical damage type.
        damage_type: DamageType,
    },
    /// Something edible.
    Food {
        /// Hours of nourishment.
        filling: i32,
    },
    /// A drink container.
    Drink {
        /// Sips remaining.
        remaining: i32,
    },
    /// A fountain or spring.
    Fountain,
    /// Remains of a creature.
    Corpse(CorpseData),
    /// Anything else.
    Other,
}

/// What a corpse remembers about its former owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpseData {
    /// Name of the deceased.
    pub name: String,
    /// Level of the deceased.
    pub level: i32,
    /// Class of the deceased.
    pub class: Class,
    /// Maximum hit points of the deceased.
    pub max_hit: i32,
    /// Whether the deceased was a player.
    pub player: bool,
    /// Whether animate dead may still use it.
    pub raisable: bool,
}

/// Where an object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjLocation {
    /// On the floor of a room.
    Room(RoomId),
    /// Carried by a character.
    Carried(CharId),
    /// Not placed anywhere.
    #[default]
    Nowhere,
}

/// An object instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// Arena handle.
    pub id: ObjId,
    /// Prototype number; zero for ad hoc objects.
    pub vnum: i32,
    /// Short name.
    pub name: String,
    /// Type-specific data.
    pub kind: ObjKind,
    /// Item level.
    pub level: i32,
    /// Weight.
    pub weight: i32,
    /// Extra flags.
    pub item_flags: ItemFlags,
    /// Location.
    pub location: ObjLocation,
    /// Number of stat applies the item carries.
    pub applies: i32,
    /// Decay timer in ticks; negative never decays.
    pub timer: i32,
    effects: EffectList,
}

/// Parameters for spawning an object.
#[derive(Debug, Clone)]
pub struct ObjectSpawn {
    /// Prototype number.
    pub vnum: i32,
    /// Name.
    pub name: String,
    /// Kind.
    pub kind: ObjKind,
    /// Level.
    pub level: i32,
    /// Weight.
    pub weight: i32,
    /// Extra flags.
    pub item_flags: ItemFlags,
    /// Stat applies.
    pub applies: i32,
    /// Decay timer.
    pub timer: i32,
}

impl Default for ObjectSpawn {
    fn default() -> Self {
        Self {
            vnum: 0,
            name: "something".into(),
            kind: ObjKind::Other,
            level: 1,
            weight: 1,
            item_flags: ItemFlags::empty(),
            applies: 0,
            timer: -1,
        }
    }
}

impl Object {
    /// Build an object from spawn parameters.
    #[must_use]
    pub fn from_spawn(id: ObjId, spawn: ObjectSpawn) -> Self {
        Self {
            id,
            vnum: spawn.vnum,
            name: spawn.name,
            kind: spawn.kind,
            level: spawn.level,
            weight: spawn.weight,
            item_flags: spawn.item_flags,
            location: ObjLocation::Nowhere,
            applies: spawn.applies,
            timer: spawn.timer,
            effects: EffectList::new(),
        }
    }

    /// Active effects (weapon enchantments, blessings).
    #[must_use]
    pub fn effects(&self) -> &EffectList {
        &self.effects
    }

    pub(crate) fn effects_mut(&mut self) -> &mut EffectList {
        &mut self.effects
    }

    /// Whether a derived flag is set.
    #[must_use]
    pub fn has(&self, flag: EffectFlag) -> bool {
        self.effects.has_flag(flag)
    }

    /// Whether this is a weapon.
    #[must_use]
    pub const fn is_weapon(&self) -> bool {
        matches!(self.kind, ObjKind::Weapon { .. })
    }

    /// Whether this is a corpse.
    #[must_use]
    pub const fn is_corpse(&self) -> bool {
        matches!(self.kind, ObjKind::Corpse(_))
    }

    /// Physical damage type of a weapon.
    #[must_use]
    pub const fn weapon_damage_type(&self) -> Option<DamageType> {
        match self.kind {
            ObjKind::Weapon { damage_type, .. } => Some(damage_type),
            _ => None,
        }
    }
}
