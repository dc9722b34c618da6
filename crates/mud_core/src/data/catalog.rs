//! The spell catalog: every definition, keyed by id and by name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::spell_data::{HandlerKind, SpellData};
use crate::components::SpellId;
use crate::effects::MAX_BATCH;
use crate::error::{GameError, Result};
use crate::flags::Routines;

/// On-disk shape of a catalog.
///
/// ```ron
/// SpellCatalog(
///     spells: [
///         SpellData(id: 10, name: "magic missile", routines: "DAMAGE", ...),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "SpellCatalog")]
struct CatalogFile {
    spells: Vec<SpellData>,
}

/// Immutable, validated spell definitions.
#[derive(Debug, Clone, Default)]
pub struct SpellCatalog {
    spells: BTreeMap<SpellId, SpellData>,
    names: BTreeMap<String, SpellId>,
    duplicates: Vec<String>,
}

impl SpellCatalog {
    /// Build a catalog from definitions without validating it.
    ///
    /// Later definitions with an id or name already seen are dropped and
    /// reported by [`SpellCatalog::validate`].
    #[must_use]
    pub fn new(spells: Vec<SpellData>) -> Self {
        let mut catalog = Self::default();
        for spell in spells {
            if catalog.spells.contains_key(&spell.id) {
                catalog
                    .duplicates
                    .push(format!("Duplicate spell id {} ('{}')", spell.id, spell.name));
                continue;
            }
            if catalog.names.contains_key(&spell.name) {
                catalog
                    .duplicates
                    .push(format!("Duplicate spell name '{}'", spell.name));
                continue;
            }
            catalog.names.insert(spell.name.clone(), spell.id);
            catalog.spells.insert(spell.id, spell);
        }
        catalog
    }

    /// Parse and validate a catalog from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] for malformed RON and
    /// [`GameError::CatalogInvalid`] when validation fails.
    pub fn from_ron_str(ron_text: &str) -> Result<Self> {
        Self::parse(ron_text, "<string>")
    }

    /// Load and validate a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] when the file cannot be read or
    /// parsed and [`GameError::CatalogInvalid`] when validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        let file: CatalogFile = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::new(file.spells);
        let errors = catalog.validate();
        if errors.is_empty() {
            tracing::debug!(spells = catalog.len(), origin, "Loaded spell catalog");
            Ok(catalog)
        } else {
            Err(GameError::CatalogInvalid(errors))
        }
    }

    /// Serialize back to RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        let file = CatalogFile {
            spells: self.spells.values().cloned().collect(),
        };
        ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(e.to_string()))
    }

    /// Look up by id.
    #[must_use]
    pub fn get(&self, id: SpellId) -> Option<&SpellData> {
        self.spells.get(&id)
    }

    /// Look up by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&SpellData> {
        self.names.get(name).and_then(|id| self.spells.get(id))
    }

    /// Resolve a name to an id.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<SpellId> {
        self.names.get(name).copied()
    }

    /// Resolve a name or fail.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownSpellName`] for an unknown name.
    pub fn require(&self, name: &str) -> Result<SpellId> {
        self.id_of(name)
            .ok_or_else(|| GameError::UnknownSpellName(name.to_string()))
    }

    /// Resolve a list of names, skipping unknown ones.
    #[must_use]
    pub fn ids_of(&self, names: &[String]) -> Vec<SpellId> {
        names.iter().filter_map(|n| self.id_of(n)).collect()
    }

    /// Iterate definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SpellData> {
        self.spells.values()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Validate the catalog.
    ///
    /// Checks:
    /// - ids and names are unique and ids avoid the reserved range
    /// - every spell reference resolves
    /// - affect specs fit one batch and every template contributes something
    /// - each routine in the mask has the data it needs
    /// - delayed casts run at least one round
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.duplicates.clone();

        for spell in self.spells.values() {
            if spell.id.is_reserved() {
                errors.push(format!(
                    "Spell '{}' uses reserved id {}",
                    spell.name, spell.id
                ));
            }
            if !(1..=9).contains(&spell.circle) {
                errors.push(format!(
                    "Spell '{}' has circle {} outside 1-9",
                    spell.name, spell.circle
                ));
            }

            for name in spell.references() {
                if self.id_of(name).is_none() {
                    errors.push(format!(
                        "Spell '{}' refers to unknown spell '{}'",
                        spell.name, name
                    ));
                }
            }

            if let Some(affects) = &spell.affects {
                if !affects.fits_batch() {
                    errors.push(format!(
                        "Spell '{}' declares {} affect templates (max {MAX_BATCH})",
                        spell.name,
                        affects.effects.len()
                    ));
                }
                for (i, t) in affects.effects.iter().enumerate() {
                    if t.location == crate::components::ApplyLocation::None && t.flags.is_empty() {
                        errors.push(format!(
                            "Spell '{}' affect template {i} has neither a location nor flags",
                            spell.name
                        ));
                    }
                }
            }

            Self::validate_routines(spell, &mut errors);

            if let Some(delayed) = &spell.delayed {
                if delayed.rounds < 1 {
                    errors.push(format!(
                        "Spell '{}' has a delayed cast with {} rounds",
                        spell.name, delayed.rounds
                    ));
                }
            }
        }

        errors
    }

    fn validate_routines(spell: &SpellData, errors: &mut Vec<String>) {
        let custom = spell.handler.is_some();
        let needs = |routine: Routines, present: bool, what: &str, errors: &mut Vec<String>| {
            if spell.routines.contains(routine) && !present && !custom {
                errors.push(format!(
                    "Spell '{}' runs {what} but declares no {what} data",
                    spell.name
                ));
            }
        };
        needs(Routines::DAMAGE, spell.damage.is_some(), "damage", errors);
        needs(Routines::AFFECT, spell.affects.is_some(), "affect", errors);
        needs(Routines::MASS, spell.affects.is_some(), "affect", errors);
        needs(Routines::POINT, spell.points.is_some(), "point", errors);
        needs(Routines::UNAFFECT, !spell.unaffect.is_empty(), "unaffect", errors);
        needs(Routines::GROUP, !spell.group.is_empty(), "group", errors);
        needs(Routines::SUMMON, spell.summon.is_some(), "summon", errors);
        needs(Routines::ROOM, spell.room_effect.is_some(), "room", errors);
        needs(Routines::ALTER_OBJ, spell.alter_obj.is_some(), "object", errors);
        needs(Routines::BULK_OBJS, spell.alter_obj.is_some(), "object", errors);
        needs(Routines::CREATION, spell.creation.is_some(), "creation", errors);
        if spell.routines.contains(Routines::AREA)
            && spell.damage.is_none()
            && spell.affects.is_none()
            && !custom
        {
            errors.push(format!(
                "Spell '{}' runs area but declares neither damage nor affect data",
                spell.name
            ));
        }
        if spell.routines.contains(Routines::MANUAL) && !custom {
            errors.push(format!(
                "Spell '{}' runs a manual routine without a handler",
                spell.name
            ));
        }
        if matches!(spell.handler, Some(HandlerKind::Pyre)) && spell.delayed.is_none() {
            errors.push(format!(
                "Spell '{}' uses the pyre handler without a delayed cast",
                spell.name
            ));
        }
    }
}
