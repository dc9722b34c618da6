//! Spell listing and inspection.

use std::fmt::Write;

use serde::Serialize;

use mud_core::components::SpellId;
use mud_core::damage::DamageType;
use mud_core::data::{SpellCatalog, SpellData};
use mud_core::flags::{Routines, TargetFlags};

use crate::error::{Result, ToolError};

/// One line of `inspect list`.
#[derive(Debug, Clone, Serialize)]
pub struct SpellSummary {
    /// Catalog id.
    pub id: u16,
    /// Name.
    pub name: String,
    /// Circle.
    pub circle: u8,
    /// Routine mask.
    pub routines: Routines,
    /// Target mask.
    pub targets: TargetFlags,
    /// Whether casting it is an attack.
    pub violent: bool,
    /// Damage type, if any.
    pub damage_type: Option<DamageType>,
    /// Rounds, for delayed casts.
    pub rounds: Option<i32>,
}

impl From<&SpellData> for SpellSummary {
    fn from(spell: &SpellData) -> Self {
        Self {
            id: spell.id.0,
            name: spell.name.clone(),
            circle: spell.circle,
            routines: spell.routines,
            targets: spell.targets,
            violent: spell.violent,
            damage_type: spell.damage_type,
            rounds: spell.delayed.map(|d| d.rounds),
        }
    }
}

/// Summaries of every spell in id order, optionally filtered to a circle.
#[must_use]
pub fn list(catalog: &SpellCatalog, circle: Option<u8>) -> Vec<SpellSummary> {
    catalog
        .iter()
        .filter(|s| circle.map_or(true, |c| s.circle == c))
        .map(SpellSummary::from)
        .collect()
}

/// Find a spell by name or numeric id.
///
/// # Errors
///
/// Returns [`ToolError::NoSuchSpell`] when nothing matches.
pub fn find<'a>(catalog: &'a SpellCatalog, query: &str) -> Result<&'a SpellData> {
    let by_id = query.parse::<u16>().ok().and_then(|n| catalog.get(SpellId(n)));
    by_id
        .or_else(|| catalog.by_name(query))
        .ok_or_else(|| ToolError::NoSuchSpell(query.to_string()))
}

/// Render a list as aligned text.
#[must_use]
pub fn render_list(spells: &[SpellSummary]) -> String {
    let mut out = String::new();
    for s in spells {
        let kind = if s.violent { "violent" } else { "" };
        let routines = format!("{:?}", s.routines);
        let _ = writeln!(out, "{:>4}  c{}  {:<24} {routines:<28} {kind}", s.id, s.circle, s.name);
    }
    out
}

/// Render one spell as JSON or RON.
///
/// # Errors
///
/// Returns the encoder's error if serialization fails.
pub fn render_spell(spell: &SpellData, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(spell)?)
    } else {
        Ok(ron::ser::to_string_pretty(spell, ron::ser::PrettyConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_test_utils::fixtures::standard_catalog;

    #[test]
    fn test_list_filters_by_circle() {
        let catalog = standard_catalog();
        let all = list(&catalog, None);
        assert_eq!(all.len(), catalog.len());
        let first = list(&catalog, Some(1));
        assert!(!first.is_empty());
        assert!(first.iter().all(|s| s.circle == 1));
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_find_by_name_or_id() {
        let catalog = standard_catalog();
        assert_eq!(find(&catalog, "armor").unwrap().id, SpellId(10));
        assert_eq!(find(&catalog, "10").unwrap().name, "armor");
        assert!(matches!(find(&catalog, "wish"), Err(ToolError::NoSuchSpell(_))));
    }

    #[test]
    fn test_render_spell_json() {
        let catalog = standard_catalog();
        let text = render_spell(find(&catalog, "armor").unwrap(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["name"], "armor");
    }

    #[test]
    fn test_render_list_has_a_line_per_spell() {
        let catalog = standard_catalog();
        let spells = list(&catalog, Some(2));
        assert_eq!(render_list(&spells).lines().count(), spells.len());
    }
}
