//! The shipped data files and catalog validation.

use std::path::PathBuf;

use mud_core::prelude::*;
use mud_test_utils::fixtures::{standard_catalog, SPELLS_RON};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/data")
}

#[test]
fn test_shipped_files_load_from_disk() {
    let catalog = SpellCatalog::load(data_dir().join("spells.ron")).unwrap();
    assert_eq!(catalog.len(), standard_catalog().len());
    assert!(catalog.validate().is_empty());

    let config = EngineConfig::load(data_dir().join("engine.ron")).unwrap();
    assert!(config.validate().is_empty());
}

#[test]
fn test_shipped_ids_avoid_reserved_range() {
    let catalog = standard_catalog();
    for spell in catalog.iter() {
        assert!(!spell.id.is_reserved(), "{} uses id {}", spell.name, spell.id);
        assert!((1..=9).contains(&spell.circle), "{}", spell.name);
    }
}

#[test]
fn test_every_timed_spell_announces_its_end() {
    let catalog = standard_catalog();
    let silent: Vec<&str> = catalog
        .iter()
        .filter(|s| s.affects.is_some() && s.routines.contains(Routines::AFFECT))
        .filter(|s| s.wear_off.is_none())
        .map(|s| s.name.as_str())
        .collect();
    assert!(silent.is_empty(), "no wear-off message: {silent:?}");
}

#[test]
fn test_round_trip_through_ron() {
    let catalog = standard_catalog();
    let text = catalog.to_ron_string().unwrap();
    let again = SpellCatalog::from_ron_str(&text).unwrap();
    assert_eq!(again.len(), catalog.len());
    for spell in catalog.iter() {
        assert_eq!(again.get(spell.id), Some(spell));
    }
}

#[test]
fn test_oversized_affect_batch_rejected() {
    let template = "AffectTemplate(location: Hitroll, modifier: Const(1))";
    let ten = vec![template; 10].join(", ");
    let text = format!(
        r#"SpellCatalog(spells: [
            SpellData(
                id: 10,
                name: "overload",
                routines: "AFFECT",
                affects: Some(AffectSpec(effects: [{ten}], duration: Const(5))),
            ),
        ])"#
    );
    match SpellCatalog::from_ron_str(&text) {
        Err(GameError::CatalogInvalid(errors)) => {
            assert!(errors.iter().any(|e| e.contains("affect templates")), "{errors:?}");
        }
        other => panic!("oversized batch accepted: {other:?}"),
    }
}

#[test]
fn test_broken_reference_in_shipped_text_rejected() {
    let text = SPELLS_RON.replacen("\"barkskin\", \"stone skin\"", "\"barkskin\", \"stoneskin\"", 1);
    assert_ne!(text, SPELLS_RON);
    match SpellCatalog::from_ron_str(&text) {
        Err(GameError::CatalogInvalid(errors)) => {
            assert!(errors.iter().any(|e| e.contains("unknown spell 'stoneskin'")));
        }
        other => panic!("dangling reference accepted: {other:?}"),
    }
}

#[test]
fn test_reserved_id_in_shipped_text_rejected() {
    let text = SPELLS_RON.replacen("id: 10,", "id: 3,", 1);
    let Err(GameError::CatalogInvalid(errors)) = SpellCatalog::from_ron_str(&text) else {
        panic!("reserved id accepted");
    };
    assert!(errors.iter().any(|e| e.contains("reserved id 3")));
}
