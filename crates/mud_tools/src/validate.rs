//! Data validation utilities.

use std::path::Path;

use mud_core::config::EngineConfig;
use mud_core::data::SpellCatalog;
use mud_core::error::GameError;

use crate::error::{Result, ToolError};

/// What a directory check found.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Spells in the catalog.
    pub spells: usize,
    /// Whether an engine config was present and checked.
    pub engine_config: bool,
    /// Every problem found, prefixed with its file.
    pub problems: Vec<String>,
}

impl ValidationReport {
    /// Whether nothing was wrong.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validate `spells.ron` and, if present, `engine.ron` in a directory.
///
/// Validation problems are collected into the report; only a missing
/// catalog or unreadable file is an error.
///
/// # Errors
///
/// Returns [`ToolError::MissingFile`] without a `spells.ron`, or the
/// underlying parse error when a file is not valid RON.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let spells_path = path.join("spells.ron");
    if !spells_path.is_file() {
        return Err(ToolError::MissingFile(spells_path.display().to_string()));
    }

    let mut report = ValidationReport::default();
    match SpellCatalog::load(&spells_path) {
        Ok(catalog) => report.spells = catalog.len(),
        Err(GameError::CatalogInvalid(errors)) => {
            report
                .problems
                .extend(errors.into_iter().map(|e| format!("spells.ron: {e}")));
        }
        Err(e) => return Err(e.into()),
    }

    let engine_path = path.join("engine.ron");
    if engine_path.is_file() {
        let config = EngineConfig::load(&engine_path)?;
        report.engine_config = true;
        report
            .problems
            .extend(config.validate().into_iter().map(|e| format!("engine.ron: {e}")));
    }

    tracing::debug!(
        spells = report.spells,
        problems = report.problems.len(),
        "validated {}",
        path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> std::path::PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/data")
    }

    #[test]
    fn test_shipped_directory_is_clean() {
        let report = validate_data_directory(&shipped()).unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert!(report.engine_config);
        assert!(report.spells > 50);
    }

    #[test]
    fn test_missing_catalog_is_an_error() {
        let err = validate_data_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ToolError::MissingFile(_)));
    }
}
