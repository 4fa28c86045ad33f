//! Error types for the scenario catalog
//!
//! Covers:
//! - Lookups of categories the catalog does not contain
//! - Malformed or inconsistent catalog data
//! - I/O failures while reading catalog files

use std::path::PathBuf;

/// Catalog error type
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Category name is not present in the catalog
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Suite name does not match a built-in suite
    #[error("unknown suite: {0} (expected one of: basic, extreme)")]
    UnknownSuite(String),

    /// Two categories share a name
    #[error("duplicate category: {0}")]
    DuplicateCategory(String),

    /// Two scenarios in one category share a name
    #[error("duplicate scenario {scenario} in category {category}")]
    DuplicateScenario { category: String, scenario: String },

    /// Name cannot be used as part of a run identifier
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Catalog defines no categories at all
    #[error("catalog contains no categories")]
    EmptyCatalog,

    /// Catalog data is not valid TOML for the expected shape
    #[error("catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Catalog file could not be read
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_display() {
        let err = CatalogError::UnknownCategory("warp_drive".to_string());
        assert_eq!(err.to_string(), "unknown category: warp_drive");
    }

    #[test]
    fn duplicate_scenario_display() {
        let err = CatalogError::DuplicateScenario {
            category: "baseline".to_string(),
            scenario: "normal_load".to_string(),
        };
        assert!(err.to_string().contains("normal_load"));
    }
}
