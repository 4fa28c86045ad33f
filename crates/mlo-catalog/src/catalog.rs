//! Immutable scenario registry
//!
//! Provides:
//! - Loading and validation from TOML
//! - Category lookup with a typed miss
//! - Filtering down to a selected subset
//! - A printable listing for list-only mode

use crate::error::CatalogError;
use crate::scenario::{Category, ScenarioDefinition};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;

/// On-disk shape of a catalog file
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

/// Registry of categories in catalog order
///
/// Built once and never mutated, so it can be shared across workers behind an
/// `Arc` without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioCatalog {
    categories: IndexMap<String, Category>,
}

/// Result of restricting a catalog to selected categories
#[derive(Debug, Clone)]
pub struct Selection {
    /// Sub-catalog in selection order
    pub catalog: ScenarioCatalog,
    /// Selected names the catalog does not contain
    pub unknown: Vec<String>,
}

impl ScenarioCatalog {
    /// Build a catalog from categories, validating as it goes
    ///
    /// # Errors
    /// - `CatalogError::EmptyCatalog` if no categories are given
    /// - `CatalogError::DuplicateCategory` if two categories share a name
    /// - Any error from [`Category::validate`]
    pub fn from_categories(
        categories: impl IntoIterator<Item = Category>,
    ) -> Result<Self, CatalogError> {
        let mut map = IndexMap::new();
        for category in categories {
            category.validate()?;
            if map.contains_key(&category.name) {
                return Err(CatalogError::DuplicateCategory(category.name));
            }
            map.insert(category.name.clone(), category);
        }

        if map.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        Ok(Self { categories: map })
    }

    /// Parse a catalog from TOML text
    ///
    /// # Errors
    /// `CatalogError::Parse` on malformed TOML, otherwise as
    /// [`ScenarioCatalog::from_categories`].
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(source)?;
        Self::from_categories(file.categories)
    }

    /// Read and parse a catalog file
    ///
    /// # Errors
    /// `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`ScenarioCatalog::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Category names in catalog order
    #[must_use]
    pub fn list_categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    /// Look up a category
    #[inline]
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Iterate categories in catalog order
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Scenarios of one category, in catalog order
    ///
    /// # Errors
    /// `CatalogError::UnknownCategory` if the name is absent.
    pub fn scenarios_for(&self, category: &str) -> Result<&[ScenarioDefinition], CatalogError> {
        self.categories
            .get(category)
            .map(|c| c.scenarios.as_slice())
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
    }

    /// Restrict the catalog to the selected categories
    ///
    /// The sub-catalog follows selection order; repeated names are kept once.
    /// Names not in the catalog are returned in `Selection::unknown`.
    #[must_use]
    pub fn filter<S: AsRef<str>>(&self, selected: &[S]) -> Selection {
        let mut categories = IndexMap::new();
        let mut unknown = Vec::new();

        for name in selected {
            let name = name.as_ref();
            match self.categories.get(name) {
                Some(category) => {
                    categories
                        .entry(name.to_string())
                        .or_insert_with(|| category.clone());
                }
                None => {
                    if !unknown.iter().any(|u| u == name) {
                        unknown.push(name.to_string());
                    }
                }
            }
        }

        Selection {
            catalog: Self { categories },
            unknown,
        }
    }

    /// Number of categories
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True if there are no categories
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total scenarios across all categories
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.categories.values().map(Category::len).sum()
    }

    /// Human-readable listing of every category and scenario
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = String::new();
        out.push_str("Available test scenarios\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');

        for category in self.categories.values() {
            let _ = writeln!(out, "\nCATEGORY: {}", category.name.to_uppercase());
            let _ = writeln!(out, "   Description: {}", category.description);
            let _ = writeln!(out, "   Tests ({}):\n", category.len());
            for scenario in &category.scenarios {
                let _ = writeln!(out, "     - {}: {}", scenario.name, scenario.description);
            }
        }

        out
    }
}

impl Selection {
    /// True if nothing was selected from the catalog
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
