//! Scenario and category definitions
//!
//! A scenario is a named, opaque parameter string for the simulator. The
//! catalog never interprets the parameters; it only guarantees that names are
//! usable inside run identifiers and log file names.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};

/// One named simulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario name, unique within its category
    pub name: String,
    /// Simulator arguments, passed through verbatim
    pub parameters: String,
    /// Human description
    pub description: String,
}

impl ScenarioDefinition {
    /// Create a scenario definition
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        parameters: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
            description: description.into(),
        }
    }

    /// Parameter string split into whitespace-separated tokens
    pub fn parameter_tokens(&self) -> impl Iterator<Item = &str> {
        self.parameters.split_whitespace()
    }
}

/// Named group of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category name, unique within the catalog
    pub name: String,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Scenarios in catalog order
    #[serde(rename = "scenario", default)]
    pub scenarios: Vec<ScenarioDefinition>,
}

impl Category {
    /// Create an empty category
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            scenarios: Vec::new(),
        }
    }

    /// Append a scenario
    #[inline]
    #[must_use]
    pub fn with_scenario(mut self, scenario: ScenarioDefinition) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Number of scenarios
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True if the category has no scenarios
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Check names and scenario uniqueness
    ///
    /// # Errors
    /// - `CatalogError::InvalidName` for an unusable category or scenario name
    /// - `CatalogError::DuplicateScenario` if two scenarios share a name
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_name(&self.name)?;

        let mut seen = std::collections::HashSet::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            validate_name(&scenario.name)?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(CatalogError::DuplicateScenario {
                    category: self.name.clone(),
                    scenario: scenario.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Names end up in file names, so they must stay a single path component.
pub(crate) fn validate_name(name: &str) -> Result<(), CatalogError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name.chars().any(char::is_whitespace) {
        Some("name contains whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CatalogError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_tokens_split_on_whitespace() {
        let scenario = ScenarioDefinition::new("s", "--nWifi=20  --simtime=30\t--x=1", "d");
        let tokens: Vec<_> = scenario.parameter_tokens().collect();
        assert_eq!(tokens, vec!["--nWifi=20", "--simtime=30", "--x=1"]);
    }

    #[test]
    fn category_rejects_duplicate_scenarios() {
        let category = Category::new("baseline", "")
            .with_scenario(ScenarioDefinition::new("a", "", ""))
            .with_scenario(ScenarioDefinition::new("a", "", ""));

        assert!(matches!(
            category.validate(),
            Err(CatalogError::DuplicateScenario { .. })
        ));
    }

    #[test]
    fn names_must_be_single_path_component() {
        assert!(validate_name("normal_load_mixed_tid").is_ok());
        assert!(validate_name("10_nodes").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("a b").is_err());
    }
}
