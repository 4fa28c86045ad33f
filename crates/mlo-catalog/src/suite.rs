//! Built-in scenario suites
//!
//! Two suites ship with the crate. `basic` covers normal and moderate
//! conditions. `extreme` extends every category with harsher settings and adds
//! combined mobility and interference stress cases.

use crate::catalog::ScenarioCatalog;
use crate::error::CatalogError;
use std::fmt;
use std::str::FromStr;

const BASIC_TOML: &str = include_str!("../catalogs/basic.toml");
const EXTREME_TOML: &str = include_str!("../catalogs/extreme.toml");

/// Built-in suite selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Suite {
    /// Basic and moderate scenarios
    #[default]
    Basic,
    /// Extreme scenarios, including mobility plus interference
    Extreme,
}

impl Suite {
    /// All suites
    pub const ALL: [Suite; 2] = [Suite::Basic, Suite::Extreme];

    /// Suite name as used on the command line
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Suite::Basic => "basic",
            Suite::Extreme => "extreme",
        }
    }

    /// Raw TOML source of the suite
    #[inline]
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Suite::Basic => BASIC_TOML,
            Suite::Extreme => EXTREME_TOML,
        }
    }

    /// Parse the suite into a catalog
    ///
    /// # Errors
    /// Only if the embedded data is malformed.
    pub fn load(self) -> Result<ScenarioCatalog, CatalogError> {
        ScenarioCatalog::from_toml_str(self.source())
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::ALL
            .into_iter()
            .find(|suite| suite.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::UnknownSuite(s.to_string()))
    }
}
