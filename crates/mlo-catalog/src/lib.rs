//! MLO Catalog - Scenario registry for simulation campaigns
//!
//! Holds the declarative description of what a campaign can run:
//! - Categories of scenarios, in a stable order
//! - Scenario parameter strings, treated as opaque simulator arguments
//! - Built-in `basic` and `extreme` suites
//!
//! # Example
//!
//! ```rust,ignore
//! use mlo_catalog::{ScenarioCatalog, Suite};
//!
//! let catalog = Suite::Basic.load()?;
//! let selection = catalog.filter(&["baseline", "mobility"]);
//! for name in &selection.unknown {
//!     eprintln!("skipping unknown category {name}");
//! }
//! println!("{} scenarios selected", selection.catalog.scenario_count());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod error;
pub mod scenario;
pub mod suite;

pub use catalog::{ScenarioCatalog, Selection};
pub use error::CatalogError;
pub use scenario::{Category, ScenarioDefinition};
pub use suite::Suite;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
