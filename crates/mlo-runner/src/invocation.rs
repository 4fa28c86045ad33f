//! Invocation construction
//!
//! Turns one matrix cell (category, scenario, strategy, protocol, seed) into a
//! fully specified simulator process: program, argument vector, a printable
//! command string and a run identifier. Construction is pure; nothing here
//! touches the filesystem or spawns anything.

use crate::types::{Protocol, Strategy};
use mlo_catalog::ScenarioDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How the simulator is reached
///
/// With a `target` (the ns-3 layout) the command becomes
/// `./ns3 run 'mlo_simulator --flag=.. <params>'`: target, flags and scenario
/// parameters travel as one argument. Without a target the flags and
/// parameter tokens are separate arguments of `program`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorEntry {
    /// Executable to spawn
    pub program: PathBuf,
    /// Arguments placed before the simulator arguments
    pub launcher_args: Vec<String>,
    /// Program name the launcher runs; empty means none
    pub target: Option<String>,
    /// Value of the `--verbose` flag
    pub verbose: u8,
}

impl SimulatorEntry {
    /// Entry that runs `program` directly with separate arguments
    #[must_use]
    pub fn direct(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            launcher_args: Vec::new(),
            target: None,
            verbose: 1,
        }
    }

    /// With launcher arguments
    #[inline]
    #[must_use]
    pub fn with_launcher_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// With launcher target
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Effective target, ignoring an empty string
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

impl Default for SimulatorEntry {
    fn default() -> Self {
        Self::direct("./ns3")
            .with_launcher_args(["run"])
            .with_target("mlo_simulator")
    }
}

/// Run identifier, unique within one run and safe as a file name component
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Render `{category}_{scenario}_{strategy}_{protocol}_{seed}`
    #[must_use]
    pub fn new(
        category: &str,
        scenario: &str,
        strategy: Strategy,
        protocol: Protocol,
        seed: u64,
    ) -> Self {
        let raw = format!("{category}_{scenario}_{strategy}_{protocol}_{seed}");
        Self(raw.replace(['/', '\\'], "-"))
    }

    /// Identifier as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fully specified simulator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Category name
    pub category: String,
    /// Scenario being run
    pub scenario: ScenarioDefinition,
    /// Strategy under test
    pub strategy: Strategy,
    /// Protocol under test
    pub protocol: Protocol,
    /// Seed, also used as the run number
    pub seed: u64,
    /// Executable to spawn
    pub program: PathBuf,
    /// Arguments passed to `program`
    pub args: Vec<String>,
    /// Printable command line
    pub command: String,
    /// Unique run identifier
    pub run_id: RunId,
    /// Scenario description
    pub description: String,
}

/// Builds invocations against one simulator entry and result file
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    entry: SimulatorEntry,
    result_file: PathBuf,
}

impl InvocationBuilder {
    /// Create a builder
    #[inline]
    #[must_use]
    pub fn new(entry: SimulatorEntry, result_file: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            result_file: result_file.into(),
        }
    }

    /// Shared result file every simulator appends to
    #[inline]
    #[must_use]
    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// Build the invocation for one matrix cell
    ///
    /// The scenario parameter string is appended verbatim after the
    /// orchestration flags and is never validated.
    #[must_use]
    pub fn build(
        &self,
        category: &str,
        scenario: &ScenarioDefinition,
        strategy: Strategy,
        protocol: Protocol,
        seed: u64,
    ) -> Invocation {
        let mut sim_args = vec![
            format!("--strategy={strategy}"),
            format!("--protocol={protocol}"),
            format!("--seed={seed}"),
            format!("--csvFile={}", self.result_file.display()),
            format!("--scenario={category}_{}", scenario.name),
            format!("--runNumber={seed}"),
            format!("--verbose={}", self.entry.verbose),
        ];
        sim_args.extend(scenario.parameter_tokens().map(str::to_string));

        let mut args = self.entry.launcher_args.clone();
        let mut command = self.entry.program.display().to_string();
        for arg in &self.entry.launcher_args {
            command.push(' ');
            command.push_str(arg);
        }

        match self.entry.target() {
            Some(target) => {
                let inner = std::iter::once(target.to_string())
                    .chain(sim_args)
                    .collect::<Vec<_>>()
                    .join(" ");
                command.push_str(" '");
                command.push_str(&inner);
                command.push('\'');
                args.push(inner);
            }
            None => {
                for arg in &sim_args {
                    command.push(' ');
                    command.push_str(arg);
                }
                args.extend(sim_args);
            }
        }

        Invocation {
            category: category.to_string(),
            scenario: scenario.clone(),
            strategy,
            protocol,
            seed,
            program: self.entry.program.clone(),
            args,
            command,
            run_id: RunId::new(category, &scenario.name, strategy, protocol, seed),
            description: scenario.description.clone(),
        }
    }
}
