//! Core types for the runner
//!
//! Defines the matrix dimensions and the run clock:
//! - Link-selection strategies and transport protocols
//! - The canonical axis order used for expansion
//! - The run start timestamp and the seed base derived from it

use crate::error::RunnerError;
use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Link-selection strategy exercised by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Cycle through links
    #[serde(rename = "RoundRobin")]
    RoundRobin,
    /// Pick the currently best link
    #[serde(rename = "Greedy")]
    Greedy,
    /// Prefer the most reliable link
    #[serde(rename = "Reliability")]
    Reliability,
    /// SLA-aware multi-link operation
    #[serde(rename = "SLA-MLO")]
    SlaMlo,
}

impl Strategy {
    /// All strategies in canonical order
    pub const ALL: [Strategy; 4] = [
        Strategy::RoundRobin,
        Strategy::Greedy,
        Strategy::Reliability,
        Strategy::SlaMlo,
    ];

    /// Name passed to the simulator
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::RoundRobin => "RoundRobin",
            Strategy::Greedy => "Greedy",
            Strategy::Reliability => "Reliability",
            Strategy::SlaMlo => "SLA-MLO",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RunnerError::InvalidSelection {
                axis: "strategy",
                value: s.to_string(),
                expected: "RoundRobin, Greedy, Reliability, SLA-MLO",
            })
    }
}

/// Transport protocol exercised by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// UDP flows only
    #[serde(rename = "UDP")]
    Udp,
    /// TCP flows only
    #[serde(rename = "TCP")]
    Tcp,
    /// Alternating UDP and TCP flows
    #[serde(rename = "Mixed")]
    Mixed,
}

impl Protocol {
    /// All protocols in canonical order
    pub const ALL: [Protocol; 3] = [Protocol::Udp, Protocol::Tcp, Protocol::Mixed];

    /// Name passed to the simulator
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RunnerError::InvalidSelection {
                axis: "protocol",
                value: s.to_string(),
                expected: "UDP, TCP, Mixed",
            })
    }
}

/// Canonical strategy and protocol order
///
/// Passed into the scheduler explicitly instead of living in a global table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAxes {
    /// Strategies in expansion order
    pub strategies: Vec<Strategy>,
    /// Protocols in expansion order
    pub protocols: Vec<Protocol>,
}

impl MatrixAxes {
    /// Axes restricted to a selection
    ///
    /// `None` keeps the full axis. Selected values are deduplicated and put
    /// back into this value's order; values this axis does not contain are
    /// dropped.
    #[must_use]
    pub fn restrict(
        &self,
        strategies: Option<&[Strategy]>,
        protocols: Option<&[Protocol]>,
    ) -> MatrixAxes {
        MatrixAxes {
            strategies: restrict_axis(&self.strategies, strategies),
            protocols: restrict_axis(&self.protocols, protocols),
        }
    }

    /// Number of (strategy, protocol) cells per scenario
    #[inline]
    #[must_use]
    pub fn cells_per_scenario(&self) -> usize {
        self.strategies.len() * self.protocols.len()
    }
}

impl Default for MatrixAxes {
    fn default() -> Self {
        Self {
            strategies: Strategy::ALL.to_vec(),
            protocols: Protocol::ALL.to_vec(),
        }
    }
}

fn restrict_axis<T: Copy + PartialEq>(canonical: &[T], selected: Option<&[T]>) -> Vec<T> {
    match selected {
        None => canonical.to_vec(),
        Some(selected) => canonical
            .iter()
            .copied()
            .filter(|v| selected.contains(v))
            .collect(),
    }
}

/// Start time of one orchestration run
///
/// Names log artifacts and seeds the per-run seed counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    started_at: DateTime<Local>,
}

impl RunClock {
    /// Clock started now
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self {
            started_at: Local::now(),
        }
    }

    /// Clock started at a fixed instant
    #[inline]
    #[must_use]
    pub fn at(started_at: DateTime<Local>) -> Self {
        Self { started_at }
    }

    /// Start instant
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// `YYYYMMDD_HHMMSS`, used in log file names
    #[must_use]
    pub fn label(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Seed counter start: the start time's `HHMMSS` read as a number
    ///
    /// Seeds are only unique within one run. Two runs started `n` seconds
    /// apart reuse each other's seeds once a plan has more than `n` cells,
    /// and runs on different days can start from the same base.
    #[must_use]
    pub fn seed_base(&self) -> u64 {
        let t = self.started_at.time();
        u64::from(t.hour()) * 10_000 + u64::from(t.minute()) * 100 + u64::from(t.second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strategy_wire_names() {
        assert_eq!(Strategy::SlaMlo.to_string(), "SLA-MLO");
        assert_eq!("sla-mlo".parse::<Strategy>().unwrap(), Strategy::SlaMlo);
        assert_eq!("RoundRobin".parse::<Strategy>().unwrap(), Strategy::RoundRobin);
        assert!("Random".parse::<Strategy>().is_err());
    }

    #[test]
    fn protocol_wire_names() {
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!("mixed".parse::<Protocol>().unwrap(), Protocol::Mixed);
        assert!(matches!(
            "QUIC".parse::<Protocol>(),
            Err(RunnerError::InvalidSelection { axis: "protocol", .. })
        ));
    }

    #[test]
    fn restrict_keeps_canonical_order_and_dedups() {
        let axes = MatrixAxes::default();
        let restricted = axes.restrict(
            Some(&[Strategy::SlaMlo, Strategy::RoundRobin, Strategy::SlaMlo]),
            None,
        );

        assert_eq!(restricted.strategies, vec![Strategy::RoundRobin, Strategy::SlaMlo]);
        assert_eq!(restricted.protocols, Protocol::ALL.to_vec());
        assert_eq!(restricted.cells_per_scenario(), 6);
    }

    #[test]
    fn run_clock_label_and_seed_base() {
        let clock = RunClock::at(Local.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap());
        assert_eq!(clock.label(), "20250307_140509");
        assert_eq!(clock.seed_base(), 140_509);
    }
}
