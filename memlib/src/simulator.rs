use std::time::{Duration, Instant};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::HierarchyConfig;
use crate::error::{MemError, TraceError};
use crate::hierarchy::Hierarchy;

lazy_static! {
    static ref ACCESS_PATTERN: Regex = Regex::new(
        r"^\s*(?P<op>[RrWw])\s+(?P<address>0[xX][0-9a-fA-F]+|[0-9]+)(?:\s+(?P<value>0[xX][0-9a-fA-F]+|[0-9]+))?\s*$"
    )
    .expect("access pattern is valid");
}

/// A single client access, at the width of the hierarchy it is applied to
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Access {
    Read(Address),
    Write(Address, u32),
}

/// Replays accesses through a hierarchy and counts them
///
/// Traces can be fed in several pieces, the access counters and the simulation time keep
/// accumulating across calls to [`Simulator::simulate`]
pub struct Simulator {
    hierarchy: Hierarchy,
    reads: u64,
    writes: u64,
    simulation_time: Duration,
}

/// The result of a simulation. Every counter is cumulative over the run
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimulationResult {
    pub reads: u64,
    pub writes: u64,
    pub main_memory_reads: u64,
    pub main_memory_writes: u64,
    pub total_cost: u64,
    pub caches: Vec<CacheResult>,
}

/// The result for an individual cache
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct CacheResult {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub cost: u64,
    pub writebacks: u64,
}

impl SimulationResult {
    /// Collects the cumulative counters of a hierarchy after `reads` reads and `writes` writes
    pub fn collect(hierarchy: &Hierarchy, reads: u64, writes: u64) -> Self {
        Self {
            reads,
            writes,
            main_memory_reads: hierarchy.memory().reads(),
            main_memory_writes: hierarchy.memory().writes(),
            total_cost: hierarchy.cumulative_cost(),
            caches: hierarchy
                .levels()
                .iter()
                .map(|level| {
                    let stats = level.stats();
                    CacheResult {
                        name: level.name().to_string(),
                        hits: stats.cumulative_hits,
                        misses: stats.cumulative_misses,
                        cost: stats.cumulative_cost,
                        writebacks: stats.writebacks,
                    }
                })
                .collect(),
        }
    }
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A hierarchy configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, MemError>
    pub fn new(config: &HierarchyConfig) -> Result<Self, MemError> {
        Ok(Self {
            hierarchy: Hierarchy::new(config)?,
            reads: 0,
            writes: 0,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Applies one access, returning the value read, if any. Written values must fit the width of
    /// the hierarchy
    pub fn access(&mut self, access: Access) -> Result<Option<u32>, MemError> {
        match access {
            Access::Read(address) => {
                self.reads += 1;
                self.hierarchy.read(address).map(Some)
            }
            Access::Write(address, value) => {
                let width = self.hierarchy.width();
                if value > width.max_value() {
                    return Err(MemError::ValueTooWide { value, width });
                }
                self.writes += 1;
                self.hierarchy.write(address, value).map(|_| None)
            }
        }
    }

    /// Simulates the hierarchy on a textual trace
    ///
    /// Every line holds `R <address>` or `W <address> <value>`, numbers in decimal or `0x`
    /// prefixed hexadecimal. Blank lines and lines starting with `#` are skipped
    ///
    /// # Arguments
    ///
    /// * `bytes`: The trace
    ///
    /// returns: Result<SimulationResult, TraceError>
    pub fn simulate(&mut self, bytes: &[u8]) -> Result<SimulationResult, TraceError> {
        let start = Instant::now();
        for (index, raw) in bytes.split(|&b| b == b'\n').enumerate() {
            let line = index + 1;
            let entry = std::str::from_utf8(raw).map_err(|_| TraceError::Parse {
                line,
                entry: String::from_utf8_lossy(raw).into_owned(),
            })?;
            let entry = entry.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            let access = parse_access(entry).ok_or_else(|| TraceError::Parse {
                line,
                entry: entry.to_string(),
            })?;
            self.access(access)
                .map_err(|source| TraceError::Access { line, source })?;
        }
        self.simulation_time += start.elapsed();
        debug!("replayed {} reads and {} writes in {:?}", self.reads, self.writes, self.simulation_time);
        Ok(self.result())
    }

    pub fn result(&self) -> SimulationResult {
        SimulationResult::collect(&self.hierarchy, self.reads, self.writes)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of uninitialised lines for each cache
    pub fn get_uninitialised_line_counts(&self) -> Vec<u64> {
        self.hierarchy
            .levels()
            .iter()
            .map(|level| level.uninitialised_line_count() as u64)
            .collect()
    }
}

/// Parses one trace entry
///
/// # Examples
///
/// ```
/// use memlib::simulator::{parse_access, Access};
/// assert_eq!(parse_access("R 0x1F"), Some(Access::Read(31)));
/// assert_eq!(parse_access("w 16 0xBEEF"), Some(Access::Write(16, 0xBEEF)));
/// assert_eq!(parse_access("W 16"), None);
/// ```
pub fn parse_access(entry: &str) -> Option<Access> {
    let captures = ACCESS_PATTERN.captures(entry)?;
    let address = parse_number(captures.name("address")?.as_str())?;
    let value = captures.name("value").map(|value| parse_number(value.as_str()));
    match (captures.name("op")?.as_str(), value) {
        ("R" | "r", None) => Some(Access::Read(address)),
        ("W" | "w", Some(value)) => Some(Access::Write(address, u32::try_from(value?).ok()?)),
        _ => None,
    }
}

/// Parses a decimal or `0x` prefixed hexadecimal number
///
/// # Examples
///
/// ```
/// use memlib::simulator::parse_number;
/// assert_eq!(parse_number("0x0A"), Some(10));
/// assert_eq!(parse_number("10"), Some(10));
/// assert_eq!(parse_number("ten"), None);
/// ```
pub fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
