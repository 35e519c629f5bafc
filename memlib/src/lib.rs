//! # MemLib
//!
//! Memlib is a library for simulating a memory hierarchy: a slow backing store fronted by a chain
//! of one to three set-associative caches
//!
//! Caches hold real data, so reads return what was last written, and dirty lines are written back
//! to the next level when they are evicted. Every level keeps hit, miss and cost counters which can
//! be reset per reporting interval.
//!
//! The simulation is single threaded and deterministic for a fixed access trace and random seed.
//! Sharing a hierarchy between several callers requires external synchronisation.

/// Address types and the tag / set / offset split used by the caches
pub mod address;

/// Contains the implementation of a single cache level
pub mod cache;

/// Contains definitions for the JSON configuration format, and the built in default hierarchy
pub mod config;

/// Error types for configuration, memory accesses and trace replay
pub mod error;

/// Contains the hierarchy, the client facing entry point of the library
pub mod hierarchy;

/// Helpers for reading trace files
pub mod io;

/// Cache lines and per slot bookkeeping
pub mod line;

/// The backing store at the bottom of every hierarchy
pub mod memory;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to replay an access trace through a hierarchy
pub mod simulator;

/// Per level statistics
pub mod stats;

#[cfg(test)]
mod test;

pub use address::{AccessWidth, Address};
pub use config::HierarchyConfig;
pub use error::{ConfigError, MemError};
pub use hierarchy::Hierarchy;
