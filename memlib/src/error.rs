use thiserror::Error;

use crate::address::{AccessWidth, Address};

/// Errors raised by memory accesses. None of these are recoverable, they signal a defect in the
/// caller rather than a condition of the simulated hardware
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemError {
    #[error("address {address:#x} is not aligned to a {line_size} byte line")]
    MisalignedAccess { address: u64, line_size: u64 },

    #[error("address {address:#x} is outside of the {capacity} byte backing store")]
    OutOfRange { address: Address, capacity: u64 },

    #[error("{requested} access on a hierarchy configured for {configured} accesses")]
    WidthMismatch {
        configured: AccessWidth,
        requested: AccessWidth,
    },

    #[error("value {value:#x} does not fit a {width} element")]
    ValueTooWide { value: u32, width: AccessWidth },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Geometry problems detected while building a hierarchy. Values are never silently coerced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("line size {0} is not a power of two")]
    LineSizeNotPowerOfTwo(u64),

    #[error("line size {0} can't hold a 32-bit element")]
    LineTooSmall(u64),

    #[error("a hierarchy needs between 1 and 3 cache levels, got {0}")]
    LevelCount(usize),

    #[error("backing store size {size} is not a non-zero multiple of the {line_size} byte line size")]
    MemorySize { size: u64, line_size: u64 },

    #[error("cache {name}: size {size} is not a non-zero multiple of the {line_size} byte line size")]
    CacheSize { name: String, size: u64, line_size: u64 },

    #[error("cache {name}: associativity {associativity} does not divide its {lines} lines")]
    Associativity {
        name: String,
        associativity: u64,
        lines: u64,
    },

    #[error("cache {name}: {sets} sets is not a power of two")]
    SetCount { name: String, sets: u64 },

    #[error("cache {name}: set mask {actual:#x} does not match the geometry, expected {expected:#x}")]
    SetMask {
        name: String,
        expected: u64,
        actual: u64,
    },
}

/// Errors from replaying a textual trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: couldn't parse trace entry {entry:?}")]
    Parse { line: usize, entry: String },

    #[error("line {line}: {source}")]
    Access { line: usize, source: MemError },
}
