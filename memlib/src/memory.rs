use std::ops::Range;
use log::debug;

use crate::error::{ConfigError, MemError};
use crate::line::Line;

/// Cost charged for every backing store access while the artificial delay is enabled
pub const MEMORY_LATENCY: u64 = 110;

/// Slow simulated RAM. Reads and writes whole, line aligned lines
///
/// There are no tags and no eviction, a line is addressed directly by `address / line_size`.
/// The store does not keep a cost counter of its own: the latency of an access is returned to the
/// caller, which is charged for it
pub struct BackingStore {
    data: Vec<u8>,
    line_size: u64,
    latency: u64,
    artificial_delay: bool,
    reads: u64,
    writes: u64,
}

impl BackingStore {
    /// Creates a zero initialised store of `size` bytes
    ///
    /// # Arguments
    ///
    /// * `size`: Capacity in bytes, a multiple of the line size
    /// * `line_size`: Line size in bytes, a power of two
    /// * `latency`: Cost of one access while the artificial delay is enabled
    ///
    /// returns: Result<BackingStore, ConfigError>
    pub fn new(size: u64, line_size: u64, latency: u64) -> Result<Self, ConfigError> {
        if !line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo(line_size));
        }
        if size == 0 || size % line_size != 0 {
            return Err(ConfigError::MemorySize { size, line_size });
        }
        debug!("backing store: {size} bytes, {} lines, latency {latency}", size / line_size);
        Ok(Self {
            data: vec![0; size as usize],
            line_size,
            latency,
            artificial_delay: true,
            reads: 0,
            writes: 0,
        })
    }

    /// Reads the line starting at `address`, returning a copy and the cost of the access
    pub fn read(&mut self, address: u64) -> Result<(Line, u64), MemError> {
        let range = self.line_range(address)?;
        self.reads += 1;
        Ok((Line::from(&self.data[range]), self.access_cost()))
    }

    /// Replaces the line starting at `address`, returning the cost of the access
    pub fn write(&mut self, address: u64, line: &Line) -> Result<u64, MemError> {
        let range = self.line_range(address)?;
        debug_assert_eq!(line.len(), range.len());
        self.data[range].copy_from_slice(line.bytes());
        self.writes += 1;
        Ok(self.access_cost())
    }

    /// Inspects a line without charging for it or counting the access
    pub fn line(&self, address: u64) -> Result<&[u8], MemError> {
        let range = self.line_range(address)?;
        Ok(&self.data[range])
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn line_size(&self) -> u64 {
        self.line_size
    }

    pub fn latency(&self) -> u64 {
        self.latency
    }

    pub fn artificial_delay(&self) -> bool {
        self.artificial_delay
    }

    /// Enables or disables charging latency for accesses, returning the previous setting
    pub fn set_artificial_delay(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.artificial_delay, enabled)
    }

    /// Lines read over the whole run
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Lines written over the whole run
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn access_cost(&self) -> u64 {
        if self.artificial_delay {
            self.latency
        } else {
            0
        }
    }

    fn line_range(&self, address: u64) -> Result<Range<usize>, MemError> {
        if address & (self.line_size - 1) != 0 {
            return Err(MemError::MisalignedAccess {
                address,
                line_size: self.line_size,
            });
        }
        if address >= self.size() {
            return Err(MemError::OutOfRange {
                address,
                capacity: self.size(),
            });
        }
        let start = address as usize;
        Ok(start..start + self.line_size as usize)
    }
}
