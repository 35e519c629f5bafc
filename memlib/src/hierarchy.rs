use log::debug;

use crate::address::{AccessWidth, Address};
use crate::cache::{CacheLevel, Next};
use crate::config::HierarchyConfig;
use crate::error::{ConfigError, MemError};
use crate::memory::BackingStore;
use crate::replacement_policies::GenericPolicy;
use crate::stats::{LevelStats, ServiceBreakdown};

/// Most levels a hierarchy may chain in front of the backing store
pub const MAX_LEVELS: usize = 3;

/// A fixed chain of cache levels in front of a backing store
///
/// Clients only ever talk to the top level. A miss is delegated to the next level down, a dirty
/// eviction is written back to the next level down, never skipping one. The remaining levels
/// are only visible through their statistics
pub struct Hierarchy {
    levels: Vec<CacheLevel>,
    memory: BackingStore,
    width: AccessWidth,
}

impl Hierarchy {
    pub fn new(config: &HierarchyConfig) -> Result<Self, MemError> {
        let line_size = config.line_size;
        if !line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo(line_size).into());
        }
        if line_size < AccessWidth::Word.size() {
            return Err(ConfigError::LineTooSmall(line_size).into());
        }
        if config.caches.is_empty() || config.caches.len() > MAX_LEVELS {
            return Err(ConfigError::LevelCount(config.caches.len()).into());
        }
        let mut memory = BackingStore::new(config.memory.size, line_size, config.memory.latency)?;
        memory.set_artificial_delay(config.memory.artificial_delay);
        let levels = config
            .caches
            .iter()
            .map(|cache| {
                let policy = GenericPolicy::from_config(cache.replacement_policy, cache.seed);
                CacheLevel::new(cache, line_size, config.width, config.count_fill_as_hit, policy)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("hierarchy of {} levels, {} accesses", levels.len(), config.width);
        Ok(Self {
            levels,
            memory,
            width: config.width,
        })
    }

    /// Reads an element of the configured width
    pub fn read(&mut self, address: Address) -> Result<u32, MemError> {
        self.check_address(address)?;
        self.with_top(|top, next| top.read(next, address))
    }

    /// Writes an element of the configured width. Bits above the width are discarded
    pub fn write(&mut self, address: Address, value: u32) -> Result<(), MemError> {
        self.check_address(address)?;
        self.with_top(|top, next| top.write(next, address, value))
    }

    pub fn read_byte(&mut self, address: Address) -> Result<u8, MemError> {
        self.check_width(AccessWidth::Byte)?;
        Ok(self.read(address)? as u8)
    }

    pub fn write_byte(&mut self, address: Address, value: u8) -> Result<(), MemError> {
        self.check_width(AccessWidth::Byte)?;
        self.write(address, value as u32)
    }

    pub fn read16(&mut self, address: Address) -> Result<u16, MemError> {
        self.check_width(AccessWidth::Half)?;
        Ok(self.read(address)? as u16)
    }

    pub fn write16(&mut self, address: Address, value: u16) -> Result<(), MemError> {
        self.check_width(AccessWidth::Half)?;
        self.write(address, value as u32)
    }

    pub fn read32(&mut self, address: Address) -> Result<u32, MemError> {
        self.check_width(AccessWidth::Word)?;
        self.read(address)
    }

    pub fn write32(&mut self, address: Address, value: u32) -> Result<(), MemError> {
        self.check_width(AccessWidth::Word)?;
        self.write(address, value)
    }

    /// Writes every dirty line down to the backing store, top level first
    pub fn flush(&mut self) -> Result<(), MemError> {
        for index in 0..self.levels.len() {
            let (upper, lower) = self.levels.split_at_mut(index + 1);
            let mut next = Next::new(lower, &mut self.memory);
            upper[index].flush(&mut next)?;
        }
        Ok(())
    }

    /// Runs `f` without charging memory latency, then restores the delay setting and the cost
    /// counters of every level. Hit and miss counters, and the cache contents, are not restored
    pub fn uncharged<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let delay = self.memory.set_artificial_delay(false);
        let costs = self.levels.iter().map(|level| level.stats().costs()).collect::<Vec<_>>();
        let result = f(self);
        for (level, cost) in self.levels.iter_mut().zip(costs) {
            level.stats_mut().restore_costs(cost);
        }
        self.memory.set_artificial_delay(delay);
        result
    }

    /// Enables or disables charging memory latency, returning the previous setting
    pub fn set_artificial_delay(&mut self, enabled: bool) -> bool {
        self.memory.set_artificial_delay(enabled)
    }

    pub fn levels(&self) -> &[CacheLevel] {
        &self.levels
    }

    pub fn level_stats(&self) -> Vec<LevelStats> {
        self.levels.iter().map(|level| *level.stats()).collect()
    }

    pub fn memory(&self) -> &BackingStore {
        &self.memory
    }

    pub fn width(&self) -> AccessWidth {
        self.width
    }

    /// Number of addressable elements of the configured width
    pub fn capacity(&self) -> u64 {
        self.memory.size() / self.width.size()
    }

    /// Cost of the current interval over all levels
    pub fn total_cost(&self) -> u64 {
        self.levels.iter().map(|level| level.stats().total_cost).sum()
    }

    pub fn cumulative_cost(&self) -> u64 {
        self.levels.iter().map(|level| level.stats().cumulative_cost).sum()
    }

    /// Where the accesses of the current interval were served
    pub fn service_breakdown(&self) -> ServiceBreakdown {
        ServiceBreakdown {
            level_hits: self.levels.iter().map(|level| level.stats().hits).collect(),
            memory: self.levels.last().map_or(0, |level| level.stats().misses),
        }
    }

    /// Starts a new reporting interval on every level
    pub fn reset_interval_stats(&mut self) {
        for level in &mut self.levels {
            level.stats_mut().reset_interval();
        }
    }

    fn with_top<T>(
        &mut self,
        f: impl FnOnce(&mut CacheLevel, &mut Next<'_>) -> Result<T, MemError>,
    ) -> Result<T, MemError> {
        let (top, rest) = self
            .levels
            .split_first_mut()
            .ok_or(ConfigError::LevelCount(0))?;
        let mut next = Next::new(rest, &mut self.memory);
        f(top, &mut next)
    }

    fn check_width(&self, requested: AccessWidth) -> Result<(), MemError> {
        if requested != self.width {
            return Err(MemError::WidthMismatch {
                configured: self.width,
                requested,
            });
        }
        Ok(())
    }

    fn check_address(&self, address: Address) -> Result<(), MemError> {
        if address >= self.capacity() {
            return Err(MemError::OutOfRange {
                address,
                capacity: self.memory.size(),
            });
        }
        Ok(())
    }
}
