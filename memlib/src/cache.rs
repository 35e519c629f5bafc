use std::ops::Range;
use log::{debug, trace};

use crate::address::{AccessWidth, Address, AddressLayout};
use crate::config::CacheConfig;
use crate::error::{ConfigError, MemError};
use crate::line::{Line, LineState};
use crate::memory::BackingStore;
use crate::replacement_policies::{GenericPolicy, ReplacementPolicy};
use crate::stats::LevelStats;

/// Everything below a cache level: the remaining levels, top first, and the backing store
///
/// A level only ever talks to the first link, so misses and write-backs never skip a level
pub(crate) struct Next<'a> {
    levels: &'a mut [CacheLevel],
    memory: &'a mut BackingStore,
}

impl<'a> Next<'a> {
    pub(crate) fn new(levels: &'a mut [CacheLevel], memory: &'a mut BackingStore) -> Self {
        Self { levels, memory }
    }

    /// Fetches the line holding `address`, returning it with the cost the caller is charged.
    /// Only the backing store charges the caller, a cache level accounts for its own costs
    fn read_line(&mut self, address: Address, layout: &AddressLayout) -> Result<(Line, u64), MemError> {
        match self.levels.split_first_mut() {
            Some((level, rest)) => {
                let mut next = Next::new(rest, &mut *self.memory);
                Ok((level.read_line(&mut next, address)?, 0))
            }
            None => self.memory.read(layout.line_byte_address(address)),
        }
    }

    /// Writes back a whole line, returning the cost the caller is charged
    fn write_line(&mut self, address: Address, line: &Line, layout: &AddressLayout) -> Result<u64, MemError> {
        match self.levels.split_first_mut() {
            Some((level, rest)) => {
                let mut next = Next::new(rest, &mut *self.memory);
                level.write_line(&mut next, address, line)?;
                Ok(0)
            }
            None => self.memory.write(layout.line_byte_address(address), line),
        }
    }
}

/// How a line got its slot
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Fill {
    Empty,
    Evicted,
}

/// A set-associative cache level holding real data, parameterised by a replacement policy
///
/// Slots are stored in one contiguous buffer indexed by `(set, way)`, with a parallel array of
/// [`LineState`]s. Every probe of a set ages all of its slots, a hit or install resets the age
/// of the touched slot and bumps its use count.
///
/// The level is write-back and write-allocate: writes only mark the slot dirty, dirty victims
/// are written to the next level when evicted, and a write miss fetches the rest of the line
/// before modifying it. Direct mapped caches are the one way case, fully associative caches the
/// one set case
pub struct CacheLevel<R: ReplacementPolicy = GenericPolicy> {
    name: String,
    layout: AddressLayout,
    line_size: usize,
    num_sets: usize,
    associativity: usize,
    hit_cost: u64,
    count_fill_as_hit: bool,
    states: Vec<LineState>,
    data: Vec<u8>,
    replacement_policy: R,
    stats: LevelStats,
}

impl<R: ReplacementPolicy> CacheLevel<R> {
    /// Creates an empty cache level
    ///
    /// # Arguments
    ///
    /// * `config`: Size, kind, hit cost and optional set mask of the level
    /// * `line_size`: Line size shared by the whole hierarchy, a power of two of at least 4 bytes
    /// * `width`: The access width of the hierarchy, which picks the tag and offset masks
    /// * `count_fill_as_hit`: Whether a write filling an empty slot counts as a hit
    /// * `policy`: The replacement policy
    ///
    /// returns: Result<CacheLevel<R>, ConfigError>
    pub fn new(
        config: &CacheConfig,
        line_size: u64,
        width: AccessWidth,
        count_fill_as_hit: bool,
        policy: R,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        if !line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo(line_size));
        }
        if line_size < AccessWidth::Word.size() {
            return Err(ConfigError::LineTooSmall(line_size));
        }
        if config.size == 0 || config.size % line_size != 0 {
            return Err(ConfigError::CacheSize { name, size: config.size, line_size });
        }
        let lines = config.size / line_size;
        let associativity = config.kind.associativity(lines);
        if associativity == 0 || lines % associativity != 0 {
            return Err(ConfigError::Associativity { name, associativity, lines });
        }
        let sets = lines / associativity;
        if !sets.is_power_of_two() {
            return Err(ConfigError::SetCount { name, sets });
        }
        let expected = (sets - 1) << line_size.trailing_zeros();
        let set_mask = config.set_mask.unwrap_or(expected);
        if set_mask != expected {
            return Err(ConfigError::SetMask { name, expected, actual: set_mask });
        }
        debug!("{name}: {sets} sets of {associativity} ways, set mask {set_mask:#x}, hit cost {}", config.hit_cost);
        Ok(Self {
            name,
            layout: AddressLayout::new(width, line_size, set_mask),
            line_size: line_size as usize,
            num_sets: sets as usize,
            associativity: associativity as usize,
            hit_cost: config.hit_cost,
            count_fill_as_hit,
            states: vec![LineState::default(); lines as usize],
            data: vec![0; config.size as usize],
            replacement_policy: policy,
            stats: LevelStats::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn hit_cost(&self) -> u64 {
        self.hit_cost
    }

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut LevelStats {
        &mut self.stats
    }

    /// The slot states of one set, in way order
    pub fn set_states(&self, set: usize) -> &[LineState] {
        &self.states[self.set_range(set)]
    }

    /// Whether the line holding `address` is present, without touching any state
    pub fn contains(&self, address: Address) -> bool {
        let tag = self.layout.tag(address);
        self.set_states(self.layout.set_index(address))
            .iter()
            .any(|state| state.valid && state.tag == tag)
    }

    /// Gets the number of slots which never received a line. Useful for analysing cache
    /// performance or debugging
    pub fn uninitialised_line_count(&self) -> usize {
        self.states.iter().filter(|state| !state.valid).count()
    }

    pub(crate) fn read(&mut self, next: &mut Next<'_>, address: Address) -> Result<u32, MemError> {
        let set = self.layout.set_index(address);
        let offset = self.layout.byte_offset(address);
        let width = self.layout.width();
        if let Some(slot) = self.probe(set, address) {
            self.hit(slot);
            return Ok(width.load(self.slot_bytes(slot), offset));
        }
        self.stats.record_miss();
        let line = self.fetch(next, address)?;
        self.install(next, set, address, line.bytes(), false)?;
        Ok(width.load(line.bytes(), offset))
    }

    pub(crate) fn write(&mut self, next: &mut Next<'_>, address: Address, value: u32) -> Result<(), MemError> {
        let set = self.layout.set_index(address);
        let offset = self.layout.byte_offset(address);
        let width = self.layout.width();
        if let Some(slot) = self.probe(set, address) {
            width.store(self.slot_bytes_mut(slot), offset, value);
            self.states[slot].dirty = true;
            self.hit(slot);
            return Ok(());
        }
        let mut line = self.fetch(next, address)?;
        width.store(line.bytes_mut(), offset, value);
        match self.install(next, set, address, line.bytes(), true)? {
            Fill::Empty if self.count_fill_as_hit => self.stats.record_hit(self.hit_cost),
            Fill::Empty => {
                self.stats.record_miss();
                self.stats.charge(self.hit_cost);
            }
            Fill::Evicted => self.stats.record_miss(),
        }
        Ok(())
    }

    /// Returns the whole line holding `address`, fetching and installing it on a miss
    pub(crate) fn read_line(&mut self, next: &mut Next<'_>, address: Address) -> Result<Line, MemError> {
        let set = self.layout.set_index(address);
        if let Some(slot) = self.probe(set, address) {
            self.hit(slot);
            return Ok(Line::from(self.slot_bytes(slot)));
        }
        self.stats.record_miss();
        let line = self.fetch(next, address)?;
        self.install(next, set, address, line.bytes(), false)?;
        Ok(line)
    }

    /// Accepts a line written back by the level above. The whole line is supplied, so a miss
    /// installs it without fetching anything. Write-backs are not demand lookups, they are charged
    /// but not counted as hits or misses
    pub(crate) fn write_line(&mut self, next: &mut Next<'_>, address: Address, line: &Line) -> Result<(), MemError> {
        let set = self.layout.set_index(address);
        match self.probe(set, address) {
            Some(slot) => {
                self.slot_bytes_mut(slot).copy_from_slice(line.bytes());
                self.states[slot].dirty = true;
                self.touch(slot);
            }
            None => {
                self.install(next, set, address, line.bytes(), true)?;
            }
        }
        self.stats.charge(self.hit_cost);
        Ok(())
    }

    /// Writes every dirty line back to the next level, leaving them valid and clean
    pub(crate) fn flush(&mut self, next: &mut Next<'_>) -> Result<(), MemError> {
        for slot in 0..self.states.len() {
            self.write_back(next, slot)?;
        }
        Ok(())
    }

    fn set_range(&self, set: usize) -> Range<usize> {
        let lower = set * self.associativity;
        lower..lower + self.associativity
    }

    fn slot_bytes(&self, slot: usize) -> &[u8] {
        &self.data[slot * self.line_size..(slot + 1) * self.line_size]
    }

    fn slot_bytes_mut(&mut self, slot: usize) -> &mut [u8] {
        &mut self.data[slot * self.line_size..(slot + 1) * self.line_size]
    }

    /// Ages every slot of the set and returns the slot holding `address`, if any
    fn probe(&mut self, set: usize, address: Address) -> Option<usize> {
        let tag = self.layout.tag(address);
        let mut found = None;
        for slot in self.set_range(set) {
            let state = &mut self.states[slot];
            state.age = state.age.saturating_add(1);
            if found.is_none() && state.valid && state.tag == tag {
                found = Some(slot);
            }
        }
        found
    }

    fn touch(&mut self, slot: usize) {
        let state = &mut self.states[slot];
        state.age = 0;
        state.use_count = state.use_count.saturating_add(1);
    }

    fn hit(&mut self, slot: usize) {
        self.stats.record_hit(self.hit_cost);
        self.touch(slot);
    }

    fn fetch(&mut self, next: &mut Next<'_>, address: Address) -> Result<Line, MemError> {
        let (line, cost) = next.read_line(address, &self.layout)?;
        self.stats.charge(cost);
        Ok(line)
    }

    /// Places a line in `set`, preferring an empty slot and otherwise evicting the policy's victim
    fn install(
        &mut self,
        next: &mut Next<'_>,
        set: usize,
        address: Address,
        bytes: &[u8],
        dirty: bool,
    ) -> Result<Fill, MemError> {
        let range = self.set_range(set);
        let (slot, fill) = match range.clone().find(|&slot| !self.states[slot].valid) {
            Some(slot) => (slot, Fill::Empty),
            None => {
                let way = self.replacement_policy.get_victim(&self.states[range.clone()]);
                let slot = range.start + way % self.associativity;
                self.write_back(next, slot)?;
                (slot, Fill::Evicted)
            }
        };
        self.slot_bytes_mut(slot).copy_from_slice(bytes);
        let state = &mut self.states[slot];
        state.tag = self.layout.tag(address);
        state.valid = true;
        state.dirty = dirty;
        self.touch(slot);
        Ok(fill)
    }

    /// Writes a dirty slot to the next level and marks it clean. Clean or empty slots are skipped
    fn write_back(&mut self, next: &mut Next<'_>, slot: usize) -> Result<(), MemError> {
        let state = self.states[slot];
        if !(state.valid && state.dirty) {
            return Ok(());
        }
        trace!("{}: writing back line {:#x}", self.name, state.tag);
        let line = Line::from(self.slot_bytes(slot));
        let cost = next.write_line(state.tag, &line, &self.layout)?;
        self.stats.charge(cost);
        self.stats.writebacks += 1;
        self.states[slot].dirty = false;
        Ok(())
    }
}
