use std::num::NonZeroUsize;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use memlib::simulator::SimulationResult;
use memlib::stats::ServiceBreakdown;
use memlib::{Address, Hierarchy, MemError};

/// One pending subdivision of a square of the map
#[derive(Debug, Copy, Clone)]
struct Task {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    scale: i32,
}

/// What happened during one tick: the cost so far and where the accesses of the tick were served
#[derive(Debug, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub total_cost: u64,
    pub served: ServiceBreakdown,
    pub fractions: Vec<f64>,
}

/// Diamond-square height map generator, used as a traffic source for a hierarchy
///
/// Every cell is an element of the hierarchy at `x + y * size`. A host side mirror keeps the
/// values written so the cache contents can be checked afterwards
pub struct HeightMap {
    size: u32,
    tasks: Vec<Task>,
    tasks_per_tick: usize,
    rng: StdRng,
    mirror: Vec<u8>,
    reads: u64,
    writes: u64,
    ticks: u64,
}

impl HeightMap {
    /// Seeds the four corners and queues the first subdivision
    ///
    /// # Arguments
    ///
    /// * `hierarchy`: The hierarchy the map lives in
    /// * `size_exponent`: The map is `2^size_exponent + 1` cells wide and high, and has to fit in
    /// the hierarchy
    /// * `seed`: Seed for the random displacements
    /// * `tasks_per_tick`: Subdivisions done by one call to [`HeightMap::tick`]
    ///
    /// returns: Result<HeightMap, MemError>
    pub fn new(
        hierarchy: &mut Hierarchy,
        size_exponent: u32,
        seed: u64,
        tasks_per_tick: NonZeroUsize,
    ) -> Result<Self, MemError> {
        let cells = 1u64
            .checked_shl(size_exponent)
            .and_then(|edge| edge.checked_add(1))
            .and_then(|size| size.checked_mul(size));
        let last = cells.map_or(u64::MAX, |cells| cells - 1);
        if last >= hierarchy.capacity() {
            return Err(MemError::OutOfRange {
                address: last,
                capacity: hierarchy.memory().size(),
            });
        }
        // Fits, so the side is below 2^32
        let edge = 1u32 << size_exponent;
        let size = edge + 1;
        let mut map = Self {
            size,
            tasks: Vec::with_capacity(512),
            tasks_per_tick: tasks_per_tick.get(),
            rng: StdRng::seed_from_u64(seed),
            mirror: vec![0; size as usize * size as usize],
            reads: 0,
            writes: 0,
            ticks: 0,
        };
        for (x, y) in [(0, 0), (edge, 0), (0, edge), (edge, edge)] {
            let value = map.rng.gen_range(0..255) as u8;
            map.set(hierarchy, x, y, value)?;
        }
        map.tasks.push(Task {
            x1: 0,
            y1: 0,
            x2: edge,
            y2: edge,
            scale: (edge / 2) as i32,
        });
        debug!("height map of {size}x{size} cells, seed {seed}");
        Ok(map)
    }

    pub fn is_done(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Cumulative statistics of the map's own accesses. Take it before [`HeightMap::verify`], whose
    /// reads are counted as hits and misses like any other
    pub fn result(&self, hierarchy: &Hierarchy) -> SimulationResult {
        SimulationResult::collect(hierarchy, self.reads, self.writes)
    }

    /// Runs up to `tasks_per_tick` subdivisions, then reports and resets the interval counters
    pub fn tick(&mut self, hierarchy: &mut Hierarchy) -> Result<TickReport, MemError> {
        for _ in 0..self.tasks_per_tick {
            match self.tasks.pop() {
                Some(task) => self.subdivide(hierarchy, task)?,
                None => break,
            }
        }
        self.ticks += 1;
        let served = hierarchy.service_breakdown();
        let report = TickReport {
            tick: self.ticks,
            total_cost: hierarchy.cumulative_cost(),
            fractions: served.fractions(),
            served,
        };
        info!("tick {}: total memory access cost: {}M cycles", report.tick, report.total_cost / 1_000_000);
        hierarchy.reset_interval_stats();
        Ok(report)
    }

    /// Reads the whole map back without charging for it, returning the number of cells which
    /// differ from what was written
    pub fn verify(&self, hierarchy: &mut Hierarchy) -> Result<usize, MemError> {
        hierarchy.uncharged(|hierarchy| {
            let mut mismatches = 0;
            for y in 0..self.size {
                for x in 0..self.size {
                    let address = self.address(x, y);
                    if hierarchy.read(address)? as u8 != self.mirror[address as usize] {
                        mismatches += 1;
                    }
                }
            }
            Ok(mismatches)
        })
    }

    fn address(&self, x: u32, y: u32) -> Address {
        x as Address + y as Address * self.size as Address
    }

    fn get(&mut self, hierarchy: &mut Hierarchy, x: u32, y: u32) -> Result<i32, MemError> {
        self.reads += 1;
        Ok(hierarchy.read(self.address(x, y))? as u8 as i32)
    }

    fn set(&mut self, hierarchy: &mut Hierarchy, x: u32, y: u32, value: u8) -> Result<(), MemError> {
        let address = self.address(x, y);
        self.writes += 1;
        hierarchy.write(address, value as u32)?;
        self.mirror[address as usize] = value;
        Ok(())
    }

    /// Sets `(x, y)` to the displaced average of `a` and `b`, unless it already holds a value
    fn displace(
        &mut self,
        hierarchy: &mut Hierarchy,
        (x, y): (u32, u32),
        a: (u32, u32),
        b: (u32, u32),
        scale: i32,
    ) -> Result<(), MemError> {
        if self.get(hierarchy, x, y)? != 0 {
            return Ok(());
        }
        let average = (self.get(hierarchy, a.0, a.1)? + self.get(hierarchy, b.0, b.1)?) / 2;
        let value = average + self.rng.gen_range(0..scale) - scale / 2;
        // Cells are bytes, out of range values wrap
        self.set(hierarchy, x, y, value as u8)
    }

    fn subdivide(&mut self, hierarchy: &mut Hierarchy, task: Task) -> Result<(), MemError> {
        let Task { x1, y1, x2, y2, scale } = task;
        if x2 - x1 == 1 {
            return Ok(());
        }
        let (cx, cy) = ((x1 + x2) / 2, (y1 + y2) / 2);
        self.displace(hierarchy, (cx, y1), (x1, y1), (x2, y1), scale)?;
        self.displace(hierarchy, (cx, y2), (x1, y2), (x2, y2), scale)?;
        self.displace(hierarchy, (x1, cy), (x1, y1), (x1, y2), scale)?;
        self.displace(hierarchy, (x2, cy), (x2, y1), (x2, y2), scale)?;
        self.displace(hierarchy, (cx, cy), (x1, y1), (x2, y2), scale)?;
        let scale = scale / 2;
        self.tasks.push(Task { x1, y1, x2: cx, y2: cy, scale });
        self.tasks.push(Task { x1: cx, y1, x2, y2: cy, scale });
        self.tasks.push(Task { x1, y1: cy, x2: cx, y2, scale });
        self.tasks.push(Task { x1: cx, y1: cy, x2, y2, scale });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use memlib::config::{CacheConfig, CacheKindConfig, HierarchyConfig};
    use memlib::{AccessWidth, Hierarchy, MemError};
    use super::HeightMap;

    fn tasks(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn run(config: &HierarchyConfig, seed: u64) -> Result<(Hierarchy, HeightMap, u64), MemError> {
        let mut hierarchy = Hierarchy::new(config)?;
        let mut map = HeightMap::new(&mut hierarchy, 6, seed, tasks(128))?;
        let mut ticks = 0;
        while !map.is_done() {
            map.tick(&mut hierarchy)?;
            ticks += 1;
        }
        Ok((hierarchy, map, ticks))
    }

    #[test]
    fn cache_contents_match_the_mirror() -> Result<(), MemError> {
        let (mut hierarchy, map, ticks) = run(&HierarchyConfig::default(), 1000)?;
        assert!(ticks > 1);
        assert_eq!(map.verify(&mut hierarchy)?, 0);
        Ok(())
    }

    #[test]
    fn result_counts_only_the_map_accesses() -> Result<(), MemError> {
        let (mut hierarchy, map, _) = run(&HierarchyConfig::default(), 1000)?;
        let result = map.result(&hierarchy);
        let top = &result.caches[0];
        assert_eq!(top.hits + top.misses, map.reads() + map.writes());
        assert_eq!(hierarchy.levels()[0].stats().accesses(), map.reads() + map.writes());
        assert_eq!(map.verify(&mut hierarchy)?, 0);
        assert!(hierarchy.levels()[0].stats().accesses() > top.hits + top.misses);
        Ok(())
    }

    #[test]
    fn maps_larger_than_memory_are_rejected() {
        let mut hierarchy = Hierarchy::new(&HierarchyConfig::default()).unwrap();
        // 1025 x 1025 cells don't fit in 1 MiB
        assert!(matches!(
            HeightMap::new(&mut hierarchy, 10, 1, tasks(1)),
            Err(MemError::OutOfRange { address: 1_050_624, .. })
        ));
        for size_exponent in [16, 31, 32, 63, 64, 200] {
            assert!(matches!(
                HeightMap::new(&mut hierarchy, size_exponent, 1, tasks(1)),
                Err(MemError::OutOfRange { .. })
            ));
        }
        assert!(HeightMap::new(&mut hierarchy, 9, 1, tasks(1)).is_ok());
    }

    #[test]
    fn small_caches_write_back_to_memory() -> Result<(), MemError> {
        let config = HierarchyConfig::new(
            64 * 1024,
            vec![CacheConfig::new("L1", 512, CacheKindConfig::TwoWay, 4)],
        )
        .with_width(AccessWidth::Half);
        let (mut hierarchy, map, _) = run(&config, 7)?;
        assert!(hierarchy.levels()[0].stats().writebacks > 0);
        assert_eq!(map.verify(&mut hierarchy)?, 0);
        Ok(())
    }

    #[test]
    fn runs_are_reproducible() -> Result<(), MemError> {
        let (first, first_map, _) = run(&HierarchyConfig::default(), 42)?;
        let (second, second_map, _) = run(&HierarchyConfig::default(), 42)?;
        assert_eq!(first.level_stats(), second.level_stats());
        assert_eq!(first_map.mirror, second_map.mirror);
        assert_eq!((first_map.reads(), first_map.writes()), (second_map.reads(), second_map.writes()));
        Ok(())
    }
}
