use serde::{Deserialize, Serialize};

/// Counters for a single cache level
///
/// `hits`, `misses` and `total_cost` cover the current reporting interval and are reset by
/// [`LevelStats::reset_interval`]. The cumulative counters are monotonic for the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub hits: u64,
    pub misses: u64,
    pub total_cost: u64,
    pub cumulative_hits: u64,
    pub cumulative_misses: u64,
    pub cumulative_cost: u64,
    /// Dirty lines this level wrote back to the next level
    pub writebacks: u64,
}

impl LevelStats {
    pub(crate) fn record_hit(&mut self, cost: u64) {
        self.hits += 1;
        self.cumulative_hits += 1;
        self.charge(cost);
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
        self.cumulative_misses += 1;
    }

    pub(crate) fn charge(&mut self, cost: u64) {
        self.total_cost += cost;
        self.cumulative_cost += cost;
    }

    pub(crate) fn costs(&self) -> (u64, u64) {
        (self.total_cost, self.cumulative_cost)
    }

    pub(crate) fn restore_costs(&mut self, (total_cost, cumulative_cost): (u64, u64)) {
        self.total_cost = total_cost;
        self.cumulative_cost = cumulative_cost;
    }

    /// Starts a new reporting interval
    pub fn reset_interval(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.total_cost = 0;
    }

    /// Demand lookups over the whole run
    pub fn accesses(&self) -> u64 {
        self.cumulative_hits + self.cumulative_misses
    }

    /// Cumulative hit ratio, 0 before the first lookup
    pub fn hit_ratio(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            n => self.cumulative_hits as f64 / n as f64,
        }
    }
}

/// Where the accesses of an interval were served: hits per level, top first, and the misses of
/// the bottom level which went to memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBreakdown {
    pub level_hits: Vec<u64>,
    pub memory: u64,
}

impl ServiceBreakdown {
    pub fn total(&self) -> u64 {
        self.level_hits.iter().sum::<u64>() + self.memory
    }

    /// Share of the total served by each level, followed by memory. Empty intervals give zeros
    pub fn fractions(&self) -> Vec<f64> {
        let total = self.total();
        self.level_hits
            .iter()
            .chain(std::iter::once(&self.memory))
            .map(|&n| if total == 0 { 0.0 } else { n as f64 / total as f64 })
            .collect()
    }
}
