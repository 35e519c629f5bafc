use serde::{Deserialize, Serialize};

use crate::address::AccessWidth;
use crate::line::LINE_SIZE;
use crate::memory::MEMORY_LATENCY;

/// A hierarchy of one to three caches in front of a backing store. Caches are listed top first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub memory: MemoryConfig,
    #[serde(default = "default_line_size")]
    pub line_size: u64,
    #[serde(default)]
    pub width: AccessWidth,
    /// Count a write miss which fills an empty slot as a hit. This inflates hit ratios during
    /// warm-up, turn it off for exact conservation of accesses across levels
    #[serde(default = "default_true")]
    pub count_fill_as_hit: bool,
    pub caches: Vec<CacheConfig>,
}

/// The backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub size: u64,
    #[serde(default = "default_latency")]
    pub latency: u64,
    #[serde(default = "default_true")]
    pub artificial_delay: bool,
}

/// A configuration for a single cache level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub name: String,
    pub size: u64,
    pub kind: CacheKindConfig,
    pub hit_cost: u64,
    /// Derived from the geometry when absent, checked against it when present
    #[serde(default)]
    pub set_mask: Option<u64>,
    #[serde(default = "ReplacementPolicyConfig::default")]
    pub replacement_policy: ReplacementPolicyConfig,
    /// Seed for the random policy
    #[serde(default)]
    pub seed: Option<u64>,
}

/// The kind of cache - direct, full, or set associative with a given number of ways
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheKindConfig {
    #[serde(alias = "direct")]
    Direct,
    #[serde(alias = "full")]
    Full,
    #[serde(alias = "2way")]
    TwoWay,
    #[serde(alias = "4way")]
    FourWay,
    #[serde(alias = "8way")]
    EightWay,
    #[serde(alias = "16way")]
    SixteenWay,
    #[serde(alias = "ways")]
    Ways(u64),
}

impl CacheKindConfig {
    /// Number of slots per set for a cache holding `lines` lines
    pub fn associativity(&self, lines: u64) -> u64 {
        match self {
            CacheKindConfig::Direct => 1,
            CacheKindConfig::Full => lines,
            CacheKindConfig::TwoWay => 2,
            CacheKindConfig::FourWay => 4,
            CacheKindConfig::EightWay => 8,
            CacheKindConfig::SixteenWay => 16,
            CacheKindConfig::Ways(n) => *n,
        }
    }
}

/// The replacement policy - lru, mru, lfu, random, or const. Defaults to lru.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "mru")]
    MostRecentlyUsed,
    #[serde(alias = "lfu")]
    LeastFrequentlyUsed,
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "const")]
    Constant,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, size: u64, kind: CacheKindConfig, hit_cost: u64) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
            hit_cost,
            set_mask: None,
            replacement_policy: ReplacementPolicyConfig::default(),
            seed: None,
        }
    }

    pub fn with_policy(mut self, policy: ReplacementPolicyConfig) -> Self {
        self.replacement_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_set_mask(mut self, set_mask: u64) -> Self {
        self.set_mask = Some(set_mask);
        self
    }
}

impl HierarchyConfig {
    /// A hierarchy with the given caches in front of `memory_size` bytes of memory, every other
    /// setting at its default
    pub fn new(memory_size: u64, caches: Vec<CacheConfig>) -> Self {
        Self {
            memory: MemoryConfig {
                size: memory_size,
                latency: MEMORY_LATENCY,
                artificial_delay: true,
            },
            line_size: LINE_SIZE,
            width: AccessWidth::default(),
            count_fill_as_hit: true,
            caches,
        }
    }

    pub fn with_line_size(mut self, line_size: u64) -> Self {
        self.line_size = line_size;
        self
    }

    pub fn with_width(mut self, width: AccessWidth) -> Self {
        self.width = width;
        self
    }

    pub fn with_fill_as_hit(mut self, count_fill_as_hit: bool) -> Self {
        self.count_fill_as_hit = count_fill_as_hit;
        self
    }
}

/// 8 KiB 4-way, 16 KiB 8-way and 64 KiB 16-way caches in front of 1 MiB of memory
impl Default for HierarchyConfig {
    fn default() -> Self {
        Self::new(
            1024 * 1024,
            vec![
                CacheConfig::new("L1", 8 * 1024, CacheKindConfig::FourWay, 8),
                CacheConfig::new("L2", 16 * 1024, CacheKindConfig::EightWay, 16),
                CacheConfig::new("L3", 64 * 1024, CacheKindConfig::SixteenWay, 48),
            ],
        )
    }
}

fn default_line_size() -> u64 {
    LINE_SIZE
}

fn default_latency() -> u64 {
    MEMORY_LATENCY
}

fn default_true() -> bool {
    true
}
