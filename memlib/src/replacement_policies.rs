use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReplacementPolicyConfig;
use crate::line::LineState;

/// Seed used by the random policy when the configuration doesn't provide one
pub const DEFAULT_SEED: u64 = 1000;

/// A generic trait for implementing new replacement policies. Can be used to parameterise a
/// CacheLevel.
///
/// Recency and frequency are tracked by the cache itself in each slot's [`LineState`], so a policy
/// only has to pick a slot when a set is full
pub trait ReplacementPolicy {
    /// Used by the cache to pick the slot to evict from a full set
    ///
    /// # Arguments
    ///
    /// * `ways`: The states of every slot of the set, in slot order. All of them are valid
    ///
    /// returns: usize, the index of the victim within `ways`
    fn get_victim(&mut self, ways: &[LineState]) -> usize;
}

/// Evicts the slot with the largest age, the one probed most often since it was last touched
#[derive(Debug, Default)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        first_by(ways, |candidate, best| candidate.age > best.age)
    }
}

/// Evicts the most recently touched slot. Only useful as a point of comparison
#[derive(Debug, Default)]
pub struct MostRecentlyUsed;

impl ReplacementPolicy for MostRecentlyUsed {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        first_by(ways, |candidate, best| candidate.age < best.age)
    }
}

/// Least frequently used replacement policy
#[derive(Debug, Default)]
pub struct LeastFrequentlyUsed;

impl ReplacementPolicy for LeastFrequentlyUsed {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        first_by(ways, |candidate, best| candidate.use_count < best.use_count)
    }
}

/// Picks a uniformly random slot of the set. Reproducible for a given seed
#[derive(Debug)]
pub struct Random {
    rng: StdRng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ReplacementPolicy for Random {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        self.rng.gen_range(0..ways.len())
    }
}

/// Always evicts the same slot, a deliberately naive baseline
#[derive(Debug, Default)]
pub struct Constant {
    way: usize,
}

impl Constant {
    pub fn new(way: usize) -> Self {
        Self { way }
    }
}

impl ReplacementPolicy for Constant {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        self.way % ways.len()
    }
}

/// Scans the set in slot order, keeping the first slot which no later slot beats. Ties therefore
/// go to the lowest index
fn first_by(ways: &[LineState], beats: impl Fn(&LineState, &LineState) -> bool) -> usize {
    let mut best = 0;
    let mut index = 1;
    while index < ways.len() {
        if beats(&ways[index], &ways[best]) {
            best = index;
        }
        index += 1;
    }
    best
}

/// Enum for the policies provided by the library, plus an escape hatch for custom ones
///
/// The policy is picked at run time from the configuration. Branching over the known policies
/// keeps the common case free of dynamic dispatch
pub enum GenericPolicy {
    LeastRecentlyUsed(LeastRecentlyUsed),
    MostRecentlyUsed(MostRecentlyUsed),
    LeastFrequentlyUsed(LeastFrequentlyUsed),
    Random(Random),
    Constant(Constant),
    Custom(Box<dyn ReplacementPolicy + Send>),
}

impl GenericPolicy {
    /// Builds the policy named by a configuration. `seed` is only used by the random policy
    pub fn from_config(config: ReplacementPolicyConfig, seed: Option<u64>) -> Self {
        match config {
            ReplacementPolicyConfig::LeastRecentlyUsed => LeastRecentlyUsed.into(),
            ReplacementPolicyConfig::MostRecentlyUsed => MostRecentlyUsed.into(),
            ReplacementPolicyConfig::LeastFrequentlyUsed => LeastFrequentlyUsed.into(),
            ReplacementPolicyConfig::Random => Random::new(seed.unwrap_or(DEFAULT_SEED)).into(),
            ReplacementPolicyConfig::Constant => Constant::default().into(),
        }
    }

    pub fn custom(policy: impl ReplacementPolicy + Send + 'static) -> Self {
        Self::Custom(Box::new(policy))
    }

    pub fn name(&self) -> &'static str {
        match self {
            GenericPolicy::LeastRecentlyUsed(_) => "lru",
            GenericPolicy::MostRecentlyUsed(_) => "mru",
            GenericPolicy::LeastFrequentlyUsed(_) => "lfu",
            GenericPolicy::Random(_) => "random",
            GenericPolicy::Constant(_) => "const",
            GenericPolicy::Custom(_) => "custom",
        }
    }
}

impl From<LeastRecentlyUsed> for GenericPolicy {
    fn from(value: LeastRecentlyUsed) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<MostRecentlyUsed> for GenericPolicy {
    fn from(value: MostRecentlyUsed) -> Self {
        Self::MostRecentlyUsed(value)
    }
}

impl From<LeastFrequentlyUsed> for GenericPolicy {
    fn from(value: LeastFrequentlyUsed) -> Self {
        Self::LeastFrequentlyUsed(value)
    }
}

impl From<Random> for GenericPolicy {
    fn from(value: Random) -> Self {
        Self::Random(value)
    }
}

impl From<Constant> for GenericPolicy {
    fn from(value: Constant) -> Self {
        Self::Constant(value)
    }
}

impl ReplacementPolicy for GenericPolicy {
    fn get_victim(&mut self, ways: &[LineState]) -> usize {
        let victim = match self {
            GenericPolicy::LeastRecentlyUsed(p) => p.get_victim(ways),
            GenericPolicy::MostRecentlyUsed(p) => p.get_victim(ways),
            GenericPolicy::LeastFrequentlyUsed(p) => p.get_victim(ways),
            GenericPolicy::Random(p) => p.get_victim(ways),
            GenericPolicy::Constant(p) => p.get_victim(ways),
            GenericPolicy::Custom(p) => p.get_victim(ways),
        };
        trace!("{} picked way {victim} of {}", self.name(), ways.len());
        victim
    }
}
