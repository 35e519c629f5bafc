use crate::config::{CacheConfig, CacheKindConfig, HierarchyConfig, ReplacementPolicyConfig};

mod properties;

/// A single level cache with cost 1 in front of `memory` bytes, using `line_size` byte lines
fn single_level(
    memory: u64,
    line_size: u64,
    size: u64,
    kind: CacheKindConfig,
    policy: ReplacementPolicyConfig,
) -> HierarchyConfig {
    HierarchyConfig::new(memory, vec![CacheConfig::new("L1", size, kind, 1).with_policy(policy)])
        .with_line_size(line_size)
}

/// Two small levels with 16 byte lines in front of 1 KiB, so that evictions happen early and
/// often in both of them
fn two_level(policy: ReplacementPolicyConfig) -> HierarchyConfig {
    HierarchyConfig::new(
        1024,
        vec![
            CacheConfig::new("L1", 64, CacheKindConfig::TwoWay, 1)
                .with_policy(policy)
                .with_seed(7),
            CacheConfig::new("L2", 128, CacheKindConfig::FourWay, 4)
                .with_policy(policy)
                .with_seed(11),
        ],
    )
    .with_line_size(16)
}
