use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use memlib::config::{HierarchyConfig, ReplacementPolicyConfig};
use memlib::simulator::{Access, Simulator};

const ACCESSES: usize = 100_000;

/// A mix of streaming writes and random reads over the first 512 KiB
fn trace(seed: u64) -> Vec<Access> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..ACCESSES)
        .map(|i| {
            if i % 4 == 0 {
                Access::Write((i as u64 * 7) % (512 * 1024), rng.gen_range(0..256))
            } else {
                Access::Read(rng.gen_range(0..512 * 1024))
            }
        })
        .collect()
}

/// Replays the same trace through the default hierarchy with every policy
pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Policies");
    let accesses = trace(1000);
    for policy in [
        ReplacementPolicyConfig::LeastRecentlyUsed,
        ReplacementPolicyConfig::MostRecentlyUsed,
        ReplacementPolicyConfig::LeastFrequentlyUsed,
        ReplacementPolicyConfig::Random,
        ReplacementPolicyConfig::Constant,
    ] {
        let mut config = HierarchyConfig::default();
        for cache in &mut config.caches {
            cache.replacement_policy = policy;
        }
        group.bench_with_input(BenchmarkId::new("Default hierarchy", format!("{policy:?}")), &config, |bench, conf| {
            bench.iter(|| {
                let mut simulator = Simulator::new(conf).unwrap();
                for &access in &accesses {
                    simulator.access(access).unwrap();
                }
            });
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
