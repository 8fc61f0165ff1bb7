//! Benchmarks for game sessions and the generational loop.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use flappy_evolve::{
    compute::{
        FeedForwardNetwork, GenerationSession, HeadlessRenderer, Policy,
        evolution::{EvolutionEngine, GenerationSummary, GenomeRng},
    },
    schema::{
        EvolutionConfig, GameConfig, GenomeConstraints, NetworkConfig, OBSERVATION_SIZE,
        PopulationConfig, RewardConfig, SessionConfig,
    },
};

fn networks(count: usize, seed: u64) -> Vec<FeedForwardNetwork> {
    let network = NetworkConfig::default();
    let constraints = GenomeConstraints::default();
    let mut rng = GenomeRng::new(seed);

    (0..count)
        .filter_map(|_| {
            let genome = rng.random_genome(&network, &constraints);
            FeedForwardNetwork::from_genome(&genome, network.activation).ok()
        })
        .collect()
}

fn bench_session_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_run");
    let session = SessionConfig {
        max_ticks: Some(2_000),
        random_seed: Some(7),
        ..Default::default()
    };

    for birds in [10, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(birds), &birds, |b, &birds| {
            b.iter_batched(
                || {
                    GenerationSession::new(
                        networks(birds, 3),
                        GameConfig::default(),
                        RewardConfig::default(),
                        &session,
                    )
                    .unwrap()
                },
                |session| {
                    let mut renderer = HeadlessRenderer::new();
                    black_box(session.run(&mut renderer).unwrap())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_network_activate(c: &mut Criterion) {
    let network = networks(1, 11).remove(0);
    let observation = [352.0f32, 210.0, 410.0];
    assert_eq!(observation.len(), OBSERVATION_SIZE);

    c.bench_function("network_activate", |b| {
        b.iter(|| network.activate(black_box(&observation)));
    });
}

fn bench_reproduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reproduction");

    for size in [20, 100] {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size,
                ..Default::default()
            },
            random_seed: Some(5),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| {
                let mut engine = EvolutionEngine::new(config.clone());
                engine
                    .run(
                        |_, candidates| {
                            for candidate in candidates.iter_mut() {
                                candidate.fitness = candidate.genome.genes().sum();
                            }
                            Ok(GenerationSummary::default())
                        },
                        10,
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_session_run,
    bench_network_activate,
    bench_reproduction
);
criterion_main!(benches);
