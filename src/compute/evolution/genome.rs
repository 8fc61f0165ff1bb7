//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, and mutation of network weights.

use crate::schema::{Genome, GenomeConstraints, NetworkConfig};
use rand::prelude::*;
use rand_distr::StandardNormal;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a random genome for the given topology.
    pub fn random_genome(
        &mut self,
        network: &NetworkConfig,
        constraints: &GenomeConstraints,
    ) -> Genome {
        let mut genome = Genome::zeroed(network);
        for gene in genome.genes_mut() {
            *gene = self.fresh_gene(constraints);
        }
        genome
    }

    /// A new gene drawn from N(0, init_stdev), clamped to bounds.
    fn fresh_gene(&mut self, constraints: &GenomeConstraints) -> f32 {
        let noise: f32 = self.rng.sample(StandardNormal);
        let (lo, hi) = constraints.weight_bounds;
        (noise * constraints.init_stdev).clamp(lo, hi)
    }

    /// Gaussian mutation: add noise with standard deviation `strength`.
    pub fn gaussian_mutate(&mut self, value: f32, strength: f32, bounds: (f32, f32)) -> f32 {
        let noise: f32 = self.rng.sample(StandardNormal);
        (value + noise * strength).clamp(bounds.0, bounds.1)
    }

    /// Uniform crossover: each gene comes from either parent with equal
    /// probability. Parents with different shapes yield a copy of the first.
    pub fn crossover(&mut self, parent1: &Genome, parent2: &Genome) -> Genome {
        let mut child = parent1.clone();
        if parent1.parameter_count() != parent2.parameter_count() {
            return child;
        }

        for (gene, other) in child.genes_mut().zip(parent2.genes()) {
            if self.rng.gen_bool(0.5) {
                *gene = *other;
            }
        }
        child
    }

    /// Mutate a genome in place.
    ///
    /// Each gene is perturbed with probability `rate` and, independently,
    /// replaced by a fresh value with probability `replace_rate`.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        rate: f32,
        replace_rate: f32,
        strength: f32,
        constraints: &GenomeConstraints,
    ) {
        for gene in genome.genes_mut() {
            if self.rng.r#gen::<f32>() < replace_rate {
                *gene = self.fresh_gene(constraints);
            } else if self.rng.r#gen::<f32>() < rate {
                *gene = self.gaussian_mutate(*gene, strength, constraints.weight_bounds);
            }
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.rng.r#gen()
    }

    /// Uniform index in `0..len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Compute genetic distance between two genomes: the mean absolute gene
/// difference. Genomes of different shapes are maximally distant.
pub fn genome_distance(g1: &Genome, g2: &Genome) -> f32 {
    let count = g1.parameter_count();
    if count != g2.parameter_count() {
        return f32::INFINITY;
    }
    if count == 0 {
        return 0.0;
    }

    let total: f32 = g1
        .genes()
        .zip(g2.genes())
        .map(|(a, b)| (a - b).abs())
        .sum();
    total / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> NetworkConfig {
        NetworkConfig {
            hidden: vec![4],
            ..Default::default()
        }
    }

    #[test]
    fn test_random_genome_respects_bounds() {
        let constraints = GenomeConstraints {
            weight_bounds: (-0.5, 0.5),
            init_stdev: 10.0,
        };
        let mut rng = GenomeRng::new(42);
        let genome = rng.random_genome(&network(), &constraints);

        assert!(genome.is_well_formed());
        assert_eq!(genome.parameter_count(), 3 * 4 + 4 + 4 + 1);
        assert!(genome.genes().all(|g| (-0.5..=0.5).contains(g)));
    }

    #[test]
    fn test_same_seed_same_genome() {
        let constraints = GenomeConstraints::default();
        let a = GenomeRng::new(7).random_genome(&network(), &constraints);
        let b = GenomeRng::new(7).random_genome(&network(), &constraints);
        assert_eq!(a, b);
    }

    #[test]
    fn test_crossover_mixes_parents() {
        let mut zeros = Genome::zeroed(&network());
        let mut ones = zeros.clone();
        for gene in ones.genes_mut() {
            *gene = 1.0;
        }

        let mut rng = GenomeRng::new(3);
        let child = rng.crossover(&zeros, &ones);
        assert!(child.genes().all(|&g| g == 0.0 || g == 1.0));
        assert!(child.genes().any(|&g| g == 0.0));
        assert!(child.genes().any(|&g| g == 1.0));

        // Shape mismatch falls back to the first parent.
        zeros.layers.pop();
        assert_eq!(rng.crossover(&zeros, &ones), zeros);
    }

    #[test]
    fn test_mutation_rates() {
        let constraints = GenomeConstraints::default();
        let mut rng = GenomeRng::new(11);
        let original = rng.random_genome(&network(), &constraints);

        let mut untouched = original.clone();
        rng.mutate(&mut untouched, 0.0, 0.0, 1.0, &constraints);
        assert_eq!(untouched, original);

        let mut mutated = original.clone();
        rng.mutate(&mut mutated, 1.0, 0.0, 1.0, &constraints);
        assert!(
            mutated
                .genes()
                .zip(original.genes())
                .all(|(a, b)| a != b)
        );
    }

    #[test]
    fn test_mutation_clamps_to_bounds() {
        let constraints = GenomeConstraints {
            weight_bounds: (-1.0, 1.0),
            init_stdev: 1.0,
        };
        let mut rng = GenomeRng::new(5);
        let mut genome = Genome::zeroed(&network());
        for _ in 0..20 {
            rng.mutate(&mut genome, 1.0, 0.1, 100.0, &constraints);
            assert!(genome.genes().all(|g| (-1.0..=1.0).contains(g)));
        }
    }

    #[test]
    fn test_genome_distance() {
        let a = Genome::zeroed(&network());
        let mut b = a.clone();
        assert_eq!(genome_distance(&a, &b), 0.0);

        for gene in b.genes_mut() {
            *gene = 2.0;
        }
        assert!((genome_distance(&a, &b) - 2.0).abs() < 1e-6);

        let other = Genome::zeroed(&NetworkConfig::default());
        assert_eq!(genome_distance(&a, &other), f32::INFINITY);
    }
}
