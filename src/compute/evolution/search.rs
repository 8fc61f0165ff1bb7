//! Generational genetic algorithm over network weights.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::compute::SessionError;
use crate::schema::{
    CandidateSnapshot, ConfigError, EvolutionConfig, EvolutionHistory, EvolutionPhase,
    EvolutionProgress, EvolutionResult, EvolutionStats, Genome, SelectionMethod, StopReason,
};

use super::genome::{GenomeRng, genome_distance};

/// Evolution errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Population must contain at least one candidate")]
    EmptyPopulation,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Genome layers do not form a valid network")]
    InvalidGenome,
}

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: Genome,
    /// Fitness score.
    pub fitness: f32,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Candidate {
    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> CandidateSnapshot {
        CandidateSnapshot {
            id: self.id,
            fitness: self.fitness,
            genome: self.genome.clone(),
            generation: self.generation,
            parents: self.parents.clone(),
        }
    }
}

/// What an evaluation pass reports besides per-candidate fitness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Pipes passed.
    pub score: u32,
    /// Ticks simulated.
    pub ticks: u64,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: GenomeRng,
    population: Vec<Candidate>,
    best: Option<Candidate>,
    history: EvolutionHistory,
    generation: usize,
    total_generations: usize,
    best_fitness: f32,
    best_score: u32,
    last_summary: GenerationSummary,
    stagnation_count: usize,
    evaluations: u64,
    phase: EvolutionPhase,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(config: EvolutionConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let total_generations = config.population.max_generations;

        Self {
            config,
            rng: GenomeRng::new(seed),
            population: Vec::new(),
            best: None,
            history: EvolutionHistory::default(),
            generation: 0,
            total_generations,
            best_fitness: f32::NEG_INFINITY,
            best_score: 0,
            last_summary: GenerationSummary::default(),
            stagnation_count: 0,
            evaluations: 0,
            phase: EvolutionPhase::Initializing,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Share an external quit flag, such as one raised by a signal handler.
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Initialize the population.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.generation = 0;

        for _ in 0..self.config.population.size {
            let genome = self
                .rng
                .random_genome(&self.config.network, &self.config.constraints);
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);

            self.population.push(Candidate {
                id,
                genome,
                fitness: 0.0,
                generation: 0,
                parents: Vec::new(),
            });
        }
    }

    /// Record statistics for an evaluated generation.
    fn record_generation(&mut self, summary: GenerationSummary) {
        self.population
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let leader = &self.population[0];
        let gen_best = leader.fitness;
        if gen_best > self.best_fitness {
            self.best_fitness = gen_best;
            self.best = Some(leader.clone());
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        let n = self.population.len() as f32;
        let avg_fitness: f32 = self.population.iter().map(|c| c.fitness).sum::<f32>() / n;
        let variance: f32 = self
            .population
            .iter()
            .map(|c| (c.fitness - avg_fitness).powi(2))
            .sum::<f32>()
            / n;

        let diversity = self.compute_diversity();
        self.history.best_fitness.push(gen_best);
        self.history.avg_fitness.push(avg_fitness);
        self.history.fitness_std.push(variance.sqrt());
        self.history.diversity.push(diversity);
        self.history.scores.push(summary.score);

        self.best_score = self.best_score.max(summary.score);
        self.last_summary = summary;
        self.evaluations += self.population.len() as u64;

        info!(
            "generation {}: best {:.2}, avg {:.2}, score {}, ticks {}",
            self.generation, gen_best, avg_fitness, summary.score, summary.ticks
        );
    }

    /// Breed the next generation from the sorted current one.
    fn reproduce(&mut self) {
        let ga_config = self.config.algorithm.clone();
        let size = self.config.population.size;
        let mut next_gen = Vec::with_capacity(size);

        // Elitism: keep best individuals
        for elite in self.population.iter().take(ga_config.elitism.min(size)) {
            let mut elite = elite.clone();
            elite.generation = self.generation + 1;
            next_gen.push(elite);
        }

        while next_gen.len() < size {
            let idx1 = self.select_index(&ga_config.selection);
            let idx2 = self.select_index(&ga_config.selection);
            let parent1 = &self.population[idx1];
            let parent2 = &self.population[idx2];
            let parents = vec![parent1.id, parent2.id];

            let mut child_genome = if self.rng.unit() < ga_config.crossover_rate {
                self.rng.crossover(&parent1.genome, &parent2.genome)
            } else {
                parent1.genome.clone()
            };

            self.rng.mutate(
                &mut child_genome,
                ga_config.mutation_rate,
                ga_config.replace_rate,
                ga_config.mutation_strength,
                &self.config.constraints,
            );

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            next_gen.push(Candidate {
                id,
                genome: child_genome,
                fitness: 0.0,
                generation: self.generation + 1,
                parents,
            });
        }

        self.population = next_gen;
        self.generation += 1;
    }

    /// Select a parent index using the specified method. Expects the
    /// population sorted by descending fitness.
    fn select_index(&mut self, method: &SelectionMethod) -> usize {
        let len = self.population.len();
        match method {
            SelectionMethod::Tournament { size } => {
                let mut best_idx = self.rng.index(len);
                for _ in 1..*size {
                    let idx = self.rng.index(len);
                    if self.population[idx].fitness > self.population[best_idx].fitness {
                        best_idx = idx;
                    }
                }
                best_idx
            }
            SelectionMethod::RankBased => {
                let total_rank = len * (len + 1) / 2;
                let mut target = self.rng.index(total_rank);
                for i in 0..len {
                    let rank = len - i;
                    if target < rank {
                        return i;
                    }
                    target -= rank;
                }
                0
            }
            SelectionMethod::RouletteWheel => {
                // Shift so the weakest candidate still has a small share.
                let min = self
                    .population
                    .iter()
                    .map(|c| c.fitness)
                    .fold(f32::INFINITY, f32::min);
                let offset = if min < 0.0 { -min } else { 0.0 };
                let weights: Vec<f32> = self
                    .population
                    .iter()
                    .map(|c| c.fitness + offset + f32::EPSILON)
                    .collect();

                let total: f32 = weights.iter().sum();
                let target = self.rng.unit() * total;
                let mut cumulative = 0.0;
                for (i, weight) in weights.iter().enumerate() {
                    cumulative += weight;
                    if cumulative >= target {
                        return i;
                    }
                }
                len - 1
            }
        }
    }

    /// Mean pairwise genome distance.
    fn compute_diversity(&self) -> f32 {
        let n = self.population.len();
        if n < 2 {
            return 0.0;
        }

        let population = &self.population;
        let total: f32 = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| genome_distance(&population[i].genome, &population[j].genome))
                    .sum::<f32>()
            })
            .sum();

        total / (n * (n - 1) / 2) as f32
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let avg_fitness = self.history.avg_fitness.last().copied().unwrap_or(0.0);
        let generation_best = self
            .history
            .best_fitness
            .last()
            .copied()
            .unwrap_or(f32::NEG_INFINITY);

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.total_generations,
            best_fitness: self.best_fitness,
            avg_fitness,
            generation_best,
            score: self.last_summary.score,
            ticks: self.last_summary.ticks,
            stagnation_count: self.stagnation_count,
            best_candidate: self.best.as_ref().map(Candidate::to_snapshot),
            history: self.history.clone(),
            phase: self.phase,
        }
    }

    /// Check if evolution should stop after the current generation.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation + 1 >= self.total_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_fitness
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution, reporting progress after every evaluated generation.
    ///
    /// `evaluate` receives the generation index and the population and must
    /// write each candidate's fitness. A [`SessionError::Cancelled`] from it
    /// stops the run and discards that generation.
    pub fn run_with_callback<E, F>(
        &mut self,
        mut evaluate: E,
        max_generations: usize,
        mut callback: F,
    ) -> Result<EvolutionResult, EvolutionError>
    where
        E: FnMut(usize, &mut [Candidate]) -> Result<GenerationSummary, EvolutionError>,
        F: FnMut(&EvolutionProgress),
    {
        if self.config.population.size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        self.config.validate()?;

        let start_time = Instant::now();
        self.total_generations = max_generations;
        self.phase = EvolutionPhase::Initializing;
        self.initialize();
        callback(&self.progress());

        let stop_reason = if max_generations == 0 {
            StopReason::MaxGenerations
        } else {
            loop {
                if self.cancelled.load(Ordering::Relaxed) {
                    break StopReason::Cancelled;
                }

                self.phase = EvolutionPhase::Evaluating;
                let summary = match evaluate(self.generation, &mut self.population) {
                    Ok(summary) => summary,
                    Err(EvolutionError::Session(SessionError::Cancelled)) => {
                        break StopReason::Cancelled;
                    }
                    Err(e) => return Err(e),
                };
                self.record_generation(summary);
                callback(&self.progress());

                if let Some(reason) = self.should_stop() {
                    break reason;
                }

                self.phase = EvolutionPhase::Reproducing;
                self.reproduce();
            }
        };

        self.phase = match stop_reason {
            StopReason::Cancelled => EvolutionPhase::Stopped,
            _ => EvolutionPhase::Complete,
        };
        callback(&self.progress());

        let generations = self.history.best_fitness.len();
        info!(
            "evolution stopped after {} generations: {:?}, best fitness {:.2}",
            generations, stop_reason, self.best_fitness
        );

        Ok(EvolutionResult {
            best: self.best.as_ref().map(Candidate::to_snapshot),
            stats: EvolutionStats {
                generations,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness,
                best_score: self.best_score,
                final_avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run<E>(
        &mut self,
        evaluate: E,
        max_generations: usize,
    ) -> Result<EvolutionResult, EvolutionError>
    where
        E: FnMut(usize, &mut [Candidate]) -> Result<GenerationSummary, EvolutionError>,
    {
        self.run_with_callback(evaluate, max_generations, |_| {})
    }
}
