//! Evolution configuration types for training bird policies.
//!
//! This module provides types for configuring the genetic algorithm that
//! evolves the weights of each bird's feed-forward network.

use serde::{Deserialize, Serialize};

use super::{ConfigError, GameConfig, RewardConfig, SessionConfig};

/// Number of values in an observation vector.
pub const OBSERVATION_SIZE: usize = 3;

/// Top-level configuration for a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Playfield and physics.
    #[serde(default)]
    pub game: GameConfig,
    /// Fitness shaping.
    #[serde(default)]
    pub rewards: RewardConfig,
    /// Session pacing and safeguards.
    #[serde(default)]
    pub session: SessionConfig,
    /// Network topology used for every genome.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Genetic algorithm parameters.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Genome constraints (weight bounds).
    #[serde(default)]
    pub constraints: GenomeConstraints,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl EvolutionConfig {
    /// Validate every section of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        self.rewards.validate()?;
        self.session.validate()?;
        self.network.validate()?;
        self.population.validate()?;
        self.algorithm.validate()?;
        self.constraints.validate()?;
        Ok(())
    }
}

/// Activation applied after each dense layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::Identity => x,
        }
    }
}

/// Fixed network topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Input count (must match the observation size).
    #[serde(default = "default_inputs")]
    pub inputs: usize,
    /// Hidden layer widths, in order.
    #[serde(default)]
    pub hidden: Vec<usize>,
    /// Output count.
    #[serde(default = "default_outputs")]
    pub outputs: usize,
    /// Activation function for every layer.
    #[serde(default)]
    pub activation: Activation,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inputs: default_inputs(),
            hidden: Vec::new(),
            outputs: default_outputs(),
            activation: Activation::default(),
        }
    }
}

fn default_inputs() -> usize {
    OBSERVATION_SIZE
}
fn default_outputs() -> usize {
    1
}

impl NetworkConfig {
    /// Layer widths from input to output.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden.len() + 2);
        sizes.push(self.inputs);
        sizes.extend(&self.hidden);
        sizes.push(self.outputs);
        sizes
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outputs == 0 || self.hidden.contains(&0) {
            return Err(ConfigError::InvalidNetworkShape);
        }
        if self.inputs != OBSERVATION_SIZE {
            return Err(ConfigError::ObservationMismatch(self.inputs));
        }
        Ok(())
    }
}

/// Genetic Algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f32,
    /// Mutation probability per gene (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Probability per gene of replacing it with a fresh random value.
    #[serde(default = "default_replace_rate")]
    pub replace_rate: f32,
    /// Standard deviation of Gaussian mutation.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f32,
    /// Elitism: number of best individuals to preserve unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            replace_rate: default_replace_rate(),
            mutation_strength: default_mutation_strength(),
            elitism: default_elitism(),
        }
    }
}

impl GeneticAlgorithmConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("replace_rate", self.replace_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

fn default_crossover_rate() -> f32 {
    0.75
}
fn default_mutation_rate() -> f32 {
    0.8
}
fn default_replace_rate() -> f32 {
    0.1
}
fn default_mutation_strength() -> f32 {
    0.5
}
fn default_elitism() -> usize {
    2
}

/// Selection method for genetic algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-based selection.
    RankBased,
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of birds per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Target fitness to stop early.
    #[serde(default)]
    pub target_fitness: Option<f32>,
    /// Stagnation limit: stop if no improvement for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

impl PopulationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        Ok(())
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    50
}

/// Genome constraints (parameter bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConstraints {
    /// Bounds for weights and biases.
    #[serde(default = "default_weight_bounds")]
    pub weight_bounds: (f32, f32),
    /// Standard deviation of freshly drawn genes.
    #[serde(default = "default_init_stdev")]
    pub init_stdev: f32,
}

impl Default for GenomeConstraints {
    fn default() -> Self {
        Self {
            weight_bounds: default_weight_bounds(),
            init_stdev: default_init_stdev(),
        }
    }
}

impl GenomeConstraints {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (lo, hi) = self.weight_bounds;
        if lo >= hi || lo.is_nan() || hi.is_nan() {
            return Err(ConfigError::InvalidWeightBounds(lo, hi));
        }
        Ok(())
    }
}

fn default_weight_bounds() -> (f32, f32) {
    (-30.0, 30.0)
}
fn default_init_stdev() -> f32 {
    1.0
}

// ============================================================================
// Genome Representation
// ============================================================================

/// Genome encoding the weights of a feed-forward network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Dense layers from input to output.
    pub layers: Vec<LayerGenome>,
}

/// One dense layer. `weights` is row-major `outputs x inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGenome {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Genome {
    /// Build a genome with every gene set to zero.
    pub fn zeroed(network: &NetworkConfig) -> Self {
        let sizes = network.layer_sizes();
        let layers = sizes
            .windows(2)
            .map(|w| LayerGenome {
                inputs: w[0],
                outputs: w[1],
                weights: vec![0.0; w[0] * w[1]],
                biases: vec![0.0; w[1]],
            })
            .collect();
        Self { layers }
    }

    /// Input count of the first layer.
    pub fn inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    /// Output count of the last layer.
    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// Total number of evolvable parameters.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Iterate over all genes.
    pub fn genes(&self) -> impl Iterator<Item = &f32> {
        self.layers
            .iter()
            .flat_map(|l| l.weights.iter().chain(l.biases.iter()))
    }

    /// Iterate mutably over all genes.
    pub fn genes_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.weights.iter_mut().chain(l.biases.iter_mut()))
    }

    /// Check that layer shapes chain and match their buffers.
    pub fn is_well_formed(&self) -> bool {
        !self.layers.is_empty()
            && self.layers.iter().all(|l| {
                l.inputs > 0
                    && l.outputs > 0
                    && l.weights.len() == l.inputs * l.outputs
                    && l.biases.len() == l.outputs
            })
            && self
                .layers
                .windows(2)
                .all(|w| w[0].outputs == w[1].inputs)
    }
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update emitted after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generation just evaluated.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness seen so far.
    pub best_fitness: f32,
    /// Average fitness of current population.
    pub avg_fitness: f32,
    /// Best fitness this generation.
    pub generation_best: f32,
    /// Pipes passed during this generation's session.
    pub score: u32,
    /// Ticks simulated during this generation's session.
    pub ticks: u64,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    /// Current best candidate.
    pub best_candidate: Option<CandidateSnapshot>,
    /// Statistics history for plotting.
    pub history: EvolutionHistory,
    /// Current phase of the algorithm.
    pub phase: EvolutionPhase,
}

/// Snapshot of a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Fitness score.
    pub fitness: f32,
    /// Network weights.
    pub genome: Genome,
    /// Generation this candidate was created.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
}

/// Per-generation statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// Fitness standard deviation per generation.
    pub fitness_std: Vec<f32>,
    /// Mean pairwise genome distance per generation.
    pub diversity: Vec<f32>,
    /// Session score per generation.
    pub scores: Vec<u32>,
}

/// Phase of the evolution loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvolutionPhase {
    Initializing,
    Evaluating,
    Reproducing,
    Complete,
    Stopped,
}

/// Final result of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best candidate found. `None` if no generation finished evaluating.
    pub best: Option<CandidateSnapshot>,
    /// Run statistics.
    pub stats: EvolutionStats,
    /// Per-generation history.
    pub history: EvolutionHistory,
}

/// Summary statistics of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations fully evaluated.
    pub generations: usize,
    /// Total candidate evaluations.
    pub total_evaluations: u64,
    /// Best fitness reached.
    pub best_fitness: f32,
    /// Highest session score reached.
    pub best_score: u32,
    /// Average fitness of the last evaluated generation.
    pub final_avg_fitness: f32,
    /// Wall-clock duration.
    pub elapsed_seconds: f64,
    /// Why the run stopped.
    pub stop_reason: StopReason,
}

/// Reason the evolution loop stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    MaxGenerations,
    TargetReached,
    Stagnation,
    Cancelled,
}
