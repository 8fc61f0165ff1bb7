//! Evolutionary training of bird policies.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): random generation, crossover, and mutation
//! - **Search** (`search`): the generational genetic algorithm
//! - **Fitness** (`fitness`): plays one game session per generation
//!
//! # Example
//!
//! ```rust,no_run
//! use flappy_evolve::compute::HeadlessRenderer;
//! use flappy_evolve::compute::evolution::{EvolutionEngine, FitnessEvaluator};
//! use flappy_evolve::schema::EvolutionConfig;
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config.clone());
//! let mut evaluator = FitnessEvaluator::new(&config, HeadlessRenderer::new())
//!     .with_cancel(engine.cancel_handle());
//!
//! let result = engine
//!     .run_with_callback(
//!         |generation, candidates| evaluator.evaluate(generation, candidates),
//!         config.population.max_generations,
//!         |progress| {
//!             println!(
//!                 "Generation {}: best fitness = {:.3}",
//!                 progress.generation, progress.best_fitness
//!             );
//!         },
//!     )
//!     .unwrap();
//!
//! println!("Best fitness: {:.3}", result.stats.best_fitness);
//! ```

mod fitness;
mod genome;
mod search;

pub use fitness::FitnessEvaluator;
pub use genome::{GenomeRng, genome_distance};
pub use search::{Candidate, EvolutionEngine, EvolutionError, GenerationSummary};
