//! Flappy Evolve - Neuroevolution of flappy bird agents.
//!
//! A population of birds, each steered by a small feed-forward network,
//! plays one shared course per generation. Fitness earned in play drives a
//! generational genetic algorithm that breeds the next population.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types, genomes, and training reports
//! - `compute`: Game entities, the session loop, and evolution
//! - `animation`: Replay recording and playback
//!
//! # Example
//!
//! ```rust,no_run
//! use flappy_evolve::{
//!     compute::{GenerationSession, HeadlessRenderer},
//!     schema::{GameConfig, RewardConfig, SessionConfig},
//! };
//!
//! // Two hand-written policies: one never flaps, one flaps when low.
//! let policies: Vec<Box<dyn Fn(&[f32]) -> Vec<f32>>> = vec![
//!     Box::new(|_: &[f32]| vec![0.0]),
//!     Box::new(|obs: &[f32]| vec![if obs[0] > 400.0 { 1.0 } else { 0.0 }]),
//! ];
//!
//! let session = GenerationSession::new(
//!     policies,
//!     GameConfig::default(),
//!     RewardConfig::default(),
//!     &SessionConfig::default(),
//! )
//! .unwrap();
//!
//! let mut renderer = HeadlessRenderer::new();
//! let report = session.run(&mut renderer).unwrap();
//! println!("Score {} after {} ticks", report.score, report.ticks);
//! ```

pub mod animation;
pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, FitnessEvaluator};
pub use compute::{GenerationSession, HeadlessRenderer, Policy, SessionReport};
pub use schema::{EvolutionConfig, GameConfig, RewardConfig, SessionConfig};
