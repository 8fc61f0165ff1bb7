//! Fitness evaluation: one shared game session per generation.
//!
//! Every candidate's network is dropped into the same session as a bird, and
//! the fitness each bird accumulates becomes the candidate's fitness.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use log::debug;

use crate::compute::{FeedForwardNetwork, GenerationSession, Renderer, SessionReport};
use crate::schema::{Activation, EvolutionConfig, GameConfig, RewardConfig, SessionConfig};

use super::search::{Candidate, EvolutionError, GenerationSummary};

/// Evaluates a whole population by letting it play.
pub struct FitnessEvaluator<R: Renderer> {
    game: GameConfig,
    rewards: RewardConfig,
    session: SessionConfig,
    activation: Activation,
    renderer: R,
    cancelled: Arc<AtomicBool>,
    last_report: Option<SessionReport>,
}

impl<R: Renderer> FitnessEvaluator<R> {
    /// Create a new fitness evaluator drawing frames into `renderer`.
    pub fn new(config: &EvolutionConfig, renderer: R) -> Self {
        Self {
            game: config.game.clone(),
            rewards: config.rewards.clone(),
            session: config.session.clone(),
            activation: config.network.activation,
            renderer,
            cancelled: Arc::new(AtomicBool::new(false)),
            last_report: None,
        }
    }

    /// Share a quit flag with every session.
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Report of the most recent completed session.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Session settings for a generation. A fixed seed is offset per
    /// generation so each generation sees a different course.
    fn session_config(&self, generation: usize) -> SessionConfig {
        SessionConfig {
            random_seed: self
                .session
                .random_seed
                .map(|seed| seed.wrapping_add(generation as u64)),
            ..self.session.clone()
        }
    }

    /// Play one generation and write each candidate's fitness.
    pub fn evaluate(
        &mut self,
        generation: usize,
        candidates: &mut [Candidate],
    ) -> Result<GenerationSummary, EvolutionError> {
        if candidates.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let networks = candidates
            .iter()
            .map(|c| FeedForwardNetwork::from_genome(&c.genome, self.activation))
            .collect::<Result<Vec<_>, _>>()?;

        let report = GenerationSession::new(
            networks,
            self.game.clone(),
            self.rewards.clone(),
            &self.session_config(generation),
        )?
        .with_generation(generation)
        .with_cancel(Arc::clone(&self.cancelled))
        .run(&mut self.renderer)?;

        for (candidate, &fitness) in candidates.iter_mut().zip(&report.fitness) {
            candidate.fitness = fitness as f32;
        }

        debug!(
            "generation {} session: {} ticks, score {}, {} survivors ({:?})",
            generation, report.ticks, report.score, report.survivors, report.termination
        );

        let summary = GenerationSummary {
            score: report.score,
            ticks: report.ticks,
        };
        self.last_report = Some(report);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::compute::evolution::EvolutionEngine;
    use crate::compute::{HeadlessRenderer, SessionError, Termination};
    use crate::schema::{Genome, PopulationConfig, StopReason};

    fn config() -> EvolutionConfig {
        let mut config = EvolutionConfig {
            population: PopulationConfig {
                size: 8,
                ..Default::default()
            },
            random_seed: Some(21),
            ..Default::default()
        };
        config.session.max_ticks = Some(300);
        config.session.random_seed = Some(4);
        config
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate {
                id: i as u64,
                genome: Genome::zeroed(&config().network),
                fitness: -1.0,
                generation: 0,
                parents: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_zero_genomes_fall_together() {
        // A zero network always outputs tanh(0) = 0, so nobody ever jumps.
        let mut evaluator = FitnessEvaluator::new(&config(), HeadlessRenderer::new());
        let mut population = candidates(3);

        let summary = evaluator.evaluate(0, &mut population).unwrap();
        assert_eq!(summary.ticks, 35);
        assert_eq!(summary.score, 0);
        for candidate in &population {
            assert!((candidate.fitness - 2.5).abs() < 1e-4);
        }

        let report = evaluator.last_report().unwrap();
        assert_eq!(report.termination, Termination::Extinct);
        assert_eq!(evaluator.renderer().frames(), 35);
    }

    #[test]
    fn test_malformed_genome_is_reported() {
        let mut evaluator = FitnessEvaluator::new(&config(), HeadlessRenderer::new());
        let mut population = candidates(2);
        population[1].genome.layers.clear();

        assert!(matches!(
            evaluator.evaluate(0, &mut population),
            Err(EvolutionError::InvalidGenome)
        ));
    }

    #[test]
    fn test_cancel_flag_reaches_session() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut evaluator =
            FitnessEvaluator::new(&config(), HeadlessRenderer::new()).with_cancel(cancel);
        let mut population = candidates(2);

        assert!(matches!(
            evaluator.evaluate(0, &mut population),
            Err(EvolutionError::Session(SessionError::Cancelled))
        ));
        assert!(population.iter().all(|c| c.fitness == -1.0));
    }

    #[test]
    fn test_engine_with_game_fitness() {
        let config = config();
        let mut engine = EvolutionEngine::new(config.clone());
        let mut evaluator = FitnessEvaluator::new(&config, HeadlessRenderer::new())
            .with_cancel(engine.cancel_handle());

        let result = engine
            .run(|generation, candidates| evaluator.evaluate(generation, candidates), 3)
            .unwrap();

        assert_eq!(result.stats.generations, 3);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert!(result.stats.best_fitness > 0.0);
        assert!(evaluator.renderer().frames() > 0);
    }

    #[test]
    fn test_engine_cancel_during_session() {
        let config = config();
        let mut engine = EvolutionEngine::new(config.clone());
        let cancel = engine.cancel_handle();
        let mut evaluator =
            FitnessEvaluator::new(&config, HeadlessRenderer::new()).with_cancel(cancel.clone());

        let result = engine
            .run(
                |generation, candidates| {
                    if generation == 1 {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    evaluator.evaluate(generation, candidates)
                },
                10,
            )
            .unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 1);
    }
}
