//! One generation of play: every agent flies the same course until all of
//! them have crashed.
//!
//! Agents are stored as single records keyed by a stable [`AgentId`].
//! Crashes only clear the record's `alive` flag during a tick; records are
//! compacted into the finished table once the tick's bookkeeping is done.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::schema::{ConfigError, GameConfig, OBSERVATION_SIZE, RewardConfig, SessionConfig};

use super::bird::Bird;
use super::ground::Ground;
use super::mask::SpriteMasks;
use super::pipe::{Pipe, PipeGeometry};
use super::policy::Policy;
use super::render::{FrameClock, FrameView, Renderer};

/// Stable identity of an agent within a session (its index at creation).
pub type AgentId = usize;

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session needs at least one agent")]
    EmptyPopulation,
    #[error("Policy for agent {agent} produced no outputs")]
    EmptyPolicyOutput { agent: AgentId },
    #[error("Session was cancelled")]
    Cancelled,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every agent crashed.
    Extinct,
    /// The tick ceiling was reached with agents still alive.
    TickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated(Termination),
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub generation: usize,
    pub ticks: u64,
    pub score: u32,
    pub termination: Termination,
    /// Agents still alive at the end.
    pub survivors: usize,
    /// Final fitness, indexed by [`AgentId`].
    pub fitness: Vec<f64>,
}

struct AgentRecord<P> {
    id: AgentId,
    bird: Bird,
    policy: P,
    fitness: f64,
    alive: bool,
}

#[derive(Debug, Clone, Copy)]
struct FinishedAgent {
    id: AgentId,
    fitness: f64,
}

/// Simulation of one generation.
pub struct GenerationSession<P: Policy> {
    generation: usize,
    game: GameConfig,
    rewards: RewardConfig,
    max_ticks: Option<u64>,
    clock: Option<FrameClock>,
    masks: SpriteMasks,
    geometry: PipeGeometry,
    agents: Vec<AgentRecord<P>>,
    finished: Vec<FinishedAgent>,
    population: usize,
    pipes: Vec<Pipe>,
    ground: Ground,
    score: u32,
    tick: u64,
    rng: StdRng,
    state: SessionState,
    cancelled: Arc<AtomicBool>,
}

impl<P: Policy> GenerationSession<P> {
    /// Create a session with one bird per policy, all at the start position.
    pub fn new(
        policies: Vec<P>,
        game: GameConfig,
        rewards: RewardConfig,
        session: &SessionConfig,
    ) -> Result<Self, SessionError> {
        game.validate()?;
        rewards.validate()?;
        session.validate()?;
        if policies.is_empty() {
            return Err(SessionError::EmptyPopulation);
        }

        let (start_x, start_y) = game.bird_start;
        let population = policies.len();
        let agents = policies
            .into_iter()
            .enumerate()
            .map(|(id, policy)| AgentRecord {
                id,
                bird: Bird::new(start_x, start_y, game.physics),
                policy,
                fitness: 0.0,
                alive: true,
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(session.random_seed.unwrap_or_else(rand::random));
        let geometry = PipeGeometry::from_config(&game);
        let pipes = vec![Pipe::create(game.spawn_x(), &mut rng, geometry)];

        Ok(Self {
            generation: 0,
            masks: SpriteMasks::from_config(&game),
            ground: Ground::from_config(&game),
            max_ticks: session.max_ticks,
            clock: session.tick_rate.map(FrameClock::new),
            geometry,
            game,
            rewards,
            agents,
            finished: Vec::with_capacity(population),
            population,
            pipes,
            score: 0,
            tick: 0,
            rng,
            state: SessionState::Running,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Set the generation index shown to the renderer.
    pub fn with_generation(mut self, generation: usize) -> Self {
        self.generation = generation;
        self
    }

    /// Share an external quit flag.
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    /// Number of agents still flying.
    pub fn live_count(&self) -> usize {
        self.agents.len()
    }

    /// Surviving agents in stable order, with their current fitness.
    pub fn live_agents(&self) -> impl Iterator<Item = (AgentId, &Bird, f64)> {
        self.agents.iter().map(|a| (a.id, &a.bird, a.fitness))
    }

    /// Current fitness of any agent, alive or finished.
    pub fn fitness(&self, id: AgentId) -> Option<f64> {
        self.agents
            .iter()
            .map(|a| (a.id, a.fitness))
            .chain(self.finished.iter().map(|f| (f.id, f.fitness)))
            .find(|(agent, _)| *agent == id)
            .map(|(_, fitness)| fitness)
    }

    /// Pipe every agent currently looks at, chosen from the lead agent.
    fn active_pipe_index(&self) -> usize {
        match self.agents.first() {
            Some(lead)
                if self.pipes.len() > 1 && lead.bird.x > self.pipes[0].right() =>
            {
                1
            }
            _ => 0,
        }
    }

    fn spawn_pipe(&mut self) {
        let pipe = Pipe::create(self.game.spawn_x(), &mut self.rng, self.geometry);
        debug!(
            "generation {} tick {}: spawned pipe with gap {}..{}",
            self.generation, self.tick, pipe.gap_top, pipe.gap_bottom
        );
        self.pipes.push(pipe);
    }

    /// Advance the simulation by one tick.
    pub fn step<R: Renderer>(&mut self, renderer: &mut R) -> Result<SessionState, SessionError> {
        if let SessionState::Terminated(_) = self.state {
            return Ok(self.state);
        }
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(SessionError::Cancelled);
        }

        if self.agents.is_empty() {
            self.state = SessionState::Terminated(Termination::Extinct);
            debug!(
                "generation {} extinct after {} ticks, score {}",
                self.generation, self.tick, self.score
            );
            return Ok(self.state);
        }

        if self.pipes.is_empty() {
            self.spawn_pipe();
        }

        // Physics and decisions.
        let target = &self.pipes[self.active_pipe_index()];
        let (gap_top, gap_bottom) = (target.gap_top, target.gap_bottom);
        for agent in &mut self.agents {
            agent.fitness += self.rewards.survival_bonus;
            agent.bird.advance();
            agent.bird.tick_animation();

            let y = agent.bird.y;
            let observation: [f32; OBSERVATION_SIZE] =
                [y, (y - gap_top).abs(), (y - gap_bottom).abs()];
            let output = agent.policy.activate(&observation);
            let Some(&signal) = output.first() else {
                return Err(SessionError::EmptyPolicyOutput { agent: agent.id });
            };
            if signal > self.rewards.jump_threshold {
                agent.bird.jump();
            }
        }

        // Collisions and passes.
        let mut spawn = false;
        for pipe in &mut self.pipes {
            for agent in self.agents.iter_mut().filter(|a| a.alive) {
                if agent.bird.collides_with(pipe, &self.masks) {
                    agent.fitness -= self.rewards.crash_penalty;
                    agent.alive = false;
                    trace!(
                        "agent {} hit a pipe at tick {} (fitness {:.2})",
                        agent.id, self.tick, agent.fitness
                    );
                    continue;
                }

                let was_passed = pipe.passed();
                if pipe.has_been_passed_by(&agent.bird) && !was_passed {
                    spawn = true;
                }
            }
        }

        if spawn {
            self.score += 1;
            for agent in self.agents.iter_mut().filter(|a| a.alive) {
                agent.fitness += self.rewards.pass_bonus;
            }
            self.spawn_pipe();
        }

        self.pipes.retain(|p| !p.is_off_screen());
        for pipe in &mut self.pipes {
            pipe.advance();
        }

        // Leaving the playfield.
        let floor = self.game.ground_y;
        let bird_height = self.game.bird_size.1 as f32;
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            let y = agent.bird.y;
            if y + bird_height >= floor || y < 0.0 {
                agent.fitness -= self.rewards.crash_penalty;
                agent.alive = false;
                trace!(
                    "agent {} left the playfield at tick {} (fitness {:.2})",
                    agent.id, self.tick, agent.fitness
                );
            }
        }

        self.ground.advance();
        self.compact();

        renderer.draw(&FrameView {
            generation: self.generation,
            tick: self.tick,
            score: self.score,
            birds: self.agents.iter().map(|a| &a.bird).collect(),
            pipes: &self.pipes,
            ground: &self.ground,
        });

        self.tick += 1;

        if let Some(clock) = &mut self.clock {
            clock.wait();
        }

        if let Some(limit) = self.max_ticks
            && self.tick >= limit
            && !self.agents.is_empty()
        {
            self.state = SessionState::Terminated(Termination::TickLimit);
            debug!(
                "generation {} hit the tick limit with {} survivors, score {}",
                self.generation,
                self.agents.len(),
                self.score
            );
        }

        Ok(self.state)
    }

    /// Move eliminated agents into the finished table.
    fn compact(&mut self) {
        if self.agents.iter().all(|a| a.alive) {
            return;
        }
        let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.agents)
            .into_iter()
            .partition(|a| a.alive);
        self.agents = live;
        self.finished.extend(dead.into_iter().map(|a| FinishedAgent {
            id: a.id,
            fitness: a.fitness,
        }));
    }

    /// Run until every agent has crashed or the tick limit is reached.
    pub fn run<R: Renderer>(mut self, renderer: &mut R) -> Result<SessionReport, SessionError> {
        let termination = loop {
            if let SessionState::Terminated(termination) = self.step(renderer)? {
                break termination;
            }
        };
        Ok(self.report(termination))
    }

    fn report(&self, termination: Termination) -> SessionReport {
        let mut fitness = vec![0.0; self.population];
        for agent in &self.agents {
            fitness[agent.id] = agent.fitness;
        }
        for agent in &self.finished {
            fitness[agent.id] = agent.fitness;
        }

        SessionReport {
            generation: self.generation,
            ticks: self.tick,
            score: self.score,
            termination,
            survivors: self.agents.len(),
            fitness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::HeadlessRenderer;

    type BoxedPolicy = Box<dyn Fn(&[f32]) -> Vec<f32>>;

    fn never_jump(_: &[f32]) -> Vec<f32> {
        vec![0.0]
    }

    fn always_jump(_: &[f32]) -> Vec<f32> {
        vec![1.0]
    }

    /// Stay in the lower part of the target gap, jumping once the bird's
    /// top edge sinks within 78 units of the gap bottom.
    fn hover(obs: &[f32]) -> Vec<f32> {
        let (to_top, to_bottom) = (obs[1], obs[2]);
        let below_gap = to_top - to_bottom > 199.9;
        let near_bottom = to_bottom < 78.0 && to_top > to_bottom;
        vec![if below_gap || near_bottom { 1.0 } else { 0.0 }]
    }

    fn session_config(max_ticks: Option<u64>, seed: u64) -> SessionConfig {
        SessionConfig {
            tick_rate: None,
            max_ticks,
            random_seed: Some(seed),
        }
    }

    fn session<P: Policy>(policies: Vec<P>, max_ticks: Option<u64>, seed: u64) -> GenerationSession<P> {
        GenerationSession::new(
            policies,
            GameConfig::default(),
            RewardConfig::default(),
            &session_config(max_ticks, seed),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_population() {
        let result = GenerationSession::<fn(&[f32]) -> Vec<f32>>::new(
            Vec::new(),
            GameConfig::default(),
            RewardConfig::default(),
            &SessionConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::EmptyPopulation)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let game = GameConfig {
            gap_top_range: (300, 300),
            ..Default::default()
        };
        let result = GenerationSession::new(
            vec![never_jump],
            game,
            RewardConfig::default(),
            &SessionConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_never_jump_hits_ground() {
        let mut renderer = HeadlessRenderer::new();
        let report = session(vec![never_jump], None, 1).run(&mut renderer).unwrap();

        assert_eq!(report.termination, Termination::Extinct);
        assert_eq!(report.ticks, 35);
        assert_eq!(report.score, 0);
        assert_eq!(report.survivors, 0);
        assert!((report.fitness[0] - 2.5).abs() < 1e-4);
        assert_eq!(renderer.frames(), 35);
    }

    #[test]
    fn test_always_jump_leaves_top() {
        let mut renderer = HeadlessRenderer::new();
        let report = session(vec![always_jump], None, 2).run(&mut renderer).unwrap();

        assert_eq!(report.termination, Termination::Extinct);
        assert_eq!(report.ticks, 33);
        assert!((report.fitness[0] - 2.3).abs() < 1e-4);
    }

    #[test]
    fn test_hover_passes_pipe_once() {
        for seed in 0..8 {
            let mut renderer = HeadlessRenderer::new();
            let report = session(vec![hover], Some(100), seed).run(&mut renderer).unwrap();

            assert_eq!(report.termination, Termination::TickLimit, "seed {seed}");
            assert_eq!(report.score, 1, "seed {seed}");
            assert_eq!(report.survivors, 1);
            assert!((report.fitness[0] - 15.0).abs() < 1e-3, "seed {seed}");
        }
    }

    #[test]
    fn test_pipe_crash_eliminates_only_the_crasher() {
        // Holds low enough to fly into the bottom pipe of the first gap.
        let low_flyer = |obs: &[f32]| vec![if obs[0] > 600.0 { 1.0 } else { 0.0 }];
        // Climbs out through the ceiling long before the pipe arrives.
        let climber = |obs: &[f32]| vec![if obs[0] > 30.0 { 1.0 } else { 0.0 }];

        let solo = |policy: BoxedPolicy| {
            let mut renderer = HeadlessRenderer::new();
            session(vec![policy], None, 1).run(&mut renderer).unwrap()
        };
        let low_alone = solo(Box::new(low_flyer));
        let climber_alone = solo(Box::new(climber));

        assert_eq!(low_alone.ticks, 76);
        assert_eq!(low_alone.score, 0);
        assert!((low_alone.fitness[0] - (76.0 * 0.1 - 1.0)).abs() < 1e-6);

        let policies: Vec<BoxedPolicy> = vec![Box::new(low_flyer), Box::new(climber)];
        let mut renderer = HeadlessRenderer::new();
        let mut s = session(policies, None, 1);
        for _ in 0..75 {
            s.step(&mut renderer).unwrap();
        }
        let live: Vec<AgentId> = s.live_agents().map(|(id, _, _)| id).collect();
        assert_eq!(live, vec![0]);

        // Tick 76: the pipe collision is penalised once and the pass check is skipped.
        s.step(&mut renderer).unwrap();
        assert_eq!(s.live_count(), 0);
        assert_eq!(s.score(), 0);
        assert_eq!(s.pipes().len(), 1);

        let report = s.run(&mut renderer).unwrap();
        assert_eq!(report.termination, Termination::Extinct);
        assert_eq!(report.ticks, 76);
        assert_eq!(report.score, 0);
        assert!((report.fitness[0] - low_alone.fitness[0]).abs() < 1e-9);
        assert!((report.fitness[1] - climber_alone.fitness[0]).abs() < 1e-9);
        assert!((report.fitness[1] - 2.3).abs() < 1e-6);
    }

    #[test]
    fn test_long_hover_collects_each_pass_once() {
        for seed in 0..4 {
            let mut renderer = HeadlessRenderer::new();
            let mut s = session(vec![hover], Some(5000), seed);
            let mut max_pipes = 0;
            let mut last_score = 0;
            while s.step(&mut renderer).unwrap() == SessionState::Running {
                max_pipes = max_pipes.max(s.pipes().len());
                assert!(s.score() - last_score <= 1, "seed {seed}");
                last_score = s.score();
            }

            let report = s.run(&mut renderer).unwrap();
            assert_eq!(report.termination, Termination::TickLimit, "seed {seed}");
            assert_eq!(report.ticks, 5000);
            assert_eq!(report.survivors, 1);
            assert!(report.score > 1, "seed {seed}");
            assert_eq!(report.score, 66, "seed {seed}");
            assert!(max_pipes <= 2, "seed {seed}: {max_pipes} pipes on screen");

            let expected = report.ticks as f64 * 0.1 + 5.0 * f64::from(report.score);
            assert!(
                (report.fitness[0] - expected).abs() < 1e-6,
                "seed {seed}: {} vs {expected}",
                report.fitness[0]
            );
        }
    }

    #[test]
    fn test_pass_spawns_second_pipe() {
        let mut renderer = HeadlessRenderer::new();
        let mut s = session(vec![hover], None, 3);
        for _ in 0..75 {
            s.step(&mut renderer).unwrap();
        }
        assert_eq!(s.score(), 0);
        assert_eq!(s.pipes().len(), 1);

        s.step(&mut renderer).unwrap();
        assert_eq!(s.score(), 1);
        assert_eq!(s.pipes().len(), 2);
        // Spawned at 600 and advanced with the others.
        assert_eq!(s.pipes()[1].x, 595.0);
    }

    #[test]
    fn test_removal_keeps_associations() {
        for jumper_first in [true, false] {
            let mut policies: Vec<BoxedPolicy> = vec![Box::new(hover), Box::new(always_jump)];
            if jumper_first {
                policies.reverse();
            }
            let jumper: AgentId = if jumper_first { 0 } else { 1 };
            let hoverer = 1 - jumper;

            let mut renderer = HeadlessRenderer::new();
            let mut s = session(policies, Some(50), 4);

            for _ in 0..32 {
                s.step(&mut renderer).unwrap();
            }
            assert_eq!(s.live_count(), 2);

            s.step(&mut renderer).unwrap();
            let live: Vec<AgentId> = s.live_agents().map(|(id, _, _)| id).collect();
            assert_eq!(live, vec![hoverer]);
            assert!((s.fitness(jumper).unwrap() - 2.3).abs() < 1e-4);
            assert!((s.fitness(hoverer).unwrap() - 3.3).abs() < 1e-4);

            let report = s.run(&mut renderer).unwrap();
            assert_eq!(report.termination, Termination::TickLimit);
            assert_eq!(report.ticks, 50);
            assert!((report.fitness[jumper] - 2.3).abs() < 1e-4);
            assert!((report.fitness[hoverer] - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let mut renderer = HeadlessRenderer::new();
        let silent = |_: &[f32]| Vec::<f32>::new();
        let result = session(vec![silent], None, 5).run(&mut renderer);
        assert!(matches!(
            result,
            Err(SessionError::EmptyPolicyOutput { agent: 0 })
        ));
    }

    #[test]
    fn test_cancel_aborts_session() {
        let mut renderer = HeadlessRenderer::new();
        let s = session(vec![hover], None, 6);
        s.cancel_handle().store(true, Ordering::Relaxed);
        assert!(matches!(s.run(&mut renderer), Err(SessionError::Cancelled)));
        assert_eq!(renderer.frames(), 0);
    }

    #[test]
    fn test_terminated_session_is_inert() {
        let mut renderer = HeadlessRenderer::new();
        let mut s = session(vec![never_jump], None, 7);
        while s.step(&mut renderer).unwrap() == SessionState::Running {}
        let tick = s.tick();

        assert_eq!(
            s.step(&mut renderer).unwrap(),
            SessionState::Terminated(Termination::Extinct)
        );
        assert_eq!(s.tick(), tick);
    }

    #[test]
    fn test_frames_carry_generation() {
        struct Generations(Vec<usize>);
        impl Renderer for Generations {
            fn draw(&mut self, frame: &FrameView<'_>) {
                self.0.push(frame.generation);
            }
        }

        let mut renderer = Generations(Vec::new());
        session(vec![never_jump], Some(3), 8)
            .with_generation(7)
            .run(&mut renderer)
            .unwrap();
        assert_eq!(renderer.0, vec![7, 7, 7]);
    }
}
