//! Presentation seam between the simulation and any display.
//!
//! The session hands a read-only [`FrameView`] to a [`Renderer`] once per
//! tick. Nothing the renderer does feeds back into the simulation.

use std::thread;
use std::time::{Duration, Instant};

use super::bird::Bird;
use super::ground::Ground;
use super::pipe::Pipe;

/// Everything visible at the end of one tick.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    /// Generation index (0-based).
    pub generation: usize,
    /// Tick within the generation.
    pub tick: u64,
    /// Pipes passed so far.
    pub score: u32,
    /// Surviving birds, in stable agent order.
    pub birds: Vec<&'a Bird>,
    pub pipes: &'a [Pipe],
    pub ground: &'a Ground,
}

/// Receives one frame per simulation tick.
pub trait Renderer {
    fn draw(&mut self, frame: &FrameView<'_>);
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn draw(&mut self, frame: &FrameView<'_>) {
        (**self).draw(frame)
    }
}

/// Renderer that discards frames but keeps simple counters.
#[derive(Debug, Default, Clone)]
pub struct HeadlessRenderer {
    frames: u64,
    last_score: u32,
    peak_birds: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames drawn.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Score shown in the most recent frame.
    pub fn last_score(&self) -> u32 {
        self.last_score
    }

    /// Most birds seen alive in a single frame.
    pub fn peak_birds(&self) -> usize {
        self.peak_birds
    }
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        self.last_score = frame.score;
        self.peak_birds = self.peak_birds.max(frame.birds.len());
    }
}

/// Sleep-to-deadline pacing for a fixed tick rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl FrameClock {
    /// Create a clock running at `rate` ticks per second.
    pub fn new(rate: f32) -> Self {
        Self {
            interval: Duration::from_secs_f32(1.0 / rate),
            next_deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next tick is due. The first call returns immediately.
    ///
    /// If the caller has fallen behind, the schedule restarts from now rather
    /// than bursting to catch up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        let deadline = match self.next_deadline {
            Some(deadline) if deadline > now => {
                thread::sleep(deadline - now);
                deadline
            }
            _ => now,
        };
        self.next_deadline = Some(deadline + self.interval);
    }
}
