//! Pipe pairs scrolling across the playfield.

use rand::Rng;

use crate::schema::GameConfig;

use super::bird::Bird;

/// Geometry shared by every pipe in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeGeometry {
    /// Vertical gap between the two pipes.
    pub gap: f32,
    /// Horizontal velocity (units per tick).
    pub velocity: f32,
    /// Sprite width.
    pub width: f32,
    /// Sprite height.
    pub height: f32,
    /// Half-open range for the gap's top edge.
    pub gap_top_range: (i32, i32),
}

impl PipeGeometry {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            gap: config.pipe_gap,
            velocity: config.pipe_velocity,
            width: config.pipe_size.0 as f32,
            height: config.pipe_size.1 as f32,
            gap_top_range: config.gap_top_range,
        }
    }
}

/// A top/bottom pipe pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    /// Left edge.
    pub x: f32,
    /// Bottom edge of the top pipe.
    pub gap_top: f32,
    /// Top edge of the bottom pipe.
    pub gap_bottom: f32,
    passed: bool,
    geometry: PipeGeometry,
}

impl Pipe {
    /// Create a pipe with a fixed gap position.
    pub fn new(x: f32, gap_top: f32, geometry: PipeGeometry) -> Self {
        Self {
            x,
            gap_top,
            gap_bottom: gap_top + geometry.gap,
            passed: false,
            geometry,
        }
    }

    /// Create a pipe with a random gap position.
    pub fn create<R: Rng + ?Sized>(spawn_x: f32, rng: &mut R, geometry: PipeGeometry) -> Self {
        let (lo, hi) = geometry.gap_top_range;
        let gap_top = rng.gen_range(lo..hi) as f32;
        Self::new(spawn_x, gap_top, geometry)
    }

    pub fn geometry(&self) -> &PipeGeometry {
        &self.geometry
    }

    /// Vertical position at which the top pipe's sprite is drawn.
    #[inline]
    pub fn top_pipe_y(&self) -> f32 {
        self.gap_top - self.geometry.height
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.geometry.width
    }

    pub fn advance(&mut self) {
        self.x -= self.geometry.velocity;
    }

    /// True once the pipe has scrolled fully past the left edge.
    pub fn is_off_screen(&self) -> bool {
        self.right() < 0.0
    }

    /// Whether a bird has been passed. Latches on the first transition.
    pub fn has_been_passed_by(&mut self, bird: &Bird) -> bool {
        if !self.passed && self.x < bird.x {
            self.passed = true;
        }
        self.passed
    }

    pub fn passed(&self) -> bool {
        self.passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn geometry() -> PipeGeometry {
        PipeGeometry::from_config(&GameConfig::default())
    }

    #[test]
    fn test_create_draws_gap_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let pipe = Pipe::create(600.0, &mut rng, geometry());
            assert!(pipe.gap_top >= 50.0 && pipe.gap_top < 450.0);
            assert_eq!(pipe.gap_top.fract(), 0.0);
            assert_eq!(pipe.top_pipe_y(), pipe.gap_top - 640.0);
        }
    }

    #[test]
    fn test_scroll_to_origin_and_off_screen() {
        let mut pipe = Pipe::new(600.0, 200.0, geometry());
        for _ in 0..120 {
            pipe.advance();
        }
        assert_eq!(pipe.x, 0.0);
        assert!(!pipe.is_off_screen());

        // Off-screen once the right edge (x + 104) is left of zero.
        for _ in 120..140 {
            pipe.advance();
        }
        assert_eq!(pipe.x, -100.0);
        assert!(!pipe.is_off_screen());

        pipe.advance();
        assert!(pipe.is_off_screen());
    }

    #[test]
    fn test_pass_latch_is_idempotent() {
        let physics = GameConfig::default().physics;
        let bird = Bird::new(230.0, 350.0, physics);
        let mut pipe = Pipe::new(240.0, 200.0, geometry());
        assert!(!pipe.has_been_passed_by(&bird));

        pipe.advance();
        pipe.advance();
        // x == bird.x is not yet past.
        assert!(!pipe.has_been_passed_by(&bird));

        pipe.advance();
        assert!(pipe.has_been_passed_by(&bird));
        assert!(pipe.has_been_passed_by(&bird));

        // Latch holds even if queried with a bird further left.
        let behind = Bird::new(0.0, 350.0, physics);
        assert!(pipe.has_been_passed_by(&behind));
        assert!(pipe.passed());
    }

    proptest! {
        #[test]
        fn prop_gap_edges_are_consistent(seed in any::<u64>(), ticks in 0usize..300) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut pipe = Pipe::create(600.0, &mut rng, geometry());
            let (top, bottom) = (pipe.gap_top, pipe.gap_bottom);
            for _ in 0..ticks {
                pipe.advance();
            }
            prop_assert_eq!(pipe.gap_top + 200.0, pipe.gap_bottom);
            prop_assert_eq!((pipe.gap_top, pipe.gap_bottom), (top, bottom));
        }
    }
}
