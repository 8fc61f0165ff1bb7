//! Bird kinematics.
//!
//! Displacement follows `d = v*t + g*t^2`, where `v` is the velocity set by
//! the last jump and `t` the ticks elapsed since it. The displacement is
//! clamped to the maximum fall speed and boosted while rising.

use crate::schema::BirdPhysics;

use super::mask::SpriteMasks;
use super::pipe::Pipe;

/// Tilt never drops below this angle (nose straight down).
pub const MIN_TILT: f32 = -90.0;

/// Tilt at or below which the wing animation freezes.
const DIVE_TILT: f32 = -80.0;

/// Height above the last jump point within which the bird keeps its nose up.
const TILT_HOLD_DISTANCE: f32 = 50.0;

/// Physical state of one bird.
#[derive(Debug, Clone, PartialEq)]
pub struct Bird {
    /// Horizontal position (fixed for the run).
    pub x: f32,
    /// Vertical position of the sprite's top edge.
    pub y: f32,
    /// Velocity set by the last jump.
    pub velocity: f32,
    /// Tilt in degrees, within `[MIN_TILT, physics.max_rotation]`.
    pub tilt: f32,
    /// Ticks elapsed since the last jump.
    pub tick_count: u32,
    /// Height at the last jump.
    pub jump_height: f32,
    animation_count: u32,
    physics: BirdPhysics,
}

impl Bird {
    /// Create a bird at rest.
    pub fn new(x: f32, y: f32, physics: BirdPhysics) -> Self {
        Self {
            x,
            y,
            velocity: 0.0,
            tilt: 0.0,
            tick_count: 0,
            jump_height: y,
            animation_count: 0,
            physics,
        }
    }

    pub fn physics(&self) -> &BirdPhysics {
        &self.physics
    }

    /// Apply an upward impulse.
    pub fn jump(&mut self) {
        self.velocity = self.physics.jump_velocity;
        self.tick_count = 0;
        self.jump_height = self.y;
    }

    /// Integrate one tick of motion and return the applied displacement.
    pub fn advance(&mut self) -> f32 {
        self.tick_count += 1;
        let t = self.tick_count as f32;
        let mut d = self.velocity * t + self.physics.gravity * t * t;

        if d >= self.physics.max_fall {
            d = self.physics.max_fall;
        }
        if d < 0.0 {
            d -= self.physics.jump_boost;
        }

        self.y += d;

        if d < 0.0 || self.y < self.jump_height + TILT_HOLD_DISTANCE {
            if self.tilt < self.physics.max_rotation {
                self.tilt = self.physics.max_rotation;
            }
        } else if self.tilt > MIN_TILT {
            self.tilt = (self.tilt - self.physics.rotation_velocity).max(MIN_TILT);
        }

        d
    }

    /// Pixel-accurate collision test against both halves of a pipe.
    pub fn collides_with(&self, pipe: &Pipe, masks: &SpriteMasks) -> bool {
        let bird_y = self.y.round_ties_even() as i32;
        let dx = (pipe.x - self.x).round_ties_even() as i32;

        let top_offset = (dx, pipe.top_pipe_y().round_ties_even() as i32 - bird_y);
        let bottom_offset = (dx, pipe.gap_bottom.round_ties_even() as i32 - bird_y);

        masks.bird.overlaps(&masks.pipe, top_offset)
            || masks.bird.overlaps(&masks.pipe, bottom_offset)
    }

    /// Advance the wing-flap animation counter. Cosmetic only.
    pub fn tick_animation(&mut self) {
        self.animation_count += 1;
        if self.animation_count > self.physics.animation_time * 4 {
            self.animation_count = 0;
        }
    }

    /// Current wing-flap frame (0, 1, 2, 1 cycle). Cosmetic only.
    pub fn animation_frame(&self) -> u8 {
        if self.tilt <= DIVE_TILT {
            return 1;
        }
        let period = self.physics.animation_time;
        if self.animation_count < period {
            0
        } else if self.animation_count < period * 2 {
            1
        } else if self.animation_count < period * 3 {
            2
        } else {
            1
        }
    }
}
