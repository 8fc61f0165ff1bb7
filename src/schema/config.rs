//! Configuration types for the game world, rewards, and session control.

use serde::{Deserialize, Serialize};

/// Playfield geometry and scroll speeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Playfield width in units.
    pub playfield_width: f32,
    /// Playfield height in units.
    pub playfield_height: f32,
    /// Vertical position of the ground line.
    pub ground_y: f32,
    /// Vertical gap between top and bottom pipe.
    pub pipe_gap: f32,
    /// Horizontal pipe velocity (units per tick).
    pub pipe_velocity: f32,
    /// Horizontal ground velocity (units per tick).
    pub ground_velocity: f32,
    /// Extra distance past the right edge at which new pipes spawn.
    pub pipe_spacing: f32,
    /// Half-open range `[min, max)` for the gap's top edge.
    pub gap_top_range: (i32, i32),
    /// Bird spawn position `(x, y)`.
    pub bird_start: (f32, f32),
    /// Bird sprite size `(width, height)`.
    pub bird_size: (u32, u32),
    /// Pipe sprite size `(width, height)`.
    pub pipe_size: (u32, u32),
    /// Width of one ground tile.
    pub ground_tile_width: f32,
    /// Bird kinematics.
    pub physics: BirdPhysics,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            playfield_width: 500.0,
            playfield_height: 800.0,
            ground_y: 730.0,
            pipe_gap: 200.0,
            pipe_velocity: 5.0,
            ground_velocity: 5.0,
            pipe_spacing: 100.0,
            gap_top_range: (50, 450),
            bird_start: (230.0, 350.0),
            bird_size: (68, 48),
            pipe_size: (104, 640),
            ground_tile_width: 672.0,
            physics: BirdPhysics::default(),
        }
    }
}

impl GameConfig {
    /// Horizontal position at which new pipes are spawned.
    #[inline]
    pub fn spawn_x(&self) -> f32 {
        self.playfield_width + self.pipe_spacing
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.playfield_width <= 0.0 || self.playfield_height <= 0.0 {
            return Err(ConfigError::InvalidPlayfield);
        }
        if self.ground_y <= 0.0 || self.ground_y > self.playfield_height {
            return Err(ConfigError::InvalidGroundLine(self.ground_y));
        }
        if self.pipe_gap <= 0.0 {
            return Err(ConfigError::InvalidPipeGap(self.pipe_gap));
        }
        if self.gap_top_range.0 >= self.gap_top_range.1 {
            return Err(ConfigError::InvalidGapRange {
                min: self.gap_top_range.0,
                max: self.gap_top_range.1,
            });
        }
        if self.bird_size.0 == 0 || self.bird_size.1 == 0 {
            return Err(ConfigError::InvalidSprite("bird"));
        }
        if self.pipe_size.0 == 0 || self.pipe_size.1 == 0 {
            return Err(ConfigError::InvalidSprite("pipe"));
        }
        if self.ground_tile_width <= 0.0 {
            return Err(ConfigError::InvalidSprite("ground"));
        }
        if self.physics.max_fall <= 0.0 {
            return Err(ConfigError::InvalidMaxFall(self.physics.max_fall));
        }
        Ok(())
    }
}

/// Kinematic constants shared by every bird in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdPhysics {
    /// Velocity applied by a jump (negative is up).
    pub jump_velocity: f32,
    /// Quadratic coefficient of the displacement law.
    pub gravity: f32,
    /// Maximum downward displacement per tick.
    pub max_fall: f32,
    /// Extra upward displacement applied while rising.
    pub jump_boost: f32,
    /// Upward tilt limit in degrees.
    pub max_rotation: f32,
    /// Tilt decrease per tick while falling.
    pub rotation_velocity: f32,
    /// Ticks per wing-flap animation frame.
    pub animation_time: u32,
}

impl Default for BirdPhysics {
    fn default() -> Self {
        Self {
            jump_velocity: -10.5,
            gravity: 1.5,
            max_fall: 10.0,
            jump_boost: 2.0,
            max_rotation: 25.0,
            rotation_velocity: 20.0,
            animation_time: 5,
        }
    }
}

/// Fitness shaping applied by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Fitness gained by every live agent each tick.
    pub survival_bonus: f64,
    /// Fitness gained by every live agent when a pipe is passed.
    pub pass_bonus: f64,
    /// Fitness lost on collision or leaving the playfield.
    pub crash_penalty: f64,
    /// Policy output above which the agent jumps.
    pub jump_threshold: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            survival_bonus: 0.1,
            pass_bonus: 5.0,
            crash_penalty: 1.0,
            jump_threshold: 0.5,
        }
    }
}

impl RewardConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rewards = [
            ("survival_bonus", self.survival_bonus),
            ("pass_bonus", self.pass_bonus),
            ("crash_penalty", self.crash_penalty),
            ("jump_threshold", f64::from(self.jump_threshold)),
        ];
        if let Some(&(name, value)) = rewards.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::InvalidReward { name, value });
        }
        if self.crash_penalty < 0.0 {
            return Err(ConfigError::InvalidReward {
                name: "crash_penalty",
                value: self.crash_penalty,
            });
        }
        Ok(())
    }
}

/// Tick pacing and safeguards for a generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock tick rate in Hz. `None` runs unthrottled (headless).
    pub tick_rate: Option<f32>,
    /// Hard ceiling on ticks per generation.
    pub max_ticks: Option<u64>,
    /// Seed for obstacle gap heights.
    pub random_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: None,
            max_ticks: Some(20_000),
            random_seed: None,
        }
    }
}

impl SessionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate) = self.tick_rate
            && (!rate.is_finite() || rate <= 0.0)
        {
            return Err(ConfigError::InvalidTickRate(rate));
        }
        if self.max_ticks == Some(0) {
            return Err(ConfigError::InvalidTickLimit);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Playfield dimensions must be positive")]
    InvalidPlayfield,
    #[error("Ground line {0} must lie inside the playfield")]
    InvalidGroundLine(f32),
    #[error("Pipe gap must be positive, got {0}")]
    InvalidPipeGap(f32),
    #[error("Gap range [{min}, {max}) is empty")]
    InvalidGapRange { min: i32, max: i32 },
    #[error("Sprite size for {0} must be non-zero")]
    InvalidSprite(&'static str),
    #[error("Maximum fall speed must be positive, got {0}")]
    InvalidMaxFall(f32),
    #[error("Reward {name} must be finite (penalty non-negative), got {value}")]
    InvalidReward { name: &'static str, value: f64 },
    #[error("Tick rate must be a positive number, got {0}")]
    InvalidTickRate(f32),
    #[error("Tick limit must be non-zero")]
    InvalidTickLimit,
    #[error("Network must have at least one input and one output")]
    InvalidNetworkShape,
    #[error("Network has {0} inputs but observations have 3 values")]
    ObservationMismatch(usize),
    #[error("Population size must be non-zero")]
    InvalidPopulationSize,
    #[error("Rate {name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f32 },
    #[error("Weight bounds ({0}, {1}) are empty")]
    InvalidWeightBounds(f32, f32),
}
