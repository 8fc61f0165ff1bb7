//! Scrolling ground strip built from two wrapping tiles.

use crate::schema::GameConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Ground {
    /// Vertical position of the ground line.
    pub y: f32,
    /// Left edge of the first tile.
    pub x1: f32,
    /// Left edge of the second tile.
    pub x2: f32,
    tile_width: f32,
    velocity: f32,
}

impl Ground {
    pub fn new(y: f32, tile_width: f32, velocity: f32) -> Self {
        Self {
            y,
            x1: 0.0,
            x2: tile_width,
            tile_width,
            velocity,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.ground_y,
            config.ground_tile_width,
            config.ground_velocity,
        )
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    /// Scroll both tiles, wrapping any tile that left the screen.
    pub fn advance(&mut self) {
        self.x1 -= self.velocity;
        self.x2 -= self.velocity;

        if self.x1 + self.tile_width < 0.0 {
            self.x1 = self.x2 + self.tile_width;
        }
        if self.x2 + self.tile_width < 0.0 {
            self.x2 = self.x1 + self.tile_width;
        }
    }
}
