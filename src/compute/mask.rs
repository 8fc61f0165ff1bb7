//! Bitmap collision masks.
//!
//! Sprites are represented by precomputed silhouettes so collision tests do
//! not depend on a renderer being present.

use crate::schema::GameConfig;

/// A bitmap silhouette, one bit per pixel, rows packed into `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionMask {
    width: usize,
    height: usize,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl CollisionMask {
    /// Create an empty mask.
    pub fn new(width: usize, height: usize) -> Self {
        let words_per_row = width.div_ceil(64);
        Self {
            width,
            height,
            words_per_row,
            bits: vec![0; words_per_row * height],
        }
    }

    /// Create a mask with every pixel set.
    pub fn filled(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |_, _| true)
    }

    /// Create an elliptical silhouette inscribed in the sprite rectangle.
    pub fn ellipse(width: usize, height: usize) -> Self {
        let rx = width as f32 / 2.0;
        let ry = height as f32 / 2.0;
        Self::from_fn(width, height, |x, y| {
            let nx = (x as f32 + 0.5 - rx) / rx;
            let ny = (y as f32 + 0.5 - ry) / ry;
            nx * nx + ny * ny <= 1.0
        })
    }

    /// Build a mask from a per-pixel predicate.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Read one pixel. Out-of-bounds pixels are unset.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let word = self.bits[y * self.words_per_row + x / 64];
        word & (1 << (x % 64)) != 0
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let word = &mut self.bits[y * self.words_per_row + x / 64];
        if value {
            *word |= 1 << (x % 64);
        } else {
            *word &= !(1 << (x % 64));
        }
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check whether `other`, placed at `offset` relative to this mask's
    /// top-left corner, shares any set pixel with this mask.
    pub fn overlaps(&self, other: &CollisionMask, offset: (i32, i32)) -> bool {
        let (ox, oy) = (offset.0 as i64, offset.1 as i64);

        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width as i64).min(self.width as i64);
        let y1 = (oy + other.height as i64).min(self.height as i64);

        if x0 >= x1 || y0 >= y1 {
            return false;
        }

        for y in y0..y1 {
            let oy_local = (y - oy) as usize;
            for x in x0..x1 {
                let ox_local = (x - ox) as usize;
                if self.get(x as usize, y as usize) && other.get(ox_local, oy_local) {
                    return true;
                }
            }
        }
        false
    }
}

/// Silhouettes for every sprite involved in collisions.
#[derive(Debug, Clone)]
pub struct SpriteMasks {
    pub bird: CollisionMask,
    pub pipe: CollisionMask,
}

impl SpriteMasks {
    /// Build silhouettes matching the configured sprite sizes.
    pub fn from_config(config: &GameConfig) -> Self {
        let (bw, bh) = config.bird_size;
        let (pw, ph) = config.pipe_size;
        Self {
            bird: CollisionMask::ellipse(bw as usize, bh as usize),
            pipe: CollisionMask::filled(pw as usize, ph as usize),
        }
    }
}
