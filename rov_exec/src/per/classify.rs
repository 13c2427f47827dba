//! # Terrain classification
//!
//! Per-pixel colour threshold tests producing binary masks for navigable terrain, obstacles and
//! rock samples.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{geom::RoverPoints, PerError};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A binary mask with the same dimensions as the source image, indexed `[[row, col]]`. Each
/// element is 0 or 1.
pub type Mask = Array2<u8>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Colour thresholds for each class, as `[r, g, b]` triples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// A pixel is navigable terrain if every channel is strictly above this threshold.
    pub terrain_thresh: [u8; 3],

    /// A pixel is an obstacle if every channel is at or below this threshold.
    pub obstacle_thresh: [u8; 3],

    /// A pixel is a rock sample if every channel lies strictly between `rock_low` and
    /// `rock_high`.
    pub rock_low: [u8; 3],
    pub rock_high: [u8; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            terrain_thresh: [160, 160, 160],
            obstacle_thresh: [160, 160, 160],
            rock_low: [100, 100, 20],
            rock_high: [210, 210, 55],
        }
    }
}

impl ClassifierParams {
    /// Check the rock band is non-empty on every channel.
    pub fn validate(&self) -> Result<(), PerError> {
        for c in 0..3 {
            if self.rock_low[c] >= self.rock_high[c] {
                return Err(PerError::InvalidThresholds(format!(
                    "rock band on channel {} is empty ({} >= {})",
                    c, self.rock_low[c], self.rock_high[c]
                )));
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Navigable terrain: bright ground, every channel above the threshold.
pub fn terrain_mask(img: &RgbImage, thresh: &[u8; 3]) -> Mask {
    threshold(img, |p| (0..3).all(|c| p[c] > thresh[c]))
}

/// Obstacles: every channel at or below the threshold.
pub fn obstacle_mask(img: &RgbImage, thresh: &[u8; 3]) -> Mask {
    threshold(img, |p| (0..3).all(|c| p[c] <= thresh[c]))
}

/// Rock samples: every channel within the open interval `(low, high)`.
pub fn rock_mask(img: &RgbImage, low: &[u8; 3], high: &[u8; 3]) -> Mask {
    threshold(img, |p| (0..3).all(|c| p[c] > low[c] && p[c] < high[c]))
}

/// Clear every element of the mask lying outside the footprint.
pub fn restrict_to(mask: &mut Mask, footprint: &Array2<bool>) {
    mask.zip_mut_with(footprint, |m, f| {
        if !*f {
            *m = 0
        }
    });
}

/// Number of set elements in the mask.
pub fn count(mask: &Mask) -> usize {
    mask.iter().filter(|v| **v != 0).count()
}

/// Convert the set pixels of a mask into rover-centric points.
///
/// The rover sits at the bottom-centre of the image. A pixel at `(row, col)` maps to
/// `x = H - row`, `y = H - col`, where `H` is the image height. The image height is used as the
/// lateral reference too, which matches the calibrated camera geometry (width = 2 * height).
pub fn rover_coords(mask: &Mask) -> RoverPoints {
    let height = mask.nrows() as f64;
    let mut points = RoverPoints::default();

    for ((row, col), v) in mask.indexed_iter() {
        if *v != 0 {
            points.x.push(height - row as f64);
            points.y.push(-(col as f64 - height));
        }
    }

    points
}

/// Build a three channel debug image with obstacles in red, rocks in green and terrain in blue.
pub fn vision_image(obstacle: &Mask, rock: &Mask, terrain: &Mask) -> RgbImage {
    let (rows, cols) = obstacle.dim();

    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let idx = [y as usize, x as usize];
        Rgb([obstacle[idx] * 255, rock[idx] * 255, terrain[idx] * 255])
    })
}

fn threshold<F>(img: &RgbImage, pred: F) -> Mask
where
    F: Fn(&Rgb<u8>) -> bool,
{
    let (w, h) = img.dimensions();

    Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        pred(img.get_pixel(col as u32, row as u32)) as u8
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
