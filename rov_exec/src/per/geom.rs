//! # Geometric transforms
//!
//! Pure coordinate maths used by the perception pipeline: conversion of rover-centric pixel
//! positions into world map cells and into polar form.
//!
//! Frames:
//! - Rover-centric (RC): origin at the bottom-centre of the rectified image, x forward, y left,
//!   units of rectified pixels.
//! - World (WD): the world map grid, units of cells.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use util::maths;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A set of points in the rover-centric frame, stored as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoverPoints {
    /// Forward offsets
    pub x: Vec<f64>,

    /// Leftward offsets
    pub y: Vec<f64>,
}

/// A set of points in polar form about the rover origin, stored as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolarPoints {
    /// Distance of each point from the rover, always non-negative
    pub dists: Vec<f64>,

    /// Angle of each point from the rover's forward axis, positive to the left, in (-pi, pi].
    ///
    /// Units: radians
    pub angles_rad: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoverPoints {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

impl PolarPoints {
    pub fn len(&self) -> usize {
        self.dists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dists.is_empty()
    }

    /// Mean angle of the points in degrees, or `None` if there are no points.
    pub fn mean_angle_deg(&self) -> Option<f64> {
        maths::mean(&self.angles_rad).map(f64::to_degrees)
    }

    /// Mean distance of the points whose angle lies within `half_fov_deg` of straight ahead, or
    /// `None` if no point lies in that field.
    pub fn mean_dist_within(&self, half_fov_deg: f64) -> Option<f64> {
        let half_fov_rad = half_fov_deg.to_radians();

        let in_view: Vec<f64> = self.dists
            .iter()
            .zip(self.angles_rad.iter())
            .filter(|(_, a)| a.abs() <= half_fov_rad)
            .map(|(d, _)| *d)
            .collect();

        maths::mean(&in_view)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Rotate a point about the origin by `yaw_deg` degrees (anticlockwise positive).
pub fn rotate(x: f64, y: f64, yaw_deg: f64) -> (f64, f64) {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();

    (x * cos - y * sin, x * sin + y * cos)
}

/// Scale a rotated point down by `scale` and translate it to the given origin, truncating the
/// result towards zero to integer cell coordinates.
pub fn translate(x_rot: f64, y_rot: f64, origin: &Vector2<f64>, scale: f64) -> (i64, i64) {
    (
        (origin.x + x_rot / scale) as i64,
        (origin.y + y_rot / scale) as i64,
    )
}

/// Convert a rover-centric point into world map cell coordinates.
///
/// The result is clipped to `[0, grid_size - 1]` on both axes, so detections beyond the edge of
/// the map accumulate on the boundary cells.
pub fn to_world(
    x: f64,
    y: f64,
    origin: &Vector2<f64>,
    yaw_deg: f64,
    grid_size: usize,
    scale: f64,
) -> (usize, usize) {
    let (x_rot, y_rot) = rotate(x, y, yaw_deg);
    let (x_tran, y_tran) = translate(x_rot, y_rot, origin, scale);

    let max = grid_size.saturating_sub(1) as i64;

    (
        x_tran.max(0).min(max) as usize,
        y_tran.max(0).min(max) as usize,
    )
}

/// Convert all points in a rover-centric set into world map cell coordinates.
pub fn points_to_world(
    points: &RoverPoints,
    origin: &Vector2<f64>,
    yaw_deg: f64,
    grid_size: usize,
    scale: f64,
) -> Vec<(usize, usize)> {
    points.x
        .iter()
        .zip(points.y.iter())
        .map(|(x, y)| to_world(*x, *y, origin, yaw_deg, grid_size, scale))
        .collect()
}

/// Convert rover-centric points into polar form.
///
/// The angle of the zero vector is defined as 0.
pub fn to_polar(x: &[f64], y: &[f64]) -> PolarPoints {
    let mut polar = PolarPoints {
        dists: Vec::with_capacity(x.len()),
        angles_rad: Vec::with_capacity(x.len()),
    };

    for (x, y) in x.iter().zip(y.iter()) {
        polar.dists.push(x.hypot(*y));

        if *x == 0.0 && *y == 0.0 {
            polar.angles_rad.push(0.0);
        } else {
            polar.angles_rad.push(y.atan2(*x));
        }
    }

    polar
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE_POINTS: [(f64, f64); 6] = [
        (0.0, 0.0),
        (1.0, 0.0),
        (3.0, -4.0),
        (-120.5, 37.25),
        (160.0, 160.0),
        (1e-9, -2e6),
    ];

    #[test]
    fn test_rotate_preserves_magnitude() {
        for &(x, y) in SAMPLE_POINTS.iter() {
            let mut yaw = -720.0;
            while yaw <= 720.0 {
                let (xr, yr) = rotate(x, y, yaw);
                let before = x * x + y * y;
                let after = xr * xr + yr * yr;
                assert!(
                    (before - after).abs() <= 1e-9 * before.max(1.0),
                    "magnitude changed for ({}, {}) at yaw {}", x, y, yaw
                );
                yaw += 7.5;
            }
        }
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let (x, y) = rotate(1.0, 0.0, 90.0);
        assert!((x - 0.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_translate_truncates() {
        let origin = Vector2::new(10.0, 20.0);
        assert_eq!(translate(50.0, -50.0, &origin, 20.0), (12, 17));
        assert_eq!(translate(-230.0, 0.0, &origin, 20.0), (-1, 20));
    }

    #[test]
    fn test_to_world_is_clipped() {
        let origins = [
            Vector2::new(0.0, 0.0),
            Vector2::new(99.5, 100.2),
            Vector2::new(-5000.0, 1e9),
        ];

        for grid_size in [1usize, 2, 200].iter() {
            for origin in origins.iter() {
                for &(x, y) in SAMPLE_POINTS.iter() {
                    for yaw in [0.0, 45.0, 181.0, 359.9].iter() {
                        for scale in [0.01, 1.0, 20.0].iter() {
                            let (xw, yw) = to_world(x, y, origin, *yaw, *grid_size, *scale);
                            assert!(xw < *grid_size && yw < *grid_size);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_to_world_in_range() {
        // 40 pixels ahead while facing along +y puts the point 2 cells up from (100, 100)
        let cell = to_world(40.0, 0.0, &Vector2::new(100.0, 100.0), 90.0, 200, 20.0);
        assert_eq!(cell, (100, 102));
    }

    #[test]
    fn test_to_polar() {
        let polar = to_polar(&[1.0, 0.0, 3.0, -1.0], &[0.0, 0.0, 4.0, 0.0]);

        assert_eq!(polar.dists, vec![1.0, 0.0, 5.0, 1.0]);
        assert_eq!(polar.angles_rad[0], 0.0);
        assert_eq!(polar.angles_rad[1], 0.0);
        assert!((polar.angles_rad[2] - (4f64).atan2(3.0)).abs() < 1e-12);
        assert_eq!(polar.angles_rad[3], std::f64::consts::PI);
    }

    #[test]
    fn test_polar_distance_is_rotation_invariant() {
        for &(x, y) in SAMPLE_POINTS.iter() {
            let base = to_polar(&[x], &[y]).dists[0];
            for yaw in [13.0, 90.0, 200.0, 333.3].iter() {
                let (xr, yr) = rotate(x, y, *yaw);
                let rotated = to_polar(&[xr], &[yr]).dists[0];
                assert!((base - rotated).abs() <= 1e-9 * base.max(1.0));
            }
        }
    }

    #[test]
    fn test_mean_angle_of_empty_set_is_none() {
        assert_eq!(PolarPoints::default().mean_angle_deg(), None);
        assert_eq!(PolarPoints::default().mean_dist_within(15.0), None);
    }

    #[test]
    fn test_mean_dist_within_filters_by_angle() {
        let polar = PolarPoints {
            dists: vec![2.0, 4.0, 100.0],
            angles_rad: vec![0.0, (-10f64).to_radians(), (60f64).to_radians()],
        };

        assert_eq!(polar.mean_dist_within(15.0), Some(3.0));
        assert_eq!(polar.mean_dist_within(90.0), Some(106.0 / 3.0));
    }
}
