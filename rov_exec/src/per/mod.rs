//! # Perception
//!
//! Turns a single forward camera frame into the rover's picture of its surroundings. Each step
//! runs:
//!
//! 1. Rectification of the frame into a top-down view
//! 2. Colour-threshold classification into terrain, obstacle and rock masks
//! 3. Conversion of each mask into rover-centric points
//! 4. Accumulation of the points into the world map, only while the rover is level
//! 5. Polar summarisation of the points for the decision controller

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod classify;
pub mod geom;
mod params;
pub mod rectify;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;
use log::trace;
use serde::Serialize;

use util::{maths::is_level_deg, params::LoadError};

pub use params::PerMgrParams;
use geom::{PolarPoints, RoverPoints};
use rectify::Rectifier;
use crate::{
    map::{WorldMap, WorldMapLayer},
    rover::RoverState,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Perception manager, holding the fixed calibration for the camera.
#[derive(Debug, Clone)]
pub struct PerMgr {
    params: PerMgrParams,
    rectifier: Rectifier,
}

/// Perception outputs for one tick, in polar form about the rover.
///
/// An empty mask gives empty sequences here, which is distinct from perception never having run
/// (`RoverState::perception` is `None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerOutput {
    pub nav: PolarPoints,
    pub rock: PolarPoints,
    pub obstacle: PolarPoints,
}

/// Summary of a perception step for logging and archiving.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PerReport {
    pub nav_pixels: usize,
    pub obstacle_pixels: usize,
    pub rock_pixels: usize,

    /// True if the rover was level and the world map was updated
    pub map_updated: bool,

    /// Number of world map cells incremented, across all layers
    pub cells_incremented: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PerError {
    #[error("Failed to load the perception parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(u32, u32),

    #[error("Expected an image of size {expected:?} but found {found:?}")]
    UnexpectedImageSize {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("The {0} quadrilateral is degenerate")]
    DegenerateQuad(&'static str),

    #[error("The rectification transform is singular")]
    SingularTransform,

    #[error("Invalid classifier thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Invalid world map parameters: {0}")]
    InvalidWorldMap(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PerMgr {
    /// Load the parameters from the given file (relative to the params directory) and build the
    /// manager.
    pub fn init(params_path: &str) -> Result<Self, PerError> {
        let params: PerMgrParams = match util::params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(PerError::ParamLoadError(e)),
        };

        Self::new(params)
    }

    /// Build the manager from parameters, validating them and the calibration.
    pub fn new(params: PerMgrParams) -> Result<Self, PerError> {
        params.validate()?;

        let rectifier = Rectifier::new(
            &params.rect_src_px,
            &params.rect_dst_px(),
            params.image_width_px,
            params.image_height_px,
        )?;

        Ok(Self { params, rectifier })
    }

    pub fn params(&self) -> &PerMgrParams {
        &self.params
    }

    /// Build an empty world map sized for these parameters.
    pub fn new_world_map(&self) -> WorldMap {
        WorldMap::new(self.params.world_map_size_cells)
    }

    /// Process one camera frame.
    ///
    /// Updates the perception outputs and debug image on the rover state, and accumulates into
    /// the world map if the rover is level. On error the rover state and map are left untouched.
    pub fn step(
        &self,
        image: &RgbImage,
        rover: &mut RoverState,
        world_map: &mut WorldMap,
    ) -> Result<PerReport, PerError> {
        let rectified = self.rectifier.warp(image)?;
        let thresh = &self.params.classifier;

        let mut terrain = classify::terrain_mask(&rectified.image, &thresh.terrain_thresh);
        let mut obstacle = classify::obstacle_mask(&rectified.image, &thresh.obstacle_thresh);
        let mut rock = classify::rock_mask(&rectified.image, &thresh.rock_low, &thresh.rock_high);

        classify::restrict_to(&mut terrain, &rectified.footprint);
        classify::restrict_to(&mut obstacle, &rectified.footprint);
        classify::restrict_to(&mut rock, &rectified.footprint);

        rover.vision_image = Some(classify::vision_image(&obstacle, &rock, &terrain));

        let nav_pts = classify::rover_coords(&terrain);
        let obs_pts = classify::rover_coords(&obstacle);
        let rock_pts = classify::rover_coords(&rock);

        let mut report = PerReport {
            nav_pixels: classify::count(&terrain),
            obstacle_pixels: classify::count(&obstacle),
            rock_pixels: classify::count(&rock),
            ..Default::default()
        };

        // Attitude gate
        let tol = self.params.level_tol_deg;
        if is_level_deg(rover.roll_deg, tol) && is_level_deg(rover.pitch_deg, tol) {
            for (layer, pts) in [
                (WorldMapLayer::Obstacle, &obs_pts),
                (WorldMapLayer::Rock, &rock_pts),
                (WorldMapLayer::Terrain, &nav_pts),
            ]
            .iter()
            {
                report.cells_incremented += self.accumulate(world_map, rover, *layer, pts);
            }
            report.map_updated = true;
        }
        else {
            trace!(
                "Rover not level (roll {:.1}, pitch {:.1}), world map not updated",
                rover.roll_deg,
                rover.pitch_deg
            );
        }

        rover.perception = Some(PerOutput {
            nav: geom::to_polar(&nav_pts.x, &nav_pts.y),
            rock: geom::to_polar(&rock_pts.x, &rock_pts.y),
            obstacle: geom::to_polar(&obs_pts.x, &obs_pts.y),
        });

        Ok(report)
    }

    fn accumulate(
        &self,
        world_map: &mut WorldMap,
        rover: &RoverState,
        layer: WorldMapLayer,
        points: &RoverPoints,
    ) -> usize {
        let cells = geom::points_to_world(
            points,
            &rover.position,
            rover.yaw_deg,
            world_map.size(),
            self.params.world_map_scale,
        );

        world_map.accumulate(layer, &cells)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;
    use nalgebra::Vector2;

    fn level_rover() -> RoverState {
        let mut rover = RoverState::default();
        rover.position = Vector2::new(100.0, 100.0);
        rover
    }

    fn uniform_frame(px: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(320, 160, Rgb(px))
    }

    #[test]
    fn test_bright_frame_is_navigable() {
        let per = PerMgr::new(PerMgrParams::default()).unwrap();
        let mut map = per.new_world_map();
        let mut rover = level_rover();

        let report = per.step(&uniform_frame([200, 200, 200]), &mut rover, &mut map).unwrap();

        assert!(report.nav_pixels > 0);
        assert_eq!(report.obstacle_pixels, 0);
        assert_eq!(report.rock_pixels, 0);
        assert!(report.map_updated);

        let out = rover.perception.unwrap();
        assert_eq!(out.nav.len(), report.nav_pixels);
        assert!(out.rock.is_empty());
        assert!(out.obstacle.is_empty());

        // Straight ahead of the rover the ground is navigable
        let mean = out.nav.mean_angle_deg().unwrap();
        assert!(mean.abs() < 10.0, "mean nav angle {}", mean);

        assert!(map.summary().terrain_cells > 0);
        assert_eq!(map.summary().obstacle_cells, 0);
        assert!(rover.vision_image.is_some());
    }

    #[test]
    fn test_dark_frame_gives_empty_nav() {
        let per = PerMgr::new(PerMgrParams::default()).unwrap();
        let mut map = per.new_world_map();
        let mut rover = level_rover();

        let report = per.step(&uniform_frame([40, 40, 40]), &mut rover, &mut map).unwrap();

        assert_eq!(report.nav_pixels, 0);
        assert!(report.obstacle_pixels > 0);

        // Empty, not absent
        let out = rover.perception.unwrap();
        assert!(out.nav.is_empty());
        assert!(out.nav.mean_angle_deg().is_none());
        assert!(!out.obstacle.is_empty());
    }

    #[test]
    fn test_attitude_gate() {
        let per = PerMgr::new(PerMgrParams::default()).unwrap();
        let frame = uniform_frame([200, 200, 200]);

        for (roll, pitch) in [(10.0, 0.0), (0.0, 350.0), (3.5, 356.5), (180.0, 180.0)].iter() {
            let mut map = per.new_world_map();
            let mut rover = level_rover();
            rover.roll_deg = *roll;
            rover.pitch_deg = *pitch;

            let report = per.step(&frame, &mut rover, &mut map).unwrap();

            assert!(!report.map_updated);
            assert_eq!(report.cells_incremented, 0);
            assert_eq!(map.summary().terrain_cells, 0);

            // Polar outputs are still produced
            assert!(!rover.perception.unwrap().nav.is_empty());
        }

        // Wraparound near 360 counts as level
        let mut map = per.new_world_map();
        let mut rover = level_rover();
        rover.roll_deg = 358.0;
        rover.pitch_deg = 2.5;
        assert!(per.step(&frame, &mut rover, &mut map).unwrap().map_updated);
    }

    #[test]
    fn test_map_counters_non_decreasing() {
        let per = PerMgr::new(PerMgrParams::default()).unwrap();
        let mut map = per.new_world_map();
        let mut rover = level_rover();

        let mut frame = uniform_frame([200, 200, 200]);
        for x in 0..160 {
            for y in 0..160 {
                frame.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }

        let attitudes = [(0.0, 0.0), (20.0, 0.0), (1.0, 359.0), (0.0, 0.0)];
        let mut prev = map.clone();

        for (i, (roll, pitch)) in attitudes.iter().enumerate() {
            rover.roll_deg = *roll;
            rover.pitch_deg = *pitch;
            rover.yaw_deg = 30.0 * i as f64;

            per.step(&frame, &mut rover, &mut map).unwrap();

            for layer in WorldMapLayer::ALL.iter() {
                let before = prev.layer(*layer);
                let after = map.layer(*layer);
                assert!(before.iter().zip(after.iter()).all(|(b, a)| a >= b));
            }

            prev = map.clone();
        }
    }

    #[test]
    fn test_wrong_frame_size_leaves_state() {
        let per = PerMgr::new(PerMgrParams::default()).unwrap();
        let mut map = per.new_world_map();
        let mut rover = level_rover();

        let frame = RgbImage::from_pixel(160, 120, Rgb([200, 200, 200]));
        assert!(matches!(
            per.step(&frame, &mut rover, &mut map),
            Err(PerError::UnexpectedImageSize { .. })
        ));
        assert!(rover.perception.is_none());
        assert_eq!(map.summary().terrain_cells, 0);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = PerMgrParams::default();
        params.world_map_size_cells = 0;
        assert!(matches!(PerMgr::new(params), Err(PerError::InvalidWorldMap(_))));

        let mut params = PerMgrParams::default();
        params.world_map_scale = 0.0;
        assert!(matches!(PerMgr::new(params), Err(PerError::InvalidWorldMap(_))));

        let mut params = PerMgrParams::default();
        params.rect_src_px = [[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [30.0, 0.0]];
        assert!(matches!(PerMgr::new(params), Err(PerError::DegenerateQuad("source"))));
    }

    #[test]
    fn test_params_from_toml() {
        let params: PerMgrParams = util::params::from_str(
            r#"
            image_width_px = 320
            image_height_px = 160
            rect_src_px = [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]]
            rect_dst_half_size_px = 5.0
            rect_bottom_offset_px = 6.0
            world_map_size_cells = 200
            world_map_scale = 20.0
            level_tol_deg = 3.0

            [classifier]
            terrain_thresh = [160, 160, 160]
            obstacle_thresh = [160, 160, 160]
            rock_low = [100, 100, 20]
            rock_high = [210, 210, 55]
            "#,
        )
        .unwrap();

        assert_eq!(
            params.rect_dst_px(),
            [[155.0, 154.0], [165.0, 154.0], [165.0, 144.0], [155.0, 144.0]]
        );
        assert!(PerMgr::new(params).is_ok());
    }
}
