//! Parameters structure for the perception pipeline

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{classify::ClassifierParams, rectify::Quad, PerError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the perception pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerMgrParams {

    // ---- CAMERA ----

    /// Width of the forward camera image.
    ///
    /// Units: pixels
    pub image_width_px: u32,

    /// Height of the forward camera image.
    ///
    /// Units: pixels
    pub image_height_px: u32,

    // ---- RECTIFICATION ----

    /// Corners of a one-metre grid square on flat ground as seen by the camera, in the order
    /// bottom-left, bottom-right, top-right, top-left.
    ///
    /// Units: pixels
    pub rect_src_px: Quad,

    /// Half the side of the square the source corners map to in the top-down image.
    ///
    /// Units: pixels
    pub rect_dst_half_size_px: f64,

    /// Gap between the bottom of the top-down image and the bottom of the destination square,
    /// covering the ground hidden beneath the camera.
    ///
    /// Units: pixels
    pub rect_bottom_offset_px: f64,

    // ---- CLASSIFICATION ----

    pub classifier: ClassifierParams,

    // ---- WORLD MAP ----

    /// Number of world map cells along each axis.
    pub world_map_size_cells: usize,

    /// Number of rectified pixels per world map cell.
    pub world_map_scale: f64,

    /// Roll and pitch must be within this angle of level for the world map to be updated.
    ///
    /// Units: degrees
    pub level_tol_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PerMgrParams {
    fn default() -> Self {
        Self {
            image_width_px: 320,
            image_height_px: 160,
            rect_src_px: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            rect_dst_half_size_px: 5.0,
            rect_bottom_offset_px: 6.0,
            classifier: ClassifierParams::default(),
            world_map_size_cells: 200,
            world_map_scale: 20.0,
            level_tol_deg: 3.0,
        }
    }
}

impl PerMgrParams {
    /// The destination square in the top-down image, centred on the bottom of the image.
    pub fn rect_dst_px(&self) -> Quad {
        let cx = self.image_width_px as f64 / 2.0;
        let bottom = self.image_height_px as f64 - self.rect_bottom_offset_px;
        let s = self.rect_dst_half_size_px;

        [
            [cx - s, bottom],
            [cx + s, bottom],
            [cx + s, bottom - 2.0 * s],
            [cx - s, bottom - 2.0 * s],
        ]
    }

    /// Check the parameters are usable. The quadrilaterals themselves are checked when the
    /// rectifier is built.
    pub fn validate(&self) -> Result<(), PerError> {
        if self.image_width_px == 0 || self.image_height_px == 0 {
            return Err(PerError::InvalidImageSize(self.image_width_px, self.image_height_px));
        }

        if !(self.rect_dst_half_size_px > 0.0) || !(self.rect_bottom_offset_px >= 0.0) {
            return Err(PerError::DegenerateQuad("destination"));
        }

        if self.world_map_size_cells == 0 {
            return Err(PerError::InvalidWorldMap(String::from("grid size must be at least 1")));
        }

        if !(self.world_map_scale > 0.0) || !self.world_map_scale.is_finite() {
            return Err(PerError::InvalidWorldMap(format!(
                "scale must be positive, found {}",
                self.world_map_scale
            )));
        }

        if !(self.level_tol_deg >= 0.0) {
            return Err(PerError::InvalidThresholds(format!(
                "level tolerance must be non-negative, found {}",
                self.level_tol_deg
            )));
        }

        self.classifier.validate()
    }
}
