//! # World Map

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::{fmt::Display, path::Path};

use image::{ImageResult, Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayView2, s};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Square grid of per-class evidence counters covering the whole terrain.
///
/// Each cell counts the number of ticks on which that class was observed in the cell. Counters
/// only ever increase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldMap {
    /// Number of cells along each axis
    size: usize,

    /// Raw map data, dimension order layer, y cell, x cell
    data: Array3<u32>,
}

/// Number of cells holding any evidence for each class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorldMapSummary {
    pub obstacle_cells: usize,
    pub rock_cells: usize,
    pub terrain_cells: usize,

    /// Cells where terrain evidence outweighs obstacle evidence
    pub navigable_cells: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible layers in a [`WorldMap`]
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
pub enum WorldMapLayer {
    Obstacle,
    Rock,
    Terrain,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WorldMapLayer {
    pub const ALL: [WorldMapLayer; 3] = [
        WorldMapLayer::Obstacle,
        WorldMapLayer::Rock,
        WorldMapLayer::Terrain,
    ];

    fn index(self) -> usize {
        match self {
            WorldMapLayer::Obstacle => 0,
            WorldMapLayer::Rock => 1,
            WorldMapLayer::Terrain => 2,
        }
    }
}

impl WorldMap {
    /// Create a new empty map with `size` by `size` cells.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: Array3::zeros((WorldMapLayer::ALL.len(), size, size)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the counter of the given cell, or `None` if the cell is outside the map.
    pub fn get(&self, layer: WorldMapLayer, x: usize, y: usize) -> Option<u32> {
        self.data.get([layer.index(), y, x]).copied()
    }

    /// View one layer of the map, indexed `[[y, x]]`.
    pub fn layer(&self, layer: WorldMapLayer) -> ArrayView2<u32> {
        self.data.slice(s![layer.index(), .., ..])
    }

    /// Add one observation of `layer` to each distinct cell in `cells`.
    ///
    /// A cell listed several times is only incremented once, so each counter measures the number
    /// of ticks the class was seen there. Cells outside the map are ignored. Returns the number of
    /// cells incremented.
    pub fn accumulate(&mut self, layer: WorldMapLayer, cells: &[(usize, usize)]) -> usize {
        let mut touched = Array2::from_elem((self.size, self.size), false);
        let mut layer_data = self.data.slice_mut(s![layer.index(), .., ..]);
        let mut num_incremented = 0;

        for &(x, y) in cells {
            if x >= self.size || y >= self.size || touched[[y, x]] {
                continue;
            }

            touched[[y, x]] = true;
            layer_data[[y, x]] = layer_data[[y, x]].saturating_add(1);
            num_incremented += 1;
        }

        num_incremented
    }

    /// Count the cells holding evidence in each layer.
    pub fn summary(&self) -> WorldMapSummary {
        let obstacle = self.layer(WorldMapLayer::Obstacle);
        let terrain = self.layer(WorldMapLayer::Terrain);

        let count = |layer| self.layer(layer).iter().filter(|v| **v > 0).count();

        WorldMapSummary {
            obstacle_cells: count(WorldMapLayer::Obstacle),
            rock_cells: count(WorldMapLayer::Rock),
            terrain_cells: count(WorldMapLayer::Terrain),
            navigable_cells: terrain
                .iter()
                .zip(obstacle.iter())
                .filter(|(t, o)| t > o)
                .count(),
        }
    }

    /// Render the map as an image, obstacles in red, rocks in green and terrain in blue.
    ///
    /// Each channel saturates at 255 observations. The image is flipped vertically so that +y
    /// points up.
    pub fn to_rgb_image(&self) -> RgbImage {
        let size = self.size as u32;

        RgbImage::from_fn(size, size, |col, row| {
            let y = (size - 1 - row) as usize;
            let x = col as usize;
            let mut px = [0u8; 3];

            for layer in WorldMapLayer::ALL.iter() {
                px[layer.index()] = self.data[[layer.index(), y, x]].min(255) as u8;
            }

            Rgb(px)
        })
    }

    /// Save the rendered map to an image file, format chosen by extension.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_rgb_image().save(path)
    }
}

impl Display for WorldMapSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} terrain cells ({} navigable), {} obstacle cells, {} rock cells",
            self.terrain_cells, self.navigable_cells, self.obstacle_cells, self.rock_cells
        )
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
