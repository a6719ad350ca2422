//! Reprojection between the geodetic and Web Mercator pyramids.
//!
//! # Pipeline
//!
//! ```text
//! native tiles → assemble_mosaic → pure-color check ─┬→ solid frame
//!                                                    └→ resample → repair_seams → frame
//! ```
//!
//! Uniform mosaics (open ocean, empty land-cover classes) skip resampling
//! entirely. Otherwise the mosaic is cropped to the target area, remapped row
//! by row and composed into a `tile_size × tile_size` frame whose transparent
//! edges are then patched.

mod mosaic;
mod resample;
mod seam;

pub use mosaic::assemble_mosaic;
pub use resample::{pure_color, resample, ReprojectInput};
pub use seam::repair_seams;

use image::RgbaImage;
use tracing::trace;

use crate::raster;

/// Reprojects a mosaic into one output tile.
///
/// Returns `None` when the geometry degenerates; callers substitute a blank
/// tile.
pub fn reproject_mosaic(input: &ReprojectInput<'_>) -> Option<RgbaImage> {
    if let Some(color) = pure_color(input.mosaic) {
        trace!(?color, "Pure-color mosaic, skipping resample");
        return Some(raster::solid(input.tile_size, color));
    }

    let mut frame = resample(input)?;
    let repaired = repair_seams(&mut frame);
    if repaired > 0 {
        trace!(repaired, "Repaired transparent tile edges");
    }
    Some(frame)
}
