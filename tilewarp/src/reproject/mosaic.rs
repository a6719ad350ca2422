//! Mosaic assembly - places fetched native tiles into one image.
//!
//! Failed source tiles leave a transparent hole; only fatal errors
//! (cancellation, internal faults) abort the whole mosaic.

use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::TileError;
use crate::grid::{Overlap, TileCoord};
use crate::raster;

/// Assembles the fetched tiles of `overlap` into one raster.
///
/// Tiles whose decoded size differs from `tile_size` are resized to fit
/// their grid cell.
pub fn assemble_mosaic<I>(overlap: &Overlap, tile_size: u32, tiles: I) -> Result<RgbaImage, TileError>
where
    I: IntoIterator<Item = (TileCoord, Result<RgbaImage, TileError>)>,
{
    let (width, height) = overlap.mosaic_size(tile_size);
    let mut canvas = RgbaImage::new(width, height);
    let mut failed = 0usize;

    for (tile, result) in tiles {
        let (x, y) = overlap
            .placement(tile, tile_size)
            .ok_or_else(|| TileError::Inner(format!("tile {} is not part of the mosaic", tile)))?;

        match result {
            Ok(image) => {
                let image = raster::resize(&image, tile_size, tile_size);
                raster::place(&mut canvas, &image, x, y);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                failed += 1;
                warn!(tile = %tile, error = %e, "Source tile failed, leaving it blank");
            }
        }
    }

    debug!(
        tiles = overlap.len(),
        failed,
        width,
        height,
        "Mosaic assembled"
    );
    Ok(canvas)
}
