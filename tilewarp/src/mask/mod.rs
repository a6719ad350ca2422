//! Polygon-mask clipping.
//!
//! Masks are registered once in a [`MaskRegistry`] and applied to tiles with
//! [`clip_tile`]. Clipping classifies the tile against the mask bbox first:
//!
//! | relation              | result                                         |
//! |-----------------------|------------------------------------------------|
//! | mask has no vertices  | tile unchanged                                 |
//! | disjoint              | blank tile (`reverse`: tile unchanged)         |
//! | tile inside mask bbox | fill all rings                                 |
//! | partial overlap       | fill rings clipped to the tile bbox            |
//!
//! Fills use the even-odd rule, so holes and overlapping polygons toggle
//! coverage.

mod clip;
mod fill;
mod geometry;
mod registry;

pub use clip::{clip_ring, clip_rings};
pub use fill::{apply_coverage, rasterize_coverage};
pub use geometry::{MaskGeometry, Ring};
pub use registry::{Mask, MaskRegistry};

use image::RgbaImage;
use tracing::trace;

use crate::grid::{lonlat_to_mercator, BBox, Projection};
use crate::raster;

/// Where and how a tile is clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOptions {
    /// Tile extent in longitude/latitude degrees
    pub tile_bbox: BBox,
    /// Projection the tile pixels are laid out in
    pub projection: Projection,
    pub tile_size: u32,
    /// Keep what lies outside the mask instead of inside
    pub reverse: bool,
}

/// Clips `tile` to `mask`, returning a `tile_size × tile_size` raster.
pub fn clip_tile(tile: &RgbaImage, mask: &Mask, options: &ClipOptions) -> RgbaImage {
    let size = options.tile_size;
    let mut tile = raster::resize(tile, size, size);
    let tile_bbox = options.tile_bbox;

    let Some(mask_bbox) = mask.bbox() else {
        return tile;
    };
    if !mask_bbox.intersects(&tile_bbox) {
        trace!(mask_id = mask.id(), "Mask disjoint from tile");
        return if options.reverse { tile } else { raster::blank(size) };
    }

    let rings = if mask_bbox.contains(&tile_bbox) {
        // Every ring takes part; clipping to a margin around the tile only
        // bounds the pixel coordinates handed to the rasterizer
        let margin = BBox::new(
            tile_bbox.min_x - tile_bbox.width(),
            tile_bbox.min_y - tile_bbox.height(),
            tile_bbox.max_x + tile_bbox.width(),
            tile_bbox.max_y + tile_bbox.height(),
        );
        mask.rings()
            .map(|ring| clip_ring(ring, &margin))
            .collect::<Vec<_>>()
    } else {
        let clipped = clip_rings(mask.rings(), &tile_bbox);
        if clipped.is_empty() {
            trace!(mask_id = mask.id(), "No ring survives clipping");
            return if options.reverse { tile } else { raster::blank(size) };
        }
        clipped
    };

    let (rings, frame) = match options.projection {
        Projection::Geodetic => (rings, tile_bbox),
        Projection::WebMercator => {
            let projected = rings
                .into_iter()
                .map(|ring| {
                    ring.into_iter()
                        .map(|p| {
                            let (x, y) = lonlat_to_mercator(p[0], p[1]);
                            [x, y]
                        })
                        .collect()
                })
                .collect();
            let (x0, y0) = lonlat_to_mercator(tile_bbox.min_x, tile_bbox.min_y);
            let (x1, y1) = lonlat_to_mercator(tile_bbox.max_x, tile_bbox.max_y);
            (projected, BBox::new(x0, y0, x1, y1))
        }
    };

    match rasterize_coverage(&rings, &frame, size, options.reverse) {
        Some(coverage) => {
            apply_coverage(&mut tile, &coverage);
            tile
        }
        None => raster::blank(size),
    }
}
