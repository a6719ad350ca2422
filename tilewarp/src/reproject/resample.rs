//! Pixel remapping between the geodetic and Mercator pyramids.
//!
//! x is linear in longitude in both projections, so columns map with one
//! affine scale. Only y distorts: each source row's top and bottom edges are
//! projected into the target's linear pixel grid and the row is painted
//! across the destination rows whose centers fall inside that span.

use image::{Rgba, RgbaImage};
use tracing::trace;

use crate::grid::{BBox, Projection};
use crate::raster;

/// Upper bound on the intermediate strip height, in tiles.
const MAX_STRIP_TILES: f64 = 16.0;

/// One reprojection job.
#[derive(Debug, Clone, Copy)]
pub struct ReprojectInput<'a> {
    /// Source pixels, in `source` projection
    pub mosaic: &'a RgbaImage,
    /// Mosaic extent in `source` units
    pub mosaic_bbox: BBox,
    pub source: Projection,
    pub target: Projection,
    /// Output tile extent in `target` units
    pub target_bbox: BBox,
    pub tile_size: u32,
}

/// Returns the single color shared by every non-transparent pixel, made
/// fully opaque.
///
/// A fully transparent image yields [`raster::TRANSPARENT`]. Returns `None`
/// as soon as two visible pixels differ.
pub fn pure_color(img: &RgbaImage) -> Option<Rgba<u8>> {
    let mut found: Option<Rgba<u8>> = None;
    for pixel in img.pixels().filter(|p| p[3] != 0) {
        match found {
            None => found = Some(*pixel),
            Some(color) if color != *pixel => return None,
            Some(_) => {}
        }
    }
    Some(found.map_or(raster::TRANSPARENT, |c| Rgba([c[0], c[1], c[2], 255])))
}

/// Resamples the mosaic into a `tile_size × tile_size` frame.
///
/// Returns `None` when the geometry degenerates (non-finite or empty extents),
/// so the caller can substitute a blank tile.
pub fn resample(input: &ReprojectInput<'_>) -> Option<RgbaImage> {
    let ReprojectInput {
        mosaic,
        mosaic_bbox,
        source,
        target,
        target_bbox,
        tile_size,
    } = *input;

    let (mosaic_w, mosaic_h) = mosaic.dimensions();
    if mosaic_w == 0 || mosaic_h == 0 || tile_size == 0 {
        return None;
    }
    if !mosaic_bbox.is_finite() || !target_bbox.is_finite() || mosaic_bbox.is_degenerate() || target_bbox.is_degenerate() {
        return None;
    }

    let src_res_x = mosaic_bbox.width() / f64::from(mosaic_w);
    let src_res_y = mosaic_bbox.height() / f64::from(mosaic_h);
    let dst_res_x = target_bbox.width() / f64::from(tile_size);
    let dst_res_y = target_bbox.height() / f64::from(tile_size);

    // Target area in source units, cropped from the mosaic with a one-pixel buffer
    let area = target.convert_bbox(&target_bbox, source);
    let col0 = clamp_index(((area.min_x - mosaic_bbox.min_x) / src_res_x).floor() - 1.0, mosaic_w)?;
    let col1 = clamp_index(((area.max_x - mosaic_bbox.min_x) / src_res_x).ceil() + 1.0, mosaic_w)?;
    let row0 = clamp_index(((mosaic_bbox.max_y - area.max_y) / src_res_y).floor() - 1.0, mosaic_h)?;
    let row1 = clamp_index(((mosaic_bbox.max_y - area.min_y) / src_res_y).ceil() + 1.0, mosaic_h)?;
    if col1 <= col0 || row1 <= row0 {
        return None;
    }
    let crop_w = col1 - col0;
    let crop_h = row1 - row0;
    let cropped = raster::crop(mosaic, col0, row0, crop_w, crop_h);

    let crop_min_x = mosaic_bbox.min_x + f64::from(col0) * src_res_x;
    let crop_max_x = mosaic_bbox.min_x + f64::from(col1) * src_res_x;
    let crop_top = mosaic_bbox.max_y - f64::from(row0) * src_res_y;
    let crop_bottom = mosaic_bbox.max_y - f64::from(row1) * src_res_y;

    // Columns: one linear mapping
    let x0 = source.convert_x(crop_min_x, target);
    let x1 = source.convert_x(crop_max_x, target);
    let dx = (x0 - target_bbox.min_x) / dst_res_x;
    let dw = (x1 - x0) / dst_res_x;

    // Rows: anchor the strip a whole number of rows from the frame top so
    // strip rows and frame rows coincide
    let y_top = source.convert_y(crop_top, target);
    let y_bottom = source.convert_y(crop_bottom, target);
    let offset_rows = ((target_bbox.max_y - y_top) / dst_res_y).floor();
    let base = target_bbox.max_y - offset_rows * dst_res_y;
    let strip_h = ((base - y_bottom) / dst_res_y).round();

    if !dw.is_finite() || dw <= 0.0 || !dx.is_finite() || !offset_rows.is_finite() {
        return None;
    }
    if !strip_h.is_finite() || strip_h < 1.0 || strip_h > MAX_STRIP_TILES * f64::from(tile_size) {
        return None;
    }
    let strip_h = strip_h as u32;

    let mut strip = RgbaImage::new(crop_w, strip_h);
    // Bottom edge of row j is the top edge of row j + 1; project it once
    let mut top_edge = (base - y_top) / dst_res_y;
    for j in 0..crop_h {
        let bottom_native = crop_top - f64::from(j + 1) * src_res_y;
        let bottom_edge = (base - source.convert_y(bottom_native, target)) / dst_res_y;

        let first = top_edge.round().max(0.0) as u32;
        let last = (bottom_edge.round().max(0.0) as u32).min(strip_h);
        for r in first..last {
            for i in 0..crop_w {
                strip.put_pixel(i, r, *cropped.get_pixel(i, j));
            }
        }
        top_edge = bottom_edge;
    }

    trace!(
        crop_w,
        crop_h,
        strip_h,
        dx,
        dw,
        offset_rows,
        "Resampled mosaic strip"
    );

    let mut frame = raster::blank(tile_size);
    raster::draw_scaled(&mut frame, &strip, dx, offset_rows, dw, f64::from(strip_h));
    Some(frame)
}

fn clamp_index(value: f64, limit: u32) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, f64::from(limit)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileCoord;

    fn pattern(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| Rgba([x as u8, y as u8, 128, 255]))
    }

    #[test]
    fn test_pure_color_uniform() {
        let img = raster::solid(8, Rgba([0, 0, 200, 255]));
        assert_eq!(pure_color(&img), Some(Rgba([0, 0, 200, 255])));
    }

    #[test]
    fn test_pure_color_ignores_transparent_pixels() {
        let mut img = raster::blank(8);
        img.put_pixel(2, 2, Rgba([9, 9, 9, 255]));
        img.put_pixel(5, 1, Rgba([9, 9, 9, 255]));
        assert_eq!(pure_color(&img), Some(Rgba([9, 9, 9, 255])));
        assert_eq!(pure_color(&raster::blank(8)), Some(raster::TRANSPARENT));
    }

    #[test]
    fn test_pure_color_is_opaque() {
        let img = raster::solid(8, Rgba([10, 20, 30, 128]));
        assert_eq!(pure_color(&img), Some(Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_pure_color_rejects_mixed() {
        let mut img = raster::solid(8, Rgba([1, 2, 3, 255]));
        img.put_pixel(7, 7, Rgba([1, 2, 4, 255]));
        assert_eq!(pure_color(&img), None);
    }

    #[test]
    fn test_same_projection_is_identity() {
        let mosaic = pattern(256);
        let bbox = Projection::WebMercator.native_tile_bbox(TileCoord::new(1, 1, 2));
        let out = resample(&ReprojectInput {
            mosaic: &mosaic,
            mosaic_bbox: bbox,
            source: Projection::WebMercator,
            target: Projection::WebMercator,
            target_bbox: bbox,
            tile_size: 256,
        })
        .unwrap();

        assert_eq!(out, mosaic);
    }

    #[test]
    fn test_geodetic_to_mercator_stretches_rows() {
        // Geodetic tile covering lon 0..90, lat 0..90
        let mosaic = pattern(256);
        let mosaic_bbox = Projection::Geodetic.native_tile_bbox(TileCoord::new(2, 0, 2));
        let target_bbox = Projection::WebMercator.native_tile_bbox(TileCoord::new(2, 1, 2));

        let out = resample(&ReprojectInput {
            mosaic: &mosaic,
            mosaic_bbox,
            source: Projection::Geodetic,
            target: Projection::WebMercator,
            target_bbox,
            tile_size: 256,
        })
        .unwrap();

        // Columns map one to one
        assert_eq!(out.get_pixel(10, 128)[0], 10);
        // Bottom row sits on the equator: last geodetic row
        assert_eq!(out.get_pixel(0, 255)[1], 255);
        // Top row center sits near lat 66.44, inside geodetic row 67
        let top = out.get_pixel(0, 0)[1];
        assert!((66..=68).contains(&top), "top row sampled {}", top);
    }

    #[test]
    fn test_degenerate_geometry_yields_none() {
        let mosaic = pattern(4);
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        let base = ReprojectInput {
            mosaic: &mosaic,
            mosaic_bbox: bbox,
            source: Projection::Geodetic,
            target: Projection::Geodetic,
            target_bbox: bbox,
            tile_size: 4,
        };

        let nan = ReprojectInput {
            target_bbox: BBox::new(f64::NAN, 0.0, 1.0, 1.0),
            ..base
        };
        assert!(resample(&nan).is_none());

        let flat = ReprojectInput {
            target_bbox: BBox::new(0.0, 0.5, 1.0, 0.5),
            ..base
        };
        assert!(resample(&flat).is_none());

        let empty = RgbaImage::new(0, 0);
        assert!(resample(&ReprojectInput { mosaic: &empty, ..base }).is_none());
    }

    #[test]
    fn test_disjoint_target_yields_none() {
        let mosaic = pattern(4);
        let input = ReprojectInput {
            mosaic: &mosaic,
            mosaic_bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            source: Projection::Geodetic,
            target: Projection::Geodetic,
            target_bbox: BBox::new(10.0, 10.0, 11.0, 11.0),
            tile_size: 4,
        };
        assert!(resample(&input).is_none());
    }
}
