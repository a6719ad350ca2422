//! Even-odd rasterization of mask rings into a coverage raster.

use image::RgbaImage;
use tiny_skia::{FillRule, Mask, PathBuilder, Rect, Transform};

use super::geometry::Ring;
use crate::grid::BBox;

/// Rasterizes `rings` into a `size × size` coverage mask.
///
/// `frame` is the tile extent in the rings' units; it maps linearly onto the
/// pixel grid with y flipped (pixel origin top-left). With `reverse` the tile
/// rectangle is added as one more ring, which under the even-odd rule inverts
/// inside and outside.
pub fn rasterize_coverage(rings: &[Ring], frame: &BBox, size: u32, reverse: bool) -> Option<Mask> {
    let scale_x = f64::from(size) / frame.width();
    let scale_y = f64::from(size) / frame.height();
    let to_pixel = |p: &[f64; 2]| -> (f32, f32) {
        (
            ((p[0] - frame.min_x) * scale_x) as f32,
            ((frame.max_y - p[1]) * scale_y) as f32,
        )
    };

    let mut builder = PathBuilder::new();
    for ring in rings.iter().filter(|ring| ring.len() >= 3) {
        let (x, y) = to_pixel(&ring[0]);
        builder.move_to(x, y);
        for point in &ring[1..] {
            let (x, y) = to_pixel(point);
            builder.line_to(x, y);
        }
        builder.close();
    }
    if reverse {
        builder.push_rect(Rect::from_xywh(0.0, 0.0, size as f32, size as f32)?);
    }

    let mut mask = Mask::new(size, size)?;
    if let Some(path) = builder.finish() {
        mask.fill_path(&path, FillRule::EvenOdd, true, Transform::identity());
    }
    Some(mask)
}

/// Scales each pixel's alpha by the mask coverage.
pub fn apply_coverage(tile: &mut RgbaImage, coverage: &Mask) {
    for (pixel, &cover) in tile.pixels_mut().zip(coverage.data()) {
        pixel[3] = ((u16::from(pixel[3]) * u16::from(cover) + 127) / 255) as u8;
    }
}
