//! Raster-surface helpers over [`RgbaImage`].
//!
//! Everything that touches pixel memory outside the codecs goes through here:
//! blank frames, scaled drawing, cropping, compositing and PNG encoding.

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::error::TileError;

/// Fully transparent pixel.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A `size × size` fully transparent tile.
pub fn blank(size: u32) -> RgbaImage {
    RgbaImage::new(size, size)
}

/// A `size × size` tile filled with `color`.
pub fn solid(size: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(size, size, color)
}

/// Copies `src` onto `dst` at `(x, y)` without blending. Pixels falling
/// outside `dst` are skipped.
pub fn place(dst: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    let width = src.width().min(dst.width().saturating_sub(x));
    let height = src.height().min(dst.height().saturating_sub(y));

    for sy in 0..height {
        for sx in 0..width {
            dst.put_pixel(x + sx, y + sy, *src.get_pixel(sx, sy));
        }
    }
}

/// Draws `src` scaled into the destination rectangle `(dx, dy, dw, dh)`,
/// nearest-neighbour, overwriting covered pixels.
///
/// The rectangle may be fractional and may extend past `dst`; each destination
/// pixel samples the source pixel under its center.
pub fn draw_scaled(dst: &mut RgbaImage, src: &RgbaImage, dx: f64, dy: f64, dw: f64, dh: f64) {
    if src.width() == 0 || src.height() == 0 || !(dw > 0.0) || !(dh > 0.0) {
        return;
    }

    let x_start = dx.max(0.0).floor() as u32;
    let y_start = dy.max(0.0).floor() as u32;
    let x_end = ((dx + dw).ceil().max(0.0) as u32).min(dst.width());
    let y_end = ((dy + dh).ceil().max(0.0) as u32).min(dst.height());

    let scale_x = f64::from(src.width()) / dw;
    let scale_y = f64::from(src.height()) / dh;

    for py in y_start..y_end {
        let v = (f64::from(py) + 0.5 - dy) * scale_y;
        if v < 0.0 || v >= f64::from(src.height()) {
            continue;
        }
        let sy = v as u32;
        for px in x_start..x_end {
            let u = (f64::from(px) + 0.5 - dx) * scale_x;
            if u < 0.0 || u >= f64::from(src.width()) {
                continue;
            }
            dst.put_pixel(px, py, *src.get_pixel(u as u32, sy));
        }
    }
}

/// Copies the `width × height` region at `(x, y)`, clamped to `src`.
pub fn crop(src: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    imageops::crop_imm(src, x, y, width, height).to_image()
}

/// Resizes to exactly `width × height` (nearest-neighbour).
pub fn resize(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.width() == width && src.height() == height {
        return src.clone();
    }
    imageops::resize(src, width, height, FilterType::Nearest)
}

/// Alpha-composites `src` over `dst`, top-left aligned.
pub fn composite_over(dst: &mut RgbaImage, src: &RgbaImage) {
    imageops::overlay(dst, src, 0, 0);
}

pub fn is_fully_transparent(img: &RgbaImage) -> bool {
    img.pixels().all(|p| p[3] == 0)
}

/// Encodes as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Bytes, TileError> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(Bytes::from(buffer))
}

/// Decodes any supported image format into RGBA.
pub fn decode(data: &[u8]) -> Result<RgbaImage, TileError> {
    Ok(image::load_from_memory(data)?.to_rgba8())
}
