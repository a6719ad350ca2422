//! Edge seam repair.
//!
//! Resampling can leave a one-pixel transparent line along a tile edge, which
//! shows up as a seam between neighbouring tiles. An edge row or column that
//! is entirely transparent is replaced by its non-transparent neighbour.

use image::RgbaImage;

/// Repairs transparent edges in place. Returns how many edges were filled.
pub fn repair_seams(img: &mut RgbaImage) -> u8 {
    let (width, height) = img.dimensions();
    if width < 2 || height < 2 {
        return 0;
    }

    let mut repaired = 0;
    for (edge, inner) in [(0, 1), (height - 1, height - 2)] {
        if row_is_transparent(img, edge) && !row_is_transparent(img, inner) {
            for x in 0..width {
                let pixel = *img.get_pixel(x, inner);
                img.put_pixel(x, edge, pixel);
            }
            repaired += 1;
        }
    }
    for (edge, inner) in [(0, 1), (width - 1, width - 2)] {
        if column_is_transparent(img, edge) && !column_is_transparent(img, inner) {
            for y in 0..height {
                let pixel = *img.get_pixel(inner, y);
                img.put_pixel(edge, y, pixel);
            }
            repaired += 1;
        }
    }
    repaired
}

fn row_is_transparent(img: &RgbaImage, y: u32) -> bool {
    (0..img.width()).all(|x| img.get_pixel(x, y)[3] == 0)
}

fn column_is_transparent(img: &RgbaImage, x: u32) -> bool {
    (0..img.height()).all(|y| img.get_pixel(x, y)[3] == 0)
}
