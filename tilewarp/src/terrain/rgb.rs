//! RGB height encodings.

use image::{Rgba, RgbaImage};

use super::grid::{ColorRamp, HeightGrid};
use crate::error::TileError;

/// Base-256 fixed-point height encoding: `v = floor((h + offset) · (1 / scale))`
/// stored big-endian across R, G and B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbHeightEncoding {
    pub offset: f64,
    pub scale: f64,
}

impl RgbHeightEncoding {
    /// Terrain-RGB: `h = -10000 + (R·65536 + G·256 + B) · 0.1`.
    pub const MAPBOX: Self = Self {
        offset: 10000.0,
        scale: 0.1,
    };

    /// Millimetre encoding used for packed terrain output.
    pub const TIANDITU: Self = Self {
        offset: 1000.0,
        scale: 0.001,
    };

    const MAX_CODE: f64 = 16_777_215.0;

    /// Encodes a height into an RGB triple, saturating at the code range.
    #[inline]
    pub fn encode(&self, height: f64) -> [u8; 3] {
        // 1/0.1 and 1/0.001 round to exactly 10 and 1000
        let code = snap((height + self.offset) * self.scale.recip()).floor();
        let v = code.clamp(0.0, Self::MAX_CODE) as u32;
        [(v >> 16) as u8, (v >> 8 & 0xFF) as u8, (v & 0xFF) as u8]
    }

    #[inline]
    pub fn decode(&self, rgb: [u8; 3]) -> f64 {
        let v = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
        -self.offset + v as f64 * self.scale
    }
}

/// Codes within this distance of an integer are f64 representation error of
/// an exact step, not a height below it.
const CODE_EPSILON: f64 = 1e-9;

#[inline]
fn snap(code: f64) -> f64 {
    let rounded = code.round();
    if (code - rounded).abs() < CODE_EPSILON {
        rounded
    } else {
        code
    }
}

impl Default for RgbHeightEncoding {
    fn default() -> Self {
        Self::MAPBOX
    }
}

/// Source RGB formats that carry heights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RgbSource {
    /// Terrarium: `h = R·256 + G + B/256 − 32768`
    Mapzen,
    /// Gray ramp: the red channel spans `min..=max` linearly
    QgisGray { min: f32, max: f32 },
}

/// Decodes an RGB-encoded height raster into a grid of its own size.
pub fn decode_rgb(image: &RgbaImage, source: RgbSource) -> Result<HeightGrid, TileError> {
    if let RgbSource::QgisGray { min, max } = source {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(TileError::Validation(format!(
                "invalid height range {}..{}",
                min, max
            )));
        }
    }

    let data = image
        .pixels()
        .map(|p| match source {
            RgbSource::Mapzen => {
                (p[0] as f32 * 256.0 + p[1] as f32 + p[2] as f32 / 256.0) - 32768.0
            }
            RgbSource::QgisGray { min, max } => min + (p[0] as f32 / 255.0) * (max - min),
        })
        .collect();

    HeightGrid::new(image.width(), image.height(), data)
        .ok_or_else(|| TileError::Inner("height grid size mismatch".into()))
}

/// Renders a height grid through `encoding`, or through `ramp` when one is
/// given. The grid is normalized first.
pub fn encode_height_grid(
    grid: &mut HeightGrid,
    encoding: RgbHeightEncoding,
    ramp: Option<&ColorRamp>,
) -> RgbaImage {
    grid.normalize();
    let ramp = ramp.filter(|r| !r.is_empty());

    RgbaImage::from_fn(grid.width(), grid.height(), |x, y| {
        let h = grid.get(x, y);
        let [r, g, b] = match ramp.and_then(|ramp| ramp.color(h)) {
            Some(color) => color.0,
            None => encoding.encode(h as f64),
        };
        Rgba([r, g, b, 255])
    })
}
