//! Terrain payload codecs.
//!
//! Every variant decodes into a [`HeightGrid`], which is then rendered to an
//! RGB-encoded raster by [`encode_height_grid`]:
//!
//! ```text
//! quantized-mesh ─ decode_quantized_mesh → TerrainMesh::rasterize ─┐
//! packed         ─ decode_packed ─────────────────────────────────┤
//! mapzen / qgis  ─ image decode → decode_rgb ─────────────────────┼→ HeightGrid → encode_height_grid
//! lerc           ─ LercDecoder ───────────────────────────────────┘
//! ```

mod grid;
mod mesh;
mod packed;
mod rgb;
mod zigzag;

pub use grid::{ColorRamp, HeightGrid};
pub use mesh::{decode_quantized_mesh, TerrainMesh};
pub use packed::{
    decode_packed, MAX_PLAUSIBLE_HEIGHT, MIN_PACKED_LEN, MIN_PLAUSIBLE_HEIGHT, PACKED_GRID_SIZE,
};
pub use rgb::{decode_rgb, encode_height_grid, RgbHeightEncoding, RgbSource};
pub use zigzag::{zigzag_decode, zigzag_encode};

use std::fmt;
use std::str::FromStr;

use crate::error::TileError;
use crate::raster;

/// Supported terrain payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainType {
    QuantizedMesh,
    /// zlib-packed 150×150 grid (tianditu)
    Packed,
    Mapzen,
    QgisGray,
    Lerc,
}

impl TerrainType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuantizedMesh => "quantized-mesh",
            Self::Packed => "tianditu",
            Self::Mapzen => "mapzen",
            Self::QgisGray => "qgis-gray",
            Self::Lerc => "arcgis-lerc",
        }
    }

    /// RGB scheme the decoded grid is rendered with.
    pub fn output_encoding(&self) -> RgbHeightEncoding {
        match self {
            Self::Packed => RgbHeightEncoding::TIANDITU,
            _ => RgbHeightEncoding::MAPBOX,
        }
    }
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TerrainType {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quantized-mesh" | "cesium" => Ok(Self::QuantizedMesh),
            "tianditu" | "packed" => Ok(Self::Packed),
            "mapzen" | "terrarium" => Ok(Self::Mapzen),
            "qgis-gray" => Ok(Self::QgisGray),
            "arcgis-lerc" | "lerc" => Ok(Self::Lerc),
            other => Err(TileError::Validation(format!(
                "unsupported terrain type '{}'",
                other
            ))),
        }
    }
}

/// Decoder for LERC payloads, supplied by the embedding application.
pub trait LercDecoder: Send + Sync {
    fn decode(&self, payload: &[u8], size: u32) -> Result<HeightGrid, TileError>;
}

/// Decoding parameters shared by all terrain variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    pub terrain_type: TerrainType,
    /// Output grid side length
    pub size: u32,
    /// Height range for range-scaled formats
    pub height_range: Option<(f32, f32)>,
}

/// Decodes a terrain payload into a `size × size` grid.
pub fn decode_terrain(
    payload: &[u8],
    params: &TerrainParams,
    lerc: Option<&dyn LercDecoder>,
) -> Result<HeightGrid, TileError> {
    let size = params.size;
    if size == 0 {
        return Err(TileError::Validation("terrain size must be positive".into()));
    }

    match params.terrain_type {
        TerrainType::QuantizedMesh => Ok(decode_quantized_mesh(payload)?.rasterize(size)),
        TerrainType::Packed => decode_packed(payload, size),
        TerrainType::Mapzen => {
            let image = raster::resize(&raster::decode(payload)?, size, size);
            decode_rgb(&image, RgbSource::Mapzen)
        }
        TerrainType::QgisGray => {
            let (min, max) = params.height_range.ok_or_else(|| {
                TileError::Validation("qgis-gray terrain requires min and max height".into())
            })?;
            let image = raster::resize(&raster::decode(payload)?, size, size);
            decode_rgb(&image, RgbSource::QgisGray { min, max })
        }
        TerrainType::Lerc => {
            let decoder = lerc.ok_or_else(|| {
                TileError::Validation("no LERC decoder registered".into())
            })?;
            decoder.decode(payload, size)
        }
    }
}
