//! Request and response types for [`TileEngine`](super::TileEngine).

use bytes::Bytes;
use image::RgbaImage;

use crate::error::TileError;
use crate::fetch::{FetchOptions, TaskId};
use crate::grid::{BBox, Projection, TileCoord, TileUrl};
use crate::raster;
use crate::terrain::{ColorRamp, TerrainType};

/// Largest accepted output tile side, in pixels.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Largest native block a single transform may fetch.
pub const MAX_MOSAIC_TILES: usize = 64;

/// How a finished tile is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Raster,
    Png,
}

/// A finished tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutput {
    Raster(RgbaImage),
    /// PNG-encoded bytes
    Encoded(Bytes),
}

impl TileOutput {
    pub(crate) fn from_raster(image: RgbaImage, format: OutputFormat) -> Result<Self, TileError> {
        match format {
            OutputFormat::Raster => Ok(Self::Raster(image)),
            OutputFormat::Png => Ok(Self::Encoded(raster::encode_png(&image)?)),
        }
    }

    pub fn as_raster(&self) -> Option<&RgbaImage> {
        match self {
            Self::Raster(image) => Some(image),
            Self::Encoded(_) => None,
        }
    }

    /// The tile as a raster, decoding it if it was encoded.
    pub fn into_raster(self) -> Result<RgbaImage, TileError> {
        match self {
            Self::Raster(image) => Ok(image),
            Self::Encoded(bytes) => raster::decode(&bytes),
        }
    }

    /// The tile as PNG bytes, encoding it if needed.
    pub fn into_png(self) -> Result<Bytes, TileError> {
        match self {
            Self::Raster(image) => raster::encode_png(&image),
            Self::Encoded(bytes) => Ok(bytes),
        }
    }
}

/// Mask applied to a finished tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRef {
    pub id: String,
    /// Keep what lies outside the mask instead
    pub reverse: bool,
}

impl MaskRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reverse: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Fetch one tile, drawing each URL layer in order.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub task_id: TaskId,
    pub tile: TileCoord,
    pub urls: Vec<TileUrl>,
    /// Pyramid the tile address refers to
    pub projection: Projection,
    /// Defaults to the engine tile size
    pub tile_size: Option<u32>,
    /// Deepest zoom the source serves; deeper requests are cut from an
    /// ancestor tile
    pub max_available_zoom: Option<u8>,
    pub mask: Option<MaskRef>,
    pub fetch: FetchOptions,
    pub output: OutputFormat,
}

impl TileRequest {
    pub fn new(task_id: TaskId, tile: TileCoord, url: TileUrl) -> Self {
        Self {
            task_id,
            tile,
            urls: vec![url],
            projection: Projection::WebMercator,
            tile_size: None,
            max_available_zoom: None,
            mask: None,
            fetch: FetchOptions::default(),
            output: OutputFormat::Raster,
        }
    }
}

/// Render a display tile from a source pyramid in another projection.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub task_id: TaskId,
    /// Tile address in `projection`
    pub tile: TileCoord,
    pub url: TileUrl,
    /// Display pyramid
    pub projection: Projection,
    /// Pyramid the source serves
    pub source: Projection,
    /// Native zoom relative to the display zoom
    pub zoom_offset: i8,
    pub tile_size: Option<u32>,
    /// Native zoom is clamped to this level
    pub max_available_zoom: Option<u8>,
    pub mask: Option<MaskRef>,
    pub fetch: FetchOptions,
    pub output: OutputFormat,
}

impl TransformRequest {
    /// Display `tile` in `projection` from a source in the counterpart
    /// projection.
    pub fn new(task_id: TaskId, tile: TileCoord, url: TileUrl, projection: Projection) -> Self {
        Self {
            task_id,
            tile,
            url,
            projection,
            source: projection.counterpart(),
            zoom_offset: 0,
            tile_size: None,
            max_available_zoom: None,
            mask: None,
            fetch: FetchOptions::default(),
            output: OutputFormat::Raster,
        }
    }
}

/// Where a terrain payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerrainSource {
    Url(String),
    Buffer(Bytes),
}

/// Decode a terrain payload and render it as an RGB height tile.
#[derive(Debug, Clone)]
pub struct TerrainRequest {
    pub task_id: TaskId,
    pub source: TerrainSource,
    pub terrain_type: TerrainType,
    pub tile_size: Option<u32>,
    /// `(min, max)` for range-scaled formats
    pub height_range: Option<(f32, f32)>,
    /// Recolor by height instead of RGB-encoding
    pub color_ramp: Option<ColorRamp>,
    pub fetch: FetchOptions,
    pub output: OutputFormat,
}

impl TerrainRequest {
    pub fn new(task_id: TaskId, source: TerrainSource, terrain_type: TerrainType) -> Self {
        Self {
            task_id,
            source,
            terrain_type,
            tile_size: None,
            height_range: None,
            color_ramp: None,
            fetch: FetchOptions::default(),
            output: OutputFormat::Raster,
        }
    }
}

/// Clip a caller-supplied tile with a registered mask.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub tile: RgbaImage,
    /// Tile extent in longitude/latitude degrees
    pub tile_bbox: BBox,
    pub mask: MaskRef,
    pub projection: Projection,
    pub tile_size: Option<u32>,
    pub output: OutputFormat,
}

pub(crate) fn validate_tile_size(size: u32) -> Result<u32, TileError> {
    if size == 0 || size > MAX_TILE_SIZE {
        return Err(TileError::Validation(format!(
            "tile size {} outside 1..={}",
            size, MAX_TILE_SIZE
        )));
    }
    Ok(size)
}

pub(crate) fn validate_tile(projection: Projection, tile: TileCoord) -> Result<(), TileError> {
    if !projection.contains_tile(tile) {
        return Err(TileError::Validation(format!(
            "tile {} is outside the {} pyramid",
            tile, projection
        )));
    }
    Ok(())
}
