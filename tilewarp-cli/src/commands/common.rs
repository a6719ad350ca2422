//! Argument types and helpers shared across CLI commands.

use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use tilewarp::engine::MaskRef;
use tilewarp::grid::{Projection, TileCoord, TileUrl};
use tilewarp::terrain::TerrainType;

use crate::error::CliError;
use crate::runner::CliEngine;

/// Id under which a mask loaded from `--mask` is registered.
pub const CLI_MASK_ID: &str = "cli-mask";

/// Tile pyramid selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProjectionArg {
    /// Geodetic (EPSG:4326)
    #[value(name = "4326", alias = "epsg:4326")]
    Geodetic,
    /// Web Mercator (EPSG:3857)
    #[value(name = "3857", alias = "epsg:3857")]
    WebMercator,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Geodetic => Projection::Geodetic,
            ProjectionArg::WebMercator => Projection::WebMercator,
        }
    }
}

/// Terrain format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TerrainArg {
    /// Cesium quantized-mesh
    QuantizedMesh,
    /// zlib-packed 150×150 grid (tianditu)
    Tianditu,
    /// Terrarium RGB
    Mapzen,
    /// Gray ramp between --min-height and --max-height
    QgisGray,
}

impl From<TerrainArg> for TerrainType {
    fn from(arg: TerrainArg) -> Self {
        match arg {
            TerrainArg::QuantizedMesh => TerrainType::QuantizedMesh,
            TerrainArg::Tianditu => TerrainType::Packed,
            TerrainArg::Mapzen => TerrainType::Mapzen,
            TerrainArg::QgisGray => TerrainType::QgisGray,
        }
    }
}

/// Tile address arguments.
#[derive(Debug, Clone, Args)]
pub struct TileArgs {
    /// Zoom level
    #[arg(short, long)]
    pub z: u8,
    /// Column
    #[arg(short, long)]
    pub x: u32,
    /// Row, counted from the north edge
    #[arg(short, long)]
    pub y: u32,
}

impl TileArgs {
    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.x, self.y, self.z)
    }
}

/// Mask arguments.
#[derive(Debug, Clone, Args)]
pub struct MaskArgs {
    /// GeoJSON Polygon/MultiPolygon file to clip the tile with
    #[arg(long)]
    pub mask: Option<PathBuf>,
    /// Keep what lies outside the mask instead
    #[arg(long, requires = "mask")]
    pub reverse: bool,
}

impl MaskArgs {
    /// Registers the mask file with `engine` and returns a reference to it.
    pub fn register(&self, engine: &CliEngine) -> Result<Option<MaskRef>, CliError> {
        let Some(path) = &self.mask else {
            return Ok(None);
        };
        let geojson = read_to_string(path)?;
        engine.inject_mask_geojson(CLI_MASK_ID, &geojson)?;

        let mask = MaskRef::new(CLI_MASK_ID);
        Ok(Some(if self.reverse { mask.reversed() } else { mask }))
    }
}

/// Builds a URL template, rejecting `{s}` without subdomains.
pub fn tile_url(template: &str, subdomains: &[String]) -> Result<TileUrl, CliError> {
    TileUrl::with_subdomains(template, subdomains.iter().cloned())
        .map_err(|e| CliError::Argument(e.to_string()))
}

pub fn read_to_string(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::FileRead {
        path: path.display().to_string(),
        error: e,
    })
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|e| CliError::FileRead {
        path: path.display().to_string(),
        error: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_arg_conversion() {
        assert_eq!(Projection::from(ProjectionArg::Geodetic), Projection::Geodetic);
        assert_eq!(Projection::from(ProjectionArg::WebMercator), Projection::WebMercator);
    }

    #[test]
    fn test_terrain_arg_conversion() {
        assert_eq!(TerrainType::from(TerrainArg::Tianditu), TerrainType::Packed);
        assert_eq!(TerrainType::from(TerrainArg::QgisGray), TerrainType::QgisGray);
    }

    #[test]
    fn test_tile_url_requires_subdomains_for_placeholder() {
        let err = tile_url("http://{s}.t/{z}/{x}/{y}.png", &[]).unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));

        let url = tile_url("http://{s}.t/{z}/{x}/{y}.png", &["a".to_string()]).unwrap();
        assert_eq!(
            url.expand(TileCoord::new(1, 2, 3), Projection::WebMercator),
            "http://a.t/3/1/2.png"
        );
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_bytes(Path::new("/nonexistent/tilewarp/input.bin")).unwrap_err();
        assert!(matches!(err, CliError::FileRead { .. }));
    }
}
