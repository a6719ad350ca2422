//! Per-projection pyramid constants and coordinate conversion.

use std::f64::consts::PI;

use super::types::{BBox, Projection, TileCoord, MAX_LAT, MIN_LAT};

/// Sphere radius used by Web Mercator, in meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the Mercator world width; the pyramid origin is `[-EXTENT, EXTENT]`
pub const MERCATOR_EXTENT: f64 = 20_037_508.342_787;

/// Meters per pixel of a 256-pixel Mercator tile at zoom 0
pub const MERCATOR_FIRST_RESOLUTION: f64 = 156_543.033_928_040_97;

/// Degrees per pixel of a 256-pixel geodetic tile at zoom 0
pub const GEODETIC_FIRST_RESOLUTION: f64 = 1.40625;

/// Pixel size the first-level resolutions are stated for
pub const REFERENCE_TILE_SIZE: u32 = 256;

/// Converts longitude/latitude degrees to Web Mercator meters.
///
/// Latitude is clamped to the Mercator valid range first.
#[inline]
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let x = lon.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Converts Web Mercator meters to longitude/latitude degrees.
#[inline]
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

impl Projection {
    /// Pyramid origin (top-left corner) in native units.
    pub fn origin(&self) -> (f64, f64) {
        match self {
            Self::Geodetic => (-180.0, 90.0),
            Self::WebMercator => (-MERCATOR_EXTENT, MERCATOR_EXTENT),
        }
    }

    /// Native units per pixel of a 256-pixel tile at `zoom`.
    pub fn resolution(&self, zoom: u8) -> f64 {
        let first = match self {
            Self::Geodetic => GEODETIC_FIRST_RESOLUTION,
            Self::WebMercator => MERCATOR_FIRST_RESOLUTION,
        };
        first / 2f64.powi(i32::from(zoom))
    }

    /// Side length of one tile at `zoom`, in native units.
    #[inline]
    pub fn tile_span(&self, zoom: u8) -> f64 {
        self.resolution(zoom) * f64::from(REFERENCE_TILE_SIZE)
    }

    /// Number of addressable columns and rows at `zoom`.
    ///
    /// The geodetic pyramid's square tiles cover 360° per level-0 tile, so
    /// only the top half of the rows carries data.
    pub fn grid_size(&self, zoom: u8) -> (u64, u64) {
        let n = 1u64 << zoom.min(63);
        match self {
            Self::Geodetic => (n, (n / 2).max(1)),
            Self::WebMercator => (n, n),
        }
    }

    /// Bounding box of `tile` in native units.
    pub fn native_tile_bbox(&self, tile: TileCoord) -> BBox {
        let (ox, oy) = self.origin();
        let span = self.tile_span(tile.z);
        let min_x = ox + f64::from(tile.x) * span;
        let max_y = oy - f64::from(tile.y) * span;
        BBox {
            min_x,
            min_y: max_y - span,
            max_x: min_x + span,
            max_y,
        }
    }

    /// True when `tile` addresses a tile that exists in this pyramid.
    pub fn contains_tile(&self, tile: TileCoord) -> bool {
        let (cols, rows) = self.grid_size(tile.z);
        u64::from(tile.x) < cols && u64::from(tile.y) < rows
    }

    /// Projects longitude/latitude degrees into native units.
    #[inline]
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::Geodetic => (lon, lat),
            Self::WebMercator => lonlat_to_mercator(lon, lat),
        }
    }

    /// Converts native units back to longitude/latitude degrees.
    #[inline]
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Geodetic => (x, y),
            Self::WebMercator => mercator_to_lonlat(x, y),
        }
    }

    /// Converts a native y coordinate into `target`'s y axis.
    ///
    /// Both projections keep x linear in longitude, so y is the only axis that
    /// distorts between them.
    #[inline]
    pub fn convert_y(&self, y: f64, target: Projection) -> f64 {
        if *self == target {
            return y;
        }
        let (_, lat) = self.unproject(0.0, y);
        target.project(0.0, lat).1
    }

    #[inline]
    pub fn convert_x(&self, x: f64, target: Projection) -> f64 {
        if *self == target {
            return x;
        }
        let (lon, _) = self.unproject(x, 0.0);
        target.project(lon, 0.0).0
    }

    /// Re-expresses a native bbox in `target`'s units.
    pub fn convert_bbox(&self, bbox: &BBox, target: Projection) -> BBox {
        if *self == target {
            return *bbox;
        }
        BBox::new(
            self.convert_x(bbox.min_x, target),
            self.convert_y(bbox.min_y, target),
            self.convert_x(bbox.max_x, target),
            self.convert_y(bbox.max_y, target),
        )
    }
}
