//! Tile-grid math for the geodetic and Web Mercator pyramids.
//!
//! Provides tile addressing ([`TileCoord`]), bounding boxes ([`BBox`]),
//! per-projection pyramid constants, and the overlap enumeration that maps a
//! requested display tile onto the native tiles needed to render it.

mod overlap;
mod projection;
mod types;
mod url;

pub use overlap::{enumerate_overlap, native_range, Overlap};
pub use projection::{
    lonlat_to_mercator, mercator_to_lonlat, EARTH_RADIUS, GEODETIC_FIRST_RESOLUTION,
    MERCATOR_EXTENT, MERCATOR_FIRST_RESOLUTION, REFERENCE_TILE_SIZE,
};
pub use types::{BBox, Projection, TileCoord, MAX_LAT, MAX_ZOOM, MIN_LAT};
pub use url::TileUrl;
