//! Grid type definitions

use std::fmt;
use std::str::FromStr;

use crate::error::TileError;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.051_128_78;
pub const MAX_LAT: f64 = 85.051_128_78;

/// Deepest zoom level accepted anywhere in the grid
pub const MAX_ZOOM: u8 = 30;

/// Tile-pyramid address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Column, 0 at the west edge
    pub x: u32,
    /// Row, 0 at the north edge
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The tile at `zoom` containing this one, or `None` if `zoom` is deeper.
    pub fn ancestor(&self, zoom: u8) -> Option<TileCoord> {
        let shift = self.z.checked_sub(zoom)?;
        Some(TileCoord {
            x: self.x >> shift,
            y: self.y >> shift,
            z: zoom,
        })
    }

    /// Position of this tile inside its ancestor at `zoom`.
    ///
    /// Returns `(col, row, divisions)`: the ancestor is split into
    /// `divisions × divisions` sub-squares and this tile is sub-square
    /// `(col, row)`.
    pub fn position_in_ancestor(&self, zoom: u8) -> Option<(u32, u32, u32)> {
        let shift = self.z.checked_sub(zoom)?;
        let divisions = 1u32.checked_shl(u32::from(shift))?;
        Some((self.x & (divisions - 1), self.y & (divisions - 1), divisions))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Axis-aligned rectangle `[min_x, min_y, max_x, max_y]`.
///
/// Units are either degrees or projected meters; the holder tracks which.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Builds a bbox from two opposite corners in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Smallest bbox containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<BBox>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = BBox {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when the box has zero width or height.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.min_y.is_finite() && self.max_x.is_finite() && self.max_y.is_finite()
    }

    /// True when the two boxes share an area of positive size.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// True when `other` lies entirely within this box (edges included).
    pub fn contains(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// The two supported tile pyramids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// EPSG:4326, plate carrée in degrees
    Geodetic,
    /// EPSG:3857, spherical Mercator in meters
    WebMercator,
}

impl Projection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Geodetic => "EPSG:4326",
            Self::WebMercator => "EPSG:3857",
        }
    }

    /// The other supported projection.
    pub fn counterpart(&self) -> Projection {
        match self {
            Self::Geodetic => Self::WebMercator,
            Self::WebMercator => Self::Geodetic,
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Projection {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPSG:4326" | "4326" => Ok(Self::Geodetic),
            "EPSG:3857" | "3857" | "EPSG:900913" => Ok(Self::WebMercator),
            other => Err(TileError::Validation(format!(
                "unsupported projection '{}', expected EPSG:4326 or EPSG:3857",
                other
            ))),
        }
    }
}
