//! Native tiles overlapping a display tile.

use super::types::{BBox, Projection, TileCoord, MAX_ZOOM};

/// Fractional indices within this distance of an integer are treated as
/// lying exactly on a tile edge.
const EDGE_EPSILON: f64 = 1e-6;

/// Subtracted from the ceiled upper column/row so a bbox ending exactly on a
/// tile edge does not pull in the neighbouring tile. Keeps the native and
/// display pyramid edges aligned; changing it produces seams.
const UPPER_INDEX_OFFSET: i64 = 1;

#[inline]
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < EDGE_EPSILON {
        rounded
    } else {
        value
    }
}

/// The inclusive block of native tiles covering one display tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub display: Projection,
    pub native: Projection,
    /// Native zoom level the block lives on
    pub zoom: u8,
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
    /// The display tile's bbox in display units
    pub display_bbox: BBox,
    /// The display tile's bbox re-expressed in native units
    pub native_bbox: BBox,
}

impl Overlap {
    #[inline]
    pub fn columns(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.max_row - self.min_row + 1
    }

    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |y| (self.min_col..=self.max_col).map(move |x| TileCoord::new(x, y, self.zoom)))
    }

    /// Bbox of the whole block in native units.
    pub fn mosaic_bbox(&self) -> BBox {
        let (ox, oy) = self.native.origin();
        let span = self.native.tile_span(self.zoom);
        BBox {
            min_x: ox + f64::from(self.min_col) * span,
            min_y: oy - f64::from(self.max_row + 1) * span,
            max_x: ox + f64::from(self.max_col + 1) * span,
            max_y: oy - f64::from(self.min_row) * span,
        }
    }

    /// Pixel size of the mosaic assembled from this block.
    pub fn mosaic_size(&self, tile_size: u32) -> (u32, u32) {
        (self.columns() * tile_size, self.rows() * tile_size)
    }

    /// Top-left pixel of `tile` inside the mosaic, or `None` if it is not part
    /// of this block.
    pub fn placement(&self, tile: TileCoord, tile_size: u32) -> Option<(u32, u32)> {
        let inside = tile.z == self.zoom
            && (self.min_col..=self.max_col).contains(&tile.x)
            && (self.min_row..=self.max_row).contains(&tile.y);
        inside.then(|| {
            (
                (tile.x - self.min_col) * tile_size,
                (tile.y - self.min_row) * tile_size,
            )
        })
    }
}

/// Finds the native tiles whose bbox overlaps display tile `tile`.
///
/// The display tile's bbox is re-expressed in the native projection and
/// floor/ceil'd against the native grid at `tile.z + zoom_offset`. Returns
/// `None` when the overlap is empty; callers fall back to a blank tile.
pub fn enumerate_overlap(
    display: Projection,
    native: Projection,
    tile: TileCoord,
    zoom_offset: i8,
) -> Option<Overlap> {
    let display_bbox = display.native_tile_bbox(tile);
    let native_bbox = display.convert_bbox(&display_bbox, native);
    let zoom = (i16::from(tile.z) + i16::from(zoom_offset)).clamp(0, i16::from(MAX_ZOOM)) as u8;

    let (min_col, max_col, min_row, max_row) = native_range(native, &native_bbox, zoom)?;

    Some(Overlap {
        display,
        native,
        zoom,
        min_col,
        max_col,
        min_row,
        max_row,
        display_bbox,
        native_bbox,
    })
}

/// Inclusive `(min_col, max_col, min_row, max_row)` of native tiles at `zoom`
/// overlapping `bbox`, clamped to the pyramid.
pub fn native_range(native: Projection, bbox: &BBox, zoom: u8) -> Option<(u32, u32, u32, u32)> {
    if !bbox.is_finite() {
        return None;
    }

    let (ox, oy) = native.origin();
    let span = native.tile_span(zoom);

    let min_col = snap((bbox.min_x - ox) / span).floor() as i64;
    let max_col = snap((bbox.max_x - ox) / span).ceil() as i64 - UPPER_INDEX_OFFSET;
    let min_row = snap((oy - bbox.max_y) / span).floor() as i64;
    let max_row = snap((oy - bbox.min_y) / span).ceil() as i64 - UPPER_INDEX_OFFSET;

    let (cols, rows) = native.grid_size(zoom);
    let min_col = min_col.max(0);
    let min_row = min_row.max(0);
    let max_col = max_col.min(cols as i64 - 1);
    let max_row = max_row.min(rows as i64 - 1);

    if max_col < min_col || max_row < min_row {
        return None;
    }

    Some((
        u32::try_from(min_col).ok()?,
        u32::try_from(max_col).ok()?,
        u32::try_from(min_row).ok()?,
        u32::try_from(max_row).ok()?,
    ))
}
