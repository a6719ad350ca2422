//! Packed (zlib-compressed) height grids.

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use std::io::Read;

use super::grid::HeightGrid;
use crate::error::TileError;

/// Side length of the packed source grid.
pub const PACKED_GRID_SIZE: u32 = 150;

/// Payloads shorter than this cannot hold a zlib stream.
pub const MIN_PACKED_LEN: usize = 8;

/// Plausible height range; samples outside it are zeroed.
pub const MIN_PLAUSIBLE_HEIGHT: f32 = -2000.0;
pub const MAX_PLAUSIBLE_HEIGHT: f32 = 10000.0;

const SAMPLE_BYTES: usize = 2;

/// Inflates a packed payload and remaps it onto a `size × size` grid.
pub fn decode_packed(buf: &[u8], size: u32) -> Result<HeightGrid, TileError> {
    if buf.len() < MIN_PACKED_LEN {
        return Err(TileError::Data(format!(
            "packed terrain payload too short: {} bytes",
            buf.len()
        )));
    }
    if size == 0 {
        return Err(TileError::Validation("terrain size must be positive".into()));
    }

    let expected = (PACKED_GRID_SIZE * PACKED_GRID_SIZE) as usize * SAMPLE_BYTES;
    let mut raw = Vec::with_capacity(expected);
    ZlibDecoder::new(buf)
        .take(expected as u64)
        .read_to_end(&mut raw)
        .map_err(|e| TileError::Data(format!("packed terrain inflate failed: {}", e)))?;
    if raw.len() < expected {
        return Err(TileError::Data(format!(
            "packed terrain holds {} bytes, expected {}",
            raw.len(),
            expected
        )));
    }

    let src = PACKED_GRID_SIZE as usize;
    let scale = PACKED_GRID_SIZE as f64 / size as f64;
    let mut grid = HeightGrid::filled(size, size, 0.0);
    for row in 0..size {
        let sy = ((row as f64 * scale) as usize).min(src - 1);
        for col in 0..size {
            let sx = ((col as f64 * scale) as usize).min(src - 1);
            let offset = (sy * src + sx) * SAMPLE_BYTES;
            let h = LittleEndian::read_i16(&raw[offset..offset + SAMPLE_BYTES]) as f32;
            let h = if (MIN_PLAUSIBLE_HEIGHT..=MAX_PLAUSIBLE_HEIGHT).contains(&h) {
                h
            } else {
                0.0
            };
            grid.set(col, row, h);
        }
    }
    grid.normalize();
    Ok(grid)
}
