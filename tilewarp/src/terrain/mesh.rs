//! Quantized-mesh decoding and rasterization.
//!
//! # Layout
//!
//! All values little-endian.
//!
//! ```text
//! offset  size  field
//!      0    24  tile center (3 × f64)
//!     24     4  minimum height (f32)
//!     28     4  maximum height (f32)
//!     32    24  bounding sphere center (3 × f64)
//!     56     8  bounding sphere radius (f64)
//!     64    24  horizon occlusion point (3 × f64)
//!     88     4  vertex count n (u32)
//!     92  2n×3  u, v, height codes (u16, zigzag deltas)
//!              padding to 2 (4 when n > 65536)
//!              triangle count t (u32)
//!              3t indices (u16, or u32 when n > 65536), high-water coded
//! ```
//!
//! Edge index lists and extensions that follow are not read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::grid::HeightGrid;
use super::zigzag::zigzag_decode;
use crate::error::TileError;

const HEADER_LEN: u64 = 88;
const QUANTIZED_MAX: f64 = 32767.0;
const LARGE_MESH_VERTICES: u32 = 65536;
const EDGE_EPSILON: f64 = 1e-9;

/// Decoded quantized-mesh geometry.
///
/// Positions are `[u, v, height]` with `u`/`v` in `[0, 1]` (v grows north)
/// and height in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub min_height: f32,
    pub max_height: f32,
    pub radius: f64,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Samples the mesh onto a `size × size` grid.
    ///
    /// Sample `(col, row)` sits at `u = col / (size-1)`,
    /// `v = 1 - row / (size-1)`, so edge samples land on the tile border.
    /// Samples outside every triangle take `min_height`.
    pub fn rasterize(&self, size: u32) -> HeightGrid {
        let mut grid = HeightGrid::filled(size, size, self.min_height);
        let triangles: Vec<Triangle> = self
            .indices
            .chunks_exact(3)
            .filter_map(|t| {
                Some(Triangle::new(
                    *self.positions.get(t[0] as usize)?,
                    *self.positions.get(t[1] as usize)?,
                    *self.positions.get(t[2] as usize)?,
                ))
            })
            .collect();
        if triangles.is_empty() {
            return grid;
        }

        let step = if size > 1 { 1.0 / (size - 1) as f64 } else { 0.0 };
        let (lo, hi) = (self.min_height as f64, self.max_height as f64);
        let mut last_hit = 0usize;

        for row in 0..size {
            let v = 1.0 - row as f64 * step;
            for col in 0..size {
                let u = col as f64 * step;
                let hit = if triangles[last_hit].contains(u, v) {
                    Some(last_hit)
                } else {
                    triangles.iter().position(|t| t.contains(u, v))
                };
                if let Some(idx) = hit {
                    last_hit = idx;
                    let h = triangles[idx].height_at(u, v).clamp(lo, hi);
                    grid.set(col, row, h as f32);
                }
            }
        }
        grid.normalize();
        grid
    }
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    p: [[f64; 3]; 3],
    normal: [f64; 3],
}

impl Triangle {
    fn new(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Self {
        let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let normal = [
            ab[1] * ac[2] - ab[2] * ac[1],
            ab[2] * ac[0] - ab[0] * ac[2],
            ab[0] * ac[1] - ab[1] * ac[0],
        ];
        Self {
            p: [a, b, c],
            normal,
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        let sign = |a: [f64; 3], b: [f64; 3]| (x - b[0]) * (a[1] - b[1]) - (a[0] - b[0]) * (y - b[1]);
        let d1 = sign(self.p[0], self.p[1]);
        let d2 = sign(self.p[1], self.p[2]);
        let d3 = sign(self.p[2], self.p[0]);
        let neg = d1 < -EDGE_EPSILON || d2 < -EDGE_EPSILON || d3 < -EDGE_EPSILON;
        let pos = d1 > EDGE_EPSILON || d2 > EDGE_EPSILON || d3 > EDGE_EPSILON;
        !(neg && pos)
    }

    fn height_at(&self, x: f64, y: f64) -> f64 {
        let [nx, ny, nz] = self.normal;
        let p0 = self.p[0];
        if nz.abs() < f64::EPSILON {
            return p0[2];
        }
        p0[2] - ((x - p0[0]) * nx + (y - p0[1]) * ny) / nz
    }
}

fn truncated(what: &str) -> TileError {
    TileError::Data(format!("quantized-mesh truncated in {}", what))
}

/// Decodes a quantized-mesh payload.
pub fn decode_quantized_mesh(buf: &[u8]) -> Result<TerrainMesh, TileError> {
    if (buf.len() as u64) < HEADER_LEN + 4 {
        return Err(TileError::Data(format!(
            "quantized-mesh payload too short: {} bytes",
            buf.len()
        )));
    }
    let mut cur = Cursor::new(buf);

    cur.set_position(24);
    let min_height = cur.read_f32::<LittleEndian>().map_err(|_| truncated("header"))?;
    let max_height = cur.read_f32::<LittleEndian>().map_err(|_| truncated("header"))?;
    cur.set_position(56);
    let radius = cur.read_f64::<LittleEndian>().map_err(|_| truncated("header"))?;
    cur.set_position(HEADER_LEN);

    let vertex_count = cur.read_u32::<LittleEndian>().map_err(|_| truncated("header"))?;
    let n = vertex_count as usize;
    if (buf.len() as u64) < cur.position() + 6 * n as u64 {
        return Err(truncated("vertex data"));
    }

    let mut channels = [vec![0u16; n], vec![0u16; n], vec![0u16; n]];
    for channel in &mut channels {
        let mut value: i32 = 0;
        for slot in channel.iter_mut() {
            let code = cur.read_u16::<LittleEndian>().map_err(|_| truncated("vertex data"))?;
            value = value.wrapping_add(zigzag_decode(code as u32));
            *slot = value as u16;
        }
    }

    let (min_h, max_h) = (min_height as f64, max_height as f64);
    let positions = (0..n)
        .map(|i| {
            [
                channels[0][i] as f64 / QUANTIZED_MAX,
                channels[1][i] as f64 / QUANTIZED_MAX,
                min_h + (channels[2][i] as f64 / QUANTIZED_MAX) * (max_h - min_h),
            ]
        })
        .collect();

    let wide = vertex_count > LARGE_MESH_VERTICES;
    let align = if wide { 4 } else { 2 };
    let pos = cur.position();
    cur.set_position(pos.div_ceil(align) * align);

    let triangle_count = cur.read_u32::<LittleEndian>().map_err(|_| truncated("index header"))?;
    let index_count = triangle_count as u64 * 3;
    let index_size = if wide { 4 } else { 2 };
    if (buf.len() as u64) < cur.position() + index_count * index_size {
        return Err(truncated("index data"));
    }

    let mut indices = Vec::with_capacity(index_count as usize);
    let mut highest: u32 = 0;
    for _ in 0..index_count {
        let code = if wide {
            cur.read_u32::<LittleEndian>()
        } else {
            cur.read_u16::<LittleEndian>().map(u32::from)
        }
        .map_err(|_| truncated("index data"))?;
        let index = highest.checked_sub(code).ok_or_else(|| {
            TileError::Data(format!("index code {} above high-water mark {}", code, highest))
        })?;
        if index >= vertex_count {
            return Err(TileError::Data(format!(
                "triangle index {} out of range for {} vertices",
                index, vertex_count
            )));
        }
        indices.push(index);
        if code == 0 {
            highest += 1;
        }
    }

    Ok(TerrainMesh {
        positions,
        indices,
        min_height,
        max_height,
        radius,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::terrain::zigzag::zigzag_encode;
    use byteorder::WriteBytesExt;

    /// Builds a mesh payload from absolute quantized vertices and plain
    /// triangle indices.
    pub(crate) fn encode_mesh(
        min_height: f32,
        max_height: f32,
        vertices: &[[u16; 3]],
        triangles: &[[u32; 3]],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.write_f64::<LittleEndian>(0.0).unwrap();
        }
        out.write_f32::<LittleEndian>(min_height).unwrap();
        out.write_f32::<LittleEndian>(max_height).unwrap();
        for _ in 0..3 {
            out.write_f64::<LittleEndian>(0.0).unwrap();
        }
        out.write_f64::<LittleEndian>(1000.0).unwrap();
        for _ in 0..3 {
            out.write_f64::<LittleEndian>(0.0).unwrap();
        }
        out.write_u32::<LittleEndian>(vertices.len() as u32).unwrap();
        for channel in 0..3 {
            let mut prev = 0i32;
            for v in vertices {
                let value = v[channel] as i32;
                out.write_u16::<LittleEndian>(zigzag_encode(value - prev) as u16)
                    .unwrap();
                prev = value;
            }
        }
        out.write_u32::<LittleEndian>(triangles.len() as u32).unwrap();
        let mut highest = 0u32;
        for &index in triangles.iter().flatten() {
            let code = highest - index;
            out.write_u16::<LittleEndian>(code as u16).unwrap();
            if code == 0 {
                highest += 1;
            }
        }
        out
    }

    #[test]
    fn test_decode_single_triangle() {
        let buf = encode_mesh(
            100.0,
            200.0,
            &[[0, 0, 0], [32767, 0, 32767], [0, 32767, 16384]],
            &[[0, 1, 2]],
        );
        let mesh = decode_quantized_mesh(&buf).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.radius, 1000.0);
        assert_eq!(mesh.positions[1][0], 1.0);
        assert_eq!(mesh.positions[1][2], 200.0);
        assert_eq!(mesh.positions[0][2], 100.0);
    }

    #[test]
    fn test_high_water_reuses_indices() {
        let buf = encode_mesh(
            0.0,
            10.0,
            &[[0, 0, 0], [32767, 0, 0], [32767, 32767, 0], [0, 32767, 0]],
            &[[0, 1, 2], [0, 2, 3]],
        );
        let mesh = decode_quantized_mesh(&buf).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_rasterized_samples_stay_in_range() {
        let buf = encode_mesh(
            100.0,
            200.0,
            &[[0, 0, 0], [32767, 0, 32767], [0, 32767, 16384]],
            &[[0, 1, 2]],
        );
        let mesh = decode_quantized_mesh(&buf).unwrap();
        let grid = mesh.rasterize(16);

        assert_eq!((grid.width(), grid.height()), (16, 16));
        assert!(grid.data().iter().all(|&h| (100.0..=200.0).contains(&h)));
        // South-west corner is vertex 0, south-east is vertex 1
        assert_eq!(grid.get(0, 15), 100.0);
        assert!((grid.get(15, 15) - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_plane_interpolation() {
        // Height rises linearly with u over a full square
        let buf = encode_mesh(
            0.0,
            100.0,
            &[[0, 0, 0], [32767, 0, 32767], [32767, 32767, 32767], [0, 32767, 0]],
            &[[0, 1, 2], [0, 2, 3]],
        );
        let grid = decode_quantized_mesh(&buf).unwrap().rasterize(5);
        for row in 0..5 {
            for col in 0..5 {
                let expected = col as f32 * 25.0;
                assert!((grid.get(col, row) - expected).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_truncated_payload() {
        let buf = encode_mesh(0.0, 1.0, &[[0, 0, 0], [1, 1, 1], [2, 2, 2]], &[[0, 1, 2]]);
        let err = decode_quantized_mesh(&buf[..buf.len() - 2]).unwrap_err();
        assert_eq!(err.kind(), "DataError");

        let err = decode_quantized_mesh(&buf[..40]).unwrap_err();
        assert_eq!(err.kind(), "DataError");
    }

    #[test]
    fn test_index_above_high_water_rejected() {
        let mut buf = encode_mesh(0.0, 1.0, &[[0, 0, 0], [1, 1, 1], [2, 2, 2]], &[[0, 1, 2]]);
        let len = buf.len();
        buf[len - 2..].copy_from_slice(&5u16.to_le_bytes());

        let err = decode_quantized_mesh(&buf).unwrap_err();
        assert_eq!(err.kind(), "DataError");
    }
}
