//! Ring clipping against an axis-aligned rectangle.
//!
//! Sutherland–Hodgman: the ring is clipped against each rectangle edge in
//! turn, one half-plane per pass.

use super::geometry::Ring;
use crate::grid::BBox;

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    #[inline]
    fn inside(&self, p: [f64; 2]) -> bool {
        match *self {
            Edge::Left(x) => p[0] >= x,
            Edge::Right(x) => p[0] <= x,
            Edge::Bottom(y) => p[1] >= y,
            Edge::Top(y) => p[1] <= y,
        }
    }

    /// Intersection of segment `a`-`b` with this edge's line.
    #[inline]
    fn intersect(&self, a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
        match *self {
            Edge::Left(x) | Edge::Right(x) => {
                let t = (x - a[0]) / (b[0] - a[0]);
                [x, a[1] + t * (b[1] - a[1])]
            }
            Edge::Bottom(y) | Edge::Top(y) => {
                let t = (y - a[1]) / (b[1] - a[1]);
                [a[0] + t * (b[0] - a[0]), y]
            }
        }
    }
}

fn clip_edge(points: &[[f64; 2]], edge: Edge) -> Ring {
    let mut out = Vec::with_capacity(points.len() + 4);
    let Some(&last) = points.last() else {
        return out;
    };

    let mut previous = last;
    for &current in points {
        match (edge.inside(previous), edge.inside(current)) {
            (true, true) => out.push(current),
            (true, false) => out.push(edge.intersect(previous, current)),
            (false, true) => {
                out.push(edge.intersect(previous, current));
                out.push(current);
            }
            (false, false) => {}
        }
        previous = current;
    }
    out
}

/// Clips one ring to `bbox`. The result may be empty.
pub fn clip_ring(ring: &[[f64; 2]], bbox: &BBox) -> Ring {
    let mut points: Ring = ring.to_vec();
    // A repeated closing vertex would produce a zero-length edge
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    for edge in [
        Edge::Left(bbox.min_x),
        Edge::Right(bbox.max_x),
        Edge::Bottom(bbox.min_y),
        Edge::Top(bbox.max_y),
    ] {
        if points.is_empty() {
            break;
        }
        points = clip_edge(&points, edge);
    }
    points
}

/// Clips every ring to `bbox`, dropping rings that collapse to a line or point.
pub fn clip_rings<'a, I>(rings: I, bbox: &BBox) -> Vec<Ring>
where
    I: IntoIterator<Item = &'a Ring>,
{
    rings
        .into_iter()
        .map(|ring| clip_ring(ring, bbox))
        .filter(|ring| {
            BBox::from_points(ring.iter().map(|p| (p[0], p[1])))
                .is_some_and(|b| !b.is_degenerate())
        })
        .collect()
}
