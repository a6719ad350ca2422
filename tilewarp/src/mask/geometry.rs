//! Mask geometry and GeoJSON input.

use serde::Deserialize;

use crate::error::TileError;
use crate::grid::BBox;

/// A closed ring of `[x, y]` vertices. The closing vertex may be repeated.
pub type Ring = Vec<[f64; 2]>;

/// Polygonal mask geometry in longitude/latitude degrees.
///
/// Each polygon is a list of rings: the first is the outer boundary, the rest
/// are holes. Rings are filled with the even-odd rule, so orientation does not
/// matter.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl MaskGeometry {
    /// Every ring of every polygon.
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(rings.iter()),
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().flatten()),
        }
    }

    /// Bounding box of all vertices, or `None` if there are none.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.rings().flatten().map(|p| (p[0], p[1])))
    }

    pub fn is_empty(&self) -> bool {
        self.rings().all(|ring| ring.is_empty())
    }

    /// Parses a GeoJSON `Polygon`, `MultiPolygon`, or a `Feature` wrapping one.
    pub fn from_geojson(text: &str) -> Result<Self, TileError> {
        let object: GeoJson = serde_json::from_str(text)
            .map_err(|e| TileError::Validation(format!("invalid GeoJSON: {}", e)))?;
        object.into_geometry()
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

impl GeoJson {
    fn into_geometry(self) -> Result<MaskGeometry, TileError> {
        match self {
            Self::Feature { geometry: Some(inner) } => inner.into_geometry(),
            Self::Feature { geometry: None } => Err(TileError::Validation(
                "mask feature has no geometry".into(),
            )),
            Self::Polygon { coordinates } => Ok(MaskGeometry::Polygon(to_rings(coordinates)?)),
            Self::MultiPolygon { coordinates } => Ok(MaskGeometry::MultiPolygon(
                coordinates
                    .into_iter()
                    .map(to_rings)
                    .collect::<Result<_, _>>()?,
            )),
            Self::Unsupported => Err(TileError::Validation(
                "mask geometry must be a Polygon or MultiPolygon".into(),
            )),
        }
    }
}

fn to_rings(rings: Vec<Vec<Vec<f64>>>) -> Result<Vec<Ring>, TileError> {
    rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|position| match position.as_slice() {
                    [x, y, ..] => Ok([*x, *y]),
                    _ => Err(TileError::Validation(
                        "GeoJSON position needs at least two coordinates".into(),
                    )),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_from_geojson() {
        let geometry = MaskGeometry::from_geojson(
            r#"{"type":"Polygon","coordinates":[[[-10,-10],[10,-10],[10,10],[-10,10],[-10,-10]]]}"#,
        )
        .unwrap();

        assert_eq!(geometry.rings().count(), 1);
        assert_eq!(geometry.bbox().unwrap().to_array(), [-10.0, -10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_feature_wrapping_multipolygon() {
        let geometry = MaskGeometry::from_geojson(
            r#"{"type":"Feature","properties":{"name":"islands"},"geometry":{
                "type":"MultiPolygon","coordinates":[
                    [[[0,0],[1,0],[1,1],[0,0]]],
                    [[[5,5,120.0],[6,5,120.0],[6,7,120.0],[5,5,120.0]]]
                ]}}"#,
        )
        .unwrap();

        assert!(matches!(geometry, MaskGeometry::MultiPolygon(ref p) if p.len() == 2));
        assert_eq!(geometry.bbox().unwrap().to_array(), [0.0, 0.0, 6.0, 7.0]);
    }

    #[test]
    fn test_non_polygon_rejected() {
        let err = MaskGeometry::from_geojson(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_short_position_rejected() {
        let err = MaskGeometry::from_geojson(r#"{"type":"Polygon","coordinates":[[[0],[1,1],[0,1]]]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_empty_polygon_has_no_bbox() {
        let geometry = MaskGeometry::Polygon(vec![]);
        assert!(geometry.bbox().is_none());
        assert!(geometry.is_empty());
    }
}
