//! Registered masks, keyed by id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::geometry::{MaskGeometry, Ring};
use crate::error::TileError;
use crate::grid::BBox;

/// A registered mask. The bbox is computed once, at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    id: String,
    geometry: MaskGeometry,
    bbox: Option<BBox>,
}

impl Mask {
    pub fn new(id: impl Into<String>, geometry: MaskGeometry) -> Self {
        let bbox = geometry.bbox();
        Self {
            id: id.into(),
            geometry,
            bbox,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &MaskGeometry {
        &self.geometry
    }

    /// Geometry bbox in degrees; `None` for a mask without coordinates.
    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.geometry.rings()
    }
}

/// Masks available to clip requests.
///
/// Masks stay registered until removed explicitly.
#[derive(Debug, Default)]
pub struct MaskRegistry {
    masks: DashMap<String, Arc<Mask>>,
}

impl MaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `geometry` under `id`. Fails if `id` is taken.
    pub fn inject(&self, id: &str, geometry: MaskGeometry) -> Result<(), TileError> {
        if id.is_empty() {
            return Err(TileError::Validation("mask id is empty".into()));
        }
        match self.masks.entry(id.to_string()) {
            Entry::Occupied(_) => Err(TileError::Validation(format!(
                "mask '{}' is already registered",
                id
            ))),
            Entry::Vacant(vacant) => {
                let mask = Mask::new(id, geometry);
                debug!(mask_id = id, bbox = ?mask.bbox(), "Mask registered");
                vacant.insert(Arc::new(mask));
                Ok(())
            }
        }
    }

    /// Registers a GeoJSON `Polygon`/`MultiPolygon` (or a `Feature` of one).
    pub fn inject_geojson(&self, id: &str, geojson: &str) -> Result<(), TileError> {
        self.inject(id, MaskGeometry::from_geojson(geojson)?)
    }

    /// Removes `id`. Returns false if it was not registered.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.masks.remove(id).is_some();
        if removed {
            debug!(mask_id = id, "Mask removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mask>> {
        self.masks.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.masks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> MaskGeometry {
        MaskGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]])
    }

    #[test]
    fn test_inject_and_get() {
        let registry = MaskRegistry::new();
        registry.inject("coast", square()).unwrap();

        let mask = registry.get("coast").unwrap();
        assert_eq!(mask.id(), "coast");
        assert_eq!(mask.bbox().unwrap().to_array(), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = MaskRegistry::new();
        registry.inject("coast", square()).unwrap();

        let err = registry.inject("coast", square()).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_non_polygon_geojson_rejected() {
        let registry = MaskRegistry::new();
        let err = registry
            .inject_geojson("pt", r#"{"type":"Point","coordinates":[1,2]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(!registry.contains("pt"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = MaskRegistry::new();
        assert!(!registry.remove("nothing"));

        registry.inject("coast", square()).unwrap();
        assert!(registry.remove("coast"));
        assert!(registry.is_empty());

        // Id can be reused after removal
        registry.inject("coast", square()).unwrap();
    }
}
