//! End-to-end tests for the tile engine.
//!
//! These drive [`TileEngine`] against a mock transport and cover:
//! - plain, layered and ancestor-cut tile fetches
//! - reprojection between pyramids
//! - mask clipping
//! - terrain rendering
//! - caching and the persistence tier

mod common;

use common::{png, solid_png, MockTransport, BLUE, RED};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tilewarp::cache::{MemoryStore, NoOpStore, TileStore};
use tilewarp::config::EngineConfig;
use tilewarp::engine::{
    ClipRequest, MaskRef, OutputFormat, TerrainRequest, TerrainSource, TileEngine, TileRequest,
    TransformRequest,
};
use tilewarp::fetch::TaskId;
use tilewarp::grid::{BBox, Projection, TileCoord, TileUrl};
use tilewarp::mask::MaskGeometry;
use tilewarp::raster;
use tilewarp::terrain::{RgbHeightEncoding, TerrainType};

// =============================================================================
// Test Helpers
// =============================================================================

fn engine(transport: &Arc<MockTransport>) -> TileEngine<Arc<MockTransport>> {
    TileEngine::new(Arc::clone(transport), NoOpStore, EngineConfig::default())
}

fn url(template: &str) -> TileUrl {
    TileUrl::new(template).unwrap()
}

fn square(min: f64, max: f64) -> MaskGeometry {
    MaskGeometry::Polygon(vec![vec![[min, min], [max, min], [max, max], [min, max], [min, min]]])
}

// =============================================================================
// Fetching
// =============================================================================

#[tokio::test]
async fn test_solid_red_mercator_tile_with_max_zoom_zero() {
    let transport = Arc::new(MockTransport::new().with("http://t/0/0/0.png", solid_png(256, RED)));
    let engine = engine(&transport);

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://t/{z}/{x}/{y}.png"));
    request.max_available_zoom = Some(0);

    let tile = engine.get_tile_with_max_zoom(&request).await.unwrap().into_raster().unwrap();

    assert_eq!(tile.dimensions(), (256, 256));
    assert!(tile.pixels().all(|p| *p == RED));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_deep_tile_is_cut_from_ancestor() {
    // Ancestor z1 tile (1, 0): left half red, right half blue
    let ancestor = RgbaImage::from_fn(256, 256, |x, _| if x < 128 { RED } else { BLUE });
    let transport = Arc::new(MockTransport::new().with("http://t/1/1/0.png", png(&ancestor)));
    let engine = engine(&transport);

    // z3 tile (7, 1) is in the right half of (1, 0, 1)
    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(7, 1, 3), url("http://t/{z}/{x}/{y}.png"));
    request.max_available_zoom = Some(1);

    let tile = engine.get_tile_with_max_zoom(&request).await.unwrap().into_raster().unwrap();

    assert_eq!(transport.requested(), vec!["http://t/1/1/0.png".to_string()]);
    assert!(tile.pixels().all(|p| *p == BLUE));
}

#[tokio::test]
async fn test_layers_composite_in_order() {
    let mut top = RgbaImage::new(256, 256);
    for y in 0..128 {
        for x in 0..256 {
            top.put_pixel(x, y, BLUE);
        }
    }
    let transport = Arc::new(
        MockTransport::new()
            .with("http://base/2/1/1.png", solid_png(256, RED))
            .with("http://overlay/2/1/1.png", png(&top)),
    );
    let engine = engine(&transport);

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(1, 1, 2), url("http://base/{z}/{x}/{y}.png"));
    request.urls.push(url("http://overlay/{z}/{x}/{y}.png"));

    let tile = engine.get_tile(&request).await.unwrap().into_raster().unwrap();
    assert_eq!(*tile.get_pixel(10, 10), BLUE);
    assert_eq!(*tile.get_pixel(10, 200), RED);
}

#[tokio::test]
async fn test_missing_layer_is_skipped() {
    let transport = Arc::new(MockTransport::new().with("http://base/0/0/0.png", solid_png(64, RED)));
    let engine = engine(&transport);

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://base/{z}/{x}/{y}.png"));
    request.urls.push(url("http://missing/{z}/{x}/{y}.png"));

    let tile = engine.get_tile(&request).await.unwrap().into_raster().unwrap();
    assert_eq!(tile.dimensions(), (256, 256));
    assert!(tile.pixels().all(|p| *p == RED));
}

#[tokio::test]
async fn test_all_layers_failing_reports_network_error() {
    let transport = Arc::new(MockTransport::new());
    let engine = engine(&transport);

    let request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://none/{z}/{x}/{y}.png"));
    let err = engine.get_tile(&request).await.unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
}

#[tokio::test]
async fn test_validation_happens_before_fetching() {
    let transport = Arc::new(MockTransport::new());
    let engine = engine(&transport);

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(4, 0, 1), url("http://t/{z}/{x}/{y}.png"));
    assert_eq!(engine.get_tile(&request).await.unwrap_err().kind(), "ValidationError");

    request.tile = TileCoord::new(0, 0, 1);
    request.tile_size = Some(0);
    assert_eq!(engine.get_tile(&request).await.unwrap_err().kind(), "ValidationError");

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_repeat_requests_hit_cache() {
    let transport = Arc::new(MockTransport::new().with("http://t/0/0/0.png", solid_png(256, RED)));
    let engine = engine(&transport);
    let request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://t/{z}/{x}/{y}.png"));

    let mut first = engine.get_tile(&request).await.unwrap().into_raster().unwrap();
    // Mutating a returned tile must not touch the cached copy
    first.put_pixel(0, 0, BLUE);
    let second = engine.get_tile(&request).await.unwrap().into_raster().unwrap();

    assert_eq!(*second.get_pixel(0, 0), RED);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_persistence_tier_is_filled_and_read() {
    let transport = Arc::new(MockTransport::new().with("http://t/0/0/0.png", solid_png(16, RED)));
    let store = Arc::new(MemoryStore::new());
    let engine = TileEngine::new(Arc::clone(&transport), Arc::clone(&store), EngineConfig::default());

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://t/{z}/{x}/{y}.png"));
    request.fetch.persist = true;
    request.fetch.use_cache = false;

    engine.get_tile(&request).await.unwrap();
    engine.get_tile(&request).await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert!(store.get("http://t/0/0/0.png").await.is_some());
}

#[tokio::test]
async fn test_png_output() {
    let transport = Arc::new(MockTransport::new().with("http://t/0/0/0.png", solid_png(256, RED)));
    let engine = engine(&transport);

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(0, 0, 0), url("http://t/{z}/{x}/{y}.png"));
    request.output = OutputFormat::Png;

    let bytes = engine.get_tile(&request).await.unwrap().into_png().unwrap();
    let decoded = raster::decode(&bytes).unwrap();
    assert_eq!(*decoded.get_pixel(128, 128), RED);
}

// =============================================================================
// Reprojection
// =============================================================================

#[tokio::test]
async fn test_transform_mercator_from_geodetic_source() {
    let transport = Arc::new(MockTransport::new().with("http://geo/0/0/0.png", solid_png(256, RED)));
    let engine = engine(&transport);

    let mut request = TransformRequest::new(
        TaskId::new(),
        TileCoord::new(0, 0, 0),
        url("http://geo/{z}/{x}/{y}.png"),
        Projection::WebMercator,
    );
    request.max_available_zoom = Some(0);

    let tile = engine.transform_tile(&request).await.unwrap().into_raster().unwrap();

    assert_eq!(tile.dimensions(), (256, 256));
    assert!(tile.pixels().all(|p| *p == RED));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_transform_from_tms_geodetic_source() {
    // Geodetic z1 is a single row, so its TMS row 0 is also XYZ row 0
    let transport = Arc::new(MockTransport::new().with("http://geo/1/0/0.png", solid_png(256, RED)));
    let engine = engine(&transport);

    let mut request = TransformRequest::new(
        TaskId::new(),
        TileCoord::new(0, 0, 1),
        url("http://geo/{z}/{x}/{-y}.png"),
        Projection::WebMercator,
    );
    request.max_available_zoom = Some(1);

    let tile = engine.transform_tile(&request).await.unwrap().into_raster().unwrap();

    assert_eq!(transport.requested(), vec!["http://geo/1/0/0.png".to_string()]);
    assert_eq!(*tile.get_pixel(128, 128), RED);
}

#[tokio::test]
async fn test_transform_fetches_every_overlapping_native_tile() {
    // Geodetic z1 has two tiles; the whole Mercator z0 tile needs both
    let transport = Arc::new(
        MockTransport::new()
            .with("http://geo/1/0/0.png", solid_png(256, RED))
            .with("http://geo/1/1/0.png", solid_png(256, BLUE)),
    );
    let engine = engine(&transport);

    let mut request = TransformRequest::new(
        TaskId::new(),
        TileCoord::new(0, 0, 0),
        url("http://geo/{z}/{x}/{y}.png"),
        Projection::WebMercator,
    );
    request.zoom_offset = 1;

    let tile = engine.transform_tile(&request).await.unwrap().into_raster().unwrap();

    let mut requested = transport.requested();
    requested.sort();
    assert_eq!(requested, vec!["http://geo/1/0/0.png", "http://geo/1/1/0.png"]);
    assert_eq!(*tile.get_pixel(64, 128), RED);
    assert_eq!(*tile.get_pixel(192, 128), BLUE);
}

#[tokio::test]
async fn test_transform_with_failed_source_leaves_blank() {
    let transport = Arc::new(MockTransport::new());
    let engine = engine(&transport);

    let request = TransformRequest::new(
        TaskId::new(),
        TileCoord::new(0, 0, 0),
        url("http://geo/{z}/{x}/{y}.png"),
        Projection::WebMercator,
    );

    let tile = engine.transform_tile(&request).await.unwrap().into_raster().unwrap();
    assert!(raster::is_fully_transparent(&tile));
}

// =============================================================================
// Masks
// =============================================================================

#[tokio::test]
async fn test_clip_disjoint_mask_gives_blank_tile() {
    let engine = engine(&Arc::new(MockTransport::new()));
    engine.inject_mask("box", square(-10.0, 10.0)).unwrap();

    let request = ClipRequest {
        tile: RgbaImage::new(256, 256),
        tile_bbox: BBox::new(20.0, 20.0, 30.0, 30.0),
        mask: MaskRef::new("box"),
        projection: Projection::Geodetic,
        tile_size: None,
        output: OutputFormat::Raster,
    };
    let tile = engine.clip(&request).unwrap().into_raster().unwrap();

    assert_eq!(tile.dimensions(), (256, 256));
    assert!(raster::is_fully_transparent(&tile));
}

#[tokio::test]
async fn test_mask_registration_lifecycle() {
    let engine = engine(&Arc::new(MockTransport::new()));

    engine
        .inject_mask_geojson(
            "coast",
            r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[5,0],[5,5],[0,5],[0,0]]]}}"#,
        )
        .unwrap();
    assert_eq!(
        engine.inject_mask("coast", square(0.0, 1.0)).unwrap_err().kind(),
        "ValidationError"
    );
    assert!(engine.remove_mask("coast"));
    assert!(!engine.remove_mask("coast"));
}

#[tokio::test]
async fn test_get_tile_applies_mask() {
    let transport = Arc::new(MockTransport::new().with("http://t/1/1/0.png", solid_png(256, RED)));
    let engine = engine(&transport);
    // Western hemisphere only; tile (1, 0, 1) is the north-east quadrant
    engine
        .inject_mask("west", MaskGeometry::Polygon(vec![vec![[-180.0, -80.0], [-1.0, -80.0], [-1.0, 80.0], [-180.0, 80.0]]]))
        .unwrap();

    let mut request = TileRequest::new(TaskId::new(), TileCoord::new(1, 0, 1), url("http://t/{z}/{x}/{y}.png"));
    request.mask = Some(MaskRef::new("west"));
    let tile = engine.get_tile(&request).await.unwrap().into_raster().unwrap();
    assert!(raster::is_fully_transparent(&tile));

    request.mask = Some(MaskRef::new("west").reversed());
    let tile = engine.get_tile(&request).await.unwrap().into_raster().unwrap();
    assert!(tile.pixels().all(|p| *p == RED));
}

// =============================================================================
// Terrain
// =============================================================================

#[tokio::test]
async fn test_terrain_from_url_renders_mapbox_rgb() {
    // Terrarium 32768 + 250 metres
    let terrarium = solid_png(64, Rgba([128, 250, 0, 255]));
    let transport = Arc::new(MockTransport::new().with("http://dem/5/1/1.png", terrarium));
    let engine = engine(&transport);

    let mut request = TerrainRequest::new(
        TaskId::new(),
        TerrainSource::Url("http://dem/5/1/1.png".into()),
        TerrainType::Mapzen,
    );
    request.tile_size = Some(32);

    let tile = engine.encode_terrain(&request).await.unwrap().into_raster().unwrap();
    assert_eq!(tile.dimensions(), (32, 32));
    let p = tile.get_pixel(16, 16);
    let height = RgbHeightEncoding::MAPBOX.decode([p[0], p[1], p[2]]);
    assert!((height - 250.0).abs() < 0.05);
    assert_eq!(p[3], 255);
}

#[tokio::test]
async fn test_terrain_corrupt_buffer_is_data_error() {
    let engine = engine(&Arc::new(MockTransport::new()));
    let request = TerrainRequest::new(
        TaskId::new(),
        TerrainSource::Buffer(bytes::Bytes::from_static(&[1, 2, 3])),
        TerrainType::Packed,
    );
    assert_eq!(engine.encode_terrain(&request).await.unwrap_err().kind(), "DataError");
}

#[tokio::test]
async fn test_lerc_without_decoder_is_validation_error() {
    let engine = engine(&Arc::new(MockTransport::new()));
    let request = TerrainRequest::new(
        TaskId::new(),
        TerrainSource::Buffer(bytes::Bytes::from_static(&[0; 32])),
        TerrainType::Lerc,
    );
    assert_eq!(
        engine.encode_terrain(&request).await.unwrap_err().kind(),
        "ValidationError"
    );
}
