//! Integration tests for cancellation, timeouts and fetch concurrency.

mod common;

use common::{solid_png, MockTransport, RED};
use std::sync::Arc;
use std::time::Duration;
use tilewarp::cache::NoOpStore;
use tilewarp::config::EngineConfig;
use tilewarp::engine::{TileEngine, TileRequest, TransformRequest};
use tilewarp::fetch::{TaskId, MAX_CONCURRENT_FETCHES};
use tilewarp::grid::{Projection, TileCoord, TileUrl};
use tilewarp::raster;

fn layered_request(task_id: TaskId, layers: usize) -> TileRequest {
    let mut request = TileRequest::new(
        task_id,
        TileCoord::new(0, 0, 0),
        TileUrl::new("http://layer0/{z}/{x}/{y}.png").unwrap(),
    );
    for i in 1..layers {
        request
            .urls
            .push(TileUrl::new(format!("http://layer{}/{{z}}/{{x}}/{{y}}.png", i)).unwrap());
    }
    request
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_running_and_drops_queued_fetches() {
    let transport = Arc::new(MockTransport::new().with_delay(Duration::from_secs(10)));
    let engine = TileEngine::new(Arc::clone(&transport), NoOpStore, EngineConfig::default());
    let task_id = TaskId::new();
    let request = layered_request(task_id, MAX_CONCURRENT_FETCHES + 2);

    let (result, aborted) = tokio::join!(engine.get_tile(&request), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.fetcher().scheduler().running(), MAX_CONCURRENT_FETCHES);
        assert_eq!(engine.fetcher().scheduler().queued(), 2);
        engine.cancel(task_id)
    });

    assert_eq!(result.unwrap_err().kind(), "CancelError");
    assert_eq!(aborted, MAX_CONCURRENT_FETCHES + 2);
    // Queued fetches never reached the transport
    assert_eq!(transport.calls(), MAX_CONCURRENT_FETCHES);
    assert_eq!(engine.fetcher().scheduler().running(), 0);
    assert_eq!(engine.fetcher().scheduler().queued(), 0);
    assert_eq!(engine.tasks().active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_leaves_other_tasks_running() {
    let transport = Arc::new(MockTransport::new().with_delay(Duration::from_millis(200)));
    let engine = TileEngine::new(Arc::clone(&transport), NoOpStore, EngineConfig::default());
    let doomed = TaskId::new();
    let survivor = TaskId::new();

    let survivor_request = layered_request(survivor, 1);
    let doomed_request = layered_request(doomed, 2);

    let (doomed_result, survivor_result, _) = tokio::join!(
        engine.get_tile(&doomed_request),
        engine.get_tile(&survivor_request),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.cancel(doomed)
        }
    );

    assert_eq!(doomed_result.unwrap_err().kind(), "CancelError");
    // The survivor ran to completion; its only layer 404s
    assert_eq!(survivor_result.unwrap_err().kind(), "NetworkError");
}

#[tokio::test(start_paused = true)]
async fn test_queued_fetches_start_as_slots_free() {
    let transport = Arc::new(MockTransport::new().with_delay(Duration::from_millis(100)));
    let engine = TileEngine::new(
        Arc::clone(&transport),
        NoOpStore,
        EngineConfig::default().with_max_concurrent_fetches(2),
    );

    let request = layered_request(TaskId::new(), 5);
    let result = engine.get_tile(&request).await;

    // Every layer 404s, but all five went through the two slots
    assert_eq!(result.unwrap_err().kind(), "NetworkError");
    assert_eq!(transport.calls(), 5);
    assert_eq!(engine.fetcher().scheduler().peak_running(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_per_request() {
    let transport = Arc::new(
        MockTransport::new()
            .with("http://layer0/0/0/0.png", solid_png(256, RED))
            .with_delay(Duration::from_secs(60)),
    );
    let engine = TileEngine::new(
        Arc::clone(&transport),
        NoOpStore,
        EngineConfig::default().with_request_timeout(Duration::from_secs(1)),
    );

    let err = engine.get_tile(&layered_request(TaskId::new(), 1)).await.unwrap_err();
    assert_eq!(err.kind(), "TimeoutError");
    assert_eq!(engine.fetcher().scheduler().running(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_source_tile_leaves_hole_in_transform() {
    let transport = Arc::new(MockTransport::new().with_delay(Duration::from_secs(60)));
    let engine = TileEngine::new(
        Arc::clone(&transport),
        NoOpStore,
        EngineConfig::default().with_request_timeout(Duration::from_millis(500)),
    );

    let request = TransformRequest::new(
        TaskId::new(),
        TileCoord::new(0, 0, 0),
        TileUrl::new("http://geo/{z}/{x}/{y}.png").unwrap(),
        Projection::WebMercator,
    );
    let tile = engine.transform_tile(&request).await.unwrap().into_raster().unwrap();
    assert!(raster::is_fully_transparent(&tile));
}
