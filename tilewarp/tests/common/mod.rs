//! Shared helpers for integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tilewarp::fetch::{FetchRequest, HttpTransport};
use tilewarp::TileError;

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Encodes a solid `size × size` PNG.
pub fn solid_png(size: u32, color: Rgba<u8>) -> Bytes {
    png(&RgbaImage::from_pixel(size, size, color))
}

pub fn png(image: &RgbaImage) -> Bytes {
    tilewarp::raster::encode_png(image).unwrap()
}

/// Transport serving canned bodies, recording every request.
///
/// Unknown URLs answer with a 404 network error.
#[derive(Default)]
pub struct MockTransport {
    bodies: HashMap<String, Bytes>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Bytes) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Delays every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl HttpTransport for MockTransport {
    async fn get(&self, request: &FetchRequest) -> Result<Bytes, TileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(request.url.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.bodies
            .get(&request.url)
            .cloned()
            .ok_or_else(|| TileError::network(&request.url, "HTTP 404 Not Found"))
    }
}
