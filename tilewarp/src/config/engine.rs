//! Runtime configuration for the tile engine.

use std::time::Duration;

use super::defaults::*;
use super::settings::ConfigFile;

/// Configuration for a [`TileEngine`](crate::engine::TileEngine).
///
/// # Example
///
/// ```
/// use tilewarp::config::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_max_concurrent_fetches(4)
///     .with_request_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_concurrent_fetches(), 4);
/// assert_eq!(config.tile_size(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    max_concurrent_fetches: usize,
    request_timeout: Duration,
    raster_cache_capacity: usize,
    buffer_cache_capacity: usize,
    tile_size: u32,
    yield_delay: Duration,
    heavy_yield_delay: Duration,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of fetches allowed to run before requests queue.
    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_raster_cache_capacity(mut self, capacity: usize) -> Self {
        self.raster_cache_capacity = capacity.max(1);
        self
    }

    pub fn with_buffer_cache_capacity(mut self, capacity: usize) -> Self {
        self.buffer_cache_capacity = capacity.max(1);
        self
    }

    pub fn with_tile_size(mut self, size: u32) -> Self {
        self.tile_size = size;
        self
    }

    /// Set the yield delays inserted before raster work.
    ///
    /// Tests use zero delays to keep runs fast.
    pub fn with_yield_delays(mut self, short: Duration, heavy: Duration) -> Self {
        self.yield_delay = short;
        self.heavy_yield_delay = heavy;
        self
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn raster_cache_capacity(&self) -> usize {
        self.raster_cache_capacity
    }

    pub fn buffer_cache_capacity(&self) -> usize {
        self.buffer_cache_capacity
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn yield_delay(&self) -> Duration {
        self.yield_delay
    }

    pub fn heavy_yield_delay(&self) -> Duration {
        self.heavy_yield_delay
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            raster_cache_capacity: DEFAULT_RASTER_CACHE_CAPACITY,
            buffer_cache_capacity: DEFAULT_BUFFER_CACHE_CAPACITY,
            tile_size: DEFAULT_TILE_SIZE,
            yield_delay: Duration::from_millis(DEFAULT_YIELD_DELAY_MS),
            heavy_yield_delay: Duration::from_millis(DEFAULT_HEAVY_YIELD_DELAY_MS),
        }
    }
}

impl From<&ConfigFile> for EngineConfig {
    fn from(file: &ConfigFile) -> Self {
        Self::default()
            .with_max_concurrent_fetches(file.fetch.max_concurrent)
            .with_request_timeout(Duration::from_millis(file.fetch.timeout_ms))
            .with_raster_cache_capacity(file.cache.raster_capacity)
            .with_buffer_cache_capacity(file.cache.buffer_capacity)
            .with_tile_size(file.tile.size)
    }
}
