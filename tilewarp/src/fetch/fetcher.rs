//! Cached, scheduled fetching of tile bodies and decoded rasters.
//!
//! Lookup order for a URL:
//!
//! 1. in-memory cache (raster or buffer, depending on the call)
//! 2. the persistence tier, when the request opts in
//! 3. the network, through the [`FetchScheduler`]
//!
//! Cache hits return copies; callers never share a cached raster.

use bytes::Bytes;
use image::RgbaImage;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

use super::scheduler::{FetchController, FetchScheduler};
use super::task::{TaskHandle, TaskId};
use super::transport::{FetchRequest, HttpTransport};
use crate::cache::{BoundedCache, CacheStats, TileStore};
use crate::config::EngineConfig;
use crate::error::TileError;

/// Per-request fetch options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
    pub referrer: Option<String>,
    /// Overrides the engine-wide request timeout
    pub timeout: Option<Duration>,
    /// Consult and fill the in-memory cache
    pub use_cache: bool,
    /// Consult and fill the persistence tier
    pub persist: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            referrer: None,
            timeout: None,
            use_cache: true,
            persist: false,
        }
    }
}

impl FetchOptions {
    fn request(&self, url: &str) -> FetchRequest {
        FetchRequest {
            url: url.to_string(),
            headers: self.headers.clone(),
            referrer: self.referrer.clone(),
        }
    }
}

/// Fetches tile bodies through the caches, the store and the scheduler.
pub struct Fetcher<T, S> {
    transport: T,
    store: S,
    scheduler: FetchScheduler,
    buffers: Mutex<BoundedCache<Bytes>>,
    rasters: Mutex<BoundedCache<RgbaImage>>,
    request_timeout: Duration,
}

impl<T, S> Fetcher<T, S>
where
    T: HttpTransport,
    S: TileStore,
{
    pub fn new(transport: T, store: S, config: &EngineConfig) -> Self {
        let rasters = BoundedCache::with_disposal(config.raster_cache_capacity(), |key, _| {
            trace!(url = %key, "raster evicted");
        });

        Self {
            transport,
            store,
            scheduler: FetchScheduler::new(config.max_concurrent_fetches()),
            buffers: Mutex::new(BoundedCache::new(config.buffer_cache_capacity())),
            rasters: Mutex::new(rasters),
            request_timeout: config.request_timeout(),
        }
    }

    /// Fetches a raw body.
    #[instrument(skip(self, task, options), fields(task_id = %task.id()))]
    pub async fn fetch_buffer(
        &self,
        task: &TaskHandle<'_>,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Bytes, TileError> {
        if options.use_cache {
            if let Some(hit) = self.buffers.lock().get_cloned(url) {
                trace!(url, "buffer cache hit");
                return Ok(hit);
            }
        }

        let body = self.fetch_uncached(task, url, options).await?;

        if options.use_cache {
            self.buffers.lock().add(url, body.clone());
        }
        Ok(body)
    }

    /// Fetches and decodes an image.
    #[instrument(skip(self, task, options), fields(task_id = %task.id()))]
    pub async fn fetch_raster(
        &self,
        task: &TaskHandle<'_>,
        url: &str,
        options: &FetchOptions,
    ) -> Result<RgbaImage, TileError> {
        if options.use_cache {
            if let Some(hit) = self.rasters.lock().get_cloned(url) {
                trace!(url, "raster cache hit");
                return Ok(hit);
            }
        }

        let body = self.fetch_uncached(task, url, options).await?;
        let raster = image::load_from_memory(&body)
            .map_err(|e| TileError::Data(format!("failed to decode {}: {}", url, e)))?
            .to_rgba8();

        if options.use_cache {
            self.rasters.lock().add(url, raster.clone());
        }
        Ok(raster)
    }

    async fn fetch_uncached(
        &self,
        task: &TaskHandle<'_>,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Bytes, TileError> {
        if options.persist {
            if let Some(stored) = self.store.get(url).await {
                trace!(url, bytes = stored.len(), "store hit");
                return Ok(stored);
            }
        }

        let body = self.fetch_network(task, url, options).await?;

        if options.persist {
            if let Err(e) = self.store.set(url, body.clone()).await {
                warn!(url, error = %e, "failed to persist tile body");
            }
        }
        Ok(body)
    }

    async fn fetch_network(
        &self,
        task: &TaskHandle<'_>,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Bytes, TileError> {
        task.ensure_active()?;

        let controller = FetchController::new(task.child_token());
        let token = controller.token().clone();
        let slot = self.scheduler.acquire(task.id(), controller).await?;

        let request = options.request(url);
        let timeout = options.timeout.unwrap_or(self.request_timeout);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TileError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.transport.get(&request)) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    token.cancel();
                    Err(TileError::Timeout { url: url.to_string(), timeout })
                }
            },
        };
        drop(slot);

        match &result {
            Ok(body) => debug!(url, bytes = body.len(), "fetched"),
            Err(e) => debug!(url, error = %e, "fetch failed"),
        }
        result
    }

    /// Aborts every running and queued fetch of `task_id`.
    pub fn cancel(&self, task_id: TaskId) -> usize {
        self.scheduler.cancel_group(task_id)
    }

    pub fn scheduler(&self) -> &FetchScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn buffer_cache_stats(&self) -> CacheStats {
        self.buffers.lock().stats()
    }

    pub fn raster_cache_stats(&self) -> CacheStats {
        self.rasters.lock().stats()
    }

    pub fn cached_rasters(&self) -> usize {
        self.rasters.lock().len()
    }

    pub fn clear_caches(&self) {
        self.buffers.lock().clear();
        self.rasters.lock().clear();
    }
}
