//! The tile engine: one context object owning every piece of shared state.
//!
//! A [`TileEngine`] holds the fetcher (caches and scheduler), the active task
//! registry and the mask registry. Construct one per process and share it by
//! reference (or `Arc`) across requests.
//!
//! # Cancellation
//!
//! Every request carries a [`TaskId`]. [`TileEngine::cancel`] aborts the
//! task's in-flight fetches, drops its queued ones and makes its next
//! checkpoint return [`TileError::Cancelled`]. Checkpoints sit before every
//! piece of heavy raster work.

mod options;

pub use options::{
    ClipRequest, MaskRef, OutputFormat, TerrainRequest, TerrainSource, TileOutput, TileRequest,
    TransformRequest, MAX_MOSAIC_TILES, MAX_TILE_SIZE,
};

use futures::future::join_all;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

use options::{validate_tile, validate_tile_size};

use crate::cache::{NoOpStore, TileStore};
use crate::config::EngineConfig;
use crate::error::TileError;
use crate::fetch::{FetchOptions, Fetcher, HttpTransport, TaskHandle, TaskId, TaskRegistry};
use crate::grid::{enumerate_overlap, BBox, Projection, TileCoord, TileUrl, MAX_ZOOM};
use crate::mask::{clip_tile, ClipOptions, MaskGeometry, MaskRegistry};
use crate::raster;
use crate::reproject::{assemble_mosaic, reproject_mosaic, ReprojectInput};
use crate::terrain::{decode_terrain, encode_height_grid, LercDecoder, TerrainParams};

/// Produces finished tiles from remote sources.
pub struct TileEngine<T, S = NoOpStore> {
    config: EngineConfig,
    fetcher: Fetcher<T, S>,
    tasks: TaskRegistry,
    masks: MaskRegistry,
    lerc: Option<Arc<dyn LercDecoder>>,
}

impl<T, S> TileEngine<T, S>
where
    T: HttpTransport,
    S: TileStore,
{
    pub fn new(transport: T, store: S, config: EngineConfig) -> Self {
        debug!(
            max_concurrent = config.max_concurrent_fetches(),
            timeout_ms = config.request_timeout().as_millis(),
            tile_size = config.tile_size(),
            "Tile engine created"
        );
        Self {
            fetcher: Fetcher::new(transport, store, &config),
            config,
            tasks: TaskRegistry::new(),
            masks: MaskRegistry::new(),
            lerc: None,
        }
    }

    /// Registers the decoder used for LERC terrain.
    pub fn with_lerc_decoder(mut self, decoder: Arc<dyn LercDecoder>) -> Self {
        self.lerc = Some(decoder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher<T, S> {
        &self.fetcher
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn masks(&self) -> &MaskRegistry {
        &self.masks
    }

    fn tile_size(&self, requested: Option<u32>) -> Result<u32, TileError> {
        validate_tile_size(requested.unwrap_or(self.config.tile_size()))
    }

    /// Fetches `request.tile`, compositing every URL layer in order.
    ///
    /// A layer that fails with a non-fatal error is skipped; the request
    /// fails only if every layer does.
    #[instrument(skip(self, request), fields(task_id = %request.task_id, tile = %request.tile))]
    pub async fn get_tile(&self, request: &TileRequest) -> Result<TileOutput, TileError> {
        let size = self.tile_size(request.tile_size)?;
        validate_tile(request.projection, request.tile)?;
        if request.urls.is_empty() {
            return Err(TileError::Validation("no tile url given".into()));
        }
        let mask = self.mask_for(request.mask.as_ref())?;

        let task = self.tasks.begin(request.task_id);
        let tile = self
            .fetch_layers(
                &task,
                request.tile,
                request.projection,
                &request.urls,
                size,
                &request.fetch,
            )
            .await?;
        let tile = self
            .finish(&task, tile, request.tile, request.projection, size, mask)
            .await?;
        TileOutput::from_raster(tile, request.output)
    }

    /// Like [`get_tile`](Self::get_tile), but tiles deeper than
    /// `max_available_zoom` are cut from their ancestor at that zoom and
    /// scaled up.
    #[instrument(skip(self, request), fields(task_id = %request.task_id, tile = %request.tile))]
    pub async fn get_tile_with_max_zoom(
        &self,
        request: &TileRequest,
    ) -> Result<TileOutput, TileError> {
        let max_zoom = match request.max_available_zoom {
            Some(max_zoom) if request.tile.z > max_zoom => max_zoom,
            _ => return self.get_tile(request).await,
        };

        let size = self.tile_size(request.tile_size)?;
        validate_tile(request.projection, request.tile)?;
        if request.urls.is_empty() {
            return Err(TileError::Validation("no tile url given".into()));
        }
        let mask = self.mask_for(request.mask.as_ref())?;
        let (ancestor, (col, row, divisions)) = request
            .tile
            .ancestor(max_zoom)
            .zip(request.tile.position_in_ancestor(max_zoom))
            .ok_or_else(|| TileError::Inner(format!("no ancestor of {} at z{}", request.tile, max_zoom)))?;
        trace!(ancestor = %ancestor, col, row, divisions, "Cutting from ancestor tile");

        let task = self.tasks.begin(request.task_id);
        let parent = self
            .fetch_layers(
                &task,
                ancestor,
                request.projection,
                &request.urls,
                size,
                &request.fetch,
            )
            .await?;
        task.checkpoint(self.config.yield_delay()).await?;

        let tile = cut_sub_square(&parent, col, row, divisions, size);
        let tile = self
            .finish(&task, tile, request.tile, request.projection, size, mask)
            .await?;
        TileOutput::from_raster(tile, request.output)
    }

    /// Renders a display tile from a source pyramid in another projection.
    ///
    /// An empty native overlap or a degenerate reprojection yields a blank
    /// tile. Failed source tiles leave holes.
    #[instrument(
        skip(self, request),
        fields(task_id = %request.task_id, tile = %request.tile, projection = %request.projection)
    )]
    pub async fn transform_tile(&self, request: &TransformRequest) -> Result<TileOutput, TileError> {
        let size = self.tile_size(request.tile_size)?;
        validate_tile(request.projection, request.tile)?;
        let mask = self.mask_for(request.mask.as_ref())?;

        let zoom_offset = effective_zoom_offset(request.tile.z, request.zoom_offset, request.max_available_zoom);
        let task = self.tasks.begin(request.task_id);

        let Some(overlap) = enumerate_overlap(request.projection, request.source, request.tile, zoom_offset)
        else {
            debug!("No native overlap, returning blank tile");
            return TileOutput::from_raster(raster::blank(size), request.output);
        };
        if overlap.len() > MAX_MOSAIC_TILES {
            return Err(TileError::Validation(format!(
                "transform needs {} source tiles, limit is {}",
                overlap.len(),
                MAX_MOSAIC_TILES
            )));
        }

        let fetches = overlap.tiles().map(|native| {
            let url = request.url.expand(native, request.source);
            let task = &task;
            async move {
                let result = self.fetcher.fetch_raster(task, &url, &request.fetch).await;
                (native, result)
            }
        });
        let results = join_all(fetches).await;
        task.ensure_active()?;

        let mosaic = assemble_mosaic(&overlap, size, results)?;
        task.checkpoint(self.config.heavy_yield_delay()).await?;

        let input = OwnedReprojectInput {
            mosaic,
            mosaic_bbox: overlap.mosaic_bbox(),
            source: overlap.native,
            target: overlap.display,
            target_bbox: overlap.display_bbox,
            tile_size: size,
        };
        let tile = tokio::task::spawn_blocking(move || input.run())
            .await
            .map_err(|e| TileError::Inner(format!("reprojection task failed: {}", e)))?;
        task.ensure_active()?;

        let tile = match tile {
            Some(tile) => tile,
            None => {
                debug!("Degenerate reprojection, returning blank tile");
                raster::blank(size)
            }
        };
        let tile = self
            .finish(&task, tile, request.tile, request.projection, size, mask)
            .await?;
        TileOutput::from_raster(tile, request.output)
    }

    /// Decodes a terrain payload into an RGB height tile.
    #[instrument(
        skip(self, request),
        fields(task_id = %request.task_id, terrain_type = %request.terrain_type)
    )]
    pub async fn encode_terrain(&self, request: &TerrainRequest) -> Result<TileOutput, TileError> {
        let size = self.tile_size(request.tile_size)?;
        let task = self.tasks.begin(request.task_id);

        let payload = match &request.source {
            TerrainSource::Buffer(bytes) => bytes.clone(),
            TerrainSource::Url(url) => self.fetcher.fetch_buffer(&task, url, &request.fetch).await?,
        };
        task.checkpoint(self.config.heavy_yield_delay()).await?;

        let params = TerrainParams {
            terrain_type: request.terrain_type,
            size,
            height_range: request.height_range,
        };
        let lerc = self.lerc.clone();
        let ramp = request.color_ramp.clone();
        let encoding = request.terrain_type.output_encoding();
        let image = tokio::task::spawn_blocking(move || {
            let mut grid = decode_terrain(&payload, &params, lerc.as_deref())?;
            Ok::<_, TileError>(encode_height_grid(&mut grid, encoding, ramp.as_ref()))
        })
        .await
        .map_err(|e| TileError::Inner(format!("terrain task failed: {}", e)))??;
        task.ensure_active()?;

        TileOutput::from_raster(image, request.output)
    }

    /// Registers a polygon mask.
    pub fn inject_mask(&self, id: &str, geometry: MaskGeometry) -> Result<(), TileError> {
        self.masks.inject(id, geometry)
    }

    /// Registers a mask from GeoJSON text.
    pub fn inject_mask_geojson(&self, id: &str, geojson: &str) -> Result<(), TileError> {
        self.masks.inject_geojson(id, geojson)
    }

    /// Unregisters a mask. Returns false if it was not registered.
    pub fn remove_mask(&self, id: &str) -> bool {
        self.masks.remove(id)
    }

    /// Clips a caller-supplied tile with a registered mask.
    ///
    /// An unknown mask id leaves the tile as it is.
    #[instrument(skip(self, request), fields(mask_id = %request.mask.id))]
    pub fn clip(&self, request: &ClipRequest) -> Result<TileOutput, TileError> {
        let size = self.tile_size(request.tile_size)?;
        if !request.tile_bbox.is_finite() {
            return Err(TileError::Validation(format!("invalid tile bbox {}", request.tile_bbox)));
        }

        let tile = match self.masks.get(&request.mask.id) {
            Some(mask) => clip_tile(
                &request.tile,
                &mask,
                &ClipOptions {
                    tile_bbox: request.tile_bbox,
                    projection: request.projection,
                    tile_size: size,
                    reverse: request.mask.reverse,
                },
            ),
            None => {
                warn!(mask_id = %request.mask.id, "Unknown mask, tile left unclipped");
                raster::resize(&request.tile, size, size)
            }
        };
        TileOutput::from_raster(tile, request.output)
    }

    /// Cancels `task_id`: in-flight fetches abort, queued fetches never
    /// start, and the task's next checkpoint fails.
    ///
    /// Returns the number of fetches aborted.
    pub fn cancel(&self, task_id: TaskId) -> usize {
        let active = self.tasks.cancel(task_id);
        let aborted = self.fetcher.cancel(task_id);
        debug!(task_id = %task_id, active, aborted, "Cancel requested");
        aborted
    }

    fn mask_for(&self, mask: Option<&MaskRef>) -> Result<Option<MaskRef>, TileError> {
        match mask {
            Some(mask) if mask.id.is_empty() => {
                Err(TileError::Validation("mask id is empty".into()))
            }
            other => Ok(other.cloned()),
        }
    }

    async fn fetch_layers(
        &self,
        task: &TaskHandle<'_>,
        tile: TileCoord,
        projection: Projection,
        urls: &[TileUrl],
        size: u32,
        fetch: &FetchOptions,
    ) -> Result<RgbaImage, TileError> {
        let fetches = urls.iter().map(|url| {
            let url = url.expand(tile, projection);
            async move { self.fetcher.fetch_raster(task, &url, fetch).await }
        });
        let results = join_all(fetches).await;
        task.ensure_active()?;

        let mut frame = raster::blank(size);
        let mut drawn = 0usize;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(layer) => {
                    raster::composite_over(&mut frame, &raster::resize(&layer, size, size));
                    drawn += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Layer failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if drawn == 0 => Err(e),
            _ => Ok(frame),
        }
    }

    /// Applies the request mask, if any, after a cancellation checkpoint.
    async fn finish(
        &self,
        task: &TaskHandle<'_>,
        tile: RgbaImage,
        coord: TileCoord,
        projection: Projection,
        size: u32,
        mask: Option<MaskRef>,
    ) -> Result<RgbaImage, TileError> {
        let Some(mask_ref) = mask else {
            return Ok(tile);
        };
        task.checkpoint(self.config.yield_delay()).await?;

        let Some(mask) = self.masks.get(&mask_ref.id) else {
            warn!(mask_id = %mask_ref.id, "Unknown mask, tile left unclipped");
            return Ok(tile);
        };
        let tile_bbox = degree_bbox(projection, coord);
        Ok(clip_tile(
            &tile,
            &mask,
            &ClipOptions {
                tile_bbox,
                projection,
                tile_size: size,
                reverse: mask_ref.reverse,
            },
        ))
    }
}

/// Owned counterpart of [`ReprojectInput`] for moving into a blocking task.
struct OwnedReprojectInput {
    mosaic: RgbaImage,
    mosaic_bbox: BBox,
    source: Projection,
    target: Projection,
    target_bbox: BBox,
    tile_size: u32,
}

impl OwnedReprojectInput {
    fn run(self) -> Option<RgbaImage> {
        reproject_mosaic(&ReprojectInput {
            mosaic: &self.mosaic,
            mosaic_bbox: self.mosaic_bbox,
            source: self.source,
            target: self.target,
            target_bbox: self.target_bbox,
            tile_size: self.tile_size,
        })
    }
}

/// Tile bbox in longitude/latitude degrees.
fn degree_bbox(projection: Projection, tile: TileCoord) -> BBox {
    projection.convert_bbox(&projection.native_tile_bbox(tile), Projection::Geodetic)
}

/// Zoom offset after clamping the native zoom to `max_available_zoom`.
fn effective_zoom_offset(zoom: u8, offset: i8, max_available_zoom: Option<u8>) -> i8 {
    let native = (i16::from(zoom) + i16::from(offset)).clamp(0, i16::from(MAX_ZOOM));
    let native = match max_available_zoom {
        Some(max) => native.min(i16::from(max)),
        None => native,
    };
    (native - i16::from(zoom)).clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8
}

/// Cuts sub-square `(col, row)` of a `divisions × divisions` split of
/// `parent` and scales it to `size`.
fn cut_sub_square(parent: &RgbaImage, col: u32, row: u32, divisions: u32, size: u32) -> RgbaImage {
    let (width, height) = parent.dimensions();
    let span = |index: u32, extent: u32| {
        let start = (u64::from(index) * u64::from(extent) / u64::from(divisions)) as u32;
        let end = (u64::from(index + 1) * u64::from(extent) / u64::from(divisions)) as u32;
        (start.min(extent.saturating_sub(1)), (end.max(start + 1) - start).max(1))
    };
    let (x, w) = span(col, width);
    let (y, h) = span(row, height);
    raster::resize(&raster::crop(parent, x, y, w, h), size, size)
}
