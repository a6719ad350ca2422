//! Tilewarp - on-demand map tile production
//!
//! Fetches source tiles under a bounded-concurrency, cancellable scheduler,
//! reprojects them between the geodetic (EPSG:4326) and Web Mercator
//! (EPSG:3857) pyramids, clips them against polygon masks and renders terrain
//! payloads as RGB height tiles.
//!
//! # High-Level API
//!
//! The [`engine`] module provides the entry point:
//!
//! ```ignore
//! use tilewarp::engine::{TileEngine, TransformRequest};
//! use tilewarp::cache::NoOpStore;
//! use tilewarp::config::EngineConfig;
//! use tilewarp::fetch::{ReqwestTransport, TaskId};
//! use tilewarp::grid::{Projection, TileCoord, TileUrl};
//!
//! let engine = TileEngine::new(ReqwestTransport::new()?, NoOpStore, EngineConfig::default());
//! let url = TileUrl::new("https://tiles.example.com/4326/{z}/{x}/{y}.png")?;
//! let request = TransformRequest::new(TaskId::new(), TileCoord::new(3, 2, 2), url, Projection::WebMercator);
//! let tile = engine.transform_tile(&request).await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod logging;
pub mod mask;
pub mod raster;
pub mod reproject;
pub mod terrain;

pub use error::{TileError, TileResult};

/// Version of the tilewarp library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
