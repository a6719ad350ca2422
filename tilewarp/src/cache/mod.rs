//! Caching for fetched tiles.
//!
//! [`BoundedCache`] is the in-memory LRU used for decoded rasters and raw
//! network buffers. [`TileStore`] is the optional persistence tier consulted
//! before the network.

mod bounded;
mod store;

pub use bounded::{BoundedCache, CacheStats, DisposeFn};
pub use store::{MemoryStore, NoOpStore, TileStore};
