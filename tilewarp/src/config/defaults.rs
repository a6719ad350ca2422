//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;

/// Maximum number of network fetches running at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 6;

/// Per-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Entries kept in the decoded raster cache.
pub const DEFAULT_RASTER_CACHE_CAPACITY: usize = 500;

/// Entries kept in the raw buffer cache.
pub const DEFAULT_BUFFER_CACHE_CAPACITY: usize = 500;

/// Edge length of an output tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Short yield inserted before raster work so cancellation can be observed.
pub const DEFAULT_YIELD_DELAY_MS: u64 = 1;

/// Longer yield used before the heavier reprojection and terrain work.
pub const DEFAULT_HEAVY_YIELD_DELAY_MS: u64 = 20;

/// Upper bound accepted for `[fetch] max_concurrent`.
pub const MAX_CONCURRENT_FETCHES_CEILING: usize = 64;

/// Smallest and largest accepted tile edge.
pub const MIN_TILE_SIZE: u32 = 16;
pub const MAX_TILE_SIZE: u32 = 4096;

/// Log filter used when neither the config nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

pub fn default_log_file() -> String {
    "tilewarp.log".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            fetch: FetchSettings {
                max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
                timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            },
            cache: CacheSettings {
                raster_capacity: DEFAULT_RASTER_CACHE_CAPACITY,
                buffer_capacity: DEFAULT_BUFFER_CACHE_CAPACITY,
            },
            tile: TileSettings {
                size: DEFAULT_TILE_SIZE,
            },
            logging: LoggingSettings {
                directory: default_log_dir(),
                file: default_log_file(),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}
