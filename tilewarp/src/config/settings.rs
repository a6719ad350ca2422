//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub tile: TileSettings,
    pub logging: LoggingSettings,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Concurrent network fetches allowed before requests queue
    pub max_concurrent: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Capacity of the decoded raster cache (entries)
    pub raster_capacity: usize,
    /// Capacity of the raw buffer cache (entries)
    pub buffer_capacity: usize,
}

/// `[tile]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSettings {
    /// Output tile edge in pixels
    pub size: u32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
    /// Filter directive applied when `RUST_LOG` is unset
    pub level: String,
}
