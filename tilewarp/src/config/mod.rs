//! Configuration for the tile engine.
//!
//! [`EngineConfig`] is the runtime configuration consumed by the engine.
//! [`ConfigFile`] loads the same settings from an INI file.

mod defaults;
mod engine;
mod file;
mod parser;
mod settings;

pub use defaults::*;
pub use engine::EngineConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, FetchSettings, LoggingSettings, TileSettings};
