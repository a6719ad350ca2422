//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, engine creation and
//! output writing so command handlers stay small.

use std::path::Path;
use tracing::info;
use tilewarp::cache::NoOpStore;
use tilewarp::config::{ConfigFile, EngineConfig};
use tilewarp::engine::{TileEngine, TileOutput};
use tilewarp::fetch::ReqwestTransport;
use tilewarp::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Engine type driven by the CLI.
pub type CliEngine = TileEngine<ReqwestTransport, NoOpStore>;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the config file (`config_path`, or the default location) and
    /// initializes logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging_guard = init_logging(&config.logging)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilewarp v{}", tilewarp::VERSION);
        info!("tilewarp CLI: {} command", command);
    }

    /// Creates an engine from the loaded configuration.
    pub fn create_engine(&self) -> Result<CliEngine, CliError> {
        let transport = ReqwestTransport::new()?;
        let engine = TileEngine::new(transport, NoOpStore, EngineConfig::from(&self.config));
        info!("Engine created");
        Ok(engine)
    }

    /// Writes a finished tile as PNG.
    pub fn save_png(&self, path: &Path, output: TileOutput) -> Result<(), CliError> {
        save_png(path, output)
    }
}

pub(crate) fn save_png(path: &Path, output: TileOutput) -> Result<(), CliError> {
    let data = output.into_png()?;
    std::fs::write(path, &data).map_err(|e| CliError::FileWrite {
        path: path.display().to_string(),
        error: e,
    })?;

    let size_kb = data.len() as f64 / 1024.0;
    info!(path = %path.display(), size_kb, "Tile saved");
    println!("Saved {} ({:.1} KB)", path.display(), size_kb);
    Ok(())
}
