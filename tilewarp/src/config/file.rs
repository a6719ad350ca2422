//! Loading `config.ini` from disk or text.
//!
//! The default location is `~/.tilewarp/config.ini`. Key mapping lives in
//! [`super::parser`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use super::settings::*;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("malformed config text: {0}")]
    Syntax(#[from] ini::ParseError),

    /// A path given explicitly does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {section}.{key} = '{value}' ({reason})")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Loads `~/.tilewarp/config.ini`, or defaults when there is none.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads a config file named by the caller. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.is_file() {
            return Err(ConfigFileError::NotFound(path.to_path_buf()));
        }
        super::parser::parse_ini(&Ini::load_from_file(path)?)
    }

    pub fn from_ini_str(text: &str) -> Result<Self, ConfigFileError> {
        super::parser::parse_ini(&Ini::load_from_str(text)?)
    }
}

/// `~/.tilewarp`, falling back to `./.tilewarp` without a home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilewarp")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
