//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilewarp::config::ConfigFileError;
use tilewarp::TileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid command-line argument
    Argument(String),
    /// The engine rejected or failed the request
    Engine(TileError),
    /// Failed to read an input file
    FileRead { path: String, error: std::io::Error },
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Engine(TileError::Network { .. }) => {
                eprintln!();
                eprintln!("Check that the URL template expands to a reachable tile:");
                eprintln!("  placeholders are {{z}}, {{x}}, {{y}}, {{-y}} and {{s}}");
            }
            CliError::Engine(TileError::Timeout { .. }) => {
                eprintln!();
                eprintln!("Raise [fetch] timeout_ms in the config file for slow servers.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }

    /// Process exit code: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Argument(_) | CliError::Engine(TileError::Validation(_)) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Argument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Engine(e) => write!(f, "{} ({})", e, e.kind()),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Engine(e) => Some(e),
            CliError::FileRead { error, .. } | CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<TileError> for CliError {
    fn from(e: TileError) -> Self {
        CliError::Engine(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
