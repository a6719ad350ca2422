//! Logging setup.
//!
//! One subscriber feeds two sinks: a plain-text session log under the
//! configured directory (truncated at startup) and compact colored output on
//! stdout. `RUST_LOG` overrides the configured level.

use std::fs;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Keeps the background log writer alive. Dropping it flushes the file.
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

/// Installs the global subscriber described by `settings`.
///
/// # Errors
///
/// Fails if the log file cannot be prepared or a global subscriber is
/// already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(&settings.directory)?;
    // Each session starts with an empty log
    fs::File::create(settings.directory.join(&settings.file))?;

    let appender = tracing_appender::rolling::never(&settings.directory, &settings.file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Request spans close with their elapsed time, which is the useful
    // signal for slow fetches and reprojections.
    let session_log = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(&settings.level))
        .with(session_log)
        .with(console)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard { _writer: guard })
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
