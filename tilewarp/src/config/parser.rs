//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::*;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("max_concurrent") {
            let n: usize = parse_number("fetch", "max_concurrent", v)?;
            if n == 0 {
                return Err(invalid("fetch", "max_concurrent", v, "must be at least 1"));
            }
            config.fetch.max_concurrent = clamp_max_concurrent(n);
        }
        if let Some(v) = section.get("timeout_ms") {
            config.fetch.timeout_ms = parse_number("fetch", "timeout_ms", v)?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("raster_capacity") {
            config.cache.raster_capacity = parse_capacity("raster_capacity", v)?;
        }
        if let Some(v) = section.get("buffer_capacity") {
            config.cache.buffer_capacity = parse_capacity("buffer_capacity", v)?;
        }
    }

    // [tile] section
    if let Some(section) = ini.section(Some("tile")) {
        if let Some(v) = section.get("size") {
            let size: u32 = parse_number("tile", "size", v)?;
            if !(MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&size) {
                return Err(invalid(
                    "tile",
                    "size",
                    v,
                    &format!("must be between {} and {}", MIN_TILE_SIZE, MAX_TILE_SIZE),
                ));
            }
            config.tile.size = size;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
        if let Some(v) = section.get("level") {
            let v = v.trim().to_ascii_lowercase();
            if !LOG_LEVELS.contains(&v.as_str()) {
                return Err(invalid(
                    "logging",
                    "level",
                    &v,
                    "expected one of trace, debug, info, warn, error",
                ));
            }
            config.logging.level = v;
        }
    }

    Ok(config)
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "expected a non-negative integer"))
}

fn parse_capacity(key: &str, value: &str) -> Result<usize, ConfigFileError> {
    let n: usize = parse_number("cache", key, value)?;
    if n == 0 {
        return Err(invalid("cache", key, value, "must be at least 1"));
    }
    Ok(n)
}

/// Clamps fetch concurrency to the ceiling and logs a warning if clamped.
fn clamp_max_concurrent(value: usize) -> usize {
    if value > MAX_CONCURRENT_FETCHES_CEILING {
        tracing::warn!(
            requested = value,
            max = MAX_CONCURRENT_FETCHES_CEILING,
            "max_concurrent above ceiling, clamping"
        );
        return MAX_CONCURRENT_FETCHES_CEILING;
    }
    value
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config() {
        let config = ConfigFile::from_ini_str(
            r#"
[fetch]
timeout_ms = 5000
"#,
        )
        .unwrap();

        assert_eq!(config.fetch.timeout_ms, 5000);
        assert_eq!(config.fetch.max_concurrent, DEFAULT_MAX_CONCURRENT_FETCHES);
        assert_eq!(config.tile.size, DEFAULT_TILE_SIZE);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        std::fs::write(
            &config_path,
            r#"
[fetch]
max_concurrent = 4

[cache]
raster_capacity = 50
buffer_capacity = 20

[tile]
size = 512

[logging]
file = custom.log
level = DEBUG
"#,
        )
        .unwrap();

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config.fetch.max_concurrent, 4);
        assert_eq!(config.cache.raster_capacity, 50);
        assert_eq!(config.cache.buffer_capacity, 20);
        assert_eq!(config.tile.size, 512);
        assert_eq!(config.logging.file, "custom.log");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unknown_log_level() {
        let err = ConfigFile::from_ini_str("[logging]\nlevel = loud\n").unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_invalid_tile_size() {
        let err = ConfigFile::from_ini_str("[tile]\nsize = 3\n").unwrap_err();
        assert!(err.to_string().contains("tile.size"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ConfigFile::from_ini_str("[cache]\nraster_capacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("raster_capacity"));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = ConfigFile::from_ini_str("[fetch]\ntimeout_ms = soon\n").unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
    }

    #[test]
    fn test_max_concurrent_clamped_to_ceiling() {
        let config = ConfigFile::from_ini_str("[fetch]\nmax_concurrent = 1000\n").unwrap();
        assert_eq!(config.fetch.max_concurrent, MAX_CONCURRENT_FETCHES_CEILING);
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
