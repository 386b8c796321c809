//! INI configuration file.
//!
//! The file lives at `~/.globetile/config.ini` by default. Every key is
//! optional; missing keys keep their defaults.
//!
//! ```ini
//! [surface]
//! base_level = 0
//! base_tile_count_e = 2
//! base_tile_count_n = 1
//! minimum_level = 0
//! maximum_level = 18
//! easting_range = 360
//! northing_range = 180
//! tile_dimension = 256
//! minimum_matrix_order = 8
//! maximum_matrix_order = 32
//!
//! [dem]
//! encoding = float32le
//! flip_y = false
//!
//! [loader]
//! threads = 0
//! max_queue = 100
//! timeout_ms = 10000
//!
//! [cache]
//! max_count = 100
//! expiry_ms = 10000
//!
//! [logging]
//! level = info
//! file = /var/log/globetile.log
//!
//! [sources]
//! picture = https://tiles.example.org/imagery
//! pattern = {z}/{y}/{x}.png
//! dem = /data/dem
//! dem_pattern = {z}/{y}/{x}.bin
//! ```

mod keys;

pub use keys::ConfigKey;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::loader::{LoaderConfig, DEFAULT_TIMEOUT};
use crate::logging::LoggingConfig;
use crate::surface::SurfaceConfiguration;

/// Directory holding the configuration file, relative to the home directory.
const CONFIG_DIR: &str = ".globetile";

const CONFIG_FILE: &str = "config.ini";

/// Default tile path pattern for sources.
pub const DEFAULT_PATTERN: &str = "{z}/{y}/{x}";

/// Errors reading, writing or interpreting the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: ini::Error },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Where tiles come from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcesConfig {
    /// Directory or `http(s)://` base of the base picture
    pub picture: Option<String>,
    pub pattern: String,
    /// Directory or `http(s)://` base of the DEM
    pub dem: Option<String>,
    pub dem_pattern: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            picture: None,
            pattern: DEFAULT_PATTERN.to_string(),
            dem: None,
            dem_pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub surface: SurfaceConfiguration,
    pub loader: LoaderConfig,
    pub timeout: Duration,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
}

/// Path of the default configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

impl ConfigFile {
    /// Loads the default configuration file, or the defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates a configuration file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini(&ini)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses an INI document.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = ConfigFile::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        config.surface.validate()?;
        Ok(config)
    }

    /// Writes the configuration to the default path, creating its directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    /// Renders every key that has a value.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Validated surface parameters.
    pub fn surface_configuration(&self) -> Result<SurfaceConfiguration, ConfigError> {
        self.surface.validate()?;
        Ok(self.surface.clone())
    }

    pub fn loader_config(&self) -> LoaderConfig {
        self.loader.clone()
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.clone()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            surface: SurfaceConfiguration::default(),
            loader: LoaderConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

/// Parses `value` for `section.key`.
pub(crate) fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parses `true`/`false`, `yes`/`no` and `1`/`0`.
pub(crate) fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
