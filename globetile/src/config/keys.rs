//! Typed access to individual configuration keys.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{parse_bool, parse_value, ConfigError, ConfigFile};
use crate::dem::DemEncoding;

/// A `section.key` entry of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    SurfaceBaseLevel,
    SurfaceBaseTileCountE,
    SurfaceBaseTileCountN,
    SurfaceMinimumLevel,
    SurfaceMaximumLevel,
    SurfaceEastingRange,
    SurfaceNorthingRange,
    SurfaceTileDimension,
    SurfaceMinimumMatrixOrder,
    SurfaceMaximumMatrixOrder,
    DemSampleEncoding,
    DemFlipY,
    LoaderThreads,
    LoaderMaxQueue,
    LoaderTimeoutMs,
    CacheMaxCount,
    CacheExpiryMs,
    LoggingLevel,
    LoggingFile,
    SourcesPicture,
    SourcesPattern,
    SourcesDem,
    SourcesDemPattern,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            SurfaceBaseLevel,
            SurfaceBaseTileCountE,
            SurfaceBaseTileCountN,
            SurfaceMinimumLevel,
            SurfaceMaximumLevel,
            SurfaceEastingRange,
            SurfaceNorthingRange,
            SurfaceTileDimension,
            SurfaceMinimumMatrixOrder,
            SurfaceMaximumMatrixOrder,
            DemSampleEncoding,
            DemFlipY,
            LoaderThreads,
            LoaderMaxQueue,
            LoaderTimeoutMs,
            CacheMaxCount,
            CacheExpiryMs,
            LoggingLevel,
            LoggingFile,
            SourcesPicture,
            SourcesPattern,
            SourcesDem,
            SourcesDemPattern,
        ]
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SurfaceBaseLevel
            | SurfaceBaseTileCountE
            | SurfaceBaseTileCountN
            | SurfaceMinimumLevel
            | SurfaceMaximumLevel
            | SurfaceEastingRange
            | SurfaceNorthingRange
            | SurfaceTileDimension
            | SurfaceMinimumMatrixOrder
            | SurfaceMaximumMatrixOrder => "surface",
            DemSampleEncoding | DemFlipY => "dem",
            LoaderThreads | LoaderMaxQueue | LoaderTimeoutMs => "loader",
            CacheMaxCount | CacheExpiryMs => "cache",
            LoggingLevel | LoggingFile => "logging",
            SourcesPicture | SourcesPattern | SourcesDem | SourcesDemPattern => "sources",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SurfaceBaseLevel => "base_level",
            SurfaceBaseTileCountE => "base_tile_count_e",
            SurfaceBaseTileCountN => "base_tile_count_n",
            SurfaceMinimumLevel => "minimum_level",
            SurfaceMaximumLevel => "maximum_level",
            SurfaceEastingRange => "easting_range",
            SurfaceNorthingRange => "northing_range",
            SurfaceTileDimension => "tile_dimension",
            SurfaceMinimumMatrixOrder => "minimum_matrix_order",
            SurfaceMaximumMatrixOrder => "maximum_matrix_order",
            DemSampleEncoding => "encoding",
            DemFlipY => "flip_y",
            LoaderThreads => "threads",
            LoaderMaxQueue => "max_queue",
            LoaderTimeoutMs => "timeout_ms",
            CacheMaxCount => "max_count",
            CacheExpiryMs => "expiry_ms",
            LoggingLevel => "level",
            LoggingFile => "file",
            SourcesPicture => "picture",
            SourcesPattern => "pattern",
            SourcesDem => "dem",
            SourcesDemPattern => "dem_pattern",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let s = &config.surface;
        match self {
            SurfaceBaseLevel => s.base_level.to_string(),
            SurfaceBaseTileCountE => s.base_tile_count_e.to_string(),
            SurfaceBaseTileCountN => s.base_tile_count_n.to_string(),
            SurfaceMinimumLevel => s.minimum_level.to_string(),
            SurfaceMaximumLevel => s.maximum_level.to_string(),
            SurfaceEastingRange => s.easting_range_in_degrees.to_string(),
            SurfaceNorthingRange => s.northing_range_in_degrees.to_string(),
            SurfaceTileDimension => s.tile_dimension_in_pixels.to_string(),
            SurfaceMinimumMatrixOrder => s.minimum_tile_matrix_order.to_string(),
            SurfaceMaximumMatrixOrder => s.maximum_tile_matrix_order.to_string(),
            DemSampleEncoding => s.dem_encoding.to_string(),
            DemFlipY => s.flip_dem_y.to_string(),
            LoaderThreads => config.loader.threads.to_string(),
            LoaderMaxQueue => config.loader.max_queue.to_string(),
            LoaderTimeoutMs => config.timeout.as_millis().to_string(),
            CacheMaxCount => config.cache.max_count.to_string(),
            CacheExpiryMs => config.cache.expiry.as_millis().to_string(),
            LoggingLevel => config.logging.level.clone(),
            LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            SourcesPicture => config.sources.picture.clone().unwrap_or_default(),
            SourcesPattern => config.sources.pattern.clone(),
            SourcesDem => config.sources.dem.clone().unwrap_or_default(),
            SourcesDemPattern => config.sources.dem_pattern.clone(),
        }
    }

    /// Parses `value` into `config`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let (section, key) = (self.section(), self.key_name());
        let s = &mut config.surface;
        let optional = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        match self {
            SurfaceBaseLevel => s.base_level = parse_value(section, key, value)?,
            SurfaceBaseTileCountE => s.base_tile_count_e = parse_value(section, key, value)?,
            SurfaceBaseTileCountN => s.base_tile_count_n = parse_value(section, key, value)?,
            SurfaceMinimumLevel => s.minimum_level = parse_value(section, key, value)?,
            SurfaceMaximumLevel => s.maximum_level = parse_value(section, key, value)?,
            SurfaceEastingRange => s.easting_range_in_degrees = parse_value(section, key, value)?,
            SurfaceNorthingRange => {
                s.northing_range_in_degrees = parse_value(section, key, value)?
            }
            SurfaceTileDimension => s.tile_dimension_in_pixels = parse_value(section, key, value)?,
            SurfaceMinimumMatrixOrder => {
                s.minimum_tile_matrix_order = parse_value(section, key, value)?
            }
            SurfaceMaximumMatrixOrder => {
                s.maximum_tile_matrix_order = parse_value(section, key, value)?
            }
            DemSampleEncoding => {
                s.dem_encoding = DemEncoding::from_str(value.trim()).map_err(|_| {
                    ConfigError::InvalidValue {
                        section: section.to_string(),
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?
            }
            DemFlipY => s.flip_dem_y = parse_bool(section, key, value)?,
            LoaderThreads => config.loader.threads = parse_value(section, key, value)?,
            LoaderMaxQueue => config.loader.max_queue = parse_value(section, key, value)?,
            LoaderTimeoutMs => {
                config.timeout = Duration::from_millis(parse_value(section, key, value)?)
            }
            CacheMaxCount => config.cache.max_count = parse_value(section, key, value)?,
            CacheExpiryMs => {
                config.cache.expiry = Duration::from_millis(parse_value(section, key, value)?)
            }
            LoggingLevel => config.logging.level = value.trim().to_string(),
            LoggingFile => config.logging.file = optional(value).map(PathBuf::from),
            SourcesPicture => config.sources.picture = optional(value),
            SourcesPattern => config.sources.pattern = value.trim().to_string(),
            SourcesDem => config.sources.dem = optional(value),
            SourcesDemPattern => config.sources.dem_pattern = value.trim().to_string(),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
