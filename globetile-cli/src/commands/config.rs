//! `globetile config`: inspect and edit the configuration file.
//!
//! Edits are checked before anything is written. A file that does not parse
//! is reported and never replaced with defaults.

use std::path::Path;

use clap::Subcommand;
use globetile::config::{config_file_path, ConfigError, ConfigFile, ConfigKey};
use globetile::geo::WGS84_EQUATORIAL_RADIUS;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// Key as section.key (e.g. surface.maximum_level)
        key: String,
    },

    /// Change one value; an empty value clears optional keys
    Set {
        /// Key as section.key (e.g. cache.max_count)
        key: String,

        value: String,
    },

    /// Print every key as stored
    List,

    /// Print the parameters the surface, loader and cache will run with
    Show,

    /// Print the configuration file path
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let path = config_file_path();
    match command {
        ConfigCommands::Get { key } => {
            let value = read_key(&path, &key)?;
            println!("{}", if value.is_empty() { "(not set)" } else { value.as_str() });
        }
        ConfigCommands::Set { key, value } => {
            let key = write_key(&path, &key, &value)?;
            println!("{} = {}", key.name(), value);
        }
        ConfigCommands::List => print_keys(&load_at(&path)?),
        ConfigCommands::Show => {
            for (label, value) in effective_settings(&load_at(&path)?) {
                if label.is_empty() {
                    println!("{}", value);
                } else {
                    println!("  {:<18} {}", label, value);
                }
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

/// Loads `path`, or the defaults when it does not exist yet.
pub(crate) fn load_at(path: &Path) -> Result<ConfigFile, CliError> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    ConfigFile::load_from(path).map_err(|e| {
        CliError::Config(format!(
            "{} (fix or remove {} first)",
            e,
            path.display()
        ))
    })
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|e: ConfigError| {
        CliError::Config(format!("{}; 'globetile config list' shows every key", e))
    })
}

fn read_key(path: &Path, key: &str) -> Result<String, CliError> {
    let key = parse_key(key)?;
    Ok(key.get(&load_at(path)?))
}

/// Sets one key and saves, leaving the file untouched on any error.
fn write_key(path: &Path, key: &str, value: &str) -> Result<ConfigKey, CliError> {
    let key = parse_key(key)?;
    let mut config = load_at(path)?;
    key.set(&mut config, value)?;
    check_key(key, &config)?;
    config.save_to(path)?;
    tracing::info!(key = %key, value, "Configuration updated");
    Ok(key)
}

/// Rejects values that load but could not run.
fn check_key(key: ConfigKey, config: &ConfigFile) -> Result<(), CliError> {
    match key.section() {
        "surface" | "dem" => {
            config.surface_configuration()?;
        }
        "logging" => config.logging.validate()?,
        _ => {}
    }
    let empty = match key {
        ConfigKey::LoaderMaxQueue => config.loader.max_queue == 0,
        ConfigKey::CacheMaxCount => config.cache.max_count == 0,
        _ => false,
    };
    if empty {
        return Err(CliError::Config(format!("{} must be at least 1", key.name())));
    }
    Ok(())
}

fn print_keys(config: &ConfigFile) {
    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            if !section.is_empty() {
                println!();
            }
            section = key.section();
            println!("[{}]", section);
        }
        let value = key.get(config);
        println!(
            "  {} = {}",
            key.key_name(),
            if value.is_empty() { "(not set)" } else { value.as_str() }
        );
    }
}

/// Ground size of one pixel of a finest-level tile at the equator.
fn finest_meters_per_pixel(config: &ConfigFile) -> f64 {
    let surface = &config.surface;
    let span = 2.0 * std::f64::consts::PI * WGS84_EQUATORIAL_RADIUS
        * surface.easting_range_in_degrees
        / 360.0;
    let depth = surface.maximum_level.saturating_sub(surface.base_level);
    let columns = surface.base_tile_count_e as f64 * 2f64.powi(depth as i32);
    span / columns / surface.tile_dimension_in_pixels.max(1) as f64
}

/// Section headers have an empty label.
fn effective_settings(config: &ConfigFile) -> Vec<(&'static str, String)> {
    let s = &config.surface;
    let source = |source: &Option<String>, pattern: &str| match source {
        Some(source) => format!("{} ({})", source, pattern),
        None => "(not set)".to_string(),
    };
    let threads = if config.loader.threads == 0 {
        format!("{} (all cores)", config.loader.effective_threads())
    } else {
        config.loader.threads.to_string()
    };

    vec![
        ("", "Surface".to_string()),
        (
            "base tiles",
            format!("{} x {} at level {}", s.base_tile_count_e, s.base_tile_count_n, s.base_level),
        ),
        ("levels", format!("{}..={}", s.minimum_level, s.maximum_level)),
        (
            "extent",
            format!("{}° x {}°", s.easting_range_in_degrees, s.northing_range_in_degrees),
        ),
        ("tile size", format!("{} px", s.tile_dimension_in_pixels)),
        (
            "finest pixel",
            format!("{:.3} m at the equator", finest_meters_per_pixel(config)),
        ),
        (
            "mesh order",
            format!("{}..={}", s.minimum_tile_matrix_order, s.maximum_tile_matrix_order),
        ),
        (
            "dem samples",
            format!(
                "{}{}",
                s.dem_encoding,
                if s.flip_dem_y { ", rows flipped" } else { "" }
            ),
        ),
        ("", "Loader".to_string()),
        ("threads", threads),
        ("max queue", config.loader.max_queue.to_string()),
        ("timeout", format!("{} ms", config.timeout.as_millis())),
        ("", "Cache".to_string()),
        ("entries per bucket", config.cache.max_count.to_string()),
        ("expiry", format!("{} ms", config.cache.expiry.as_millis())),
        ("", "Sources".to_string()),
        ("picture", source(&config.sources.picture, &config.sources.pattern)),
        ("dem", source(&config.sources.dem, &config.sources.dem_pattern)),
    ]
}
