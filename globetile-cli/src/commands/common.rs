//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use globetile::geo::{GeoLocation, Globe, WGS84_EQUATORIAL_RADIUS};
use globetile::provider::{pattern_formatter, DirectoryReader, ReqwestClient, TileReader, UrlReader};
use globetile::surface::Viewport;

use crate::error::CliError;

/// Globe model selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
pub enum GlobeKind {
    /// WGS84 ellipsoid
    #[default]
    Wgs84,
    /// Sphere with the WGS84 equatorial radius
    Sphere,
}

impl GlobeKind {
    pub fn globe(&self) -> Globe {
        match self {
            GlobeKind::Wgs84 => Globe::WGS84,
            GlobeKind::Sphere => Globe::sphere(WGS84_EQUATORIAL_RADIUS),
        }
    }
}

/// Tile sources given on the command line. Each overrides `[sources]`.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Base picture: a directory or an http(s) URL
    #[arg(long)]
    pub picture: Option<String>,

    /// Tile path pattern for the picture and layers, e.g. {z}/{y}/{x}.png
    #[arg(long)]
    pub pattern: Option<String>,

    /// Elevation model: a directory or an http(s) URL
    #[arg(long)]
    pub dem: Option<String>,

    /// Tile path pattern for the elevation model
    #[arg(long)]
    pub dem_pattern: Option<String>,

    /// Overlay layer source, repeatable, drawn in the order given
    #[arg(long = "layer")]
    pub layers: Vec<String>,

    /// Opacity of every overlay layer, 0 to 1
    #[arg(long, default_value_t = 1.0)]
    pub layer_opacity: f32,
}

/// Output image or view size.
#[derive(Debug, Clone, Args)]
pub struct ViewportArgs {
    /// Width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,
}

impl ViewportArgs {
    pub fn viewport(&self) -> Result<Viewport, CliError> {
        if self.width == 0 || self.height == 0 {
            return Err(CliError::Usage(
                "Viewport width and height must be positive".to_string(),
            ));
        }
        Ok(Viewport::new(self.width as f64, self.height as f64))
    }
}

/// Camera position for the globe view.
#[derive(Debug, Clone, Args)]
pub struct CameraArgs {
    /// Camera latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Camera longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Camera altitude above the surface in meters
    #[arg(long, default_value_t = 10_000_000.0)]
    pub alt: f64,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    pub fov: f64,

    /// Globe model
    #[arg(long, value_enum, default_value_t = GlobeKind::Wgs84)]
    pub globe: GlobeKind,
}

impl CameraArgs {
    pub fn eye(&self) -> Result<GeoLocation, CliError> {
        check_lat_lon(self.lat, self.lon)?;
        if !(self.alt > 0.0) {
            return Err(CliError::Usage("Altitude must be positive".to_string()));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(CliError::Usage(
                "Field of view must be between 0 and 180 degrees".to_string(),
            ));
        }
        Ok(GeoLocation::new(self.lat, self.lon, self.alt))
    }
}

/// Rejects coordinates outside [-90, 90] x [-180, 180].
pub fn check_lat_lon(lat: f64, lon: f64) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CliError::Usage(format!(
            "Coordinates ({}, {}) are outside the valid range",
            lat, lon
        )));
    }
    Ok(())
}

/// Opens a tile source: `http://` or `https://` URLs are read over HTTP,
/// anything else is a directory.
pub fn open_source(source: &str, pattern: &str) -> Result<Arc<dyn TileReader>, CliError> {
    let formatter = pattern_formatter(pattern);
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = ReqwestClient::new()?;
        return Ok(Arc::new(UrlReader::new(source, formatter, client)));
    }
    if !Path::new(source).is_dir() {
        return Err(CliError::Source(format!(
            "'{}' is neither a directory nor an http(s) URL",
            source
        )));
    }
    Ok(Arc::new(DirectoryReader::new(source, formatter)))
}
