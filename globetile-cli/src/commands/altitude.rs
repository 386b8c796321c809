//! Altitude command - sample the elevation model at points.

use globetile::geo::LatLon;

use super::common::{check_lat_lon, GlobeKind, SourceArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the altitude command.
pub struct AltitudeArgs {
    /// Points as `lat,lon`
    pub points: Vec<String>,
    pub sources: SourceArgs,
    pub globe: GlobeKind,
}

/// Parses `lat,lon`.
pub fn parse_point(value: &str) -> Result<LatLon, CliError> {
    let invalid = || CliError::Usage(format!("Expected 'lat,lon', got '{}'", value));
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    check_lat_lon(lat, lon)?;
    Ok(LatLon::new(lat, lon))
}

/// Run the altitude command.
pub fn run(args: AltitudeArgs) -> Result<(), CliError> {
    let points = args
        .points
        .iter()
        .map(|p| parse_point(p))
        .collect::<Result<Vec<_>, _>>()?;

    let runner = CliRunner::new()?;
    runner.log_startup("altitude");

    if args.sources.dem.is_none() && runner.config().sources.dem.is_none() {
        return Err(CliError::Usage(
            "No elevation source. Use --dem or set sources.dem in config.ini".to_string(),
        ));
    }
    let surface = runner.create_surface(args.globe.globe(), &args.sources)?;
    let loader = runner.create_loader();

    for point in &points {
        let altitude = surface.altitude_at(&loader, point);
        println!(
            "{:>10.5} {:>11.5} {:>10.1} m",
            point.latitude, point.longitude, altitude
        );
    }
    Ok(())
}
