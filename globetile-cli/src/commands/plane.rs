//! Plane command - render the flat map view to a PNG.

use std::path::PathBuf;

use globetile::geo::LatLon;
use globetile::surface::{MapSurfacePlane, PixmapCanvas};

use super::common::{check_lat_lon, GlobeKind, SourceArgs, ViewportArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the plane command.
pub struct PlaneArgs {
    pub lat: f64,
    pub lon: f64,
    /// Meters spanned by the image width; the whole extent if unset
    pub scale: Option<f64>,
    pub viewport: ViewportArgs,
    pub sources: SourceArgs,
    pub globe: GlobeKind,
    pub output: PathBuf,
    pub background: [u8; 4],
}

/// Parses `RRGGBB` or `RRGGBBAA`.
pub fn parse_color(value: &str) -> Result<[u8; 4], String> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 && hex.len() != 8 {
        return Err(format!("expected RRGGBB or RRGGBBAA, got '{}'", value));
    }
    let mut rgba = [0, 0, 0, 255];
    for (i, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| format!("invalid color '{}'", value))?;
    }
    Ok(rgba)
}

/// Run the plane command.
pub fn run(args: PlaneArgs) -> Result<(), CliError> {
    check_lat_lon(args.lat, args.lon)?;
    let viewport = args.viewport.viewport()?;

    let runner = CliRunner::new()?;
    runner.log_startup("plane");

    let surface = runner.create_surface(args.globe.globe(), &args.sources)?;
    if surface.picture_reader().is_none() && args.sources.layers.is_empty() {
        return Err(CliError::Usage(
            "No picture source. Use --picture or set sources.picture in config.ini".to_string(),
        ));
    }
    let loader = runner.create_loader();

    let mut plane = MapSurfacePlane::new(&surface, viewport);
    if let Some(scale) = args.scale {
        plane.set_scale(scale);
    }
    // After the scale, which bounds how far the centre can move.
    plane.set_center(plane.map_location_from_lat_lon(&LatLon::new(args.lat, args.lon)));

    let mut canvas = PixmapCanvas::new(args.viewport.width, args.viewport.height)
        .ok_or_else(|| CliError::Usage("Invalid image size".to_string()))?;
    canvas.fill(args.background);
    let stats = plane.draw(&surface, &mut canvas, &loader);

    canvas.save_png(&args.output).map_err(|e| CliError::Output {
        path: args.output.clone(),
        message: e.to_string(),
    })?;

    println!("Wrote {}", args.output.display());
    println!(
        "Level {}: {} tiles visible, {} images drawn ({} from ancestors)",
        stats.level, stats.visible, stats.drawn, stats.partial
    );
    println!("Scale: {:.1} m/pixel", plane.meters_per_pixel());
    Ok(())
}
