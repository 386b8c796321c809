//! Select command - run the globe tile selection for one camera.
//!
//! Without tile sources only the quadtree walk runs. With sources, frames
//! are rendered until every selected tile has its own imagery or the frame
//! limit is reached, and the last frame is reported.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use globetile::coord::TileLocation;
use globetile::surface::{compose_leaf_texture, RenderEngine, RenderedTile, ViewState};

use super::common::{CameraArgs, SourceArgs, ViewportArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the select command.
pub struct SelectArgs {
    pub camera: CameraArgs,
    pub viewport: ViewportArgs,
    pub sources: SourceArgs,
    pub frames: u32,
    pub json: bool,
    pub textures: Option<PathBuf>,
}

/// One row of the report.
#[derive(Debug, Clone, Serialize)]
pub struct TileReport {
    pub level: u32,
    pub column: u32,
    pub row: u32,
    /// Tile the picture was taken from, if any
    pub picture_source: Option<TileLocation>,
    pub layers: usize,
    pub vertices: usize,
    pub partial: bool,
}

impl TileReport {
    fn from_rendered(tile: &RenderedTile) -> Self {
        Self {
            level: tile.location.level,
            column: tile.location.column,
            row: tile.location.row,
            picture_source: tile.picture.as_ref().map(|p| p.source),
            layers: tile.layers.len(),
            vertices: tile.tile.mesh.vertices.len(),
            partial: tile.is_partial(),
        }
    }
}

/// Records each drawn tile and optionally writes its composed texture.
struct RecordingEngine {
    texture_dir: Option<PathBuf>,
    texture_size: u32,
    reports: Vec<TileReport>,
    errors: Vec<CliError>,
}

impl RenderEngine for RecordingEngine {
    fn draw_tile(&mut self, tile: &RenderedTile) {
        self.reports.push(TileReport::from_rendered(tile));
        let Some(dir) = &self.texture_dir else {
            return;
        };
        let path = dir.join(format!(
            "{}_{}_{}.png",
            tile.location.level, tile.location.column, tile.location.row
        ));
        if let Err(e) = compose_leaf_texture(tile, self.texture_size).save(&path) {
            self.errors.push(CliError::Output {
                path,
                message: e.to_string(),
            });
        }
    }
}

/// Run the select command.
pub fn run(args: SelectArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("select");

    let eye = args.camera.eye()?;
    let viewport = args.viewport.viewport()?;
    let globe = args.camera.globe.globe();
    let view = ViewState::looking_at_center(&globe, eye, args.camera.fov.to_radians(), viewport);

    let mut surface = runner.create_surface(globe, &args.sources)?;
    let loader = runner.create_loader();
    let wait = runner.config().timeout.max(Duration::from_millis(100));

    if let Some(dir) = &args.textures {
        std::fs::create_dir_all(dir).map_err(|e| CliError::Output {
            path: dir.clone(),
            message: e.to_string(),
        })?;
    }

    // Frames until nothing is partial or pending.
    let frames = args.frames.max(1);
    for frame in 1..frames {
        let stats = surface.update(&view, &loader);
        surface.end_frame();
        if stats.partial == 0 && loader.pending_count() == 0 {
            break;
        }
        if !loader.wait_until_idle(wait) {
            tracing::warn!(frame, "Loader still busy, continuing");
        }
    }

    let mut engine = RecordingEngine {
        texture_dir: args.textures.clone(),
        texture_size: surface.config().tile_dimension_in_pixels,
        reports: Vec::new(),
        errors: Vec::new(),
    };
    let stats = surface.render(&view, &loader, &mut engine);
    if let Some(error) = engine.errors.into_iter().next() {
        return Err(error);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&engine.reports)
            .map_err(|e| CliError::Usage(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "Camera: {:.4}, {:.4} at {:.0} m, fov {:.1}",
        eye.latitude, eye.longitude, eye.altitude, args.camera.fov
    );
    println!(
        "Selected {} tiles ({} partial, {} meshes built)",
        stats.selected, stats.partial, stats.built
    );
    println!();
    println!("{:>5} {:>8} {:>8}  {:>8}  {:<14} layers", "level", "column", "row", "vertices", "picture");
    for report in &engine.reports {
        let picture = match report.picture_source {
            Some(source) if report.partial => {
                format!("{}/{}/{}*", source.level, source.column, source.row)
            }
            Some(source) => format!("{}/{}/{}", source.level, source.column, source.row),
            None => "-".to_string(),
        };
        println!(
            "{:>5} {:>8} {:>8}  {:>8}  {:<14} {}",
            report.level, report.column, report.row, report.vertices, picture, report.layers
        );
    }

    let loader_stats = loader.stats();
    println!();
    println!(
        "Loader: {} requested, {} cache hits, {} fetched, {} failed",
        loader_stats.requested, loader_stats.cache_hits, loader_stats.fetched, loader_stats.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use globetile::geo::Globe;
    use globetile::surface::{SurfaceConfiguration, SurfaceTile, TileGeometry};

    fn rendered(location: TileLocation) -> RenderedTile {
        let config = SurfaceConfiguration::default().with_matrix_orders(2, 2);
        let globe = Globe::sphere(1000.0);
        let geometry = TileGeometry::new(&config.grid(), &globe, &location);
        let tile = SurfaceTile::build(&config, &globe, location, geometry, None);
        RenderedTile {
            location,
            tile: Arc::new(tile),
            picture: None,
            dem: None,
            layers: Vec::new(),
        }
    }

    #[test]
    fn test_recording_engine_reports_tiles() {
        let mut engine = RecordingEngine {
            texture_dir: None,
            texture_size: 16,
            reports: Vec::new(),
            errors: Vec::new(),
        };
        engine.draw_tile(&rendered(TileLocation::new(1, 2, 1)));
        assert_eq!(engine.reports.len(), 1);
        let report = &engine.reports[0];
        assert_eq!((report.level, report.column, report.row), (1, 2, 1));
        assert_eq!(report.vertices, 9);
        assert!(report.picture_source.is_none());
        assert!(!report.partial);
    }

    #[test]
    fn test_recording_engine_writes_textures() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut engine = RecordingEngine {
            texture_dir: Some(dir.path().to_path_buf()),
            texture_size: 8,
            reports: Vec::new(),
            errors: Vec::new(),
        };
        engine.draw_tile(&rendered(TileLocation::new(0, 1, 0)));
        assert!(engine.errors.is_empty());
        assert!(dir.path().join("0_1_0.png").exists());
    }
}
