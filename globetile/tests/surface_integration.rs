//! Integration tests for globe tile selection and ancestor substitution.
//!
//! These tests drive [`MapSurface`] end to end with in-memory readers and a
//! real tile directory:
//! - selection over a whole-globe view
//! - refinement towards the camera
//! - a missing tile drawn from its parent's quadrant
//! - the flat plane view rendered from a directory tree
//!
//! Run with: `cargo test --test surface_integration`

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};

use globetile::coord::{TileAddress, TileLocation, TileRegion};
use globetile::geo::{GeoLocation, Globe};
use globetile::loader::{LoaderConfig, TileLoader};
use globetile::provider::{pattern_formatter, DirectoryReader, ProviderError, TileReader};
use globetile::surface::{
    MapSurface, MapSurfacePlane, PixmapCanvas, RenderEngine, RenderedTile, SurfaceConfiguration,
    ViewState, Viewport,
};

// ============================================================================
// Helper Functions
// ============================================================================

const RADIUS: f64 = 1_000_000.0;

fn png(color: [u8; 4], size: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(size, size, Rgba(color))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Serves a solid PNG for every tile except those listed as missing.
struct ImageReader {
    png: Bytes,
    missing: HashSet<TileLocation>,
    reads: AtomicUsize,
}

impl ImageReader {
    fn new(missing: &[TileLocation]) -> Self {
        Self {
            png: Bytes::from(png([10, 20, 30, 255], 4)),
            missing: missing.iter().copied().collect(),
            reads: AtomicUsize::new(0),
        }
    }
}

impl TileReader for ImageReader {
    fn read_data(
        &self,
        address: &TileAddress,
        _timeout: Duration,
    ) -> Result<Option<Bytes>, ProviderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.missing.contains(&address.location) {
            return Ok(None);
        }
        Ok(Some(self.png.clone()))
    }

    fn name(&self) -> &str {
        "image"
    }
}

#[derive(Default)]
struct CollectingEngine {
    tiles: Vec<RenderedTile>,
}

impl RenderEngine for CollectingEngine {
    fn draw_tile(&mut self, tile: &RenderedTile) {
        self.tiles.push(tile.clone());
    }
}

fn surface(maximum_level: u32) -> MapSurface {
    let config = SurfaceConfiguration::default()
        .with_base_tile_counts(2, 2)
        .with_levels(0, 0, maximum_level)
        .with_matrix_orders(4, 16);
    MapSurface::new(config, Globe::sphere(RADIUS)).unwrap()
}

fn view(latitude: f64, longitude: f64, altitude: f64) -> ViewState {
    ViewState::looking_at_center(
        &Globe::sphere(RADIUS),
        GeoLocation::new(latitude, longitude, altitude),
        60f64.to_radians(),
        Viewport::new(1024.0, 768.0),
    )
}

/// Camera over the north-western base tile, close enough to refine it.
fn refining_view() -> ViewState {
    view(32.8, -40.1, 2.0 * RADIUS)
}

fn sorted(mut tiles: Vec<TileLocation>) -> Vec<TileLocation> {
    tiles.sort();
    tiles
}

// ============================================================================
// Selection
// ============================================================================

/// A distant camera with the maximum level at the base level draws every
/// base tile once, each with a complete flat mesh.
#[test]
fn test_whole_globe_selects_base_tiles() {
    let loader = TileLoader::synchronous();
    let mut surface = surface(0);
    let mut engine = CollectingEngine::default();

    let stats = surface.render(&view(0.0, 0.0, 3.0 * RADIUS), &loader, &mut engine);

    assert_eq!(stats.selected, 4);
    let locations: Vec<_> = engine.tiles.iter().map(|t| t.location).collect();
    assert_eq!(
        sorted(locations),
        vec![
            TileLocation::new(0, 0, 0),
            TileLocation::new(0, 0, 1),
            TileLocation::new(0, 1, 0),
            TileLocation::new(0, 1, 1),
        ]
    );

    for tile in &engine.tiles {
        let mesh = &tile.tile.mesh;
        assert_eq!(mesh.order, 4);
        assert_eq!(mesh.vertices.len(), 25);
        assert_eq!(mesh.indices.len(), 4 * 4 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for vertex in &mesh.vertices {
            let p = mesh.origin
                + glam::DVec3::new(
                    vertex.position[0] as f64,
                    vertex.position[1] as f64,
                    vertex.position[2] as f64,
                );
            assert!((p.length() - RADIUS).abs() < 1.0, "vertex off the sphere: {:?}", p);
        }
    }
}

/// The tile under the camera is refined one level; the other base tiles stay.
#[test]
fn test_tile_under_camera_is_refined() {
    let loader = TileLoader::synchronous();
    let mut surface = surface(1);

    let stats = surface.update(&refining_view(), &loader);
    let locations: Vec<_> = surface.tiles().iter().map(|t| t.location).collect();

    assert_eq!(stats.selected, 7);
    assert_eq!(
        sorted(locations),
        vec![
            TileLocation::new(0, 0, 0),
            TileLocation::new(0, 1, 0),
            TileLocation::new(0, 1, 1),
            TileLocation::new(1, 0, 2),
            TileLocation::new(1, 0, 3),
            TileLocation::new(1, 1, 2),
            TileLocation::new(1, 1, 3),
        ]
    );
}

// ============================================================================
// Ancestor substitution
// ============================================================================

/// A leaf whose own image is absent borrows the matching quadrant of its parent.
#[test]
fn test_missing_tile_uses_parent_quadrant() {
    let loader = TileLoader::synchronous();
    let mut surface = surface(1);
    let missing = TileLocation::new(1, 1, 3);
    surface.set_picture_reader(Arc::new(ImageReader::new(&[missing])));

    let stats = surface.update(&refining_view(), &loader);
    assert_eq!(stats.partial, 1);

    let tile = surface
        .tiles()
        .iter()
        .find(|t| t.location == missing)
        .unwrap();
    let picture = tile.picture.as_ref().unwrap();
    assert!(picture.partial);
    assert!(tile.is_partial());
    assert_eq!(picture.source, TileLocation::new(0, 0, 1));
    assert_eq!(picture.region, TileRegion::new(0.5, 0.0, 0.5, 0.5));
    assert_eq!(picture.cropped().dimensions(), (2, 2));

    let others: Vec<_> = surface
        .tiles()
        .iter()
        .filter(|t| t.location != missing)
        .collect();
    assert!(others.iter().all(|t| !t.is_partial()));
}

/// With worker threads, the frame after the loader goes idle has every image,
/// the missing one taken from its parent.
#[test]
fn test_asynchronous_frames_fill_in() {
    let loader = TileLoader::new(LoaderConfig::default().with_threads(2));
    let mut surface = surface(1);
    let missing = TileLocation::new(1, 1, 3);
    let reader = Arc::new(ImageReader::new(&[missing]));
    surface.set_picture_reader(Arc::clone(&reader) as Arc<dyn TileReader>);

    surface.update(&refining_view(), &loader);
    surface.end_frame();

    assert!(loader.wait_until_idle(Duration::from_secs(10)));
    surface.update(&refining_view(), &loader);

    assert!(surface.tiles().iter().all(|t| t.picture.is_some()));
    let tile = surface
        .tiles()
        .iter()
        .find(|t| t.location == missing)
        .unwrap();
    assert_eq!(
        tile.picture.as_ref().map(|p| p.source),
        Some(TileLocation::new(0, 0, 1))
    );

    // Every tile, including the absent one, was read exactly once.
    let reads = reader.reads.load(Ordering::SeqCst);
    surface.end_frame();
    surface.update(&refining_view(), &loader);
    assert!(loader.wait_until_idle(Duration::from_secs(10)));
    assert_eq!(reader.reads.load(Ordering::SeqCst), reads);
}

// ============================================================================
// Plane view
// ============================================================================

/// The whole-world plane view draws both base tiles from a tile directory.
#[test]
fn test_plane_draws_directory_tiles() {
    let dir = tempfile::TempDir::new().unwrap();
    let level_dir = dir.path().join("0").join("0");
    std::fs::create_dir_all(&level_dir).unwrap();
    std::fs::write(level_dir.join("0.png"), png([255, 0, 0, 255], 4)).unwrap();
    std::fs::write(level_dir.join("1.png"), png([0, 0, 255, 255], 4)).unwrap();

    let mut surface = MapSurface::new(SurfaceConfiguration::default(), Globe::WGS84).unwrap();
    surface.set_picture_reader(Arc::new(DirectoryReader::new(
        dir.path(),
        pattern_formatter("{z}/{y}/{x}.png"),
    )));

    let loader = TileLoader::synchronous();
    let plane = MapSurfacePlane::new(&surface, Viewport::new(200.0, 100.0));
    let mut canvas = PixmapCanvas::new(200, 100).unwrap();
    let stats = plane.draw(&surface, &mut canvas, &loader);

    assert_eq!(stats.level, 0);
    assert_eq!(stats.visible, 2);
    assert_eq!(stats.drawn, 2);
    assert_eq!(stats.partial, 0);

    let image = canvas.to_rgba_image();
    let west = image.get_pixel(50, 50);
    let east = image.get_pixel(150, 50);
    assert!(west[0] > 200 && west[2] < 50, "west pixel {:?}", west);
    assert!(east[2] > 200 && east[0] < 50, "east pixel {:?}", east);
}
