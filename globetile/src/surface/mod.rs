//! Map surface: tile selection, resource resolution and compositing.
//!
//! A [`MapSurface`] owns the caches for its base picture, its DEM and up to
//! [`LAYER_COUNT`] overlay layers, and the arena of built tile meshes. Each
//! frame runs three steps on the render thread:
//!
//! ```text
//!   update(view, loader)
//!     ├── dispatch finished loads
//!     ├── select_tiles()            quadtree walk, pure
//!     ├── resolve picture/DEM/layers per leaf (ancestor substitution)
//!     └── build missing meshes      rayon
//!   composite(engine)               one draw_tile() per leaf
//!   end_frame()                     cache end_step(), arena end_frame()
//! ```
//!
//! Tile failures never stop a frame: a leaf falls back to its nearest
//! available ancestor, to flat terrain, or to drawing nothing for a layer.
//!
//! # Example
//!
//! ```ignore
//! use globetile::surface::{MapSurface, SurfaceConfiguration, ViewState, Viewport};
//!
//! let mut surface = MapSurface::new(SurfaceConfiguration::default(), Globe::WGS84)?;
//! surface.set_picture_reader(Arc::new(DirectoryReader::with_default_layout("/tiles")));
//! surface.render(&view, &loader, &mut engine);
//! ```

pub mod arena;
pub mod camera;
pub mod config;
pub mod imagery;
pub mod plane;
pub mod render;
pub mod select;
pub mod tile;

pub use arena::TileArena;
pub use camera::{ViewState, Viewport};
pub use config::{LocationRemap, SelectionPolicy, SurfaceConfiguration, LAYER_COUNT};
pub use imagery::{resolve_with_ancestors, Resolved, TileDem, TileImage};
pub use plane::{Canvas, MapLocation, MapSurfacePlane, PixmapCanvas, PlaneStats, ScreenRect};
pub use render::{compose_leaf_texture, LayerTexture, RenderEngine, RenderedTile};
pub use select::{select_tiles, NodeDecision, TileGeometry, Visibility};
pub use tile::{SurfaceTile, TileMesh, TileVertex};

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CachedTile, Reclaimer, TileCache};
use crate::config::ConfigError;
use crate::coord::{CoordError, TileAddress, TileGrid, TileLocation, TileLocationF};
use crate::dem::{Dem, DemEncoding};
use crate::geo::{Globe, LatLon};
use crate::loader::{LoadKind, LoadRequest, TileLoader, DEFAULT_TIMEOUT};
use crate::provider::{ObjectDecoder, ProviderError, TileAny, TileReader};

/// An image source and its cache.
struct ImageSource {
    reader: Option<Arc<dyn TileReader>>,
    cache: Arc<TileCache>,
    visible: bool,
    opacity: f32,
}

impl ImageSource {
    fn new(cache: Arc<TileCache>) -> Self {
        Self {
            reader: None,
            cache,
            visible: true,
            opacity: 1.0,
        }
    }
}

/// The elevation source, its cache and the decoder for its payloads.
struct DemSource {
    reader: Option<Arc<dyn TileReader>>,
    cache: Arc<TileCache>,
    decoder: Arc<ObjectDecoder>,
}

/// Builds a decoder that turns DEM payloads into [`Dem`] objects.
///
/// Malformed payloads decode to an empty grid, which renders flat.
fn dem_decoder(encoding: DemEncoding, flip_y: bool) -> Arc<ObjectDecoder> {
    Arc::new(move |address: &TileAddress, data: &[u8]| {
        let dem = match Dem::initialize(encoding, data, 0, flip_y) {
            Ok(dem) => dem,
            Err(e) => {
                warn!(address = %address, error = %e, "Malformed DEM payload, using flat terrain");
                Dem::default()
            }
        };
        Ok::<TileAny, ProviderError>(Arc::new(dem))
    })
}

/// Counters for one [`MapSurface::update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Leaves selected for rendering
    pub selected: usize,
    /// Meshes built this frame
    pub built: usize,
    /// Leaves drawn with at least one ancestor stand-in
    pub partial: usize,
    /// Completion callbacks dispatched
    pub completions: usize,
}

/// A tiled globe surface.
pub struct MapSurface {
    config: SurfaceConfiguration,
    grid: TileGrid,
    globe: Globe,
    policy: SelectionPolicy,
    timeout: Duration,
    remap: Option<LocationRemap>,
    reclaimer: Arc<Reclaimer>,
    picture: ImageSource,
    dem: DemSource,
    layers: Vec<ImageSource>,
    arena: TileArena,
    rendered: Vec<RenderedTile>,
}

impl MapSurface {
    /// Creates a surface without readers.
    ///
    /// # Returns
    ///
    /// An error if `config` fails validation.
    pub fn new(config: SurfaceConfiguration, globe: Globe) -> Result<Self, ConfigError> {
        config.validate()?;
        let reclaimer = Arc::new(Reclaimer::new());
        let cache_config = CacheConfig::default();
        let cache = || {
            Arc::new(TileCache::with_reclaimer(
                cache_config.clone(),
                Arc::clone(&reclaimer),
            ))
        };
        let picture = ImageSource::new(cache());
        let dem = DemSource {
            reader: None,
            cache: cache(),
            decoder: dem_decoder(config.dem_encoding, config.flip_dem_y),
        };
        let layers = (0..LAYER_COUNT).map(|_| ImageSource::new(cache())).collect();

        Ok(Self {
            grid: config.grid(),
            config,
            globe,
            policy: SelectionPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            remap: None,
            reclaimer,
            picture,
            dem,
            layers,
            arena: TileArena::new(),
            rendered: Vec::new(),
        })
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces every cache with an empty one using `cache_config`.
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        let cache = |reclaimer: &Arc<Reclaimer>| {
            Arc::new(TileCache::with_reclaimer(
                cache_config.clone(),
                Arc::clone(reclaimer),
            ))
        };
        self.picture.cache = cache(&self.reclaimer);
        self.dem.cache = cache(&self.reclaimer);
        for layer in &mut self.layers {
            layer.cache = cache(&self.reclaimer);
        }
        self
    }

    /// Sets the timeout passed to readers.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Installs a function applied to every location before it reaches a reader or cache.
    pub fn with_location_remap(
        mut self,
        remap: impl Fn(&TileLocation) -> TileLocation + Send + Sync + 'static,
    ) -> Self {
        self.remap = Some(Arc::new(remap));
        self
    }

    // =========================================================================
    // Sources
    // =========================================================================

    pub fn set_picture_reader(&mut self, reader: Arc<dyn TileReader>) {
        self.picture.reader = Some(reader);
        self.picture.cache.clear();
    }

    /// Sets the elevation reader and how its payloads are encoded.
    pub fn set_dem_reader(&mut self, reader: Arc<dyn TileReader>, encoding: DemEncoding, flip_y: bool) {
        self.config.dem_encoding = encoding;
        self.config.flip_dem_y = flip_y;
        self.dem.reader = Some(reader);
        self.dem.decoder = dem_decoder(encoding, flip_y);
        self.dem.cache.clear();
    }

    /// Sets the reader of overlay layer `index`; indices past the last layer are ignored.
    pub fn set_layer_reader(&mut self, index: usize, reader: Arc<dyn TileReader>) {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.reader = Some(reader);
                layer.cache.clear();
            }
            None => debug!(index, "Ignoring reader for unknown layer"),
        }
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.visible = visible;
        }
    }

    /// Sets the opacity of layer `index`, clamped to `[0, 1]`.
    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.opacity = if opacity.is_nan() {
                0.0
            } else {
                opacity.clamp(0.0, 1.0)
            };
        }
    }

    pub fn layer_visible(&self, index: usize) -> bool {
        self.layers.get(index).is_some_and(|l| l.visible)
    }

    pub fn layer_opacity(&self, index: usize) -> Option<f32> {
        self.layers.get(index).map(|l| l.opacity)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Selects and prepares the tiles for one frame.
    ///
    /// Never blocks on I/O: missing resources are queued on `loader` and
    /// substituted from cached ancestors meanwhile.
    pub fn update(&mut self, view: &ViewState, loader: &TileLoader) -> FrameStats {
        let mut stats = FrameStats {
            completions: loader.dispatch_completions(),
            ..FrameStats::default()
        };
        let leaves = select_tiles(&self.config, &self.globe, &self.policy, view);
        stats.selected = leaves.len();

        struct Prepared {
            location: TileLocation,
            picture: Option<TileImage>,
            dem: Option<TileDem>,
            layers: Vec<LayerTexture>,
            tile: Option<Arc<SurfaceTile>>,
        }

        let mut prepared = Vec::with_capacity(leaves.len());
        for location in &leaves {
            let dem = self.resolve_dem(loader, location);
            let picture = self.resolve_image(loader, &self.picture, location, false);
            let layers = self.resolve_layers(loader, location, false);
            let tile = self
                .arena
                .get(location)
                .filter(|t| t.is_built_from(dem.as_ref()));
            prepared.push(Prepared {
                location: *location,
                picture,
                dem,
                layers,
                tile,
            });
        }

        let (config, globe, grid) = (&self.config, &self.globe, &self.grid);
        let built: Vec<(usize, Arc<SurfaceTile>)> = prepared
            .par_iter()
            .enumerate()
            .filter(|(_, p)| p.tile.is_none())
            .map(|(i, p)| {
                let geometry = TileGeometry::new(grid, globe, &p.location);
                let tile = SurfaceTile::build(config, globe, p.location, geometry, p.dem.clone());
                (i, Arc::new(tile))
            })
            .collect();
        stats.built = built.len();
        for (i, tile) in built {
            self.arena.insert(Arc::clone(&tile));
            prepared[i].tile = Some(tile);
        }

        self.rendered = prepared
            .into_iter()
            .filter_map(|p| {
                Some(RenderedTile {
                    location: p.location,
                    tile: p.tile?,
                    picture: p.picture,
                    dem: p.dem,
                    layers: p.layers,
                })
            })
            .collect();
        stats.partial = self.rendered.iter().filter(|t| t.is_partial()).count();

        debug!(
            selected = stats.selected,
            built = stats.built,
            partial = stats.partial,
            completions = stats.completions,
            "Surface updated"
        );
        stats
    }

    /// Issues one draw call per selected tile.
    pub fn composite(&self, engine: &mut dyn RenderEngine) {
        for tile in &self.rendered {
            engine.draw_tile(tile);
        }
    }

    /// Advances every cache and the mesh arena by one generation.
    pub fn end_frame(&mut self) {
        self.picture.cache.end_step();
        self.dem.cache.end_step();
        for layer in &self.layers {
            layer.cache.end_step();
        }
        let dropped = self.arena.end_frame();
        if dropped > 0 {
            tracing::trace!(dropped, "Released tile meshes");
        }
    }

    /// Runs [`update`](Self::update), [`composite`](Self::composite) and
    /// [`end_frame`](Self::end_frame).
    pub fn render(
        &mut self,
        view: &ViewState,
        loader: &TileLoader,
        engine: &mut dyn RenderEngine,
    ) -> FrameStats {
        let stats = self.update(view, loader);
        self.composite(engine);
        self.end_frame();
        stats
    }

    /// Tiles selected by the last update.
    pub fn tiles(&self) -> &[RenderedTile] {
        &self.rendered
    }

    /// Empties every cache and the mesh arena.
    pub fn clear_cache(&mut self) {
        self.picture.cache.clear();
        self.dem.cache.clear();
        for layer in &self.layers {
            layer.cache.clear();
        }
        self.arena.clear();
        self.rendered.clear();
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Returns the cached tile for `location`, queueing a load if it is missing.
    fn request(
        &self,
        loader: &TileLoader,
        reader: &Arc<dyn TileReader>,
        cache: &Arc<TileCache>,
        kind: LoadKind,
        location: &TileLocation,
        load_now: bool,
    ) -> Option<CachedTile> {
        let address = TileAddress::new(self.reader_location(location));
        if !load_now && cache.is_saturated() {
            return cache.get(&address).filter(|t| t.matches(kind.tile_kind()));
        }
        let request = LoadRequest::new(address, Arc::clone(reader))
            .with_cache(Arc::clone(cache))
            .with_timeout(self.timeout)
            .with_load_now(load_now)
            .with_endless(location.level == self.config.base_level);
        loader.load(kind, request).tile().cloned()
    }

    fn resolve_image(
        &self,
        loader: &TileLoader,
        source: &ImageSource,
        location: &TileLocation,
        load_now: bool,
    ) -> Option<TileImage> {
        let reader = source.reader.as_ref()?;
        let resolved = resolve_with_ancestors(location, self.config.base_level, |l| {
            self.request(loader, reader, &source.cache, LoadKind::Image, l, load_now)
                .and_then(|t| t.object().and_then(|o| o.as_image()).cloned())
        })?;
        Some(TileImage::from_resolved(location, resolved))
    }

    fn resolve_layers(
        &self,
        loader: &TileLoader,
        location: &TileLocation,
        load_now: bool,
    ) -> Vec<LayerTexture> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.visible && layer.opacity > 0.0)
            .filter_map(|(index, layer)| {
                let image = self.resolve_image(loader, layer, location, load_now)?;
                Some(LayerTexture {
                    index,
                    image,
                    opacity: layer.opacity,
                })
            })
            .collect()
    }

    fn resolve_dem(&self, loader: &TileLoader, location: &TileLocation) -> Option<TileDem> {
        let reader = self.dem.reader.as_ref()?;
        let kind = LoadKind::Object(Arc::clone(&self.dem.decoder));
        let resolved = resolve_with_ancestors(location, self.config.base_level, |l| {
            self.request(loader, reader, &self.dem.cache, kind.clone(), l, false)
                .and_then(|t| t.object().and_then(|o| o.downcast::<Dem>()))
        })?;
        Some(TileDem::from_resolved(location, resolved))
    }

    /// Picture and visible layers for `location`, fetched on the calling thread.
    pub(crate) fn images_now(
        &self,
        loader: &TileLoader,
        location: &TileLocation,
    ) -> (Option<TileImage>, Vec<LayerTexture>) {
        (
            self.resolve_image(loader, &self.picture, location, true),
            self.resolve_layers(loader, location, true),
        )
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Terrain altitude at `location` in meters.
    ///
    /// Uses the finest cached DEM covering the point. When none is cached the
    /// base tile is loaded synchronously. Returns 0 without a DEM reader or
    /// outside the mapped extent.
    pub fn altitude_at(&self, loader: &TileLoader, location: &LatLon) -> f64 {
        let Some(reader) = self.dem.reader.as_ref() else {
            return 0.0;
        };
        for level in (self.config.base_level..=self.config.maximum_level).rev() {
            let Ok(tile) = self.grid.tile_containing(level, location) else {
                return 0.0;
            };
            let address = TileAddress::new(self.reader_location(&tile));
            if let Some(dem) = self
                .dem
                .cache
                .get(&address)
                .and_then(|t| t.object().and_then(|o| o.downcast::<Dem>()))
            {
                return self.sample_dem(&dem, &tile, location);
            }
        }

        let Ok(base) = self.grid.tile_containing(self.config.base_level, location) else {
            return 0.0;
        };
        let request = LoadRequest::new(TileAddress::new(self.reader_location(&base)), Arc::clone(reader))
            .with_cache(Arc::clone(&self.dem.cache))
            .with_timeout(self.timeout)
            .with_load_now(true)
            .with_endless(true);
        loader
            .load(LoadKind::Object(Arc::clone(&self.dem.decoder)), request)
            .tile()
            .and_then(|t| t.object().and_then(|o| o.downcast::<Dem>()))
            .map_or(0.0, |dem| self.sample_dem(&dem, &base, location))
    }

    fn sample_dem(&self, dem: &Dem, tile: &TileLocation, location: &LatLon) -> f64 {
        let Ok(f) = self.grid.tile_location_from_lat_lon(tile.level, location) else {
            return 0.0;
        };
        let x = (f.e - tile.column as f64).clamp(0.0, 1.0);
        let y = 1.0 - (f.n - tile.row as f64).clamp(0.0, 1.0);
        dem.altitude_at(x, y) as f64
    }

    /// South-west corner of a fractional tile position.
    pub fn lat_lon_from_tile_location(&self, location: &TileLocationF) -> LatLon {
        self.grid
            .lat_lon_from_tile_location(location.level, location.e, location.n)
    }

    pub fn tile_location_from_lat_lon(
        &self,
        level: u32,
        location: &LatLon,
    ) -> Result<TileLocationF, CoordError> {
        self.grid.tile_location_from_lat_lon(level, location)
    }

    /// `(columns, rows)` at `level`.
    pub fn tile_count_at(&self, level: u32) -> (u32, u32) {
        self.grid.tile_count_at(level)
    }

    /// Location passed to readers and caches for a surface tile.
    pub fn reader_location(&self, location: &TileLocation) -> TileLocation {
        match &self.remap {
            Some(remap) => remap(location),
            None => *location,
        }
    }

    /// Looks up a picture image in the cache only.
    pub fn cached_picture(&self, location: &TileLocation) -> Option<Arc<RgbaImage>> {
        let address = TileAddress::new(self.reader_location(location));
        self.picture
            .cache
            .get(&address)
            .and_then(|t| t.object().and_then(|o| o.as_image()).cloned())
    }

    pub fn picture_reader(&self) -> Option<&Arc<dyn TileReader>> {
        self.picture.reader.as_ref()
    }

    pub fn picture_cache(&self) -> &Arc<TileCache> {
        &self.picture.cache
    }

    pub fn dem_cache(&self) -> &Arc<TileCache> {
        &self.dem.cache
    }

    pub fn config(&self) -> &SurfaceConfiguration {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn globe(&self) -> &Globe {
        &self.globe
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;
    use bytes::Bytes;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RADIUS: f64 = 1_000_000.0;

    /// Serves a 1×1 PNG for every tile and a constant DEM.
    struct FixedReader {
        png: Bytes,
        reads: AtomicUsize,
    }

    impl FixedReader {
        fn new(color: [u8; 4]) -> Self {
            let mut out = Cursor::new(Vec::new());
            RgbaImage::from_pixel(1, 1, Rgba(color))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
            Self {
                png: Bytes::from(out.into_inner()),
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl TileReader for FixedReader {
        fn read_data(&self, _: &TileAddress, _: Duration) -> Result<Option<Bytes>, ProviderError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.png.clone()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct DemReader(Vec<u8>);

    impl TileReader for DemReader {
        fn read_data(&self, _: &TileAddress, _: Duration) -> Result<Option<Bytes>, ProviderError> {
            Ok(Some(Bytes::from(self.0.clone())))
        }

        fn name(&self) -> &str {
            "dem"
        }
    }

    fn surface(maximum_level: u32) -> MapSurface {
        let config = SurfaceConfiguration::default()
            .with_base_tile_counts(2, 2)
            .with_levels(0, 0, maximum_level)
            .with_matrix_orders(2, 8);
        MapSurface::new(config, Globe::sphere(RADIUS)).unwrap()
    }

    fn view() -> ViewState {
        ViewState::looking_at_center(
            &Globe::sphere(RADIUS),
            GeoLocation::new(0.0, 0.0, 3.0 * RADIUS),
            60f64.to_radians(),
            Viewport::new(1024.0, 768.0),
        )
    }

    #[derive(Default)]
    struct CountingEngine(usize);

    impl RenderEngine for CountingEngine {
        fn draw_tile(&mut self, _: &RenderedTile) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let config = SurfaceConfiguration::default().with_levels(0, 5, 2);
        assert!(MapSurface::new(config, Globe::WGS84).is_err());
    }

    #[test]
    fn test_synchronous_loader_fills_pictures() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        surface.set_picture_reader(Arc::new(FixedReader::new([1, 2, 3, 255])));
        let mut engine = CountingEngine::default();
        let stats = surface.render(&view(), &loader, &mut engine);
        assert_eq!(stats.selected, 4);
        assert_eq!(engine.0, 4);
        assert!(surface.tiles().iter().all(|t| t.picture.is_some()));
    }

    #[test]
    fn test_meshes_reused_between_frames() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        let first = surface.update(&view(), &loader);
        surface.end_frame();
        let second = surface.update(&view(), &loader);
        assert_eq!(first.built, 4);
        assert_eq!(second.built, 0);
    }

    #[test]
    fn test_dem_change_rebuilds_mesh() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        surface.update(&view(), &loader);
        surface.end_frame();
        let samples = DemEncoding::Float32Le.encode(&[5.0; 9]);
        surface.set_dem_reader(Arc::new(DemReader(samples)), DemEncoding::Float32Le, false);
        let stats = surface.update(&view(), &loader);
        assert_eq!(stats.built, 4);
        assert!(surface.tiles().iter().all(|t| t.dem.is_some()));
    }

    #[test]
    fn test_malformed_dem_is_flat() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        surface.set_dem_reader(Arc::new(DemReader(vec![1, 2, 3])), DemEncoding::Int16Le, false);
        assert_eq!(surface.altitude_at(&loader, &LatLon::new(10.0, 10.0)), 0.0);
        surface.update(&view(), &loader);
        let tile = &surface.tiles()[0];
        assert_eq!(tile.dem.as_ref().unwrap().dem.order(), 0);
        assert_eq!(tile.tile.mesh.order, 2);
    }

    #[test]
    fn test_altitude_from_dem() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        assert_eq!(surface.altitude_at(&loader, &LatLon::new(10.0, 10.0)), 0.0);
        let samples = DemEncoding::Int16Be.encode(&[100.0, 200.0, 300.0, 400.0]);
        surface.set_dem_reader(Arc::new(DemReader(samples)), DemEncoding::Int16Be, false);
        // North-west corner of the north-east base tile
        assert_eq!(surface.altitude_at(&loader, &LatLon::new(90.0, 0.0)), 100.0);
        // South-east corner
        assert_eq!(surface.altitude_at(&loader, &LatLon::new(0.0, 180.0)), 400.0);
    }

    #[test]
    fn test_layer_settings() {
        let mut surface = surface(0);
        surface.set_layer_opacity(1, 3.0);
        assert_eq!(surface.layer_opacity(1), Some(1.0));
        surface.set_layer_opacity(1, -1.0);
        assert_eq!(surface.layer_opacity(1), Some(0.0));
        surface.set_layer_opacity(LAYER_COUNT, 0.5);
        assert_eq!(surface.layer_opacity(LAYER_COUNT), None);
        surface.set_layer_visible(2, false);
        assert!(!surface.layer_visible(2));
        surface.set_layer_reader(LAYER_COUNT + 3, Arc::new(FixedReader::new([0; 4])));
    }

    #[test]
    fn test_layers_in_order_and_hidden_skipped() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0);
        surface.set_layer_reader(3, Arc::new(FixedReader::new([0, 0, 255, 128])));
        surface.set_layer_reader(1, Arc::new(FixedReader::new([255, 0, 0, 128])));
        surface.set_layer_reader(2, Arc::new(FixedReader::new([0, 255, 0, 128])));
        surface.set_layer_visible(2, false);
        surface.set_layer_opacity(3, 0.25);
        surface.update(&view(), &loader);
        let layers = &surface.tiles()[0].layers;
        let indices: Vec<usize> = layers.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(layers[1].opacity, 0.25);
    }

    #[test]
    fn test_location_remap_reaches_cache() {
        let loader = TileLoader::synchronous();
        let mut surface = surface(0).with_location_remap(|l| TileLocation::new(l.level + 10, l.column, l.row));
        surface.set_picture_reader(Arc::new(FixedReader::new([9, 9, 9, 255])));
        surface.update(&view(), &loader);
        assert_eq!(
            surface.reader_location(&TileLocation::new(0, 1, 1)),
            TileLocation::new(10, 1, 1)
        );
        assert!(surface.cached_picture(&TileLocation::new(0, 1, 1)).is_some());
        let direct = TileAddress::new(TileLocation::new(0, 1, 1));
        assert!(surface.picture_cache().get(&direct).is_none());
    }

    #[test]
    fn test_clear_cache_forces_refetch() {
        let loader = TileLoader::synchronous();
        let reader = Arc::new(FixedReader::new([1, 1, 1, 255]));
        let mut surface = surface(0);
        surface.set_picture_reader(reader.clone());
        surface.update(&view(), &loader);
        let reads = reader.reads.load(Ordering::SeqCst);
        surface.update(&view(), &loader);
        assert_eq!(reader.reads.load(Ordering::SeqCst), reads);
        surface.clear_cache();
        assert!(surface.tiles().is_empty());
        surface.update(&view(), &loader);
        assert!(reader.reads.load(Ordering::SeqCst) > reads);
    }
}
