//! Flat 2-D map view over the same tiles as the globe.
//!
//! Map coordinates are plate carrée degrees: easting is longitude and
//! northing is latitude. The view is described by its centre and by the
//! number of meters spanned by the viewport width.
//!
//! ```text
//!   (0,0) ───────────────── x
//!     │    ┌──────┬──────┐
//!     │    │ tile │ tile │   level chosen so that a tile pixel is no
//!     │    ├──────┼──────┤   larger than a screen pixel
//!     │    │ tile │ tile │
//!     y    └──────┴──────┘
//! ```

use std::path::Path;

use image::RgbaImage;
use tiny_skia::{BlendMode, Color, ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::debug;

use super::camera::Viewport;
use super::imagery::pixel_rect;
use super::MapSurface;
use crate::coord::{TileLocation, TileRegion};
use crate::geo::LatLon;
use crate::loader::TileLoader;

/// Position in map space, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapLocation {
    pub e: f64,
    pub n: f64,
}

impl MapLocation {
    pub const fn new(e: f64, n: f64) -> Self {
        Self { e, n }
    }
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 2-D drawing target.
pub trait Canvas {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    /// Draws the `src` region of `image` stretched over `dst`.
    fn draw_image(&mut self, image: &RgbaImage, src: TileRegion, dst: ScreenRect, opacity: f32);
}

/// Counters for one plane draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneStats {
    pub level: u32,
    /// Tiles intersecting the viewport
    pub visible: usize,
    /// Images drawn, layers included
    pub drawn: usize,
    /// Images taken from an ancestor
    pub partial: usize,
}

/// Viewing parameters of the flat map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSurfacePlane {
    center: MapLocation,
    /// Meters across the viewport width
    scale: f64,
    min_scale: f64,
    max_scale: f64,
    viewport: Viewport,
    meters_per_degree: f64,
    /// Half extents of the mapped area, in degrees
    half_range: (f64, f64),
}

impl MapSurfacePlane {
    /// Creates a plane view of `surface` showing the whole extent.
    pub fn new(surface: &MapSurface, viewport: Viewport) -> Self {
        let config = surface.config();
        let meters_per_degree =
            2.0 * std::f64::consts::PI * surface.globe().equatorial_radius() / 360.0;
        let max_scale = config.easting_range_in_degrees * meters_per_degree;
        Self {
            center: MapLocation::default(),
            scale: max_scale,
            min_scale: 1.0,
            max_scale,
            viewport,
            meters_per_degree,
            half_range: (
                config.easting_range_in_degrees / 2.0,
                config.northing_range_in_degrees / 2.0,
            ),
        }
    }

    pub fn with_scale_limits(mut self, min_scale: f64, max_scale: f64) -> Self {
        self.min_scale = min_scale.min(max_scale);
        self.max_scale = max_scale.max(min_scale);
        self.set_scale(self.scale);
        self
    }

    pub fn center(&self) -> MapLocation {
        self.center
    }

    /// Moves the view, keeping the whole viewport inside the mapped extent.
    ///
    /// On an axis where the viewport is at least as large as the extent the
    /// view is centred on the extent.
    pub fn set_center(&mut self, center: MapLocation) {
        let (half_width, half_height) = self.half_view();
        self.center = MapLocation::new(
            clamp_axis(center.e, self.half_range.0, half_width),
            clamp_axis(center.n, self.half_range.1, half_height),
        );
    }

    /// Half the viewport's extent, in degrees.
    fn half_view(&self) -> (f64, f64) {
        let half_width = self.scale / self.meters_per_degree / 2.0;
        let aspect = self.viewport.height / self.viewport.width.max(1.0);
        (half_width, half_width * aspect)
    }

    /// Corners of the mapped extent, south-west then north-east.
    pub fn map_range(&self) -> (MapLocation, MapLocation) {
        let (e, n) = self.half_range;
        (MapLocation::new(-e, -n), MapLocation::new(e, n))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Sets the meters spanned by the viewport width, clamped to the scale limits.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(self.min_scale, self.max_scale);
        self.set_center(self.center);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.set_center(self.center);
    }

    /// Meters per screen pixel.
    pub fn meters_per_pixel(&self) -> f64 {
        self.scale / self.viewport.width.max(1.0)
    }

    fn pixels_per_degree(&self) -> f64 {
        self.meters_per_degree / self.meters_per_pixel()
    }

    pub fn view_point_from_map_location(&self, location: &MapLocation) -> (f64, f64) {
        let ppd = self.pixels_per_degree();
        (
            self.viewport.width / 2.0 + (location.e - self.center.e) * ppd,
            self.viewport.height / 2.0 - (location.n - self.center.n) * ppd,
        )
    }

    pub fn map_location_from_view_point(&self, x: f64, y: f64) -> MapLocation {
        let ppd = self.pixels_per_degree();
        MapLocation::new(
            self.center.e + (x - self.viewport.width / 2.0) / ppd,
            self.center.n - (y - self.viewport.height / 2.0) / ppd,
        )
    }

    pub fn lat_lon_from_map_location(&self, location: &MapLocation) -> LatLon {
        LatLon::new(location.n, location.e)
    }

    pub fn map_location_from_lat_lon(&self, location: &LatLon) -> MapLocation {
        MapLocation::new(location.longitude, location.latitude)
    }

    /// Coarsest level whose tile pixels are no larger than screen pixels.
    pub fn level(&self, surface: &MapSurface) -> u32 {
        let config = surface.config();
        let grid = surface.grid();
        let view_mpp = self.meters_per_pixel();
        let first = config.minimum_level.max(config.base_level);
        (first..=config.maximum_level)
            .find(|&level| {
                let (width, _) = grid.tile_size_at(level);
                width * self.meters_per_degree / config.tile_dimension_in_pixels as f64
                    <= view_mpp
            })
            .unwrap_or(config.maximum_level)
    }

    /// Tiles at `level` that intersect the viewport.
    pub fn visible_tiles(&self, surface: &MapSurface, level: u32) -> Vec<TileLocation> {
        let grid = surface.grid();
        let (columns, rows) = grid.tile_count_at(level);
        let (width, height) = grid.tile_size_at(level);
        let top_left = self.map_location_from_view_point(0.0, 0.0);
        let bottom_right =
            self.map_location_from_view_point(self.viewport.width, self.viewport.height);

        let span = |min: f64, max: f64, size: f64, half: f64, count: u32| {
            let first = ((min + half) / size).floor().max(0.0);
            let last = ((max + half) / size).ceil() - 1.0;
            if last < 0.0 || first >= count as f64 {
                return None;
            }
            Some((first as u32, (last as u32).min(count - 1)))
        };
        let Some((c0, c1)) = span(top_left.e, bottom_right.e, width, self.half_range.0, columns)
        else {
            return Vec::new();
        };
        let Some((r0, r1)) = span(bottom_right.n, top_left.n, height, self.half_range.1, rows)
        else {
            return Vec::new();
        };

        let mut tiles = Vec::with_capacity(((c1 - c0 + 1) * (r1 - r0 + 1)) as usize);
        for row in (r0..=r1).rev() {
            for column in c0..=c1 {
                tiles.push(TileLocation::new(level, column, row));
            }
        }
        tiles
    }

    /// Screen rectangle covered by a tile.
    pub fn tile_screen_rect(&self, surface: &MapSurface, location: &TileLocation) -> ScreenRect {
        let rectangle = surface.grid().tile_rectangle(location);
        let (x0, y0) = self.view_point_from_map_location(&MapLocation::new(
            rectangle.bottom_left.longitude,
            rectangle.top_right.latitude,
        ));
        let (x1, y1) = self.view_point_from_map_location(&MapLocation::new(
            rectangle.top_right.longitude,
            rectangle.bottom_left.latitude,
        ));
        ScreenRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Draws the visible tiles of `surface` onto `canvas`.
    ///
    /// Tiles are fetched on the calling thread; a missing tile is replaced
    /// by the matching part of its nearest available ancestor.
    pub fn draw(&self, surface: &MapSurface, canvas: &mut dyn Canvas, loader: &TileLoader) -> PlaneStats {
        let level = self.level(surface);
        let tiles = self.visible_tiles(surface, level);
        let mut stats = PlaneStats {
            level,
            visible: tiles.len(),
            ..PlaneStats::default()
        };

        for location in &tiles {
            let dst = self.tile_screen_rect(surface, location);
            let (picture, layers) = surface.images_now(loader, location);
            let images = picture
                .into_iter()
                .map(|p| (p, 1.0))
                .chain(layers.into_iter().map(|l| (l.image, l.opacity)));
            for (image, opacity) in images {
                canvas.draw_image(&image.image, image.region, dst, opacity);
                stats.drawn += 1;
                if image.partial {
                    stats.partial += 1;
                }
            }
        }

        debug!(
            level,
            visible = stats.visible,
            drawn = stats.drawn,
            partial = stats.partial,
            "Plane drawn"
        );
        stats
    }
}

/// [`Canvas`] backed by a `tiny-skia` pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
}

impl PixmapCanvas {
    /// Creates a transparent canvas, or `None` for a zero-sized one.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
        })
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        self.pixmap
            .fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    }

    /// Copies the canvas into an RGBA image with straight alpha.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Encodes the canvas as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.to_rgba_image().save_with_format(path, image::ImageFormat::Png)
    }
}

fn to_pixmap(image: &RgbaImage, region: &TileRegion) -> Option<Pixmap> {
    let (x, y, w, h) = pixel_rect(region, image.width(), image.height());
    let mut pixmap = Pixmap::new(w, h)?;
    let row = w as usize;
    for (i, px) in pixmap.pixels_mut().iter_mut().enumerate() {
        let p = image.get_pixel(x + (i % row) as u32, y + (i / row) as u32);
        *px = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
    }
    Some(pixmap)
}

impl Canvas for PixmapCanvas {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn draw_image(&mut self, image: &RgbaImage, src: TileRegion, dst: ScreenRect, opacity: f32) {
        let Some(source) = to_pixmap(image, &src) else {
            return;
        };
        let sx = dst.width / source.width() as f64;
        let sy = dst.height / source.height() as f64;
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            blend_mode: BlendMode::SourceOver,
            quality: FilterQuality::Bilinear,
        };
        let transform = Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            dst.x as f32,
            dst.y as f32,
        );
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }
}

fn clamp_axis(value: f64, half_range: f64, half_view: f64) -> f64 {
    if half_view < half_range {
        value.clamp(-half_range + half_view, half_range - half_view)
    } else {
        0.0
    }
}
