//! Tile resources resolved for rendering, with ancestor substitution.
//!
//! When a tile's own image or DEM is not available yet, the nearest cached
//! ancestor is used instead together with the sub-region the tile covers in
//! it:
//!
//! ```text
//!   (0,0,1) ┌─────┬─────┐
//!           │     │  ■  │  ■ = (1,1,3), region (0.5, 0.0, 0.5, 0.5)
//!           ├─────┼─────┤
//!           │     │     │
//!           └─────┴─────┘
//! ```

use std::sync::Arc;

use image::{imageops, RgbaImage};

use crate::coord::{TileLocation, TileRegion};
use crate::dem::Dem;

/// A value found for a tile or one of its ancestors.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    /// Part of the source the requested tile covers
    pub region: TileRegion,
    /// Tile the value belongs to
    pub source: TileLocation,
}

/// Looks up `location`, then each ancestor down to `stop_level`.
///
/// `lookup` is called once per level from the finest to the coarsest and the
/// first hit wins.
pub fn resolve_with_ancestors<T>(
    location: &TileLocation,
    stop_level: u32,
    mut lookup: impl FnMut(&TileLocation) -> Option<T>,
) -> Option<Resolved<T>> {
    let mut current = *location;
    let mut region = TileRegion::FULL;
    loop {
        if let Some(value) = lookup(&current) {
            return Some(Resolved {
                value,
                region,
                source: current,
            });
        }
        if current.level <= stop_level {
            return None;
        }
        let (dx, dy) = current.quadrant_in_parent();
        region = TileRegion::quadrant(dx, dy).sub_region(&region);
        current = current.parent()?;
    }
}

/// Image drawn for a tile.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub image: Arc<RgbaImage>,
    pub region: TileRegion,
    pub source: TileLocation,
    /// Set when the image belongs to an ancestor
    pub partial: bool,
}

impl TileImage {
    pub fn from_resolved(location: &TileLocation, resolved: Resolved<Arc<RgbaImage>>) -> Self {
        Self {
            partial: resolved.source != *location,
            image: resolved.value,
            region: resolved.region,
            source: resolved.source,
        }
    }

    /// Pixel rectangle `(x, y, width, height)` of the region, at least one pixel.
    pub fn pixel_rect(&self) -> (u32, u32, u32, u32) {
        pixel_rect(&self.region, self.image.width(), self.image.height())
    }

    /// Copies the region out of the source image.
    pub fn cropped(&self) -> RgbaImage {
        if self.region.is_full() {
            return (*self.image).clone();
        }
        let (x, y, w, h) = self.pixel_rect();
        imageops::crop_imm(&*self.image, x, y, w, h).to_image()
    }
}

pub(crate) fn pixel_rect(region: &TileRegion, width: u32, height: u32) -> (u32, u32, u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0, 0, 0);
    }
    let x = ((region.x * width as f64).floor() as u32).min(width.saturating_sub(1));
    let y = ((region.y * height as f64).floor() as u32).min(height.saturating_sub(1));
    let w = ((region.width * width as f64).round() as u32).clamp(1, width - x);
    let h = ((region.height * height as f64).round() as u32).clamp(1, height - y);
    (x, y, w, h)
}

/// Elevation used for a tile's mesh.
#[derive(Debug, Clone)]
pub struct TileDem {
    pub dem: Arc<Dem>,
    pub region: TileRegion,
    pub source: TileLocation,
    pub partial: bool,
}

impl TileDem {
    pub fn from_resolved(location: &TileLocation, resolved: Resolved<Arc<Dem>>) -> Self {
        Self {
            partial: resolved.source != *location,
            dem: resolved.value,
            region: resolved.region,
            source: resolved.source,
        }
    }

    /// Altitude at a normalized position inside the tile.
    pub fn altitude_at(&self, x: f64, y: f64) -> f32 {
        self.dem.altitude_at(
            self.region.x + x * self.region.width,
            self.region.y + y * self.region.height,
        )
    }

    /// True if both refer to the same grid and region.
    pub fn same_source(&self, other: &TileDem) -> bool {
        Arc::ptr_eq(&self.dem, &other.dem) && self.region == other.region
    }
}
