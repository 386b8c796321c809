//! Draw calls handed to the render engine, and a CPU compositor.

use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};

use super::imagery::{TileDem, TileImage};
use super::tile::SurfaceTile;
use crate::coord::TileLocation;

/// An overlay image bound to one of the surface layers.
#[derive(Debug, Clone)]
pub struct LayerTexture {
    /// Layer slot, 0 is drawn first
    pub index: usize,
    pub image: TileImage,
    pub opacity: f32,
}

/// One selected tile with everything needed to draw it.
#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub location: TileLocation,
    pub tile: Arc<SurfaceTile>,
    pub picture: Option<TileImage>,
    pub dem: Option<TileDem>,
    /// Visible layers with an image, in drawing order
    pub layers: Vec<LayerTexture>,
}

impl RenderedTile {
    /// True if any resource came from an ancestor.
    pub fn is_partial(&self) -> bool {
        self.picture.as_ref().is_some_and(|p| p.partial)
            || self.dem.as_ref().is_some_and(|d| d.partial)
            || self.layers.iter().any(|l| l.image.partial)
    }
}

/// Receives one call per rendered tile per frame.
pub trait RenderEngine {
    /// Draws the tile mesh textured with the base picture, then each layer
    /// blended with straight alpha at its opacity.
    fn draw_tile(&mut self, tile: &RenderedTile);
}

/// Composites a tile's picture and layers into one `size × size` image.
///
/// Each layer is blended over the result as
/// `out = src · α · opacity + dst · (1 − α · opacity)`.
pub fn compose_leaf_texture(tile: &RenderedTile, size: u32) -> RgbaImage {
    let mut out = match &tile.picture {
        Some(picture) => fit(picture, size),
        None => RgbaImage::new(size, size),
    };
    for layer in &tile.layers {
        let src = fit(&layer.image, size);
        blend_over(&mut out, &src, layer.opacity);
    }
    out
}

fn fit(image: &TileImage, size: u32) -> RgbaImage {
    let crop = image.cropped();
    if crop.dimensions() == (size, size) {
        return crop;
    }
    imageops::resize(&crop, size, size, imageops::FilterType::Triangle)
}

fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        *d = blend_pixel(*d, *s, opacity);
    }
}

fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let a = src[3] as f32 / 255.0 * opacity;
    let mix = |s: u8, d: u8| (s as f32 * a + d as f32 * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
    let alpha = (a * 255.0 + dst[3] as f32 * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), alpha])
}
