//! GlobeTile - multi-resolution tiled imagery and elevation on a globe
//!
//! The library streams raster tiles and elevation models from local
//! directories or HTTP tile servers, caches them with generation-based
//! reclamation, and picks the set of tiles to draw for a camera by
//! walking a quadtree of tiles over an ellipsoid. The same tiles can be
//! drawn flat through a 2-D pan/zoom plane.
//!
//! ```text
//!  provider (readers) ──► loader (worker pool) ──► cache (generations)
//!                                                      │
//!  camera ──► surface::select ──► surface (meshes, imagery, layers) ──► RenderEngine
//!                                     │
//!                                     └──► surface::plane ──► Canvas
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod dem;
pub mod geo;
pub mod loader;
pub mod logging;
pub mod provider;
pub mod surface;

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
