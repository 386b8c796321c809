//! Frame-to-frame retention of built surface tiles.

use std::collections::HashMap;
use std::sync::Arc;

use super::tile::SurfaceTile;
use crate::coord::TileLocation;

/// Two-generation store of built tiles.
///
/// Tiles used this frame live in `current`. At the end of a frame they move
/// to `backup`, and tiles still in `backup` from the frame before are
/// dropped.
#[derive(Debug, Default)]
pub struct TileArena {
    current: HashMap<TileLocation, Arc<SurfaceTile>>,
    backup: HashMap<TileLocation, Arc<SurfaceTile>>,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tile for `location`, moving it from backup to current.
    pub fn get(&mut self, location: &TileLocation) -> Option<Arc<SurfaceTile>> {
        if let Some(tile) = self.current.get(location) {
            return Some(Arc::clone(tile));
        }
        let tile = self.backup.remove(location)?;
        self.current.insert(*location, Arc::clone(&tile));
        Some(tile)
    }

    pub fn insert(&mut self, tile: Arc<SurfaceTile>) {
        self.backup.remove(&tile.location);
        self.current.insert(tile.location, tile);
    }

    /// Demotes this frame's tiles and drops the ones unused for two frames.
    pub fn end_frame(&mut self) -> usize {
        let stale = std::mem::replace(&mut self.backup, std::mem::take(&mut self.current));
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.backup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.backup.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Globe;
    use crate::surface::config::SurfaceConfiguration;
    use crate::surface::select::TileGeometry;

    fn tile(location: TileLocation) -> Arc<SurfaceTile> {
        let config = SurfaceConfiguration::default();
        let globe = Globe::sphere(1.0);
        let geometry = TileGeometry::new(&config.grid(), &globe, &location);
        Arc::new(SurfaceTile::build(&config, &globe, location, geometry, None))
    }

    #[test]
    fn test_tile_survives_one_idle_frame() {
        let mut arena = TileArena::new();
        let location = TileLocation::new(1, 1, 0);
        let built = tile(location);
        arena.insert(Arc::clone(&built));

        arena.end_frame();
        let again = arena.get(&location).unwrap();
        assert!(Arc::ptr_eq(&built, &again));
    }

    #[test]
    fn test_tile_dropped_after_two_idle_frames() {
        let mut arena = TileArena::new();
        let location = TileLocation::new(1, 1, 0);
        arena.insert(tile(location));
        arena.end_frame();
        assert_eq!(arena.end_frame(), 1);
        assert!(arena.get(&location).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_get_promotes_to_current() {
        let mut arena = TileArena::new();
        let location = TileLocation::new(0, 0, 0);
        arena.insert(tile(location));
        arena.end_frame();
        arena.get(&location);
        // Promoted, so one more idle frame is tolerated
        arena.end_frame();
        assert!(arena.get(&location).is_some());
    }
}
