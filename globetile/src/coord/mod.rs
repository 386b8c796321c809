//! Tile addressing and grid conversions.
//!
//! A surface is tiled by a quadtree rooted at a configurable base level with
//! `base_columns × base_rows` tiles. Each deeper level doubles both counts.
//! Columns grow eastward from the western edge of the mapped extent and rows
//! grow northward from its southern edge.
//!
//! ```text
//!   level L+1    ┌────┬────┐
//!                │2c,  2c+1│   row 2r+1 (north)
//!                ├────┼────┤
//!                │    │    │   row 2r   (south)
//!                └────┴────┘
//!   level L      (c, r)
//! ```

mod types;

pub use types::{CoordError, TileAddress, TileLocation, TileLocationF, TileRegion, MAX_LEVEL};

use crate::geo::{GeoRectangle, LatLon};

/// Geometry of a tiled angular extent.
///
/// The extent is centred on latitude/longitude zero: a 360°×180° grid spans
/// the whole globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub base_level: u32,
    pub base_columns: u32,
    pub base_rows: u32,
    /// Longitudinal extent in degrees
    pub easting_range: f64,
    /// Latitudinal extent in degrees
    pub northing_range: f64,
}

impl TileGrid {
    /// Returns `(columns, rows)` at `level`.
    ///
    /// Levels shallower than the base level divide the base counts, never
    /// going below one tile.
    #[inline]
    pub fn tile_count_at(&self, level: u32) -> (u32, u32) {
        if level >= self.base_level {
            let shift = (level - self.base_level).min(MAX_LEVEL);
            (self.base_columns << shift, self.base_rows << shift)
        } else {
            let shift = self.base_level - level;
            (
                (self.base_columns >> shift).max(1),
                (self.base_rows >> shift).max(1),
            )
        }
    }

    /// Angular size `(width, height)` of one tile at `level`, in degrees.
    pub fn tile_size_at(&self, level: u32) -> (f64, f64) {
        let (columns, rows) = self.tile_count_at(level);
        (
            self.easting_range / columns as f64,
            self.northing_range / rows as f64,
        )
    }

    /// True if `location` addresses a tile inside the grid.
    pub fn contains(&self, location: &TileLocation) -> bool {
        let (columns, rows) = self.tile_count_at(location.level);
        location.column < columns && location.row < rows
    }

    /// Validates `location` against the grid.
    pub fn check(&self, location: &TileLocation) -> Result<(), CoordError> {
        if location.level > MAX_LEVEL {
            return Err(CoordError::InvalidLevel(location.level));
        }
        let (columns, rows) = self.tile_count_at(location.level);
        if location.column >= columns || location.row >= rows {
            return Err(CoordError::OutOfRange {
                level: location.level,
                column: location.column,
                row: location.row,
                columns,
                rows,
            });
        }
        Ok(())
    }

    /// South-west corner of a fractional tile position.
    ///
    /// # Arguments
    ///
    /// * `level` - Zoom level
    /// * `e` - Fractional column
    /// * `n` - Fractional row
    #[inline]
    pub fn lat_lon_from_tile_location(&self, level: u32, e: f64, n: f64) -> LatLon {
        let (width, height) = self.tile_size_at(level);
        LatLon::new(
            -self.northing_range / 2.0 + n * height,
            -self.easting_range / 2.0 + e * width,
        )
    }

    /// Converts geographic coordinates to a fractional tile position.
    ///
    /// # Returns
    ///
    /// The fractional location, or an error if the point lies outside the
    /// mapped extent or the level is too deep.
    pub fn tile_location_from_lat_lon(
        &self,
        level: u32,
        location: &LatLon,
    ) -> Result<TileLocationF, CoordError> {
        if level > MAX_LEVEL {
            return Err(CoordError::InvalidLevel(level));
        }
        let half_n = self.northing_range / 2.0;
        let half_e = self.easting_range / 2.0;
        if !(-half_n..=half_n).contains(&location.latitude) {
            return Err(CoordError::InvalidLatitude(location.latitude));
        }
        if !(-half_e..=half_e).contains(&location.longitude) {
            return Err(CoordError::InvalidLongitude(location.longitude));
        }
        let (width, height) = self.tile_size_at(level);
        Ok(TileLocationF {
            level,
            e: (location.longitude + half_e) / width,
            n: (location.latitude + half_n) / height,
        })
    }

    /// Integer tile containing `location`; points on the far edges map to the last tile.
    pub fn tile_containing(
        &self,
        level: u32,
        location: &LatLon,
    ) -> Result<TileLocation, CoordError> {
        let f = self.tile_location_from_lat_lon(level, location)?;
        let (columns, rows) = self.tile_count_at(level);
        let tile = f.floor();
        Ok(TileLocation::new(
            level,
            tile.column.min(columns - 1),
            tile.row.min(rows - 1),
        ))
    }

    /// Geographic rectangle covered by `location`.
    pub fn tile_rectangle(&self, location: &TileLocation) -> GeoRectangle {
        GeoRectangle::new(
            self.lat_lon_from_tile_location(
                location.level,
                location.column as f64,
                location.row as f64,
            ),
            self.lat_lon_from_tile_location(
                location.level,
                location.column as f64 + 1.0,
                location.row as f64 + 1.0,
            ),
        )
    }

    /// All tiles at the base level, south-west first.
    pub fn base_tiles(&self) -> impl Iterator<Item = TileLocation> + '_ {
        let level = self.base_level;
        (0..self.base_rows).flat_map(move |row| {
            (0..self.base_columns).map(move |col| TileLocation::new(level, col, row))
        })
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            base_level: 0,
            base_columns: 2,
            base_rows: 1,
            easting_range: 360.0,
            northing_range: 180.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_grid() -> TileGrid {
        TileGrid {
            base_columns: 2,
            base_rows: 2,
            ..TileGrid::default()
        }
    }

    #[test]
    fn test_tile_count_doubles_per_level() {
        let grid = TileGrid::default();
        assert_eq!(grid.tile_count_at(0), (2, 1));
        assert_eq!(grid.tile_count_at(1), (4, 2));
        assert_eq!(grid.tile_count_at(5), (64, 32));
    }

    #[test]
    fn test_tile_count_above_base_level() {
        let grid = TileGrid {
            base_level: 2,
            base_columns: 8,
            base_rows: 4,
            ..TileGrid::default()
        };
        assert_eq!(grid.tile_count_at(1), (4, 2));
        assert_eq!(grid.tile_count_at(0), (2, 1));
    }

    #[test]
    fn test_tile_rectangle_top_left_base_tile() {
        let grid = quad_grid();
        let rect = grid.tile_rectangle(&TileLocation::new(0, 0, 1));
        assert_eq!(rect.bottom_left, LatLon::new(0.0, -180.0));
        assert_eq!(rect.top_right, LatLon::new(90.0, 0.0));
    }

    #[test]
    fn test_lat_lon_round_trip() {
        let grid = TileGrid::default();
        let point = LatLon::new(37.5, 127.25);
        let f = grid.tile_location_from_lat_lon(7, &point).unwrap();
        let back = grid.lat_lon_from_tile_location(7, f.e, f.n);
        assert!((back.latitude - point.latitude).abs() < 1e-9);
        assert!((back.longitude - point.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_tile_containing_clamps_far_edge() {
        let grid = quad_grid();
        let tile = grid.tile_containing(0, &LatLon::new(90.0, 180.0)).unwrap();
        assert_eq!(tile, TileLocation::new(0, 1, 1));
    }

    #[test]
    fn test_out_of_extent_is_rejected() {
        let grid = TileGrid {
            easting_range: 90.0,
            northing_range: 45.0,
            ..TileGrid::default()
        };
        assert!(matches!(
            grid.tile_location_from_lat_lon(3, &LatLon::new(30.0, 0.0)),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            grid.tile_location_from_lat_lon(3, &LatLon::new(0.0, 50.0)),
            Err(CoordError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_check_out_of_range() {
        let grid = quad_grid();
        assert!(grid.check(&TileLocation::new(1, 3, 3)).is_ok());
        assert!(matches!(
            grid.check(&TileLocation::new(1, 4, 0)),
            Err(CoordError::OutOfRange { columns: 4, .. })
        ));
    }

    #[test]
    fn test_base_tiles_enumerates_grid() {
        let tiles: Vec<_> = quad_grid().base_tiles().collect();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0], TileLocation::new(0, 0, 0));
        assert_eq!(tiles[3], TileLocation::new(0, 1, 1));
    }
}
