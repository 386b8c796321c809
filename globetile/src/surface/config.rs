//! Per-surface parameters.

use std::sync::Arc;

use crate::config::ConfigError;
use crate::coord::{TileGrid, TileLocation, MAX_LEVEL};
use crate::dem::DemEncoding;

/// Number of overlay layers a surface composites over its base picture.
pub const LAYER_COUNT: usize = 5;

/// Maps a surface tile location to the location passed to readers and caches.
pub type LocationRemap = Arc<dyn Fn(&TileLocation) -> TileLocation + Send + Sync>;

/// Immutable tiling and mesh parameters of a map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfiguration {
    pub base_level: u32,
    /// Base tile count along easting
    pub base_tile_count_e: u32,
    /// Base tile count along northing
    pub base_tile_count_n: u32,
    /// Levels shallower than this are always expanded
    pub minimum_level: u32,
    pub maximum_level: u32,
    pub easting_range_in_degrees: f64,
    pub northing_range_in_degrees: f64,
    /// Expected pixel width of a tile image
    pub tile_dimension_in_pixels: u32,
    pub minimum_tile_matrix_order: u32,
    pub maximum_tile_matrix_order: u32,
    pub dem_encoding: DemEncoding,
    pub flip_dem_y: bool,
}

impl SurfaceConfiguration {
    /// Tiling grid described by this configuration.
    pub fn grid(&self) -> TileGrid {
        TileGrid {
            base_level: self.base_level,
            base_columns: self.base_tile_count_e,
            base_rows: self.base_tile_count_n,
            easting_range: self.easting_range_in_degrees,
            northing_range: self.northing_range_in_degrees,
        }
    }

    /// Checks that the parameters describe a usable surface.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String| ConfigError::InvalidValue {
            section: "surface".to_string(),
            key: key.to_string(),
            value,
        };

        if self.base_tile_count_e == 0 {
            return Err(invalid("base_tile_count_e", "0".into()));
        }
        if self.base_tile_count_n == 0 {
            return Err(invalid("base_tile_count_n", "0".into()));
        }
        if self.maximum_level > MAX_LEVEL {
            return Err(invalid("maximum_level", self.maximum_level.to_string()));
        }
        if self.base_level > self.maximum_level {
            return Err(invalid("base_level", self.base_level.to_string()));
        }
        if self.minimum_level > self.maximum_level {
            return Err(invalid("minimum_level", self.minimum_level.to_string()));
        }
        if !(self.easting_range_in_degrees > 0.0 && self.easting_range_in_degrees <= 360.0) {
            return Err(invalid(
                "easting_range",
                self.easting_range_in_degrees.to_string(),
            ));
        }
        if !(self.northing_range_in_degrees > 0.0 && self.northing_range_in_degrees <= 180.0) {
            return Err(invalid(
                "northing_range",
                self.northing_range_in_degrees.to_string(),
            ));
        }
        if self.tile_dimension_in_pixels == 0 {
            return Err(invalid("tile_dimension", "0".into()));
        }
        if self.minimum_tile_matrix_order == 0 {
            return Err(invalid("minimum_tile_matrix_order", "0".into()));
        }
        if self.minimum_tile_matrix_order > self.maximum_tile_matrix_order {
            return Err(invalid(
                "minimum_tile_matrix_order",
                self.minimum_tile_matrix_order.to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_base_tile_counts(mut self, e: u32, n: u32) -> Self {
        self.base_tile_count_e = e;
        self.base_tile_count_n = n;
        self
    }

    pub fn with_levels(mut self, base: u32, minimum: u32, maximum: u32) -> Self {
        self.base_level = base;
        self.minimum_level = minimum;
        self.maximum_level = maximum;
        self
    }

    pub fn with_ranges(mut self, easting: f64, northing: f64) -> Self {
        self.easting_range_in_degrees = easting;
        self.northing_range_in_degrees = northing;
        self
    }

    pub fn with_tile_dimension(mut self, pixels: u32) -> Self {
        self.tile_dimension_in_pixels = pixels;
        self
    }

    pub fn with_matrix_orders(mut self, minimum: u32, maximum: u32) -> Self {
        self.minimum_tile_matrix_order = minimum;
        self.maximum_tile_matrix_order = maximum;
        self
    }

    pub fn with_dem(mut self, encoding: DemEncoding, flip_y: bool) -> Self {
        self.dem_encoding = encoding;
        self.flip_dem_y = flip_y;
        self
    }
}

impl Default for SurfaceConfiguration {
    fn default() -> Self {
        Self {
            base_level: 0,
            base_tile_count_e: 2,
            base_tile_count_n: 1,
            minimum_level: 0,
            maximum_level: 18,
            easting_range_in_degrees: 360.0,
            northing_range_in_degrees: 180.0,
            tile_dimension_in_pixels: 256,
            minimum_tile_matrix_order: 8,
            maximum_tile_matrix_order: 32,
            dem_encoding: DemEncoding::Float32Le,
            flip_dem_y: false,
        }
    }
}

/// Tunable thresholds of the expand-or-render decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    /// Multiplies the projected tile size before comparing it with the tile dimension
    pub expansion_factor: f64,
    /// Fraction of the body radius added to the eye altitude to form the distance cutoff
    pub distance_factor: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            expansion_factor: 1.0,
            distance_factor: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SurfaceConfiguration::default().validate().is_ok());
    }

    #[test]
    fn test_grid_from_configuration() {
        let config = SurfaceConfiguration::default().with_base_tile_counts(4, 2);
        let grid = config.grid();
        assert_eq!(grid.tile_count_at(1), (8, 4));
    }

    #[test]
    fn test_validate_rejects_bad_levels() {
        let config = SurfaceConfiguration::default().with_levels(0, 5, 3);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "minimum_level"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_counts_and_orders() {
        let zero_tiles = SurfaceConfiguration::default().with_base_tile_counts(0, 1);
        assert!(zero_tiles.validate().is_err());

        let orders = SurfaceConfiguration::default().with_matrix_orders(16, 8);
        assert!(orders.validate().is_err());

        let range = SurfaceConfiguration::default().with_ranges(0.0, 90.0);
        assert!(range.validate().is_err());
    }
}
