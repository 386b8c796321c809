//! Quadtree tile addressing types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Highest zoom level a tile location may carry.
pub const MAX_LEVEL: u32 = 30;

/// Errors that can occur during tile coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),
    #[error("Invalid level: {0} (maximum {MAX_LEVEL})")]
    InvalidLevel(u32),
    #[error("Tile {column},{row} is outside the {columns}x{rows} grid at level {level}")]
    OutOfRange {
        level: u32,
        column: u32,
        row: u32,
        columns: u32,
        rows: u32,
    },
}

// =============================================================================
// Tile Location
// =============================================================================

/// Quadtree coordinate of a tile.
///
/// Children of `(level, c, r)` are `(level + 1, 2c..=2c+1, 2r..=2r+1)`.
/// Row 0 is the southern-most row of the grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TileLocation {
    /// Zoom level
    pub level: u32,
    /// Column index, increasing eastward
    pub column: u32,
    /// Row index, increasing northward
    pub row: u32,
}

impl TileLocation {
    /// Creates a new tile location.
    pub const fn new(level: u32, column: u32, row: u32) -> Self {
        Self { level, column, row }
    }

    /// Returns the parent tile, or `None` at level 0.
    pub fn parent(&self) -> Option<TileLocation> {
        if self.level == 0 {
            return None;
        }
        Some(TileLocation::new(
            self.level - 1,
            self.column >> 1,
            self.row >> 1,
        ))
    }

    /// Returns the four children at `level + 1`.
    ///
    /// Order is south-west, south-east, north-west, north-east.
    pub fn children(&self) -> [TileLocation; 4] {
        let level = self.level + 1;
        let c = self.column << 1;
        let r = self.row << 1;
        [
            TileLocation::new(level, c, r),
            TileLocation::new(level, c + 1, r),
            TileLocation::new(level, c, r + 1),
            TileLocation::new(level, c + 1, r + 1),
        ]
    }

    /// Returns `(dx, dy)`, the position of this tile inside its parent.
    ///
    /// `dx` is 1 for the eastern half and `dy` is 1 for the northern half.
    pub fn quadrant_in_parent(&self) -> (u32, u32) {
        (self.column & 1, self.row & 1)
    }

    /// Returns the ancestor at `level`, or `None` if `level` is deeper than this tile.
    pub fn ancestor_at(&self, level: u32) -> Option<TileLocation> {
        if level > self.level {
            return None;
        }
        let shift = self.level - level;
        Some(TileLocation::new(
            level,
            self.column >> shift,
            self.row >> shift,
        ))
    }
}

impl fmt::Display for TileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.column, self.row)
    }
}

/// Fractional tile position, used when converting geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TileLocationF {
    pub level: u32,
    /// Fractional column
    pub e: f64,
    /// Fractional row
    pub n: f64,
}

impl TileLocationF {
    /// Truncates to the containing integer tile location.
    pub fn floor(&self) -> TileLocation {
        TileLocation::new(
            self.level,
            self.e.max(0.0).floor() as u32,
            self.n.max(0.0).floor() as u32,
        )
    }
}

// =============================================================================
// Tile Address
// =============================================================================

/// Cache and loader key: a tile location plus an optional resource sub-path.
///
/// Equality and ordering compare the location first and then the sub-path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TileAddress {
    pub location: TileLocation,
    pub sub_path: Option<String>,
}

impl TileAddress {
    /// Creates an address with no sub-path.
    pub fn new(location: TileLocation) -> Self {
        Self {
            location,
            sub_path: None,
        }
    }

    /// Creates an address qualified by a sub-path.
    pub fn with_sub_path(location: TileLocation, sub_path: impl Into<String>) -> Self {
        Self {
            location,
            sub_path: Some(sub_path.into()),
        }
    }
}

impl From<TileLocation> for TileAddress {
    fn from(location: TileLocation) -> Self {
        TileAddress::new(location)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_path {
            Some(sub) => write!(f, "{}/{}", self.location, sub),
            None => write!(f, "{}", self.location),
        }
    }
}

// =============================================================================
// Tile Region
// =============================================================================

/// Normalized sub-rectangle of a tile's image or DEM.
///
/// `y = 0` is the northern edge, matching image row order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TileRegion {
    /// The whole tile.
    pub const FULL: TileRegion = TileRegion {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region a child occupies in its parent, from `quadrant_in_parent`.
    pub fn quadrant(dx: u32, dy: u32) -> TileRegion {
        TileRegion::new(
            dx as f64 * 0.5,
            (1 - dy.min(1)) as f64 * 0.5,
            0.5,
            0.5,
        )
    }

    /// Maps `inner`, expressed relative to this region, into this region's parent space.
    pub fn sub_region(&self, inner: &TileRegion) -> TileRegion {
        TileRegion::new(
            self.x + inner.x * self.width,
            self.y + inner.y * self.height,
            inner.width * self.width,
            inner.height * self.height,
        )
    }

    /// True if this region covers the whole tile.
    pub fn is_full(&self) -> bool {
        *self == TileRegion::FULL
    }
}

impl Default for TileRegion {
    fn default() -> Self {
        TileRegion::FULL
    }
}
