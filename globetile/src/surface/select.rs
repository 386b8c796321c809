//! Quadtree level-of-detail selection.
//!
//! Selection is a pure function of the surface configuration and a camera
//! snapshot. Every base tile is visited and recursively classified:
//!
//! ```text
//!   visit(node)
//!     ├── culled  (outside frustum, facing away, or entirely behind the eye)
//!     ├── leaf    (rendered at this level)
//!     └── expand  → visit(child) for each of the four children
//! ```
//!
//! A node expands while it is shallower than the minimum level, or while it
//! is shallower than the maximum level, close enough to the eye and either
//! straddles the near plane or covers more pixels than a tile image holds.

use glam::DVec3;
use tracing::trace;

use super::camera::ViewState;
use super::config::{SelectionPolicy, SurfaceConfiguration};
use crate::coord::{TileGrid, TileLocation};
use crate::geo::{GeoRectangle, Globe, LatLon};

/// Samples per side of the grid used for visibility tests.
const SAMPLES: usize = 3;

/// Cartesian outline of a tile on the reference body.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGeometry {
    pub rectangle: GeoRectangle,
    /// South-west, south-east, north-west, north-east
    pub corners: [DVec3; 4],
    pub center: DVec3,
    /// Sample points row by row from the south edge, corners included
    samples: [DVec3; SAMPLES * SAMPLES],
    normals: [DVec3; SAMPLES * SAMPLES],
}

impl TileGeometry {
    /// Computes the geometry of `location` on `globe`.
    pub fn new(grid: &TileGrid, globe: &Globe, location: &TileLocation) -> Self {
        let rectangle = grid.tile_rectangle(location);
        let south = rectangle.bottom_left.latitude;
        let west = rectangle.bottom_left.longitude;
        let height = rectangle.top_right.latitude - south;
        let width = rectangle.top_right.longitude - west;

        let mut samples = [DVec3::ZERO; SAMPLES * SAMPLES];
        let mut normals = [DVec3::ZERO; SAMPLES * SAMPLES];
        let step = 1.0 / (SAMPLES - 1) as f64;
        for j in 0..SAMPLES {
            for i in 0..SAMPLES {
                let at = LatLon::new(
                    south + height * step * j as f64,
                    west + width * step * i as f64,
                );
                samples[j * SAMPLES + i] = globe.surface_position(&at);
                normals[j * SAMPLES + i] = globe.surface_normal(&at);
            }
        }

        let last = SAMPLES - 1;
        let corners = [
            samples[0],
            samples[last],
            samples[last * SAMPLES],
            samples[last * SAMPLES + last],
        ];
        let center = globe.surface_position(&rectangle.center());

        Self {
            rectangle,
            corners,
            center,
            samples,
            normals,
        }
    }

    /// True if no sample faces the eye.
    pub fn is_back_facing(&self, eye: DVec3) -> bool {
        !self
            .samples
            .iter()
            .zip(self.normals.iter())
            .any(|(p, n)| n.dot(eye - *p) > 0.0)
    }

    /// Classifies the tile for a camera, ignoring level limits.
    pub fn visibility(&self, view: &ViewState) -> Visibility {
        if view.all_outside_one_plane(&self.samples) || self.is_back_facing(view.eye) {
            return Visibility::Hidden;
        }

        let projected: Vec<Option<(f64, f64)>> = self
            .samples
            .iter()
            .map(|p| view.project_width_scaled(*p))
            .collect();
        let behind = projected.iter().filter(|p| p.is_none()).count();
        if behind == projected.len() {
            return Visibility::Hidden;
        }
        if behind > 0 {
            return Visibility::Straddling;
        }

        let point = |i: usize, j: usize| projected[j * SAMPLES + i].unwrap_or_default();
        let mut area = 0.0;
        for j in 0..SAMPLES - 1 {
            for i in 0..SAMPLES - 1 {
                let sw = point(i, j);
                let se = point(i + 1, j);
                let nw = point(i, j + 1);
                let ne = point(i + 1, j + 1);
                area += triangle_area(nw, sw, ne) + triangle_area(ne, sw, se);
            }
        }
        Visibility::Visible {
            screen_size: area.sqrt(),
        }
    }
}

/// How a tile appears from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    Hidden,
    /// Part of the tile lies behind the eye
    Straddling,
    /// Square root of the projected area in pixels
    Visible { screen_size: f64 },
}

fn triangle_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs() * 0.5
}

/// Outcome of visiting one quadtree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDecision {
    Culled,
    Leaf,
    Expand,
}

/// Decides what to do with one node.
///
/// # Arguments
///
/// * `config` - Surface parameters (level limits and tile dimension)
/// * `policy` - Expansion heuristics
/// * `globe` - Reference body, for the distance cutoff
/// * `view` - Camera snapshot
/// * `location` - The node
/// * `geometry` - Geometry of `location`
pub fn decide(
    config: &SurfaceConfiguration,
    policy: &SelectionPolicy,
    globe: &Globe,
    view: &ViewState,
    location: &TileLocation,
    geometry: &TileGeometry,
) -> NodeDecision {
    let visibility = geometry.visibility(view);
    if visibility == Visibility::Hidden {
        return NodeDecision::Culled;
    }
    if location.level >= config.maximum_level {
        return NodeDecision::Leaf;
    }
    if location.level < config.minimum_level {
        return NodeDecision::Expand;
    }

    let cutoff = view.altitude().max(0.0) + globe.equatorial_radius() * policy.distance_factor;
    if view.eye.distance(geometry.center) >= cutoff {
        return NodeDecision::Leaf;
    }

    match visibility {
        Visibility::Straddling => NodeDecision::Expand,
        Visibility::Visible { screen_size }
            if screen_size * policy.expansion_factor
                > config.tile_dimension_in_pixels as f64 =>
        {
            NodeDecision::Expand
        }
        _ => NodeDecision::Leaf,
    }
}

/// Selects the tiles to render for one frame.
///
/// # Returns
///
/// Leaf locations in depth-first order, base tiles in row-major order.
pub fn select_tiles(
    config: &SurfaceConfiguration,
    globe: &Globe,
    policy: &SelectionPolicy,
    view: &ViewState,
) -> Vec<TileLocation> {
    let grid = config.grid();
    let mut leaves = Vec::new();
    for base in grid.base_tiles() {
        visit(config, &grid, globe, policy, view, base, &mut leaves);
    }
    leaves
}

fn visit(
    config: &SurfaceConfiguration,
    grid: &TileGrid,
    globe: &Globe,
    policy: &SelectionPolicy,
    view: &ViewState,
    location: TileLocation,
    leaves: &mut Vec<TileLocation>,
) {
    let geometry = TileGeometry::new(grid, globe, &location);
    let decision = decide(config, policy, globe, view, &location, &geometry);
    trace!(tile = %location, ?decision, "visit");
    match decision {
        NodeDecision::Culled => {}
        NodeDecision::Leaf => leaves.push(location),
        NodeDecision::Expand => {
            for child in location.children() {
                visit(config, grid, globe, policy, view, child, leaves);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;
    use crate::surface::camera::Viewport;

    const RADIUS: f64 = 1_000_000.0;

    fn view_from(lat: f64, lon: f64, altitude: f64) -> (Globe, ViewState) {
        let globe = Globe::sphere(RADIUS);
        let view = ViewState::looking_at_center(
            &globe,
            GeoLocation::new(lat, lon, altitude),
            60f64.to_radians(),
            Viewport::new(1024.0, 768.0),
        );
        (globe, view)
    }

    fn quad_config(maximum_level: u32) -> SurfaceConfiguration {
        SurfaceConfiguration::default()
            .with_base_tile_counts(2, 2)
            .with_levels(0, 0, maximum_level)
    }

    #[test]
    fn test_geometry_corners_follow_rectangle() {
        let globe = Globe::sphere(1.0);
        let config = quad_config(0);
        let geometry = TileGeometry::new(&config.grid(), &globe, &TileLocation::new(0, 1, 0));
        // South-east base tile: lat -90..0, lon 0..180
        let ne = globe.surface_position(&LatLon::new(0.0, 180.0));
        assert!((geometry.corners[3] - ne).length() < 1e-12);
        let center = globe.surface_position(&LatLon::new(-45.0, 90.0));
        assert!((geometry.center - center).length() < 1e-12);
    }

    #[test]
    fn test_far_side_tile_is_back_facing() {
        let (globe, view) = view_from(45.0, -90.0, RADIUS);
        let config = quad_config(0);
        let far = TileGeometry::new(&config.grid(), &globe, &TileLocation::new(0, 1, 0));
        assert!(far.is_back_facing(view.eye));
        let near = TileGeometry::new(&config.grid(), &globe, &TileLocation::new(0, 0, 1));
        assert!(!near.is_back_facing(view.eye));
    }

    #[test]
    fn test_maximum_level_stops_expansion() {
        let (globe, view) = view_from(0.0, 0.0, 3.0 * RADIUS);
        let leaves = select_tiles(&quad_config(0), &globe, &SelectionPolicy::default(), &view);
        assert_eq!(leaves.len(), 4);
        assert!(leaves.iter().all(|l| l.level == 0));
    }

    #[test]
    fn test_minimum_level_forces_expansion() {
        let (globe, view) = view_from(0.0, 0.0, 3.0 * RADIUS);
        let config = quad_config(4).with_levels(0, 1, 4);
        let leaves = select_tiles(&config, &globe, &SelectionPolicy::default(), &view);
        assert!(!leaves.is_empty());
        assert!(leaves.iter().all(|l| l.level >= 1));
    }

    #[test]
    fn test_close_camera_refines_below_it() {
        let (globe, view) = view_from(10.0, 10.0, RADIUS * 0.05);
        let config = quad_config(6).with_base_tile_counts(8, 4);
        let leaves = select_tiles(&config, &globe, &SelectionPolicy::default(), &view);
        let grid = config.grid();
        let under = LatLon::new(10.0, 10.0);
        let deepest = leaves
            .iter()
            .filter(|l| grid.tile_rectangle(l).contains(&under))
            .map(|l| l.level)
            .max()
            .unwrap();
        assert!(deepest >= 3, "deepest leaf under the eye is level {}", deepest);
    }

    #[test]
    fn test_leaves_never_overlap() {
        let (globe, view) = view_from(30.0, 60.0, RADIUS * 0.3);
        let leaves = select_tiles(&quad_config(5), &globe, &SelectionPolicy::default(), &view);
        for a in &leaves {
            for b in &leaves {
                if a.level < b.level {
                    assert_ne!(b.ancestor_at(a.level), Some(*a));
                }
            }
        }
    }
}
