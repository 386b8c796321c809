//! Renderable surface patches.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;

use super::config::SurfaceConfiguration;
use super::imagery::TileDem;
use super::select::TileGeometry;
use crate::coord::TileLocation;
use crate::geo::{GeoLocation, GeoRectangle, Globe};

/// Vertex layout uploaded to the render engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    /// Position relative to [`TileMesh::origin`]
    pub position: [f32; 3],
    /// Normalized tile coordinates, `(0, 0)` at the north-west corner
    pub tex_coord: [f32; 2],
}

/// Triangle grid covering one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMesh {
    /// Vertex positions are stored relative to this point to keep f32 precision
    pub origin: DVec3,
    /// Cells per side
    pub order: u32,
    pub vertices: Vec<TileVertex>,
    pub indices: Vec<u32>,
}

impl TileMesh {
    /// Builds an `order × order` cell grid over `rectangle`.
    ///
    /// # Arguments
    ///
    /// * `globe` - Reference body
    /// * `rectangle` - Geographic extent of the tile
    /// * `order` - Cells per side, at least 1
    /// * `heights` - `(order + 1)²` altitudes, north row first, or `None` for a flat patch
    pub fn build(
        globe: &Globe,
        rectangle: &GeoRectangle,
        origin: DVec3,
        order: u32,
        heights: Option<&[f32]>,
    ) -> Self {
        let n = order.max(1) as usize;
        let side = n + 1;
        let north = rectangle.top_right.latitude;
        let west = rectangle.bottom_left.longitude;
        let height = north - rectangle.bottom_left.latitude;
        let width = rectangle.top_right.longitude - west;
        let heights = heights.filter(|h| h.len() == side * side);

        let mut vertices = Vec::with_capacity(side * side);
        for j in 0..side {
            let v = j as f64 / n as f64;
            for i in 0..side {
                let u = i as f64 / n as f64;
                let altitude = heights.map_or(0.0, |h| h[j * side + i] as f64);
                let p = globe.cartesian_position(&GeoLocation::new(
                    north - v * height,
                    west + u * width,
                    altitude,
                ));
                vertices.push(TileVertex {
                    position: (p - origin).as_vec3().to_array(),
                    tex_coord: [u as f32, v as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity(n * n * 6);
        for j in 0..n {
            for i in 0..n {
                let tl = (j * side + i) as u32;
                let tr = tl + 1;
                let bl = tl + side as u32;
                let br = bl + 1;
                indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
            }
        }

        Self {
            origin,
            order: n as u32,
            vertices,
            indices,
        }
    }

    /// Number of indices to draw.
    pub fn element_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Mesh grid order for a tile.
///
/// One cell per DEM sample interval, clamped to the configured range; the
/// minimum order when there is no DEM.
pub fn matrix_order(config: &SurfaceConfiguration, dem: Option<&TileDem>) -> u32 {
    let min = config.minimum_tile_matrix_order.max(1);
    let max = config.maximum_tile_matrix_order.max(min);
    match dem {
        Some(d) => d.dem.order().saturating_sub(1).clamp(min, max),
        None => min,
    }
}

/// A selected tile with its geometry and mesh.
#[derive(Debug, Clone)]
pub struct SurfaceTile {
    pub location: TileLocation,
    pub geometry: TileGeometry,
    pub mesh: Arc<TileMesh>,
    /// Elevation the mesh was built from
    pub dem: Option<TileDem>,
}

impl SurfaceTile {
    /// Builds the mesh for `location`, displaced by `dem` if present.
    pub fn build(
        config: &SurfaceConfiguration,
        globe: &Globe,
        location: TileLocation,
        geometry: TileGeometry,
        dem: Option<TileDem>,
    ) -> Self {
        let order = matrix_order(config, dem.as_ref());
        let heights = dem.as_ref().map(|d| d.dem.scale(order + 1, &d.region));
        let mesh = TileMesh::build(
            globe,
            &geometry.rectangle,
            geometry.center,
            order,
            heights.as_deref(),
        );
        tracing::trace!(tile = %location, order, has_dem = dem.is_some(), "Built tile mesh");
        Self {
            location,
            geometry,
            mesh: Arc::new(mesh),
            dem,
        }
    }

    /// True if the mesh was built from `dem`.
    pub fn is_built_from(&self, dem: Option<&TileDem>) -> bool {
        match (&self.dem, dem) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_source(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileRegion;
    use crate::dem::Dem;

    fn config() -> SurfaceConfiguration {
        SurfaceConfiguration::default()
            .with_base_tile_counts(2, 2)
            .with_matrix_orders(2, 16)
    }

    fn geometry(globe: &Globe, location: &TileLocation) -> TileGeometry {
        TileGeometry::new(&config().grid(), globe, location)
    }

    fn flat_dem(order: u32, altitude: f32) -> TileDem {
        let dem = Dem::from_samples(order, vec![altitude; (order * order) as usize]).unwrap();
        TileDem {
            dem: Arc::new(dem),
            region: TileRegion::FULL,
            source: TileLocation::new(0, 0, 0),
            partial: false,
        }
    }

    #[test]
    fn test_mesh_counts() {
        let globe = Globe::sphere(1000.0);
        let location = TileLocation::new(0, 0, 0);
        let tile = SurfaceTile::build(&config(), &globe, location, geometry(&globe, &location), None);
        assert_eq!(tile.mesh.order, 2);
        assert_eq!(tile.mesh.vertices.len(), 9);
        assert_eq!(tile.mesh.element_count(), 24);
        assert_eq!(tile.mesh.vertex_bytes().len(), 9 * 20);
        assert!(tile.mesh.indices.iter().all(|&i| (i as usize) < 9));
    }

    #[test]
    fn test_matrix_order_follows_dem() {
        let c = config();
        assert_eq!(matrix_order(&c, None), 2);
        assert_eq!(matrix_order(&c, Some(&flat_dem(9, 0.0))), 8);
        assert_eq!(matrix_order(&c, Some(&flat_dem(65, 0.0))), 16);
        assert_eq!(matrix_order(&c, Some(&flat_dem(1, 0.0))), 2);
    }

    #[test]
    fn test_dem_displaces_vertices() {
        let globe = Globe::sphere(1000.0);
        let location = TileLocation::new(0, 1, 1);
        let geometry = geometry(&globe, &location);
        let tile = SurfaceTile::build(&config(), &globe, location, geometry, Some(flat_dem(3, 50.0)));
        for v in &tile.mesh.vertices {
            let p = tile.mesh.origin + glam::Vec3::from(v.position).as_dvec3();
            assert!((p.length() - 1050.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_first_vertex_is_north_west() {
        let globe = Globe::sphere(1000.0);
        let location = TileLocation::new(0, 1, 1);
        let geometry = geometry(&globe, &location);
        let nw = geometry.corners[2];
        let tile = SurfaceTile::build(&config(), &globe, location, geometry, None);
        let first = tile.mesh.origin + glam::Vec3::from(tile.mesh.vertices[0].position).as_dvec3();
        assert!((first - nw).length() < 1e-3);
        assert_eq!(tile.mesh.vertices[0].tex_coord, [0.0, 0.0]);
    }

    #[test]
    fn test_triangles_face_outward() {
        let globe = Globe::sphere(1000.0);
        // Away from the poles, where rows collapse to a point
        let location = TileLocation::new(1, 2, 2);
        let tile = SurfaceTile::build(&config(), &globe, location, geometry(&globe, &location), None);
        let mesh = &tile.mesh;
        let at = |i: u32| mesh.origin + glam::Vec3::from(mesh.vertices[i as usize].position).as_dvec3();
        for tri in mesh.indices.chunks(3) {
            let (a, b, c) = (at(tri[0]), at(tri[1]), at(tri[2]));
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a + b + c) > 0.0, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn test_rebuild_detection() {
        let globe = Globe::sphere(1000.0);
        let location = TileLocation::new(0, 0, 0);
        let dem = flat_dem(3, 1.0);
        let tile = SurfaceTile::build(&config(), &globe, location, geometry(&globe, &location), Some(dem.clone()));
        assert!(tile.is_built_from(Some(&dem)));
        assert!(!tile.is_built_from(None));
        assert!(!tile.is_built_from(Some(&flat_dem(3, 1.0))));
    }
}
