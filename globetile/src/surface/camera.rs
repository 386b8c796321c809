//! Immutable camera snapshot used by tile selection.

use glam::{DMat4, DVec3, DVec4};

use crate::geo::{GeoLocation, Globe};

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Camera state for one frame.
///
/// The projection maps view depth to `[0, 1]` as produced by
/// [`DMat4::perspective_rh`].
#[derive(Debug, Clone)]
pub struct ViewState {
    pub view: DMat4,
    pub projection: DMat4,
    pub view_projection: DMat4,
    pub viewport: Viewport,
    /// Eye position in body-centred coordinates
    pub eye: DVec3,
    /// Eye position as latitude, longitude and altitude
    pub eye_location: GeoLocation,
    /// Left, right, bottom, top, near, far; inside is `plane · (p, 1) >= 0`
    planes: [DVec4; 6],
}

impl ViewState {
    /// Builds a snapshot from explicit view and projection matrices.
    pub fn new(view: DMat4, projection: DMat4, viewport: Viewport, globe: &Globe) -> Self {
        let view_projection = projection * view;
        let eye = view.inverse().transform_point3(DVec3::ZERO);
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        Self {
            view,
            projection,
            view_projection,
            viewport,
            eye,
            eye_location: globe.geo_location(eye),
            planes,
        }
    }

    /// Camera at `eye` looking at the centre of the body with north up.
    ///
    /// # Arguments
    ///
    /// * `globe` - Reference body
    /// * `eye` - Camera position
    /// * `fov_y` - Vertical field of view in radians
    /// * `viewport` - Viewport size in pixels
    pub fn looking_at_center(globe: &Globe, eye: GeoLocation, fov_y: f64, viewport: Viewport) -> Self {
        let position = globe.cartesian_position(&eye);
        let up = globe.north_pointing_tangent(&eye.lat_lon());
        let view = DMat4::look_at_rh(position, DVec3::ZERO, up);
        let altitude = eye.altitude.max(1.0);
        let near = altitude * 0.01;
        let far = position.length() + globe.equatorial_radius();
        let projection = DMat4::perspective_rh(fov_y, viewport.aspect(), near, far);
        Self::new(view, projection, viewport, globe)
    }

    /// Altitude of the eye above the surface.
    pub fn altitude(&self) -> f64 {
        self.eye_location.altitude
    }

    /// True if all `points` lie outside one frustum plane.
    pub fn all_outside_one_plane(&self, points: &[DVec3]) -> bool {
        self.planes.iter().any(|plane| {
            points
                .iter()
                .all(|p| plane.dot(p.extend(1.0)) < 0.0)
        })
    }

    /// Clip-space position of a world point.
    pub fn clip(&self, point: DVec3) -> DVec4 {
        self.view_projection * point.extend(1.0)
    }

    /// Projects a world point to pixels, or `None` if it is behind the near plane.
    ///
    /// Both axes are scaled by the viewport width, origin at the viewport centre.
    pub fn project_width_scaled(&self, point: DVec3) -> Option<(f64, f64)> {
        let clip = self.clip(point);
        if clip.w <= 0.0 || clip.z < 0.0 {
            return None;
        }
        let half = self.viewport.width * 0.5;
        Some((clip.x / clip.w * half, clip.y / clip.w * half))
    }
}
