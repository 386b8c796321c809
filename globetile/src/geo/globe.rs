//! Ellipsoidal and spherical reference bodies.

use glam::DVec3;

use super::{GeoLocation, LatLon};

/// WGS84 semi-major axis in meters.
pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;

/// WGS84 semi-minor axis in meters.
pub const WGS84_POLAR_RADIUS: f64 = 6_356_752.314_245;

/// Reference body used to place tiles in Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Globe {
    Ellipsoid {
        equatorial_radius: f64,
        polar_radius: f64,
        inverse_flattening: f64,
        eccentricity_squared: f64,
    },
    Sphere {
        radius: f64,
    },
}

impl Globe {
    /// The WGS84 ellipsoid.
    pub const WGS84: Globe = Globe::Ellipsoid {
        equatorial_radius: WGS84_EQUATORIAL_RADIUS,
        polar_radius: WGS84_POLAR_RADIUS,
        inverse_flattening: 298.257_223_563,
        eccentricity_squared: 0.006_694_379_990_14,
    };

    /// Creates an ellipsoid from its two radii, deriving flattening and eccentricity.
    pub fn ellipsoid(equatorial_radius: f64, polar_radius: f64) -> Self {
        let f = polar_radius / equatorial_radius;
        Globe::Ellipsoid {
            equatorial_radius,
            polar_radius,
            inverse_flattening: 1.0 / (1.0 - f),
            eccentricity_squared: 1.0 - f * f,
        }
    }

    /// Creates a sphere.
    pub fn sphere(radius: f64) -> Self {
        Globe::Sphere { radius }
    }

    pub fn equatorial_radius(&self) -> f64 {
        match *self {
            Globe::Ellipsoid {
                equatorial_radius, ..
            } => equatorial_radius,
            Globe::Sphere { radius } => radius,
        }
    }

    pub fn polar_radius(&self) -> f64 {
        match *self {
            Globe::Ellipsoid { polar_radius, .. } => polar_radius,
            Globe::Sphere { radius } => radius,
        }
    }

    /// Mean radius `(2a + b) / 3`.
    pub fn mean_radius(&self) -> f64 {
        (2.0 * self.equatorial_radius() + self.polar_radius()) / 3.0
    }

    pub fn eccentricity_squared(&self) -> f64 {
        match *self {
            Globe::Ellipsoid {
                eccentricity_squared,
                ..
            } => eccentricity_squared,
            Globe::Sphere { .. } => 0.0,
        }
    }

    /// Outward surface normal at a geographic position.
    pub fn surface_normal(&self, location: &LatLon) -> DVec3 {
        let lat = location.latitude.to_radians();
        let lon = location.longitude.to_radians();
        match *self {
            Globe::Ellipsoid {
                equatorial_radius: a,
                polar_radius: b,
                eccentricity_squared: e2,
                ..
            } => {
                let y = (1.0 - e2) * lat.sin() / (b * b);
                let xz = lat.cos() / (a * a);
                DVec3::new(xz * lon.sin(), y, xz * lon.cos()).normalize()
            }
            Globe::Sphere { .. } => unit_direction(lat, lon),
        }
    }

    /// Outward surface normal at a Cartesian position on or near the surface.
    pub fn surface_normal_at(&self, position: DVec3) -> DVec3 {
        let a2 = self.equatorial_radius().powi(2);
        let b2 = self.polar_radius().powi(2);
        DVec3::new(position.x / a2, position.y / b2, position.z / a2).normalize_or_zero()
    }

    /// Unit tangent pointing north along the local meridian.
    pub fn north_pointing_tangent(&self, location: &LatLon) -> DVec3 {
        let lat = location.latitude.to_radians();
        let lon = location.longitude.to_radians();
        let xz = -lat.sin();
        DVec3::new(xz * lon.sin(), lat.cos(), xz * lon.cos()).normalize()
    }

    /// Converts a geographic location to body-centred Cartesian coordinates.
    pub fn cartesian_position(&self, location: &GeoLocation) -> DVec3 {
        let lat = location.latitude.to_radians();
        let lon = location.longitude.to_radians();
        match *self {
            Globe::Ellipsoid {
                equatorial_radius: a,
                eccentricity_squared: e2,
                ..
            } => {
                let sin_lat = lat.sin();
                // radius of curvature in the prime vertical
                let rv = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
                let y = sin_lat * (rv * (1.0 - e2) + location.altitude);
                let rxz = lat.cos() * (rv + location.altitude);
                DVec3::new(rxz * lon.sin(), y, rxz * lon.cos())
            }
            Globe::Sphere { radius } => unit_direction(lat, lon) * (radius + location.altitude),
        }
    }

    /// Cartesian position of a surface point (altitude 0).
    pub fn surface_position(&self, location: &LatLon) -> DVec3 {
        self.cartesian_position(&GeoLocation::from(*location))
    }

    /// Converts body-centred Cartesian coordinates back to a geographic location.
    pub fn geo_location(&self, position: DVec3) -> GeoLocation {
        match *self {
            Globe::Ellipsoid {
                equatorial_radius,
                eccentricity_squared,
                ..
            } => vermeille(position, equatorial_radius, eccentricity_squared),
            Globe::Sphere { radius } => {
                let r = position.length();
                if r == 0.0 {
                    return GeoLocation::new(0.0, 0.0, -radius);
                }
                let lat = (position.y / r).clamp(-1.0, 1.0).asin();
                let lon = position.x.atan2(position.z);
                GeoLocation::new(lat.to_degrees(), lon.to_degrees(), r - radius)
            }
        }
    }
}

impl Default for Globe {
    fn default() -> Self {
        Globe::WGS84
    }
}

fn unit_direction(lat: f64, lon: f64) -> DVec3 {
    let c = lat.cos();
    DVec3::new(c * lon.sin(), lat.sin(), c * lon.cos())
}

/// Closed-form geocentric to geodetic conversion after H. Vermeille,
/// "An analytical method to transform geocentric into geodetic coordinates".
fn vermeille(position: DVec3, a: f64, e2: f64) -> GeoLocation {
    // Rotate into the conventional ECEF axes (X through lon 0, Z north)
    let x = position.z;
    let y = position.x;
    let z = position.y;
    let xx_yy = x * x + y * y;
    let sqrt_xx_yy = xx_yy.sqrt();

    let ra2 = 1.0 / (a * a);
    let e4 = e2 * e2;

    let p = xx_yy * ra2;
    let q = z * z * (1.0 - e2) * ra2;
    let r = (p + q - e4) / 6.0;

    let evolute_border = 8.0 * r * r * r + e4 * p * q;

    let (h, phi) = if evolute_border > 0.0 || q != 0.0 {
        let u = if evolute_border > 0.0 {
            let rad1 = evolute_border.sqrt();
            let rad2 = (e4 * p * q).sqrt();
            if evolute_border > 10.0 * e2 {
                let rad3 = ((rad1 + rad2) * (rad1 + rad2)).cbrt();
                r + 0.5 * rad3 + 2.0 * r * r / rad3
            } else {
                r + 0.5 * ((rad1 + rad2) * (rad1 + rad2)).cbrt()
                    + 0.5 * ((rad1 - rad2) * (rad1 - rad2)).cbrt()
            }
        } else {
            // near the evolute
            let rad1 = (-evolute_border).sqrt();
            let rad2 = (-8.0 * r * r * r).sqrt();
            let rad3 = (e4 * p * q).sqrt();
            let atan = 2.0 * rad3.atan2(rad1 + rad2) / 3.0;
            -4.0 * r * atan.sin() * (std::f64::consts::FRAC_PI_6 + atan).cos()
        };

        let v = (u * u + e4 * q).sqrt();
        let w = e2 * (u + v - q) / (2.0 * v);
        let k = (u + v) / ((w * w + u + v).sqrt() + w);
        let d = k * sqrt_xx_yy / (k + e2);
        let sqrt_dd_zz = (d * d + z * z).sqrt();

        (
            (k + e2 - 1.0) * sqrt_dd_zz / k,
            2.0 * z.atan2(sqrt_dd_zz + d),
        )
    } else {
        // singular disk around the centre
        let rad1 = (1.0 - e2).sqrt();
        let rad2 = (e2 - p).sqrt();
        let e = e2.sqrt();
        (
            -a * rad1 * rad2 / e,
            2.0 * rad2.atan2(e * rad2 + rad1 * p.sqrt()),
        )
    };

    let s2 = std::f64::consts::SQRT_2;
    let lambda = if (s2 - 1.0) * y < sqrt_xx_yy + x {
        2.0 * y.atan2(sqrt_xx_yy + x)
    } else if sqrt_xx_yy + y < (s2 + 1.0) * x {
        -std::f64::consts::FRAC_PI_2 + 2.0 * x.atan2(sqrt_xx_yy - y)
    } else {
        std::f64::consts::FRAC_PI_2 - 2.0 * x.atan2(sqrt_xx_yy + y)
    };

    GeoLocation::new(phi.to_degrees(), lambda.to_degrees(), h)
}
