//! Digital elevation model sampling.
//!
//! A DEM tile is a square grid of `order × order` height samples stored row
//! by row from the northern edge. Queries use normalized tile coordinates
//! where `(0, 0)` is the north-west corner and `(1, 1)` the south-east corner.
//!
//! # Example
//!
//! ```ignore
//! use globetile::dem::{Dem, DemEncoding};
//!
//! let dem = Dem::initialize(DemEncoding::Int16Le, &bytes, 0, false)?;
//! let h = dem.altitude_at(0.5, 0.5);
//! let finer = dem.scale(33, &TileRegion::quadrant(1, 1));
//! ```

mod encoding;

pub use encoding::DemEncoding;

use crate::coord::TileRegion;
use thiserror::Error;

/// Errors produced while decoding a DEM payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemError {
    #[error("DEM payload of {size} bytes is not a whole number of {element_size}-byte samples")]
    PartialSample { size: usize, element_size: usize },

    #[error("DEM payload holds {samples} samples, which is not a square grid")]
    NotSquare { samples: usize },

    #[error("DEM payload holds {samples} samples, expected a {order}x{order} grid")]
    OrderMismatch { order: u32, samples: usize },
}

/// Decoded elevation grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dem {
    order: u32,
    /// Row-major samples, north row first
    samples: Vec<f32>,
}

impl Dem {
    /// Decodes a DEM from raw bytes.
    ///
    /// # Arguments
    ///
    /// * `encoding` - Binary layout of each sample
    /// * `data` - Raw payload
    /// * `grid_order` - Samples per side, or 0 to infer it from the payload size
    /// * `flip_y` - Set when the payload stores the southern row first
    ///
    /// # Returns
    ///
    /// The decoded grid, or an error if the payload is not a square grid of
    /// the given or inferred order. An empty payload decodes to an empty grid.
    pub fn initialize(
        encoding: DemEncoding,
        data: &[u8],
        grid_order: u32,
        flip_y: bool,
    ) -> Result<Dem, DemError> {
        let element_size = encoding.element_size();
        if data.len() % element_size != 0 {
            return Err(DemError::PartialSample {
                size: data.len(),
                element_size,
            });
        }
        let count = data.len() / element_size;

        let order = if grid_order == 0 {
            let side = (count as f64).sqrt().round() as usize;
            if side * side != count {
                return Err(DemError::NotSquare { samples: count });
            }
            side as u32
        } else {
            if (grid_order as usize).pow(2) != count {
                return Err(DemError::OrderMismatch {
                    order: grid_order,
                    samples: count,
                });
            }
            grid_order
        };

        let mut samples = encoding.decode(data);
        if flip_y && order > 1 {
            let side = order as usize;
            let (mut top, mut bottom) = (0, side - 1);
            while top < bottom {
                for x in 0..side {
                    samples.swap(top * side + x, bottom * side + x);
                }
                top += 1;
                bottom -= 1;
            }
        }

        Ok(Dem { order, samples })
    }

    /// Wraps already-decoded samples; `samples.len()` must equal `order²`.
    pub fn from_samples(order: u32, samples: Vec<f32>) -> Result<Dem, DemError> {
        if (order as usize).pow(2) != samples.len() {
            return Err(DemError::OrderMismatch {
                order,
                samples: samples.len(),
            });
        }
        Ok(Dem { order, samples })
    }

    /// Samples per side.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at integer grid position `(x, y)`, clamped to the grid.
    #[inline]
    fn sample(&self, x: usize, y: usize) -> f32 {
        let side = self.order as usize;
        self.samples[y.min(side - 1) * side + x.min(side - 1)]
    }

    /// Bilinearly interpolated altitude at a normalized position.
    ///
    /// Coordinates outside `[0, 1]` are clamped to the grid edge. Grids of
    /// order 0 or 1 return a constant.
    pub fn altitude_at(&self, x: f64, y: f64) -> f32 {
        match self.order {
            0 => return 0.0,
            1 => return self.samples[0],
            _ => {}
        }
        let last = (self.order - 1) as f64;
        let fx = x.clamp(0.0, 1.0) * last;
        let fy = y.clamp(0.0, 1.0) * last;

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let v00 = self.sample(x0, y0);
        let v10 = self.sample(x0 + 1, y0);
        let v01 = self.sample(x0, y0 + 1);
        let v11 = self.sample(x0 + 1, y0 + 1);

        let top = v00 + (v10 - v00) * tx;
        let bottom = v01 + (v11 - v01) * tx;
        top + (bottom - top) * ty
    }

    /// Resamples `region` of this grid to an `output_order × output_order` grid.
    ///
    /// Output samples span the region edge to edge, north row first.
    pub fn scale(&self, output_order: u32, region: &TileRegion) -> Vec<f32> {
        let n = output_order as usize;
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            let c = self.altitude_at(
                region.x + region.width * 0.5,
                region.y + region.height * 0.5,
            );
            return vec![c];
        }
        let step = 1.0 / (n - 1) as f64;
        let mut out = Vec::with_capacity(n * n);
        for j in 0..n {
            let y = region.y + region.height * (j as f64 * step);
            for i in 0..n {
                let x = region.x + region.width * (i as f64 * step);
                out.push(self.altitude_at(x, y));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x3() -> Vec<f32> {
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
    }

    #[test]
    fn test_infers_order_from_size() {
        let bytes = DemEncoding::Float32Le.encode(&grid_3x3());
        let dem = Dem::initialize(DemEncoding::Float32Le, &bytes, 0, false).unwrap();
        assert_eq!(dem.order(), 3);
    }

    #[test]
    fn test_round_trip_all_encodings() {
        let values = grid_3x3();
        for encoding in DemEncoding::ALL {
            let bytes = encoding.encode(&values);
            let dem = Dem::initialize(encoding, &bytes, 0, false).unwrap();
            for j in 0..3 {
                for i in 0..3 {
                    let got = dem.altitude_at(i as f64 / 2.0, j as f64 / 2.0);
                    assert!(
                        (got - values[j * 3 + i]).abs() < 1e-4,
                        "{:?} at ({}, {}): {}",
                        encoding,
                        i,
                        j,
                        got
                    );
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_square_payload() {
        let bytes = DemEncoding::Float32Le.encode(&[1.0; 5]);
        assert_eq!(
            Dem::initialize(DemEncoding::Float32Le, &bytes, 0, false),
            Err(DemError::NotSquare { samples: 5 })
        );
    }

    #[test]
    fn test_rejects_partial_sample() {
        assert!(matches!(
            Dem::initialize(DemEncoding::Int16Be, &[0, 1, 2], 0, false),
            Err(DemError::PartialSample { size: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_order_mismatch() {
        let bytes = DemEncoding::Int16Le.encode(&[0.0; 9]);
        assert_eq!(
            Dem::initialize(DemEncoding::Int16Le, &bytes, 4, false),
            Err(DemError::OrderMismatch {
                order: 4,
                samples: 9
            })
        );
        assert!(Dem::initialize(DemEncoding::Int16Le, &bytes, 3, false).is_ok());
    }

    #[test]
    fn test_corners_are_exact_and_outside_clamps() {
        let dem = Dem::from_samples(3, grid_3x3()).unwrap();
        assert_eq!(dem.altitude_at(0.0, 0.0), 1.0);
        assert_eq!(dem.altitude_at(1.0, 1.0), 9.0);
        assert_eq!(dem.altitude_at(1.0, 0.0), 3.0);
        assert_eq!(dem.altitude_at(-3.0, -0.5), 1.0);
        assert_eq!(dem.altitude_at(2.0, 7.0), 9.0);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let dem = Dem::from_samples(2, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
        assert!((dem.altitude_at(0.5, 0.5) - 15.0).abs() < 1e-6);
        assert!((dem.altitude_at(0.25, 0.0) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_small_grids_are_constant() {
        let empty = Dem::initialize(DemEncoding::Float32Le, &[], 0, false).unwrap();
        assert_eq!(empty.order(), 0);
        assert_eq!(empty.altitude_at(0.3, 0.7), 0.0);

        let single = Dem::from_samples(1, vec![42.0]).unwrap();
        assert_eq!(single.altitude_at(0.0, 0.0), 42.0);
        assert_eq!(single.altitude_at(0.9, 0.1), 42.0);
    }

    #[test]
    fn test_flip_y_reverses_rows() {
        let bytes = DemEncoding::Float32Be.encode(&grid_3x3());
        let dem = Dem::initialize(DemEncoding::Float32Be, &bytes, 0, true).unwrap();
        assert_eq!(dem.samples(), &[7.0, 8.0, 9.0, 4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_scale_full_region_preserves_grid() {
        let dem = Dem::from_samples(3, grid_3x3()).unwrap();
        assert_eq!(dem.scale(3, &TileRegion::FULL), grid_3x3());
    }

    #[test]
    fn test_scale_quadrant() {
        let dem = Dem::from_samples(3, grid_3x3()).unwrap();
        // North-east quadrant spans columns 1..=2 and rows 0..=1
        let ne = dem.scale(2, &TileRegion::quadrant(1, 1));
        assert_eq!(ne, vec![2.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn test_scale_degenerate_orders() {
        let dem = Dem::from_samples(3, grid_3x3()).unwrap();
        assert!(dem.scale(0, &TileRegion::FULL).is_empty());
        assert_eq!(dem.scale(1, &TileRegion::FULL), vec![5.0]);
    }
}
