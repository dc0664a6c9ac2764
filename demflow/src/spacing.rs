//! Physical cell spacing derived from a raster's transform.
//!
//! Facet distances use real per-row spacing rather than assuming a
//! square grid, which matters for geographic rasters whose east-west
//! spacing shrinks toward the poles.

use crate::DemflowError;
use demgrid::{GeoTransform, C};

/// Mean earth radius in meters, as used by the geo crate's haversine
/// routines.
const MEAN_EARTH_RADIUS: C = 6_371_008.8;

const METERS_PER_DEG: C = MEAN_EARTH_RADIUS * std::f64::consts::PI / 180.0;

/// Per-row physical distances between adjacent pixel centers.
///
/// `dx[r]`/`dy[r]` give the x/y spacing at the boundary between rows
/// `r` and `r + 1`; both always have length `rows - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingVectors {
    pub dx: Vec<C>,
    pub dy: Vec<C>,
}

impl SpacingVectors {
    /// Constant spacing, the trivial square-pixel case.
    pub fn uniform(cell: C, rows: usize) -> Result<Self, DemflowError> {
        Self::new(vec![cell; rows - 1], vec![cell; rows - 1], rows)
    }

    /// Constant spacing from a projected transform.
    pub fn projected(t: &GeoTransform, rows: usize) -> Result<Self, DemflowError> {
        Self::new(
            vec![t.pixel_width.abs(); rows - 1],
            vec![t.pixel_height.abs(); rows - 1],
            rows,
        )
    }

    /// Latitude-varying spacing from a geographic (degree-unit)
    /// transform, in meters.
    pub fn geographic(t: &GeoTransform, rows: usize) -> Result<Self, DemflowError> {
        let mut dx = Vec::with_capacity(rows - 1);
        let mut dy = Vec::with_capacity(rows - 1);
        for row in 0..rows - 1 {
            let lat = t.row_boundary_y(row).to_radians();
            dx.push(t.pixel_width.abs() * METERS_PER_DEG * lat.cos());
            dy.push(t.pixel_height.abs() * METERS_PER_DEG);
        }
        Self::new(dx, dy, rows)
    }

    /// Explicit spacing vectors.
    ///
    /// Lengths must equal `rows - 1`; values must be finite. Zero
    /// spacing (degenerate geometry, e.g. a polar row) is replaced
    /// with a tiny epsilon instead of producing infinite slopes.
    pub fn new(mut dx: Vec<C>, mut dy: Vec<C>, rows: usize) -> Result<Self, DemflowError> {
        let expected = rows - 1;
        if dx.len() != expected || dy.len() != expected {
            return Err(DemflowError::SpacingLen {
                expected,
                dx_len: dx.len(),
                dy_len: dy.len(),
            });
        }
        for (row, d) in dx.iter_mut().chain(dy.iter_mut()).enumerate() {
            if !d.is_finite() {
                return Err(DemflowError::SpacingValue { row: row % expected });
            }
            if *d == 0.0 {
                *d = C::EPSILON;
            }
        }
        Ok(Self { dx, dy })
    }

    pub fn len(&self) -> usize {
        self.dx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{SpacingVectors, METERS_PER_DEG};
    use crate::DemflowError;
    use approx::assert_relative_eq;
    use demgrid::GeoTransform;
    use geo::geometry::Coord;

    #[test]
    fn test_uniform() {
        let s = SpacingVectors::uniform(30.0, 5).unwrap();
        assert_eq!(s.dx, vec![30.0; 4]);
        assert_eq!(s.dy, vec![30.0; 4]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        match SpacingVectors::new(vec![1.0; 3], vec![1.0; 4], 5) {
            Err(DemflowError::SpacingLen { expected: 4, .. }) => (),
            other => panic!("expected SpacingLen, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(SpacingVectors::new(vec![1.0, f64::NAN], vec![1.0, 1.0], 3).is_err());
    }

    #[test]
    fn test_zero_spacing_replaced() {
        let s = SpacingVectors::new(vec![0.0, 1.0], vec![1.0, 1.0], 3).unwrap();
        assert!(s.dx[0] > 0.0);
    }

    #[test]
    fn test_geographic_shrinks_with_latitude() {
        // One-degree pixels marching south from 60N, so latitude
        // drops as the row index grows.
        let t = GeoTransform::new(Coord { x: 0.0, y: 60.0 }, 1.0, -1.0);
        let s = SpacingVectors::geographic(&t, 31).unwrap();
        // dy is constant, dx shrinks toward the higher-latitude rows
        // at the top of the raster.
        assert_relative_eq!(s.dy[0], METERS_PER_DEG);
        assert_relative_eq!(s.dy[29], METERS_PER_DEG);
        assert!(s.dx[0] < s.dx[29]);
        // Row boundary at 59N.
        assert_relative_eq!(
            s.dx[0],
            METERS_PER_DEG * 59.0_f64.to_radians().cos(),
            max_relative = 1e-12
        );
    }
}
