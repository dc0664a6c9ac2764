//! Elevation grid data model for DEM terrain processing.
//!
//! This crate owns the input side of the pipeline: a validated 2-D
//! elevation array with a nodata mask and an optional affine
//! transform, plus the [`ElevationSource`] seam that external readers
//! plug into. A bundled SRTM `.hgt` reader lives in [`hgt`].

pub mod hgt;

mod error;

pub use crate::error::GridError;
use geo::geometry::Coord;
use ndarray::{Array2, Array3};
use std::path::Path;

/// Base floating point type used for all elevations and coordinates.
pub type C = f64;

/// Fill value substituted for masked cells in working copies.
pub const FILL_VALUE: C = -9999.0;

/// Default floor below which elevations are treated as nodata.
pub const NODATA_FLOOR: C = -9998.0;

/// Affine transform of a north-up raster.
///
/// Maps pixel indices to geographic (or projected) coordinates:
/// `x = origin.x + col * pixel_width`,
/// `y = origin.y + row * pixel_height`,
/// with `origin` at the upper-left corner and `pixel_height`
/// conventionally negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Upper-left corner of the raster.
    pub origin: Coord<C>,
    /// Cell size along x.
    pub pixel_width: C,
    /// Cell size along y, negative for north-up rasters.
    pub pixel_height: C,
}

impl GeoTransform {
    pub fn new(origin: Coord<C>, pixel_width: C, pixel_height: C) -> Self {
        Self {
            origin,
            pixel_width,
            pixel_height,
        }
    }

    /// Builds from a GDAL-style six-coefficient array. Rotation terms
    /// (indices 2 and 4) are ignored; only north-up rasters are
    /// supported.
    pub fn from_gdal(coeffs: [C; 6]) -> Self {
        Self {
            origin: Coord {
                x: coeffs[0],
                y: coeffs[3],
            },
            pixel_width: coeffs[1],
            pixel_height: coeffs[5],
        }
    }

    /// Nominal square cell size.
    pub fn cell_size(&self) -> C {
        self.pixel_width.abs()
    }

    /// Latitude (y coordinate) of the boundary between rows `row` and
    /// `row + 1`.
    pub fn row_boundary_y(&self, row: usize) -> C {
        #[allow(clippy::cast_precision_loss)]
        let rows_down = (row + 1) as C;
        self.origin.y + rows_down * self.pixel_height
    }
}

/// How nodata cells are recognized.
///
/// Decided once at grid construction; downstream code only ever sees
/// the resulting mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodataPolicy {
    /// Mask cells that are NaN or at/below the given floor.
    Floor(C),
    /// Mask NaN cells only.
    Nan,
    /// No masking.
    None,
}

impl Default for NodataPolicy {
    fn default() -> Self {
        Self::Floor(NODATA_FLOOR)
    }
}

impl NodataPolicy {
    /// Whether `z` is a nodata sample under this policy.
    pub fn is_nodata(&self, z: C) -> bool {
        match *self {
            Self::Floor(floor) => z.is_nan() || z <= floor,
            Self::Nan => z.is_nan(),
            Self::None => false,
        }
    }
}

/// An immutable elevation raster with its validity mask.
///
/// Construction is the only place nodata policy is evaluated; the
/// values array is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    values: Array2<C>,
    mask: Array2<bool>,
    transform: Option<GeoTransform>,
    policy: NodataPolicy,
}

impl ElevationGrid {
    /// Builds a grid from a 2-D elevation array.
    ///
    /// Fails if the array is smaller than 2x2.
    pub fn new(
        values: Array2<C>,
        policy: NodataPolicy,
        transform: Option<GeoTransform>,
    ) -> Result<Self, GridError> {
        let (rows, cols) = values.dim();
        if rows < 2 || cols < 2 {
            return Err(GridError::TooSmall { rows, cols });
        }
        let mask = values.map(|&z| policy.is_nodata(z));
        Ok(Self {
            values,
            mask,
            transform,
            policy,
        })
    }

    /// Builds a grid from a 3-D array with a leading band dimension,
    /// which must be exactly 1.
    pub fn from_bands(
        bands: Array3<C>,
        policy: NodataPolicy,
        transform: Option<GeoTransform>,
    ) -> Result<Self, GridError> {
        let (nbands, rows, cols) = bands.dim();
        if nbands != 1 {
            return Err(GridError::BandCount(nbands));
        }
        let values = bands
            .into_shape((rows, cols))
            .expect("band squeeze preserves element count");
        Self::new(values, policy, transform)
    }

    /// Number of (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn values(&self) -> &Array2<C> {
        &self.values
    }

    /// Validity mask; `true` marks nodata cells.
    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.transform.as_ref()
    }

    pub fn policy(&self) -> NodataPolicy {
        self.policy
    }

    /// Returns a working copy with masked cells replaced by
    /// [`FILL_VALUE`].
    pub fn filled(&self) -> Array2<C> {
        let mut out = self.values.clone();
        for (z, &masked) in out.iter_mut().zip(self.mask.iter()) {
            if masked {
                *z = FILL_VALUE;
            }
        }
        out
    }
}

/// Seam for raster readers.
///
/// Any GDAL-backed (or other) reader satisfies this by returning the
/// elevation array together with its transform and nodata policy.
pub trait ElevationSource {
    fn read(&self, path: &Path) -> Result<ElevationGrid, GridError>;
}

#[cfg(test)]
mod tests {
    use super::{ElevationGrid, GeoTransform, GridError, NodataPolicy, C, FILL_VALUE};
    use geo::geometry::Coord;
    use ndarray::{arr2, Array3};

    #[test]
    fn test_too_small_grid_rejected() {
        let values = arr2(&[[1.0, 2.0]]);
        match ElevationGrid::new(values, NodataPolicy::default(), None) {
            Err(GridError::TooSmall { rows: 1, cols: 2 }) => (),
            other => panic!("expected TooSmall, got {other:?}"),
        }
    }

    #[test]
    fn test_floor_policy_masks_nan_and_floor() {
        let values = arr2(&[[10.0, f64::NAN], [-9999.0, 20.0]]);
        let grid = ElevationGrid::new(values, NodataPolicy::default(), None).unwrap();
        assert_eq!(grid.mask()[(0, 0)], false);
        assert_eq!(grid.mask()[(0, 1)], true);
        assert_eq!(grid.mask()[(1, 0)], true);
        assert_eq!(grid.mask()[(1, 1)], false);

        let filled = grid.filled();
        assert_eq!(filled[(0, 1)], FILL_VALUE);
        assert_eq!(filled[(1, 0)], FILL_VALUE);
        assert_eq!(filled[(1, 1)], 20.0);
    }

    #[test]
    fn test_nan_policy_keeps_deep_values() {
        let values = arr2(&[[10.0, f64::NAN], [-9999.0, 20.0]]);
        let grid = ElevationGrid::new(values, NodataPolicy::Nan, None).unwrap();
        assert_eq!(grid.mask()[(0, 1)], true);
        assert_eq!(grid.mask()[(1, 0)], false);
    }

    #[test]
    fn test_band_squeeze() {
        let bands = Array3::from_shape_fn((1, 3, 4), |(_, r, c)| (r * 4 + c) as C);
        let grid = ElevationGrid::from_bands(bands, NodataPolicy::None, None).unwrap();
        assert_eq!(grid.shape(), (3, 4));
        assert_eq!(grid.values()[(2, 3)], 11.0);
    }

    #[test]
    fn test_multi_band_rejected() {
        let bands = Array3::<C>::zeros((2, 3, 4));
        match ElevationGrid::from_bands(bands, NodataPolicy::None, None) {
            Err(GridError::BandCount(2)) => (),
            other => panic!("expected BandCount, got {other:?}"),
        }
    }

    #[test]
    fn test_transform_row_boundary() {
        let t = GeoTransform::new(Coord { x: -72.0, y: 45.0 }, 1.0 / 1200.0, -1.0 / 1200.0);
        let y = t.row_boundary_y(0);
        assert!((y - (45.0 - 1.0 / 1200.0)).abs() < 1e-12);
        assert_eq!(t.cell_size(), 1.0 / 1200.0);
    }

    #[test]
    fn test_from_gdal_ignores_rotation() {
        let t = GeoTransform::from_gdal([10.0, 30.0, 0.0, 20.0, 0.0, -30.0]);
        assert_eq!(t.origin, Coord { x: 10.0, y: 20.0 });
        assert_eq!(t.pixel_width, 30.0);
        assert_eq!(t.pixel_height, -30.0);
    }
}
