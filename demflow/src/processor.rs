//! Orchestration of the slope/direction pipeline.

use crate::{
    chunk::{self, Chunk},
    facet, flats,
    spacing::SpacingVectors,
    DemflowError, FLAT_SENTINEL,
};
use demgrid::{ElevationGrid, C};
use log::debug;
use ndarray::{s, Array2};
use rayon::prelude::*;

/// Nominal chunk side, halo excluded.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Halo width. Has to be greater than 1 to keep flat extension free
/// of chunk-edge artifacts.
pub const DEFAULT_CHUNK_OVERLAP: usize = 4;

/// Full-grid result arrays, all grid-shaped.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeField {
    /// Steepest descent in elevation units per distance unit;
    /// [`FLAT_SENTINEL`] where unresolved.
    pub magnitude: Array2<C>,
    /// Flow direction in radians, `[0, 2pi)`, east = 0,
    /// counterclockwise; [`FLAT_SENTINEL`] where flat.
    pub direction: Array2<C>,
    /// True where a pixel belongs to a flat region or its
    /// equal-elevation ring.
    pub flats: Array2<bool>,
}

/// Computes slope magnitude and D-infinity flow direction for one
/// elevation grid.
///
/// Owns the grid and a working copy with masked cells replaced by the
/// fill value for the duration of a run; results are always returned
/// whole, never partially populated.
#[derive(Debug)]
pub struct DemProcessor {
    grid: ElevationGrid,
    data: Array2<C>,
    spacing: SpacingVectors,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DemProcessor {
    /// Builds a processor from a grid and explicit spacing vectors.
    ///
    /// Spacing length must be `rows - 1`.
    pub fn new(grid: ElevationGrid, spacing: SpacingVectors) -> Result<Self, DemflowError> {
        let (rows, _) = grid.shape();
        if spacing.len() != rows - 1 {
            return Err(DemflowError::SpacingLen {
                expected: rows - 1,
                dx_len: spacing.dx.len(),
                dy_len: spacing.dy.len(),
            });
        }
        let data = grid.filled();
        Ok(Self {
            grid,
            data,
            spacing,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        })
    }

    /// Uniform square spacing, the trivial case.
    pub fn with_uniform_spacing(grid: ElevationGrid, cell: C) -> Result<Self, DemflowError> {
        let spacing = SpacingVectors::uniform(cell, grid.shape().0)?;
        Self::new(grid, spacing)
    }

    /// Constant spacing taken from the grid's projected transform.
    pub fn with_projected_spacing(grid: ElevationGrid) -> Result<Self, DemflowError> {
        let t = grid.transform().ok_or(DemflowError::MissingTransform)?;
        let spacing = SpacingVectors::projected(t, grid.shape().0)?;
        Self::new(grid, spacing)
    }

    /// Latitude-varying spacing from the grid's geographic transform.
    pub fn with_geographic_spacing(grid: ElevationGrid) -> Result<Self, DemflowError> {
        let t = grid.transform().ok_or(DemflowError::MissingTransform)?;
        let spacing = SpacingVectors::geographic(t, grid.shape().0)?;
        Self::new(grid, spacing)
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }

    /// Computes magnitude, direction and flats, chunk by chunk.
    ///
    /// Grids within the chunk size run in a single pass; larger grids
    /// are split into overlapping chunks whose trimmed interiors are
    /// stitched back seamlessly. Output is identical for any chunk
    /// size, since no interior result depends on anything beyond halo
    /// distance.
    pub fn compute(&self) -> Result<SlopeField, DemflowError> {
        self.run(false)
    }

    /// Same as [`compute`](Self::compute), processing chunks on a
    /// rayon pool. Chunk interiors are write-disjoint, so stitching
    /// after the parallel map yields bit-identical results.
    pub fn compute_parallel(&self) -> Result<SlopeField, DemflowError> {
        self.run(true)
    }
}

/// Private API.
impl DemProcessor {
    fn run(&self, parallel: bool) -> Result<SlopeField, DemflowError> {
        if self.chunk_overlap <= 1 {
            return Err(DemflowError::Overlap(self.chunk_overlap));
        }
        let (rows, cols) = self.data.dim();
        let chunks = chunk::plan(rows, cols, self.chunk_size, self.chunk_overlap);
        debug!(
            "slope/direction run: {rows}x{cols} grid, {} chunk(s), parallel: {parallel}",
            chunks.len()
        );

        let mut field = SlopeField {
            magnitude: Array2::from_elem((rows, cols), FLAT_SENTINEL),
            direction: Array2::from_elem((rows, cols), FLAT_SENTINEL),
            flats: Array2::from_elem((rows, cols), false),
        };

        if parallel {
            let parts: Vec<_> = chunks
                .par_iter()
                .map(|c| (*c, self.run_chunk(c)))
                .collect();
            for (c, (mag, dir, flat)) in &parts {
                chunk::stitch(&mut field.magnitude, mag, c);
                chunk::stitch(&mut field.direction, dir, c);
                chunk::stitch(&mut field.flats, flat, c);
            }
        } else {
            for c in &chunks {
                let (mag, dir, flat) = self.run_chunk(c);
                chunk::stitch(&mut field.magnitude, &mag, c);
                chunk::stitch(&mut field.direction, &dir, c);
                chunk::stitch(&mut field.flats, &flat, c);
            }
        }

        Ok(field)
    }

    /// Solves one chunk, halo included, and applies the flat sentinel.
    fn run_chunk(&self, c: &Chunk) -> (Array2<C>, Array2<C>, Array2<bool>) {
        let data = self.data.slice(s![c.top..c.bottom, c.left..c.right]);
        let mask = self.grid.mask().slice(s![c.top..c.bottom, c.left..c.right]);
        let spacing = SpacingVectors {
            dx: self.spacing.dx[c.top..c.bottom - 1].to_vec(),
            dy: self.spacing.dy[c.top..c.bottom - 1].to_vec(),
        };

        let (mut mag, mut dir) = facet::slopes_directions(data, &spacing);
        let flat = flats::find_flats(data, mask, &mag);
        for ((m, d), &f) in mag.iter_mut().zip(dir.iter_mut()).zip(flat.iter()) {
            if f {
                *m = FLAT_SENTINEL;
                *d = FLAT_SENTINEL;
            }
        }
        debug!(
            "chunk [{}:{}, {}:{}] done",
            c.top, c.bottom, c.left, c.right
        );
        (mag, dir, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::{DemProcessor, SlopeField};
    use crate::{DemflowError, FLAT_SENTINEL};
    use demgrid::{ElevationGrid, NodataPolicy};
    use ndarray::Array2;
    use std::f64::consts::TAU;

    fn grid_from(data: Array2<f64>) -> ElevationGrid {
        ElevationGrid::new(data, NodataPolicy::default(), None).unwrap()
    }

    /// Smooth rolling terrain with isolated pits.
    fn rolling(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            (r as f64 * 0.31).sin() * 17.0 + (c as f64 * 0.17).cos() * 23.0 + (r + c) as f64 * 0.05
        })
    }

    fn compute(data: Array2<f64>, chunk_size: usize) -> SlopeField {
        DemProcessor::with_uniform_spacing(grid_from(data), 30.0)
            .unwrap()
            .chunk_size(chunk_size)
            .compute()
            .unwrap()
    }

    #[test]
    fn test_chunked_matches_single_shot() {
        let _ = env_logger::builder().is_test(true).try_init();
        let data = rolling(61, 47);
        let single = compute(data.clone(), 512);
        // 3 is below the halo width and exercises the planner clamp.
        for chunk_size in [3, 16, 30, 47] {
            let chunked = compute(data.clone(), chunk_size);
            assert_eq!(single, chunked, "chunk_size = {chunk_size}");
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = rolling(61, 47);
        let processor = DemProcessor::with_uniform_spacing(grid_from(data), 30.0)
            .unwrap()
            .chunk_size(16);
        assert_eq!(processor.compute().unwrap(), processor.compute_parallel().unwrap());
    }

    #[test]
    fn test_all_flat_grid() {
        let field = compute(Array2::from_elem((4, 4), 50.0), 512);
        assert!(field.flats.iter().all(|&f| f));
        assert!(field.magnitude.iter().all(|&m| m == FLAT_SENTINEL));
        assert!(field.direction.iter().all(|&d| d == FLAT_SENTINEL));
    }

    #[test]
    fn test_flat_block_in_bowl() {
        // Chebyshev bowl with a 3x3 floor: exactly the floor is flat.
        let mut data = Array2::from_shape_fn((7, 7), |(r, c)| {
            (r as f64 - 3.0).abs().max((c as f64 - 3.0).abs())
        });
        for r in 2..=4 {
            for c in 2..=4 {
                data[(r, c)] = 0.0;
            }
        }
        let field = compute(data, 512);
        for r in 0..7 {
            for c in 0..7 {
                let floor = (2..=4).contains(&r) && (2..=4).contains(&c);
                assert_eq!(field.flats[(r, c)], floor, "({r}, {c})");
            }
        }
    }

    #[test]
    fn test_pit_center_is_flat() {
        let mut data = Array2::from_elem((5, 5), 100.0);
        data[(2, 2)] = 90.0;
        let field = compute(data, 512);
        assert!(field.flats[(2, 2)]);
        assert_eq!(field.magnitude[(2, 2)], FLAT_SENTINEL);
    }

    #[test]
    fn test_range_invariants() {
        let field = compute(rolling(40, 33), 16);
        for (m, d) in field.magnitude.iter().zip(field.direction.iter()) {
            if *m == FLAT_SENTINEL {
                assert_eq!(*d, FLAT_SENTINEL);
                continue;
            }
            assert!(*m >= 0.0);
            assert!((0.0..TAU).contains(d));
        }
    }

    #[test]
    fn test_cone_drains_toward_center() {
        // Funnel descending toward its center; interior directions
        // point at the center. Edge rows/columns use the approximate
        // boundary handling and are deliberately not asserted.
        let center = 10.0;
        let data = Array2::from_shape_fn((21, 21), |(r, c)| {
            ((r as f64 - center).powi(2) + (c as f64 - center).powi(2)).sqrt()
        });
        let field = compute(data, 512);
        for r in 0..21 {
            for c in 0..21 {
                let dr = r as f64 - center;
                let dc = c as f64 - center;
                let radius = dr.hypot(dc);
                if !(3.0..=7.0).contains(&radius) {
                    continue;
                }
                let expected = (-(center - r as f64)).atan2(center - c as f64).rem_euclid(TAU);
                let got = field.direction[(r, c)];
                let diff = (got - expected + std::f64::consts::PI).rem_euclid(TAU)
                    - std::f64::consts::PI;
                assert!(
                    diff.abs() < 0.3,
                    "({r}, {c}): expected {expected:.3}, got {got:.3}"
                );
            }
        }
    }

    #[test]
    fn test_all_nodata_degrades_to_flat() {
        let data = Array2::from_elem((12, 12), f64::NAN);
        let field = compute(data, 512);
        assert!(field.flats.iter().all(|&f| f));
        assert!(field.magnitude.iter().all(|&m| m == FLAT_SENTINEL));
        assert!(!field.magnitude.iter().any(|m| m.is_nan()));
    }

    #[test]
    fn test_overlap_must_exceed_one() {
        let p = DemProcessor::with_uniform_spacing(grid_from(rolling(8, 8)), 1.0)
            .unwrap()
            .chunk_overlap(1);
        match p.compute() {
            Err(DemflowError::Overlap(1)) => (),
            other => panic!("expected Overlap, got {other:?}"),
        }
    }

    #[test]
    fn test_spacing_mismatch_rejected() {
        let spacing = crate::SpacingVectors::uniform(1.0, 6).unwrap();
        match DemProcessor::new(grid_from(rolling(8, 8)), spacing) {
            Err(DemflowError::SpacingLen { expected: 7, .. }) => (),
            other => panic!("expected SpacingLen, got {other:?}"),
        }
    }
}
