//! Flat region detection and one-ring extension.
//!
//! A pixel with no descending facet keeps the magnitude sentinel and
//! is a flat. Pixels immediately downstream of a flat can resolve to
//! a spurious low-confidence angle, so every contiguous flat region
//! is extended one ring outward onto neighbors that share the
//! region's exact elevation.

use crate::FLAT_SENTINEL;
use demgrid::C;
use ndarray::{Array2, ArrayView2};

/// Marks flat pixels for a block.
///
/// Labels 8-connected regions of sentinel-magnitude pixels, then
/// marks every neighbor whose elevation equals the region's seed
/// elevation. Regions seeded on a masked (nodata) pixel are left as
/// they are; they are already flat and have no meaningful elevation
/// to extend by.
pub fn find_flats(
    data: ArrayView2<C>,
    mask: ArrayView2<bool>,
    mag: &Array2<C>,
) -> Array2<bool> {
    let (rows, cols) = data.dim();
    let mut flats = mag.map(|&m| m == FLAT_SENTINEL);
    let seed = flats.clone();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut region: Vec<(usize, usize)> = Vec::new();

    for r0 in 0..rows {
        for c0 in 0..cols {
            if !seed[(r0, c0)] || visited[(r0, c0)] {
                continue;
            }

            // Collect one 8-connected region of the original flats.
            region.clear();
            visited[(r0, c0)] = true;
            stack.push((r0, c0));
            while let Some((r, c)) = stack.pop() {
                region.push((r, c));
                for (nr, nc) in neighborhood(r, c, rows, cols) {
                    if seed[(nr, nc)] && !visited[(nr, nc)] {
                        visited[(nr, nc)] = true;
                        stack.push((nr, nc));
                    }
                }
            }

            if mask[(r0, c0)] {
                continue;
            }
            let elevation = data[(r0, c0)];
            for &(r, c) in &region {
                for (nr, nc) in neighborhood(r, c, rows, cols) {
                    if data[(nr, nc)] == elevation {
                        flats[(nr, nc)] = true;
                    }
                }
            }
        }
    }

    flats
}

/// In-bounds 3x3 neighborhood of `(r, c)`, center included.
#[allow(clippy::cast_sign_loss)]
fn neighborhood(
    r: usize,
    c: usize,
    rows: usize,
    cols: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (-1..=1_isize).flat_map(move |dr| {
        (-1..=1_isize).filter_map(move |dc| {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                Some((nr as usize, nc as usize))
            } else {
                None
            }
        })
    })
}
