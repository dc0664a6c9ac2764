//! Chunk planning and halo-trimmed stitching.
//!
//! Large rasters are processed as a grid of overlapping chunks so
//! peak memory stays bounded. Consecutive chunks along an axis share
//! a halo of `2 * overlap` pixels; when results are stitched back,
//! each chunk contributes only its interior, so interiors tile the
//! full extent exactly once regardless of traversal order.

use ndarray::{s, Array2};

/// Row/column bounds of one chunk, halo included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
    pub overlap: usize,
}

impl Chunk {
    pub fn rows(&self) -> usize {
        self.bottom - self.top
    }

    pub fn cols(&self) -> usize {
        self.right - self.left
    }
}

/// Start/end bounds of chunks along one axis of length `n`.
///
/// `start[i]..end[i]` covers chunk `i` including its halo. A chunk at
/// the grid's own edge has no halo on that side. When
/// `n <= chunk_size` a single full-extent chunk is returned. A
/// `chunk_size` smaller than the halo width is raised to
/// `overlap + 1`, the smallest size for which the bound arithmetic
/// holds.
pub fn chunk_edges(n: usize, chunk_size: usize, overlap: usize) -> (Vec<usize>, Vec<usize>) {
    let chunk_size = chunk_size.max(overlap + 1);
    if chunk_size >= n || n <= overlap {
        return (vec![0], vec![n]);
    }
    let count = (n - overlap).div_ceil(chunk_size);
    let mut starts = Vec::with_capacity(count);
    let mut ends = Vec::with_capacity(count);
    for i in 0..count {
        starts.push(if i == 0 { 0 } else { i * chunk_size - overlap });
        ends.push(if i == count - 1 {
            n
        } else {
            ((i + 1) * chunk_size + overlap).min(n)
        });
    }
    (starts, ends)
}

/// All chunks covering a `rows x cols` grid, row-major.
pub fn plan(rows: usize, cols: usize, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let (row_starts, row_ends) = chunk_edges(rows, chunk_size, overlap);
    let (col_starts, col_ends) = chunk_edges(cols, chunk_size, overlap);
    let mut chunks = Vec::with_capacity(row_starts.len() * col_starts.len());
    for (&top, &bottom) in row_starts.iter().zip(&row_ends) {
        for (&left, &right) in col_starts.iter().zip(&col_ends) {
            chunks.push(Chunk {
                top,
                bottom,
                left,
                right,
                overlap,
            });
        }
    }
    chunks
}

/// Writes a chunk's interior into the full-size array.
///
/// The halo is trimmed from every side that is not a grid edge, so
/// repeated or out-of-order writes of adjacent chunks never overlap.
pub fn stitch<T: Clone>(full: &mut Array2<T>, part: &Array2<T>, chunk: &Chunk) {
    let (grid_rows, grid_cols) = full.dim();
    let ovr = chunk.overlap;
    let i1 = if chunk.top == 0 { 0 } else { ovr };
    let i2 = if chunk.bottom == grid_rows { 0 } else { ovr };
    let j1 = if chunk.left == 0 { 0 } else { ovr };
    let j2 = if chunk.right == grid_cols { 0 } else { ovr };

    full.slice_mut(s![
        chunk.top + i1..chunk.bottom - i2,
        chunk.left + j1..chunk.right - j2
    ])
    .assign(&part.slice(s![i1..chunk.rows() - i2, j1..chunk.cols() - j2]));
}
