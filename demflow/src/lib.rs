//! D-infinity slope magnitude and flow direction over elevation
//! rasters, after Tarboton (1997).
//!
//! Each pixel is decomposed into eight triangular facets; the facet
//! with the steepest downslope wins and fixes the flow direction as a
//! continuous angle, east = 0, counterclockwise, `[0, 2pi)`. Grids
//! larger than the configured chunk size are processed as overlapping
//! chunks and stitched back without seams.
//!
//! ```no_run
//! use demflow::DemProcessor;
//! use demgrid::hgt::{HgtReader, LoadMode};
//! use demgrid::ElevationSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grid = HgtReader(LoadMode::MemMap).read("N38W106.hgt".as_ref())?;
//! let field = DemProcessor::with_geographic_spacing(grid)?.compute_parallel()?;
//! println!("steepest: {:?}", field.magnitude.iter().cloned().fold(0.0_f64, f64::max));
//! # Ok(())
//! # }
//! ```

mod chunk;
mod error;
mod facet;
mod flats;
mod processor;
mod spacing;

pub use crate::{
    chunk::{chunk_edges, plan, stitch, Chunk},
    error::DemflowError,
    facet::{slopes_directions, Facet, FACETS},
    flats::find_flats,
    processor::{DemProcessor, SlopeField, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    spacing::SpacingVectors,
};

/// Marks pixels with no downslope facet in both the magnitude and
/// direction arrays. Valid magnitudes are non-negative and valid
/// directions live in `[0, 2pi)`, so the sentinel is unambiguous.
pub const FLAT_SENTINEL: demgrid::C = -1.0;
