//! Tarboton D-infinity facet slope solver.
//!
//! Every pixel is surrounded by 8 triangular facets, each spanned by
//! a cardinal neighbor `e1` and a diagonal neighbor `e2`. The solver
//! evaluates the steepest descent within each facet and keeps the
//! best squared candidate per pixel, reconstructing a continuous
//! direction in `[0, 2pi)` (east = 0, counterclockwise) from the
//! facet's quadrant-adjustment entry.
//!
//! Reference: Tarboton, D.G. (1997). A new method for the
//! determination of flow directions and upslope areas in grid digital
//! elevation models. *Water Resources Research*, 33(2), 309-319.

use crate::{spacing::SpacingVectors, FLAT_SENTINEL};
use demgrid::C;
use ndarray::{Array2, ArrayView2};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// One triangular wedge around a center pixel.
///
/// Process-wide constants; see [`FACETS`].
#[derive(Debug, Clone, Copy)]
pub struct Facet {
    /// Row/column offset of the first (cardinal) neighbor.
    pub e1: (isize, isize),
    /// Row/column offset of the second (diagonal) neighbor.
    pub e2: (isize, isize),
    /// Quadrant multiple of pi/2 anchoring the reconstructed angle.
    pub quadrant: C,
    /// Sign of the local angle within the quadrant frame.
    pub sign: C,
    /// Whether `d1` is the x spacing (true) or the y spacing.
    pub d1_is_dx: bool,
}

/// The 8 facets in evaluation order, with their quadrant-adjustment
/// table.
#[rustfmt::skip]
pub const FACETS: [Facet; 8] = [
    Facet { e1: (0, 1),  e2: (-1, 1),  quadrant: 0.0, sign: 1.0,  d1_is_dx: true },
    Facet { e1: (-1, 0), e2: (-1, 1),  quadrant: 1.0, sign: -1.0, d1_is_dx: false },
    Facet { e1: (-1, 0), e2: (-1, -1), quadrant: 1.0, sign: 1.0,  d1_is_dx: false },
    Facet { e1: (0, -1), e2: (-1, -1), quadrant: 2.0, sign: -1.0, d1_is_dx: true },
    Facet { e1: (0, -1), e2: (1, -1),  quadrant: 2.0, sign: 1.0,  d1_is_dx: true },
    Facet { e1: (1, 0),  e2: (1, -1),  quadrant: 3.0, sign: -1.0, d1_is_dx: false },
    Facet { e1: (1, 0),  e2: (1, 1),   quadrant: 3.0, sign: 1.0,  d1_is_dx: false },
    Facet { e1: (0, 1),  e2: (1, 1),   quadrant: 4.0, sign: -1.0, d1_is_dx: true },
];

// Facet subsets that stay in bounds at each boundary.
const LEFT_EDGE_FACETS: [usize; 4] = [0, 1, 6, 7];
const RIGHT_EDGE_FACETS: [usize; 4] = [2, 3, 4, 5];
const TOP_EDGE_FACETS: [usize; 4] = [4, 5, 6, 7];
const BOTTOM_EDGE_FACETS: [usize; 4] = [0, 1, 2, 3];
const TOP_LEFT_FACETS: [usize; 2] = [6, 7];
const TOP_RIGHT_FACETS: [usize; 2] = [4, 5];
const BOTTOM_LEFT_FACETS: [usize; 2] = [0, 1];
const BOTTOM_RIGHT_FACETS: [usize; 2] = [2, 3];

/// Which spacing entries apply to a pass.
#[derive(Debug, Clone, Copy)]
enum Band {
    /// Per-row spacing selected by the facet's row offset.
    Interior,
    /// First boundary spacing entry.
    Top,
    /// Last boundary spacing entry.
    Bottom,
}

/// Physical distances of one facet at one row.
struct FacetGeometry {
    d1: C,
    d2: C,
    /// Wedge angle `atan2(d2, d1)` of the diagonal.
    theta: C,
}

fn facet_geometry(facet: &Facet, spacing: &SpacingVectors, row: usize, band: Band) -> FacetGeometry {
    let last = spacing.len() - 1;
    let (dx, dy) = match band {
        Band::Top => (spacing.dx[0], spacing.dy[0]),
        Band::Bottom => (spacing.dx[last], spacing.dy[last]),
        Band::Interior => {
            // The spacing entry sits on the boundary the facet leans
            // across; rows 1..rows-1 index it without going out of
            // bounds.
            let lean = if facet.d1_is_dx { facet.e2.0 } else { facet.e1.0 };
            let i = if lean < 0 { row - 1 } else { row };
            (spacing.dx[i], spacing.dy[i])
        }
    };
    let (d1, d2) = if facet.d1_is_dx { (dx, dy) } else { (dy, dx) };
    FacetGeometry {
        d1,
        d2,
        theta: d2.atan2(d1),
    }
}

/// Evaluates one facet at one pixel, updating the candidate buffers
/// only if the squared slope beats the stored candidate.
fn eval_facet(
    data: &ArrayView2<C>,
    mag: &mut Array2<C>,
    dir: &mut Array2<C>,
    (r, c): (usize, usize),
    facet: &Facet,
    geom: &FacetGeometry,
) {
    #[allow(clippy::cast_sign_loss)]
    let at = |e: (isize, isize)| {
        data[((r as isize + e.0) as usize, (c as isize + e.1) as usize)]
    };
    let z0 = data[(r, c)];
    let z1 = at(facet.e1);
    let z2 = at(facet.e2);

    let s1 = (z0 - z1) / geom.d1;
    let s2 = (z1 - z2) / geom.d2;
    let sd = (z0 - z2) / geom.d1.hypot(geom.d2);

    let mut ang = s2.atan2(s1);
    let mut rad2 = s1 * s1 + s2 * s2;

    // Steepest descent leaves the wedge past the diagonal.
    if (s1 <= 0.0 && s2 > 0.0) || ang > geom.theta {
        rad2 = sd * sd;
        ang = geom.theta;
    }
    // Steepest descent leaves the wedge past the cardinal edge.
    if (s1 > 0.0 && s2 <= 0.0) || ang < 0.0 {
        rad2 = s1 * s1;
        ang = 0.0;
    }
    // Upslope or flat facet: no candidate.
    if s1 <= 0.0 && (s2 <= 0.0 || (s2 > 0.0 && sd <= 0.0)) {
        rad2 = FLAT_SENTINEL;
    }

    if rad2 > mag[(r, c)] {
        mag[(r, c)] = rad2;
        let mut d = ang * facet.sign + facet.quadrant * FRAC_PI_2;
        // Facet 7's on-edge case lands exactly on 2pi.
        if d >= TAU {
            d -= TAU;
        }
        dir[(r, c)] = d;
    }
}

/// Copies mag/direction inward onto edge pixels whose interior
/// neighbor drains toward them.
///
/// This is an acknowledged approximation carried over from the
/// reference implementation: an edge pixel lower than its interior
/// neighbor inherits that neighbor's result rather than being left
/// flat.
fn copy_edges_inward(mag: &mut Array2<C>, dir: &mut Array2<C>) {
    let (rows, cols) = mag.dim();
    let three_half_pi = 3.0 * FRAC_PI_2;
    for r in 0..rows {
        let d = dir[(r, 1)];
        if d > FRAC_PI_2 && d < three_half_pi {
            dir[(r, 0)] = d;
            mag[(r, 0)] = mag[(r, 1)];
        }
        let d = dir[(r, cols - 2)];
        if d < FRAC_PI_2 || d > three_half_pi {
            dir[(r, cols - 1)] = d;
            mag[(r, cols - 1)] = mag[(r, cols - 2)];
        }
    }
    for c in 0..cols {
        let d = dir[(1, c)];
        if d > 0.0 && d < PI {
            dir[(0, c)] = d;
            mag[(0, c)] = mag[(1, c)];
        }
        let d = dir[(rows - 2, c)];
        if d > PI && d < TAU {
            dir[(rows - 1, c)] = d;
            mag[(rows - 1, c)] = mag[(rows - 2, c)];
        }
    }
}

/// Computes squared-candidate magnitude and direction for a block.
///
/// Runs the interior pass over all 8 facets, the inward-copy
/// approximation, the 4 edge passes restricted to the in-bounds facet
/// subsets, the 4 corner passes, and finally takes the square root of
/// every resolved magnitude. Pixels with no descending facet keep the
/// [`FLAT_SENTINEL`] in both outputs.
///
/// `spacing` must cover this block (`spacing.len() == rows - 1`).
pub fn slopes_directions(
    data: ArrayView2<C>,
    spacing: &SpacingVectors,
) -> (Array2<C>, Array2<C>) {
    let (rows, cols) = data.dim();
    debug_assert_eq!(spacing.len(), rows - 1);

    let mut mag = Array2::from_elem((rows, cols), FLAT_SENTINEL);
    let mut dir = Array2::from_elem((rows, cols), FLAT_SENTINEL);

    for r in 1..rows.saturating_sub(1) {
        let geom: Vec<FacetGeometry> = FACETS
            .iter()
            .map(|f| facet_geometry(f, spacing, r, Band::Interior))
            .collect();
        for c in 1..cols - 1 {
            for (k, facet) in FACETS.iter().enumerate() {
                eval_facet(&data, &mut mag, &mut dir, (r, c), facet, &geom[k]);
            }
        }
    }

    copy_edges_inward(&mut mag, &mut dir);

    // Left and right columns keep per-row spacing.
    for r in 1..rows.saturating_sub(1) {
        for &k in &LEFT_EDGE_FACETS {
            let geom = facet_geometry(&FACETS[k], spacing, r, Band::Interior);
            eval_facet(&data, &mut mag, &mut dir, (r, 0), &FACETS[k], &geom);
        }
        for &k in &RIGHT_EDGE_FACETS {
            let geom = facet_geometry(&FACETS[k], spacing, r, Band::Interior);
            eval_facet(&data, &mut mag, &mut dir, (r, cols - 1), &FACETS[k], &geom);
        }
    }

    // Top and bottom rows fall back to the boundary spacing entries.
    for c in 1..cols - 1 {
        for &k in &TOP_EDGE_FACETS {
            let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Top);
            eval_facet(&data, &mut mag, &mut dir, (0, c), &FACETS[k], &geom);
        }
        for &k in &BOTTOM_EDGE_FACETS {
            let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Bottom);
            eval_facet(&data, &mut mag, &mut dir, (rows - 1, c), &FACETS[k], &geom);
        }
    }

    for &k in &TOP_LEFT_FACETS {
        let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Top);
        eval_facet(&data, &mut mag, &mut dir, (0, 0), &FACETS[k], &geom);
    }
    for &k in &TOP_RIGHT_FACETS {
        let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Top);
        eval_facet(&data, &mut mag, &mut dir, (0, cols - 1), &FACETS[k], &geom);
    }
    for &k in &BOTTOM_LEFT_FACETS {
        let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Bottom);
        eval_facet(&data, &mut mag, &mut dir, (rows - 1, 0), &FACETS[k], &geom);
    }
    for &k in &BOTTOM_RIGHT_FACETS {
        let geom = facet_geometry(&FACETS[k], spacing, 0, Band::Bottom);
        eval_facet(&data, &mut mag, &mut dir, (rows - 1, cols - 1), &FACETS[k], &geom);
    }

    mag.mapv_inplace(|m| if m > 0.0 { m.sqrt() } else { m });

    (mag, dir)
}
