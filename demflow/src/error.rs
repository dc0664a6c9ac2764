use demgrid::GridError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemflowError {
    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("spacing vectors must have length {expected} (rows - 1), got dx {dx_len}, dy {dy_len}")]
    SpacingLen {
        expected: usize,
        dx_len: usize,
        dy_len: usize,
    },

    #[error("non-finite spacing value at row {row}")]
    SpacingValue { row: usize },

    #[error("chunk overlap must be greater than 1, got {0}")]
    Overlap(usize),

    #[error("grid has no transform; supply explicit spacing")]
    MissingTransform,
}
