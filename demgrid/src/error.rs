use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("elevation grid must be at least 2x2, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },

    #[error("expected a single leading band, got {0}")]
    BandCount(usize),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len {0} for {1}")]
    HgtLen(u64, PathBuf),
}
