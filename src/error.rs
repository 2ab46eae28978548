//! Error types surfaced by the tile plotter.
//!
//! Stale and duplicate resolutions are not errors; they are reported as
//! [`AcceptOutcome`](crate::cache::AcceptOutcome) variants and dropped.

use crate::datasource::TileKey;

/// Errors raised while validating a resolved tile.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TileError {
    /// Sample timestamps are not ascending.
    #[error("tile {key} has non-ascending timestamps at sample {index}")]
    NonMonotonic {
        /// Offending tile.
        key: TileKey,
        /// Index of the first out-of-order sample.
        index: usize,
    },
}

/// Errors returned by [`TilePlotter`](crate::plotter::TilePlotter) operations.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TilePlotError {
    /// The visible range is not finite or has no span.
    #[error("visible range [{min}, {max}] is not a finite, non-empty interval")]
    InvalidRange {
        /// Requested minimum.
        min: f64,
        /// Requested maximum.
        max: f64,
    },
    /// A resolved tile failed validation.
    #[error(transparent)]
    Tile(#[from] TileError),
}
