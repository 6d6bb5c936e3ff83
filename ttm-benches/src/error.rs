//! Benchmark setup error type.
//!
//! Lets setup functions propagate failures with `?` instead of `.expect()`.

use crate::blobs::BlobError;
use ttm_core::vector::VectorCellError;
use ttm_core::{FormatError, TtmError};

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic blob generation failed: {0}")]
    Blobs(#[from] BlobError),
    /// A synthetic table could not be assembled.
    #[error("synthetic table is malformed: {0}")]
    Format(#[from] FormatError),
    /// A synthetic vector could not be written as a cell.
    #[error("synthetic vector is not encodable: {0}")]
    Cell(#[from] VectorCellError),
    /// A pipeline method failed.
    #[error("pipeline operation failed: {0}")]
    Pipeline(#[from] TtmError),
    /// Serialising a table into memory failed.
    #[error("writing the table failed: {0}")]
    Io(#[from] std::io::Error),
}
