use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to load photograph {path}: {reason}")]
    LoadError { path: PathBuf, reason: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid photograph dimensions: declared {expected:?}, found {actual:?}")]
    InvalidDimensions { expected: (usize, usize), actual: (usize, usize) },

    #[error("Calibration error at cell ({row}, {col}): {detail}")]
    CalibrationError { row: usize, col: usize, detail: String },

    #[error("Cell ({row}, {col}) is outside the {rows}x{cols} lattice")]
    InvalidCell { row: usize, col: usize, rows: usize, cols: usize },

    #[error("Dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch { left: (usize, usize), right: (usize, usize) },

    #[error("Split row {split_row} is past the last of {rows} rows")]
    InvalidSplit { split_row: usize, rows: usize },

    #[error("Parse error on line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Training failed: {0}")]
    TrainingError(String),

    #[error("Failed to encode TIFF report: {0}")]
    EncodeError(String),

    #[error("Classification cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ReadError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ReadError::LoadError { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn calibration(row: usize, col: usize, detail: impl Into<String>) -> Self {
        ReadError::CalibrationError { row, col, detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, ReadError>;
