//! Common utilities module
//!
//! This module contains the error type, the bit matrix and the cancellation
//! flag shared across the pipeline.

pub mod error;
pub mod bitmatrix;
pub mod cancel;

pub use error::{ReadError, Result};
pub use bitmatrix::BitMatrix;
pub use cancel::CancelFlag;
