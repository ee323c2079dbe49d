//! Lattice geometry module
//!
//! Maps logical (row, column) cell addresses to sub-pixel photograph
//! positions from four hand-measured calibration point pairs.

mod lattice;
mod mapping;
pub mod types;
pub mod presets;

pub use lattice::{Lattice, Tile, NCOLS, NROWS};
pub use mapping::{cell_to_pixel, lattice_position};
pub use types::{CalibrationDescriptor, Point};
