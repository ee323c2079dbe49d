//! Manual override module
//!
//! Hand-verified cell values that replace whatever a classifier produced.

mod table;
mod fx2500;

pub use table::OverrideTable;
