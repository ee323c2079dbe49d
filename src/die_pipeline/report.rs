//! Reporting layer
//!
//! Inspection output computed after classification has returned: pixel
//! positions of selected cells, raw crops around a cell, and TIFF renders of
//! the feature map and of classified cells over the photograph.

mod overlay;
mod writer;
mod standard_tiff_writer;
pub mod types;

pub use overlay::{cell_crop, cell_positions, outlier_positions, render_overlay};
pub use writer::ReportWriter;
pub use standard_tiff_writer::StandardTiffReportWriter;
pub use types::{Rgb8Image, TiffCompression};
