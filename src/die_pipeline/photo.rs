//! Photograph loading module
//!
//! Decodes die photographs (ordinary raster formats or camera RAW) into RGB
//! samples and derives the edge-enhanced feature map every later stage reads.

mod reader;
mod image_reader;
mod rawloader_reader;
mod debayer;
mod feature;
pub mod types;

pub use reader::{AutoReader, PhotoReader, reader_for_path};
pub use image_reader::ImageCrateReader;
pub use rawloader_reader::RawLoaderReader;
pub use debayer::CpuDebayer;
pub use feature::{FeatureMap, Photograph, FEATURE_BLUR_SIGMA};
pub use types::{RawImageData, RgbImageData};
