use std::io::Write;

use crate::die_pipeline::common::error::Result;
use crate::die_pipeline::photo::FeatureMap;
use crate::die_pipeline::report::types::{Rgb8Image, TiffCompression};

pub trait ReportWriter {
    fn write_feature_map(&self, feature: &FeatureMap, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
    fn write_overlay(&self, image: &Rgb8Image, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
}
