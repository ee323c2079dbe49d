use std::io::{Cursor, Write};

use tiff::encoder::{Compression, TiffEncoder, colortype, compression::DeflateLevel};
use tracing::debug;

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::FeatureMap;
use crate::die_pipeline::report::types::{Rgb8Image, TiffCompression};
use crate::die_pipeline::report::writer::ReportWriter;

pub struct StandardTiffReportWriter;

fn encoder_compression(compression: TiffCompression) -> Compression {
    match compression {
        TiffCompression::None => Compression::Uncompressed,
        TiffCompression::Lzw => Compression::Lzw,
        TiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
    }
}

/// Stretches feature values linearly over the full 16-bit range.
fn stretch_to_u16(feature: &FeatureMap) -> Vec<u16> {
    let (lo, hi) = feature
        .data()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        return vec![0; feature.data().len()];
    }
    feature
        .data()
        .iter()
        .map(|&v| ((v - lo) / span * 65535.0).round() as u16)
        .collect()
}

impl ReportWriter for StandardTiffReportWriter {
    fn write_feature_map(&self, feature: &FeatureMap, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        debug!("Encoding feature map TIFF: {}x{}", feature.width(), feature.height());

        let samples = stretch_to_u16(feature);
        let mut buffer = Vec::new();
        TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ReadError::EncodeError(e.to_string()))?
            .with_compression(encoder_compression(compression))
            .write_image::<colortype::Gray16>(feature.width() as u32, feature.height() as u32, &samples)
            .map_err(|e| ReadError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }

    fn write_overlay(&self, image: &Rgb8Image, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        debug!("Encoding overlay TIFF: {}x{}", image.width, image.height);

        let mut buffer = Vec::new();
        TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ReadError::EncodeError(e.to_string()))?
            .with_compression(encoder_compression(compression))
            .write_image::<colortype::RGB8>(image.width as u32, image.height as u32, &image.data)
            .map_err(|e| ReadError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }
}
