//! Reader for ordinary raster photographs (JPEG, TIFF, BMP, PNG) backed by the `image` crate.

use tracing::debug;

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::reader::PhotoReader;
use crate::die_pipeline::photo::types::RgbImageData;

/// Decodes any format the `image` crate recognises from its magic bytes.
///
/// 8-bit sources are widened to 16 bits by the crate (`v * 257`), so the
/// output is always reported as 16 bits per sample.
pub struct ImageCrateReader;

impl PhotoReader for ImageCrateReader {
    fn read_photo(&self, data: &[u8]) -> Result<RgbImageData> {
        debug!("Decoding raster photograph, {} bytes", data.len());

        let decoded = image::load_from_memory(data)
            .map_err(|e| ReadError::UnsupportedFormat(e.to_string()))?;

        debug!("Decoded {:?} image: {}x{}", decoded.color(), decoded.width(), decoded.height());

        let rgb = decoded.to_rgb16();
        Ok(RgbImageData {
            width: rgb.width() as usize,
            height: rgb.height() as usize,
            data: rgb.into_raw(),
            bits_per_sample: 16,
        })
    }
}
