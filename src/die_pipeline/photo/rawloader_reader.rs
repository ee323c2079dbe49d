//! Reader for camera RAW die photographs using the rawloader library.
//!
//! Microscope cameras usually save RAW files (ARW, NEF, DNG, ...). The
//! mosaic is decoded with rawloader, then demosaiced on the CPU.

use std::io::Cursor;

use tracing::debug;
use rawloader::RawImageData as RawloaderImageData;

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::debayer::CpuDebayer;
use crate::die_pipeline::photo::reader::PhotoReader;
use crate::die_pipeline::photo::types::{RawImageData, RgbImageData};

/// RAW photograph reader that uses the rawloader library for decoding.
pub struct RawLoaderReader;

/// Default bit depth when no white level information is available from the RAW file.
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

/// The bit width of the u16 data type, used for calculating actual bits per sample.
const U16_BITS: u32 = 16;

impl RawLoaderReader {
    /// Decodes the sensor mosaic without demosaicing it.
    pub fn read_mosaic(&self, data: &[u8]) -> Result<RawImageData> {
        debug!("Decoding RAW photograph, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ReadError::UnsupportedFormat(e.to_string()))?;

        debug!("Decoded mosaic: {}x{} ({})", decoded.width, decoded.height, decoded.cfa.name);

        // Float data is normalized to 0.0-1.0 and gets scaled to the u16 range
        let samples: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => values,
            RawloaderImageData::Float(values) => {
                values.iter().map(|&v| (v * u16::MAX as f32) as u16).collect()
            }
        };

        let white_level = decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX);
        let bits_per_sample = if white_level == 0 {
            DEFAULT_BITS_PER_SAMPLE
        } else {
            // e.g. 4095 -> 12 bits, 16383 -> 14 bits
            U16_BITS - white_level.leading_zeros()
        };

        debug!("bits_per_sample: {} (white level: {})", bits_per_sample, white_level);

        Ok(RawImageData {
            width: decoded.width,
            height: decoded.height,
            data: samples,
            bits_per_sample,
            black_level: decoded.blacklevels.iter().min().copied().unwrap_or(0),
            white_level: if white_level == 0 { u16::MAX } else { white_level },
            cfa: decoded.cfa.name.clone(),
        })
    }
}

impl PhotoReader for RawLoaderReader {
    fn read_photo(&self, data: &[u8]) -> Result<RgbImageData> {
        let mosaic = self.read_mosaic(data)?;
        CpuDebayer::new().process(&mosaic)
    }
}
