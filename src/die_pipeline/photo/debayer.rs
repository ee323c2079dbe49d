use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use tracing::{debug, info};

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::types::{RawImageData, RgbImageData};

/// Bilinear demosaicing of RAW mosaics on the CPU.
///
/// Only the black and white levels are corrected. White balance and colour
/// matrices are irrelevant here since the feature map averages the channels.
pub struct CpuDebayer;

impl CpuDebayer {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, raw_image: &RawImageData) -> Result<RgbImageData> {
        let width = raw_image.width;
        let height = raw_image.height;
        info!("Starting CPU debayering for image {}x{}", width, height);

        let cfa = cfa_from_name(&raw_image.cfa)?;

        // bayer crate only supports 8 and 16 bit
        let (bayer_depth, raster_depth, bytes_per_pixel) = if raw_image.bits_per_sample <= 8 {
            (BayerDepth::Depth8, RasterDepth::Depth8, 1)
        } else {
            (BayerDepth::Depth16LE, RasterDepth::Depth16, 2)
        };

        let bayer_bytes: Vec<u8> = if bytes_per_pixel == 1 {
            raw_image.data.iter().map(|&val| val as u8).collect()
        } else {
            raw_image.data.iter().flat_map(|&val| val.to_le_bytes()).collect()
        };

        let mut output_buf = vec![0u8; width * height * 3 * bytes_per_pixel];
        let mut cursor = Cursor::new(&bayer_bytes[..]);

        debug!("Running demosaic with depth={:?}, CFA={}, algo=Linear", bayer_depth, raw_image.cfa);

        {
            let mut output_raster = RasterMut::new(width, height, raster_depth, &mut output_buf);
            bayer::run_demosaic(&mut cursor, bayer_depth, cfa, Demosaic::Linear, &mut output_raster)
                .map_err(|e| ReadError::UnsupportedFormat(format!("demosaic failed: {:?}", e)))?;
        }

        let black_level = raw_image.black_level as f32;
        let range = (raw_image.white_level as f32 - black_level).max(1.0);

        let rgb_data: Vec<u16> = output_buf
            .chunks_exact(bytes_per_pixel)
            .map(|sample| {
                let raw = if bytes_per_pixel == 1 {
                    sample[0] as f32
                } else {
                    u16::from_le_bytes([sample[0], sample[1]]) as f32
                };
                let linear = (raw - black_level).max(0.0) / range;
                (linear * 65535.0).clamp(0.0, 65535.0) as u16
            })
            .collect();

        Ok(RgbImageData {
            width,
            height,
            data: rgb_data,
            bits_per_sample: 16,
        })
    }
}

impl Default for CpuDebayer {
    fn default() -> Self {
        Self::new()
    }
}

fn cfa_from_name(name: &str) -> Result<CFA> {
    match name.get(..4).map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("RGGB") => Ok(CFA::RGGB),
        Some("BGGR") => Ok(CFA::BGGR),
        Some("GRBG") => Ok(CFA::GRBG),
        Some("GBRG") => Ok(CFA::GBRG),
        _ => Err(ReadError::UnsupportedFormat(format!("color filter array {:?}", name))),
    }
}
