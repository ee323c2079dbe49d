//! Decoded photograph sample types

/// Single-channel Bayer mosaic straight from a camera RAW file
#[derive(Debug, Clone)]
pub struct RawImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Raw sensor samples (single channel Bayer pattern)
    pub data: Vec<u16>,
    /// Actual bits per sample from the sensor (e.g., 12, 14, or 16)
    pub bits_per_sample: u32,
    /// Sensor black level
    pub black_level: u16,
    /// Sensor white level
    pub white_level: u16,
    /// Color filter layout name as reported by the decoder ("RGGB", "BGGR", ...)
    pub cfa: String,
}

/// RGB photograph samples
#[derive(Debug, Clone)]
pub struct RgbImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// RGB pixel data interleaved [R, G, B, R, G, B, ...]
    pub data: Vec<u16>,
    /// Significant bits per sample; values span `0..2^bits_per_sample`
    pub bits_per_sample: u32,
}

impl RgbImageData {
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Largest representable sample value.
    pub fn max_value(&self) -> f32 {
        ((1u64 << self.bits_per_sample.min(16)) - 1) as f32
    }
}
