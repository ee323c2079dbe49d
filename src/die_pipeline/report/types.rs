//! Report output types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    #[default]
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}

/// 8-bit RGB raster for overlays
#[derive(Debug, Clone)]
pub struct Rgb8Image {
    pub width: usize,
    pub height: usize,
    /// Interleaved [R, G, B, R, G, B, ...]
    pub data: Vec<u8>,
}

impl Rgb8Image {
    pub fn put(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.data[i..i + 3].copy_from_slice(&color);
    }
}
