use image::{ImageBuffer, Luma};
use tracing::{debug, info, instrument};

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::geometry::CalibrationDescriptor;
use crate::die_pipeline::photo::reader::{AutoReader, PhotoReader};
use crate::die_pipeline::photo::types::RgbImageData;

/// Standard deviation, in pixels, of the blur applied after the Laplacian.
///
/// `imageproc` truncates the kernel at 2σ (±4 px), where scipy's
/// `gaussian_filter` keeps 4σ. The centre weight of an impulse comes out
/// near 0.0417 instead of 0.0398, so discriminants trained on feature images
/// from the other filter need retraining before they are used here.
pub const FEATURE_BLUR_SIGMA: f32 = 2.0;

/// Grayscale full-scale value the feature map is computed in. Reference
/// discriminants were trained against 8-bit intensities.
const GRAY_FULL_SCALE: f32 = 255.0;

/// Single-channel edge-enhanced image sampled by every classifier.
#[derive(Debug, Clone)]
pub struct FeatureMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    /// Wraps row-major feature values. Returns `None` on a length mismatch.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height).then_some(Self { width, height, data })
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Channel mean, then a 5-point Laplacian, then a Gaussian blur of
    /// [`FEATURE_BLUR_SIGMA`].
    pub fn from_rgb(rgb: &RgbImageData) -> Self {
        let gray = grayscale(rgb);
        let edges = laplace(&gray, rgb.width, rgb.height);
        let data = gaussian_blur(edges, rgb.width, rgb.height, FEATURE_BLUR_SIGMA);
        Self { width: rgb.width, height: rgb.height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    /// Pixel value, or 0 outside the image.
    #[inline]
    pub fn value(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            0.0
        } else {
            self.data[y as usize * self.width + x as usize]
        }
    }

    /// Bilinear interpolation with a constant zero border.
    #[inline]
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f32 {
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = (x - x0 as f64) as f32;
        let fy = (y - y0 as f64) as f32;

        let p00 = self.value(x0, y0);
        let p10 = self.value(x0 + 1, y0);
        let p01 = self.value(x0, y0 + 1);
        let p11 = self.value(x0 + 1, y0 + 1);

        let top = p00 + fx * (p10 - p00);
        let bottom = p01 + fx * (p11 - p01);
        top + fy * (bottom - top)
    }
}

fn grayscale(rgb: &RgbImageData) -> Vec<f32> {
    let scale = GRAY_FULL_SCALE / rgb.max_value();
    rgb.data
        .chunks_exact(3)
        .map(|px| (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0 * scale)
        .collect()
}

/// Discrete Laplacian (second difference along each axis) with edge samples
/// repeated past the border.
fn laplace(gray: &[f32], width: usize, height: usize) -> Vec<f32> {
    let at = |x: usize, y: usize| gray[y * width + x];
    let mut out = Vec::with_capacity(gray.len());
    for y in 0..height {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(height - 1);
        for x in 0..width {
            let left = x.saturating_sub(1);
            let right = (x + 1).min(width - 1);
            let c = at(x, y);
            out.push(at(left, y) + at(right, y) + at(x, up) + at(x, down) - 4.0 * c);
        }
    }
    out
}

fn gaussian_blur(data: Vec<f32>, width: usize, height: usize, sigma: f32) -> Vec<f32> {
    if width == 0 || height == 0 {
        return data;
    }
    match ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(width as u32, height as u32, data) {
        Some(image) => imageproc::filter::gaussian_blur_f32(&image, sigma).into_raw(),
        None => Vec::new(),
    }
}

/// A loaded die photograph: its calibration, the RGB samples and the derived
/// feature map. Immutable once built.
#[derive(Debug, Clone)]
pub struct Photograph {
    descriptor: CalibrationDescriptor,
    rgb: RgbImageData,
    feature: FeatureMap,
}

impl Photograph {
    /// Reads the file named by the descriptor, choosing the decoder from its
    /// extension, and validates the declared dimensions.
    pub fn load(descriptor: &CalibrationDescriptor) -> Result<Self> {
        Self::load_with(&AutoReader, descriptor, true)
    }

    pub fn load_with(
        reader: &dyn PhotoReader,
        descriptor: &CalibrationDescriptor,
        validate_dimensions: bool,
    ) -> Result<Self> {
        let rgb = Self::read_rgb(reader, descriptor, validate_dimensions)?;
        Ok(Self::from_rgb(descriptor.clone(), rgb))
    }

    /// Reads and decodes the photograph without deriving the feature map.
    #[instrument(skip(reader, descriptor), fields(path = %descriptor.path.display()))]
    pub fn read_rgb(
        reader: &dyn PhotoReader,
        descriptor: &CalibrationDescriptor,
        validate_dimensions: bool,
    ) -> Result<RgbImageData> {
        let path = &descriptor.path;
        info!("Loading photograph");

        let bytes = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(path).map_err(|e| ReadError::load(path, e))?
        };

        let rgb = {
            let _span = tracing::info_span!("decode_photo").entered();
            reader.read_file(path, &bytes).map_err(|e| ReadError::load(path, e))?
        };

        if validate_dimensions && (rgb.width, rgb.height) != (descriptor.width, descriptor.height) {
            return Err(ReadError::InvalidDimensions {
                expected: (descriptor.width, descriptor.height),
                actual: (rgb.width, rgb.height),
            });
        }

        Ok(rgb)
    }

    pub fn from_rgb(descriptor: CalibrationDescriptor, rgb: RgbImageData) -> Self {
        let feature = {
            let _span = tracing::info_span!("feature_map", width = rgb.width, height = rgb.height).entered();
            FeatureMap::from_rgb(&rgb)
        };
        debug!("Feature map ready: {}x{}", feature.width(), feature.height());
        Self { descriptor, rgb, feature }
    }

    /// Builds a photograph around an already computed feature map; the RGB
    /// samples are left black.
    pub fn from_feature_map(descriptor: CalibrationDescriptor, feature: FeatureMap) -> Self {
        let rgb = RgbImageData {
            width: feature.width(),
            height: feature.height(),
            data: vec![0; feature.width() * feature.height() * 3],
            bits_per_sample: 8,
        };
        Self { descriptor, rgb, feature }
    }

    pub fn descriptor(&self) -> &CalibrationDescriptor {
        &self.descriptor
    }

    pub fn rgb(&self) -> &RgbImageData {
        &self.rgb
    }

    pub fn feature(&self) -> &FeatureMap {
        &self.feature
    }
}
