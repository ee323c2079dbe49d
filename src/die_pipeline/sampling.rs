//! Patch sampling around cell centres.

use crate::die_pipeline::common::error::Result;
use crate::die_pipeline::geometry::{Point, cell_to_pixel};
use crate::die_pipeline::photo::{FeatureMap, Photograph};

/// Side of the neighbourhood used for normalization, in patch radii.
pub const NORMALIZATION_SCALE: usize = 10;

/// Square window of feature values, row-major, `2 * radius` on a side.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    radius: usize,
    values: Vec<f32>,
}

impl Patch {
    pub fn new(radius: usize, values: Vec<f32>) -> Option<Self> {
        (values.len() == 4 * radius * radius).then_some(Self { radius, values })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        2 * self.radius
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>()
            / self.values.len() as f64;
        var.sqrt()
    }
}

/// Reads patches of a fixed radius from one photograph's feature map.
#[derive(Debug, Clone, Copy)]
pub struct PatchSampler<'a> {
    photo: &'a Photograph,
    radius: usize,
    normalize: bool,
}

impl<'a> PatchSampler<'a> {
    pub fn new(photo: &'a Photograph, radius: usize, normalize: bool) -> Self {
        Self { photo, radius: radius.max(1), normalize }
    }

    /// Sampler with the radius scaled to the photograph's resolution.
    pub fn for_photo(photo: &'a Photograph, normalize: bool) -> Self {
        Self::new(photo, photo.descriptor().default_radius(), normalize)
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn photo(&self) -> &'a Photograph {
        self.photo
    }

    /// Length of the flattened patches this sampler produces.
    pub fn dimension(&self) -> usize {
        4 * self.radius * self.radius
    }

    pub fn sample(&self, row: usize, col: usize) -> Result<Patch> {
        sample(self.photo, row, col, self.radius, self.normalize)
    }
}

/// Window whose element `(i, j)` reads the feature map at
/// `(x - r + j, y - r + i)`, so the cell centre sits at element `(r, r)`.
fn window(feature: &FeatureMap, center: Point, radius: usize) -> Patch {
    let side = 2 * radius;
    let x0 = center.x - radius as f64;
    let y0 = center.y - radius as f64;
    let mut values = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            values.push(feature.sample_bilinear(x0 + j as f64, y0 + i as f64));
        }
    }
    Patch { radius, values }
}

/// Extracts the `2r x 2r` patch around cell `(row, col)`.
///
/// With `normalize`, the patch is z-scored against a `20r x 20r`
/// neighbourhood around the same centre, evening out illumination and
/// etching contrast across the die. A flat neighbourhood only has its mean
/// removed.
pub fn sample(photo: &Photograph, row: usize, col: usize, radius: usize, normalize: bool) -> Result<Patch> {
    let center = cell_to_pixel(photo.descriptor(), row, col)?;
    let feature = photo.feature();
    let mut patch = window(feature, center, radius);

    if normalize {
        let neighbourhood = window(feature, center, NORMALIZATION_SCALE * radius);
        let mean = neighbourhood.mean();
        let std = neighbourhood.std_dev();
        let scale = if std > f64::EPSILON { 1.0 / std } else { 1.0 };
        for v in &mut patch.values {
            *v = ((*v as f64 - mean) * scale) as f32;
        }
    }
    Ok(patch)
}
