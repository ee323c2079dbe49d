use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::die_pipeline::common::{BitMatrix, CancelFlag};
use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::{FeatureMap, Photograph};
use crate::die_pipeline::sampling::{Patch, PatchSampler};

/// Flattens `patch`, subtracts `mean`, projects onto `axis` and reports bit 1
/// when the projection falls below `threshold`.
pub fn classify(patch: &Patch, mean: &[f32], axis: &[f32], threshold: f32) -> bool {
    debug_assert_eq!(patch.values().len(), mean.len());
    debug_assert_eq!(patch.values().len(), axis.len());
    project(patch.values(), mean, axis) < threshold
}

pub(crate) fn project(values: &[f32], mean: &[f32], axis: &[f32]) -> f32 {
    values
        .iter()
        .zip(mean)
        .zip(axis)
        .map(|((&v, &m), &a)| (v as f64 - m as f64) * a as f64)
        .sum::<f64>() as f32
}

/// Mean vector, separating axis and threshold learned offline for one
/// patch radius and normalization setting. Only valid with that setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDiscriminant {
    pub radius: usize,
    pub normalize: bool,
    pub mean: Vec<f32>,
    pub axis: Vec<f32>,
    pub threshold: f32,
}

impl ReferenceDiscriminant {
    pub fn new(radius: usize, normalize: bool, mean: Vec<f32>, axis: Vec<f32>, threshold: f32) -> Result<Self> {
        let dimension = 4 * radius * radius;
        if radius == 0 || mean.len() != dimension || axis.len() != dimension {
            return Err(ReadError::TrainingError(format!(
                "radius {} needs {} values, got mean {} and axis {}",
                radius,
                dimension,
                mean.len(),
                axis.len()
            )));
        }
        Ok(Self { radius, normalize, mean, axis, threshold })
    }

    /// Constants trained on the MK-51 die photograph, radius 3, no normalization.
    ///
    /// The mean vector holds raw pixel intensities (roughly 155 to 200), not
    /// feature-map values, so on a feature map the projection of an empty
    /// patch is far below the threshold and nearly every cell reads as 1.
    /// Train a replacement with [`ReferenceDiscriminant::train_on_photo`].
    pub fn mk51() -> Self {
        Self {
            radius: 3,
            normalize: false,
            mean: MK51_MEAN.to_vec(),
            axis: MK51_AXIS.to_vec(),
            threshold: MK51_THRESHOLD,
        }
    }

    pub fn project(&self, patch: &Patch) -> f32 {
        project(patch.values(), &self.mean, &self.axis)
    }

    pub fn classify(&self, patch: &Patch) -> bool {
        classify(patch, &self.mean, &self.axis, self.threshold)
    }

    /// True when most of the mean vector lies outside the value range of
    /// `feature`, which happens with constants fitted to raw intensities.
    /// Normalized discriminants are never flagged.
    pub fn mean_outside(&self, feature: &FeatureMap) -> bool {
        if self.normalize || self.mean.is_empty() {
            return false;
        }
        let (lo, hi) = feature
            .data()
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let outside = self.mean.iter().filter(|&&m| m < lo.min(0.0) || m > hi.max(0.0)).count();
        outside * 2 > self.mean.len()
    }

    pub fn sampler<'a>(&self, photo: &'a Photograph) -> PatchSampler<'a> {
        PatchSampler::new(photo, self.radius, self.normalize)
    }

    /// Classifies every lattice cell, one row per rayon task. The flag is
    /// polled before each row.
    #[instrument(skip_all, fields(photo = %photo.descriptor().name))]
    pub fn read_bits(&self, photo: &Photograph, cancel: &CancelFlag) -> Result<BitMatrix> {
        let lattice = photo.descriptor().lattice;
        let mut bits = BitMatrix::zeros(lattice.rows, lattice.cols);
        if lattice.is_empty() {
            return Ok(bits);
        }

        let sampler = self.sampler(photo);
        info!(radius = self.radius, normalize = self.normalize, "Reading lattice with discriminant");
        if self.mean_outside(photo.feature()) {
            warn!("Discriminant mean lies outside the feature map's values; the read will be close to constant");
        }

        bits.bits_mut()
            .par_chunks_mut(lattice.cols)
            .enumerate()
            .try_for_each(|(row, out)| -> Result<()> {
                cancel.check()?;
                for (col, bit) in out.iter_mut().enumerate() {
                    *bit = self.classify(&sampler.sample(row, col)?);
                }
                Ok(())
            })?;

        debug!("Discriminant read {} ones of {}", bits.count_ones(), lattice.len());
        Ok(bits)
    }
}

pub const MK51_THRESHOLD: f32 = 27.0;

pub const MK51_MEAN: [f32; 36] = [
    189.65874425, 163.90641334, 155.98414646, 158.16136599, 158.93950686, 170.83007093,
    193.29812701, 168.67812829, 159.61633928, 161.34572598, 163.48869532, 175.59516817,
    198.06160232, 177.4694989, 170.91687956, 173.10009711, 173.81137047, 182.45741622,
    200.59431612, 182.49109655, 177.7909631, 180.30738711, 179.89019102, 186.3467299,
    199.84203548, 179.961734, 173.82122801, 176.15399925, 176.89570041, 185.14422612,
    195.66970369, 171.57461742, 162.99096766, 164.95080829, 167.25632738, 179.27765334,
];

pub const MK51_AXIS: [f32; 36] = [
    -0.04704893, -0.09579545, -0.22798194, -0.28930118, -0.18566232, -0.0665317,
    0.0358345, 0.01878957, -0.1315961, -0.20346627, -0.07541347, 0.04435633,
    0.13190374, 0.2027167, 0.11167305, 0.0523622, 0.14819832, 0.19398221,
    0.17839499, 0.29460418, 0.24172098, 0.19393085, 0.26916633, 0.27169814,
    0.15971022, 0.23307345, 0.14465973, 0.0929638, 0.19459791, 0.23811151,
    0.07380907, 0.05872097, -0.08331383, -0.1459898, -0.01573018, 0.10222208,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_pipeline::geometry::CalibrationDescriptor;
    use crate::die_pipeline::photo::FeatureMap;

    #[test]
    fn test_mk51_axis_is_unit_length() {
        let norm: f32 = MK51_AXIS.iter().map(|a| a * a).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
        assert!(ReferenceDiscriminant::new(3, false, MK51_MEAN.to_vec(), MK51_AXIS.to_vec(), 27.0).is_ok());
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        assert!(ReferenceDiscriminant::new(2, false, vec![0.0; 16], vec![0.0; 15], 0.0).is_err());
        assert!(ReferenceDiscriminant::new(0, false, vec![], vec![], 0.0).is_err());
    }

    #[test]
    fn test_classify_is_deterministic_and_thresholded() {
        let d = ReferenceDiscriminant::mk51();
        let at_mean = Patch::new(3, MK51_MEAN.to_vec()).unwrap();
        // Projection of the mean is zero, below 27.
        assert!(d.classify(&at_mean));
        let far: Vec<f32> = MK51_MEAN.iter().zip(MK51_AXIS).map(|(m, a)| m + 100.0 * a).collect();
        let far = Patch::new(3, far).unwrap();
        assert!((d.project(&far) - 100.0).abs() < 0.1);
        for _ in 0..10 {
            assert!(!d.classify(&far));
            assert!(d.classify(&at_mean));
        }
    }

    #[test]
    fn test_mk51_mean_does_not_fit_a_feature_map() {
        let feature = FeatureMap::from_fn(32, 32, |x, y| ((x + y) % 7) as f32 - 3.0);
        assert!(ReferenceDiscriminant::mk51().mean_outside(&feature));

        // An empty patch projects far below the threshold.
        let empty = Patch::new(3, vec![0.0; 36]).unwrap();
        assert!(ReferenceDiscriminant::mk51().project(&empty) < -400.0);
        assert!(ReferenceDiscriminant::mk51().classify(&empty));

        let fitted = ReferenceDiscriminant::new(3, false, vec![0.5; 36], MK51_AXIS.to_vec(), 0.0).unwrap();
        assert!(!fitted.mean_outside(&feature));
        let normalized = ReferenceDiscriminant { normalize: true, ..ReferenceDiscriminant::mk51() };
        assert!(!normalized.mean_outside(&feature));
    }

    #[test]
    fn test_read_bits_honours_cancellation() {
        let descriptor = CalibrationDescriptor::synthetic("c.png", 32, 32, (3, 3), (8.0, 8.0), (8.0, 8.0));
        let photo = Photograph::from_feature_map(descriptor, FeatureMap::from_fn(32, 32, |_, _| 0.0));
        let d = ReferenceDiscriminant::new(1, false, vec![0.0; 4], vec![0.5; 4], 0.5).unwrap();

        let bits = d.read_bits(&photo, &CancelFlag::new()).unwrap();
        assert_eq!(bits.count_ones(), 9);

        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(d.read_bits(&photo, &cancel), Err(ReadError::Cancelled)));
    }
}
