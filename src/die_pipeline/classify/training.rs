//! Offline derivation of reference discriminants.
//!
//! Random cells are sampled with a caller-supplied RNG, the principal axis
//! of their patches becomes the projection axis, and the threshold is read
//! off the projected values.

use nalgebra::DMatrix;
use rand::Rng;
use tracing::{debug, info};

use crate::die_pipeline::classify::discriminant::{ReferenceDiscriminant, project};
use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::Photograph;
use crate::die_pipeline::sampling::PatchSampler;

pub const DEFAULT_SAMPLE_COUNT: usize = 500;

/// Sample mean and the two leading principal axes (unit vectors).
#[derive(Debug, Clone)]
pub struct PrincipalAxes {
    pub mean: Vec<f32>,
    pub axes: [Vec<f32>; 2],
    pub singular_values: [f64; 2],
}

/// Flattened patches of `count` uniformly drawn cells.
pub fn sample_random_patches<R: Rng>(
    sampler: &PatchSampler<'_>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Vec<f32>>> {
    let lattice = sampler.photo().descriptor().lattice;
    if lattice.is_empty() {
        return Err(ReadError::TrainingError("empty lattice".to_string()));
    }
    (0..count)
        .map(|_| {
            let row = rng.random_range(0..lattice.rows);
            let col = rng.random_range(0..lattice.cols);
            sampler.sample(row, col).map(|p| p.into_values())
        })
        .collect()
}

pub fn principal_axes(samples: &[Vec<f32>]) -> Result<PrincipalAxes> {
    let n = samples.len();
    let dim = samples.first().map_or(0, Vec::len);
    if n < 2 || dim < 2 {
        return Err(ReadError::TrainingError(format!("need at least 2 samples of 2 values, got {n} of {dim}")));
    }
    if samples.iter().any(|s| s.len() != dim) {
        return Err(ReadError::TrainingError("samples differ in length".to_string()));
    }

    let mut mean = vec![0.0f64; dim];
    for s in samples {
        for (m, &v) in mean.iter_mut().zip(s) {
            *m += v as f64;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let centered = DMatrix::from_fn(n, dim, |i, j| samples[i][j] as f64 - mean[j]);
    let svd = centered.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| ReadError::TrainingError("SVD did not converge".to_string()))?;
    if v_t.nrows() < 2 {
        return Err(ReadError::TrainingError("fewer than two principal axes".to_string()));
    }

    let axis = |k: usize| v_t.row(k).iter().map(|&v| v as f32).collect::<Vec<_>>();
    debug!("Leading singular values: {:.3}, {:.3}", svd.singular_values[0], svd.singular_values[1]);

    Ok(PrincipalAxes {
        mean: mean.into_iter().map(|m| m as f32).collect(),
        axes: [axis(0), axis(1)],
        singular_values: [svd.singular_values[0], svd.singular_values[1]],
    })
}

/// Projections of `samples` onto `axis` around `mean`.
pub fn projections(samples: &[Vec<f32>], mean: &[f32], axis: &[f32]) -> Vec<f32> {
    samples.iter().map(|s| project(s, mean, axis)).collect()
}

/// Midpoint of the widest gap between consecutive sorted projections.
pub fn widest_gap_threshold(projections: &[f32]) -> Option<f32> {
    let mut sorted: Vec<f32> = projections.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f32::total_cmp);
    sorted
        .windows(2)
        .max_by(|a, b| (a[1] - a[0]).total_cmp(&(b[1] - b[0])))
        .map(|w| (w[0] + w[1]) / 2.0)
}

impl ReferenceDiscriminant {
    /// Builds a discriminant from the first principal axis of `samples`.
    /// Without a threshold, the widest gap in the projections is used.
    pub fn train(samples: &[Vec<f32>], radius: usize, normalize: bool, threshold: Option<f32>) -> Result<Self> {
        let pca = principal_axes(samples)?;
        let [axis, _] = pca.axes;
        let threshold = match threshold {
            Some(t) => t,
            None => widest_gap_threshold(&projections(samples, &pca.mean, &axis))
                .ok_or_else(|| ReadError::TrainingError("no threshold found".to_string()))?,
        };
        info!(samples = samples.len(), threshold, "Trained reference discriminant");
        ReferenceDiscriminant::new(radius, normalize, pca.mean, axis, threshold)
    }

    /// Samples the photograph with `rng` and trains on the result.
    pub fn train_on_photo<R: Rng>(
        photo: &Photograph,
        radius: usize,
        normalize: bool,
        count: usize,
        threshold: Option<f32>,
        rng: &mut R,
    ) -> Result<Self> {
        let sampler = PatchSampler::new(photo, radius, normalize);
        let samples = sample_random_patches(&sampler, count, rng)?;
        Self::train(&samples, sampler.radius(), normalize, threshold)
    }
}
