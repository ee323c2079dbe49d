//! Two-class clustering of lattice tiles.
//!
//! Used where a fixed discriminant does not transfer to a photograph: each
//! tile is clustered on its own, seeded from two exemplar cells whose bit
//! values are known.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::die_pipeline::common::{BitMatrix, CancelFlag};
use crate::die_pipeline::common::error::Result;
use crate::die_pipeline::geometry::Tile;
use crate::die_pipeline::photo::Photograph;
use crate::die_pipeline::sampling::PatchSampler;

/// Cells known to hold a 0 and a 1 on the photograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplars {
    pub zero: (usize, usize),
    pub one: (usize, usize),
}

impl Default for Exemplars {
    fn default() -> Self {
        Self { zero: (2, 1), one: (1, 1) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Patch radius; `None` scales it to the photograph width.
    pub radius: Option<usize>,
    pub normalize: bool,
    /// Centroid updates to run. Ten reproduces earlier reads.
    pub iterations: usize,
    /// Stop early once the squared centroid displacement drops below this.
    pub convergence_epsilon: Option<f64>,
    pub exemplars: Exemplars,
    pub tile_rows: usize,
    pub tile_cols: usize,
    /// Length of each ranking list kept per tile.
    pub ranking_len: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius: None,
            normalize: false,
            iterations: 10,
            convergence_epsilon: None,
            exemplars: Exemplars::default(),
            tile_rows: 16,
            tile_cols: 16,
            ranking_len: 50,
        }
    }
}

/// A cell and how much nearer it is to its own centroid than to the other
/// one (difference of squared distances, never negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCell {
    pub row: usize,
    pub col: usize,
    pub margin: f64,
}

/// Per class, the most confidently clustered cells first; plus the cells
/// with the smallest margins, which are the ones worth checking by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierRanking {
    pub confident: [Vec<RankedCell>; 2],
    pub borderline: Vec<RankedCell>,
}

impl OutlierRanking {
    fn extend(&mut self, other: OutlierRanking) {
        let [zero, one] = other.confident;
        self.confident[0].extend(zero);
        self.confident[1].extend(one);
        self.borderline.extend(other.borderline);
    }
}

/// Result of clustering one tile.
#[derive(Debug, Clone)]
pub struct TileReading {
    pub tile: Tile,
    /// Tile-local labels, `tile.rows.len()` by `tile.cols.len()`.
    pub labels: BitMatrix,
    pub ranking: OutlierRanking,
    /// Squared centroid displacement of the last update.
    pub displacement: f64,
    pub iterations: usize,
}

/// Whole-lattice result of tile clustering.
#[derive(Debug, Clone)]
pub struct ClusterReading {
    pub bits: BitMatrix,
    pub ranking: OutlierRanking,
    pub max_displacement: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansOutcome {
    pub centroids: [Vec<f64>; 2],
    pub displacement: f64,
    pub iterations: usize,
}

fn squared_distance(sample: &[f32], centroid: &[f64]) -> f64 {
    sample.iter().zip(centroid).map(|(&s, &c)| (s as f64 - c).powi(2)).sum()
}

/// Squared distances to both centroids.
pub fn distances(sample: &[f32], centroids: &[Vec<f64>; 2]) -> [f64; 2] {
    [squared_distance(sample, &centroids[0]), squared_distance(sample, &centroids[1])]
}

/// Index of the nearer centroid; ties go to class 0.
fn nearest(d: [f64; 2]) -> usize {
    usize::from(d[1] < d[0])
}

/// Per-worker partial sums of the samples assigned to each class.
#[derive(Clone)]
struct Partial {
    sums: [Vec<f64>; 2],
    counts: [usize; 2],
}

impl Partial {
    fn new(dim: usize) -> Self {
        Self { sums: [vec![0.0; dim], vec![0.0; dim]], counts: [0, 0] }
    }

    fn add(mut self, sample: &[f32], class: usize) -> Self {
        for (s, &v) in self.sums[class].iter_mut().zip(sample) {
            *s += v as f64;
        }
        self.counts[class] += 1;
        self
    }

    fn merge(mut self, other: Partial) -> Self {
        for k in 0..2 {
            for (s, o) in self.sums[k].iter_mut().zip(&other.sums[k]) {
                *s += o;
            }
            self.counts[k] += other.counts[k];
        }
        self
    }
}

/// Two-means clustering seeded with `seeds`.
///
/// Runs `iterations` assign/update rounds, or fewer when `epsilon` is given
/// and the squared centroid displacement of a round drops below it. A class
/// left without members keeps its previous centroid.
pub fn two_means(samples: &[Vec<f32>], seeds: [Vec<f32>; 2], iterations: usize, epsilon: Option<f64>) -> KMeansOutcome {
    let dim = seeds[0].len();
    let [s0, s1] = seeds;
    let mut centroids = [
        s0.into_iter().map(f64::from).collect::<Vec<_>>(),
        s1.into_iter().map(f64::from).collect::<Vec<_>>(),
    ];
    let mut displacement = 0.0;
    let mut run = 0;

    for step in 0..iterations {
        let partial = samples
            .par_iter()
            .fold(
                || Partial::new(dim),
                |acc, sample| {
                    let class = nearest(distances(sample, &centroids));
                    acc.add(sample, class)
                },
            )
            .reduce(|| Partial::new(dim), Partial::merge);

        debug!(step, ones = partial.counts[1], "Cluster assignment");

        displacement = 0.0;
        for k in 0..2 {
            if partial.counts[k] == 0 {
                continue;
            }
            let n = partial.counts[k] as f64;
            for (c, s) in centroids[k].iter_mut().zip(&partial.sums[k]) {
                let updated = s / n;
                displacement += (updated - *c).powi(2);
                *c = updated;
            }
        }
        run += 1;

        if epsilon.is_some_and(|eps| displacement < eps) {
            break;
        }
    }

    KMeansOutcome { centroids, displacement, iterations: run }
}

/// Samples every cell of `tile`, clusters the patches and ranks the cells.
#[instrument(skip(photo, tile, config), fields(rows = ?tile.rows, cols = ?tile.cols))]
pub fn classify_tile(photo: &Photograph, tile: &Tile, config: &ClusterConfig) -> Result<TileReading> {
    let radius = config.radius.unwrap_or_else(|| photo.descriptor().default_radius());
    let sampler = PatchSampler::new(photo, radius, config.normalize);

    let cells: Vec<(usize, usize)> = tile.cells().collect();
    let samples: Vec<Vec<f32>> = cells
        .par_iter()
        .map(|&(r, c)| sampler.sample(r, c).map(|p| p.into_values()))
        .collect::<Result<_>>()?;

    let (zr, zc) = config.exemplars.zero;
    let (or, oc) = config.exemplars.one;
    let seeds = [
        sampler.sample(zr, zc)?.into_values(),
        sampler.sample(or, oc)?.into_values(),
    ];

    let outcome = two_means(&samples, seeds, config.iterations, config.convergence_epsilon);

    let mut labels = BitMatrix::zeros(tile.rows.len(), tile.cols.len());
    let mut ranked: [Vec<RankedCell>; 2] = [Vec::new(), Vec::new()];
    let mut all = Vec::with_capacity(cells.len());
    for (i, (&(row, col), sample)) in cells.iter().zip(&samples).enumerate() {
        let d = distances(sample, &outcome.centroids);
        let class = nearest(d);
        labels.bits_mut()[i] = class == 1;
        let cell = RankedCell { row, col, margin: d[1 - class] - d[class] };
        ranked[class].push(cell);
        all.push(cell);
    }

    for list in &mut ranked {
        list.sort_by(|a, b| b.margin.total_cmp(&a.margin));
        list.truncate(config.ranking_len);
    }
    all.sort_by(|a, b| a.margin.total_cmp(&b.margin));
    all.truncate(config.ranking_len);

    Ok(TileReading {
        tile: tile.clone(),
        labels,
        ranking: OutlierRanking { confident: ranked, borderline: all },
        displacement: outcome.displacement,
        iterations: outcome.iterations,
    })
}

/// Clusters every tile of the lattice independently, tiles in parallel.
/// The flag is polled before each tile starts.
#[instrument(skip_all, fields(photo = %photo.descriptor().name))]
pub fn read_with_clusters(photo: &Photograph, config: &ClusterConfig, cancel: &CancelFlag) -> Result<ClusterReading> {
    let lattice = photo.descriptor().lattice;
    let tiles = lattice.tiles(config.tile_rows, config.tile_cols);
    info!(tiles = tiles.len(), iterations = config.iterations, "Reading lattice with tile clustering");

    let readings: Vec<TileReading> = tiles
        .par_iter()
        .map(|tile| {
            cancel.check()?;
            classify_tile(photo, tile, config)
        })
        .collect::<Result<_>>()?;

    let mut bits = BitMatrix::zeros(lattice.rows, lattice.cols);
    let mut ranking = OutlierRanking::default();
    let mut max_displacement: f64 = 0.0;
    for reading in readings {
        for ((row, col), &bit) in reading.tile.cells().zip(reading.labels.bits()) {
            bits.set(row, col, bit);
        }
        max_displacement = max_displacement.max(reading.displacement);
        ranking.extend(reading.ranking);
    }

    debug!(max_displacement, ones = bits.count_ones(), "Tile clustering done");
    Ok(ClusterReading { bits, ranking, max_displacement })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use crate::die_pipeline::common::error::ReadError;
    use crate::die_pipeline::geometry::{CalibrationDescriptor, Lattice};
    use crate::die_pipeline::photo::FeatureMap;

    fn blob(rng: &mut StdRng, center: f32, n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|_| (0..dim).map(|_| center + rng.random_range(-1.0..1.0)).collect())
            .collect()
    }

    #[test]
    fn test_two_means_converges_on_separated_clusters() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut samples = blob(&mut rng, 0.0, 200, 9);
        samples.extend(blob(&mut rng, 20.0, 150, 9));
        // Poor seeds, both near the first blob.
        let outcome = two_means(&samples, [vec![0.5; 9], vec![3.0; 9]], 10, None);
        assert_eq!(outcome.iterations, 10);
        assert!(outcome.displacement < 1e-9, "{}", outcome.displacement);
        assert!(outcome.centroids[0].iter().all(|c| c.abs() < 0.5));
        assert!(outcome.centroids[1].iter().all(|c| (c - 20.0).abs() < 0.5));
    }

    #[test]
    fn test_two_means_stops_early_with_epsilon() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut samples = blob(&mut rng, -5.0, 50, 4);
        samples.extend(blob(&mut rng, 5.0, 50, 4));
        let outcome = two_means(&samples, [vec![-5.0; 4], vec![5.0; 4]], 10, Some(1e-12));
        assert!(outcome.iterations < 10);
    }

    #[test]
    fn test_empty_class_keeps_its_seed() {
        let samples = vec![vec![0.0, 0.0], vec![0.1, 0.0]];
        let outcome = two_means(&samples, [vec![0.0, 0.0], vec![100.0, 100.0]], 3, None);
        assert_eq!(outcome.centroids[1], vec![100.0, 100.0]);
    }

    fn striped_photo() -> Photograph {
        // Even rows bright, odd rows dark; cells every 8 px.
        let lattice = Lattice::new(6, 6);
        let mut descriptor = CalibrationDescriptor::synthetic("s.png", 56, 56, (6, 6), (8.0, 8.0), (8.0, 8.0));
        descriptor.lattice = lattice;
        let feature = FeatureMap::from_fn(56, 56, |_, y| if ((y + 4) / 8) % 2 == 0 { 50.0 } else { 0.0 });
        Photograph::from_feature_map(descriptor, feature)
    }

    #[test]
    fn test_tile_labels_follow_exemplars() {
        let photo = striped_photo();
        // Row 1 is bright, row 2 dark.
        let config = ClusterConfig { radius: Some(2), ..ClusterConfig::default() };
        let reading = classify_tile(&photo, &Tile::new(0..6, 0..6), &config).unwrap();
        for r in 0..6 {
            for c in 0..6 {
                assert_eq!(reading.labels[(r, c)], r % 2 == 1, "({r}, {c})");
            }
        }
        assert_eq!(reading.ranking.confident[0].len(), 18);
        assert_eq!(reading.ranking.confident[1].len(), 18);
        assert!(reading.ranking.confident[1].iter().all(|c| c.row % 2 == 1));
        let margins: Vec<f64> = reading.ranking.borderline.iter().map(|c| c.margin).collect();
        assert!(margins.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_lattice_read_assembles_tiles() {
        let photo = striped_photo();
        let config = ClusterConfig { radius: Some(2), tile_rows: 3, tile_cols: 3, ..ClusterConfig::default() };
        let reading = read_with_clusters(&photo, &config, &CancelFlag::new()).unwrap();
        assert_eq!(reading.bits.shape(), (6, 6));
        for r in 0..6 {
            assert!(reading.bits.row(r).iter().all(|&b| b == (r % 2 == 1)), "row {r}");
        }

        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(read_with_clusters(&photo, &config, &cancel), Err(ReadError::Cancelled)));
    }
}
