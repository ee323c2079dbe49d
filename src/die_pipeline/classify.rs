//! Cell classification module
//!
//! Two strategies turn sampled patches into bits: a fixed linear
//! discriminant applied cell by cell, and per-tile two-class clustering for
//! photographs the discriminant does not transfer to. Which one applies is
//! an explicit per-photograph choice.

pub mod discriminant;
pub mod cluster;
pub mod training;

use serde::{Deserialize, Serialize};

use crate::die_pipeline::common::{BitMatrix, CancelFlag};
use crate::die_pipeline::common::error::Result;
use crate::die_pipeline::photo::Photograph;

pub use discriminant::{ReferenceDiscriminant, classify};
pub use cluster::{
    ClusterConfig, ClusterReading, Exemplars, KMeansOutcome, OutlierRanking, RankedCell, TileReading,
    classify_tile, read_with_clusters, two_means,
};
pub use training::{DEFAULT_SAMPLE_COUNT, PrincipalAxes, principal_axes, projections, sample_random_patches, widest_gap_threshold};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationStrategy {
    Discriminant(ReferenceDiscriminant),
    TileCluster(ClusterConfig),
}

impl Default for ClassificationStrategy {
    fn default() -> Self {
        ClassificationStrategy::TileCluster(ClusterConfig::default())
    }
}

/// Raw classifier output for one photograph, before overrides.
#[derive(Debug, Clone)]
pub struct Reading {
    pub bits: BitMatrix,
    /// Only tile clustering ranks its cells.
    pub ranking: Option<OutlierRanking>,
}

impl ClassificationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ClassificationStrategy::Discriminant(_) => "discriminant",
            ClassificationStrategy::TileCluster(_) => "tile_cluster",
        }
    }

    pub fn read(&self, photo: &Photograph, cancel: &CancelFlag) -> Result<Reading> {
        match self {
            ClassificationStrategy::Discriminant(d) => Ok(Reading {
                bits: d.read_bits(photo, cancel)?,
                ranking: None,
            }),
            ClassificationStrategy::TileCluster(config) => {
                let reading = read_with_clusters(photo, config, cancel)?;
                Ok(Reading { bits: reading.bits, ranking: Some(reading.ranking) })
            }
        }
    }
}
