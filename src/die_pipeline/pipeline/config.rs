//! Read job configuration

use tracing::warn;

use crate::die_pipeline::classify::{ClassificationStrategy, ClusterConfig};
use crate::die_pipeline::export::DumpLayout;
use crate::die_pipeline::overrides::OverrideTable;
use crate::die_pipeline::report::TiffCompression;

/// Configuration for reading one photograph (or a merged pair)
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// How cells are turned into bits
    pub strategy: ClassificationStrategy,
    /// Whether the decoded size must match the descriptor
    pub validate_dimensions: bool,
    /// Corrections applied after classification (and after merging)
    pub overrides: OverrideTable,
    /// Which lattice rows go to the text dump
    pub dump_layout: DumpLayout,
    /// Compression of TIFF reports
    pub compression: TiffCompression,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            strategy: ClassificationStrategy::default(),
            validate_dimensions: true,
            overrides: OverrideTable::new(),
            dump_layout: DumpLayout::default(),
            compression: TiffCompression::default(),
        }
    }
}

impl ReadConfig {
    pub fn builder() -> ReadConfigBuilder {
        ReadConfigBuilder::default()
    }
}

/// Builder for ReadConfig
///
/// `radius`, `normalize` and `tile_size` tune tile clustering. A reference
/// discriminant was trained for one radius and normalization, so they are
/// ignored when the strategy is a discriminant.
#[derive(Default)]
pub struct ReadConfigBuilder {
    strategy: Option<ClassificationStrategy>,
    radius: Option<usize>,
    normalize: Option<bool>,
    tile_size: Option<(usize, usize)>,
    validate_dimensions: Option<bool>,
    overrides: Option<OverrideTable>,
    dump_layout: Option<DumpLayout>,
    compression: Option<TiffCompression>,
}

impl ReadConfigBuilder {
    pub fn strategy(mut self, strategy: ClassificationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn radius(mut self, radius: usize) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn tile_size(mut self, rows: usize, cols: usize) -> Self {
        self.tile_size = Some((rows, cols));
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn dump_layout(mut self, layout: DumpLayout) -> Self {
        self.dump_layout = Some(layout);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn build(self) -> ReadConfig {
        let default = ReadConfig::default();
        let mut strategy = self.strategy.unwrap_or(default.strategy);

        match &mut strategy {
            ClassificationStrategy::TileCluster(cluster) => {
                apply_cluster_settings(cluster, self.radius, self.normalize, self.tile_size);
            }
            ClassificationStrategy::Discriminant(_) => {
                if self.radius.is_some() || self.normalize.is_some() || self.tile_size.is_some() {
                    warn!("Radius, normalization and tile size are fixed by the discriminant; ignoring");
                }
            }
        }

        ReadConfig {
            strategy,
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            overrides: self.overrides.unwrap_or(default.overrides),
            dump_layout: self.dump_layout.unwrap_or(default.dump_layout),
            compression: self.compression.unwrap_or(default.compression),
        }
    }
}

fn apply_cluster_settings(
    cluster: &mut ClusterConfig,
    radius: Option<usize>,
    normalize: Option<bool>,
    tile_size: Option<(usize, usize)>,
) {
    if radius.is_some() {
        cluster.radius = radius;
    }
    if let Some(normalize) = normalize {
        cluster.normalize = normalize;
    }
    if let Some((rows, cols)) = tile_size {
        cluster.tile_rows = rows;
        cluster.tile_cols = cols;
    }
}
