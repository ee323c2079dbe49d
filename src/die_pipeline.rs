//! Die photograph to ROM bitmap pipeline
//!
//! This module turns a calibrated photograph of a mask ROM array into a
//! bit matrix: photograph loading and feature extraction, lattice geometry,
//! patch sampling, classification, manual overrides, merging and export.

pub mod common;
pub mod photo;
pub mod geometry;
pub mod sampling;
pub mod classify;
pub mod overrides;
pub mod export;
pub mod report;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use common::{
    CancelFlag,
    BitMatrix,
    ReadError,
    Result,
};

pub use photo::{
    FeatureMap,
    ImageCrateReader,
    Photograph,
    PhotoReader,
    RawLoaderReader,
    RgbImageData,
};

pub use geometry::{
    CalibrationDescriptor,
    Lattice,
    Point,
    cell_to_pixel,
};

pub use sampling::{
    Patch,
    PatchSampler,
};

pub use classify::{
    ClassificationStrategy,
    ClusterConfig,
    Exemplars,
    OutlierRanking,
    ReferenceDiscriminant,
    TileReading,
};

pub use overrides::OverrideTable;

pub use export::{
    DumpLayout,
    dump,
    merge,
};

pub use report::{
    ReportWriter,
    StandardTiffReportWriter,
    TiffCompression,
};

pub use pipeline::{
    PipelineTimings,
    ReadConfig,
    ReadConfigBuilder,
    RomRead,
    RomReadPipeline,
};
