//! Read orchestration
//!
//! Chains loading, classification, merging and overrides for one job, with
//! per-stage spans and timings, behind swappable photograph readers and
//! report writers.

mod config;
mod timing;
mod orchestrator;


pub use config::{ReadConfig, ReadConfigBuilder};
pub use timing::{PipelineTimings, StepTiming, Timer};
pub use orchestrator::{RomRead, RomReadPipeline};
