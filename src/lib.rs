pub mod die_pipeline;
pub mod logger;
