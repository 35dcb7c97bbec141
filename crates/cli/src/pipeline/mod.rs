//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{InputSpec, Pipeline, PipelineConfig};
pub use stats::RunSummary;
