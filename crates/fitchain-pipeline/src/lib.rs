pub mod config;
pub mod pipeline;
pub mod step;

pub use config::{PipelineConfig, StepConfig, StepKind};
pub use pipeline::{make_pipeline, Pipeline};
pub use step::{Step, StepRef};
