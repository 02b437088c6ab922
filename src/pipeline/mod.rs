pub mod run;
pub mod summary;

pub use run::{Pipeline, PipelineError};
pub use summary::RunSummary;
