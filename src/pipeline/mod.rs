pub mod commands;
pub mod orchestrator;
mod types;

pub use orchestrator::{execute, prepare, run};
pub use types::{PipelineInput, RunOutcome, SessionPlan};
