use std::path::PathBuf;

use crate::build::BuildSpec;
use crate::config::Config;
use crate::docker::ContainerSpec;
use crate::session::SessionReport;

/// Input to a run.
pub struct PipelineInput {
    pub config: Config,
    /// Directory relative paths in the config are resolved against.
    pub work_dir: PathBuf,
}

/// A validated run, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub build: BuildSpec,
    /// Container to create; its image is replaced by the built tag.
    pub container: ContainerSpec,
    pub interactive: bool,
    pub platform: Option<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub image_tag: String,
    pub report: SessionReport,
}
