use std::path::PathBuf;

use crate::build::BuildError;
use crate::docker::EngineError;
use crate::session::SessionError;

/// A run cannot start: detected before any engine call.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("mount source does not exist: {0}")]
    MountMissing(PathBuf),

    #[error("mount source is not a directory: {0}")]
    MountNotADirectory(PathBuf),

    #[error("cannot resolve mount source {path}: {source}")]
    MountUnresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that ends a run with a non-zero exit status.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("container engine unavailable: {0}")]
    Engine(#[from] EngineError),

    #[error("interrupted")]
    Interrupted,
}
