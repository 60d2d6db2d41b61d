// Image building — Dockerfile packaging and the engine build call.

pub mod archive;
pub mod builder;

use std::path::PathBuf;

use crate::docker::EngineError;

pub use archive::BuildArchive;
pub use builder::{BuildSpec, ImageBuilder};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cannot open Dockerfile {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dockerfile {0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("failed to write build context: {0}")]
    Archive(#[source] std::io::Error),

    #[error("image build failed: {0}")]
    Engine(#[from] EngineError),

    #[error("failed to write build output: {0}")]
    Output(#[source] std::io::Error),

    #[error("build finished but image {0} is not in the local image store")]
    ImageMissing(String),
}
