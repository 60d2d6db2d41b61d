//! Build a Dockerfile into an image and drop into an interactive container
//! with a host directory bind-mounted, restoring the terminal on every exit
//! path.

pub mod build;
pub mod config;
pub mod docker;
pub mod error;
pub mod pipeline;
pub mod session;

pub use error::{LabError, PreconditionError};
