// Container engine access — engine trait, Docker API client, cancellation.

pub mod client;
pub mod engine;
pub mod types;

pub use client::DockerEngine;
pub use engine::{
    AttachInput, AttachOutput, Attachment, Engine, EngineError, ensure_available, normalize_tag,
    split_reference,
};
pub use types::{CancelToken, ContainerSpec, LogChunk, LogStream, MountSpec, MountType};
