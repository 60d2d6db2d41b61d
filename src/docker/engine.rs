use std::future::Future;
use std::pin::Pin;

use futures_util::stream::BoxStream;
use tokio::io::AsyncWrite;

use super::types::{ContainerSpec, LogChunk};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("engine reported: {0}")]
    Daemon(String),

    #[error("docker API error: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write half of a hijacked connection.
pub type AttachInput = Pin<Box<dyn AsyncWrite + Send>>;

/// Read half of a hijacked connection.
pub type AttachOutput = BoxStream<'static, Result<Vec<u8>, EngineError>>;

/// The duplex stream returned by an attach call.
pub struct Attachment {
    pub output: AttachOutput,
    pub input: AttachInput,
}

/// Operations consumed from a container engine.
///
/// [`DockerEngine`](super::DockerEngine) talks to a real daemon; tests
/// substitute an instrumented fake.
pub trait Engine: Send + Sync {
    /// Check that the engine answers.
    fn ping(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Every `repo:tag` known to the local image store.
    fn list_images(&self) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;

    /// Pull `image`, yielding one status line per progress message.
    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        platform: Option<&'a str>,
    ) -> BoxStream<'a, Result<String, EngineError>>;

    /// Build `context` (a tar archive) as `tag`, using `dockerfile` inside the
    /// archive. Yields build output text until the build finishes.
    fn build_image<'a>(
        &'a self,
        context: Vec<u8>,
        tag: &'a str,
        dockerfile: &'a str,
    ) -> BoxStream<'a, Result<String, EngineError>>;

    /// Returns the new container's id. A missing image is reported as
    /// [`EngineError::ImageNotFound`].
    fn create_container(
        &self,
        spec: &ContainerSpec,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;

    fn attach_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Attachment, EngineError>> + Send;

    fn start_container(&self, id: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn resize_tty(
        &self,
        id: &str,
        columns: u16,
        rows: u16,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Block until the container stops and return its exit status.
    fn wait_container(&self, id: &str) -> impl Future<Output = Result<i64, EngineError>> + Send;

    fn container_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<LogChunk, EngineError>>;

    /// Force-remove a container.
    fn remove_container(&self, id: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Verify that the engine is reachable.
pub async fn ensure_available<E: Engine>(engine: &E) -> Result<(), EngineError> {
    engine.ping().await
}

/// Split an image reference into repository and tag, defaulting the tag to
/// `latest`. A `:` inside the registry host (`host:5000/img`) is not a tag.
pub fn split_reference(reference: &str) -> (&str, &str) {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&reference[..split], &reference[split + 1..])
        }
        None => (reference, "latest"),
    }
}

/// Canonical `repo:tag` form, as reported by the image store.
pub fn normalize_tag(reference: &str) -> String {
    let (repo, tag) = split_reference(reference);
    format!("{repo}:{tag}")
}
