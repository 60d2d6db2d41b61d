use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::{BuildArchive, BuildError};
use crate::docker::{Engine, normalize_tag};

/// What to build and how to tag it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    dockerfile: PathBuf,
    tag: String,
}

impl BuildSpec {
    pub fn new(dockerfile: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            dockerfile: dockerfile.into(),
            tag: tag.into(),
        }
    }

    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Builds single-Dockerfile images through an [`Engine`].
pub struct ImageBuilder<'a, E> {
    engine: &'a E,
}

impl<'a, E: Engine> ImageBuilder<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Build `spec`, streaming engine output to `console`.
    ///
    /// Returns the canonical `repo:tag` once the engine lists it. Nothing is
    /// retried: a failed build may have left partial layers behind.
    pub async fn build<W>(&self, spec: &BuildSpec, console: &mut W) -> Result<String, BuildError>
    where
        W: AsyncWrite + Unpin,
    {
        let archive = BuildArchive::from_dockerfile(spec.dockerfile())?;
        let dockerfile = archive.entry_name().to_string();
        info!(
            dockerfile = %spec.dockerfile().display(),
            tag = spec.tag(),
            context_bytes = archive.len(),
            "building image"
        );

        let mut output = self
            .engine
            .build_image(archive.into_bytes(), spec.tag(), &dockerfile);
        while let Some(line) = output.next().await {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            console
                .write_all(line.as_bytes())
                .await
                .map_err(BuildError::Output)?;
            if !line.ends_with('\n') {
                console.write_all(b"\n").await.map_err(BuildError::Output)?;
            }
        }
        drop(output);
        console.flush().await.map_err(BuildError::Output)?;

        let tag = normalize_tag(spec.tag());
        let images = self.engine.list_images().await?;
        debug!(count = images.len(), "listed local images");
        if !images.iter().any(|image| *image == tag) {
            return Err(BuildError::ImageMissing(tag));
        }

        info!(%tag, "build complete");
        Ok(tag)
    }
}
