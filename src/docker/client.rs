//! [`Engine`] implementation backed by the Docker Engine API.

use bollard::Docker;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    LogsOptions, RemoveContainerOptions, ResizeContainerTtyOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{BuildImageOptions, CreateImageOptions, ListImagesOptions};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use futures_util::stream::{BoxStream, StreamExt};
use tracing::debug;

use super::engine::{Attachment, Engine, EngineError, split_reference};
use super::types::{ContainerSpec, LogChunk, LogStream, MountType};

/// Docker daemon connection.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform default socket, then
    /// negotiate the API version with the daemon.
    pub async fn connect() -> Result<Self, EngineError> {
        let docker = Docker::connect_with_defaults()?.negotiate_version().await?;
        debug!(version = ?docker.client_version(), "connected to docker");
        Ok(Self { docker })
    }
}

impl Engine for DockerEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<String>, EngineError> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await?;
        Ok(images.into_iter().flat_map(|image| image.repo_tags).collect())
    }

    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        platform: Option<&'a str>,
    ) -> BoxStream<'a, Result<String, EngineError>> {
        let (repo, tag) = split_reference(image);
        let options = CreateImageOptions {
            from_image: repo.to_string(),
            tag: tag.to_string(),
            platform: platform.unwrap_or_default().to_string(),
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .map(|item| {
                let info = item?;
                let mut line = info.status.unwrap_or_default();
                if let Some(progress) = info.progress {
                    line.push(' ');
                    line.push_str(&progress);
                }
                Ok(line)
            })
            .boxed()
    }

    fn build_image<'a>(
        &'a self,
        context: Vec<u8>,
        tag: &'a str,
        dockerfile: &'a str,
    ) -> BoxStream<'a, Result<String, EngineError>> {
        let options = BuildImageOptions {
            dockerfile: dockerfile.to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };
        self.docker
            .build_image(options, None, Some(context.into()))
            .map(|item| {
                let info = item?;
                if let Some(error) = info.error {
                    return Err(EngineError::Daemon(error));
                }
                Ok(info.stream.or(info.status).unwrap_or_default())
            })
            .boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let mounts = spec
            .mounts
            .iter()
            .map(|mount| Mount {
                typ: Some(match mount.kind {
                    MountType::Bind => MountTypeEnum::BIND,
                }),
                source: Some(mount.host_path.to_string_lossy().into_owned()),
                target: Some(mount.container_path.clone()),
                ..Default::default()
            })
            .collect();

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            tty: Some(spec.tty),
            open_stdin: Some(spec.stdin_attached),
            attach_stdin: Some(spec.stdin_attached),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(HostConfig {
                mounts: Some(mounts),
                auto_remove: Some(spec.auto_remove),
                ..Default::default()
            }),
            ..Default::default()
        };

        match self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
        {
            Ok(response) => {
                for warning in &response.warnings {
                    tracing::warn!(container = %response.id, "{warning}");
                }
                Ok(response.id)
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(EngineError::ImageNotFound(spec.image.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn attach_container(&self, id: &str) -> Result<Attachment, EngineError> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            detach_keys: None,
        };
        let AttachContainerResults { output, input } = self
            .docker
            .attach_container(id, Some(options))
            .await
            .map_err(|e| not_found(e, id))?;

        let output = output
            .map(|frame| {
                frame
                    .map(|log| log.into_bytes().to_vec())
                    .map_err(EngineError::from)
            })
            .boxed();
        Ok(Attachment { output, input })
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| not_found(e, id))
    }

    async fn resize_tty(&self, id: &str, columns: u16, rows: u16) -> Result<(), EngineError> {
        let options = ResizeContainerTtyOptions {
            width: columns,
            height: rows,
        };
        self.docker
            .resize_container_tty(id, options)
            .await
            .map_err(|e| not_found(e, id))
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut waits = self.docker.wait_container(id, Some(options));
        match waits.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits surface as an error carrying the code.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(not_found(e, id)),
            None => Err(EngineError::Daemon(format!(
                "wait for container {id} ended without a status"
            ))),
        }
    }

    fn container_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<LogChunk, EngineError>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        self.docker
            .logs(id, Some(options))
            .filter_map(|frame| async move {
                match frame {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        Some(Ok(LogChunk {
                            stream: LogStream::Stdout,
                            bytes: message.to_vec(),
                        }))
                    }
                    Ok(LogOutput::StdErr { message }) => Some(Ok(LogChunk {
                        stream: LogStream::Stderr,
                        bytes: message.to_vec(),
                    })),
                    Ok(LogOutput::StdIn { .. }) => None,
                    Err(e) => Some(Err(e.into())),
                }
            })
            .boxed()
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| not_found(e, id))
    }
}

fn not_found(error: BollardError, id: &str) -> EngineError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => EngineError::ContainerNotFound(id.to_string()),
        other => other.into(),
    }
}
