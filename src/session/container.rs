use std::io;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::SessionError;
use super::relay::{relay_input, relay_output};
use super::signals::WindowChanges;
use super::terminal::{RawModeGuard, Terminal};
use crate::docker::{
    AttachInput, AttachOutput, Attachment, CancelToken, ContainerSpec, Engine, EngineError,
    LogStream, normalize_tag,
};

/// How long to wait for the input relay to hand back the write half after
/// cancellation before abandoning it.
const INPUT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A detached client (detach keys) leaves the container running, so the exit
/// status is only waited for briefly.
const EXIT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the streaming phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    RemoteClosed,
    Failed(String),
    Interrupted,
}

/// Outcome of a container session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub container_id: String,
    pub end: StreamEnd,
    pub exit_code: Option<i64>,
}

/// Local byte streams wired to the container.
pub struct SessionIo<R, W, E> {
    pub stdin: R,
    pub stdout: W,
    pub stderr: E,
}

/// A created container with its hijacked connection.
///
/// [`close`](Self::close) consumes the handle, so the connection is shut down
/// at most once; dropping the handle without closing drops the connection.
pub struct SessionHandle {
    container_id: String,
    input: Option<AttachInput>,
    output: AttachOutput,
}

impl SessionHandle {
    fn new(container_id: String, attachment: Attachment) -> Self {
        Self {
            container_id,
            input: Some(attachment.input),
            output: attachment.output,
        }
    }

    /// Shut the write half down. A write half lost to an aborted input relay
    /// was already dropped, so there is nothing left to shut down.
    pub async fn close(mut self) -> io::Result<()> {
        debug!(container = %self.container_id, "closing attach stream");
        match self.input.take() {
            Some(mut input) => input.shutdown().await,
            None => {
                warn!(
                    container = %self.container_id,
                    "attach stream was dropped without shutdown"
                );
                Ok(())
            }
        }
    }
}

/// Drives one container from creation to teardown.
pub struct ContainerSession<'a, E, T: ?Sized> {
    engine: &'a E,
    terminal: &'a T,
    platform: Option<String>,
    built_image: Option<String>,
}

impl<'a, E, T> ContainerSession<'a, E, T>
where
    E: Engine,
    T: Terminal + ?Sized,
{
    pub fn new(engine: &'a E, terminal: &'a T) -> Self {
        Self {
            engine,
            terminal,
            platform: None,
            built_image: None,
        }
    }

    /// Platform requested when a missing image has to be pulled.
    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    /// Mark `image` as built locally. A missing local build is never pulled:
    /// a registry image of the same name is a different image.
    pub fn with_built_image(mut self, image: impl Into<String>) -> Self {
        self.built_image = Some(image.into());
        self
    }

    /// Run an interactive session: create, attach, start, relay the terminal
    /// until the remote side closes or `cancel` fires, then close the stream
    /// and restore the terminal.
    pub async fn run<R, W, X>(
        &self,
        spec: &ContainerSpec,
        io: SessionIo<R, W, X>,
        cancel: &CancelToken,
    ) -> Result<SessionReport, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
        X: AsyncWrite + Unpin,
    {
        let SessionIo {
            stdin, mut stdout, ..
        } = io;

        let id = self.create(spec, &mut stdout).await?;

        debug!(container = %id, "attaching");
        let attachment = match self.engine.attach_container(&id).await {
            Ok(attachment) => attachment,
            Err(e) => {
                self.discard(&id).await;
                return Err(SessionError::Attach(e));
            }
        };
        let mut handle = SessionHandle::new(id.clone(), attachment);

        if let Err(e) = self.engine.start_container(&id).await {
            if let Err(close_err) = handle.close().await {
                warn!(container = %id, error = %close_err, "failed to close attach stream");
            }
            self.discard(&id).await;
            return Err(SessionError::Start(e));
        }
        info!(container = %id, "container started");

        let interactive_tty = spec.tty && self.terminal.is_terminal();
        if interactive_tty {
            self.sync_size(&id).await;
        }

        let guard = if self.terminal.is_terminal() {
            match RawModeGuard::acquire(self.terminal) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    warn!(error = %e, "failed to enable raw mode; continuing in cooked mode");
                    None
                }
            }
        } else {
            warn!("stdin is not a terminal; continuing without raw mode");
            None
        };

        let end = self
            .stream(&mut handle, stdin, &mut stdout, cancel, interactive_tty)
            .await;

        // Both releases run before either failure is reported.
        let closed = handle.close().await;
        let restored = guard.map_or(Ok(()), RawModeGuard::release);
        closed.map_err(SessionError::Close)?;
        restored.map_err(SessionError::Terminal)?;

        let exit_code = match end {
            StreamEnd::RemoteClosed => self.exit_status(&id).await,
            _ => None,
        };
        info!(container = %id, ?end, ?exit_code, "session closed");

        Ok(SessionReport {
            container_id: id,
            end,
            exit_code,
        })
    }

    /// Run without attaching: create, start, wait for exit, then copy the
    /// container's logs to `stdout`/`stderr`.
    ///
    /// The daemon never auto-removes a batch container, since its logs are
    /// read after exit; `auto_remove` is honoured by removing it afterwards.
    pub async fn run_to_completion<R, W, X>(
        &self,
        spec: &ContainerSpec,
        io: SessionIo<R, W, X>,
        cancel: &CancelToken,
    ) -> Result<SessionReport, SessionError>
    where
        W: AsyncWrite + Unpin,
        X: AsyncWrite + Unpin,
    {
        let SessionIo {
            mut stdout,
            mut stderr,
            ..
        } = io;

        let create_spec = ContainerSpec {
            auto_remove: false,
            ..spec.clone()
        };
        let id = self.create(&create_spec, &mut stdout).await?;
        if let Err(e) = self.engine.start_container(&id).await {
            self.discard(&id).await;
            return Err(SessionError::Start(e));
        }
        info!(container = %id, "container started");

        let exit_code = tokio::select! {
            status = self.engine.wait_container(&id) => status.map_err(SessionError::Wait)?,
            _ = cancel.cancelled() => {
                return Ok(SessionReport {
                    container_id: id.clone(),
                    end: StreamEnd::Interrupted,
                    exit_code: None,
                });
            }
        };

        let mut logs = self.engine.container_logs(&id);
        while let Some(chunk) = logs.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(container = %id, error = %e, "failed to read container logs");
                    break;
                }
            };
            let written = match chunk.stream {
                LogStream::Stdout => stdout.write_all(&chunk.bytes).await,
                LogStream::Stderr => stderr.write_all(&chunk.bytes).await,
            };
            written.map_err(SessionError::Output)?;
        }
        drop(logs);
        stdout.flush().await.map_err(SessionError::Output)?;
        stderr.flush().await.map_err(SessionError::Output)?;

        info!(container = %id, exit_code, "container exited");
        if spec.auto_remove {
            self.discard(&id).await;
        }
        Ok(SessionReport {
            container_id: id,
            end: StreamEnd::RemoteClosed,
            exit_code: Some(exit_code),
        })
    }

    /// Create the container, pulling its image once if the engine reports it
    /// missing and it is not the local build.
    async fn create<W>(&self, spec: &ContainerSpec, console: &mut W) -> Result<String, SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let id = match self.engine.create_container(spec).await {
            Ok(id) => id,
            Err(EngineError::ImageNotFound(image)) if !self.is_built_image(&image) => {
                info!(%image, "image not present locally, pulling");
                self.pull(&image, console).await?;
                self.engine
                    .create_container(spec)
                    .await
                    .map_err(SessionError::Create)?
            }
            Err(e) => return Err(SessionError::Create(e)),
        };
        info!(container = %id, image = %spec.image, "container created");
        Ok(id)
    }

    fn is_built_image(&self, image: &str) -> bool {
        self.built_image
            .as_deref()
            .is_some_and(|built| normalize_tag(built) == normalize_tag(image))
    }

    /// Remove a container this session created. Best effort.
    async fn discard(&self, id: &str) {
        match self.engine.remove_container(id).await {
            Ok(()) => debug!(container = %id, "container removed"),
            Err(e) => warn!(container = %id, error = %e, "failed to remove container"),
        }
    }

    async fn pull<W>(&self, image: &str, console: &mut W) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut progress = self.engine.pull_image(image, self.platform.as_deref());
        while let Some(line) = progress.next().await {
            let line = line.map_err(SessionError::Pull)?;
            if line.is_empty() {
                continue;
            }
            console
                .write_all(format!("{line}\n").as_bytes())
                .await
                .map_err(SessionError::Output)?;
        }
        drop(progress);
        console.flush().await.map_err(SessionError::Output)
    }

    async fn stream<R, W>(
        &self,
        handle: &mut SessionHandle,
        stdin: R,
        stdout: &mut W,
        cancel: &CancelToken,
        follow_resizes: bool,
    ) -> StreamEnd
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let id = handle.container_id.clone();
        let input_cancel = CancelToken::new();
        let input_task = handle
            .input
            .take()
            .map(|writer| tokio::spawn(relay_input(stdin, writer, input_cancel.clone())));

        let mut resizes = WindowChanges::new(follow_resizes);
        let end = {
            let outbound = relay_output(&mut handle.output, stdout);
            tokio::pin!(outbound);
            loop {
                tokio::select! {
                    result = &mut outbound => break match result {
                        Ok(bytes) => {
                            debug!(container = %id, bytes, "remote closed the stream");
                            StreamEnd::RemoteClosed
                        }
                        Err(e) => {
                            debug!(container = %id, error = %e, "output relay failed");
                            StreamEnd::Failed(e.to_string())
                        }
                    },
                    _ = cancel.cancelled() => break StreamEnd::Interrupted,
                    Some(()) = resizes.recv() => self.sync_size(&id).await,
                }
            }
        };

        input_cancel.cancel();
        if let Some(mut task) = input_task {
            match tokio::time::timeout(INPUT_JOIN_TIMEOUT, &mut task).await {
                Ok(Ok((writer, result))) => {
                    match result {
                        Ok(bytes) => debug!(container = %id, bytes, "input relay finished"),
                        Err(e) => debug!(container = %id, error = %e, "input relay failed"),
                    }
                    handle.input = Some(writer);
                }
                Ok(Err(e)) => warn!(container = %id, error = %e, "input relay task failed"),
                Err(_) => {
                    warn!(
                        container = %id,
                        "input relay did not stop in time; aborting it and dropping the write half"
                    );
                    task.abort();
                }
            }
        }

        end
    }

    /// Match the container TTY to the local terminal. Best effort.
    async fn sync_size(&self, id: &str) {
        let (columns, rows) = match self.terminal.size() {
            Ok(size) => size,
            Err(e) => {
                debug!(error = %e, "terminal size unavailable");
                return;
            }
        };
        if let Err(e) = self.engine.resize_tty(id, columns, rows).await {
            warn!(container = %id, error = %e, "failed to resize container tty");
        }
    }

    async fn exit_status(&self, id: &str) -> Option<i64> {
        match tokio::time::timeout(EXIT_STATUS_TIMEOUT, self.engine.wait_container(id)).await {
            Ok(Ok(code)) => Some(code),
            Ok(Err(e)) => {
                debug!(container = %id, error = %e, "exit status unavailable");
                None
            }
            Err(_) => {
                debug!(container = %id, "container still running after the stream closed");
                None
            }
        }
    }
}
