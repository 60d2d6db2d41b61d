//! Instrumented stand-ins for the container engine and the terminal.

#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncWrite;
use tokio::sync::Notify;

use labrun::config::Config;
use labrun::docker::{
    Attachment, CancelToken, ContainerSpec, Engine, EngineError, LogChunk, LogStream,
    normalize_tag,
};
use labrun::pipeline::PipelineInput;
use labrun::session::{SessionIo, Terminal, TerminalState};

pub const CONTAINER_ID: &str = "c0ffee";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    ListImages,
    Pull(String, Option<String>),
    Build { tag: String, dockerfile: String },
    Create(ContainerSpec),
    Attach(String),
    Start(String),
    Resize(u16, u16),
    Wait(String),
    Logs(String),
    Remove(String),
}

/// How the attach output stream ends after its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEnd {
    Close,
    Hang,
    Fail,
    /// Close once something has tried to write to the container.
    CloseAfterInput,
}

// ── RecordingWriter ─────────────────────────────────────────────────

/// Shared in-memory sink that counts shutdowns.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    data: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
    fail_shutdown: bool,
    stall_writes: bool,
    write_attempted: Arc<Notify>,
}

impl RecordingWriter {
    /// Shutdown is counted, then fails.
    pub fn failing_shutdown() -> Self {
        Self {
            fail_shutdown: true,
            ..Self::default()
        }
    }

    /// Writes never complete.
    pub fn stalled() -> Self {
        Self {
            stall_writes: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock().unwrap()).into_owned()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.write_attempted.notify_one();
        if self.stall_writes {
            return Poll::Pending;
        }
        self.data.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "attach socket already closed",
            )));
        }
        Poll::Ready(Ok(()))
    }
}

// ── FakeEngine ──────────────────────────────────────────────────────

pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    built: Mutex<Vec<String>>,
    build_error: Option<String>,
    drop_built_image: bool,
    image_missing_once: AtomicBool,
    attach_fails: bool,
    start_fails: bool,
    output: Vec<Vec<u8>>,
    output_end: OutputEnd,
    wait_code: i64,
    logs: Vec<LogChunk>,
    cancel_on_start: Option<CancelToken>,
    pub input: RecordingWriter,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            built: Mutex::new(Vec::new()),
            build_error: None,
            drop_built_image: false,
            image_missing_once: AtomicBool::new(false),
            attach_fails: false,
            start_fails: false,
            output: vec![b"/lab # ".to_vec()],
            output_end: OutputEnd::Close,
            wait_code: 0,
            logs: Vec::new(),
            cancel_on_start: None,
            input: RecordingWriter::default(),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The build stream reports a daemon error.
    pub fn build_error(mut self, message: &str) -> Self {
        self.build_error = Some(message.to_string());
        self
    }

    /// The build succeeds but the tag never shows up in the image list.
    pub fn drop_built_image(mut self) -> Self {
        self.drop_built_image = true;
        self
    }

    /// The first create reports the image missing.
    pub fn image_missing_once(self) -> Self {
        self.image_missing_once.store(true, Ordering::SeqCst);
        self
    }

    pub fn attach_fails(mut self) -> Self {
        self.attach_fails = true;
        self
    }

    pub fn start_fails(mut self) -> Self {
        self.start_fails = true;
        self
    }

    pub fn output(mut self, chunks: &[&str], end: OutputEnd) -> Self {
        self.output = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self.output_end = end;
        self
    }

    pub fn wait_code(mut self, code: i64) -> Self {
        self.wait_code = code;
        self
    }

    pub fn logs(mut self, chunks: &[(LogStream, &str)]) -> Self {
        self.logs = chunks
            .iter()
            .map(|(stream, text)| LogChunk {
                stream: *stream,
                bytes: text.as_bytes().to_vec(),
            })
            .collect();
        self
    }

    /// Use `writer` as the container side of the attach stream.
    pub fn input(mut self, writer: RecordingWriter) -> Self {
        self.input = writer;
        self
    }

    /// Fire `cancel` once the container has been started.
    pub fn cancel_on_start(mut self, cancel: CancelToken) -> Self {
        self.cancel_on_start = Some(cancel);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Engine for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.record(Call::Ping);
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<String>, EngineError> {
        self.record(Call::ListImages);
        if self.drop_built_image {
            return Ok(vec!["alpine:3.20".into()]);
        }
        Ok(self.built.lock().unwrap().clone())
    }

    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        platform: Option<&'a str>,
    ) -> BoxStream<'a, Result<String, EngineError>> {
        self.record(Call::Pull(image.into(), platform.map(str::to_string)));
        stream::iter(vec![
            Ok(format!("Pulling from {image}")),
            Ok(String::new()),
            Ok("Status: Downloaded newer image".to_string()),
        ])
        .boxed()
    }

    fn build_image<'a>(
        &'a self,
        context: Vec<u8>,
        tag: &'a str,
        dockerfile: &'a str,
    ) -> BoxStream<'a, Result<String, EngineError>> {
        assert!(!context.is_empty(), "build context must not be empty");
        self.record(Call::Build {
            tag: tag.into(),
            dockerfile: dockerfile.into(),
        });

        let mut lines = vec![Ok("Step 1/2 : FROM alpine:3.20\n".to_string())];
        match &self.build_error {
            Some(message) => lines.push(Err(EngineError::Daemon(message.clone()))),
            None => {
                self.built.lock().unwrap().push(normalize_tag(tag));
                lines.push(Ok("Successfully tagged lab:latest".to_string()));
            }
        }
        stream::iter(lines).boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        self.record(Call::Create(spec.clone()));
        if self.image_missing_once.swap(false, Ordering::SeqCst) {
            return Err(EngineError::ImageNotFound(spec.image.clone()));
        }
        Ok(CONTAINER_ID.into())
    }

    async fn attach_container(&self, id: &str) -> Result<Attachment, EngineError> {
        self.record(Call::Attach(id.into()));
        if self.attach_fails {
            return Err(EngineError::Daemon("attach refused".into()));
        }

        let chunks = stream::iter(self.output.clone().into_iter().map(Ok::<_, EngineError>));
        let output = match self.output_end {
            OutputEnd::Close => chunks.boxed(),
            OutputEnd::Hang => chunks.chain(stream::pending()).boxed(),
            OutputEnd::CloseAfterInput => {
                let attempted = self.input.write_attempted.clone();
                chunks
                    .chain(
                        stream::once(async move { attempted.notified().await })
                            .filter_map(|()| async { None }),
                    )
                    .boxed()
            }
            OutputEnd::Fail => chunks
                .chain(stream::once(async {
                    Err(EngineError::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )))
                }))
                .boxed(),
        };
        Ok(Attachment {
            output,
            input: Box::pin(self.input.clone()),
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Start(id.into()));
        if self.start_fails {
            return Err(EngineError::ContainerNotFound(id.into()));
        }
        if let Some(cancel) = &self.cancel_on_start {
            cancel.cancel();
        }
        Ok(())
    }

    async fn resize_tty(&self, _id: &str, columns: u16, rows: u16) -> Result<(), EngineError> {
        self.record(Call::Resize(columns, rows));
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        self.record(Call::Wait(id.into()));
        if self.cancel_on_start.is_some() {
            std::future::pending::<()>().await;
        }
        Ok(self.wait_code)
    }

    fn container_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<LogChunk, EngineError>> {
        self.record(Call::Logs(id.into()));
        stream::iter(self.logs.clone().into_iter().map(Ok::<_, EngineError>)).boxed()
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Remove(id.into()));
        Ok(())
    }
}

// ── FakeTerminal ────────────────────────────────────────────────────

pub struct FakeTerminal {
    tty: bool,
    fail_restore: bool,
    raw: AtomicBool,
    enters: AtomicUsize,
    restores: AtomicUsize,
}

impl FakeTerminal {
    pub fn tty() -> Self {
        Self::with_tty(true)
    }

    pub fn piped() -> Self {
        Self::with_tty(false)
    }

    fn with_tty(tty: bool) -> Self {
        Self {
            tty,
            fail_restore: false,
            raw: AtomicBool::new(false),
            enters: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
        }
    }

    /// Restore is counted, then fails and leaves raw mode on.
    pub fn failing_restore(mut self) -> Self {
        self.fail_restore = true;
        self
    }

    pub fn is_raw(&self) -> bool {
        self.raw.load(Ordering::SeqCst)
    }

    pub fn enters(&self) -> usize {
        self.enters.load(Ordering::SeqCst)
    }

    pub fn restores(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }
}

impl Terminal for FakeTerminal {
    fn is_terminal(&self) -> bool {
        self.tty
    }

    fn enter_raw(&self) -> io::Result<TerminalState> {
        self.enters.fetch_add(1, Ordering::SeqCst);
        let was_raw = self.raw.swap(true, Ordering::SeqCst);
        Ok(TerminalState { was_raw })
    }

    fn restore(&self, state: TerminalState) -> io::Result<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        if self.fail_restore {
            return Err(io::Error::other("tcsetattr failed"));
        }
        self.raw.store(state.was_raw, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((120, 40))
    }
}

// ── Workspace ───────────────────────────────────────────────────────

/// A project directory with `dockers/Dockerfile.work` and a sibling
/// directory to mount.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("project/dockers")).unwrap();
        std::fs::write(
            dir.path().join("project/dockers/Dockerfile.work"),
            "FROM alpine:3.20\nRUN apk add --no-cache git\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("saas-infra")).unwrap();
        Self { dir }
    }

    pub fn project(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    pub fn mount(&self) -> PathBuf {
        self.dir.path().join("saas-infra").canonicalize().unwrap()
    }

    pub fn input(&self, config: Config) -> PipelineInput {
        PipelineInput {
            config,
            work_dir: self.project(),
        }
    }

    /// The default config with the mount pointed at `../saas-infra`.
    pub fn config(&self) -> Config {
        Config {
            host_mount: "../saas-infra".into(),
            ..Config::default()
        }
    }
}

/// Local streams backed by recording writers and an empty stdin.
pub fn io() -> (
    SessionIo<tokio::io::Empty, RecordingWriter, RecordingWriter>,
    RecordingWriter,
    RecordingWriter,
) {
    let stdout = RecordingWriter::default();
    let stderr = RecordingWriter::default();
    let io = SessionIo {
        stdin: tokio::io::empty(),
        stdout: stdout.clone(),
        stderr: stderr.clone(),
    };
    (io, stdout, stderr)
}
