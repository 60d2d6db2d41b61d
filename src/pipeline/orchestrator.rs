use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::build::ImageBuilder;
use crate::docker::{CancelToken, Engine};
use crate::error::{LabError, PreconditionError};
use crate::session::{ContainerSession, SessionIo, StreamEnd, Terminal};

use super::commands::{build_spec, container_spec, resolve_mount};
use super::types::{PipelineInput, RunOutcome, SessionPlan};

/// Validate the input and turn it into a plan. Touches only the local
/// filesystem, so a doomed run never reaches the engine.
pub fn prepare(input: &PipelineInput) -> Result<SessionPlan, PreconditionError> {
    let cfg = &input.config;
    let host_mount = resolve_mount(cfg, &input.work_dir)?;
    info!(
        host = %host_mount.display(),
        target = %cfg.container_mount,
        command = %cfg.command,
        "mount source verified"
    );

    Ok(SessionPlan {
        build: build_spec(cfg, &input.work_dir),
        container: container_spec(cfg, &cfg.image_tag, &host_mount),
        interactive: cfg.interactive,
        platform: cfg.platform.clone(),
    })
}

/// Build the image, then run the session against it. An interrupt at any
/// point ends the run with [`LabError::Interrupted`].
pub async fn execute<E, T, R, W, X>(
    plan: &SessionPlan,
    engine: &E,
    terminal: &T,
    io: SessionIo<R, W, X>,
    cancel: &CancelToken,
) -> Result<RunOutcome, LabError>
where
    E: Engine,
    T: Terminal + ?Sized,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
    X: AsyncWrite + Unpin,
{
    let mut io = io;

    // ── Build ────────────────────────────────────────────────────────
    let builder = ImageBuilder::new(engine);
    let image_tag = tokio::select! {
        tag = builder.build(&plan.build, &mut io.stdout) => tag?,
        _ = cancel.cancelled() => return Err(LabError::Interrupted),
    };

    // ── Session ──────────────────────────────────────────────────────
    let mut container = plan.container.clone();
    container.image = image_tag.clone();

    let session = ContainerSession::new(engine, terminal)
        .with_platform(plan.platform.clone())
        .with_built_image(image_tag.clone());
    let report = if plan.interactive {
        session.run(&container, io, cancel).await?
    } else {
        session.run_to_completion(&container, io, cancel).await?
    };

    // The session has already released everything it held.
    if report.end == StreamEnd::Interrupted {
        info!(container = %report.container_id, "session interrupted");
        return Err(LabError::Interrupted);
    }

    Ok(RunOutcome { image_tag, report })
}

/// [`prepare`] then [`execute`].
pub async fn run<E, T, R, W, X>(
    input: &PipelineInput,
    engine: &E,
    terminal: &T,
    io: SessionIo<R, W, X>,
    cancel: &CancelToken,
) -> Result<RunOutcome, LabError>
where
    E: Engine,
    T: Terminal + ?Sized,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
    X: AsyncWrite + Unpin,
{
    let plan = prepare(input)?;
    execute(&plan, engine, terminal, io, cancel).await
}
