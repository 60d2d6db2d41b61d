mod cli;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use labrun::config;
use labrun::docker::{CancelToken, DockerEngine, ensure_available};
use labrun::pipeline::{self, PipelineInput};
use labrun::session::{ControllingTerminal, SessionIo, install_panic_hook, interrupted};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);
    install_panic_hook();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // A stdin read parked in the blocking pool cannot be interrupted.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let work_dir = std::env::current_dir().context("failed to read working directory")?;
    let config = config::load(&work_dir, cli.overrides())?;
    let input = PipelineInput { config, work_dir };

    // Local checks first: a bad mount never reaches the daemon.
    let plan = pipeline::prepare(&input)?;

    let engine = DockerEngine::connect()
        .await
        .context("failed to connect to the Docker daemon")?;
    ensure_available(&engine)
        .await
        .context("Docker daemon is not responding")?;

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        interrupted().await;
        on_signal.cancel();
    });

    let io = SessionIo {
        stdin: tokio::io::stdin(),
        stdout: tokio::io::stdout(),
        stderr: tokio::io::stderr(),
    };
    let outcome = pipeline::execute(&plan, &engine, &ControllingTerminal, io, &cancel).await?;

    info!(
        image = %outcome.image_tag,
        container = %outcome.report.container_id,
        end = ?outcome.report.end,
        exit_code = ?outcome.report.exit_code,
        "done"
    );
    Ok(())
}
