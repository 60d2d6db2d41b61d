// Container sessions — creation, attach, raw-terminal relay, teardown.

pub mod container;
pub mod relay;
pub mod signals;
pub mod terminal;

use crate::docker::EngineError;

pub use container::{ContainerSession, SessionHandle, SessionIo, SessionReport, StreamEnd};
pub use signals::interrupted;
pub use terminal::{ControllingTerminal, RawModeGuard, Terminal, TerminalState, install_panic_hook};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to create container: {0}")]
    Create(#[source] EngineError),

    #[error("failed to pull image: {0}")]
    Pull(#[source] EngineError),

    #[error("failed to attach to container: {0}")]
    Attach(#[source] EngineError),

    #[error("failed to start container: {0}")]
    Start(#[source] EngineError),

    #[error("failed to wait for container: {0}")]
    Wait(#[source] EngineError),

    #[error("failed to restore terminal: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("failed to close attach stream: {0}")]
    Close(#[source] std::io::Error),

    #[error("failed to write container output: {0}")]
    Output(#[source] std::io::Error),
}
