#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::debug;

/// Resolves when the process is asked to stop: Ctrl-C, plus SIGTERM and
/// SIGHUP on Unix. With the terminal in raw mode Ctrl-C reaches the
/// container as a byte instead, so this mostly fires on external signals.
pub async fn interrupted() {
    #[cfg(unix)]
    {
        let mut terminate = optional_signal(SignalKind::terminate());
        let mut hangup = optional_signal(SignalKind::hangup());
        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("received interrupt"),
            _ = recv(&mut terminate) => debug!("received SIGTERM"),
            _ = recv(&mut hangup) => debug!("received SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        debug!("received interrupt");
    }
}

/// Terminal resize notifications. Never yields when disabled.
pub struct WindowChanges {
    #[cfg(unix)]
    signal: Option<Signal>,
}

impl WindowChanges {
    pub fn new(enabled: bool) -> Self {
        #[cfg(unix)]
        {
            let signal = if enabled {
                optional_signal(SignalKind::window_change())
            } else {
                None
            };
            Self { signal }
        }

        #[cfg(not(unix))]
        {
            let _ = enabled;
            Self {}
        }
    }

    pub async fn recv(&mut self) -> Option<()> {
        #[cfg(unix)]
        {
            recv(&mut self.signal).await
        }

        #[cfg(not(unix))]
        {
            std::future::pending().await
        }
    }
}

#[cfg(unix)]
fn optional_signal(kind: SignalKind) -> Option<Signal> {
    match signal(kind) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!(error = %e, "signal handler unavailable");
            None
        }
    }
}

#[cfg(unix)]
async fn recv(signal: &mut Option<Signal>) -> Option<()> {
    match signal {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
