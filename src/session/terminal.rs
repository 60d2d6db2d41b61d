use std::io::{self, IsTerminal};

use crossterm::terminal;

/// Terminal mode captured before switching to raw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalState {
    pub was_raw: bool,
}

/// Controlling-terminal operations used by a session.
pub trait Terminal {
    fn is_terminal(&self) -> bool;

    /// Switch to raw mode and return the mode it replaced.
    fn enter_raw(&self) -> io::Result<TerminalState>;

    /// Put the terminal back into `state`.
    fn restore(&self, state: TerminalState) -> io::Result<()>;

    /// `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;
}

/// The process's controlling terminal, driven through crossterm.
///
/// crossterm keeps the original termios when raw mode is enabled and puts it
/// back when raw mode is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ControllingTerminal;

impl Terminal for ControllingTerminal {
    fn is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn enter_raw(&self) -> io::Result<TerminalState> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        terminal::enable_raw_mode()?;
        Ok(TerminalState { was_raw })
    }

    fn restore(&self, state: TerminalState) -> io::Result<()> {
        if state.was_raw {
            Ok(())
        } else {
            terminal::disable_raw_mode()
        }
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

/// Holds raw mode for its lifetime and restores the captured state exactly
/// once, either through [`release`](Self::release) or on drop.
pub struct RawModeGuard<'a, T: Terminal + ?Sized> {
    terminal: &'a T,
    state: Option<TerminalState>,
}

impl<'a, T: Terminal + ?Sized> RawModeGuard<'a, T> {
    pub fn acquire(terminal: &'a T) -> io::Result<Self> {
        let state = terminal.enter_raw()?;
        Ok(Self {
            terminal,
            state: Some(state),
        })
    }

    /// Restore now and report the result.
    pub fn release(mut self) -> io::Result<()> {
        match self.state.take() {
            Some(state) => self.terminal.restore(state),
            None => Ok(()),
        }
    }
}

impl<T: Terminal + ?Sized> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let _ = self.terminal.restore(state);
        }
    }
}

/// Ensure raw mode is dropped on panic. Release builds abort on panic, so
/// guard destructors never run there.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        original_hook(info);
    }));
}
