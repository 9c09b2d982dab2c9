// src/reveal.rs
use crate::cancel::CancelSignal;
use crate::clipboard::{ClipboardError, ClipboardSink};
use crate::errors::SecretError;

use age::secrecy::{ExposeSecret, SecretString, zeroize::Zeroize};
use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};
use std::io::Write;
use std::time::Duration;
use tracing::warn;

/// Hard upper bound on any reveal window, in seconds
pub const MAX_TIME: u64 = 30;
/// Window used when none is requested
pub const DEFAULT_TIME: u64 = 10;

/// How long a decrypted secret may stay visible. Always within `1..=MAX_TIME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealWindow(u64);

impl RevealWindow {
    pub fn clamped(seconds: u64) -> Self {
        Self(seconds.clamp(1, MAX_TIME))
    }

    pub fn seconds(&self) -> u64 {
        self.0
    }
}

impl Default for RevealWindow {
    fn default() -> Self {
        Self(DEFAULT_TIME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    Terminal,
    Clipboard,
}

/// Hands a decrypted secret to the user and makes sure it goes away again
pub struct RevealSession<'a, W: Write> {
    out: W,
    clipboard: &'a dyn ClipboardSink,
    cancel: &'a CancelSignal,
    tick: Duration,
    /// Terminal width, when known; long lines wrap over several rows
    columns: Option<u16>,
}

impl<'a, W: Write> RevealSession<'a, W> {
    pub fn new(out: W, clipboard: &'a dyn ClipboardSink, cancel: &'a CancelSignal) -> Self {
        Self {
            out,
            clipboard,
            cancel,
            tick: Duration::from_secs(1),
            columns: terminal::size().ok().map(|(columns, _)| columns),
        }
    }

    /// Length of one countdown step
    #[cfg(test)]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[cfg(test)]
    pub fn with_columns(mut self, columns: Option<u16>) -> Self {
        self.columns = columns;
        self
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Show or copy `secret` for `window`, then erase it.
    ///
    /// An interrupt during the window runs the same cleanup and then fails
    /// with [`SecretError::Aborted`].
    pub fn deliver(
        &mut self,
        secret: &SecretString,
        mode: RevealMode,
        window: RevealWindow,
    ) -> Result<(), SecretError> {
        let cancel = self.cancel;
        let _armed = cancel.arm();

        if mode == RevealMode::Clipboard {
            match self.clipboard.copy(secret.expose_secret().as_bytes()) {
                Ok(()) => return self.hold_clipboard(window),
                Err(e @ ClipboardError::Unavailable(_)) => {
                    writeln!(self.out, "{}.", e)?;
                }
                Err(e) => {
                    warn!("{}", e);
                    writeln!(self.out, "Could not use the clipboard, showing the password instead.")?;
                }
            }
        }

        self.countdown(secret, window)
    }

    fn countdown(&mut self, secret: &SecretString, window: RevealWindow) -> Result<(), SecretError> {
        let mut rows = 0;

        for remaining in (1..=window.seconds()).rev() {
            self.erase(rows)?;
            let mut line = format!(
                "You have {:02} second(s) to copy the password: {}",
                remaining,
                secret.expose_secret()
            );
            rows = self.rows_for(&line);
            let written = write!(self.out, "{}", line).and_then(|_| self.out.flush());
            line.zeroize();
            written?;

            if self.cancel.wait(self.tick) {
                self.erase(rows)?;
                return Err(SecretError::Aborted);
            }
        }

        self.erase(rows)?;
        writeln!(self.out, "Time has expired")?;
        Ok(())
    }

    fn hold_clipboard(&mut self, window: RevealWindow) -> Result<(), SecretError> {
        writeln!(
            self.out,
            "Password copied to clipboard, press [Control-C] to erase the clipboard and exit \
             (cleared automatically in {} second(s))...",
            window.seconds()
        )?;
        self.out.flush()?;

        let mut cancelled = false;
        for _ in 0..window.seconds() {
            if self.cancel.wait(self.tick) {
                cancelled = true;
                break;
            }
        }

        let cleared = self.clipboard.clear();
        match &cleared {
            Ok(()) => writeln!(self.out, "Clipboard cleared")?,
            Err(e) => writeln!(self.out, "Failed to clear clipboard: {}", e)?,
        }

        if cancelled {
            return Err(SecretError::Aborted);
        }
        cleared.map_err(|e| SecretError::Io(std::io::Error::other(e.to_string())))
    }

    /// Terminal rows taken by `line` once it wraps
    fn rows_for(&self, line: &str) -> usize {
        match self.columns {
            Some(columns) if columns > 0 => line.chars().count().div_ceil(columns.into()).max(1),
            _ => 1,
        }
    }

    /// Clear the `rows` rows ending at the cursor, leaving it at the start of
    /// the first one, so no part of the secret stays on screen
    fn erase(&mut self, rows: usize) -> Result<(), SecretError> {
        if rows == 0 {
            return Ok(());
        }
        write!(self.out, "\r")?;
        queue!(self.out, Clear(ClearType::CurrentLine))?;
        for _ in 1..rows {
            queue!(self.out, MoveUp(1), Clear(ClearType::CurrentLine))?;
        }
        self.out.flush()?;
        Ok(())
    }
}
