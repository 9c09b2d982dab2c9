// src/clipboard.rs
use crate::mem_struct::SecureBuffer;

use std::io::{self, Write};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClipboardError {
    /// The clipboard utility is not installed; callers fall back to the terminal
    #[error("{0} program is needed for copying to clipboard")]
    Unavailable(String),

    #[error("clipboard error: {0}")]
    Failed(String),
}

pub trait ClipboardSink {
    fn copy(&self, text: &[u8]) -> Result<(), ClipboardError>;

    /// Overwrite the clipboard with nothing
    fn clear(&self) -> Result<(), ClipboardError> {
        self.copy(b"")
    }
}

/// `xclip -selection clipboard`, fed on stdin
pub struct XclipSink {
    program: String,
}

impl XclipSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ClipboardSink for XclipSink {
    fn copy(&self, text: &[u8]) -> Result<(), ClipboardError> {
        debug!("Handing {} bytes to {}", text.len(), self.program);

        let mut child = Command::new(&self.program)
            .args(["-selection", "clipboard"])
            .stdin(Stdio::piped())
            // xclip leaves a child behind to serve the selection; inherited
            // pipes would keep a reader blocked until it exits
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ClipboardError::Unavailable(self.program.clone()),
                _ => ClipboardError::Failed(e.to_string()),
            })?;

        let payload = SecureBuffer::from_slice(text);
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.as_slice())
                .map_err(|e| ClipboardError::Failed(e.to_string()))?;
        }

        let status = child
            .wait()
            .map_err(|e| ClipboardError::Failed(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Failed(format!("{} exited with {}", self.program, status)))
        }
    }
}
