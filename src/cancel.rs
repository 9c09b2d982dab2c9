// src/cancel.rs
use crate::errors::SecretError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

/// Exit status used when an interrupt ends the process
pub const INTERRUPTED_EXIT: i32 = 130;

/// Routes interrupts to whoever is listening.
///
/// While armed (a reveal session or a masked prompt is running) an interrupt
/// is delivered on the channel so the caller can wipe the terminal, clear the
/// clipboard or restore echo before giving up. Otherwise the process exits on
/// the spot.
pub struct CancelSignal {
    rx: Receiver<()>,
    armed: Arc<AtomicBool>,
}

/// Keeps a [`CancelSignal`] armed until dropped
pub struct ArmedGuard<'a> {
    armed: &'a AtomicBool,
}

impl Drop for ArmedGuard<'_> {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl CancelSignal {
    /// Install the process-wide Ctrl-C handler. Call once, from `main`.
    pub fn install() -> Result<Self, SecretError> {
        let (tx, signal) = Self::channel();
        let armed = Arc::clone(&signal.armed);

        ctrlc::set_handler(move || {
            if armed.load(Ordering::SeqCst) {
                let _ = tx.send(());
            } else {
                eprintln!("\nExecution aborted!");
                std::process::exit(INTERRUPTED_EXIT);
            }
        })
        .map_err(|e| SecretError::Io(std::io::Error::other(e.to_string())))?;

        Ok(signal)
    }

    /// A signal fed by the returned sender instead of the OS
    pub fn channel() -> (Sender<()>, Self) {
        let (tx, rx) = mpsc::channel();
        let signal = Self {
            rx,
            armed: Arc::new(AtomicBool::new(false)),
        };
        (tx, signal)
    }

    pub fn arm(&self) -> ArmedGuard<'_> {
        self.armed.store(true, Ordering::SeqCst);
        ArmedGuard { armed: &self.armed }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// True if an interrupt is pending; does not block
    pub fn interrupted(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    /// Block for `timeout`; true if an interrupt arrived meanwhile
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                false
            }
        }
    }
}
