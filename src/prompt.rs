// src/prompt.rs
use crate::cancel::CancelSignal;
use crate::errors::SecretError;

use age::secrecy::SecretString;
use std::io::{self, BufRead, Write};

/// Interactive questions the store asks its user
pub trait Prompter {
    /// Ask a yes/no question; only an explicit `y`/`Y` counts as yes
    fn confirm(&self, question: &str) -> Result<bool, SecretError>;

    /// Read a secret without echoing it
    fn secret(&self, prompt: &str) -> Result<SecretString, SecretError>;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompter<'a> {
    cancel: &'a CancelSignal,
}

impl<'a> TerminalPrompter<'a> {
    pub fn new(cancel: &'a CancelSignal) -> Self {
        Self { cancel }
    }
}

impl Prompter for TerminalPrompter<'_> {
    fn confirm(&self, question: &str) -> Result<bool, SecretError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        ask(question, &mut stdin.lock(), &mut stdout)
    }

    fn secret(&self, prompt: &str) -> Result<SecretString, SecretError> {
        read_masked(self.cancel, || rpassword::prompt_password(prompt))
    }
}

/// Run a masked read with `cancel` armed.
///
/// Echo is switched off while `read` runs, so an interrupt must not end the
/// process mid-read; it is picked up once the read has returned and echo is
/// back on.
fn read_masked(
    cancel: &CancelSignal,
    read: impl FnOnce() -> io::Result<String>,
) -> Result<SecretString, SecretError> {
    let value = {
        let _armed = cancel.arm();
        read().map(SecretString::from)
    };

    if cancel.interrupted() {
        return Err(SecretError::Aborted);
    }
    Ok(value?)
}

/// Write `question`, read one line and treat `y`/`Y` as consent
fn ask(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool, SecretError> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}
