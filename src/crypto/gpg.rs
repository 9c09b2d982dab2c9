// src/crypto/gpg.rs
use super::{CryptoGateway, into_secret};
use crate::errors::SecretError;
use crate::mem_struct::SecureBuffer;

use age::secrecy::{ExposeSecret, SecretString};
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Captured result of one gpg invocation
struct GpgRun {
    success: bool,
    stdout: SecureBuffer,
    stderr: String,
    feed: io::Result<()>,
}

/// Drives an external `gpg` binary, one process per call.
/// Data goes in on stdin and comes back on stdout.
pub struct GpgGateway {
    program: String,
    leading_args: Vec<String>,
}

impl GpgGateway {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Run `program` with fixed leading arguments, e.g. a wrapper script or
    /// `--homedir <dir>`
    #[cfg(test)]
    pub fn with_args(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args);
        command
    }

    fn spawn_error(&self, err: io::Error) -> SecretError {
        if err.kind() == io::ErrorKind::NotFound {
            SecretError::ToolMissing(self.program.clone())
        } else {
            SecretError::Io(err)
        }
    }

    fn run(&self, args: &[&str], input: SecureBuffer) -> Result<GpgRun, SecretError> {
        debug!("Running {} {}", self.program, args.join(" "));

        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SecretError::Io(io::Error::other("child stdin unavailable")))?;

        // Feed stdin from a helper thread so a large payload cannot deadlock
        // against a full stdout pipe. Dropping `stdin` closes the pipe.
        let feeder = thread::spawn(move || stdin.write_all(input.as_slice()));

        let output = child.wait_with_output()?;
        let feed = feeder
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin feeder panicked")));

        Ok(GpgRun {
            success: output.status.success(),
            stdout: SecureBuffer::new(output.stdout),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            feed,
        })
    }
}

fn failure_message(run: &GpgRun, fallback: &str) -> String {
    if run.stderr.is_empty() {
        fallback.to_string()
    } else {
        run.stderr.clone()
    }
}

impl CryptoGateway for GpgGateway {
    fn probe(&self) -> Result<(), SecretError> {
        let status = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(SecretError::ToolMissing(self.program.clone()))
        }
    }

    fn encrypt(&self, plaintext: &SecretString, recipient: &str) -> Result<String, SecretError> {
        let input = SecureBuffer::from_slice(plaintext.expose_secret().as_bytes());
        let run = self.run(
            &["--quiet", "--encrypt", "--armor", "--recipient", recipient],
            input,
        )?;

        if !run.success {
            return Err(SecretError::Encrypt(failure_message(
                &run,
                &format!("{} exited with an error", self.program),
            )));
        }
        if let Err(e) = &run.feed {
            return Err(SecretError::Encrypt(format!("failed to pass plaintext: {}", e)));
        }
        if run.stdout.is_empty() {
            return Err(SecretError::Encrypt(format!(
                "{} produced no ciphertext",
                self.program
            )));
        }

        String::from_utf8(run.stdout.as_slice().to_vec())
            .map_err(|_| SecretError::Encrypt("ciphertext is not armored text".to_string()))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretString, SecretError> {
        let input = SecureBuffer::from_slice(ciphertext);
        let run = self.run(&["--quiet", "--decrypt"], input)?;

        if !run.success {
            return Err(SecretError::Decrypt(failure_message(
                &run,
                &format!("{} exited with an error", self.program),
            )));
        }

        into_secret(run.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // Stand-in for gpg: rot13 "encryption" between fake armor lines. It also
    // records its argv so tests can check the plaintext never appears there.
    const FAKE_GPG: &str = r#"
echo "$*" >> "$(dirname "$0")/argv.log"
case "$*" in
  *--version*) echo "gpg (fake) 2.4" ;;
  *--encrypt*)
    case "$*" in *UNKNOWN*) echo "gpg: UNKNOWN: skipped: No public key" >&2; exit 2 ;; esac
    echo "-----BEGIN PGP MESSAGE-----"
    tr 'A-Za-z' 'N-ZA-Mn-za-m'
    echo
    echo "-----END PGP MESSAGE-----"
    ;;
  *--decrypt*)
    body=$(sed '1d;$d')
    case "$body" in *garbage*) echo "gpg: no valid OpenPGP data found." >&2; exit 2 ;; esac
    printf '%s\n' "$body" | tr 'A-Za-z' 'N-ZA-Mn-za-m'
    ;;
esac
"#;

    fn fake_gpg(dir: &Path) -> GpgGateway {
        let script = dir.join("fake-gpg.sh");
        fs::write(&script, FAKE_GPG).unwrap();
        // Run through sh so the script never needs the exec bit
        GpgGateway::with_args("sh", vec![script.to_string_lossy().into_owned()])
    }

    #[test]
    fn test_missing_binary_is_precondition_failure() {
        let gateway = GpgGateway::new("yapm-no-such-gpg-binary");
        assert!(matches!(gateway.probe(), Err(SecretError::ToolMissing(_))));

        let plaintext = SecretString::from("secret".to_string());
        assert!(matches!(
            gateway.encrypt(&plaintext, "ABCD1234"),
            Err(SecretError::ToolMissing(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_process() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = fake_gpg(temp_dir.path());
        gateway.probe().unwrap();

        let plaintext = SecretString::from("Hunter2-correct-horse".to_string());
        let armored = gateway.encrypt(&plaintext, "ABCD1234").unwrap();
        assert!(armored.starts_with("-----BEGIN PGP MESSAGE-----"));
        assert!(!armored.contains("Hunter2"));

        let decrypted = gateway.decrypt(armored.as_bytes()).unwrap();
        assert_eq!(decrypted.expose_secret(), "Hunter2-correct-horse");
    }

    #[test]
    fn test_plaintext_never_on_argv() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = fake_gpg(temp_dir.path());

        let plaintext = SecretString::from("s3cr3t-value".to_string());
        let armored = gateway.encrypt(&plaintext, "ABCD1234").unwrap();
        gateway.decrypt(armored.as_bytes()).unwrap();

        let argv = fs::read_to_string(temp_dir.path().join("argv.log")).unwrap();
        assert!(argv.contains("--recipient ABCD1234"));
        assert!(!argv.contains("s3cr3t-value"));
    }

    #[test]
    fn test_unknown_recipient_fails_loudly() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = fake_gpg(temp_dir.path());

        let plaintext = SecretString::from("secret".to_string());
        match gateway.encrypt(&plaintext, "UNKNOWN") {
            Err(SecretError::Encrypt(msg)) => assert!(msg.contains("No public key")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_bad_ciphertext_fails_loudly() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = fake_gpg(temp_dir.path());

        let result = gateway.decrypt(b"-----BEGIN-----\ngarbage\n-----END-----\n");
        assert!(matches!(result, Err(SecretError::Decrypt(msg)) if msg.contains("no valid OpenPGP")));
    }
}
