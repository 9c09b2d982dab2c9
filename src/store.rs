// src/store.rs
use crate::config::{Settings, StoreConfig, validate_key_id};
use crate::crypto::CryptoGateway;
use crate::errors::SecretError;
use crate::filesystem::{DIR_MODE, FILE_MODE, FileManager};
use crate::namespace::{SecretPath, ensure_contained, ensure_creatable};
use crate::prompt::Prompter;
use crate::random::{self, PasswordPolicy};
use crate::reveal::{RevealMode, RevealSession, RevealWindow};

use age::secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

const INSERT_PROMPT: &str = "Insert password: ";
const CONFIRM_DELETE_PROMPT: &str = "Confirm deletion with [y]: ";

/// Where the plaintext for `add` comes from
#[derive(Debug, Clone, Copy)]
pub enum PlaintextSource {
    Generate(PasswordPolicy),
    Interactive,
}

/// Result of a successful `add`
pub struct AddOutcome {
    pub path: SecretPath,
    pub artifact: PathBuf,
    /// The password, when it was generated rather than typed
    pub generated: Option<SecretString>,
}

/// What `remove` deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    Secret(PathBuf),
    Folder(PathBuf),
}

/// Lifecycle operations on one password store.
///
/// Every operation but `init` needs an initialized store. Validation
/// failures, declined confirmations and crypto errors leave the tree as it
/// was.
pub struct StoreEngine<'a> {
    settings: &'a Settings,
    crypto: &'a dyn CryptoGateway,
    prompter: &'a dyn Prompter,
    fs: FileManager,
}

impl<'a> StoreEngine<'a> {
    pub fn new(
        settings: &'a Settings,
        crypto: &'a dyn CryptoGateway,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            settings,
            crypto,
            prompter,
            fs: FileManager::new(),
        }
    }

    /// Create the store root if needed and record `key_id` as recipient.
    /// Running it again only replaces the key id.
    pub fn init(&self, key_id: &str) -> Result<PathBuf, SecretError> {
        let key_id = validate_key_id(key_id)?;
        let root = &self.settings.store_dir;

        self.fs.create_secure_dir(root, DIR_MODE)?;
        self.fs
            .write_atomic(&self.settings.gpg_id_path(), key_id.as_bytes(), FILE_MODE)?;

        info!("Password store initialized for {}", key_id);
        Ok(root.clone())
    }

    /// Encrypt a new secret at `raw_path`, replacing any existing one
    pub fn add(&self, raw_path: &str, source: PlaintextSource) -> Result<AddOutcome, SecretError> {
        let config = self.open()?;
        self.crypto.probe()?;
        let path = SecretPath::normalize(raw_path)?;

        let (plaintext, generated) = match source {
            PlaintextSource::Generate(policy) => (random::generate(&policy)?, true),
            PlaintextSource::Interactive => (self.prompter.secret(INSERT_PROMPT)?, false),
        };
        if plaintext.expose_secret().is_empty() {
            return Err(SecretError::EmptySecret);
        }

        let ciphertext = self.crypto.encrypt(&plaintext, &config.key_id)?;

        let folder = path.folder(&config.root);
        let artifact = path.artifact(&config.root);
        debug!(path = %path, artifact = %artifact.display(), "Resolved artifact");

        // Any existing part of the folder may be a symlink out of the store
        ensure_creatable(&config.root, &folder)?;
        self.fs.write_artifact(&folder, &artifact, ciphertext.as_bytes())?;

        Ok(AddOutcome {
            path,
            artifact,
            generated: generated.then_some(plaintext),
        })
    }

    /// Delete one secret, or with `recursive` a whole folder, after the user
    /// confirms
    pub fn remove(&self, raw_path: &str, recursive: bool) -> Result<Removed, SecretError> {
        let config = self.open()?;
        let path = SecretPath::normalize(raw_path)?;

        let artifact = path.artifact(&config.root);
        let entry = path.entry(&config.root);

        let target = if recursive && entry.is_dir() {
            Removed::Folder(entry)
        } else if artifact.is_file() {
            Removed::Secret(artifact)
        } else if entry.is_dir() {
            return Err(SecretError::IsDirectory(path.to_string()));
        } else {
            return Err(SecretError::NotFound(format!(
                "{} is not in the password store",
                path
            )));
        };

        let target_path = match &target {
            Removed::Secret(p) | Removed::Folder(p) => p,
        };
        debug!(path = %path, target = %target_path.display(), "Resolved removal target");
        ensure_contained(&config.root, target_path)?;

        if !self.prompter.confirm(CONFIRM_DELETE_PROMPT)? {
            return Err(SecretError::Declined);
        }

        match &target {
            Removed::Secret(p) => self.fs.remove_file(p)?,
            Removed::Folder(p) => self.fs.remove_tree(p)?,
        }
        Ok(target)
    }

    /// Decrypt the secret at `raw_path`
    pub fn retrieve(&self, raw_path: &str) -> Result<SecretString, SecretError> {
        let config = self.open()?;
        self.crypto.probe()?;
        let path = SecretPath::normalize(raw_path)?;

        let artifact = path.artifact(&config.root);
        if !artifact.is_file() {
            return Err(SecretError::NotFound(format!(
                "{} is not a stored password",
                path
            )));
        }
        ensure_contained(&config.root, &artifact)?;
        debug!(path = %path, artifact = %artifact.display(), "Resolved artifact");

        let ciphertext = self.fs.read_artifact(&artifact)?;
        self.crypto.decrypt(&ciphertext)
    }

    /// Decrypt the secret at `raw_path` and reveal it for `reveal_seconds`,
    /// clamped to the allowed window
    pub fn show<W: Write>(
        &self,
        raw_path: &str,
        as_clipboard: bool,
        reveal_seconds: u64,
        session: &mut RevealSession<'_, W>,
    ) -> Result<(), SecretError> {
        let secret = self.retrieve(raw_path)?;
        let mode = if as_clipboard {
            RevealMode::Clipboard
        } else {
            RevealMode::Terminal
        };
        session.deliver(&secret, mode, RevealWindow::clamped(reveal_seconds))
    }

    /// Logical paths of every stored secret, sorted
    pub fn list(&self) -> Result<Vec<String>, SecretError> {
        let config = self.open()?;
        self.fs.list_artifacts(&config.root)
    }

    fn open(&self) -> Result<StoreConfig, SecretError> {
        let config = StoreConfig::load(self.settings, &self.fs)?;
        debug!(root = %config.root.display(), "Using password store");
        Ok(config)
    }
}
