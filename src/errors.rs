use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("password store not configured at {}, please execute:\nyapm init <key-id>", .0.display())]
    NotInitialized(PathBuf),

    #[error("Malformed store configuration: {0}")]
    MalformedConfig(String),

    #[error("{0} binary not found. Is it installed?")]
    ToolMissing(String),

    #[error("Could not determine home directory; set PASSWORD_STORE_DIR")]
    HomeDir,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("Invalid password policy: {0}")]
    InvalidPolicy(String),

    #[error("Password must not be empty")]
    EmptySecret,

    #[error("{0} is a folder, use --recursive to remove it")]
    IsDirectory(String),

    #[error("{0} resolves outside the password store")]
    OutsideStore(String),

    #[error("Deletion aborted.")]
    Declined,

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Execution aborted!")]
    Aborted,
}

/// Broad failure classes, used to pick the exit status and how the
/// failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Validation,
    UserDeclined,
    Crypto,
    NotFound,
    Cancelled,
}

impl SecretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::NotInitialized(_)
            | Self::MalformedConfig(_)
            | Self::ToolMissing(_)
            | Self::HomeDir => ErrorKind::Precondition,
            Self::InvalidPath(_)
            | Self::InvalidKeyId(_)
            | Self::InvalidPolicy(_)
            | Self::EmptySecret
            | Self::IsDirectory(_)
            | Self::OutsideStore(_) => ErrorKind::Validation,
            Self::Declined => ErrorKind::UserDeclined,
            Self::Encrypt(_) | Self::Decrypt(_) => ErrorKind::Crypto,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Aborted => ErrorKind::Cancelled,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound => 0,
            ErrorKind::Cancelled => 130,
            _ => 1,
        }
    }
}
