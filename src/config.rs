// src/config.rs
use crate::errors::SecretError;
use crate::filesystem::FileManager;

use std::path::PathBuf;

/// Name of the key id file at the store root
pub const GPG_ID_FILE: &str = ".gpg-id";
/// Store location under the home directory when nothing else is configured
pub const DEFAULT_STORE_DIR: &str = ".password-store";
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";
pub const DEFAULT_CLIPBOARD_PROGRAM: &str = "xclip";

/// Everything resolved at startup. Built once in `main` and passed down by
/// reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_dir: PathBuf,
    pub gpg_program: String,
    pub clipboard_program: String,
    pub age_identity: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings, falling back to `~/.password-store` for the store.
    pub fn resolve(
        store_dir: Option<PathBuf>,
        gpg_program: String,
        clipboard_program: String,
        age_identity: Option<PathBuf>,
    ) -> Result<Self, SecretError> {
        let store_dir = match store_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or(SecretError::HomeDir)?
                .join(DEFAULT_STORE_DIR),
        };

        Ok(Self {
            store_dir,
            gpg_program,
            clipboard_program,
            age_identity,
        })
    }

    /// Settings for a store at `store_dir` with default tool names
    #[cfg(test)]
    pub fn for_store(store_dir: &std::path::Path) -> Self {
        Self {
            store_dir: store_dir.to_path_buf(),
            gpg_program: DEFAULT_GPG_PROGRAM.to_string(),
            clipboard_program: DEFAULT_CLIPBOARD_PROGRAM.to_string(),
            age_identity: None,
        }
    }

    pub fn gpg_id_path(&self) -> PathBuf {
        self.store_dir.join(GPG_ID_FILE)
    }
}

/// Configuration read back from an initialized store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub key_id: String,
}

impl StoreConfig {
    /// Load the recipient key id; a missing or empty `.gpg-id` is fatal.
    pub fn load(settings: &Settings, fs: &FileManager) -> Result<Self, SecretError> {
        let gpg_id_path = settings.gpg_id_path();
        if !gpg_id_path.is_file() {
            return Err(SecretError::NotInitialized(settings.store_dir.clone()));
        }

        let content = fs.read_file_content(&gpg_id_path)?;
        let key_id = content.trim();
        if key_id.is_empty() {
            return Err(SecretError::MalformedConfig(format!(
                "{} holds no key id",
                gpg_id_path.display()
            )));
        }
        if key_id.contains(['\n', '\r']) {
            return Err(SecretError::MalformedConfig(format!(
                "{} holds more than one line",
                gpg_id_path.display()
            )));
        }

        Ok(Self {
            root: settings.store_dir.clone(),
            key_id: key_id.to_string(),
        })
    }
}

/// Validate a key id before it is written to `.gpg-id`
pub fn validate_key_id(key_id: &str) -> Result<&str, SecretError> {
    let trimmed = key_id.trim();
    if trimmed.is_empty() {
        return Err(SecretError::InvalidKeyId("key id must not be empty".to_string()));
    }
    if trimmed.contains(['\n', '\r', '\0']) {
        return Err(SecretError::InvalidKeyId(
            "key id must be a single line".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::for_store(&temp_dir.path().join("store"));

        let result = StoreConfig::load(&settings, &FileManager);
        assert!(matches!(result, Err(SecretError::NotInitialized(_))));
    }

    #[test]
    fn test_load_trims_key_id() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::for_store(temp_dir.path());
        fs::write(settings.gpg_id_path(), "ABCD1234\n").unwrap();

        let config = StoreConfig::load(&settings, &FileManager).unwrap();
        assert_eq!(config.key_id, "ABCD1234");
        assert_eq!(config.root, temp_dir.path());
    }

    #[test]
    fn test_load_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::for_store(temp_dir.path());

        fs::write(settings.gpg_id_path(), "  \n").unwrap();
        assert!(matches!(
            StoreConfig::load(&settings, &FileManager),
            Err(SecretError::MalformedConfig(_))
        ));

        fs::write(settings.gpg_id_path(), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            StoreConfig::load(&settings, &FileManager),
            Err(SecretError::MalformedConfig(_))
        ));
    }

    #[test]
    fn test_validate_key_id() {
        assert_eq!(validate_key_id(" ABCD1234 ").unwrap(), "ABCD1234");
        assert!(validate_key_id("").is_err());
        assert!(validate_key_id("AB\nCD").is_err());
    }

    #[test]
    fn test_resolve_explicit_store() {
        let settings = Settings::resolve(
            Some(PathBuf::from("/tmp/store")),
            "gpg2".to_string(),
            "xclip".to_string(),
            None,
        )
        .unwrap();
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(settings.gpg_id_path(), PathBuf::from("/tmp/store/.gpg-id"));
        assert_eq!(settings.gpg_program, "gpg2");
    }
}
