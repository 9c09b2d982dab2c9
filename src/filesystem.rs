// src/filesystem.rs
use crate::errors::SecretError;
use crate::namespace::ARTIFACT_EXT;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Mode for the store root and every secret folder
pub const DIR_MODE: u32 = 0o700;
/// Mode for artifacts and the key id file
pub const FILE_MODE: u32 = 0o600;

/// File system operations with security-focused design
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    /// Create a directory and any missing ancestors with secure permissions.
    ///
    /// Returns the directories this call created, shallowest first, so a
    /// caller can undo them. An existing directory is only checked for a
    /// permissive mode.
    pub fn create_secure_dir(&self, path: &Path, mode: u32) -> Result<Vec<PathBuf>, SecretError> {
        if path.is_dir() {
            self.verify_dir_permissions(path, mode)?;
            return Ok(Vec::new());
        }

        let mut missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();

        let mut created = Vec::with_capacity(missing.len());
        for dir in missing {
            let result = fs::create_dir(&dir).and_then(|_| {
                fs::set_permissions(&dir, fs::Permissions::from_mode(mode))
            });
            if let Err(e) = result {
                self.remove_created_dirs(&created);
                return Err(e.into());
            }
            info!("Created {}", dir.display());
            created.push(dir);
        }
        Ok(created)
    }

    /// Write file atomically: temp file next to the target, then rename
    pub fn write_atomic(&self, path: &Path, content: &[u8], file_mode: u32) -> Result<(), SecretError> {
        let temp_path = temp_path_for(path);

        // A leftover temp entry may be a planted link; never open through it
        match fs::remove_file(&temp_path) {
            Ok(()) => debug!("Removed stale {}", temp_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let result = (|| -> Result<(), SecretError> {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(file_mode)
                .open(&temp_path)?;
            file.write_all(content)?;
            file.sync_all()?;
            self.set_permissions(&temp_path, file_mode)?;
            fs::rename(&temp_path, path)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result?;

        info!("{} written.", path.display());
        Ok(())
    }

    /// Write an artifact, creating its folders on the way.
    ///
    /// Folders created here are removed again if the write fails, leaving the
    /// tree exactly as it was.
    pub fn write_artifact(&self, folder: &Path, artifact: &Path, content: &[u8]) -> Result<(), SecretError> {
        let created = self.create_secure_dir(folder, DIR_MODE)?;

        if let Err(e) = self.write_atomic(artifact, content, FILE_MODE) {
            self.remove_created_dirs(&created);
            return Err(e);
        }
        Ok(())
    }

    /// Logical paths of every artifact below `root`, sorted.
    /// Hidden entries (the key id file, dot folders) are skipped.
    pub fn list_artifacts(&self, root: &Path) -> Result<Vec<String>, SecretError> {
        let mut names = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| SecretError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|s| s.to_str()) != Some(ARTIFACT_EXT)
            {
                continue;
            }
            if let Ok(relative) = path.with_extension("").strip_prefix(root) {
                let name: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                names.push(name.join("/"));
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn remove_file(&self, path: &Path) -> Result<(), SecretError> {
        fs::remove_file(path)?;
        info!("Deleted {}", path.display());
        Ok(())
    }

    pub fn remove_tree(&self, path: &Path) -> Result<(), SecretError> {
        fs::remove_dir_all(path)?;
        info!("Deleted {}", path.display());
        Ok(())
    }

    /// Raw artifact bytes; armored and binary ciphertext are both accepted
    pub fn read_artifact(&self, path: &Path) -> Result<Vec<u8>, SecretError> {
        let bytes = fs::read(path)?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    pub fn read_file_content(&self, path: &Path) -> Result<String, SecretError> {
        let bytes = fs::read(path)?;
        String::from_utf8(bytes).map_err(|_| {
            SecretError::MalformedConfig(format!("{} is not valid UTF-8", path.display()))
        })
    }

    // Private helper methods
    fn remove_created_dirs(&self, created: &[PathBuf]) {
        for dir in created.iter().rev() {
            match fs::remove_dir(dir) {
                Ok(()) => debug!("Rolled back {}", dir.display()),
                Err(e) => warn!("Failed to roll back {}: {}", dir.display(), e),
            }
        }
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), SecretError> {
        let permissions = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }

    fn verify_dir_permissions(&self, path: &Path, mode: u32) -> Result<(), SecretError> {
        let metadata = fs::metadata(path)?;
        let current_mode = metadata.permissions().mode() & 0o777;

        if current_mode & !mode != 0 {
            warn!(
                "Directory {} has permissive mode {:o} (expected {:o})",
                path.display(),
                current_mode,
                mode
            );
        }
        Ok(())
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
