// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw file storage — content-addressed files on the local filesystem.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use textwerk_core::error::{Result, TextwerkError};
use tracing::{debug, instrument};

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Byte storage addressed by path. Implementations block.
pub trait RawStorage: Send + Sync {
    /// Store `data` and return the path it can be read back from.
    fn save(&self, data: &[u8], filename: &str) -> Result<PathBuf>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Deleting a missing file is not an error.
    fn delete(&self, path: &Path) -> Result<()>;
}

/// Files named `{sha256}.{ext}` under a root directory.
///
/// Identical uploads share one file.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create the root directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|err| {
            TextwerkError::Storage(format!("cannot create {}: {err}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, digest: &str, filename: &str) -> PathBuf {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension {
            Some(ext) => self.root.join(format!("{digest}.{ext}")),
            None => self.root.join(digest),
        }
    }
}

impl RawStorage for LocalStorage {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    fn save(&self, data: &[u8], filename: &str) -> Result<PathBuf> {
        let digest = hash_bytes(data);
        let path = self.path_for(&digest, filename);
        if !path.exists() {
            std::fs::write(&path, data).map_err(|err| {
                TextwerkError::Storage(format!("cannot write {}: {err}", path.display()))
            })?;
        }
        debug!(path = %path.display(), "file stored");
        Ok(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path)
            .map_err(|err| TextwerkError::Storage(format!("cannot read {}: {err}", path.display())))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(TextwerkError::Storage(format!(
                "cannot delete {}: {err}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_known_value() {
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn files_are_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads")).unwrap();

        let path = storage.save(b"hello", "Rapport.PDF").unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824.pdf"
        );
        assert_eq!(storage.save(b"hello", "copie.pdf").unwrap(), path);
        assert_eq!(storage.read(&path).unwrap(), b"hello");

        storage.delete(&path).unwrap();
        assert!(storage.read(&path).is_err());
        storage.delete(&path).unwrap();
    }
}
