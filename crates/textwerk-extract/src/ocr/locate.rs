// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract binary resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use textwerk_core::config::OcrSettings;
use tracing::{debug, warn};

#[cfg(windows)]
const BINARY: &str = "tesseract.exe";
#[cfg(not(windows))]
const BINARY: &str = "tesseract";

/// Resolves the engine binary: explicit override, then the configured path
/// (config file or `TESSERACT_CMD`), then `PATH`, then well-known install
/// directories.
#[derive(Debug, Clone)]
pub struct TesseractLocator {
    explicit: Option<PathBuf>,
    configured: Option<PathBuf>,
    search_path: Option<OsString>,
    well_known: Vec<PathBuf>,
}

impl Default for TesseractLocator {
    fn default() -> Self {
        Self {
            explicit: None,
            configured: None,
            search_path: std::env::var_os("PATH"),
            well_known: well_known_dirs(),
        }
    }
}

impl TesseractLocator {
    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self {
            configured: settings.tesseract_cmd.clone(),
            ..Self::default()
        }
    }

    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_well_known_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.well_known = dirs;
        self
    }

    pub fn locate(&self) -> Option<PathBuf> {
        for (source, candidate) in [("explicit", &self.explicit), ("configured", &self.configured)] {
            let Some(candidate) = candidate else {
                continue;
            };
            match as_binary(candidate) {
                Some(found) => {
                    debug!(source, path = %found.display(), "engine binary resolved");
                    return Some(found);
                }
                None => warn!(source, path = %candidate.display(), "engine path does not exist"),
            }
        }

        if let Some(search_path) = &self.search_path
            && let Some(found) = std::env::split_paths(search_path)
                .map(|dir| dir.join(BINARY))
                .find(|path| path.is_file())
        {
            debug!(path = %found.display(), "engine binary found on PATH");
            return Some(found);
        }

        let found = self
            .well_known
            .iter()
            .map(|dir| dir.join(BINARY))
            .find(|path| path.is_file());
        match &found {
            Some(path) => debug!(path = %path.display(), "engine binary found in install directory"),
            None => debug!("engine binary not found"),
        }
        found
    }
}

/// A file path, or a directory holding the binary.
fn as_binary(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        let inner = path.join(BINARY);
        return inner.is_file().then_some(inner);
    }
    path.is_file().then(|| path.to_path_buf())
}

#[cfg(windows)]
fn well_known_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from(r"C:\Program Files\Tesseract-OCR"),
        PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR"),
    ];
    if let Some(local) = std::env::var_os("LOCALAPPDATA") {
        dirs.push(PathBuf::from(local).join("Programs").join("Tesseract-OCR"));
    }
    dirs.push(PathBuf::from(r"C:\Tesseract-OCR"));
    dirs
}

#[cfg(not(windows))]
fn well_known_dirs() -> Vec<PathBuf> {
    ["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}
