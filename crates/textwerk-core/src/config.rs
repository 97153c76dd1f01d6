// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TextwerkError};
use crate::types::{PreprocessStrategy, SegmentationMode};

/// File name used when the configuration lives in a data directory.
pub const CONFIG_FILE: &str = "textwerk.json";

/// OCR integration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Run OCR on images at all.
    pub enabled: bool,
    /// Engine binary override. Takes part in path resolution after any
    /// explicit override handed to the locator.
    pub tesseract_cmd: Option<PathBuf>,
    /// Engine language tag, e.g. `fra+eng`.
    pub language: String,
    /// Try every strategy × mode and keep the best result.
    pub multi_attempt: bool,
    /// Preprocess images before recognition.
    pub preprocessing: bool,
    pub strategies: Vec<PreprocessStrategy>,
    pub segmentation_modes: Vec<SegmentationMode>,
    /// Apply rule-based post-correction.
    pub correction: bool,
    /// Engine mode (`--oem`).
    pub engine_mode: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_cmd: None,
            language: "fra+eng".to_owned(),
            multi_attempt: true,
            preprocessing: true,
            strategies: vec![
                PreprocessStrategy::Advanced,
                PreprocessStrategy::Aggressive,
                PreprocessStrategy::Basic,
            ],
            segmentation_modes: SegmentationMode::default_order(),
            correction: true,
            engine_mode: 3,
        }
    }
}

/// What to do when the configured NLP model cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NlpFallback {
    /// Log and continue with the minimal analyzer.
    Minimal,
    /// Refuse to build the enricher.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpSettings {
    /// Model identifier.
    pub model: String,
    pub fallback: NlpFallback,
    /// Language reported when detection is inconclusive.
    pub default_language: String,
}

impl Default for NlpSettings {
    fn default() -> Self {
        Self {
            model: "patterns".to_owned(),
            fallback: NlpFallback::Minimal,
            default_language: "fr".to_owned(),
        }
    }
}

/// How content blocks find their parent heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentLinking {
    /// Level-indexed stack of open headings.
    SectionStack,
    /// Nearest earlier heading with an identical section title.
    SectionTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSettings {
    pub parent_linking: ParentLinking,
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            parent_linking: ParentLinking::SectionStack,
        }
    }
}

/// Top-level configuration consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ocr: OcrSettings,
    pub nlp: NlpSettings,
    pub structure: StructureSettings,
    /// Documents processed simultaneously; further documents queue.
    pub max_concurrent_documents: usize,
    /// Size of the blocking worker pool.
    pub blocking_workers: usize,
    /// Where uploaded files are stored.
    pub upload_dir: PathBuf,
    /// Upload size limit in bytes.
    pub max_file_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr: OcrSettings::default(),
            nlp: NlpSettings::default(),
            structure: StructureSettings::default(),
            max_concurrent_documents: 4,
            blocking_workers: 4,
            upload_dir: PathBuf::from("uploads"),
            max_file_size: 100 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. A missing or unreadable file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write the configuration as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Apply `TEXTWERK_*` and `TESSERACT_CMD` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(cmd) = lookup("TEXTWERK_TESSERACT_CMD").or_else(|| lookup("TESSERACT_CMD")) {
            self.ocr.tesseract_cmd = Some(PathBuf::from(cmd));
        }
        if let Some(value) = lookup("TEXTWERK_OCR_ENABLED") {
            self.ocr.enabled = parse_flag("TEXTWERK_OCR_ENABLED", &value)?;
        }
        if let Some(value) = lookup("TEXTWERK_OCR_MULTI_ATTEMPT") {
            self.ocr.multi_attempt = parse_flag("TEXTWERK_OCR_MULTI_ATTEMPT", &value)?;
        }
        if let Some(value) = lookup("TEXTWERK_OCR_PREPROCESSING") {
            self.ocr.preprocessing = parse_flag("TEXTWERK_OCR_PREPROCESSING", &value)?;
        }
        if let Some(value) = lookup("TEXTWERK_OCR_CORRECTION") {
            self.ocr.correction = parse_flag("TEXTWERK_OCR_CORRECTION", &value)?;
        }
        if let Some(value) = lookup("TEXTWERK_OCR_LANGUAGE") {
            self.ocr.language = value;
        }
        if let Some(value) = lookup("TEXTWERK_NLP_MODEL") {
            self.nlp.model = value;
        }
        if let Some(value) = lookup("TEXTWERK_MAX_CONCURRENT") {
            self.max_concurrent_documents = value.parse().map_err(|_| {
                TextwerkError::Config(format!("TEXTWERK_MAX_CONCURRENT: not a number: {value}"))
            })?;
        }
        if let Some(value) = lookup("TEXTWERK_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(value);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_documents == 0 {
            return Err(TextwerkError::Config(
                "max_concurrent_documents must be at least 1".into(),
            ));
        }
        if self.blocking_workers == 0 {
            return Err(TextwerkError::Config(
                "blocking_workers must be at least 1".into(),
            ));
        }
        if self.ocr.segmentation_modes.is_empty() {
            return Err(TextwerkError::Config(
                "at least one OCR segmentation mode is required".into(),
            ));
        }
        if self.ocr.preprocessing && self.ocr.strategies.is_empty() {
            return Err(TextwerkError::Config(
                "preprocessing is enabled but no strategy is configured".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TextwerkError::Config(format!("{key}: not a flag: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"ocr": {"multi_attempt": false}}"#).unwrap();
        assert!(!config.ocr.multi_attempt);
        assert_eq!(config.ocr.language, "fra+eng");
        assert_eq!(config.max_concurrent_documents, 4);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(dir.path().join(CONFIG_FILE));
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = PipelineConfig::default();
        config.structure.parent_linking = ParentLinking::SectionTitle;
        config.persist(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path), config);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TESSERACT_CMD", "/opt/tess/bin/tesseract"),
            ("TEXTWERK_OCR_MULTI_ATTEMPT", "off"),
            ("TEXTWERK_MAX_CONCURRENT", "2"),
        ]);
        let config = PipelineConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(
            config.ocr.tesseract_cmd,
            Some(PathBuf::from("/opt/tess/bin/tesseract"))
        );
        assert!(!config.ocr.multi_attempt);
        assert_eq!(config.max_concurrent_documents, 2);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = PipelineConfig::default()
            .with_overrides(|k| (k == "TEXTWERK_MAX_CONCURRENT").then(|| "0".to_string()));
        assert!(matches!(result, Err(TextwerkError::Config(_))));
    }
}
