// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust OCR engine backed by `ocrs` neural models run through `rten`.
//
// Only available with the `ocrs` feature. The engine needs two model files,
// `text-detection.rten` and `text-recognition.rten`, looked up by default in
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is where
// `ocrs-cli` downloads them on first run.
//
// ocrs ignores the language tag and segmentation mode and reports no
// per-token confidences, so its results always score 0 in multi-attempt
// ranking and win only when every other attempt is empty.

use std::path::{Path, PathBuf};

use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use textwerk_core::error::{Result, TextwerkError};
use tracing::{debug, info, instrument};

use super::engine::{OcrEngine, RecognitionRequest, RecognizedText};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model locations for [`OcrsTextEngine`].
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    /// Both models inside one directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(TextwerkError::OcrError(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

pub struct OcrsTextEngine {
    engine: OcrsEngine,
}

impl OcrsTextEngine {
    /// Load both models. Loading is the expensive step; keep the engine.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrsConfig) -> Result<Self> {
        config.validate()?;
        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| TextwerkError::OcrError(format!("cannot initialise ocrs: {}", err)))?;

        info!("ocrs engine ready");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        TextwerkError::OcrError(format!("cannot load model {}: {}", path.display(), err))
    })
}

impl OcrEngine for OcrsTextEngine {
    fn version(&self) -> Result<String> {
        Ok("ocrs".to_owned())
    }

    #[instrument(skip_all, fields(bytes = png.len()))]
    fn recognize(&self, png: &[u8], _request: &RecognitionRequest) -> Result<RecognizedText> {
        let rgb = image::load_from_memory(png)
            .map_err(|err| TextwerkError::ImageError(format!("cannot decode page: {}", err)))?
            .into_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            TextwerkError::OcrError(format!("bad image source ({width}x{height}): {}", err))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| TextwerkError::OcrError(format!("ocrs preprocessing failed: {}", err)))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| TextwerkError::OcrError(format!("ocrs recognition failed: {}", err)))?;

        debug!(lines = text.lines().count(), chars = text.len(), "ocrs recognition done");
        Ok(RecognizedText {
            text,
            confidences: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrsConfig::from_dir("/tmp/models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/tmp/models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_fail_validation() {
        let config = OcrsConfig::from_dir("/nonexistent/textwerk-models");
        assert!(matches!(config.validate(), Err(TextwerkError::OcrError(_))));
        assert!(OcrsTextEngine::new(config).is_err());
    }
}
