// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-attempt OCR: every preprocessing strategy × segmentation mode is
// recognized once, the attempts are ranked, and the winner is corrected.

use std::sync::{Arc, OnceLock};

use textwerk_core::config::OcrSettings;
use textwerk_core::error::Result;
use textwerk_core::types::{PreprocessStrategy, SegmentationMode};
use tracing::{debug, info, instrument, warn};

use super::correct::OcrCorrector;
use super::engine::{OcrEngine, RecognitionRequest};
use super::locate::TesseractLocator;
use super::preprocess;
use super::tesseract::TesseractEngine;
use crate::image::processor::ImageProcessor;

/// The selected recognition result.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    pub text: String,
    /// In [0, 1], after correction.
    pub confidence: f32,
    /// `None` for the unprocessed image.
    pub strategy: Option<PreprocessStrategy>,
    pub mode: SegmentationMode,
}

/// One recognition attempt before ranking.
#[derive(Debug, Clone)]
struct Attempt {
    strategy: Option<PreprocessStrategy>,
    mode: SegmentationMode,
    text: String,
    confidence: f32,
}

pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    settings: OcrSettings,
    corrector: Option<OcrCorrector>,
    /// Capability probe result, computed on first use.
    version: OnceLock<Option<String>>,
}

impl std::fmt::Debug for OcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrService")
            .field("settings", &self.settings)
            .field("version", &self.version.get())
            .finish_non_exhaustive()
    }
}

impl OcrService {
    pub fn new(engine: Arc<dyn OcrEngine>, settings: OcrSettings) -> Result<Self> {
        let corrector = if settings.correction {
            Some(OcrCorrector::new()?)
        } else {
            None
        };
        Ok(Self {
            engine,
            settings,
            corrector,
            version: OnceLock::new(),
        })
    }

    /// Build a service around the Tesseract binary the locator resolves.
    /// `Ok(None)` when no binary can be found.
    pub fn tesseract(settings: OcrSettings, locator: &TesseractLocator) -> Result<Option<Self>> {
        let Some(command) = locator.locate() else {
            warn!("tesseract not found, OCR disabled");
            return Ok(None);
        };
        Self::new(Arc::new(TesseractEngine::new(command)), settings).map(Some)
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    /// Engine version, probed once per service.
    pub fn version(&self) -> Option<&str> {
        self.version
            .get_or_init(|| match self.engine.version() {
                Ok(version) => {
                    info!(%version, "OCR engine available");
                    Some(version)
                }
                Err(err) => {
                    warn!(error = %err, "OCR engine unavailable");
                    None
                }
            })
            .as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.settings.enabled && self.version().is_some()
    }

    /// Recognize text in encoded image bytes. `Ok(None)` when nothing
    /// readable was found. Blocking.
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub fn recognize(&self, image: &[u8]) -> Result<Option<OcrOutcome>> {
        let unprocessed = ImageProcessor::from_bytes(image)?.to_png_bytes()?;

        let mut attempts = Vec::new();
        for strategy in self.strategies() {
            let png = match strategy {
                None => unprocessed.clone(),
                Some(strategy) => match preprocess::preprocess(image, strategy) {
                    Ok(png) => png,
                    Err(err) => {
                        warn!(strategy = strategy.as_str(), error = %err, "preprocessing failed");
                        continue;
                    }
                },
            };
            for mode in self.modes() {
                if let Some(attempt) = self.attempt(&png, strategy, mode) {
                    attempts.push(attempt);
                }
            }
        }

        let best = match rank(attempts) {
            Some(best) => best,
            None => {
                debug!("every attempt was empty, retrying unprocessed");
                match self.attempt(&unprocessed, None, SegmentationMode::FullyAutomatic) {
                    Some(attempt) if !attempt.text.trim().is_empty() => attempt,
                    _ => return Ok(None),
                }
            }
        };
        info!(
            strategy = best.strategy.map(|s| s.as_str()).unwrap_or("unprocessed"),
            psm = best.mode.psm(),
            confidence = best.confidence,
            "OCR attempt selected"
        );

        let (text, confidence) = match &self.corrector {
            Some(corrector) => corrector.correct_with_confidence(&best.text, best.confidence),
            None => (best.text.trim().to_owned(), best.confidence),
        };
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(OcrOutcome {
            text,
            confidence,
            strategy: best.strategy,
            mode: best.mode,
        }))
    }

    /// Strategies in configured order; a single `None` without preprocessing.
    fn strategies(&self) -> Vec<Option<PreprocessStrategy>> {
        let mut strategies: Vec<Option<PreprocessStrategy>> = if self.settings.preprocessing {
            self.settings.strategies.iter().copied().map(Some).collect()
        } else {
            vec![None]
        };
        if strategies.is_empty() {
            strategies.push(None);
        }
        if !self.settings.multi_attempt {
            strategies.truncate(1);
        }
        strategies
    }

    fn modes(&self) -> Vec<SegmentationMode> {
        let mut modes = self.settings.segmentation_modes.clone();
        if modes.is_empty() {
            modes.push(SegmentationMode::FullyAutomatic);
        }
        if !self.settings.multi_attempt {
            modes.truncate(1);
        }
        modes
    }

    fn attempt(
        &self,
        png: &[u8],
        strategy: Option<PreprocessStrategy>,
        mode: SegmentationMode,
    ) -> Option<Attempt> {
        let request = RecognitionRequest {
            language: self.settings.language.clone(),
            mode,
            engine_mode: self.settings.engine_mode,
        };
        match self.engine.recognize(png, &request) {
            Ok(recognized) => {
                let confidence = recognized.mean_confidence();
                debug!(
                    strategy = strategy.map(|s| s.as_str()).unwrap_or("unprocessed"),
                    psm = mode.psm(),
                    confidence,
                    chars = recognized.text.len(),
                    "OCR attempt done"
                );
                Some(Attempt {
                    strategy,
                    mode,
                    text: recognized.text,
                    confidence,
                })
            }
            Err(err) => {
                warn!(psm = mode.psm(), error = %err, "OCR attempt failed");
                None
            }
        }
    }
}

/// Best non-empty attempt by `(confidence, text length)`, earliest first on
/// ties.
fn rank(mut attempts: Vec<Attempt>) -> Option<Attempt> {
    attempts.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.text.len().cmp(&a.text.len()))
    });
    attempts
        .into_iter()
        .find(|attempt| !attempt.text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::encode_png;
    use crate::ocr::engine::RecognizedText;
    use image::{DynamicImage, GrayImage, Luma};
    use std::sync::Mutex;
    use textwerk_core::error::TextwerkError;

    /// Answers by segmentation mode and records every request.
    struct ScriptedEngine {
        answers: Vec<(SegmentationMode, &'static str, f32)>,
        calls: Mutex<Vec<u8>>,
    }

    impl ScriptedEngine {
        fn new(answers: Vec<(SegmentationMode, &'static str, f32)>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<u8> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn version(&self) -> Result<String> {
            Ok("tesseract 5.3.0".into())
        }

        fn recognize(&self, _png: &[u8], request: &RecognitionRequest) -> Result<RecognizedText> {
            self.calls.lock().unwrap().push(request.mode.psm());
            let (_, text, confidence) = self
                .answers
                .iter()
                .find(|(mode, _, _)| *mode == request.mode)
                .ok_or_else(|| TextwerkError::OcrError("no answer".into()))?;
            Ok(RecognizedText {
                text: text.to_string(),
                confidences: vec![-1.0, *confidence],
            })
        }
    }

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn version(&self) -> Result<String> {
            Err(TextwerkError::OcrError("not installed".into()))
        }

        fn recognize(&self, _png: &[u8], _request: &RecognitionRequest) -> Result<RecognizedText> {
            Err(TextwerkError::OcrError("not installed".into()))
        }
    }

    fn scan() -> Vec<u8> {
        let gray = GrayImage::from_fn(32, 16, |x, _| Luma([if x % 4 == 0 { 20 } else { 230 }]));
        encode_png(&DynamicImage::ImageLuma8(gray)).unwrap()
    }

    fn settings() -> OcrSettings {
        OcrSettings {
            strategies: vec![PreprocessStrategy::Basic],
            ..OcrSettings::default()
        }
    }

    #[test]
    fn highest_confidence_wins_and_is_corrected() {
        let engine = ScriptedEngine::new(vec![
            (SegmentationMode::UniformBlock, "cudi 12 mbre 2025", 80.0),
            (SegmentationMode::SparseText, "bruit", 40.0),
            (SegmentationMode::FullyAutomatic, "cudi 12 mbre", 80.0),
            (SegmentationMode::SparseTextOsd, "", 99.0),
        ]);
        let service = OcrService::new(engine.clone(), settings()).unwrap();
        let outcome = service.recognize(&scan()).unwrap().unwrap();

        assert_eq!(outcome.text, "Jeudi 12 décembre 2025");
        assert_eq!(outcome.mode, SegmentationMode::UniformBlock);
        assert_eq!(outcome.strategy, Some(PreprocessStrategy::Basic));
        assert!((outcome.confidence - 0.84).abs() < 1e-5);
        assert_eq!(engine.calls(), vec![6, 11, 3, 12]);
    }

    #[test]
    fn repeated_calls_select_the_same_attempt() {
        let engine = ScriptedEngine::new(vec![
            (SegmentationMode::UniformBlock, "Période 1", 70.0),
            (SegmentationMode::SparseText, "Période 2", 70.0),
            (SegmentationMode::FullyAutomatic, "Période 3", 70.0),
            (SegmentationMode::SparseTextOsd, "Période 4", 70.0),
        ]);
        let service = OcrService::new(engine, settings()).unwrap();
        let first = service.recognize(&scan()).unwrap();
        let second = service.recognize(&scan()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().mode, SegmentationMode::UniformBlock);
    }

    #[test]
    fn single_attempt_without_multi_attempt() {
        let engine = ScriptedEngine::new(vec![(SegmentationMode::UniformBlock, "texte", 90.0)]);
        let service = OcrService::new(
            engine.clone(),
            OcrSettings {
                multi_attempt: false,
                preprocessing: false,
                correction: false,
                ..OcrSettings::default()
            },
        )
        .unwrap();
        let outcome = service.recognize(&scan()).unwrap().unwrap();
        assert_eq!(outcome.strategy, None);
        assert!((outcome.confidence - 0.9).abs() < 1e-5);
        assert_eq!(engine.calls(), vec![6]);
    }

    #[test]
    fn empty_attempts_retry_unprocessed_then_give_up() {
        let engine = ScriptedEngine::new(vec![
            (SegmentationMode::UniformBlock, "", 0.0),
            (SegmentationMode::FullyAutomatic, "  ", 0.0),
        ]);
        let service = OcrService::new(engine.clone(), settings()).unwrap();
        assert_eq!(service.recognize(&scan()).unwrap(), None);
        // 6 and 3 answer, 11 and 12 fail and are skipped, then the fallback.
        assert_eq!(engine.calls(), vec![6, 11, 3, 12, 3]);
    }

    #[test]
    fn probe_is_cached_and_reports_unavailability() {
        let service = OcrService::new(Arc::new(BrokenEngine), settings()).unwrap();
        assert!(!service.is_available());
        assert_eq!(service.version(), None);

        let engine = ScriptedEngine::new(Vec::new());
        let service = OcrService::new(engine, settings()).unwrap();
        assert!(service.is_available());
        assert_eq!(service.version(), Some("tesseract 5.3.0"));
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let service = OcrService::new(Arc::new(BrokenEngine), settings()).unwrap();
        assert!(service.recognize(b"not an image").is_err());
    }
}
