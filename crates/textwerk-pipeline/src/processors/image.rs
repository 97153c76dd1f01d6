// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image stage: decode details, run OCR, and turn recognized text into an
// extra text block for enrichment.

use std::sync::Arc;

use textwerk_core::extraction::{ContentMetadata, ImageBlock, ImageDetails, TextBlock};
use textwerk_core::types::ExtractionMethod;
use textwerk_extract::image::processor::describe;
use textwerk_extract::ocr::{OcrOutcome, OcrService};
use tracing::{debug, instrument, warn};

use crate::pool::BlockingPool;

/// Value of the `source` extra on text recovered from an image.
pub const OCR_SOURCE: &str = "image_ocr";

#[derive(Debug, Clone, Default)]
pub struct ImageStage {
    ocr: Option<Arc<OcrService>>,
}

impl ImageStage {
    pub fn new(ocr: Option<Arc<OcrService>>) -> Self {
        Self { ocr }
    }

    /// An OCR service is attached, enabled, and its engine answers.
    pub fn ocr_available(&self) -> bool {
        self.ocr.as_ref().is_some_and(|ocr| ocr.is_available())
    }

    /// Process one image. Blocking. Failures hand the image back untouched.
    pub fn process(&self, block: ImageBlock) -> (ImageBlock, Option<TextBlock>) {
        let data = match (&block.image_data, &block.image_path) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => match std::fs::read(path) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "image file unreadable");
                    return (block, None);
                }
            },
            (None, None) => return (block, None),
        };

        let details = match describe(&data) {
            Ok(details) => details,
            Err(err) => {
                warn!(order = block.metadata.order, error = %err, "image skipped");
                return (block, None);
            }
        };

        let outcome = match &self.ocr {
            Some(ocr) if ocr.is_available() => match ocr.recognize(&data) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(order = block.metadata.order, error = %err, "image OCR failed");
                    return (block, None);
                }
            },
            _ => None,
        };

        let mut block = block;
        let text_block = outcome.map(|outcome| {
            let text_block = ocr_text_block(&block.metadata, &details, &outcome);
            block.ocr_text = Some(outcome.text);
            block.metadata.confidence = Some(outcome.confidence.clamp(0.0, 1.0));
            text_block
        });
        block.details = Some(details);
        (block, text_block)
    }

    /// Process every image on the pool. Output order matches input order;
    /// recovered text blocks follow their images.
    #[instrument(skip_all, fields(images = images.len()))]
    pub async fn process_batch(
        &self,
        pool: &BlockingPool,
        images: Vec<ImageBlock>,
    ) -> (Vec<ImageBlock>, Vec<TextBlock>) {
        let handles: Vec<_> = images
            .into_iter()
            .map(|image| {
                let stage = self.clone();
                let original = image.clone();
                (original, pool.submit(move || stage.process(image)))
            })
            .collect();

        let mut processed = Vec::with_capacity(handles.len());
        let mut texts = Vec::new();
        for (original, handle) in handles {
            match handle.await {
                Ok(Ok((image, text))) => {
                    processed.push(image);
                    texts.extend(text);
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "image job failed");
                    processed.push(original);
                }
                Err(err) => {
                    warn!(error = %err, "image job was lost");
                    processed.push(original);
                }
            }
        }
        debug!(images = processed.len(), ocr_blocks = texts.len(), "image stage done");
        (processed, texts)
    }
}

fn ocr_text_block(image: &ContentMetadata, details: &ImageDetails, outcome: &OcrOutcome) -> TextBlock {
    let mut metadata = ContentMetadata::new(image.order)
        .with_method(ExtractionMethod::TesseractOcr)
        .with_confidence(outcome.confidence)
        .with_extra("source", OCR_SOURCE)
        .with_extra("image_width", details.width)
        .with_extra("image_height", details.height)
        .with_extra("segmentation_mode", outcome.mode.psm());
    metadata.page_number = image.page_number;
    if let Some(format) = &details.format {
        metadata = metadata.with_extra("image_format", format.as_str());
    }
    if let Some(strategy) = outcome.strategy {
        metadata = metadata.with_extra("preprocessing", strategy.as_str());
    }
    TextBlock::new(outcome.text.clone(), metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Cursor;
    use textwerk_core::config::OcrSettings;
    use textwerk_core::error::{Result, TextwerkError};
    use textwerk_extract::ocr::{OcrEngine, RecognitionRequest, RecognizedText};

    /// Returns the same text for every request.
    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn version(&self) -> Result<String> {
            Ok("tesseract 5.3.0".into())
        }

        fn recognize(&self, _png: &[u8], _request: &RecognitionRequest) -> Result<RecognizedText> {
            Ok(RecognizedText {
                text: self.0.to_string(),
                confidences: if self.0.is_empty() { vec![] } else { vec![88.0] },
            })
        }
    }

    struct MissingEngine;

    impl OcrEngine for MissingEngine {
        fn version(&self) -> Result<String> {
            Err(TextwerkError::OcrError("not installed".into()))
        }

        fn recognize(&self, _png: &[u8], _request: &RecognitionRequest) -> Result<RecognizedText> {
            Err(TextwerkError::OcrError("not installed".into()))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let gray = GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 255) as u8]));
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn stage(engine: Arc<dyn OcrEngine>) -> ImageStage {
        let settings = OcrSettings {
            multi_attempt: false,
            preprocessing: false,
            ..OcrSettings::default()
        };
        ImageStage::new(Some(Arc::new(OcrService::new(engine, settings).unwrap())))
    }

    fn image_block(data: Vec<u8>, page: u32, order: u32) -> ImageBlock {
        ImageBlock::from_bytes(
            data,
            ContentMetadata::new(order)
                .with_page(page)
                .with_method(ExtractionMethod::PdfStructure),
        )
    }

    #[test]
    fn recognized_text_becomes_a_text_block() {
        let (image, text) = stage(Arc::new(FixedEngine("Facture 2025"))).process(image_block(png(40, 30), 2, 5));
        assert_eq!(image.ocr_text.as_deref(), Some("Facture 2025"));
        assert_eq!(image.details.as_ref().unwrap().width, 40);

        let text = text.unwrap();
        assert_eq!(text.content, "Facture 2025");
        assert_eq!(text.metadata.page_number, Some(2));
        assert_eq!(text.metadata.order, 5);
        assert_eq!(text.metadata.extraction_method, Some(ExtractionMethod::TesseractOcr));
        assert_eq!(text.metadata.additional_metadata["source"], OCR_SOURCE);
        assert_eq!(text.metadata.additional_metadata["image_format"], "png");
    }

    #[test]
    fn blank_image_has_no_ocr_text() {
        let (image, text) = stage(Arc::new(FixedEngine(""))).process(image_block(png(20, 20), 1, 0));
        assert!(image.ocr_text.is_none());
        assert!(image.details.is_some());
        assert!(text.is_none());
    }

    #[test]
    fn unavailable_engine_only_describes() {
        let stage = stage(Arc::new(MissingEngine));
        assert!(!stage.ocr_available());
        let (image, text) = stage.process(image_block(png(20, 20), 1, 0));
        assert!(image.details.is_some());
        assert!(text.is_none());
    }

    #[test]
    fn undecodable_image_is_returned_untouched() {
        let original = image_block(b"not an image".to_vec(), 1, 0);
        let (image, text) = ImageStage::default().process(original.clone());
        assert_eq!(image, original);
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn batch_keeps_image_order() {
        let pool = BlockingPool::new(2);
        let images = vec![
            image_block(png(10, 10), 1, 0),
            image_block(b"broken".to_vec(), 1, 1),
            image_block(png(12, 10), 2, 2),
        ];
        let (images, texts) = stage(Arc::new(FixedEngine("texte"))).process_batch(&pool, images).await;
        let orders: Vec<u32> = images.iter().map(|i| i.metadata.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(images[1].details.is_none());
        let text_orders: Vec<u32> = texts.iter().map(|t| t.metadata.order).collect();
        assert_eq!(text_orders, vec![0, 2]);
    }
}
