// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-file extraction: the whole file becomes one image block. Recognition
// happens later, in the pipeline's image stage.

use std::path::Path;

use serde_json::Value;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::{ContentMetadata, ExtractionResult, ImageBlock};
use textwerk_core::types::ExtractionMethod;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageExtractor;

impl ImageExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let data = std::fs::read(path).map_err(|err| {
            TextwerkError::ExtractionFailed(format!("cannot read {}: {}", path.display(), err))
        })?;
        let format = image::guess_format(&data).map_err(|err| {
            TextwerkError::ImageError(format!("{} is not a readable image: {}", path.display(), err))
        })?;
        debug!(?format, size = data.len(), "image file read");

        let mut result = ExtractionResult::default();
        result
            .raw_metadata
            .insert("format".into(), Value::from(format!("{:?}", format).to_lowercase()));
        result
            .raw_metadata
            .insert("size_bytes".into(), Value::from(data.len()));

        let metadata = ContentMetadata::new(0)
            .with_page(1)
            .with_method(ExtractionMethod::Image);
        let mut block = ImageBlock::from_bytes(data, metadata);
        block.image_path = Some(path.to_path_buf());
        result.images.push(block);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage};

    #[test]
    fn image_file_becomes_one_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        DynamicImage::ImageLuma8(GrayImage::new(8, 8)).save(&path).unwrap();

        let result = ImageExtractor.extract(&path).unwrap();
        assert_eq!(result.images.len(), 1);
        let block = &result.images[0];
        assert_eq!(block.image_path.as_deref(), Some(path.as_path()));
        assert!(block.image_data.as_ref().is_some_and(|d| !d.is_empty()));
        assert!(block.ocr_text.is_none());
        assert_eq!(block.metadata.page_number, Some(1));
        assert_eq!(result.raw_metadata["format"], "png");
    }

    #[test]
    fn unreadable_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"nope").unwrap();
        assert!(matches!(
            ImageExtractor.extract(&path),
            Err(TextwerkError::ImageError(_))
        ));
    }
}
