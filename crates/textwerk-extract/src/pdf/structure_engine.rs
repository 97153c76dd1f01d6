// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structure/image-fidelity PDF engine: layout-ordered page text, heading
// hints from font sizes, and embedded image XObjects.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Object, ObjectId, Stream};
use serde_json::{Value, json};
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::{ContentMetadata, ExtractionResult, ImageBlock, TextBlock};
use textwerk_core::types::ExtractionMethod;
use tracing::{debug, instrument, warn};

use super::content::{group_lines, page_spans};
use super::reader::PdfReader;
use crate::image::processor::encode_png;

/// Lines set larger than this (in points) are recorded as heading candidates.
const HEADING_MIN_SIZE: f32 = 12.0;

#[instrument(skip_all, fields(pages = reader.page_count()))]
pub fn extract(reader: &PdfReader) -> Result<ExtractionResult> {
    let mut result = ExtractionResult::default();
    let mut page_hints = Vec::new();

    for (page_number, page_id) in reader.pages() {
        let lines = group_lines(page_spans(reader, page_id)?);

        let mut headings = Vec::new();
        let mut paragraphs = 0usize;
        let mut text_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let text = line.text();
            if text.is_empty() {
                continue;
            }
            if line.font_size > HEADING_MIN_SIZE {
                headings.push(json!({ "text": text, "size": line.font_size }));
            } else {
                paragraphs += 1;
            }
            text_lines.push(text);
        }

        let hints = json!({
            "page": page_number,
            "headings": headings,
            "paragraph_count": paragraphs,
        });
        if !text_lines.is_empty() {
            let metadata = ContentMetadata::new(result.text_blocks.len() as u32)
                .with_page(page_number)
                .with_method(ExtractionMethod::PdfStructure)
                .with_extra("structure", hints.clone());
            result
                .text_blocks
                .push(TextBlock::new(text_lines.join("\n"), metadata));
        }
        page_hints.push(hints);

        for (name, stream) in page_images(reader, page_id) {
            match encode_image(stream) {
                Ok((bytes, format)) => {
                    let metadata = ContentMetadata::new(result.images.len() as u32)
                        .with_page(page_number)
                        .with_method(ExtractionMethod::PdfStructure)
                        .with_extra("xobject", name)
                        .with_extra("encoding", format);
                    result.images.push(ImageBlock::from_bytes(bytes, metadata));
                }
                Err(err) => warn!(page_number, xobject = %name, %err, "skipping unreadable image"),
            }
        }
    }

    result.structure = Some(json!({ "pages": page_hints }));
    result
        .raw_metadata
        .insert("page_count".into(), Value::from(reader.page_count()));
    result
        .raw_metadata
        .insert("pdf_version".into(), Value::from(reader.version()));
    result
        .raw_metadata
        .insert("engine".into(), Value::from("structure"));
    result
        .raw_metadata
        .insert("image_count".into(), Value::from(result.images.len()));

    debug!(
        text_blocks = result.text_blocks.len(),
        images = result.images.len(),
        "structure engine done"
    );
    Ok(result)
}

/// Image XObjects referenced from the page's resources, in resource-name order.
fn page_images<'a>(reader: &'a PdfReader, page_id: ObjectId) -> Vec<(String, &'a Stream)> {
    let Some(resources) = reader.page_resources(page_id) else {
        return Vec::new();
    };
    let Some(Object::Dictionary(xobjects)) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| reader.resolve(obj))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| match reader.resolve(obj) {
            Some(Object::Stream(stream)) if is_image(stream) => {
                Some((String::from_utf8_lossy(name).into_owned(), stream))
            }
            _ => None,
        })
        .collect()
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
}

fn filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Encoded image bytes plus the format they are in.
///
/// DCT streams are already JPEG files. Flate or unfiltered 8-bit RGB and
/// gray rasters are re-encoded as PNG. Anything else is kept raw.
fn encode_image(stream: &Stream) -> Result<(Vec<u8>, &'static str)> {
    let filters = filters(stream);
    if filters.iter().any(|f| f == b"DCTDecode") {
        return Ok((stream.content.clone(), "jpeg"));
    }

    let pixels = match filters.as_slice() {
        [] => stream.content.clone(),
        [only] if only == b"FlateDecode" => stream.decompressed_content().map_err(|err| {
            TextwerkError::PdfError(format!("cannot inflate image stream: {}", err))
        })?,
        _ => return Ok((stream.content.clone(), "raw")),
    };

    let dimension = |key: &[u8]| -> Option<u32> {
        stream
            .dict
            .get(key)
            .ok()
            .and_then(|obj| obj.as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
    };
    let (Some(width), Some(height)) = (dimension(b"Width"), dimension(b"Height")) else {
        return Ok((stream.content.clone(), "raw"));
    };
    if dimension(b"BitsPerComponent") != Some(8) {
        return Ok((stream.content.clone(), "raw"));
    }

    let color_space = stream
        .dict
        .get(b"ColorSpace")
        .and_then(Object::as_name)
        .unwrap_or(b"");
    let image = match color_space {
        b"DeviceRGB" => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        b"DeviceGray" => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        _ => return Ok((stream.content.clone(), "raw")),
    };
    let image = image.ok_or_else(|| {
        TextwerkError::PdfError(format!(
            "image stream shorter than its {}x{} raster",
            width, height
        ))
    })?;

    Ok((encode_png(&image)?, "png"))
}
