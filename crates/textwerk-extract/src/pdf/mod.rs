// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — dual-engine extraction and merge.

pub mod content;
pub mod merge;
pub mod reader;
pub mod structure_engine;
pub mod tables;
pub mod text_engine;

use std::path::Path;

use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::ExtractionResult;
use tracing::{info, instrument};

pub use reader::PdfReader;

/// Runs the text/table engine and the structure/image engine side by side
/// and merges their results.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let data = std::fs::read(path).map_err(|err| {
            TextwerkError::ExtractionFailed(format!("cannot read {}: {}", path.display(), err))
        })?;
        self.extract_bytes(&data)
    }

    /// Both engines must succeed; a failure of either fails the document.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn extract_bytes(&self, data: &[u8]) -> Result<ExtractionResult> {
        let (text, structure) = std::thread::scope(|scope| {
            let text = scope.spawn(|| PdfReader::from_bytes(data).and_then(|r| text_engine::extract(&r)));
            let structure = scope
                .spawn(|| PdfReader::from_bytes(data).and_then(|r| structure_engine::extract(&r)));
            (join(text, "text"), join(structure, "structure"))
        });
        let text = text.map_err(TextwerkError::into_extraction_failure)?;
        let structure = structure.map_err(TextwerkError::into_extraction_failure)?;

        let merged = merge::merge(text, structure);
        info!(
            text_blocks = merged.text_blocks.len(),
            tables = merged.tables.len(),
            images = merged.images.len(),
            "PDF extraction complete"
        );
        Ok(merged)
    }
}

fn join(
    handle: std::thread::ScopedJoinHandle<'_, Result<ExtractionResult>>,
    engine: &str,
) -> Result<ExtractionResult> {
    handle
        .join()
        .map_err(|_| TextwerkError::ExtractionFailed(format!("PDF {engine} engine panicked")))?
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// What to draw on one fixture page.
    pub enum PageSpec<'a> {
        /// Lines of `(x, y, size, text)`.
        Text(&'a [(i64, i64, i64, &'a str)]),
        /// A 4x4 gray raster.
        Image,
    }

    /// Build a small PDF in memory.
    pub fn build_pdf(pages: &[PageSpec<'_>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids = Vec::new();
        for spec in pages {
            let (operations, resources) = match spec {
                PageSpec::Text(lines) => {
                    let mut ops = Vec::new();
                    for (x, y, size, text) in lines.iter() {
                        ops.push(Operation::new("BT", vec![]));
                        ops.push(Operation::new("Tf", vec!["F1".into(), (*size).into()]));
                        ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                        ops.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                        ops.push(Operation::new("ET", vec![]));
                    }
                    (ops, dictionary! { "Font" => dictionary! { "F1" => font_id } })
                }
                PageSpec::Image => {
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => 4,
                            "Height" => 4,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        (0..16u8).map(|v| v * 16).collect(),
                    ));
                    let ops = vec![
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 600.into()],
                        ),
                        Operation::new("Do", vec!["Im1".into()]),
                        Operation::new("Q", vec![]),
                    ];
                    (ops, dictionary! { "XObject" => dictionary! { "Im1" => image_id } })
                }
            };
            let content = Content { operations }.encode().expect("encode content");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
        });
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save fixture");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{PageSpec, build_pdf};
    use super::*;

    #[test]
    fn text_page_and_image_page_do_not_duplicate() {
        let pdf = build_pdf(&[
            PageSpec::Text(&[(72, 700, 11, "Revenue grew in the third quarter.")]),
            PageSpec::Image,
        ]);
        let result = PdfExtractor.extract_bytes(&pdf).unwrap();

        assert_eq!(result.text_blocks.len(), 1);
        assert_eq!(result.text_blocks[0].metadata.page_number, Some(1));
        assert!(result.text_blocks[0].content.contains("Revenue"));
        assert!(result.tables.is_empty());
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].metadata.page_number, Some(2));
        assert_eq!(result.raw_metadata["engine"], "structure");
        assert_eq!(result.raw_metadata["title"], "Quarterly report");
        assert_eq!(result.raw_metadata["page_count"], 2);
    }

    #[test]
    fn aligned_text_yields_a_table_and_heading_hint() {
        let pdf = build_pdf(&[PageSpec::Text(&[
            (72, 760, 18, "Staff"),
            (72, 700, 10, "Name"),
            (200, 700, 10, "Age"),
            (72, 685, 10, "Ana"),
            (200, 685, 10, "30"),
        ])]);
        let result = PdfExtractor.extract_bytes(&pdf).unwrap();

        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].headers, vec!["Name", "Age"]);
        let hints = result.structure.unwrap();
        assert_eq!(hints["pages"][0]["headings"][0]["text"], "Staff");
    }

    #[test]
    fn garbage_bytes_fail_extraction() {
        let err = PdfExtractor.extract_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, TextwerkError::ExtractionFailed(_)));
    }
}
