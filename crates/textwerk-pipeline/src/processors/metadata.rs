// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata extractor: file facts and content counts for the artifact header.

use serde_json::{Map, Value, json};
use textwerk_core::document::Document;
use textwerk_core::extraction::ExtractionResult;

/// Filename, media type, size, digest, and any title/author found so far.
pub fn file_metadata(document: &Document) -> Map<String, Value> {
    let file = &document.file_metadata;
    let mut map = Map::new();
    map.insert("filename".into(), json!(file.filename));
    map.insert("media_type".into(), json!(file.media_type));
    map.insert("file_size".into(), json!(file.file_size));
    map.insert("sha256".into(), json!(file.sha256));
    map.insert("uploaded_at".into(), json!(file.uploaded_at.to_rfc3339()));
    if let Some(title) = &file.title {
        map.insert("title".into(), json!(title));
    }
    if let Some(author) = &file.author {
        map.insert("author".into(), json!(author));
    }
    map
}

/// Unit counts after enrichment.
pub fn content_metadata(result: &ExtractionResult) -> Map<String, Value> {
    let total_entities: usize = result
        .text_blocks
        .iter()
        .filter_map(|block| block.enrichment.as_ref())
        .map(|enrichment| enrichment.entities.len())
        .sum();
    let mut map = Map::new();
    map.insert("text_blocks".into(), json!(result.text_blocks.len()));
    map.insert("tables".into(), json!(result.tables.len()));
    map.insert("images".into(), json!(result.images.len()));
    map.insert("has_content".into(), json!(result.has_content()));
    map.insert("total_entities".into(), json!(total_entities));
    map
}

/// Title and author as reported by the source document, if any.
pub fn source_title_author(raw: &Map<String, Value>) -> (Option<String>, Option<String>) {
    let field = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };
    (field("title"), field("author"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use textwerk_core::document::FileMetadata;
    use textwerk_core::extraction::{ContentMetadata, Enrichment, Entity, TextBlock};

    #[test]
    fn file_facts() {
        let mut file = FileMetadata::new("avis.pdf".into(), PathBuf::from("/tmp/x.pdf"), 42, "ab".into());
        file.title = Some("Avis".into());
        let map = file_metadata(&Document::new(file));
        assert_eq!(map["media_type"], "application/pdf");
        assert_eq!(map["file_size"], 42);
        assert_eq!(map["title"], "Avis");
        assert!(map.get("author").is_none());
    }

    #[test]
    fn counts_entities_across_blocks() {
        let mut block = TextBlock::new("x", ContentMetadata::new(0));
        block.enrichment = Some(Enrichment {
            entities: vec![Entity {
                text: "2025".into(),
                label: "DATE".into(),
                start: 0,
                end: 4,
                confidence: 1.0,
            }],
            ..Enrichment::default()
        });
        let result = ExtractionResult {
            text_blocks: vec![block, TextBlock::new("y", ContentMetadata::new(1))],
            ..ExtractionResult::default()
        };
        let map = content_metadata(&result);
        assert_eq!(map["text_blocks"], 2);
        assert_eq!(map["total_entities"], 1);
        assert_eq!(map["has_content"], true);
    }

    #[test]
    fn title_and_author_from_raw_metadata() {
        let raw = json!({"title": "Rapport", "author": "  "});
        let (title, author) = source_title_author(raw.as_object().unwrap());
        assert_eq!(title.as_deref(), Some("Rapport"));
        assert_eq!(author, None);
    }
}
