// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The common extraction-result shape every format engine produces.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ColumnType, ExtractionMethod};

/// Axis-aligned position of a unit on its page, in source units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Provenance and placement shared by every extraction unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// 1-based page number, when the source is paginated.
    pub page_number: Option<u32>,
    pub position: Option<BoundingBox>,
    /// Intra-source sequence number.
    pub order: u32,
    pub section_id: Option<String>,
    pub section_level: Option<u8>,
    pub section_title: Option<String>,
    pub language: Option<String>,
    /// In [0, 1].
    pub confidence: Option<f32>,
    pub extraction_method: Option<ExtractionMethod>,
    /// Engine-specific payloads only.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_metadata: Map<String, Value>,
}

impl ContentMetadata {
    pub fn new(order: u32) -> Self {
        Self {
            page_number: None,
            position: None,
            order,
            section_id: None,
            section_level: None,
            section_title: None,
            language: None,
            confidence: None,
            extraction_method: None,
            additional_metadata: Map::new(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_method(mut self, method: ExtractionMethod) -> Self {
        self.extraction_method = Some(method);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.additional_metadata.insert(key.to_owned(), value.into());
        self
    }

    /// Page number used for ordering; absent pages sort as 0.
    pub fn page_or_zero(&self) -> u32 {
        self.page_number.unwrap_or(0)
    }
}

// -- Text ---------------------------------------------------------------------

/// A named entity located inside a text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    /// Byte offsets into the owning text.
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

/// A pairwise link between two entities of the same text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Index into the owning entity list.
    pub source: usize,
    pub target: usize,
    pub kind: String,
    /// Distance in tokens.
    pub distance: usize,
}

/// Semantic annotations attached by the text enricher.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub key_phrases: Vec<String>,
    /// Short all-uppercase sentences that read like headings.
    pub heading_candidates: Vec<String>,
    pub relevance_score: f32,
    pub token_count: usize,
    pub sentence_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
    pub metadata: ContentMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl TextBlock {
    pub fn new(content: impl Into<String>, metadata: ContentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
            enrichment: None,
        }
    }
}

// -- Tables -------------------------------------------------------------------

/// A single table cell. `Empty` is the null produced by type coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// The cell as the string a cleaner would see.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Empty => String::new(),
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(raw: Option<String>) -> Self {
        Self::Text(raw.unwrap_or_default())
    }
}

impl From<&str> for CellValue {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Empty until the table normalizer has run.
    #[serde(default)]
    pub column_types: Vec<ColumnType>,
    pub metadata: ContentMetadata,
}

impl TableBlock {
    /// Build a table from raw engine cells; missing cells become empty strings.
    pub fn from_raw(
        headers: Vec<Option<String>>,
        rows: Vec<Vec<Option<String>>>,
        metadata: ContentMetadata,
    ) -> Self {
        Self {
            headers: headers.into_iter().map(Option::unwrap_or_default).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(CellValue::from).collect())
                .collect(),
            column_types: Vec::new(),
            metadata,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

// -- Images -------------------------------------------------------------------

/// Coarse classification of what an image depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Chart,
    Diagram,
    Image,
}

/// Decoded properties of an image, filled by the image stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
    pub color_type: String,
    pub size_bytes: usize,
    pub kind: ImageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    pub image_path: Option<PathBuf>,
    pub ocr_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ImageDetails>,
    pub metadata: ContentMetadata,
}

impl ImageBlock {
    pub fn from_bytes(data: Vec<u8>, metadata: ContentMetadata) -> Self {
        Self {
            image_data: Some(data),
            image_path: None,
            ocr_text: None,
            details: None,
            metadata,
        }
    }
}

// -- Result -------------------------------------------------------------------

/// Everything one extraction call produced for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<TableBlock>,
    pub images: Vec<ImageBlock>,
    /// Engine-provided structural hints (headings, paragraph counts, ...).
    pub structure: Option<Value>,
    pub raw_metadata: Map<String, Value>,
}

impl ExtractionResult {
    pub fn has_content(&self) -> bool {
        !self.text_blocks.is_empty() || !self.tables.is_empty() || !self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_has_no_content() {
        assert!(!ExtractionResult::default().has_content());
        let mut result = ExtractionResult::default();
        result.images.push(ImageBlock::from_bytes(vec![1], ContentMetadata::new(0)));
        assert!(result.has_content());
    }

    #[test]
    fn missing_cells_become_empty_strings() {
        let table = TableBlock::from_raw(
            vec![Some("a".into()), None],
            vec![vec![None, Some("x".into())]],
            ContentMetadata::new(0),
        );
        assert_eq!(table.headers, vec!["a".to_string(), String::new()]);
        assert_eq!(table.rows[0][0], CellValue::Text(String::new()));
    }

    #[test]
    fn empty_cell_serializes_as_null() {
        let json = serde_json::to_value(vec![CellValue::Empty, CellValue::Number(30.0)]).unwrap();
        assert_eq!(json, serde_json::json!([null, 30.0]));
    }

    #[test]
    fn confidence_is_clamped() {
        let meta = ContentMetadata::new(0).with_confidence(1.7);
        assert_eq!(meta.confidence, Some(1.0));
    }
}
