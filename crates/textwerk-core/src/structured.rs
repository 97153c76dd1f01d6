// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structured output: typed, ordered, linked content blocks and the versioned
// artifact built from them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extraction::{CellValue, ContentMetadata, Entity, ImageDetails, TableBlock};
use crate::types::{BlockId, ColumnType, ContentType, DocumentId, StructuredDataId};

/// Version tag written into every structured artifact.
pub const SCHEMA_VERSION: &str = "1.0";

/// Variant-shaped payload of a content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BlockContent {
    Text {
        text: String,
    },
    Heading {
        text: String,
        level: u8,
    },
    List {
        items: Vec<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        column_types: Vec<ColumnType>,
        row_count: usize,
        column_count: usize,
    },
    Image {
        image_path: Option<PathBuf>,
        ocr_text: Option<String>,
        details: Option<ImageDetails>,
    },
}

impl BlockContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Text { .. } => ContentType::Text,
            Self::Heading { .. } => ContentType::Heading,
            Self::List { .. } => ContentType::List,
            Self::Table { .. } => ContentType::Table,
            Self::Image { .. } => ContentType::Image,
        }
    }

    /// Stable, content-derived key used as the last ordering tie-break.
    pub fn ordering_key(&self) -> String {
        match self {
            Self::Text { text } | Self::Heading { text, .. } => text.clone(),
            Self::List { items } => items.join("\n"),
            Self::Table { headers, rows, .. } => {
                let mut key = headers.join("\t");
                for row in rows {
                    key.push('\n');
                    key.push_str(
                        &row.iter()
                            .map(CellValue::as_text)
                            .collect::<Vec<_>>()
                            .join("\t"),
                    );
                }
                key
            }
            Self::Image {
                image_path,
                ocr_text,
                ..
            } => format!(
                "{}\n{}",
                image_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                ocr_text.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// The unified, typed, ordered, linked unit of document content.
///
/// Relations are identifiers, never owned references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: BlockId,
    pub document_id: DocumentId,
    pub content_type: ContentType,
    pub content: BlockContent,
    pub metadata: ContentMetadata,
    pub entities: Vec<Entity>,
    pub relevance_score: Option<f32>,
    pub parent_block_id: Option<BlockId>,
    pub previous_block_id: Option<BlockId>,
    pub next_block_id: Option<BlockId>,
}

impl ContentBlock {
    pub fn new(document_id: DocumentId, content: BlockContent, metadata: ContentMetadata) -> Self {
        Self {
            id: BlockId::new(),
            document_id,
            content_type: content.content_type(),
            content,
            metadata,
            entities: Vec::new(),
            relevance_score: None,
            parent_block_id: None,
            previous_block_id: None,
            next_block_id: None,
        }
    }

    /// Total-order key: `(order, page-or-0)`, then type rank, then content.
    pub fn sort_key(&self) -> (u32, u32, u8, String) {
        (
            self.metadata.order,
            self.metadata.page_or_zero(),
            self.content_type.sort_rank(),
            self.content.ordering_key(),
        )
    }

    /// Title a heading exposes to the section tree.
    pub fn section_title(&self) -> Option<&str> {
        self.metadata.section_title.as_deref().or(match &self.content {
            BlockContent::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// The table payload as a standalone table, for CSV or record export.
    pub fn as_table(&self) -> Option<TableBlock> {
        match &self.content {
            BlockContent::Table {
                headers,
                rows,
                column_types,
                ..
            } => Some(TableBlock {
                headers: headers.clone(),
                rows: rows.clone(),
                column_types: column_types.clone(),
                metadata: self.metadata.clone(),
            }),
            _ => None,
        }
    }
}

/// One section of the document hierarchy, opened by a heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Id of the heading block that opened this section.
    pub id: BlockId,
    pub level: u8,
    pub title: String,
    /// Every block from the heading up to the next heading of equal or
    /// higher priority, heading included.
    pub block_ids: Vec<BlockId>,
    pub subsections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionTree {
    pub sections: Vec<Section>,
    /// Blocks that precede the first heading.
    pub orphan_blocks: Vec<BlockId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub by_type: BTreeMap<ContentType, Vec<BlockId>>,
    pub by_page: BTreeMap<u32, Vec<BlockId>>,
    pub by_entity: BTreeMap<String, Vec<BlockId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_blocks: usize,
    pub by_type: BTreeMap<ContentType, usize>,
    pub total_entities: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPayload {
    pub document_id: DocumentId,
    pub metadata: Map<String, Value>,
    pub structure: SectionTree,
    pub content_blocks: Vec<ContentBlock>,
    pub index: BlockIndex,
    pub statistics: Statistics,
}

/// The versioned artifact for one successful pipeline run.
///
/// Replaced wholesale on re-extraction; there are no mutators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub id: StructuredDataId,
    pub document_id: DocumentId,
    pub schema_version: String,
    pub data: StructuredPayload,
    pub created_at: DateTime<Utc>,
}

impl StructuredData {
    pub fn new(payload: StructuredPayload) -> Self {
        Self {
            id: StructuredDataId::new(),
            document_id: payload.document_id,
            schema_version: SCHEMA_VERSION.to_owned(),
            data: payload,
            created_at: Utc::now(),
        }
    }
}
