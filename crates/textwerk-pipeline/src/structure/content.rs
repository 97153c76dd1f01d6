// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content structurer: classify extraction units into typed blocks, order
// them, and link each block to its neighbours and its parent heading.

use textwerk_core::config::ParentLinking;
use textwerk_core::extraction::{ExtractionResult, ImageBlock, TableBlock, TextBlock};
use textwerk_core::structured::{BlockContent, ContentBlock};
use textwerk_core::types::{BlockId, ContentType, DocumentId};
use tracing::{debug, instrument};

/// Deepest section level still treated as a heading.
pub const MAX_HEADING_LEVEL: u8 = 3;

const BULLETS: &[char] = &['-', '*', '•', '▪', '◦', '‣', '–', '·'];

#[derive(Debug, Clone, Copy)]
pub struct ContentStructurer {
    linking: ParentLinking,
}

impl Default for ContentStructurer {
    fn default() -> Self {
        Self::new(ParentLinking::SectionStack)
    }
}

impl ContentStructurer {
    pub fn new(linking: ParentLinking) -> Self {
        Self { linking }
    }

    /// Build the ordered, linked block list for one document.
    #[instrument(skip_all, fields(%document_id))]
    pub fn structure(&self, document_id: DocumentId, result: &ExtractionResult) -> Vec<ContentBlock> {
        let mut blocks: Vec<ContentBlock> = result
            .text_blocks
            .iter()
            .map(|block| text_block(document_id, block))
            .chain(result.tables.iter().map(|table| table_block(document_id, table)))
            .chain(result.images.iter().map(|image| image_block(document_id, image)))
            .collect();

        blocks.sort_by_cached_key(ContentBlock::sort_key);
        link_neighbours(&mut blocks);
        match self.linking {
            ParentLinking::SectionStack => link_parents_by_stack(&mut blocks),
            ParentLinking::SectionTitle => link_parents_by_title(&mut blocks),
        }
        debug!(blocks = blocks.len(), "content structured");
        blocks
    }
}

fn text_block(document_id: DocumentId, block: &TextBlock) -> ContentBlock {
    let content = match block.metadata.section_level {
        Some(level) if level <= MAX_HEADING_LEVEL => BlockContent::Heading {
            text: block.content.trim().to_owned(),
            level,
        },
        _ => match list_items(&block.content) {
            Some(items) => BlockContent::List { items },
            None => BlockContent::Text {
                text: block.content.clone(),
            },
        },
    };
    let mut structured = ContentBlock::new(document_id, content, block.metadata.clone());
    if let Some(enrichment) = &block.enrichment {
        structured.entities = enrichment.entities.clone();
        structured.relevance_score = Some(enrichment.relevance_score);
    }
    structured
}

fn table_block(document_id: DocumentId, table: &TableBlock) -> ContentBlock {
    let content = BlockContent::Table {
        headers: table.headers.clone(),
        rows: table.rows.clone(),
        column_types: table.column_types.clone(),
        row_count: table.rows.len(),
        column_count: table.column_count(),
    };
    ContentBlock::new(document_id, content, table.metadata.clone())
}

fn image_block(document_id: DocumentId, image: &ImageBlock) -> ContentBlock {
    let content = BlockContent::Image {
        image_path: image.image_path.clone(),
        ocr_text: image.ocr_text.clone(),
        details: image.details.clone(),
    };
    let mut structured = ContentBlock::new(document_id, content, image.metadata.clone());
    structured.relevance_score = image.metadata.confidence;
    structured
}

/// Items of a bulleted or enumerated text: at least two non-empty lines,
/// every one of them starting with a marker.
pub fn list_items(text: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    lines.into_iter().map(strip_marker).collect()
}

fn strip_marker(line: &str) -> Option<String> {
    let rest = if let Some(rest) = line.strip_prefix(BULLETS) {
        rest
    } else {
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        let letter = digits == 0 && line.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        let marker_len = if letter { 1 } else { digits };
        if marker_len == 0 {
            return None;
        }
        let after = &line[marker_len..];
        match after.chars().next() {
            Some(')') => &after[1..],
            Some('.') if !letter => &after[1..],
            _ => return None,
        }
    };
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let item = rest.trim();
    (!item.is_empty()).then(|| item.to_owned())
}

fn link_neighbours(blocks: &mut [ContentBlock]) {
    let ids: Vec<BlockId> = blocks.iter().map(|b| b.id).collect();
    for (i, block) in blocks.iter_mut().enumerate() {
        block.previous_block_id = i.checked_sub(1).map(|p| ids[p]);
        block.next_block_id = ids.get(i + 1).copied();
    }
}

/// A heading of level L closes every open heading of level >= L, takes the
/// remaining top as parent, then opens itself. Other blocks take the top.
fn link_parents_by_stack(blocks: &mut [ContentBlock]) {
    let mut open: Vec<(u8, BlockId)> = Vec::new();
    for block in blocks.iter_mut() {
        if let BlockContent::Heading { level, .. } = block.content {
            while open.last().is_some_and(|(open_level, _)| *open_level >= level) {
                open.pop();
            }
            block.parent_block_id = open.last().map(|(_, id)| *id);
            open.push((level, block.id));
        } else {
            block.parent_block_id = open.last().map(|(_, id)| *id);
        }
    }
}

/// Nearest earlier heading whose title equals the block's section title.
fn link_parents_by_title(blocks: &mut [ContentBlock]) {
    let mut headings: Vec<(String, BlockId)> = Vec::new();
    for block in blocks.iter_mut() {
        block.parent_block_id = block.metadata.section_title.as_deref().and_then(|title| {
            headings
                .iter()
                .rev()
                .find(|(heading, _)| heading == title)
                .map(|(_, id)| *id)
        });
        if block.content_type == ContentType::Heading
            && let Some(title) = block.section_title()
        {
            headings.push((title.to_owned(), block.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_core::extraction::{ContentMetadata, Enrichment};

    fn heading(text: &str, level: u8, order: u32) -> TextBlock {
        let mut metadata = ContentMetadata::new(order);
        metadata.section_level = Some(level);
        metadata.section_title = Some(text.to_owned());
        TextBlock::new(text, metadata)
    }

    fn body(text: &str, section: Option<&str>, order: u32) -> TextBlock {
        let mut metadata = ContentMetadata::new(order);
        metadata.section_title = section.map(str::to_owned);
        TextBlock::new(text, metadata)
    }

    fn three_headings_then_body(body_section: &str) -> ExtractionResult {
        ExtractionResult {
            text_blocks: vec![
                heading("Contexte", 2, 0),
                heading("Objectifs", 2, 1),
                heading("Calendrier", 2, 2),
                body("Le chantier démarre en mars.", Some(body_section), 3),
            ],
            ..ExtractionResult::default()
        }
    }

    #[test]
    fn title_linking_requires_an_exact_match() {
        let structurer = ContentStructurer::new(ParentLinking::SectionTitle);

        let blocks = structurer.structure(DocumentId::new(), &three_headings_then_body("Calendrier"));
        let types: Vec<ContentType> = blocks.iter().map(|b| b.content_type).collect();
        assert_eq!(
            types,
            vec![ContentType::Heading, ContentType::Heading, ContentType::Heading, ContentType::Text]
        );
        assert_eq!(blocks[3].parent_block_id, Some(blocks[2].id));

        let blocks = structurer.structure(DocumentId::new(), &three_headings_then_body("calendrier"));
        assert_eq!(blocks[3].parent_block_id, None);
    }

    #[test]
    fn stack_linking_uses_the_last_open_heading() {
        let structurer = ContentStructurer::default();
        let blocks = structurer.structure(DocumentId::new(), &three_headings_then_body("autre"));
        assert_eq!(blocks[3].parent_block_id, Some(blocks[2].id));
        // Equal levels are siblings.
        assert!(blocks[..3].iter().all(|b| b.parent_block_id.is_none()));
    }

    #[test]
    fn stack_linking_nests_by_level() {
        let result = ExtractionResult {
            text_blocks: vec![
                heading("Partie I", 1, 0),
                heading("Chapitre 1", 2, 1),
                body("a", None, 2),
                heading("Chapitre 2", 2, 3),
                heading("Partie II", 1, 4),
                body("b", None, 5),
            ],
            ..ExtractionResult::default()
        };
        let blocks = ContentStructurer::default().structure(DocumentId::new(), &result);
        assert_eq!(blocks[1].parent_block_id, Some(blocks[0].id));
        assert_eq!(blocks[2].parent_block_id, Some(blocks[1].id));
        assert_eq!(blocks[3].parent_block_id, Some(blocks[0].id));
        assert_eq!(blocks[4].parent_block_id, None);
        assert_eq!(blocks[5].parent_block_id, Some(blocks[4].id));
    }

    #[test]
    fn neighbours_are_linked() {
        let blocks = ContentStructurer::default()
            .structure(DocumentId::new(), &three_headings_then_body("x"));
        assert!(blocks[0].previous_block_id.is_none());
        assert!(blocks[3].next_block_id.is_none());
        for i in 1..blocks.len() - 1 {
            assert_eq!(blocks[i].previous_block_id, Some(blocks[i - 1].id));
            assert_eq!(blocks[i].next_block_id, Some(blocks[i + 1].id));
        }
    }

    #[test]
    fn ordering_ignores_arrival_order() {
        let mut result = ExtractionResult {
            text_blocks: vec![
                body("p1", None, 0),
                body("p2 first", None, 0),
                body("p2 second", None, 1),
            ],
            tables: vec![TableBlock::from_raw(
                vec![Some("h".into())],
                vec![],
                ContentMetadata::new(0).with_page(1),
            )],
            ..ExtractionResult::default()
        };
        result.text_blocks[0].metadata.page_number = Some(1);
        result.text_blocks[1].metadata.page_number = Some(2);
        result.text_blocks[2].metadata.page_number = Some(2);

        let forward = ContentStructurer::default().structure(DocumentId::new(), &result);
        result.text_blocks.reverse();
        let reversed = ContentStructurer::default().structure(DocumentId::new(), &result);

        let keys = |blocks: &[ContentBlock]| -> Vec<String> {
            blocks.iter().map(|b| b.content.ordering_key()).collect()
        };
        assert_eq!(keys(&forward), keys(&reversed));
        assert_eq!(keys(&forward), vec!["p1", "h", "p2 first", "p2 second"]);
    }

    #[test]
    fn lists_and_enrichment() {
        let mut text = body("- pommes\n- poires\n\n2) kiwis", None, 0);
        text.enrichment = Some(Enrichment {
            relevance_score: 0.4,
            ..Enrichment::default()
        });
        let result = ExtractionResult {
            text_blocks: vec![text, body("- seul", None, 1), body("3.5 pour cent", None, 2)],
            ..ExtractionResult::default()
        };
        let blocks = ContentStructurer::default().structure(DocumentId::new(), &result);
        assert_eq!(
            blocks[0].content,
            BlockContent::List {
                items: vec!["pommes".into(), "poires".into(), "kiwis".into()]
            }
        );
        assert_eq!(blocks[0].relevance_score, Some(0.4));
        assert_eq!(blocks[1].content_type, ContentType::Text);
        assert_eq!(blocks[2].content_type, ContentType::Text);
    }

    #[test]
    fn deep_levels_are_plain_text() {
        let result = ExtractionResult {
            text_blocks: vec![heading("Note", 4, 0)],
            ..ExtractionResult::default()
        };
        let blocks = ContentStructurer::default().structure(DocumentId::new(), &result);
        assert_eq!(blocks[0].content_type, ContentType::Text);
    }
}
