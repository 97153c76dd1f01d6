// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document structurer: section tree, lookup indices, statistics, and the
// final versioned artifact.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use textwerk_core::structured::{
    BlockContent, BlockIndex, ContentBlock, Section, SectionTree, Statistics, StructuredData,
    StructuredPayload,
};
use textwerk_core::types::DocumentId;
use tracing::{info, instrument};

/// Assemble the artifact from ordered, linked blocks.
#[instrument(skip_all, fields(%document_id, blocks = blocks.len()))]
pub fn build_structured_data(
    document_id: DocumentId,
    blocks: Vec<ContentBlock>,
    metadata: Map<String, Value>,
) -> StructuredData {
    let structure = section_tree(&blocks);
    let index = block_index(&blocks);
    let statistics = statistics(&blocks);
    info!(
        sections = structure.sections.len(),
        orphans = structure.orphan_blocks.len(),
        entities = statistics.total_entities,
        "document structured"
    );
    StructuredData::new(StructuredPayload {
        document_id,
        metadata,
        structure,
        content_blocks: blocks,
        index,
        statistics,
    })
}

/// Every heading opens a section that collects the ids of all blocks up to
/// the next heading of equal or higher priority (lower or equal level).
pub fn section_tree(blocks: &[ContentBlock]) -> SectionTree {
    let mut tree = SectionTree::default();
    let mut open: Vec<Section> = Vec::new();

    for block in blocks {
        if let BlockContent::Heading { level, .. } = block.content {
            while open.last().is_some_and(|section| section.level >= level) {
                close_top(&mut open, &mut tree);
            }
            for section in &mut open {
                section.block_ids.push(block.id);
            }
            open.push(Section {
                id: block.id,
                level,
                title: block.section_title().unwrap_or_default().to_owned(),
                block_ids: vec![block.id],
                subsections: Vec::new(),
            });
        } else if open.is_empty() {
            tree.orphan_blocks.push(block.id);
        } else {
            for section in &mut open {
                section.block_ids.push(block.id);
            }
        }
    }
    while !open.is_empty() {
        close_top(&mut open, &mut tree);
    }
    tree
}

fn close_top(open: &mut Vec<Section>, tree: &mut SectionTree) {
    if let Some(section) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.subsections.push(section),
            None => tree.sections.push(section),
        }
    }
}

/// Lookups by type, page, and entity label. Unpaginated blocks are not
/// indexed by page; a block appears once per label.
pub fn block_index(blocks: &[ContentBlock]) -> BlockIndex {
    let mut index = BlockIndex::default();
    for block in blocks {
        index.by_type.entry(block.content_type).or_default().push(block.id);
        if let Some(page) = block.metadata.page_number.filter(|p| *p > 0) {
            index.by_page.entry(page).or_default().push(block.id);
        }
        let labels: BTreeSet<&str> = block.entities.iter().map(|e| e.label.as_str()).collect();
        for label in labels {
            index.by_entity.entry(label.to_owned()).or_default().push(block.id);
        }
    }
    index
}

pub fn statistics(blocks: &[ContentBlock]) -> Statistics {
    let mut stats = Statistics {
        total_blocks: blocks.len(),
        ..Statistics::default()
    };
    let mut pages = BTreeSet::new();
    for block in blocks {
        *stats.by_type.entry(block.content_type).or_default() += 1;
        stats.total_entities += block.entities.len();
        if let Some(page) = block.metadata.page_number.filter(|p| *p > 0) {
            pages.insert(page);
        }
    }
    stats.total_pages = pages.len();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_core::extraction::{ContentMetadata, Entity};
    use textwerk_core::structured::SCHEMA_VERSION;
    use textwerk_core::types::ContentType;

    fn block(content: BlockContent, page: Option<u32>, order: u32) -> ContentBlock {
        let mut metadata = ContentMetadata::new(order);
        metadata.page_number = page;
        ContentBlock::new(DocumentId::new(), content, metadata)
    }

    fn heading(text: &str, level: u8, order: u32) -> ContentBlock {
        block(
            BlockContent::Heading {
                text: text.into(),
                level,
            },
            Some(1),
            order,
        )
    }

    fn text(body: &str, page: Option<u32>, order: u32) -> ContentBlock {
        block(BlockContent::Text { text: body.into() }, page, order)
    }

    fn entity(label: &str) -> Entity {
        Entity {
            text: "x".into(),
            label: label.into(),
            start: 0,
            end: 1,
            confidence: 1.0,
        }
    }

    #[test]
    fn sections_nest_and_collect_their_blocks() {
        let blocks = vec![
            text("préambule", Some(1), 0),
            heading("Partie I", 1, 1),
            text("a", Some(1), 2),
            heading("Chapitre 1", 2, 3),
            text("b", Some(2), 4),
            heading("Partie II", 1, 5),
            text("c", Some(3), 6),
        ];
        let ids: Vec<_> = blocks.iter().map(|b| b.id).collect();
        let tree = section_tree(&blocks);

        assert_eq!(tree.orphan_blocks, vec![ids[0]]);
        assert_eq!(tree.sections.len(), 2);
        let first = &tree.sections[0];
        assert_eq!(first.title, "Partie I");
        assert_eq!(first.block_ids, ids[1..5].to_vec());
        assert_eq!(first.subsections.len(), 1);
        assert_eq!(first.subsections[0].block_ids, vec![ids[3], ids[4]]);
        assert_eq!(tree.sections[1].block_ids, vec![ids[5], ids[6]]);
    }

    #[test]
    fn no_headings_means_all_orphans() {
        let blocks = vec![text("a", None, 0), text("b", None, 1)];
        let tree = section_tree(&blocks);
        assert!(tree.sections.is_empty());
        assert_eq!(tree.orphan_blocks.len(), 2);
    }

    #[test]
    fn indices_and_statistics() {
        let mut dated = text("le 2025-01-01 et le 2025-02-01", Some(2), 1);
        dated.entities = vec![entity("DATE"), entity("DATE"), entity("MONEY")];
        let blocks = vec![heading("Titre", 1, 0), dated, text("sans page", None, 2)];

        let index = block_index(&blocks);
        assert_eq!(index.by_type[&ContentType::Text].len(), 2);
        assert_eq!(index.by_page[&1], vec![blocks[0].id]);
        assert_eq!(index.by_page[&2], vec![blocks[1].id]);
        assert_eq!(index.by_entity["DATE"], vec![blocks[1].id]);

        let stats = statistics(&blocks);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.by_type[&ContentType::Heading], 1);
    }

    #[test]
    fn artifact_carries_schema_version() {
        let document_id = DocumentId::new();
        let data = build_structured_data(document_id, vec![text("a", None, 0)], Map::new());
        assert_eq!(data.schema_version, SCHEMA_VERSION);
        assert_eq!(data.document_id, document_id);
        assert_eq!(data.data.statistics.total_blocks, 1);
    }
}
