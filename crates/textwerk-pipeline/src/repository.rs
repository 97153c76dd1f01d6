// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistence contracts for documents, content blocks, and structured data,
// with in-memory implementations.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use textwerk_core::document::Document;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::structured::{ContentBlock, StructuredData};
use textwerk_core::types::{BlockId, ContentType, DocumentId};

pub trait DocumentRepository: Send + Sync {
    /// Insert or replace by id.
    fn save(&self, document: &Document) -> Result<()>;
    fn get(&self, id: DocumentId) -> Result<Option<Document>>;
    /// Oldest first.
    fn list(&self) -> Result<Vec<Document>>;
    fn delete(&self, id: DocumentId) -> Result<bool>;
}

pub trait ContentBlockRepository: Send + Sync {
    fn save_all(&self, blocks: &[ContentBlock]) -> Result<()>;
    fn get(&self, id: BlockId) -> Result<Option<ContentBlock>>;
    /// Blocks of one document in their structured order.
    fn for_document(&self, document_id: DocumentId) -> Result<Vec<ContentBlock>>;
    fn by_type(&self, document_id: DocumentId, content_type: ContentType) -> Result<Vec<ContentBlock>>;
    fn by_page(&self, document_id: DocumentId, page: u32) -> Result<Vec<ContentBlock>>;
    /// Number of blocks removed.
    fn delete_for_document(&self, document_id: DocumentId) -> Result<usize>;
}

pub trait StructuredDataRepository: Send + Sync {
    /// Store the artifact, dropping any earlier one for the same document.
    fn replace(&self, data: &StructuredData) -> Result<()>;
    fn for_document(&self, document_id: DocumentId) -> Result<Option<StructuredData>>;
    fn delete_for_document(&self, document_id: DocumentId) -> Result<bool>;
}

fn poisoned<T>(_: PoisonError<T>) -> TextwerkError {
    TextwerkError::Repository("repository lock poisoned".into())
}

// -- In-memory ----------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<DocumentId, Document>>,
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn save(&self, document: &Document) -> Result<()> {
        self.documents
            .write()
            .map_err(poisoned)?
            .insert(document.id, document.clone());
        Ok(())
    }

    fn get(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.documents.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> =
            self.documents.read().map_err(poisoned)?.values().cloned().collect();
        documents.sort_by_key(|d| (d.created_at, d.id));
        Ok(documents)
    }

    fn delete(&self, id: DocumentId) -> Result<bool> {
        Ok(self.documents.write().map_err(poisoned)?.remove(&id).is_some())
    }
}

/// Blocks keyed by id, with the per-document order kept alongside.
#[derive(Debug, Default)]
pub struct InMemoryContentBlockRepository {
    inner: RwLock<BlockStore>,
}

#[derive(Debug, Default)]
struct BlockStore {
    blocks: HashMap<BlockId, ContentBlock>,
    order: HashMap<DocumentId, Vec<BlockId>>,
}

impl InMemoryContentBlockRepository {
    fn filtered(
        &self,
        document_id: DocumentId,
        keep: impl Fn(&ContentBlock) -> bool,
    ) -> Result<Vec<ContentBlock>> {
        let store = self.inner.read().map_err(poisoned)?;
        Ok(store
            .order
            .get(&document_id)
            .into_iter()
            .flatten()
            .filter_map(|id| store.blocks.get(id))
            .filter(|&block| keep(block))
            .cloned()
            .collect())
    }
}

impl ContentBlockRepository for InMemoryContentBlockRepository {
    fn save_all(&self, blocks: &[ContentBlock]) -> Result<()> {
        let mut store = self.inner.write().map_err(poisoned)?;
        for block in blocks {
            if store.blocks.insert(block.id, block.clone()).is_none() {
                store.order.entry(block.document_id).or_default().push(block.id);
            }
        }
        Ok(())
    }

    fn get(&self, id: BlockId) -> Result<Option<ContentBlock>> {
        Ok(self.inner.read().map_err(poisoned)?.blocks.get(&id).cloned())
    }

    fn for_document(&self, document_id: DocumentId) -> Result<Vec<ContentBlock>> {
        self.filtered(document_id, |_| true)
    }

    fn by_type(&self, document_id: DocumentId, content_type: ContentType) -> Result<Vec<ContentBlock>> {
        self.filtered(document_id, |block| block.content_type == content_type)
    }

    fn by_page(&self, document_id: DocumentId, page: u32) -> Result<Vec<ContentBlock>> {
        self.filtered(document_id, |block| block.metadata.page_number == Some(page))
    }

    fn delete_for_document(&self, document_id: DocumentId) -> Result<usize> {
        let mut store = self.inner.write().map_err(poisoned)?;
        let ids = store.order.remove(&document_id).unwrap_or_default();
        for id in &ids {
            store.blocks.remove(id);
        }
        Ok(ids.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStructuredDataRepository {
    artifacts: RwLock<HashMap<DocumentId, StructuredData>>,
}

impl StructuredDataRepository for InMemoryStructuredDataRepository {
    fn replace(&self, data: &StructuredData) -> Result<()> {
        self.artifacts
            .write()
            .map_err(poisoned)?
            .insert(data.document_id, data.clone());
        Ok(())
    }

    fn for_document(&self, document_id: DocumentId) -> Result<Option<StructuredData>> {
        Ok(self.artifacts.read().map_err(poisoned)?.get(&document_id).cloned())
    }

    fn delete_for_document(&self, document_id: DocumentId) -> Result<bool> {
        Ok(self
            .artifacts
            .write()
            .map_err(poisoned)?
            .remove(&document_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use textwerk_core::document::FileMetadata;
    use textwerk_core::extraction::ContentMetadata;
    use textwerk_core::structured::BlockContent;

    fn block(document_id: DocumentId, content: BlockContent, page: u32, order: u32) -> ContentBlock {
        ContentBlock::new(document_id, content, ContentMetadata::new(order).with_page(page))
    }

    #[test]
    fn documents_round_trip() {
        let repo = InMemoryDocumentRepository::default();
        let document = Document::new(FileMetadata::new(
            "a.pdf".into(),
            PathBuf::from("/tmp/a.pdf"),
            1,
            "00".into(),
        ));
        repo.save(&document).unwrap();
        assert_eq!(repo.get(document.id).unwrap(), Some(document.clone()));
        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(repo.delete(document.id).unwrap());
        assert!(repo.get(document.id).unwrap().is_none());
    }

    #[test]
    fn block_queries_keep_saved_order() {
        let repo = InMemoryContentBlockRepository::default();
        let doc = DocumentId::new();
        let other = DocumentId::new();
        let blocks = vec![
            block(doc, BlockContent::Heading { text: "T".into(), level: 1 }, 1, 0),
            block(doc, BlockContent::Text { text: "a".into() }, 1, 1),
            block(doc, BlockContent::Text { text: "b".into() }, 2, 2),
            block(other, BlockContent::Text { text: "c".into() }, 1, 0),
        ];
        repo.save_all(&blocks).unwrap();

        let texts: Vec<BlockId> = repo
            .by_type(doc, ContentType::Text)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(texts, vec![blocks[1].id, blocks[2].id]);
        assert_eq!(repo.by_page(doc, 1).unwrap().len(), 2);
        assert_eq!(repo.get(blocks[3].id).unwrap().unwrap().document_id, other);

        assert_eq!(repo.delete_for_document(doc).unwrap(), 3);
        assert!(repo.for_document(doc).unwrap().is_empty());
        assert_eq!(repo.for_document(other).unwrap().len(), 1);
    }
}
