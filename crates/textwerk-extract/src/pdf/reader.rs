// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open a document with `lopdf` and expose the pages, content
// streams, resources, and Info metadata the extraction engines walk.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_json::{Map, Value};
use textwerk_core::error::{Result, TextwerkError};
use tracing::{debug, instrument};

use super::content::decode_text_simple;

/// Info dictionary keys copied into the raw metadata, with their output names.
const INFO_KEYS: &[(&[u8], &str)] = &[
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Keywords", "keywords"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
    (b"CreationDate", "creation_date"),
    (b"ModDate", "mod_date"),
];

/// Read-only view over a parsed PDF.
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            TextwerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            TextwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// `(page_number, page_id)` pairs in ascending page order. Page numbers are 1-based.
    pub fn pages(&self) -> Vec<(u32, ObjectId)> {
        // BTreeMap iteration is already ordered by page number.
        self.document.get_pages().into_iter().collect()
    }

    /// Entries of the trailer's Info dictionary, decoded to strings.
    pub fn info_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        let info = match self.document.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => self.document.get_dictionary(*id).ok(),
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };
        let Some(info) = info else {
            return metadata;
        };
        for (key, name) in INFO_KEYS {
            let value = info.get(key).ok().and_then(|obj| self.resolve(obj));
            if let Some(Object::String(bytes, _)) = value {
                let text = decode_text_simple(bytes);
                let text = text.trim();
                if !text.is_empty() {
                    metadata.insert((*name).to_owned(), Value::String(text.to_owned()));
                }
            }
        }
        metadata
    }

    // -- Page access ----------------------------------------------------------

    /// Decompressed, concatenated content streams of a page.
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        self.document.get_page_content(page_id).map_err(|err| {
            TextwerkError::PdfError(format!("cannot read content of page {:?}: {}", page_id, err))
        })
    }

    /// Page text as laid out by lopdf's own text extraction.
    pub fn page_text(&self, page_number: u32) -> Result<String> {
        self.document.extract_text(&[page_number]).map_err(|err| {
            TextwerkError::PdfError(format!("cannot extract text of page {}: {}", page_number, err))
        })
    }

    /// The page's resource dictionary, following the `/Parent` chain for
    /// inherited resources.
    pub fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        // Page trees are shallow; the bound guards against malformed cycles.
        for _ in 0..32 {
            if let Some(Object::Dictionary(resources)) = node
                .get(b"Resources")
                .ok()
                .and_then(|obj| self.resolve(obj))
            {
                return Some(resources);
            }
            let parent = match node.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return None,
            };
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Follow a single indirect reference.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }
}
