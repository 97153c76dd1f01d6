// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identifiers and closed vocabularies shared by every Textwerk crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an uploaded document.
    DocumentId
);
uuid_id!(
    /// Unique identifier for a structured content block.
    BlockId
);
uuid_id!(
    /// Unique identifier for one structured-data artifact.
    StructuredDataId
);

/// Input formats the media-type table knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Legacy binary Word document.
    Doc,
    /// Office Open XML spreadsheet.
    Xlsx,
    /// Legacy binary Excel workbook.
    Xls,
    Png,
    Jpeg,
    Tiff,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 8] = [
        Self::Pdf,
        Self::Docx,
        Self::Doc,
        Self::Xlsx,
        Self::Xls,
        Self::Png,
        Self::Jpeg,
        Self::Tiff,
    ];

    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }

    /// Infer the format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Reverse lookup from a MIME type string.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime_type() == mime)
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Tiff)
    }
}

/// Which engine produced an extraction unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// PDF text/table-fidelity engine.
    PdfText,
    /// PDF structure/image-fidelity engine.
    PdfStructure,
    Docx,
    Xlsx,
    /// Image file read as-is.
    Image,
    TesseractOcr,
    Ocrs,
}

/// Variant tag of a structured content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Table,
    Image,
    List,
    Heading,
}

impl ContentType {
    /// Tie-break rank used when two blocks share `(order, page)`.
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::Heading => 0,
            Self::Text => 1,
            Self::List => 2,
            Self::Table => 3,
            Self::Image => 4,
        }
    }
}

/// Inferred type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

/// Named OCR preprocessing strategies, from gentlest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessStrategy {
    Basic,
    Advanced,
    Aggressive,
}

impl PreprocessStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Aggressive => "aggressive",
        }
    }
}

/// OCR page-segmentation modes (Tesseract `--psm` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// psm 3.
    FullyAutomatic,
    /// psm 6.
    UniformBlock,
    /// psm 11.
    SparseText,
    /// psm 12.
    SparseTextOsd,
}

impl SegmentationMode {
    pub fn psm(&self) -> u8 {
        match self {
            Self::FullyAutomatic => 3,
            Self::UniformBlock => 6,
            Self::SparseText => 11,
            Self::SparseTextOsd => 12,
        }
    }

    /// Default attempt order for multi-attempt recognition.
    pub fn default_order() -> Vec<Self> {
        vec![
            Self::UniformBlock,
            Self::SparseText,
            Self::FullyAutomatic,
            Self::SparseTextOsd,
        ]
    }
}

/// Lifecycle states of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Extracting,
    Extracted,
    Enriching,
    Enriched,
    Structuring,
    Completed,
    /// Terminal failure, see the document's error message.
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
