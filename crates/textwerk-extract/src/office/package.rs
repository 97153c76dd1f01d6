// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office Open XML package access: zip parts and the core properties part.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use textwerk_core::error::{Result, TextwerkError};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// An opened OOXML package (`.docx`, `.xlsx`).
pub struct OfficePackage<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl OfficePackage<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| {
            TextwerkError::Package(format!("cannot open {}: {}", path.display(), err))
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> OfficePackage<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|err| TextwerkError::Package(format!("not an OOXML package: {}", err)))?;
        debug!(parts = archive.len(), "package opened");
        Ok(Self { archive })
    }

    /// Read a part that must exist.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        self.read_optional_part(name)?
            .ok_or_else(|| TextwerkError::Package(format!("missing part {name}")))
    }

    pub fn read_optional_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut part = match self.archive.by_name(name) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => {
                return Err(TextwerkError::Package(format!("cannot read {name}: {err}")));
            }
        };
        let mut xml = String::new();
        part.read_to_string(&mut xml)
            .map_err(|err| TextwerkError::Package(format!("cannot read {name}: {err}")))?;
        Ok(Some(xml))
    }

    /// Title, author and dates from `docProps/core.xml`, when present.
    pub fn core_properties(&mut self) -> Result<Map<String, Value>> {
        let mut properties = Map::new();
        let Some(xml) = self.read_optional_part("docProps/core.xml")? else {
            return Ok(properties);
        };

        let mut reader = Reader::from_str(&xml);
        let mut buf = Vec::new();
        let mut current: Option<&'static str> = None;
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current = match e.local_name().as_ref() {
                        b"title" => Some("title"),
                        b"creator" => Some("author"),
                        b"subject" => Some("subject"),
                        b"keywords" => Some("keywords"),
                        b"lastModifiedBy" => Some("last_modified_by"),
                        b"created" => Some("created"),
                        b"modified" => Some("modified"),
                        _ => None,
                    };
                }
                Ok(Event::Text(t)) => {
                    if let Some(key) = current {
                        let text = t.unescape().map_err(xml_error)?;
                        let text = text.trim();
                        if !text.is_empty() {
                            properties.insert(key.to_owned(), Value::from(text));
                        }
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(err) => return Err(xml_error(err)),
                _ => {}
            }
            buf.clear();
        }
        Ok(properties)
    }
}

pub(crate) fn xml_error(err: impl std::fmt::Display) -> TextwerkError {
    TextwerkError::Package(format!("malformed XML: {}", err))
}

/// Value of the attribute whose local name is `name`, ignoring its prefix.
pub(crate) fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
