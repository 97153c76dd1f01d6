// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for failed documents.
//
// Every technical error is mapped to a plain sentence with a suggestion. The
// result is what a failed document carries as its error message.

use crate::error::TextwerkError;

/// Who has to act for the document to go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Running the document again may succeed.
    Transient,
    /// The uploader must supply a different or repaired file.
    ActionRequired,
    /// The file can never be processed as it is.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether re-extraction could plausibly succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    /// Single-line form stored on a failed document.
    pub fn summary(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `TextwerkError` into a `HumanError`.
pub fn humanize_error(err: &TextwerkError) -> HumanError {
    match err {
        // -- Extraction --
        TextwerkError::ExtractionNotSupported(detail) => HumanError {
            message: "This type of document isn't supported.".into(),
            suggestion: format!(
                "Save it as PDF, DOCX, XLSX, PNG, JPEG, or TIFF and upload it again. ({detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },
        TextwerkError::ExtractionFailed(detail) => humanize_extraction_failure(detail),
        TextwerkError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or encrypted. Open it in a PDF viewer to check it, or export it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        TextwerkError::Package(_) => HumanError {
            message: "This office document couldn't be opened.".into(),
            suggestion: "The file may be damaged or saved in an old format. Save it again as DOCX or XLSX.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        TextwerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as PNG or JPEG first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        TextwerkError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this scan.".into(),
            suggestion: "Check that the OCR engine is installed, or scan the page again at a higher resolution.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Processing --
        TextwerkError::Enrichment(_) | TextwerkError::Nlp(_) => HumanError {
            message: "The text was extracted but couldn't be analysed.".into(),
            suggestion: "Check the language model configuration, then process the document again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        TextwerkError::Structuring(_) => HumanError {
            message: "The content couldn't be organised into sections.".into(),
            suggestion: "Process the document again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        TextwerkError::Processing(_) => HumanError {
            message: "Processing stopped unexpectedly.".into(),
            suggestion: "Process the document again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Infrastructure --
        TextwerkError::Storage(_) => HumanError {
            message: "The uploaded file couldn't be stored or read back.".into(),
            suggestion: "Check the upload directory and free disk space, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        TextwerkError::Repository(_) => HumanError {
            message: "The document records couldn't be updated.".into(),
            suggestion: "Try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        TextwerkError::DocumentNotFound(id) => HumanError {
            message: "That document doesn't exist.".into(),
            suggestion: format!("It may have been deleted. Upload it again. ({id})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        TextwerkError::Config(detail) => HumanError {
            message: "The pipeline is misconfigured.".into(),
            suggestion: format!("Fix the configuration and restart. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        TextwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Upload it again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The file couldn't be read because of its permissions.".into(),
                    suggestion: "Check the file permissions of the upload directory.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
        TextwerkError::Serialization(_) => HumanError {
            message: "The results couldn't be encoded.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Extraction failures carry engine detail; pick out the common causes.
fn humanize_extraction_failure(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("no content") {
        HumanError {
            message: "Nothing could be extracted from this file.".into(),
            suggestion: "The file looks empty. If it is a scan, make sure OCR is enabled.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("encrypt") || lower.contains("password") {
        HumanError {
            message: "This file is password-protected.".into(),
            suggestion: "Remove the password protection and upload it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The file couldn't be read.".into(),
            suggestion: format!("It may be damaged. Open it on a computer to check it. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_is_permanent() {
        let human = humanize_error(&TextwerkError::ExtractionNotSupported(".exe".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
        assert!(human.suggestion.contains(".exe"));
    }

    #[test]
    fn empty_extraction_gets_specific_message() {
        let human = humanize_error(&TextwerkError::ExtractionFailed(
            "no content extracted from blank.pdf".into(),
        ));
        assert!(human.message.contains("Nothing could be extracted"));
    }

    #[test]
    fn io_not_found_requires_action() {
        let err = TextwerkError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn summary_joins_message_and_suggestion() {
        let human = humanize_error(&TextwerkError::Structuring("cycle".into()));
        let summary = human.summary();
        assert!(summary.starts_with(&human.message));
        assert!(summary.ends_with(&human.suggestion));
    }
}
