// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the verification UI.
//
// Every technical error maps to plain English with a clear suggestion. A
// missing feature ("this system can't read text") is always worded
// differently from a failure ("reading the text went wrong").

use crate::error::{ErrorClass, PruefwerkError};
use crate::types::Capability;

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Drives icon/colour in the UI.
    pub class: ErrorClass,
}

/// Convert a `PruefwerkError` into a `HumanError`.
pub fn humanize_error(err: &PruefwerkError) -> HumanError {
    let class = err.class();
    match err {
        PruefwerkError::UnsupportedFormat(detail) => HumanError {
            message: "This file can't be verified.".into(),
            suggestion: format!(
                "Upload a PDF, PNG, or JPEG document instead. ({detail})"
            ),
            class,
        },

        PruefwerkError::CapabilityUnavailable(capability) => humanize_capability(*capability),

        PruefwerkError::NoPagesAvailable(detail) => HumanError {
            message: "No pages could be read from this document.".into(),
            suggestion: format!(
                "Try uploading each page as an image instead. ({detail})"
            ),
            class,
        },

        PruefwerkError::Extraction(_) | PruefwerkError::OcrError(_) => HumanError {
            message: "Reading the text on this page went wrong.".into(),
            suggestion: "Try a sharper scan or photo with the text clearly in focus.".into(),
            class,
        },

        PruefwerkError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try exporting it again from the original program.".into(),
            class,
        },

        PruefwerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a PNG or JPEG first.".into(),
            class,
        },

        PruefwerkError::Backend(detail) => HumanError {
            message: "Processing failed unexpectedly.".into(),
            suggestion: format!("Try again. If it keeps happening, report this detail: {detail}"),
            class,
        },

        PruefwerkError::Cancelled => HumanError {
            message: "Verification was cancelled.".into(),
            suggestion: "Start the verification again when you're ready.".into(),
            class,
        },

        PruefwerkError::InvalidTransition(detail) => HumanError {
            message: "The verification steps ran out of order.".into(),
            suggestion: format!("Start a new verification. ({detail})"),
            class,
        },

        PruefwerkError::Config(detail) => HumanError {
            message: "The verifier settings are not valid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            class,
        },

        PruefwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    class,
                }
            } else {
                HumanError {
                    message: "A file couldn't be read or written.".into(),
                    suggestion: format!("Check disk space and permissions. ({io_err})"),
                    class,
                }
            }
        }

        PruefwerkError::Serialization(_) => HumanError {
            message: "Some saved data couldn't be read.".into(),
            suggestion: "Check that the file is valid JSON.".into(),
            class,
        },
    }
}

fn humanize_capability(capability: Capability) -> HumanError {
    let (message, suggestion) = match capability {
        Capability::Ocr => (
            "Text recognition isn't installed on this system.",
            "Install Tesseract or the ocrs models to compare document text. Image checks still work.",
        ),
        Capability::PdfRender => (
            "PDF pages can't be displayed on this system.",
            "Install poppler-utils (pdftoppm), or upload the document as an image.",
        ),
        Capability::PdfTextLayer => (
            "Reading text embedded in PDFs is switched off.",
            "Enable the PDF text layer in the settings, or rely on text recognition.",
        ),
    };
    HumanError {
        message: message.into(),
        suggestion: suggestion.into(),
        class: ErrorClass::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_and_failed_read_differently() {
        let missing = humanize_error(&PruefwerkError::CapabilityUnavailable(Capability::Ocr));
        let failed = humanize_error(&PruefwerkError::OcrError("tensor shape".into()));

        assert_eq!(missing.class, ErrorClass::Unavailable);
        assert_eq!(failed.class, ErrorClass::Failed);
        assert_ne!(missing.message, failed.message);
        assert!(missing.message.contains("isn't installed"));
        assert!(failed.message.contains("went wrong"));
    }

    #[test]
    fn unsupported_format_mentions_detail() {
        let human = humanize_error(&PruefwerkError::UnsupportedFormat("docx".into()));
        assert_eq!(human.class, ErrorClass::Rejected);
        assert!(human.suggestion.contains("docx"));
    }

    #[test]
    fn missing_file_is_explained() {
        let err = PruefwerkError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let human = humanize_error(&err);
        assert!(human.message.contains("couldn't be found"));
    }
}
