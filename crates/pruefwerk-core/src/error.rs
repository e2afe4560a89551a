// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pruefwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Capability;

/// Top-level error type for all Pruefwerk operations.
#[derive(Debug, Error)]
pub enum PruefwerkError {
    // -- Pipeline taxonomy --
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("{0} is not available on this system")]
    CapabilityUnavailable(Capability),

    #[error("no pages available: {0}")]
    NoPagesAvailable(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("backend failure: {0}")]
    Backend(String),

    // -- Backend-specific --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Control flow --
    #[error("verification cancelled")]
    Cancelled,

    #[error("invalid verification step: {0}")]
    InvalidTransition(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How an error should be presented and whether the pipeline may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// An optional feature is missing. The affected field degrades.
    Unavailable,
    /// A backend ran and failed while processing this input.
    Failed,
    /// The input itself cannot be verified (wrong format, no pages).
    Rejected,
    /// The caller asked the run to stop.
    Cancelled,
}

impl PruefwerkError {
    /// Classify this error into an [`ErrorClass`].
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CapabilityUnavailable(_) => ErrorClass::Unavailable,
            Self::UnsupportedFormat(_) | Self::NoPagesAvailable(_) => ErrorClass::Rejected,
            Self::Cancelled => ErrorClass::Cancelled,
            Self::Extraction(_)
            | Self::Backend(_)
            | Self::PdfError(_)
            | Self::ImageError(_)
            | Self::OcrError(_)
            | Self::InvalidTransition(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::Failed,
        }
    }

    /// Whether this error stops the verification pipeline.
    ///
    /// Everything else degrades a single field and lets the run reach a
    /// verdict.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::NoPagesAvailable(_) | Self::Cancelled
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PruefwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_format_and_page_errors_are_fatal() {
        assert!(PruefwerkError::UnsupportedFormat("docx".into()).is_fatal());
        assert!(PruefwerkError::NoPagesAvailable("empty".into()).is_fatal());
        assert!(PruefwerkError::Cancelled.is_fatal());

        assert!(!PruefwerkError::CapabilityUnavailable(Capability::Ocr).is_fatal());
        assert!(!PruefwerkError::Extraction("bad page".into()).is_fatal());
        assert!(!PruefwerkError::Backend("crashed".into()).is_fatal());
    }

    #[test]
    fn unavailable_and_failed_are_distinct() {
        let missing = PruefwerkError::CapabilityUnavailable(Capability::PdfRender);
        let broken = PruefwerkError::OcrError("model returned garbage".into());
        assert_eq!(missing.class(), ErrorClass::Unavailable);
        assert_eq!(broken.class(), ErrorClass::Failed);
    }

    #[test]
    fn capability_message_names_the_feature() {
        let err = PruefwerkError::CapabilityUnavailable(Capability::PdfRender);
        assert_eq!(err.to_string(), "PDF rendering is not available on this system");
    }
}
