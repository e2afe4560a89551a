// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — page inventory and embedded text extraction using the `lopdf`
// crate. Rasterisation lives behind the `PageRenderer` seam instead.

use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use pruefwerk_core::error::{PruefwerkError, Result};
use pruefwerk_core::pdf_header_offset;
use tracing::{debug, instrument};

use crate::backend::TextLayer;

/// Text-showing operators of the PDF content stream syntax.
const TEXT_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// Reads page structure and embedded text from an in-memory PDF.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    /// Parse a PDF already in memory. Bytes before the `%PDF-` header are
    /// skipped.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let Some(offset) = pdf_header_offset(data) else {
            return Err(PruefwerkError::PdfError(
                "missing %PDF- signature".to_string(),
            ));
        };
        let document = Document::load_mem(&data[offset..]).map_err(|err| {
            PruefwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Whether page `page_index` (zero-based) draws any text at all.
    ///
    /// Scanned PDFs contain only images; their pages report `false` and are
    /// better served by OCR.
    pub fn page_has_text(&self, page_index: usize) -> Result<bool> {
        let page_id = self.page_id(page_index)?;
        let raw = self.document.get_page_content(page_id).map_err(|err| {
            PruefwerkError::PdfError(format!(
                "cannot read content of page {}: {}",
                page_index + 1,
                err
            ))
        })?;
        let content = Content::decode(&raw).map_err(|err| {
            PruefwerkError::PdfError(format!(
                "cannot decode content of page {}: {}",
                page_index + 1,
                err
            ))
        })?;
        Ok(content
            .operations
            .iter()
            .any(|op| TEXT_OPERATORS.contains(&op.operator.as_str())))
    }

    // lopdf pages are keyed by 1-indexed page number.
    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        let number = page_index as u32 + 1;
        pages.get(&number).copied().ok_or_else(|| {
            PruefwerkError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                number,
                pages.len()
            ))
        })
    }
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("pages", &self.page_count())
            .finish()
    }
}

impl TextLayer for PdfReader {
    #[instrument(skip(self))]
    fn page_text(&self, page_index: usize) -> Result<String> {
        self.page_id(page_index)?;
        let number = page_index as u32 + 1;
        let text = self.document.extract_text(&[number]).map_err(|err| {
            PruefwerkError::Extraction(format!(
                "text layer of page {} unreadable: {}",
                number, err
            ))
        })?;
        debug!(chars = text.len(), "Text layer extracted");
        Ok(text)
    }
}
