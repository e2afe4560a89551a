// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend seams. PDF rasterisation and OCR are injected capabilities: the
// pipeline only sees these traits, never a concrete engine.

use std::path::Path;

use image::RgbImage;
use pruefwerk_core::error::{PruefwerkError, Result};

/// Rasterises single PDF pages.
pub trait PageRenderer: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &str;

    /// Render page `page_index` (zero-based) of the PDF at `pdf_path`.
    ///
    /// `scratch` is a directory owned by the caller for intermediate files;
    /// it is removed by the caller once ingestion finishes.
    fn render_page(
        &self,
        pdf_path: &Path,
        page_index: usize,
        dpi: u32,
        scratch: &Path,
    ) -> Result<RgbImage>;

    /// Number of pages in the PDF at `pdf_path`, read by the backend itself.
    ///
    /// Used when the document structure cannot be parsed in-process.
    fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let _ = pdf_path;
        Err(PruefwerkError::Backend(format!(
            "{} cannot count PDF pages",
            self.name()
        )))
    }
}

/// Recognises text in a page bitmap.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Return the raw recognised text. Blank pages may yield an empty string.
    fn recognize(&self, page: &RgbImage) -> Result<String>;
}

/// Embedded text of an already-parsed PDF document.
pub trait TextLayer {
    /// Text of page `page_index` (zero-based), verbatim.
    fn page_text(&self, page_index: usize) -> Result<String>;
}
