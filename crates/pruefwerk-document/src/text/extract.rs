// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction — embedded PDF text layer first, OCR second, and an
// explicit "unavailable" result when neither backend exists. Backend errors
// and panics become an `error` status; they never abort the pipeline.

use std::panic::{AssertUnwindSafe, catch_unwind};

use pruefwerk_core::error::Result;
use pruefwerk_core::{CanonicalPage, ExtractedText, ExtractionMethod};
use tracing::{debug, instrument, warn};

use crate::backend::TextLayer;
use crate::capabilities::CapabilityRegistry;

/// Where the text of a page can come from.
#[derive(Clone, Copy)]
pub enum SourceKind<'a> {
    /// The page belongs to a PDF whose embedded text can be read.
    PdfTextLayer(&'a dyn TextLayer),
    /// Only the bitmap is available.
    ImageOnly,
}

impl std::fmt::Debug for SourceKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PdfTextLayer(_) => f.write_str("PdfTextLayer"),
            Self::ImageOnly => f.write_str("ImageOnly"),
        }
    }
}

/// Extracts page text using whatever backends the registry offers.
pub struct TextExtractor<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> TextExtractor<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Extract the text of `page`.
    ///
    /// Always returns a value: `ok` (possibly empty), `unavailable` with a
    /// placeholder, or `error` with the backend's message.
    #[instrument(skip_all, fields(page = page.index(), source = ?source))]
    pub fn extract(&self, page: &CanonicalPage, source: SourceKind<'_>) -> ExtractedText {
        let caps = self.registry.capabilities();

        if let SourceKind::PdfTextLayer(layer) = source
            && caps.pdf_text_layer_available
        {
            return run_guarded(page.index(), ExtractionMethod::TextLayer, || {
                layer.page_text(page.index())
            });
        }

        if let Some(ocr) = self.registry.ocr() {
            return run_guarded(page.index(), ExtractionMethod::Ocr, || {
                ocr.recognize(page.bitmap())
            });
        }

        debug!("No extraction backend available");
        ExtractedText::unavailable(page.index())
    }
}

/// Run a backend call, converting errors and panics into an `error` status.
/// Whitespace-only output is normalised to an empty `ok` result.
fn run_guarded<F>(page_index: usize, method: ExtractionMethod, call: F) -> ExtractedText
where
    F: FnOnce() -> Result<String>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(text)) => {
            let text = if text.trim().is_empty() {
                String::new()
            } else {
                text
            };
            debug!(?method, chars = text.len(), "Text extracted");
            ExtractedText::ok(page_index, text, method)
        }
        Ok(Err(err)) => {
            warn!(?method, %err, "Text extraction failed");
            ExtractedText::error(page_index, err.to_string(), method)
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(?method, %detail, "Extraction backend panicked");
            ExtractedText::error(page_index, format!("backend panicked: {detail}"), method)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OcrBackend;
    use crate::pdf::reader::PdfReader;
    use crate::pdf::reader::fixtures::pdf_with_pages;
    use image::{Rgb, RgbImage};
    use pruefwerk_core::error::PruefwerkError;
    use pruefwerk_core::{ExtractionStatus, PageSource, UNAVAILABLE_TEXT_PLACEHOLDER};

    struct FixedOcr(&'static str);

    impl OcrBackend for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _page: &RgbImage) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingOcr;

    impl OcrBackend for FailingOcr {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _page: &RgbImage) -> Result<String> {
            Err(PruefwerkError::OcrError("model crashed".into()))
        }
    }

    struct PanickingOcr;

    impl OcrBackend for PanickingOcr {
        fn name(&self) -> &str {
            "panicking"
        }

        fn recognize(&self, _page: &RgbImage) -> Result<String> {
            panic!("tensor index out of bounds")
        }
    }

    struct WhitespaceLayer;

    impl TextLayer for WhitespaceLayer {
        fn page_text(&self, _page_index: usize) -> Result<String> {
            Ok(" \n\t ".to_string())
        }
    }

    fn page() -> CanonicalPage {
        CanonicalPage::new(0, RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])), PageSource::NativeImage)
    }

    #[test]
    fn no_backends_is_always_unavailable() {
        let registry = CapabilityRegistry::none();
        let extractor = TextExtractor::new(&registry);
        let layer = WhitespaceLayer;

        for source in [SourceKind::ImageOnly, SourceKind::PdfTextLayer(&layer)] {
            let text = extractor.extract(&page(), source);
            assert_eq!(text.status, ExtractionStatus::Unavailable);
            assert_eq!(text.raw_text, UNAVAILABLE_TEXT_PLACEHOLDER);
            assert_eq!(text.method, ExtractionMethod::None);
        }
    }

    #[test]
    fn text_layer_wins_over_ocr() {
        let registry = CapabilityRegistry::builder()
            .ocr(FixedOcr("from ocr"))
            .text_layer(true)
            .build();
        let pdf = pdf_with_pages(&[Some("Certificate of Completion")]);
        let reader = PdfReader::from_bytes(&pdf).unwrap();

        let text = TextExtractor::new(&registry).extract(&page(), SourceKind::PdfTextLayer(&reader));
        assert_eq!(text.status, ExtractionStatus::Ok);
        assert_eq!(text.method, ExtractionMethod::TextLayer);
        assert!(text.raw_text.contains("Certificate of Completion"));
    }

    #[test]
    fn whitespace_text_layer_is_ok_and_empty() {
        let registry = CapabilityRegistry::builder().text_layer(true).build();
        let text = TextExtractor::new(&registry)
            .extract(&page(), SourceKind::PdfTextLayer(&WhitespaceLayer));
        assert_eq!(text.status, ExtractionStatus::Ok);
        assert_eq!(text.raw_text, "");
    }

    #[test]
    fn disabled_text_layer_falls_back_to_ocr() {
        let registry = CapabilityRegistry::builder()
            .ocr(FixedOcr("Jane Doe"))
            .text_layer(false)
            .build();
        let text = TextExtractor::new(&registry)
            .extract(&page(), SourceKind::PdfTextLayer(&WhitespaceLayer));
        assert_eq!(text.method, ExtractionMethod::Ocr);
        assert_eq!(text.raw_text, "Jane Doe");
    }

    #[test]
    fn blank_ocr_output_is_ok_not_error() {
        let registry = CapabilityRegistry::builder().ocr(FixedOcr("\n\n")).build();
        let text = TextExtractor::new(&registry).extract(&page(), SourceKind::ImageOnly);
        assert_eq!(text.status, ExtractionStatus::Ok);
        assert!(text.raw_text.is_empty());
    }

    #[test]
    fn backend_error_becomes_error_status() {
        let registry = CapabilityRegistry::builder().ocr(FailingOcr).build();
        let text = TextExtractor::new(&registry).extract(&page(), SourceKind::ImageOnly);
        match text.status {
            ExtractionStatus::Error(message) => assert!(message.contains("model crashed")),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn backend_panic_becomes_error_status() {
        let registry = CapabilityRegistry::builder().ocr(PanickingOcr).build();
        let text = TextExtractor::new(&registry).extract(&page(), SourceKind::ImageOnly);
        match text.status {
            ExtractionStatus::Error(message) => {
                assert!(message.contains("tensor index out of bounds"))
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }
}
