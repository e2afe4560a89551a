// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document ingestion — turns uploaded bytes into an ordered sequence of
// canonical RGB page bitmaps.
//
// Images decode directly into a single page. PDFs are rasterised page by page
// through the registry's `PageRenderer`, in parallel on the worker pool. Any
// file the renderer needs lives in a temporary directory that is removed
// before `ingest` returns, whichever way it returns.

use std::path::Path;

use pruefwerk_core::error::{PruefwerkError, Result};
use pruefwerk_core::{
    CancelFlag, CanonicalPage, Capability, DocumentKind, PageSource, pdf_header_offset,
};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::backend::PageRenderer;
use crate::capabilities::CapabilityRegistry;
use crate::pdf::reader::PdfReader;
use crate::pool::WorkerPool;

/// Result of ingesting one document.
///
/// An empty `pages` list means "no pages available" and always comes with a
/// `notice` explaining why; it never describes a zero-page document.
#[derive(Debug)]
pub struct Ingestion {
    pub kind: DocumentKind,
    pub pages: Vec<CanonicalPage>,
    /// Non-fatal condition that left `pages` empty.
    pub notice: Option<PruefwerkError>,
    /// Parsed structure of a PDF, when lopdf could read it. Later stages
    /// read the text layer from it instead of parsing the bytes again.
    pub pdf: Option<PdfReader>,
    /// Problems that did not stop the pages from being produced.
    pub warnings: Vec<PruefwerkError>,
}

impl Ingestion {
    fn pages(kind: DocumentKind, pages: Vec<CanonicalPage>) -> Self {
        Self {
            kind,
            pages,
            notice: None,
            pdf: None,
            warnings: Vec::new(),
        }
    }

    fn degraded(kind: DocumentKind, notice: PruefwerkError) -> Self {
        Self {
            kind,
            pages: Vec::new(),
            notice: Some(notice),
            pdf: None,
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Converts raw document bytes into canonical pages.
pub struct DocumentIngestor<'a> {
    registry: &'a CapabilityRegistry,
    pool: WorkerPool,
    dpi: u32,
}

impl<'a> DocumentIngestor<'a> {
    pub fn new(registry: &'a CapabilityRegistry, pool: WorkerPool, dpi: u32) -> Self {
        Self {
            registry,
            pool,
            dpi,
        }
    }

    /// Decide the document kind from the caller's declaration, falling back
    /// to content sniffing.
    pub fn resolve_kind(declared: Option<DocumentKind>, data: &[u8]) -> Result<DocumentKind> {
        declared.or_else(|| DocumentKind::sniff(data)).ok_or_else(|| {
            PruefwerkError::UnsupportedFormat(
                "neither a PDF nor a recognised image format".to_string(),
            )
        })
    }

    pub fn ingest(&self, data: &[u8], kind: DocumentKind) -> Result<Ingestion> {
        self.ingest_with_cancel(data, kind, &CancelFlag::new())
    }

    /// Ingest `data` as `kind`.
    ///
    /// Fails only with `UnsupportedFormat` (bytes are not a decodable `kind`)
    /// or `Cancelled`. A missing or failing renderer yields an empty
    /// [`Ingestion`] with a notice instead.
    #[instrument(skip(self, data, cancel), fields(data_len = data.len()))]
    pub fn ingest_with_cancel(
        &self,
        data: &[u8],
        kind: DocumentKind,
        cancel: &CancelFlag,
    ) -> Result<Ingestion> {
        cancel.check()?;
        match kind {
            DocumentKind::Image => self.ingest_image(data),
            DocumentKind::Pdf => self.ingest_pdf(data, cancel),
        }
    }

    fn ingest_image(&self, data: &[u8]) -> Result<Ingestion> {
        let image = image::load_from_memory(data).map_err(|err| {
            PruefwerkError::UnsupportedFormat(format!("failed to decode image: {}", err))
        })?;
        let bitmap = image.to_rgb8();
        info!(
            width = bitmap.width(),
            height = bitmap.height(),
            "Image ingested"
        );
        Ok(Ingestion::pages(
            DocumentKind::Image,
            vec![CanonicalPage::new(0, bitmap, PageSource::NativeImage)],
        ))
    }

    /// Only the `%PDF-` header is required up front. lopdf parses the
    /// structure when it can; a file it rejects still goes to the renderer,
    /// which then also supplies the page count.
    fn ingest_pdf(&self, data: &[u8], cancel: &CancelFlag) -> Result<Ingestion> {
        if pdf_header_offset(data).is_none() {
            return Err(PruefwerkError::UnsupportedFormat(
                "not a PDF: no %PDF- header".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let pdf = match PdfReader::from_bytes(data) {
            Ok(reader) => Some(reader),
            Err(err) => {
                warn!(%err, "PDF structure unreadable; relying on the renderer");
                warnings.push(err);
                None
            }
        };

        let mut ingestion = match self.registry.renderer() {
            None => {
                warn!("PDF rendering unavailable; no pages produced");
                Ingestion::degraded(
                    DocumentKind::Pdf,
                    PruefwerkError::CapabilityUnavailable(Capability::PdfRender),
                )
            }
            Some(renderer) => {
                let known_pages = pdf.as_ref().map(PdfReader::page_count);
                match self.render_all(data, known_pages, renderer, cancel) {
                    Ok(pages) => {
                        info!(pages = pages.len(), renderer = renderer.name(), "PDF ingested");
                        Ingestion::pages(DocumentKind::Pdf, pages)
                    }
                    Err(PruefwerkError::Cancelled) => return Err(PruefwerkError::Cancelled),
                    Err(err) => {
                        warn!(%err, "PDF rendering failed; no pages produced");
                        Ingestion::degraded(DocumentKind::Pdf, err)
                    }
                }
            }
        };
        ingestion.pdf = pdf;
        ingestion.warnings = warnings;
        Ok(ingestion)
    }

    /// Rasterise every page. The scratch directory is dropped, and deleted,
    /// when this function returns.
    fn render_all(
        &self,
        data: &[u8],
        known_pages: Option<usize>,
        renderer: &dyn PageRenderer,
        cancel: &CancelFlag,
    ) -> Result<Vec<CanonicalPage>> {
        let scratch = tempfile::Builder::new()
            .prefix("pruefwerk-ingest-")
            .tempdir()?;
        let pdf_path = scratch.path().join("document.pdf");
        std::fs::write(&pdf_path, data)?;
        debug!(scratch = %scratch.path().display(), "Scratch directory created");

        let page_count = match known_pages {
            Some(count) => count,
            None => renderer.page_count(&pdf_path)?,
        };
        if page_count == 0 {
            return Err(PruefwerkError::NoPagesAvailable(
                "the PDF page tree is empty".to_string(),
            ));
        }

        let dpi = self.dpi;
        let scratch_path: &Path = scratch.path();
        self.pool.install(|| {
            (0..page_count)
                .into_par_iter()
                .map(|index| {
                    cancel.check()?;
                    let bitmap = renderer.render_page(&pdf_path, index, dpi, scratch_path)?;
                    Ok(CanonicalPage::new(index, bitmap, PageSource::RenderedFromPdf))
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::transform::ImageTransformer;
    use crate::pdf::reader::fixtures::pdf_with_pages;
    use crate::pdf::reader::fixtures::with_broken_xref;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Paints each page a flat colour derived from its index and remembers
    /// where the PDF was written.
    #[derive(Default)]
    struct FakeRenderer {
        seen_pdf: Mutex<Option<PathBuf>>,
        fail_on: Option<usize>,
        /// Page count reported for PDFs lopdf cannot parse.
        page_count: Option<usize>,
        /// Cancelled as soon as the first page is rendered.
        cancel_on_render: Option<CancelFlag>,
        rendered: AtomicUsize,
    }

    impl PageRenderer for FakeRenderer {
        fn name(&self) -> &str {
            "fake"
        }

        fn render_page(
            &self,
            pdf_path: &Path,
            page_index: usize,
            dpi: u32,
            _scratch: &Path,
        ) -> Result<RgbImage> {
            assert!(pdf_path.exists(), "PDF must exist while rendering");
            *self.seen_pdf.lock().unwrap() = Some(pdf_path.to_path_buf());
            self.rendered.fetch_add(1, Ordering::SeqCst);
            if let Some(cancel) = &self.cancel_on_render {
                cancel.cancel();
            }
            if self.fail_on == Some(page_index) {
                return Err(PruefwerkError::PdfError("corrupt page".into()));
            }
            let shade = (page_index as u8 + 1) * 50;
            Ok(RgbImage::from_pixel(dpi / 10, dpi / 10, Rgb([shade, shade, shade])))
        }

        fn page_count(&self, pdf_path: &Path) -> Result<usize> {
            assert!(pdf_path.exists(), "PDF must exist while counting pages");
            self.page_count
                .ok_or_else(|| PruefwerkError::Backend("no page count".into()))
        }
    }

    fn ingestor(registry: &CapabilityRegistry) -> DocumentIngestor<'_> {
        DocumentIngestor::new(registry, WorkerPool::new(2).unwrap(), 150)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn image_ingests_to_one_native_page() {
        let registry = CapabilityRegistry::none();
        let ingestion = ingestor(&registry)
            .ingest(&png_bytes(12, 7), DocumentKind::Image)
            .unwrap();
        assert_eq!(ingestion.pages.len(), 1);
        let page = &ingestion.pages[0];
        assert_eq!(page.index(), 0);
        assert_eq!((page.width(), page.height()), (12, 7));
        assert_eq!(page.source(), PageSource::NativeImage);
        assert!(ingestion.notice.is_none());
    }

    #[test]
    fn undecodable_image_is_unsupported() {
        let registry = CapabilityRegistry::none();
        let result = ingestor(&registry).ingest(b"definitely not pixels", DocumentKind::Image);
        assert!(matches!(result, Err(PruefwerkError::UnsupportedFormat(_))));
    }

    #[test]
    fn garbage_declared_as_pdf_is_unsupported() {
        let registry = CapabilityRegistry::none();
        let result = ingestor(&registry).ingest(b"hello", DocumentKind::Pdf);
        assert!(matches!(result, Err(PruefwerkError::UnsupportedFormat(_))));
    }

    #[test]
    fn pdf_without_renderer_yields_no_pages_and_a_notice() {
        let registry = CapabilityRegistry::none();
        let pdf = pdf_with_pages(&[Some("a"), Some("b")]);
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();
        assert!(ingestion.is_empty());
        assert!(matches!(
            ingestion.notice,
            Some(PruefwerkError::CapabilityUnavailable(Capability::PdfRender))
        ));
    }

    #[test]
    fn two_page_pdf_keeps_page_order() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = pdf_with_pages(&[Some("first"), Some("second")]);
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        assert_eq!(ingestion.pages.len(), 2);
        assert_eq!(ingestion.pages[0].index(), 0);
        assert_eq!(ingestion.pages[1].index(), 1);
        assert_eq!(ingestion.pages[0].bitmap().get_pixel(0, 0).0, [50, 50, 50]);
        assert_eq!(ingestion.pages[1].bitmap().get_pixel(0, 0).0, [100, 100, 100]);
        assert!(ingestion
            .pages
            .iter()
            .all(|p| p.source() == PageSource::RenderedFromPdf));
    }

    #[test]
    fn transforming_page_two_leaves_page_one_untouched() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = pdf_with_pages(&[Some("first"), Some("second")]);
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        let before = ingestion.pages[0].clone();
        let _ = ImageTransformer::transform(ingestion.pages[1].bitmap());
        assert_eq!(ingestion.pages[0], before);
    }

    #[test]
    fn repeated_ingestion_is_bitwise_identical() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = pdf_with_pages(&[Some("x"), None, Some("z")]);
        let ingestor = ingestor(&registry);
        let first = ingestor.ingest(&pdf, DocumentKind::Pdf).unwrap();
        let second = ingestor.ingest(&pdf, DocumentKind::Pdf).unwrap();
        assert_eq!(first.pages, second.pages);
    }

    #[test]
    fn scratch_directory_removed_after_success() {
        let renderer = std::sync::Arc::new(FakeRenderer::default());
        let registry = CapabilityRegistry::builder()
            .renderer(SharedRenderer(renderer.clone()))
            .build();
        let pdf = pdf_with_pages(&[Some("only")]);
        ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        let seen = renderer.seen_pdf.lock().unwrap().clone().unwrap();
        assert!(!seen.exists());
        assert!(!seen.parent().unwrap().exists());
    }

    #[test]
    fn scratch_directory_removed_after_render_failure() {
        let renderer = std::sync::Arc::new(FakeRenderer {
            fail_on: Some(0),
            ..Default::default()
        });
        let registry = CapabilityRegistry::builder()
            .renderer(SharedRenderer(renderer.clone()))
            .build();
        let pdf = pdf_with_pages(&[Some("broken")]);
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        assert!(ingestion.is_empty());
        assert!(matches!(ingestion.notice, Some(PruefwerkError::PdfError(_))));
        let seen = renderer.seen_pdf.lock().unwrap().clone().unwrap();
        assert!(!seen.parent().unwrap().exists());
    }

    #[test]
    fn cancelled_before_start_aborts() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = pdf_with_pages(&[Some("a"), Some("b")]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = ingestor(&registry).ingest_with_cancel(&pdf, DocumentKind::Pdf, &cancel);
        assert!(matches!(result, Err(PruefwerkError::Cancelled)));
    }

    #[test]
    fn cancelling_mid_render_stops_remaining_pages() {
        let cancel = CancelFlag::new();
        let renderer = std::sync::Arc::new(FakeRenderer {
            cancel_on_render: Some(cancel.clone()),
            ..Default::default()
        });
        let registry = CapabilityRegistry::builder()
            .renderer(SharedRenderer(renderer.clone()))
            .build();
        let ingestor = DocumentIngestor::new(&registry, WorkerPool::new(1).unwrap(), 150);
        let pdf = pdf_with_pages(&[Some("a"), Some("b"), Some("c")]);

        let result = ingestor.ingest_with_cancel(&pdf, DocumentKind::Pdf, &cancel);
        assert!(matches!(result, Err(PruefwerkError::Cancelled)));
        assert!(renderer.rendered.load(Ordering::SeqCst) < 3);
        let seen = renderer.seen_pdf.lock().unwrap().clone().unwrap();
        assert!(!seen.parent().unwrap().exists());
    }

    #[test]
    fn broken_xref_pdf_is_rendered_with_renderer_page_count() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer {
                page_count: Some(2),
                ..Default::default()
            })
            .build();
        let pdf = with_broken_xref(pdf_with_pages(&[Some("first"), Some("second")]));
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        assert_eq!(ingestion.pages.len(), 2);
        assert_eq!(ingestion.pages[1].bitmap().get_pixel(0, 0).0, [100, 100, 100]);
        assert!(ingestion.pdf.is_none());
        assert!(matches!(
            ingestion.warnings.as_slice(),
            [PruefwerkError::PdfError(_)]
        ));
    }

    #[test]
    fn broken_xref_pdf_without_page_count_degrades() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = with_broken_xref(pdf_with_pages(&[Some("only")]));
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        assert!(ingestion.is_empty());
        assert!(matches!(ingestion.notice, Some(PruefwerkError::Backend(_))));
        assert_eq!(ingestion.warnings.len(), 1);
    }

    #[test]
    fn header_after_leading_bytes_is_still_a_pdf() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let mut pdf = b"\xEF\xBB\xBF".to_vec();
        pdf.extend(pdf_with_pages(&[Some("first"), Some("second")]));
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();

        assert_eq!(ingestion.pages.len(), 2);
        assert!(ingestion.pdf.is_some());
        assert!(ingestion.warnings.is_empty());
    }

    #[test]
    fn parsed_pdf_is_kept_for_the_text_layer() {
        let registry = CapabilityRegistry::builder()
            .renderer(FakeRenderer::default())
            .build();
        let pdf = pdf_with_pages(&[Some("Certificate")]);
        let ingestion = ingestor(&registry).ingest(&pdf, DocumentKind::Pdf).unwrap();
        let reader = ingestion.pdf.as_ref().unwrap();
        assert!(reader.page_has_text(0).unwrap());
    }

    #[test]
    fn kind_resolution_prefers_declaration_then_sniffs() {
        let png = png_bytes(2, 2);
        assert_eq!(
            DocumentIngestor::resolve_kind(Some(DocumentKind::Pdf), &png).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentIngestor::resolve_kind(None, &png).unwrap(),
            DocumentKind::Image
        );
        assert!(matches!(
            DocumentIngestor::resolve_kind(None, b"plain text"),
            Err(PruefwerkError::UnsupportedFormat(_))
        ));
    }

    /// Lets a test keep a handle on the renderer the registry owns.
    struct SharedRenderer(std::sync::Arc<FakeRenderer>);

    impl PageRenderer for SharedRenderer {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn render_page(
            &self,
            pdf_path: &Path,
            page_index: usize,
            dpi: u32,
            scratch: &Path,
        ) -> Result<RgbImage> {
            self.0.render_page(pdf_path, page_index, dpi, scratch)
        }

        fn page_count(&self, pdf_path: &Path) -> Result<usize> {
            self.0.page_count(pdf_path)
        }
    }
}
