// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification orchestrator — drives one submission through
//
//   Idle → Ingested → Extracted → Compared → Verdicted
//
// Each `advance` performs exactly one transition. No state is revisited: a
// new submission needs a new orchestrator. Only `UnsupportedFormat`,
// `NoPagesAvailable` and `Cancelled` abort a run; every other problem is
// recorded as a notice and the run still reaches a verdict.

use chrono::{DateTime, Utc};
use image::RgbImage;
use pruefwerk_core::error::{PruefwerkError, Result};
use pruefwerk_core::{
    CancelFlag, CanonicalPage, Capability, Classification, DocumentKind, ExtractedText,
    ExtractionStatus, SimilarityReport, Verdict, VerifyConfig,
};
use pruefwerk_document::{
    CapabilityRegistry, DocumentIngestor, ImageTransformer, PdfReader, SourceKind, TextExtractor,
    TransformResult, WorkerPool,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::integrity::Fingerprint;
use crate::report::{Notice, VerificationReport};
use crate::similarity::SimilarityEngine;

/// Position of a run in the verification state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Idle,
    Ingested,
    Extracted,
    Compared,
    Verdicted,
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Ingested => "ingested",
            Self::Extracted => "extracted",
            Self::Compared => "compared",
            Self::Verdicted => "verdicted",
        };
        f.write_str(label)
    }
}

/// A submitted document and whatever it should be compared against.
#[derive(Debug, Clone, Default)]
pub struct VerificationRequest {
    pub document: Vec<u8>,
    /// Declared kind; sniffed from the bytes when absent.
    pub kind: Option<DocumentKind>,
    /// Known-good text of the selected page.
    pub reference_text: Option<String>,
    /// Known-good image of the selected page (any decodable format).
    pub reference_image: Option<Vec<u8>>,
    /// Known-good copy of the whole file, for the byte-identity check.
    pub reference_document: Option<Vec<u8>>,
    /// Overrides `VerifyConfig::selected_page`.
    pub selected_page: Option<usize>,
}

impl VerificationRequest {
    pub fn new(document: Vec<u8>) -> Self {
        Self {
            document,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_reference_text(mut self, text: impl Into<String>) -> Self {
        self.reference_text = Some(text.into());
        self
    }

    pub fn with_reference_image(mut self, bytes: Vec<u8>) -> Self {
        self.reference_image = Some(bytes);
        self
    }

    pub fn with_reference_document(mut self, bytes: Vec<u8>) -> Self {
        self.reference_document = Some(bytes);
        self
    }

    pub fn with_selected_page(mut self, page: usize) -> Self {
        self.selected_page = Some(page);
        self
    }

    /// Reference text, treating whitespace-only input as absent.
    fn reference_text(&self) -> Option<&str> {
        self.reference_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Decide the classification of a run.
///
/// Unusable extracted text or a missing comparison is INCONCLUSIVE; otherwise
/// the ratio must be strictly above `threshold` for ORIGINAL.
pub fn classify(
    text: &ExtractedText,
    similarity: Option<&SimilarityReport>,
    threshold: f64,
) -> Classification {
    if !text.is_usable() {
        return Classification::Inconclusive;
    }
    match similarity {
        None => Classification::Inconclusive,
        Some(report) if report.ratio > threshold => Classification::Original,
        Some(_) => Classification::Fake,
    }
}

/// Drives one verification run.
pub struct VerificationOrchestrator {
    registry: CapabilityRegistry,
    config: VerifyConfig,
    pool: WorkerPool,
    cancel: CancelFlag,
    request: VerificationRequest,

    state: VerificationState,
    aborted: bool,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    notices: Vec<Notice>,

    kind: Option<DocumentKind>,
    fingerprint: Option<Fingerprint>,
    pages: Vec<CanonicalPage>,
    selected_page: usize,
    pdf: Option<PdfReader>,
    transform: Option<TransformResult>,
    text: Option<ExtractedText>,
    similarity: Option<SimilarityReport>,
    diff_image: Option<RgbImage>,
    verdict: Option<Verdict>,
}

impl VerificationOrchestrator {
    /// Prepare a run on the process-wide worker pool. Fails only on an
    /// invalid configuration or when the pool cannot start.
    pub fn new(
        registry: CapabilityRegistry,
        config: VerifyConfig,
        request: VerificationRequest,
    ) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::shared(config.worker_threads)?;
        let selected_page = request.selected_page.unwrap_or(config.selected_page);

        Ok(Self {
            registry,
            config,
            pool,
            cancel: CancelFlag::new(),
            request,
            state: VerificationState::Idle,
            aborted: false,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            notices: Vec::new(),
            kind: None,
            fingerprint: None,
            pages: Vec::new(),
            selected_page,
            pdf: None,
            transform: None,
            text: None,
            similarity: None,
            diff_image: None,
            verdict: None,
        })
    }

    /// Run page work on `pool` instead of the process-wide pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Use `cancel` to stop the run from another thread.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> VerificationState {
        self.state
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Perform the next transition and return the new state.
    ///
    /// A fatal error stops the run for good: every later call fails with
    /// `InvalidTransition`, as does advancing past `Verdicted`.
    #[instrument(skip(self), fields(run_id = %self.run_id, from = %self.state))]
    pub fn advance(&mut self) -> Result<VerificationState> {
        if self.aborted {
            return Err(PruefwerkError::InvalidTransition(format!(
                "run was aborted in state {}",
                self.state
            )));
        }

        let step = match self.state {
            VerificationState::Idle => self.ingest(),
            VerificationState::Ingested => self.extract(),
            VerificationState::Extracted => self.compare(),
            VerificationState::Compared => self.decide(),
            VerificationState::Verdicted => {
                return Err(PruefwerkError::InvalidTransition(
                    "run already has a verdict".to_string(),
                ));
            }
        };

        match step {
            Ok(next) => {
                info!(to = %next, "Verification advanced");
                self.state = next;
                Ok(next)
            }
            Err(err) => {
                warn!(%err, "Verification aborted");
                self.aborted = true;
                Err(err)
            }
        }
    }

    /// Advance until a verdict is reached and return the report.
    pub fn run(mut self) -> Result<VerificationReport> {
        while self.state != VerificationState::Verdicted {
            self.advance()?;
        }
        self.into_report()
    }

    /// The report of a run that reached `Verdicted`.
    pub fn into_report(self) -> Result<VerificationReport> {
        let state = self.state;
        let not_finished = move || {
            PruefwerkError::InvalidTransition(format!(
                "no report before a verdict (state {})",
                state
            ))
        };
        if state != VerificationState::Verdicted {
            return Err(not_finished());
        }
        let capabilities = self.registry.capabilities();
        let (Some(kind), Some(fingerprint), Some(transform), Some(text), Some(verdict)) = (
            self.kind,
            self.fingerprint,
            self.transform,
            self.text,
            self.verdict,
        ) else {
            return Err(not_finished());
        };

        Ok(VerificationReport {
            run_id: self.run_id,
            started_at: self.started_at,
            kind,
            capabilities,
            fingerprint,
            pages: self.pages,
            selected_page: self.selected_page,
            transform,
            text,
            verdict,
            notices: self.notices,
        })
    }

    fn selected(&self) -> Result<&CanonicalPage> {
        self.pages.get(self.selected_page).ok_or_else(|| {
            PruefwerkError::InvalidTransition(format!(
                "page {} has not been ingested",
                self.selected_page + 1
            ))
        })
    }

    fn note(&mut self, err: &PruefwerkError) {
        warn!(stage = %self.state, %err, "Verification degraded");
        self.notices.push(Notice::from_error(self.state, err));
    }

    // Idle → Ingested
    fn ingest(&mut self) -> Result<VerificationState> {
        self.cancel.check()?;
        let kind = DocumentIngestor::resolve_kind(self.request.kind, &self.request.document)?;
        self.fingerprint = Some(Fingerprint::of(
            &self.request.document,
            self.request.reference_document.as_deref(),
        ));

        let ingestor =
            DocumentIngestor::new(&self.registry, self.pool.clone(), self.config.render_dpi);
        let ingestion = ingestor.ingest_with_cancel(&self.request.document, kind, &self.cancel)?;
        for warning in &ingestion.warnings {
            self.note(warning);
        }

        if ingestion.is_empty() {
            return Err(match ingestion.notice {
                Some(err @ PruefwerkError::NoPagesAvailable(_)) => err,
                Some(err) => {
                    self.note(&err);
                    PruefwerkError::NoPagesAvailable(err.to_string())
                }
                None => PruefwerkError::NoPagesAvailable("document produced no pages".to_string()),
            });
        }
        if self.selected_page >= ingestion.pages.len() {
            return Err(PruefwerkError::NoPagesAvailable(format!(
                "page {} requested but the document has {} page(s)",
                self.selected_page + 1,
                ingestion.pages.len()
            )));
        }

        debug!(pages = ingestion.pages.len(), ?kind, "Document ingested");
        self.kind = Some(kind);
        self.pages = ingestion.pages;
        self.pdf = ingestion.pdf;
        Ok(VerificationState::Ingested)
    }

    // Ingested → Extracted
    fn extract(&mut self) -> Result<VerificationState> {
        self.cancel.check()?;
        let use_text_layer = self.selected_page_has_text();
        let page = self.selected()?;
        let source = match (&self.pdf, use_text_layer) {
            (Some(reader), true) => SourceKind::PdfTextLayer(reader),
            _ => SourceKind::ImageOnly,
        };

        let transform = ImageTransformer::transform(page.bitmap());
        let text = TextExtractor::new(&self.registry).extract(page, source);

        match &text.status {
            ExtractionStatus::Ok => {}
            ExtractionStatus::Unavailable => {
                self.note(&PruefwerkError::CapabilityUnavailable(Capability::Ocr))
            }
            ExtractionStatus::Error(message) => {
                self.note(&PruefwerkError::Extraction(message.clone()))
            }
        }

        self.transform = Some(transform);
        self.text = Some(text);
        Ok(VerificationState::Extracted)
    }

    /// Whether the selected page of the ingested PDF draws text. Scanned
    /// pages, and PDFs lopdf could not parse, fall through to OCR.
    fn selected_page_has_text(&mut self) -> bool {
        if !self.registry.capabilities().pdf_text_layer_available {
            return false;
        }
        let Some(reader) = &self.pdf else {
            return false;
        };
        let page_index = self.selected_page;
        match reader.page_has_text(page_index) {
            Ok(true) => true,
            Ok(false) => {
                debug!(page = page_index, "Page has no text layer, using OCR");
                false
            }
            Err(err) => {
                self.note(&err);
                false
            }
        }
    }

    // Extracted → Compared
    fn compare(&mut self) -> Result<VerificationState> {
        self.cancel.check()?;

        if let (Some(reference), Some(text)) = (self.request.reference_text(), &self.text)
            && text.status == ExtractionStatus::Ok
        {
            self.similarity = Some(SimilarityEngine::report(reference, &text.raw_text));
        }

        if let Some(bytes) = self.request.reference_image.take() {
            match image::load_from_memory(&bytes) {
                Ok(reference) => {
                    let diff = ImageTransformer::diff(&reference.to_rgb8(), self.selected()?.bitmap());
                    self.diff_image = Some(diff);
                }
                Err(err) => self.note(&PruefwerkError::ImageError(format!(
                    "reference image could not be decoded: {}",
                    err
                ))),
            }
        }

        Ok(VerificationState::Compared)
    }

    // Compared → Verdicted
    fn decide(&mut self) -> Result<VerificationState> {
        let Some(text) = &self.text else {
            return Err(PruefwerkError::InvalidTransition(
                "no extracted text to decide on".to_string(),
            ));
        };
        let classification = classify(
            text,
            self.similarity.as_ref(),
            self.config.decision_threshold,
        );
        info!(
            %classification,
            ratio = self.similarity.as_ref().map(|s| s.ratio),
            "Verdict reached"
        );
        self.verdict = Some(Verdict {
            classification,
            similarity: self.similarity.take(),
            diff_image: self.diff_image.take(),
        });
        Ok(VerificationState::Verdicted)
    }
}

/// Run a whole verification on a blocking worker thread.
pub async fn verify_async(
    registry: CapabilityRegistry,
    config: VerifyConfig,
    request: VerificationRequest,
    cancel: CancelFlag,
) -> Result<VerificationReport> {
    tokio::task::spawn_blocking(move || {
        VerificationOrchestrator::new(registry, config, request)?
            .with_cancel(cancel)
            .run()
    })
    .await
    .map_err(|err| PruefwerkError::Backend(format!("verification worker failed: {}", err)))?
}
