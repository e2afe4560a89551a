// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification report — everything a finished run produced, plus a
// serialisable summary for display and JSON output.

use chrono::{DateTime, Utc};
use pruefwerk_core::error::{ErrorClass, PruefwerkError};
use pruefwerk_core::human_errors::humanize_error;
use pruefwerk_core::{
    CanonicalPage, CapabilitySet, Classification, DocumentKind, ExtractedText, SimilarityReport,
    Verdict,
};
use pruefwerk_document::{DiffSummary, TransformResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::integrity::Fingerprint;
use crate::orchestrator::VerificationState;
use crate::similarity::SimilarityEngine;

/// A non-fatal degradation recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// State the run was leaving when the condition occurred.
    pub stage: VerificationState,
    pub class: ErrorClass,
    /// Plain-language summary.
    pub message: String,
    pub suggestion: String,
    /// Technical detail for logs.
    pub detail: String,
}

impl Notice {
    pub fn from_error(stage: VerificationState, err: &PruefwerkError) -> Self {
        let human = humanize_error(err);
        Self {
            stage,
            class: human.class,
            message: human.message,
            suggestion: human.suggestion,
            detail: err.to_string(),
        }
    }
}

/// Everything produced by a run that reached a verdict.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub kind: DocumentKind,
    pub capabilities: CapabilitySet,
    pub fingerprint: Fingerprint,
    /// All canonical pages, in document order.
    pub pages: Vec<CanonicalPage>,
    pub selected_page: usize,
    /// Transforms of the selected page.
    pub transform: TransformResult,
    /// Text of the selected page.
    pub text: ExtractedText,
    pub verdict: Verdict,
    pub notices: Vec<Notice>,
}

impl VerificationReport {
    /// The page that was extracted and compared.
    pub fn selected(&self) -> Option<&CanonicalPage> {
        self.pages.get(self.selected_page)
    }

    pub fn diff_summary(&self) -> Option<DiffSummary> {
        self.verdict.diff_image.as_ref().map(DiffSummary::of)
    }

    /// Serialisable view of the report without the bitmaps.
    pub fn summary(&self) -> ReportSummary {
        let changes = self
            .verdict
            .similarity
            .as_ref()
            .map(|s| SimilarityEngine::render_changes(&s.changes));

        ReportSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            document_kind: self.kind,
            page_count: self.pages.len(),
            selected_page: self.selected_page,
            capabilities: self.capabilities,
            fingerprint: self.fingerprint.clone(),
            text: self.text.clone(),
            classification: self.verdict.classification,
            similarity: self.verdict.similarity.clone(),
            changes,
            image_diff: self.diff_summary().map(DiffStats::from),
            notices: self.notices.clone(),
        }
    }
}

/// JSON-friendly summary of a [`VerificationReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub document_kind: DocumentKind,
    pub page_count: usize,
    pub selected_page: usize,
    pub capabilities: CapabilitySet,
    pub fingerprint: Fingerprint,
    pub text: ExtractedText,
    pub classification: Classification,
    pub similarity: Option<SimilarityReport>,
    /// `+ token` / `- token` listing of the text changes.
    pub changes: Option<String>,
    pub image_diff: Option<DiffStats>,
    pub notices: Vec<Notice>,
}

/// Pixel statistics of the reference image diff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffStats {
    pub changed_pixels: u64,
    pub total_pixels: u64,
    pub changed_fraction: f64,
    pub max_delta: u8,
}

impl From<DiffSummary> for DiffStats {
    fn from(summary: DiffSummary) -> Self {
        Self {
            changed_pixels: summary.changed_pixels,
            total_pixels: summary.total_pixels,
            changed_fraction: summary.changed_fraction(),
            max_delta: summary.max_delta,
        }
    }
}
