// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pruefwerk-verify — Text similarity, document fingerprints, and the
// verification state machine that turns a submitted document into a verdict.

pub mod integrity;
pub mod orchestrator;
pub mod report;
pub mod similarity;

pub use integrity::{Fingerprint, hash_bytes};
pub use orchestrator::{
    VerificationOrchestrator, VerificationRequest, VerificationState, classify, verify_async,
};
pub use report::{Notice, ReportSummary, VerificationReport};
pub use similarity::SimilarityEngine;
