// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module — per-page text extraction with graceful degradation.

pub mod extract;

pub use extract::{SourceKind, TextExtractor};
