// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pruefwerk-document — Document processing for the Pruefwerk verifier.
//
// Detects optional backends (PDF rasteriser, OCR engine, PDF text layer),
// turns uploaded bytes into canonical page bitmaps, applies the deterministic
// tamper-visualisation transforms, and extracts page text.

pub mod backend;
pub mod capabilities;
pub mod image;
pub mod ingest;
pub mod ocr;
pub mod pdf;
pub mod pool;
pub mod render;
pub mod text;

// Re-export the primary structs so callers can use `pruefwerk_document::DocumentIngestor` etc.
pub use backend::{OcrBackend, PageRenderer, TextLayer};
pub use capabilities::CapabilityRegistry;
pub use self::image::transform::{
    DiffSummary, ImageTransformer, TransformMode, TransformResult, encode_png,
};
pub use ingest::{DocumentIngestor, Ingestion};
pub use pdf::reader::PdfReader;
pub use pool::WorkerPool;
pub use text::extract::{SourceKind, TextExtractor};

#[cfg(feature = "ocr")]
pub use ocr::engine::OcrEngine;
