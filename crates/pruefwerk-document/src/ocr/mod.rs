// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR backends. `ocrs` (pure Rust, behind the "ocr" feature) is preferred
// when its models are installed; the `tesseract` executable is the fallback.

#[cfg(feature = "ocr")]
pub mod engine;
pub mod tesseract;

#[cfg(feature = "ocr")]
pub use engine::OcrEngine;
pub use tesseract::TesseractOcr;
