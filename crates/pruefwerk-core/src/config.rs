// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PruefwerkError, Result};

/// Similarity above which a document is classified as ORIGINAL.
///
/// The comparison is strict: a ratio of exactly this value is FAKE.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.85;

/// Resolution used when rasterising PDF pages.
pub const DEFAULT_RENDER_DPI: u32 = 150;

/// Settings for a verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Similarity threshold for the ORIGINAL classification (exclusive).
    pub decision_threshold: f64,
    /// DPI for PDF rasterisation.
    pub render_dpi: u32,
    /// Worker threads for per-page work (0 = one per available core).
    ///
    /// Sizes the process-wide pool on first use; later runs share that pool.
    pub worker_threads: usize,
    /// Zero-based page that is extracted and compared.
    pub selected_page: usize,
    /// Directory holding the `ocrs` model files (defaults to the ocrs cache).
    pub ocr_model_dir: Option<PathBuf>,
    /// Executable used for PDF rasterisation.
    pub pdftoppm_path: PathBuf,
    /// Executable used to read the page count of PDFs lopdf cannot parse.
    pub pdfinfo_path: PathBuf,
    /// Executable used as the fallback OCR engine.
    pub tesseract_path: PathBuf,
    /// Tesseract language pack (e.g. `eng`); tesseract's default when unset.
    pub tesseract_language: Option<String>,
    pub disable_ocr: bool,
    pub disable_pdf_render: bool,
    pub disable_text_layer: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            render_dpi: DEFAULT_RENDER_DPI,
            worker_threads: 0,
            selected_page: 0,
            ocr_model_dir: None,
            pdftoppm_path: PathBuf::from("pdftoppm"),
            pdfinfo_path: PathBuf::from("pdfinfo"),
            tesseract_path: PathBuf::from("tesseract"),
            tesseract_language: None,
            disable_ocr: false,
            disable_pdf_render: false,
            disable_text_layer: false,
        }
    }
}

impl VerifyConfig {
    /// Load and validate a JSON configuration file. Missing fields keep
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(PruefwerkError::Config(format!(
                "decision_threshold must be within [0, 1], got {}",
                self.decision_threshold
            )));
        }
        if !(36..=1200).contains(&self.render_dpi) {
            return Err(PruefwerkError::Config(format!(
                "render_dpi must be within 36..=1200, got {}",
                self.render_dpi
            )));
        }
        Ok(())
    }
}
