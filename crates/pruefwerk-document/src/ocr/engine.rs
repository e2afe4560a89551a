// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust OCR backend using the `ocrs` crate, with neural network models
// executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// pruefwerk-document = { path = "crates/pruefwerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Running `ocrs-cli` once downloads them to `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is the default lookup directory.

use std::path::{Path, PathBuf};

use image::RgbImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use pruefwerk_core::error::{PruefwerkError, Result};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::backend::OcrBackend;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Default directory for cached OCR model files.
///
/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expect `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Both model files exist.
    pub fn models_present(&self) -> bool {
        self.detection_model_path.exists() && self.recognition_model_path.exists()
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(PruefwerkError::CapabilityUnavailable(
                    pruefwerk_core::Capability::Ocr,
                ));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed OCR engine. Model loading is the expensive step, so one
/// engine is built per process and shared.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    /// Load the models named in `config`.
    ///
    /// The `ocrs` and `rten` crates must be compiled in release mode; debug
    /// builds are 10-100x slower.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            PruefwerkError::OcrError(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                PruefwerkError::OcrError(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| PruefwerkError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    /// Load models only if they are installed; `None` otherwise.
    pub fn probe(config: &OcrConfig) -> Option<Self> {
        if !config.models_present() {
            debug!("ocrs models not installed");
            return None;
        }
        match Self::new(config) {
            Ok(engine) => Some(engine),
            Err(err) => {
                tracing::warn!(%err, "ocrs models present but unusable");
                None
            }
        }
    }
}

impl OcrBackend for OcrEngine {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    fn recognize(&self, page: &RgbImage) -> Result<String> {
        let (width, height) = page.dimensions();
        let source = ImageSource::from_bytes(page.as_raw(), (width, height)).map_err(|err| {
            PruefwerkError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| PruefwerkError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let text = self.engine.get_text(&input).map_err(|err| {
            PruefwerkError::OcrError(format!("OCR text recognition failed: {}", err))
        })?;

        debug!(line_count = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}
