// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract OCR through its command-line interface.
//
// The page is encoded as PNG and piped in; recognised text is read back:
//   tesseract stdin stdout

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::{DynamicImage, RgbImage};
use pruefwerk_core::VerifyConfig;
use pruefwerk_core::error::{PruefwerkError, Result};
use tracing::{debug, instrument};

use crate::backend::OcrBackend;
use crate::image::transform::encode_png;

/// OCR backend that shells out to `tesseract`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    executable: PathBuf,
    language: Option<String>,
}

impl TesseractOcr {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            language: None,
        }
    }

    /// Restrict recognition to a tesseract language pack (e.g. `eng`).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Backend for the executable and language pack named in `config`.
    pub fn from_config(config: &VerifyConfig) -> Self {
        let backend = Self::new(&config.tesseract_path);
        match &config.tesseract_language {
            Some(language) => backend.with_language(language.clone()),
            None => backend,
        }
    }

    /// Return a backend if `tesseract --version` runs successfully.
    pub fn probe(executable: impl Into<PathBuf>) -> Option<Self> {
        Self::new(executable).verified()
    }

    /// Like [`probe`](Self::probe), configured from `config`.
    pub fn probe_with(config: &VerifyConfig) -> Option<Self> {
        Self::from_config(config).verified()
    }

    fn verified(self) -> Option<Self> {
        match Command::new(&self.executable).arg("--version").output() {
            Ok(output) if output.status.success() => {
                debug!(
                    executable = %self.executable.display(),
                    language = ?self.language,
                    "tesseract found"
                );
                Some(self)
            }
            _ => None,
        }
    }
}

impl OcrBackend for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    fn recognize(&self, page: &RgbImage) -> Result<String> {
        let png = encode_png(&DynamicImage::ImageRgb8(page.clone()))?;

        let mut command = Command::new(&self.executable);
        command.args(["stdin", "stdout"]);
        if let Some(language) = &self.language {
            command.args(["-l", language.as_str()]);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| PruefwerkError::Backend(format!("failed to launch tesseract: {}", err)))?;

        // Tesseract reads the whole image before writing anything.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).map_err(|err| {
                PruefwerkError::OcrError(format!("failed to send page to tesseract: {}", err))
            })?;
        }

        let output = child.wait_with_output().map_err(|err| {
            PruefwerkError::OcrError(format!("tesseract did not finish: {}", err))
        })?;
        if !output.status.success() {
            return Err(PruefwerkError::OcrError(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(line_count = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}
