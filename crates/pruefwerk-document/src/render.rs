// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterisation through poppler's `pdftoppm` executable.
//
// Rendering a page runs:
//   pdftoppm -r [dpi] -f [page] -l [page] -png -singlefile [pdf] [scratch]/page-[n]
// and decodes the resulting PNG. Output files land in the caller's scratch
// directory, which is removed when ingestion returns. Page counts of PDFs
// lopdf cannot parse come from `pdfinfo`, which repairs broken xref tables
// the same way `pdftoppm` does.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;
use pruefwerk_core::error::{PruefwerkError, Result};
use tracing::{debug, instrument};

use crate::backend::PageRenderer;

/// Renders PDF pages by invoking `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerRenderer {
    executable: PathBuf,
    pdfinfo: PathBuf,
}

impl PopplerRenderer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            pdfinfo: PathBuf::from("pdfinfo"),
        }
    }

    /// Use `pdfinfo` at `path` for page counts.
    pub fn with_pdfinfo(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfinfo = path.into();
        self
    }

    /// Return a renderer if `executable` can be launched.
    ///
    /// `pdftoppm -v` prints its version to stderr; some releases exit
    /// non-zero for it, so only a failure to spawn counts as absent.
    pub fn probe(executable: impl Into<PathBuf>) -> Option<Self> {
        let renderer = Self::new(executable);
        match Command::new(&renderer.executable).arg("-v").output() {
            Ok(_) => {
                debug!(executable = %renderer.executable.display(), "pdftoppm found");
                Some(renderer)
            }
            Err(err) => {
                debug!(
                    executable = %renderer.executable.display(),
                    %err,
                    "pdftoppm not available"
                );
                None
            }
        }
    }
}

impl PageRenderer for PopplerRenderer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    #[instrument(skip(self, pdf_path, scratch))]
    fn render_page(
        &self,
        pdf_path: &Path,
        page_index: usize,
        dpi: u32,
        scratch: &Path,
    ) -> Result<RgbImage> {
        let page_number = (page_index + 1).to_string();
        let prefix = scratch.join(format!("page-{page_number}"));

        let output = Command::new(&self.executable)
            .arg("-r")
            .arg(dpi.to_string())
            .args(["-f", page_number.as_str(), "-l", page_number.as_str()])
            .args(["-png", "-singlefile"])
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|err| {
                PruefwerkError::Backend(format!("failed to launch pdftoppm: {}", err))
            })?;

        if !output.status.success() {
            return Err(PruefwerkError::PdfError(format!(
                "pdftoppm failed on page {}: {}",
                page_number,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let png_path = prefix.with_extension("png");
        let image = image::open(&png_path).map_err(|err| {
            PruefwerkError::ImageError(format!(
                "failed to decode rendered page {}: {}",
                page_number, err
            ))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Page rasterised"
        );
        Ok(image.to_rgb8())
    }

    #[instrument(skip(self))]
    fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let output = Command::new(&self.pdfinfo)
            .arg(pdf_path)
            .output()
            .map_err(|err| PruefwerkError::Backend(format!("failed to launch pdfinfo: {}", err)))?;
        if !output.status.success() {
            return Err(PruefwerkError::PdfError(format!(
                "pdfinfo failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let pages = parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout))?;
        debug!(pages, "Page count read by pdfinfo");
        Ok(pages)
    }
}

/// Read the `Pages:` line of `pdfinfo` output.
fn parse_pdfinfo_pages(report: &str) -> Result<usize> {
    report
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| PruefwerkError::PdfError("pdfinfo reported no page count".to_string()))
}
