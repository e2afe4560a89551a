// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pruefwerk verification pipeline.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Placeholder text returned when no extraction backend exists.
///
/// Never empty, so callers can tell "no text on the page" apart from
/// "text could not be extracted at all".
pub const UNAVAILABLE_TEXT_PLACEHOLDER: &str =
    "[text extraction unavailable: no OCR engine or PDF text layer detected]";

/// Declared kind of a submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Infer the kind from a MIME type such as `application/pdf` or `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "application/pdf" {
            Some(Self::Pdf)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Infer the kind from a file extension (the upload filter accepts
    /// `pdf`, `png`, `jpg`, and `jpeg`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Guess the kind from the leading bytes of the content.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if pdf_header_offset(data).is_some() {
            return Some(Self::Pdf);
        }
        image::guess_format(data).ok().map(|_| Self::Image)
    }

    /// MIME type string for display.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Image => "image/*",
        }
    }
}

/// PDF header every document carries near its start.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// How far into the file the PDF header may appear. Readers tolerate junk
/// (a BOM, a mail header) before it.
pub const PDF_HEADER_WINDOW: usize = 1024;

/// Offset of the `%PDF-` header within the first [`PDF_HEADER_WINDOW`] bytes.
pub fn pdf_header_offset(data: &[u8]) -> Option<usize> {
    let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .position(|candidate| candidate == PDF_SIGNATURE)
}

/// Where a canonical page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSource {
    /// Rasterised from a PDF page.
    RenderedFromPdf,
    /// Decoded directly from an uploaded image.
    NativeImage,
}

/// One document page normalised to an RGB bitmap.
///
/// Immutable once built: the bitmap is only reachable through a shared
/// reference, so its dimensions cannot change after ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPage {
    index: usize,
    bitmap: RgbImage,
    source: PageSource,
}

impl CanonicalPage {
    pub fn new(index: usize, bitmap: RgbImage, source: PageSource) -> Self {
        Self {
            index,
            bitmap,
            source,
        }
    }

    /// Zero-based position of the page in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bitmap(&self) -> &RgbImage {
        &self.bitmap
    }

    pub fn source(&self) -> PageSource {
        self.source
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// An optional backend whose presence is detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Ocr,
    PdfRender,
    PdfTextLayer,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ocr => "OCR",
            Self::PdfRender => "PDF rendering",
            Self::PdfTextLayer => "PDF text layer extraction",
        };
        f.write_str(name)
    }
}

/// Availability flags for every optional backend.
///
/// Computed once per process and only ever read afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub ocr_available: bool,
    pub pdf_render_available: bool,
    pub pdf_text_layer_available: bool,
}

impl CapabilitySet {
    pub fn is_available(&self, capability: Capability) -> bool {
        match capability {
            Capability::Ocr => self.ocr_available,
            Capability::PdfRender => self.pdf_render_available,
            Capability::PdfTextLayer => self.pdf_text_layer_available,
        }
    }

    /// Capabilities that are missing, in a stable order (for UI warnings).
    pub fn missing(&self) -> Vec<Capability> {
        [Capability::Ocr, Capability::PdfRender, Capability::PdfTextLayer]
            .into_iter()
            .filter(|cap| !self.is_available(*cap))
            .collect()
    }
}

/// Outcome of extracting text from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Unavailable,
    Error(String),
}

/// Which backend produced an [`ExtractedText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    TextLayer,
    Ocr,
    None,
}

/// Raw text extracted from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub page_index: usize,
    pub raw_text: String,
    pub status: ExtractionStatus,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    pub fn ok(page_index: usize, raw_text: String, method: ExtractionMethod) -> Self {
        Self {
            page_index,
            raw_text,
            status: ExtractionStatus::Ok,
            method,
        }
    }

    pub fn unavailable(page_index: usize) -> Self {
        Self {
            page_index,
            raw_text: UNAVAILABLE_TEXT_PLACEHOLDER.to_string(),
            status: ExtractionStatus::Unavailable,
            method: ExtractionMethod::None,
        }
    }

    pub fn error(page_index: usize, message: impl Into<String>, method: ExtractionMethod) -> Self {
        Self {
            page_index,
            raw_text: String::new(),
            status: ExtractionStatus::Error(message.into()),
            method,
        }
    }

    /// True when extraction succeeded and produced non-blank text.
    pub fn is_usable(&self) -> bool {
        self.status == ExtractionStatus::Ok && !self.raw_text.trim().is_empty()
    }
}

/// Direction of a token-level edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTag {
    Added,
    Removed,
}

/// A single inserted or deleted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenChange {
    pub tag: ChangeTag,
    pub token: String,
}

impl TokenChange {
    pub fn added(token: impl Into<String>) -> Self {
        Self {
            tag: ChangeTag::Added,
            token: token.into(),
        }
    }

    pub fn removed(token: impl Into<String>) -> Self {
        Self {
            tag: ChangeTag::Removed,
            token: token.into(),
        }
    }
}

impl std::fmt::Display for TokenChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tag {
            ChangeTag::Added => write!(f, "+ {}", self.token),
            ChangeTag::Removed => write!(f, "- {}", self.token),
        }
    }
}

/// Text comparison between a reference and the extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Normalised similarity in `[0, 1]`.
    pub ratio: f64,
    pub added_tokens: Vec<String>,
    pub removed_tokens: Vec<String>,
    /// The full edit script in order.
    pub changes: Vec<TokenChange>,
}

/// Final classification of a submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Original,
    Fake,
    Inconclusive,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Original => "ORIGINAL",
            Self::Fake => "FAKE",
            Self::Inconclusive => "INCONCLUSIVE",
        };
        f.write_str(label)
    }
}

/// The verdict produced at the end of a verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    /// Absent when no reference text was supplied.
    pub similarity: Option<SimilarityReport>,
    /// Absent when no reference image was supplied.
    pub diff_image: Option<RgbImage>,
}
