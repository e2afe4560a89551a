// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image transformer — grayscale, edge map, colour inversion, and pixel
// difference against a reference. Every operation is a pure function of its
// inputs, so pages can be transformed concurrently.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use imageproc::gradients::sobel_gradients;
use pruefwerk_core::error::{PruefwerkError, Result};
use pruefwerk_core::{CancelFlag, CanonicalPage};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::pool::WorkerPool;

/// ITU-R BT.601 luma weights, in thousandths.
const LUMA_WEIGHTS: [u32; 3] = [299, 587, 114];

/// Resampling filter used when a reference is resized to the submitted page.
const DIFF_RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// The three visualisation outputs for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub grayscale: GrayImage,
    pub edges: GrayImage,
    pub inverted: RgbImage,
}

/// Single-output view, as offered by the viewer's mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Original,
    Grayscale,
    Edges,
    Inverted,
}

impl TransformMode {
    pub const ALL: [TransformMode; 4] = [
        TransformMode::Original,
        TransformMode::Grayscale,
        TransformMode::Edges,
        TransformMode::Inverted,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Grayscale => "grayscale",
            Self::Edges => "edges",
            Self::Inverted => "inverted",
        }
    }
}

/// Unthresholded statistics of a diff image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    /// Pixels where at least one channel differs.
    pub changed_pixels: u64,
    pub total_pixels: u64,
    /// Largest per-channel difference anywhere in the image.
    pub max_delta: u8,
}

impl DiffSummary {
    pub fn of(diff: &RgbImage) -> Self {
        let mut changed_pixels = 0u64;
        let mut max_delta = 0u8;
        for pixel in diff.pixels() {
            let peak = pixel.0.iter().copied().max().unwrap_or(0);
            if peak > 0 {
                changed_pixels += 1;
            }
            max_delta = max_delta.max(peak);
        }
        Self {
            changed_pixels,
            total_pixels: u64::from(diff.width()) * u64::from(diff.height()),
            max_delta,
        }
    }

    /// True when the two images matched exactly.
    pub fn is_identical(&self) -> bool {
        self.changed_pixels == 0
    }

    pub fn changed_fraction(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.changed_pixels as f64 / self.total_pixels as f64
        }
    }
}

/// Deterministic tamper-visualisation transforms.
pub struct ImageTransformer;

impl ImageTransformer {
    /// Compute grayscale, edge map, and inversion for one bitmap.
    #[instrument(skip_all, fields(width = bitmap.width(), height = bitmap.height()))]
    pub fn transform(bitmap: &RgbImage) -> TransformResult {
        let grayscale = Self::grayscale(bitmap);
        let edges = Self::edges(&grayscale);
        let inverted = Self::invert(bitmap);
        debug!("Transform complete");
        TransformResult {
            grayscale,
            edges,
            inverted,
        }
    }

    /// Per-pixel BT.601 luma, rounded, in integer arithmetic.
    pub fn grayscale(bitmap: &RgbImage) -> GrayImage {
        ImageBuffer::from_fn(bitmap.width(), bitmap.height(), |x, y| {
            let Rgb([r, g, b]) = *bitmap.get_pixel(x, y);
            let weighted = LUMA_WEIGHTS[0] * u32::from(r)
                + LUMA_WEIGHTS[1] * u32::from(g)
                + LUMA_WEIGHTS[2] * u32::from(b);
            Luma([((weighted + 500) / 1000) as u8])
        })
    }

    /// Sobel gradient magnitude, stretched so the strongest edge is 255.
    ///
    /// A flat image has no gradient and yields an all-zero map.
    pub fn edges(grayscale: &GrayImage) -> GrayImage {
        let gradients = sobel_gradients(grayscale);
        let max = gradients.pixels().map(|p| p.0[0]).max().unwrap_or(0);
        if max == 0 {
            return GrayImage::new(grayscale.width(), grayscale.height());
        }
        let max = u32::from(max);
        ImageBuffer::from_fn(grayscale.width(), grayscale.height(), |x, y| {
            let magnitude = u32::from(gradients.get_pixel(x, y).0[0]);
            Luma([((magnitude * 255 + max / 2) / max) as u8])
        })
    }

    /// `255 - value` on every channel of the colour bitmap.
    pub fn invert(bitmap: &RgbImage) -> RgbImage {
        let mut inverted = bitmap.clone();
        imageops::invert(&mut inverted);
        inverted
    }

    /// Absolute per-channel difference between `reference` and `submitted`.
    ///
    /// The reference is resized to the submitted page's dimensions, never the
    /// reverse, so the output always has the submitted page's size. All-zero
    /// regions are exact matches.
    #[instrument(skip_all, fields(
        reference = ?reference.dimensions(),
        submitted = ?submitted.dimensions(),
    ))]
    pub fn diff(reference: &RgbImage, submitted: &RgbImage) -> RgbImage {
        let (width, height) = submitted.dimensions();
        let resized;
        let reference = if reference.dimensions() == (width, height) {
            reference
        } else {
            debug!(width, height, "Resizing reference to submitted dimensions");
            resized = imageops::resize(reference, width, height, DIFF_RESIZE_FILTER);
            &resized
        };

        ImageBuffer::from_fn(width, height, |x, y| {
            let Rgb([r1, g1, b1]) = *reference.get_pixel(x, y);
            let Rgb([r2, g2, b2]) = *submitted.get_pixel(x, y);
            Rgb([r1.abs_diff(r2), g1.abs_diff(g2), b1.abs_diff(b2)])
        })
    }

    /// Produce a single view of the bitmap.
    pub fn render(bitmap: &RgbImage, mode: TransformMode) -> DynamicImage {
        match mode {
            TransformMode::Original => DynamicImage::ImageRgb8(bitmap.clone()),
            TransformMode::Grayscale => DynamicImage::ImageLuma8(Self::grayscale(bitmap)),
            TransformMode::Edges => {
                DynamicImage::ImageLuma8(Self::edges(&Self::grayscale(bitmap)))
            }
            TransformMode::Inverted => DynamicImage::ImageRgb8(Self::invert(bitmap)),
        }
    }

    /// Transform every page on the worker pool, preserving page order.
    ///
    /// `cancel` is checked before each page starts.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn transform_pages(
        pages: &[CanonicalPage],
        pool: &WorkerPool,
        cancel: &CancelFlag,
    ) -> Result<Vec<TransformResult>> {
        pool.install(|| {
            pages
                .par_iter()
                .map(|page| {
                    cancel.check()?;
                    Ok(Self::transform(page.bitmap()))
                })
                .collect()
        })
    }
}

/// Encode an image as PNG bytes for display.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| PruefwerkError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}
