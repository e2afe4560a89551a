// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability registry — probes the optional backends once and hands out both
// the availability flags and the backends themselves, so the two can never
// disagree.

use std::sync::{Arc, OnceLock};

use pruefwerk_core::{CapabilitySet, VerifyConfig};
use tracing::{info, instrument};

use crate::backend::{OcrBackend, PageRenderer};
use crate::ocr::TesseractOcr;
use crate::render::PopplerRenderer;

static GLOBAL: OnceLock<CapabilityRegistry> = OnceLock::new();

/// The set of optional backends available to the pipeline.
#[derive(Clone)]
pub struct CapabilityRegistry {
    renderer: Option<Arc<dyn PageRenderer>>,
    ocr: Option<Arc<dyn OcrBackend>>,
    text_layer: bool,
}

impl CapabilityRegistry {
    /// Process-wide registry, probed with default settings on first use.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::detect)
    }

    /// Process-wide registry, probed with `config` if this is the first call.
    ///
    /// Later calls return the registry from the first call unchanged.
    pub fn global_with(config: &VerifyConfig) -> &'static Self {
        GLOBAL.get_or_init(|| Self::detect_with(config))
    }

    /// Probe every backend with default settings.
    pub fn detect() -> Self {
        Self::detect_with(&VerifyConfig::default())
    }

    /// Probe every backend. Never fails: a missing backend only clears its
    /// flag.
    #[instrument(skip_all)]
    pub fn detect_with(config: &VerifyConfig) -> Self {
        let renderer = if config.disable_pdf_render {
            None
        } else {
            PopplerRenderer::probe(&config.pdftoppm_path)
                .map(|r| Arc::new(r.with_pdfinfo(&config.pdfinfo_path)) as Arc<dyn PageRenderer>)
        };

        let ocr = if config.disable_ocr {
            None
        } else {
            probe_ocr(config)
        };

        let registry = Self {
            renderer,
            ocr,
            text_layer: !config.disable_text_layer,
        };
        let caps = registry.capabilities();
        info!(
            ocr = caps.ocr_available,
            ocr_backend = registry.ocr.as_ref().map(|o| o.name()),
            pdf_render = caps.pdf_render_available,
            pdf_text_layer = caps.pdf_text_layer_available,
            "Capabilities detected"
        );
        registry
    }

    /// A registry with no optional backend at all.
    pub fn none() -> Self {
        Self {
            renderer: None,
            ocr: None,
            text_layer: false,
        }
    }

    /// Start from an empty registry and inject backends explicitly.
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder {
            registry: Self::none(),
        }
    }

    /// Availability flags derived from the backends present.
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            ocr_available: self.ocr.is_some(),
            pdf_render_available: self.renderer.is_some(),
            pdf_text_layer_available: self.text_layer,
        }
    }

    pub fn renderer(&self) -> Option<&dyn PageRenderer> {
        self.renderer.as_deref()
    }

    pub fn ocr(&self) -> Option<&dyn OcrBackend> {
        self.ocr.as_deref()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("renderer", &self.renderer.as_ref().map(|r| r.name().to_owned()))
            .field("ocr", &self.ocr.as_ref().map(|o| o.name().to_owned()))
            .field("text_layer", &self.text_layer)
            .finish()
    }
}

#[cfg(feature = "ocr")]
fn probe_ocr(config: &VerifyConfig) -> Option<Arc<dyn OcrBackend>> {
    use crate::ocr::engine::{OcrConfig, OcrEngine};

    let ocr_config = match &config.ocr_model_dir {
        Some(dir) => OcrConfig::from_dir(dir),
        None => OcrConfig::default(),
    };
    if let Some(engine) = OcrEngine::probe(&ocr_config) {
        return Some(Arc::new(engine));
    }
    TesseractOcr::probe_with(config).map(|t| Arc::new(t) as Arc<dyn OcrBackend>)
}

#[cfg(not(feature = "ocr"))]
fn probe_ocr(config: &VerifyConfig) -> Option<Arc<dyn OcrBackend>> {
    TesseractOcr::probe_with(config).map(|t| Arc::new(t) as Arc<dyn OcrBackend>)
}

/// Builder for registries with injected backends.
pub struct CapabilityRegistryBuilder {
    registry: CapabilityRegistry,
}

impl CapabilityRegistryBuilder {
    pub fn renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.registry.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn ocr(mut self, ocr: impl OcrBackend + 'static) -> Self {
        self.registry.ocr = Some(Arc::new(ocr));
        self
    }

    pub fn text_layer(mut self, enabled: bool) -> Self {
        self.registry.text_layer = enabled;
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        self.registry
    }
}
