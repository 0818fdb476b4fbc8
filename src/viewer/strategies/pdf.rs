//! PDF strategy: one unit per page, rasterized at a fixed magnification

use std::sync::Arc;

use log::debug;

use crate::viewer::engine;
use crate::viewer::fetch::DocumentFetcher;
use crate::viewer::format::FormatKind;
use crate::viewer::locator::DocumentLocator;
use crate::viewer::strategy::{DocumentHandle, RenderStrategy, StrategyFault, ensure_unit};
use crate::viewer::surface::{RasterFrame, RenderedSurface};

/// Page size in PDF points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Display viewport for one page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub width_px: u32,
    pub height_px: u32,
}

impl Viewport {
    /// Scale a page into pixels; fractional pixels are dropped and each side
    /// is at least one pixel.
    #[must_use]
    pub fn for_page(size: PageSize, scale: f32) -> Self {
        Self {
            scale,
            width_px: ((size.width * scale) as u32).max(1),
            height_px: ((size.height * scale) as u32).max(1),
        }
    }
}

/// Capability to open PDF bytes
pub trait PdfEngine: Send + Sync {
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, StrategyFault>;
}

/// Open PDF document. Pages are 0-indexed here, as in the underlying engines.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    fn page_size(&self, page: usize) -> Result<PageSize, StrategyFault>;

    fn render_page(&self, page: usize, viewport: &Viewport) -> Result<RasterFrame, StrategyFault>;
}

/// Stand-in used when the crate is built without the `pdf` feature
#[derive(Debug, Default)]
pub struct UnavailablePdfEngine;

impl PdfEngine for UnavailablePdfEngine {
    fn open_document(&self, _bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, StrategyFault> {
        Err(StrategyFault::Unsupported(
            "PDF support is not compiled into this build".to_string(),
        ))
    }
}

pub struct PdfStrategy {
    fetcher: Arc<dyn DocumentFetcher>,
    engine: Arc<dyn PdfEngine>,
    scale: Option<f32>,
}

impl PdfStrategy {
    /// Strategy rendering at the process-wide configured scale
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            fetcher,
            engine,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    fn scale(&self) -> f32 {
        self.scale.unwrap_or_else(|| engine::config().pdf_scale)
    }
}

impl RenderStrategy for PdfStrategy {
    fn kind(&self) -> FormatKind {
        FormatKind::Pdf
    }

    fn open(&self, locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault> {
        let bytes = self.fetcher.fetch(locator)?;
        let doc = self.engine.open_document(bytes)?;
        if doc.page_count() == 0 {
            return Err(StrategyFault::pdf("document has no pages"));
        }
        debug!(
            "Opened PDF {} with {} pages",
            locator.display_name(),
            doc.page_count()
        );
        Ok(DocumentHandle::Pdf(doc))
    }

    fn unit_count(&self, handle: &DocumentHandle) -> usize {
        match handle {
            DocumentHandle::Pdf(doc) => doc.page_count().max(1),
            _ => 1,
        }
    }

    fn render_unit(
        &self,
        handle: &mut DocumentHandle,
        unit: usize,
    ) -> Result<RenderedSurface, StrategyFault> {
        let DocumentHandle::Pdf(doc) = handle else {
            return Err(StrategyFault::HandleMismatch {
                kind: FormatKind::Pdf,
            });
        };
        ensure_unit(unit, doc.page_count())?;

        let page = unit - 1;
        let viewport = Viewport::for_page(doc.page_size(page)?, self.scale());
        let frame = doc.render_page(page, &viewport)?;
        Ok(RenderedSurface::Raster(frame))
    }
}
