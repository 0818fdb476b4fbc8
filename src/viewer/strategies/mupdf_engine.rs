//! MuPDF-backed PDF engine

use std::io::Write;

use image::{Rgb, RgbImage, imageops};
use log::debug;
use mupdf::{Colorspace, Document, Matrix, Pixmap};
use tempfile::NamedTempFile;

use super::pdf::{PageSize, PdfDocument, PdfEngine, Viewport};
use crate::viewer::strategy::StrategyFault;
use crate::viewer::surface::RasterFrame;

#[derive(Debug, Default)]
pub struct MuPdfEngine;

impl MuPdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PdfEngine for MuPdfEngine {
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, StrategyFault> {
        // MuPDF opens by path; spool fetched bytes to a file that lives as
        // long as the document.
        let mut backing = NamedTempFile::new().map_err(StrategyFault::pdf)?;
        backing.write_all(&bytes).map_err(StrategyFault::pdf)?;
        backing.flush().map_err(StrategyFault::pdf)?;

        let doc = Document::open(backing.path().to_string_lossy().as_ref())
            .map_err(StrategyFault::pdf)?;
        let page_count = doc.page_count().map_err(StrategyFault::pdf)?.max(0) as usize;

        Ok(Box::new(MuPdfDocument {
            doc,
            page_count,
            _backing: backing,
        }))
    }
}

struct MuPdfDocument {
    doc: Document,
    page_count: usize,
    _backing: NamedTempFile,
}

impl PdfDocument for MuPdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: usize) -> Result<PageSize, StrategyFault> {
        let page = self
            .doc
            .load_page(page as i32)
            .map_err(StrategyFault::pdf)?;
        let bounds = page.bounds().map_err(StrategyFault::pdf)?;
        Ok(PageSize {
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
        })
    }

    fn render_page(&self, page: usize, viewport: &Viewport) -> Result<RasterFrame, StrategyFault> {
        let page = self
            .doc
            .load_page(page as i32)
            .map_err(StrategyFault::pdf)?;

        let transform = Matrix::new_scale(viewport.scale, viewport.scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = page
            .to_pixmap(&transform, &rgb, false, false)
            .map_err(StrategyFault::pdf)?;

        let pixels = pixmap_to_rgb(&pixmap)?;
        fit_to_viewport(
            pixels,
            pixmap.width() as u32,
            pixmap.height() as u32,
            viewport,
        )
    }
}

/// MuPDF rounds the transformed page bounds outwards, so the pixmap can be a
/// pixel larger or smaller than the viewport. Crop or pad with white.
fn fit_to_viewport(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    viewport: &Viewport,
) -> Result<RasterFrame, StrategyFault> {
    let (target_w, target_h) = (viewport.width_px.max(1), viewport.height_px.max(1));
    if (width, height) == (target_w, target_h) {
        return Ok(RasterFrame::new(width, height, pixels));
    }

    debug!("Fitting {width}x{height} pixmap to {target_w}x{target_h} viewport");
    let rendered = RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| StrategyFault::pdf("Pixmap buffer size mismatch"))?;
    let mut canvas = RgbImage::from_pixel(target_w, target_h, Rgb([255, 255, 255]));
    imageops::replace(&mut canvas, &rendered, 0, 0);
    Ok(RasterFrame::new(target_w, target_h, canvas.into_raw()))
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, StrategyFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(StrategyFault::pdf(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(StrategyFault::pdf("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * RasterFrame::BYTES_PER_PIXEL);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
