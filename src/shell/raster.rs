//! Half-block preview of a rasterized PDF page.
//!
//! Each terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀` and the lower one as the background.

use image::RgbImage;
use image::imageops::{self, FilterType};
use log::warn;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

use crate::viewer::RasterTarget;

const UPPER_HALF_BLOCK: &str = "▀";

pub struct RasterPreview<'a> {
    target: &'a RasterTarget,
}

impl<'a> RasterPreview<'a> {
    #[must_use]
    pub fn new(target: &'a RasterTarget) -> Self {
        Self { target }
    }

    /// Cells used to show the page inside `area`, keeping its aspect ratio
    #[must_use]
    pub fn fitted_area(&self, area: Rect) -> Rect {
        let (w, h) = (self.target.width(), self.target.height());
        if w == 0 || h == 0 || area.width == 0 || area.height == 0 {
            return Rect::new(area.x, area.y, 0, 0);
        }

        let avail_w = f64::from(area.width);
        let avail_h = f64::from(area.height) * 2.0;
        let scale = (avail_w / f64::from(w)).min(avail_h / f64::from(h));
        let cols = ((f64::from(w) * scale).floor() as u16).clamp(1, area.width);
        let rows = ((f64::from(h) * scale / 2.0).ceil() as u16).clamp(1, area.height);

        Rect::new(area.x + (area.width - cols) / 2, area.y, cols, rows)
    }

    /// The page scaled to two pixels per cell of `fitted`
    fn scaled(&self, fitted: Rect) -> Option<RgbImage> {
        let Some(page) = RgbImage::from_raw(
            self.target.width(),
            self.target.height(),
            self.target.pixels().to_vec(),
        ) else {
            warn!(
                "Raster target {}x{} has a short pixel buffer",
                self.target.width(),
                self.target.height()
            );
            return None;
        };
        Some(imageops::resize(
            &page,
            u32::from(fitted.width),
            u32::from(fitted.height) * 2,
            FilterType::Triangle,
        ))
    }
}

impl Widget for RasterPreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let fitted = self.fitted_area(area);
        if fitted.width == 0 || fitted.height == 0 {
            return;
        }
        let Some(scaled) = self.scaled(fitted) else {
            return;
        };

        for row in 0..fitted.height {
            for col in 0..fitted.width {
                let [tr, tg, tb] = scaled.get_pixel(u32::from(col), u32::from(row) * 2).0;
                let [br, bg, bb] = scaled.get_pixel(u32::from(col), u32::from(row) * 2 + 1).0;
                if let Some(cell) = buf.cell_mut((fitted.x + col, fitted.y + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK)
                        .set_fg(Color::Rgb(tr, tg, tb))
                        .set_bg(Color::Rgb(br, bg, bb));
                }
            }
        }
    }
}
