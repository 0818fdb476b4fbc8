//! Rendered surfaces and the display targets they are painted into

/// RGB pixels produced by rasterizing one PDF page
#[derive(Clone, PartialEq, Eq)]
pub struct RasterFrame {
    /// Raw RGB pixel data (3 bytes per pixel)
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterFrame {
    pub const BYTES_PER_PIXEL: usize = 3;

    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// White frame of the given size
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        Self::new(width, height, vec![0xFF; len])
    }

    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::BYTES_PER_PIXEL
    }

    /// RGB triple at `(x, y)`, `None` outside the frame
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        let px = self.pixels.get(offset..offset + Self::BYTES_PER_PIXEL)?;
        Some((px[0], px[1], px[2]))
    }
}

impl std::fmt::Debug for RasterFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Output of a strategy's `render_unit`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedSurface {
    Raster(RasterFrame),
    Markup(String),
}

impl RenderedSurface {
    #[must_use]
    pub fn as_markup(&self) -> Option<&str> {
        match self {
            Self::Markup(html) => Some(html),
            Self::Raster(_) => None,
        }
    }

    #[must_use]
    pub fn as_raster(&self) -> Option<&RasterFrame> {
        match self {
            Self::Raster(frame) => Some(frame),
            Self::Markup(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("raster buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("raster frame has zero area")]
    EmptyFrame,
}

/// Drawing surface for PDF pages.
///
/// Painting resizes the backing buffer to the frame's dimensions, so only one
/// frame may be painted at a time.
#[derive(Debug, Default)]
pub struct RasterTarget {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterTarget {
    pub fn paint(&mut self, frame: RasterFrame) -> Result<(), SurfaceError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(SurfaceError::EmptyFrame);
        }
        let expected = frame.expected_len();
        if frame.pixels.len() != expected {
            return Err(SurfaceError::BufferMismatch {
                width: frame.width,
                height: frame.height,
                expected,
                actual: frame.pixels.len(),
            });
        }

        self.width = frame.width;
        self.height = frame.height;
        self.pixels = frame.pixels;
        Ok(())
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Packed RGB rows of the last painted frame
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RasterFrame::BYTES_PER_PIXEL;
        let px = self.pixels.get(offset..offset + RasterFrame::BYTES_PER_PIXEL)?;
        Some((px[0], px[1], px[2]))
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels.clear();
    }
}

/// Scrollable markup container for EPUB, text and HTML units
#[derive(Debug, Default)]
pub struct MarkupContainer {
    html: String,
}

impl MarkupContainer {
    pub fn set_html(&mut self, html: String) {
        self.html = html;
    }

    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn clear(&mut self) {
        self.html.clear();
    }
}

/// Which of the two targets holds the visible unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSurface {
    Raster,
    Markup,
}

/// Display targets owned by one viewer controller
#[derive(Debug, Default)]
pub struct DisplaySurfaces {
    raster: RasterTarget,
    markup: MarkupContainer,
    active: Option<ActiveSurface>,
}

impl DisplaySurfaces {
    /// Show a freshly rendered unit. On error the previous unit stays visible.
    pub fn present(&mut self, surface: RenderedSurface) -> Result<(), SurfaceError> {
        match surface {
            RenderedSurface::Raster(frame) => {
                self.raster.paint(frame)?;
                self.active = Some(ActiveSurface::Raster);
            }
            RenderedSurface::Markup(html) => {
                self.markup.set_html(html);
                self.active = Some(ActiveSurface::Markup);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn raster(&self) -> &RasterTarget {
        &self.raster
    }

    #[must_use]
    pub fn markup(&self) -> &MarkupContainer {
        &self.markup
    }

    #[must_use]
    pub fn active(&self) -> Option<ActiveSurface> {
        self.active
    }

    pub fn clear(&mut self) {
        self.raster.clear();
        self.markup.clear();
        self.active = None;
    }
}
