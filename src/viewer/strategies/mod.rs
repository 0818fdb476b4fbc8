//! Format-specific render strategies

mod epub;
mod html;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod pdf;
mod text;
mod unsupported;

pub use epub::{EpubStrategy, NO_CONTENT};
pub use html::HtmlStrategy;
#[cfg(feature = "pdf")]
pub use mupdf_engine::MuPdfEngine;
pub use pdf::{PageSize, PdfDocument, PdfEngine, PdfStrategy, UnavailablePdfEngine, Viewport};
pub use text::{TextStrategy, escape_html};
pub use unsupported::UnsupportedStrategy;

use std::sync::Arc;

/// PDF engine compiled into this build
#[must_use]
pub fn default_pdf_engine() -> Arc<dyn PdfEngine> {
    #[cfg(feature = "pdf")]
    {
        Arc::new(MuPdfEngine::new())
    }
    #[cfg(not(feature = "pdf"))]
    {
        Arc::new(UnavailablePdfEngine)
    }
}
