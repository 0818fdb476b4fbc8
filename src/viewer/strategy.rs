//! Render strategy contract shared by every format

use std::io::Cursor;

use epub::doc::EpubDoc;

use super::fetch::FetchError;
use super::format::FormatKind;
use super::locator::DocumentLocator;
use super::strategies::PdfDocument;
use super::surface::RenderedSurface;

/// Errors raised while opening or rendering a document
#[derive(Debug, thiserror::Error)]
pub enum StrategyFault {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("PDF engine: {0}")]
    Pdf(String),

    #[error("EPUB container: {0}")]
    Epub(String),

    #[error("unit {unit} is outside 1..={total}")]
    UnitOutOfRange { unit: usize, total: usize },

    #[error("{kind:?} strategy was handed a handle it did not open")]
    HandleMismatch { kind: FormatKind },

    #[error("{0}")]
    Unsupported(String),

    #[error("document worker: {0}")]
    Worker(String),
}

impl StrategyFault {
    pub fn pdf(err: impl std::fmt::Display) -> Self {
        Self::Pdf(err.to_string())
    }

    pub fn epub(err: impl std::fmt::Display) -> Self {
        Self::Epub(err.to_string())
    }
}

/// Open document resource, specific to the strategy that created it
pub enum DocumentHandle {
    Pdf(Box<dyn PdfDocument>),
    Epub(Box<EpubDoc<Cursor<Vec<u8>>>>),
    /// Content fetched once at open time and shown as a single unit
    Eager(String),
    /// Nothing was opened; the unit is a static notice
    Notice,
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf(doc) => write!(f, "DocumentHandle::Pdf({} pages)", doc.page_count()),
            Self::Epub(doc) => write!(f, "DocumentHandle::Epub({} chapters)", doc.spine.len()),
            Self::Eager(content) => write!(f, "DocumentHandle::Eager({} bytes)", content.len()),
            Self::Notice => write!(f, "DocumentHandle::Notice"),
        }
    }
}

/// Per-format open / count / render operations.
///
/// Units are 1-indexed. Strategies hold no per-document state; everything
/// document-specific lives in the [`DocumentHandle`].
pub trait RenderStrategy: Send + Sync {
    fn kind(&self) -> FormatKind;

    fn open(&self, locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault>;

    /// Number of navigable units, never less than 1
    fn unit_count(&self, handle: &DocumentHandle) -> usize;

    fn render_unit(
        &self,
        handle: &mut DocumentHandle,
        unit: usize,
    ) -> Result<RenderedSurface, StrategyFault>;
}

/// Reject units outside `1..=total`
pub(crate) fn ensure_unit(unit: usize, total: usize) -> Result<(), StrategyFault> {
    if unit == 0 || unit > total {
        return Err(StrategyFault::UnitOutOfRange { unit, total });
    }
    Ok(())
}
