//! Format registry: declared format tag to render strategy

use std::collections::HashMap;
use std::sync::Arc;

use super::fetch::{DefaultFetcher, DocumentFetcher};
use super::strategies::{
    EpubStrategy, HtmlStrategy, PdfEngine, PdfStrategy, TextStrategy, UnsupportedStrategy,
    default_pdf_engine,
};
use super::strategy::RenderStrategy;

/// Shown next to load errors
pub const SUPPORTED_FORMATS: &str = "PDF, EPUB, TXT, DOCX, HTML";

/// Closed set of formats the viewer knows how to display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Pdf,
    Epub,
    Txt,
    Docx,
    Html,
    /// Fallback for every unregistered tag
    PlainText,
}

impl FormatKind {
    /// Normalize a declared tag (`".PDF"`, `" epub "`) and map it to a kind.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        let tag = tag.strip_prefix('.').unwrap_or(tag).to_lowercase();
        match tag.as_str() {
            "pdf" => Self::Pdf,
            "epub" => Self::Epub,
            "txt" => Self::Txt,
            "docx" => Self::Docx,
            "html" | "htm" => Self::Html,
            _ => Self::PlainText,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Epub => "EPUB",
            Self::Txt => "TXT",
            Self::Docx => "DOCX",
            Self::Html => "HTML",
            Self::PlainText => "Plain text",
        }
    }

    /// What one navigable unit is called in the indicator
    #[must_use]
    pub fn unit_label(self) -> &'static str {
        match self {
            Self::Epub => "Chapter",
            _ => "Page",
        }
    }

    #[must_use]
    pub fn all() -> &'static [FormatKind] {
        &[
            Self::Pdf,
            Self::Epub,
            Self::Txt,
            Self::Docx,
            Self::Html,
            Self::PlainText,
        ]
    }
}

/// Strategy table keyed by [`FormatKind`].
///
/// Lookup never fails: a kind without an entry resolves to the plain-text
/// strategy.
pub struct FormatRegistry {
    strategies: HashMap<FormatKind, Arc<dyn RenderStrategy>>,
    fallback: Arc<dyn RenderStrategy>,
}

impl FormatRegistry {
    /// Registry wired to the given fetch and PDF capabilities
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, pdf_engine: Arc<dyn PdfEngine>) -> Self {
        let text: Arc<dyn RenderStrategy> =
            Arc::new(TextStrategy::new(FormatKind::PlainText, fetcher.clone()));

        let mut registry = Self {
            strategies: HashMap::new(),
            fallback: text.clone(),
        };
        registry.register(Arc::new(PdfStrategy::new(fetcher.clone(), pdf_engine)));
        registry.register(Arc::new(EpubStrategy::new(fetcher.clone())));
        registry.register(Arc::new(TextStrategy::new(FormatKind::Txt, fetcher.clone())));
        registry.register(Arc::new(UnsupportedStrategy::new(FormatKind::Docx)));
        registry.register(Arc::new(HtmlStrategy::new(fetcher)));
        registry.register(text);
        registry
    }

    /// Registry using local/remote fetching and the compiled-in PDF engine
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(DefaultFetcher::new()), default_pdf_engine())
    }

    /// Add or replace the strategy for its kind
    pub fn register(&mut self, strategy: Arc<dyn RenderStrategy>) {
        if strategy.kind() == FormatKind::PlainText {
            self.fallback = strategy.clone();
        }
        self.strategies.insert(strategy.kind(), strategy);
    }

    /// Resolve a declared format tag
    #[must_use]
    pub fn resolve(&self, tag: &str) -> Arc<dyn RenderStrategy> {
        self.strategy_for(FormatKind::from_tag(tag))
    }

    #[must_use]
    pub fn strategy_for(&self, kind: FormatKind) -> Arc<dyn RenderStrategy> {
        self.strategies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
