//! Passthrough HTML strategy. Markup is shown verbatim and is not sanitized.

use std::sync::Arc;

use crate::viewer::fetch::DocumentFetcher;
use crate::viewer::format::FormatKind;
use crate::viewer::locator::DocumentLocator;
use crate::viewer::strategy::{DocumentHandle, RenderStrategy, StrategyFault, ensure_unit};
use crate::viewer::surface::RenderedSurface;

pub struct HtmlStrategy {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl HtmlStrategy {
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }
}

impl RenderStrategy for HtmlStrategy {
    fn kind(&self) -> FormatKind {
        FormatKind::Html
    }

    fn open(&self, locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault> {
        Ok(DocumentHandle::Eager(self.fetcher.fetch_text(locator)?))
    }

    fn unit_count(&self, _handle: &DocumentHandle) -> usize {
        1
    }

    fn render_unit(
        &self,
        handle: &mut DocumentHandle,
        unit: usize,
    ) -> Result<RenderedSurface, StrategyFault> {
        let DocumentHandle::Eager(markup) = handle else {
            return Err(StrategyFault::HandleMismatch {
                kind: FormatKind::Html,
            });
        };
        ensure_unit(unit, 1)?;
        Ok(RenderedSurface::Markup(markup.clone()))
    }
}
