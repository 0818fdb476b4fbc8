//! Flat text strategy: the whole document is one unit

use std::sync::Arc;

use crate::viewer::fetch::DocumentFetcher;
use crate::viewer::format::FormatKind;
use crate::viewer::locator::DocumentLocator;
use crate::viewer::strategy::{DocumentHandle, RenderStrategy, StrategyFault, ensure_unit};
use crate::viewer::surface::RenderedSurface;

const PRE_OPEN: &str =
    r#"<pre style="white-space: pre-wrap; word-wrap: break-word; font-family: monospace;">"#;
const PRE_CLOSE: &str = "</pre>";

/// Escape the five HTML-significant characters
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Used for `txt` and, under [`FormatKind::PlainText`], for every
/// unregistered format.
pub struct TextStrategy {
    kind: FormatKind,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl TextStrategy {
    #[must_use]
    pub fn new(kind: FormatKind, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { kind, fetcher }
    }
}

impl RenderStrategy for TextStrategy {
    fn kind(&self) -> FormatKind {
        self.kind
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
        let DocumentHandle::Eager(text) = handle else {
            return Err(StrategyFault::HandleMismatch { kind: self.kind });
        };
        ensure_unit(unit, 1)?;

        Ok(RenderedSurface::Markup(format!(
            "{PRE_OPEN}{}{PRE_CLOSE}",
            escape_html(text)
        )))
    }
}
