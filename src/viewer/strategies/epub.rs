//! EPUB strategy: one unit per spine entry

use std::io::Cursor;
use std::sync::Arc;

use epub::doc::EpubDoc;
use log::{debug, info};

use crate::viewer::fetch::DocumentFetcher;
use crate::viewer::format::FormatKind;
use crate::viewer::locator::DocumentLocator;
use crate::viewer::strategy::{DocumentHandle, RenderStrategy, StrategyFault, ensure_unit};
use crate::viewer::surface::RenderedSurface;

/// Markup shown for chapters without content
pub const NO_CONTENT: &str = "<p>No content available</p>";

pub struct EpubStrategy {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl EpubStrategy {
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }
}

impl RenderStrategy for EpubStrategy {
    fn kind(&self) -> FormatKind {
        FormatKind::Epub
    }

    fn open(&self, locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault> {
        let bytes = self.fetcher.fetch(locator)?;
        let doc = EpubDoc::from_reader(Cursor::new(bytes)).map_err(StrategyFault::epub)?;

        info!(
            "Opened EPUB {} with {} spine entries",
            locator.display_name(),
            doc.spine.len()
        );
        if let Some(title) = doc.mdata("title") {
            debug!("EPUB title: {value}", value = title.value);
        }

        Ok(DocumentHandle::Epub(Box::new(doc)))
    }

    fn unit_count(&self, handle: &DocumentHandle) -> usize {
        match handle {
            DocumentHandle::Epub(doc) => doc.get_num_chapters().max(1),
            _ => 1,
        }
    }

    fn render_unit(
        &self,
        handle: &mut DocumentHandle,
        unit: usize,
    ) -> Result<RenderedSurface, StrategyFault> {
        let DocumentHandle::Epub(doc) = handle else {
            return Err(StrategyFault::HandleMismatch {
                kind: FormatKind::Epub,
            });
        };

        let chapters = doc.get_num_chapters();
        if chapters == 0 {
            ensure_unit(unit, 1)?;
            return Ok(RenderedSurface::Markup(NO_CONTENT.to_string()));
        }
        ensure_unit(unit, chapters)?;

        let spine_index = unit - 1;
        if !doc.set_current_chapter(spine_index) {
            return Err(StrategyFault::epub(format!(
                "spine entry {spine_index} cannot be selected"
            )));
        }

        let markup = match doc.get_current_str() {
            Some((content, _mime)) if !content.trim().is_empty() => content,
            _ => NO_CONTENT.to_string(),
        };
        Ok(RenderedSurface::Markup(markup))
    }
}
