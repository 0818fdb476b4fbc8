//! Formats that cannot be previewed. The document is never fetched.

use crate::viewer::format::FormatKind;
use crate::viewer::locator::DocumentLocator;
use crate::viewer::strategy::{DocumentHandle, RenderStrategy, StrategyFault, ensure_unit};
use crate::viewer::surface::RenderedSurface;

pub struct UnsupportedStrategy {
    kind: FormatKind,
}

impl UnsupportedStrategy {
    #[must_use]
    pub fn new(kind: FormatKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn notice(&self) -> String {
        format!(
            "<div style='padding: 20px; text-align: center;'>\
             <p>{name} files are best viewed in their native format.</p>\
             <p>Please download the file to view it properly in a compatible application.</p>\
             </div>",
            name = self.kind.name()
        )
    }
}

impl RenderStrategy for UnsupportedStrategy {
    fn kind(&self) -> FormatKind {
        self.kind
    }

    fn open(&self, _locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault> {
        Ok(DocumentHandle::Notice)
    }

    fn unit_count(&self, _handle: &DocumentHandle) -> usize {
        1
    }

    fn render_unit(
        &self,
        _handle: &mut DocumentHandle,
        unit: usize,
    ) -> Result<RenderedSurface, StrategyFault> {
        ensure_unit(unit, 1)?;
        Ok(RenderedSurface::Markup(self.notice()))
    }
}
