//! Viewer controller
//!
//! Owns the navigation state, the display surfaces and the page-change
//! callback. It never does document work itself: operations return
//! [`Effect`]s for the service to execute, and worker results come back
//! through [`ViewerController::apply`].

use log::{debug, error, info, warn};

use super::format::FormatKind;
use super::locator::DocumentLocator;
use super::request::{Generation, RequestId, Ticket, ViewerResponse};
use super::surface::{DisplaySurfaces, RenderedSurface};
use crate::theme::ColorTheme;

pub const DEFAULT_FONT_SIZE: u16 = 16;
pub const MIN_FONT_SIZE: u16 = 12;
pub const MAX_FONT_SIZE: u16 = 24;

/// Invoked with `(current_unit, total_units)` after every successful render
pub type PageChangeCallback = Box<dyn FnMut(usize, usize)>;

/// Host-supplied presentation and start parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerOptions {
    pub font_size: u16,
    pub theme: ColorTheme,
    /// 1-indexed unit to open at; clamped to the document's range
    pub start_unit: Option<usize>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            theme: ColorTheme::default(),
            start_unit: None,
        }
    }
}

impl ViewerOptions {
    #[must_use]
    pub fn with_font_size(mut self, font_size: u16) -> Self {
        self.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: ColorTheme) -> Self {
        self.theme = theme;
        self
    }

    #[must_use]
    pub fn with_start_unit(mut self, unit: Option<usize>) -> Self {
        self.start_unit = unit;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Navigation state. `1 <= current_unit <= total_units` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerState {
    pub current_unit: usize,
    pub total_units: usize,
    pub phase: Phase,
    /// User-facing load error
    pub error: Option<String>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current_unit: 1,
            total_units: 1,
            phase: Phase::Idle,
            error: None,
        }
    }
}

impl ViewerState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }
}

/// Work the service must carry out on behalf of the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Start a worker that opens the document and renders `start_unit`
    Open {
        ticket: Ticket,
        locator: DocumentLocator,
        kind: FormatKind,
        start_unit: usize,
    },
    /// Ask the current worker to render a unit
    Render { ticket: Ticket, unit: usize },
    /// Drop the current worker and its document handle
    Release,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Open(RequestId),
    Render { id: RequestId, unit: usize },
}

pub struct ViewerController {
    state: ViewerState,
    options: ViewerOptions,
    locator: Option<DocumentLocator>,
    kind: FormatKind,
    generation: Generation,
    next_request_id: u64,
    pending: Option<Pending>,
    surfaces: DisplaySurfaces,
    on_page_change: Option<PageChangeCallback>,
    discarded: u64,
}

impl ViewerController {
    #[must_use]
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            state: ViewerState::default(),
            options,
            locator: None,
            kind: FormatKind::PlainText,
            generation: Generation::default(),
            next_request_id: 1,
            pending: None,
            surfaces: DisplaySurfaces::default(),
            on_page_change: None,
            discarded: 0,
        }
    }

    pub fn set_on_page_change(&mut self, callback: impl FnMut(usize, usize) + 'static) {
        self.on_page_change = Some(Box::new(callback));
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Presentation only; the current unit is not re-rendered
    pub fn set_theme(&mut self, theme: ColorTheme) {
        self.options.theme = theme;
    }

    /// Presentation only, clamped to the supported range
    pub fn set_font_size(&mut self, font_size: u16) {
        self.options.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }

    /// Unit the next load opens at
    pub fn set_start_unit(&mut self, unit: Option<usize>) {
        self.options.start_unit = unit;
    }

    #[must_use]
    pub fn locator(&self) -> Option<&DocumentLocator> {
        self.locator.as_ref()
    }

    /// Format of the loaded document
    #[must_use]
    pub fn format(&self) -> FormatKind {
        self.kind
    }

    #[must_use]
    pub fn surfaces(&self) -> &DisplaySurfaces {
        &self.surfaces
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// A load or render is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Responses dropped because they belonged to a superseded load or were
    /// not the pending request
    #[must_use]
    pub fn discarded_responses(&self) -> u64 {
        self.discarded
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.is_navigable() && self.state.current_unit < self.state.total_units
    }

    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.is_navigable() && self.state.current_unit > 1
    }

    /// Status line text, e.g. `Page 3 of 12` or `Chapter 2 of 9`
    #[must_use]
    pub fn indicator(&self) -> String {
        match self.state.phase {
            Phase::Idle => String::new(),
            Phase::Loading => format!("Loading {} file...", self.format_label()),
            Phase::Ready => format!(
                "{} {} of {}",
                self.kind.unit_label(),
                self.state.current_unit,
                self.state.total_units
            ),
            Phase::Error => self.state.error.clone().unwrap_or_default(),
        }
    }

    /// Start loading a new document, superseding whatever was loaded or
    /// loading before.
    #[must_use]
    pub fn load(&mut self, locator: DocumentLocator) -> Vec<Effect> {
        self.generation = self.generation.next();
        self.kind = locator.format();
        self.surfaces.clear();
        self.state = ViewerState {
            phase: Phase::Loading,
            ..ViewerState::default()
        };

        let ticket = self.next_ticket();
        self.pending = Some(Pending::Open(ticket.id));
        let start_unit = self.options.start_unit.unwrap_or(1).max(1);

        info!(
            "Loading {} as {} (generation {})",
            locator.display_name(),
            self.kind.name(),
            self.generation.0
        );
        self.locator = Some(locator.clone());

        vec![Effect::Open {
            ticket,
            locator,
            kind: self.kind,
            start_unit,
        }]
    }

    /// Tear down the current document. Late responses are discarded.
    #[must_use]
    pub fn unload(&mut self) -> Vec<Effect> {
        self.generation = self.generation.next();
        self.pending = None;
        self.locator = None;
        self.surfaces.clear();
        self.state = ViewerState::default();
        vec![Effect::Release]
    }

    #[must_use]
    pub fn next(&mut self) -> Vec<Effect> {
        if !self.can_go_next() {
            return vec![];
        }
        self.request_unit(self.state.current_unit + 1)
    }

    #[must_use]
    pub fn previous(&mut self) -> Vec<Effect> {
        if !self.can_go_previous() {
            return vec![];
        }
        self.request_unit(self.state.current_unit - 1)
    }

    /// Navigate to an arbitrary unit. Out-of-range targets are ignored.
    #[must_use]
    pub fn jump_to(&mut self, unit: usize) -> Vec<Effect> {
        if !self.is_navigable()
            || unit == 0
            || unit > self.state.total_units
            || unit == self.state.current_unit
        {
            return vec![];
        }
        self.request_unit(unit)
    }

    /// Feed a worker response back in. Returns `false` when the response was
    /// stale and dropped.
    pub fn apply(&mut self, response: ViewerResponse) -> bool {
        let ticket = response.ticket();
        if ticket.generation != self.generation {
            self.discard(ticket, "superseded generation");
            return false;
        }

        match response {
            ViewerResponse::Opened {
                ticket,
                total_units,
                start_unit,
                surface,
            } => {
                if self.pending != Some(Pending::Open(ticket.id)) {
                    self.discard(ticket, "not the pending load");
                    return false;
                }
                self.pending = None;
                self.finish_load(total_units, start_unit, surface);
            }

            ViewerResponse::OpenFailed { ticket, fault } => {
                if self.pending != Some(Pending::Open(ticket.id)) {
                    self.discard(ticket, "not the pending load");
                    return false;
                }
                self.pending = None;
                self.fail_load(&fault.to_string());
            }

            ViewerResponse::Rendered {
                ticket,
                unit,
                surface,
            } => {
                if self.pending != Some(Pending::Render { id: ticket.id, unit }) {
                    self.discard(ticket, "not the pending render");
                    return false;
                }
                self.pending = None;
                match self.surfaces.present(surface) {
                    Ok(()) => {
                        self.state.current_unit = unit;
                        self.notify_page_change();
                    }
                    Err(e) => {
                        warn!("Failed to display {} {unit}: {e}", self.kind.unit_label());
                    }
                }
            }

            ViewerResponse::RenderFailed {
                ticket,
                unit,
                fault,
            } => {
                if self.pending != Some(Pending::Render { id: ticket.id, unit }) {
                    self.discard(ticket, "not the pending render");
                    return false;
                }
                self.pending = None;
                warn!(
                    "Failed to render {} {unit} of {}: {fault}",
                    self.kind.unit_label(),
                    self.state.total_units
                );
            }
        }

        true
    }

    fn finish_load(&mut self, total_units: usize, start_unit: usize, surface: RenderedSurface) {
        let total_units = total_units.max(1);
        let start_unit = start_unit.clamp(1, total_units);

        if let Err(e) = self.surfaces.present(surface) {
            self.fail_load(&e.to_string());
            return;
        }

        self.state = ViewerState {
            current_unit: start_unit,
            total_units,
            phase: Phase::Ready,
            error: None,
        };
        info!(
            "Loaded {} ({total_units} {}s)",
            self.display_name(),
            self.kind.unit_label().to_lowercase()
        );
        self.notify_page_change();
    }

    fn fail_load(&mut self, detail: &str) {
        error!(
            "Failed to load {} document {}: {detail}",
            self.format_label(),
            self.display_name()
        );
        self.surfaces.clear();
        self.state = ViewerState {
            phase: Phase::Error,
            error: Some(format!("Failed to load {} file", self.format_label())),
            ..ViewerState::default()
        };
    }

    fn notify_page_change(&mut self) {
        let (unit, total) = (self.state.current_unit, self.state.total_units);
        if let Some(callback) = self.on_page_change.as_mut() {
            callback(unit, total);
        }
    }

    fn discard(&mut self, ticket: Ticket, reason: &str) {
        self.discarded += 1;
        debug!(
            "Discarding response {} of generation {} ({reason}; current generation {})",
            ticket.id.0, ticket.generation.0, self.generation.0
        );
    }

    fn is_navigable(&self) -> bool {
        self.state.phase == Phase::Ready && self.pending.is_none()
    }

    fn request_unit(&mut self, unit: usize) -> Vec<Effect> {
        let ticket = self.next_ticket();
        self.pending = Some(Pending::Render {
            id: ticket.id,
            unit,
        });
        vec![Effect::Render { ticket, unit }]
    }

    fn next_ticket(&mut self) -> Ticket {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        Ticket {
            generation: self.generation,
            id,
        }
    }

    fn format_label(&self) -> String {
        self.locator
            .as_ref()
            .map(DocumentLocator::format_label)
            .unwrap_or_else(|| self.kind.name().to_string())
    }

    fn display_name(&self) -> &str {
        self.locator
            .as_ref()
            .map(DocumentLocator::display_name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::viewer::strategy::StrategyFault;
    use crate::viewer::surface::RasterFrame;

    type Calls = Rc<RefCell<Vec<(usize, usize)>>>;

    fn controller() -> (ViewerController, Calls) {
        let calls: Calls = Rc::default();
        let mut controller = ViewerController::new(ViewerOptions::default());
        let sink = calls.clone();
        controller.set_on_page_change(move |unit, total| sink.borrow_mut().push((unit, total)));
        (controller, calls)
    }

    fn locator(format: &str) -> DocumentLocator {
        DocumentLocator::new(format!("book.{format}"), format, format!("book.{format}"))
    }

    fn open_ticket(effects: &[Effect]) -> Ticket {
        match effects {
            [Effect::Open { ticket, .. }] => *ticket,
            other => panic!("expected a single Open effect, got {other:?}"),
        }
    }

    fn render_request(effects: &[Effect]) -> (Ticket, usize) {
        match effects {
            [Effect::Render { ticket, unit }] => (*ticket, *unit),
            other => panic!("expected a single Render effect, got {other:?}"),
        }
    }

    fn markup(unit: usize) -> RenderedSurface {
        RenderedSurface::Markup(format!("<p>unit {unit}</p>"))
    }

    fn ready_with(controller: &mut ViewerController, total: usize) {
        let ticket = open_ticket(&controller.load(locator("pdf")));
        assert!(controller.apply(ViewerResponse::Opened {
            ticket,
            total_units: total,
            start_unit: 1,
            surface: markup(1),
        }));
    }

    fn complete_render(controller: &mut ViewerController, effects: Vec<Effect>) {
        let (ticket, unit) = render_request(&effects);
        assert!(controller.apply(ViewerResponse::Rendered {
            ticket,
            unit,
            surface: markup(unit),
        }));
    }

    #[test]
    fn load_enters_loading_and_requests_open() {
        let (mut controller, calls) = controller();
        let effects = controller.load(locator("epub"));

        assert!(controller.state().is_loading());
        assert!(controller.is_busy());
        assert_eq!(controller.format(), FormatKind::Epub);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Open {
                kind: FormatKind::Epub,
                start_unit: 1,
                ..
            }]
        ));
        assert_eq!(controller.indicator(), "Loading EPUB file...");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn successful_open_becomes_ready_and_notifies() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 5);

        assert_eq!(
            controller.state(),
            &ViewerState {
                current_unit: 1,
                total_units: 5,
                phase: Phase::Ready,
                error: None,
            }
        );
        assert_eq!(calls.borrow().as_slice(), &[(1, 5)]);
        assert_eq!(controller.indicator(), "Page 1 of 5");
        assert_eq!(controller.surfaces().markup().html(), "<p>unit 1</p>");
    }

    #[test]
    fn previous_right_after_load_is_a_no_op() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 3);

        assert!(controller.previous().is_empty());
        assert_eq!(controller.state().current_unit, 1);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn next_walks_to_the_last_unit_then_stops() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 4);

        for _ in 0..3 {
            let effects = controller.next();
            complete_render(&mut controller, effects);
        }
        assert_eq!(controller.state().current_unit, 4);
        assert!(!controller.can_go_next());

        let before = controller.state().clone();
        assert!(controller.next().is_empty());
        assert_eq!(controller.state(), &before);
        assert_eq!(
            calls.borrow().as_slice(),
            &[(1, 4), (2, 4), (3, 4), (4, 4)]
        );
    }

    #[test]
    fn previous_goes_back_one_unit() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 3);
        let effects = controller.next();
        complete_render(&mut controller, effects);

        let effects = controller.previous();
        assert_eq!(render_request(&effects).1, 1);
        complete_render(&mut controller, effects);
        assert_eq!(controller.state().current_unit, 1);
        assert_eq!(calls.borrow().last(), Some(&(1, 3)));
    }

    #[test]
    fn navigation_is_ignored_while_a_render_is_pending() {
        let (mut controller, _calls) = controller();
        ready_with(&mut controller, 5);

        let first = controller.next();
        assert_eq!(first.len(), 1);
        assert!(controller.next().is_empty());
        assert!(controller.previous().is_empty());
        assert!(controller.jump_to(5).is_empty());

        complete_render(&mut controller, first);
        assert_eq!(controller.state().current_unit, 2);
        assert_eq!(controller.next().len(), 1);
    }

    #[test]
    fn navigation_is_ignored_while_loading() {
        let (mut controller, _calls) = controller();
        let _ = controller.load(locator("pdf"));
        assert!(controller.next().is_empty());
        assert!(controller.previous().is_empty());
        assert!(controller.jump_to(2).is_empty());
    }

    #[test]
    fn jump_to_validates_range() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 10);

        assert!(controller.jump_to(0).is_empty());
        assert!(controller.jump_to(11).is_empty());
        assert!(controller.jump_to(1).is_empty());

        let effects = controller.jump_to(7);
        complete_render(&mut controller, effects);
        assert_eq!(controller.state().current_unit, 7);
        assert_eq!(calls.borrow().last(), Some(&(7, 10)));
    }

    #[test]
    fn render_failure_keeps_last_good_unit() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 3);

        let (ticket, unit) = render_request(&controller.next());
        assert!(controller.apply(ViewerResponse::RenderFailed {
            ticket,
            unit,
            fault: StrategyFault::pdf("corrupt page"),
        }));

        assert_eq!(controller.state().current_unit, 1);
        assert!(controller.state().is_ready());
        assert!(!controller.is_busy());
        assert_eq!(controller.surfaces().markup().html(), "<p>unit 1</p>");
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(controller.indicator(), "Page 1 of 3");
    }

    #[test]
    fn undisplayable_frame_counts_as_render_failure() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 2);

        let (ticket, unit) = render_request(&controller.next());
        controller.apply(ViewerResponse::Rendered {
            ticket,
            unit,
            surface: RenderedSurface::Raster(RasterFrame::new(2, 2, vec![0; 3])),
        });

        assert_eq!(controller.state().current_unit, 1);
        assert!(!controller.is_busy());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn open_failure_sets_format_specific_error() {
        let (mut controller, calls) = controller();
        let ticket = open_ticket(&controller.load(locator("pdf")));
        controller.apply(ViewerResponse::OpenFailed {
            ticket,
            fault: StrategyFault::pdf("not a PDF"),
        });

        assert_eq!(controller.state().phase, Phase::Error);
        assert_eq!(
            controller.state().error.as_deref(),
            Some("Failed to load PDF file")
        );
        assert!(controller.next().is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn superseded_load_cannot_overwrite_newer_state() {
        let (mut controller, calls) = controller();
        let first = open_ticket(&controller.load(locator("pdf")));
        let second = open_ticket(&controller.load(locator("txt")));

        assert!(controller.apply(ViewerResponse::Opened {
            ticket: second,
            total_units: 1,
            start_unit: 1,
            surface: markup(1),
        }));
        assert!(!controller.apply(ViewerResponse::Opened {
            ticket: first,
            total_units: 5,
            start_unit: 1,
            surface: markup(99),
        }));

        assert_eq!(controller.state().total_units, 1);
        assert_eq!(controller.format(), FormatKind::Txt);
        assert_eq!(controller.surfaces().markup().html(), "<p>unit 1</p>");
        assert_eq!(calls.borrow().as_slice(), &[(1, 1)]);
        assert_eq!(controller.discarded_responses(), 1);
    }

    #[test]
    fn stale_failure_does_not_touch_pending_load() {
        let (mut controller, _calls) = controller();
        let first = open_ticket(&controller.load(locator("pdf")));
        let _ = controller.load(locator("epub"));

        assert!(!controller.apply(ViewerResponse::OpenFailed {
            ticket: first,
            fault: StrategyFault::pdf("boom"),
        }));
        assert!(controller.state().is_loading());
        assert!(controller.state().error.is_none());
    }

    #[test]
    fn start_unit_is_clamped_to_document() {
        let calls: Calls = Rc::default();
        let sink = calls.clone();
        let mut controller =
            ViewerController::new(ViewerOptions::default().with_start_unit(Some(9)));
        controller.set_on_page_change(move |unit, total| sink.borrow_mut().push((unit, total)));

        let effects = controller.load(locator("pdf"));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Open { start_unit: 9, .. }]
        ));
        controller.apply(ViewerResponse::Opened {
            ticket: open_ticket(&effects),
            total_units: 3,
            start_unit: 9,
            surface: markup(3),
        });

        assert_eq!(controller.state().current_unit, 3);
        assert_eq!(calls.borrow().as_slice(), &[(3, 3)]);
    }

    #[test]
    fn zero_units_are_reported_as_one() {
        let (mut controller, calls) = controller();
        ready_with(&mut controller, 0);
        assert_eq!(controller.state().total_units, 1);
        assert_eq!(calls.borrow().as_slice(), &[(1, 1)]);
    }

    #[test]
    fn unload_releases_and_ignores_late_results() {
        let (mut controller, calls) = controller();
        let ticket = open_ticket(&controller.load(locator("pdf")));

        assert_eq!(controller.unload(), vec![Effect::Release]);
        assert!(!controller.apply(ViewerResponse::Opened {
            ticket,
            total_units: 2,
            start_unit: 1,
            surface: markup(1),
        }));
        assert_eq!(controller.state().phase, Phase::Idle);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn epub_indicator_counts_chapters() {
        let (mut controller, _calls) = controller();
        let ticket = open_ticket(&controller.load(locator("epub")));
        controller.apply(ViewerResponse::Opened {
            ticket,
            total_units: 7,
            start_unit: 1,
            surface: markup(1),
        });
        assert_eq!(controller.indicator(), "Chapter 1 of 7");
    }

    #[test]
    fn font_size_is_clamped() {
        let options = ViewerOptions::default().with_font_size(40);
        assert_eq!(options.font_size, MAX_FONT_SIZE);

        let mut controller = ViewerController::new(options);
        controller.set_font_size(3);
        assert_eq!(controller.options().font_size, MIN_FONT_SIZE);
    }
}
