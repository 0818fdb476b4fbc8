//! Terminal reader shell around a [`ViewerService`]

pub mod markup;
pub mod raster;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::info;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::event_source::EventSource;
use crate::progress::ProgressStore;
use crate::settings;
use crate::theme::{ColorTheme, Palette};
use crate::viewer::{
    ActiveSurface, DEFAULT_FONT_SIZE, DocumentLocator, MIN_FONT_SIZE, Phase, SUPPORTED_FORMATS,
    ViewerService,
};
use markup::{BlockKind, MarkupLine, markup_to_lines};
use raster::RasterPreview;
use unicode_width::UnicodeWidthStr;

const TICK_RATE: Duration = Duration::from_millis(50);
const KEY_HELP: &str = "  h/l page  b mark  t theme  +/- size  q quit";

pub struct ReaderShell {
    service: ViewerService,
    progress: Rc<RefCell<ProgressStore>>,
    scroll: usize,
    persist_settings: bool,
    should_quit: bool,
}

impl ReaderShell {
    pub fn new(service: ViewerService, progress: ProgressStore) -> Self {
        Self {
            service,
            progress: Rc::new(RefCell::new(progress)),
            scroll: 0,
            persist_settings: false,
            should_quit: false,
        }
    }

    /// Write theme and font size changes back to the settings file
    #[must_use]
    pub fn with_persisted_settings(mut self) -> Self {
        self.persist_settings = true;
        self
    }

    #[must_use]
    pub fn service(&self) -> &ViewerService {
        &self.service
    }

    #[must_use]
    pub fn progress(&self) -> Rc<RefCell<ProgressStore>> {
        self.progress.clone()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Open a document, resuming at its stored page unless `start_unit` is given
    pub fn open(&mut self, locator: DocumentLocator, start_unit: Option<usize>) {
        let source = locator.source().to_string();
        let resume = start_unit.or_else(|| self.progress.borrow().resume_page(&source));

        let progress = self.progress.clone();
        let callback_source = source.clone();
        self.service.set_on_page_change(move |current, total| {
            progress
                .borrow_mut()
                .update_progress(&callback_source, current, total);
        });

        self.service.controller_mut().set_start_unit(resume);
        self.scroll = 0;
        info!("Opening {source} at {:?}", resume);
        self.service.load(locator);
    }

    /// Apply finished worker results
    pub fn tick(&mut self) {
        if self.service.poll_responses() > 0 {
            self.scroll = 0;
        }
    }

    /// Block until the current load or render finishes
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let idle = self.service.wait_idle(timeout);
        self.scroll = 0;
        idle
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => self.service.next(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => self.service.previous(),
            KeyCode::Char('g') | KeyCode::Home => self.service.jump_to(1),
            KeyCode::Char('G') | KeyCode::End => {
                let last = self.service.state().total_units;
                self.service.jump_to(last);
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Char('b') => self.toggle_bookmark(),
            KeyCode::Char('t') => {
                let theme = self.service.controller().options().theme.cycle();
                self.service.controller_mut().set_theme(theme);
                if self.persist_settings {
                    settings::set_theme(theme);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_font_size(1),
            KeyCode::Char('-') => self.adjust_font_size(-1),
            _ => {}
        }
    }

    fn adjust_font_size(&mut self, delta: i32) {
        let current = i32::from(self.service.controller().options().font_size);
        let size = u16::try_from(current + delta).unwrap_or(DEFAULT_FONT_SIZE);
        self.service.controller_mut().set_font_size(size);
        if self.persist_settings {
            settings::set_font_size(self.service.controller().options().font_size);
        }
    }

    fn toggle_bookmark(&mut self) {
        let state = self.service.state();
        if state.phase != Phase::Ready {
            return;
        }
        let page = state.current_unit;
        let Some(source) = self
            .service
            .controller()
            .locator()
            .map(|l| l.source().to_string())
        else {
            return;
        };

        let mut progress = self.progress.borrow_mut();
        if !progress.remove_bookmark(&source, page) {
            progress.add_bookmark(&source, page, None);
        }
    }

    fn is_bookmarked(&self) -> bool {
        let controller = self.service.controller();
        controller.locator().is_some_and(|l| {
            self.progress
                .borrow()
                .is_bookmarked(l.source(), controller.state().current_unit)
        })
    }

    fn theme(&self) -> ColorTheme {
        self.service.controller().options().theme
    }

    /// Markup column width for the current font size. The smallest size
    /// uses the full width; larger sizes leave wider side margins.
    fn column_width(&self, available: u16) -> usize {
        let font_size = u32::from(self.service.controller().options().font_size.max(1));
        let scaled = u32::from(available) * u32::from(MIN_FONT_SIZE) / font_size;
        (scaled.min(u32::from(available)) as usize).max(1)
    }

    pub fn draw(&self, f: &mut Frame) {
        let palette = self.theme().palette();
        let area = f.area();
        f.render_widget(
            Block::default().style(Style::default().bg(palette.background)),
            area,
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let title = self
            .service
            .controller()
            .locator()
            .map(|l| format!(" {} ", l.display_name()))
            .unwrap_or_else(|| " folio ".to_string());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border))
            .title(Span::styled(title, Style::default().fg(palette.accent)));
        let inner = block.inner(chunks[0]);
        f.render_widget(block, chunks[0]);

        self.draw_content(f, inner, palette);
        self.draw_status(f, chunks[1], palette);
    }

    fn draw_content(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let state = self.service.state();
        match state.phase {
            Phase::Idle => {}
            Phase::Loading => {
                let text = Paragraph::new(self.service.controller().indicator())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted));
                f.render_widget(text, area);
            }
            Phase::Error => {
                let lines = vec![
                    Line::from(Span::styled(
                        state.error.clone().unwrap_or_default(),
                        Style::default()
                            .fg(palette.error)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(
                        format!("Supported formats: {SUPPORTED_FORMATS}"),
                        Style::default().fg(palette.muted),
                    )),
                ];
                f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
            }
            Phase::Ready => match self.service.controller().surfaces().active() {
                Some(ActiveSurface::Raster) => {
                    let target = self.service.controller().surfaces().raster();
                    f.render_widget(RasterPreview::new(target), area);
                }
                Some(ActiveSurface::Markup) | None => self.draw_markup(f, area, palette),
            },
        }
    }

    fn draw_markup(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let width = self.column_width(area.width);
        let html = self.service.controller().surfaces().markup().html();
        let lines: Vec<Line> = markup_to_lines(html, width)
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .map(|line| styled_line(line, palette))
            .collect();

        let column = Rect {
            x: area.x + (area.width.saturating_sub(width as u16)) / 2,
            width: (width as u16).min(area.width),
            ..area
        };
        f.render_widget(Paragraph::new(lines), column);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let controller = self.service.controller();
        let mut spans = vec![Span::styled(
            format!(" {}", controller.indicator()),
            Style::default().fg(palette.foreground),
        )];
        if self.is_bookmarked() {
            spans.push(Span::styled(" [bookmarked]", Style::default().fg(palette.accent)));
        }
        spans.push(Span::styled(
            format!("  {} {}pt", self.theme(), controller.options().font_size),
            Style::default().fg(palette.muted),
        ));

        let used: usize = spans.iter().map(|span| span.content.width()).sum();
        if used + KEY_HELP.width() <= usize::from(area.width) {
            spans.push(Span::styled(KEY_HELP, Style::default().fg(palette.muted)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn styled_line(line: MarkupLine, palette: &Palette) -> Line<'static> {
    let style = match line.kind {
        BlockKind::Heading => Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
        BlockKind::Paragraph | BlockKind::Preformatted => Style::default().fg(palette.foreground),
    };
    Line::from(Span::styled(line.text, style))
}

/// Draw, read keys and apply worker results until the reader quits
pub fn run_shell<B: Backend>(
    terminal: &mut Terminal<B>,
    shell: &mut ReaderShell,
    events: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    while !shell.should_quit() {
        shell.tick();
        terminal.draw(|f| shell.draw(f))?;

        if events.poll(TICK_RATE)? {
            if let Event::Key(key) = events.read()? {
                shell.handle_key(key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::SimulatedEventSource;
    use crate::viewer::{FormatRegistry, ViewerOptions};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    const SETTLE: Duration = Duration::from_secs(5);

    fn shell() -> ReaderShell {
        let service = ViewerService::new(
            Arc::new(FormatRegistry::with_defaults()),
            ViewerOptions::default(),
        );
        ReaderShell::new(service, ProgressStore::ephemeral())
    }

    fn screen(shell: &ReaderShell) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| shell.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn key(c: char) -> KeyEvent {
        match SimulatedEventSource::char_key(c) {
            Event::Key(key) => key,
            _ => unreachable!(),
        }
    }

    #[test]
    fn text_document_renders_with_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello <world>\nsecond line").unwrap();

        let mut shell = shell();
        shell.open(DocumentLocator::from_path(&path), None);
        assert!(shell.settle(SETTLE));

        let screen = screen(&shell);
        assert!(screen.contains("notes.txt"));
        assert!(screen.contains("hello <world>"));
        assert!(screen.contains("second line"));
        assert!(screen.contains("Page 1 of 1"));

        let source = path.to_string_lossy().to_string();
        let progress = shell.progress();
        assert_eq!(progress.borrow().get(&source).unwrap().percent_read, 100);
    }

    #[test]
    fn failed_load_lists_supported_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell();
        shell.open(
            DocumentLocator::from_path(&dir.path().join("missing.epub")),
            None,
        );
        assert!(shell.settle(SETTLE));

        let screen = screen(&shell);
        assert!(screen.contains("Failed to load EPUB file"));
        assert!(screen.contains("Supported formats: PDF, EPUB, TXT, DOCX, HTML"));
    }

    #[test]
    fn keys_toggle_bookmark_theme_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.html");
        std::fs::write(&path, "<h1>Title</h1><p>Body</p>").unwrap();

        let mut shell = shell();
        shell.open(DocumentLocator::from_path(&path), None);
        shell.settle(SETTLE);

        shell.handle_key(key('b'));
        assert!(shell.is_bookmarked());
        assert!(screen(&shell).contains("[bookmarked]"));
        shell.handle_key(key('b'));
        assert!(!shell.is_bookmarked());

        shell.handle_key(key('t'));
        assert_eq!(shell.theme(), ColorTheme::Dark);

        shell.handle_key(key('+'));
        assert_eq!(shell.service().controller().options().font_size, 17);

        shell.handle_key(key('q'));
        assert!(shell.should_quit());
    }

    #[test]
    fn every_font_size_step_changes_the_column() {
        let mut shell = shell();
        assert_eq!(shell.column_width(64), 48);

        let widths: Vec<usize> = (MIN_FONT_SIZE..=24)
            .map(|size| {
                shell.service.controller_mut().set_font_size(size);
                shell.column_width(120)
            })
            .collect();
        assert_eq!(widths.first(), Some(&120));
        assert_eq!(widths.last(), Some(&60));
        assert!(widths.windows(2).all(|pair| pair[0] > pair[1]));

        shell.service.controller_mut().set_font_size(DEFAULT_FONT_SIZE);
        shell.handle_key(key('-'));
        assert_eq!(shell.column_width(64), 51);
    }

    #[test]
    fn key_help_is_dropped_when_the_status_line_is_narrow() {
        let mut shell = shell();
        let mut terminal = Terminal::new(TestBackend::new(30, 6)).unwrap();
        terminal.draw(|f| shell.draw(f)).unwrap();
        let status: String = (0..30)
            .map(|x| terminal.backend().buffer()[(x, 5)].symbol().to_string())
            .collect();
        assert!(status.contains("16pt"));
        assert!(!status.contains("q quit"));

        shell.handle_key(key('+'));
        let mut wide = Terminal::new(TestBackend::new(100, 6)).unwrap();
        wide.draw(|f| shell.draw(f)).unwrap();
        let status: String = (0..100)
            .map(|x| wide.backend().buffer()[(x, 5)].symbol().to_string())
            .collect();
        assert!(status.contains("17pt"));
        assert!(status.contains("q quit"));
    }

    #[test]
    fn run_loop_stops_on_quit() {
        let mut shell = shell();
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let mut events = SimulatedEventSource::typed("lhq");
        run_shell(&mut terminal, &mut shell, &mut events).unwrap();
        assert!(shell.should_quit());
    }
}
