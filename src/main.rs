use std::cell::RefCell;
use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use folio::event_source::KeyboardEventSource;
use folio::library::{Library, progress_file_path};
use folio::panic_handler;
use folio::progress::ProgressStore;
use folio::settings;
use folio::shell::markup::markup_to_lines;
use folio::shell::{ReaderShell, run_shell};
use folio::theme::ColorTheme;
use folio::viewer::{
    self, DocumentLocator, EngineConfig, FormatRegistry, Phase, ViewerOptions, ViewerService,
};

const DUMP_WIDTH: usize = 80;
const DUMP_TIMEOUT: Duration = Duration::from_secs(60);

/// Terminal viewer for PDF, EPUB, text and HTML documents
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
struct Args {
    /// Document path or http(s) URL. Lists the library when omitted.
    path: Option<String>,

    /// Override the format declared by the file extension (pdf, epub, txt, docx, html)
    #[arg(long)]
    format: Option<String>,

    /// Page or chapter to open at (1-based)
    #[arg(long)]
    page: Option<usize>,

    /// Color theme: light, dark or sepia
    #[arg(long)]
    theme: Option<ColorTheme>,

    /// Font size (12-24)
    #[arg(long)]
    font_size: Option<u16>,

    /// Directory to list when no document is given
    #[arg(long)]
    library: Option<PathBuf>,

    /// Print every page to stdout instead of opening the reader
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create("folio.log")?,
    )?;
    info!("Starting folio");

    settings::load_settings();
    if let Err(e) = viewer::configure(EngineConfig {
        pdf_scale: settings::get_pdf_scale(),
        ..EngineConfig::default()
    }) {
        warn!("Using default rendering configuration: {e}");
    }

    let Some(path) = args.path.as_deref() else {
        let dir = args
            .library
            .clone()
            .or_else(settings::get_library_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        return list_library(&dir);
    };

    let mut locator = DocumentLocator::from_source(path);
    if let Some(format) = &args.format {
        locator = locator.with_format(format);
    }

    let options = ViewerOptions::default()
        .with_theme(args.theme.unwrap_or_else(settings::get_theme))
        .with_font_size(args.font_size.unwrap_or_else(settings::get_font_size));
    let service = ViewerService::new(Arc::new(FormatRegistry::with_defaults()), options);
    let progress = ProgressStore::load_or_ephemeral(progress_file_path().as_deref());

    let result = if args.dump {
        dump_document(service, locator, args.page)
    } else {
        run_reader(service, progress, locator, args.page)
    };

    if let Err(e) = &result {
        error!("Application error: {e:?}");
    }
    info!("Shutting down folio");
    result
}

fn list_library(dir: &Path) -> Result<()> {
    let library = Library::scan(dir)?;
    if library.is_empty() {
        println!("No documents found in {}", dir.display());
        return Ok(());
    }

    let progress = ProgressStore::load_or_ephemeral(progress_file_path().as_deref());
    for (i, locator) in library.entries.iter().enumerate() {
        let read = progress
            .get(locator.source())
            .map(|p| format!("{:>3}%", p.percent_read))
            .unwrap_or_else(|| "    ".to_string());
        println!(
            "{:>3}  {:<5} {read}  {}",
            i + 1,
            locator.format_label(),
            locator.display_name()
        );
    }
    Ok(())
}

fn dump_document(
    mut service: ViewerService,
    locator: DocumentLocator,
    page: Option<usize>,
) -> Result<()> {
    let printed = Rc::new(RefCell::new(Vec::new()));
    let sink = printed.clone();
    service.set_on_page_change(move |current, total| sink.borrow_mut().push((current, total)));
    service.controller_mut().set_start_unit(page);
    service.load(locator);

    if !service.wait_idle(DUMP_TIMEOUT) {
        bail!("Timed out loading document");
    }
    if service.state().phase == Phase::Error {
        bail!(
            "{}",
            service
                .state()
                .error
                .clone()
                .unwrap_or_else(|| "Failed to load document".to_string())
        );
    }

    print_current_unit(&service);
    let total = service.state().total_units;
    for unit in service.state().current_unit + 1..=total {
        service.jump_to(unit);
        if !service.wait_idle(DUMP_TIMEOUT) {
            bail!("Timed out rendering unit {unit}");
        }
        if service.state().current_unit == unit {
            print_current_unit(&service);
        } else {
            println!("-- {unit} of {total}: failed to render --");
        }
    }

    info!("Dumped {} units", printed.borrow().len());
    Ok(())
}

fn print_current_unit(service: &ViewerService) {
    let controller = service.controller();
    println!("-- {} --", controller.indicator());
    match controller.surfaces().active() {
        Some(viewer::ActiveSurface::Raster) => {
            let raster = controller.surfaces().raster();
            println!("[page image {}x{}]", raster.width(), raster.height());
        }
        _ => {
            for line in markup_to_lines(controller.surfaces().markup().html(), DUMP_WIDTH) {
                println!("{}", line.text);
            }
        }
    }
    println!();
}

fn run_reader(
    service: ViewerService,
    progress: ProgressStore,
    locator: DocumentLocator,
    page: Option<usize>,
) -> Result<()> {
    panic_handler::initialize_panic_handler();

    let mut shell = ReaderShell::new(service, progress).with_persisted_settings();
    shell.open(locator, page);

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to initialize terminal")?;

    let res = run_shell(&mut terminal, &mut shell, &mut KeyboardEventSource);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
