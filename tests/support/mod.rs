#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use folio::viewer::strategies::{PageSize, PdfDocument, PdfEngine, Viewport};
use folio::viewer::{
    DefaultFetcher, DocumentFetcher, DocumentLocator, FetchError, FormatRegistry, RasterFrame,
    StrategyFault, ViewerOptions, ViewerService,
};

pub const SETTLE: Duration = Duration::from_secs(5);

/// Fake PDFs are text files reading `FAKEPDF <pages>` with an optional
/// `fail=<page>` naming a 1-based page whose render fails.
pub struct FakePdfEngine;

pub const FAKE_PAGE: PageSize = PageSize {
    width: 100.0,
    height: 200.0,
};

impl PdfEngine for FakePdfEngine {
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, StrategyFault> {
        let text = String::from_utf8_lossy(&bytes);
        let mut words = text.split_whitespace();
        if words.next() != Some("FAKEPDF") {
            return Err(StrategyFault::pdf("missing FAKEPDF header"));
        }
        let pages = words
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| StrategyFault::pdf("missing page count"))?;
        let failing_page = words
            .find_map(|w| w.strip_prefix("fail="))
            .and_then(|n| n.parse().ok());
        Ok(Box::new(FakePdfDocument {
            pages,
            failing_page,
        }))
    }
}

struct FakePdfDocument {
    pages: usize,
    failing_page: Option<usize>,
}

impl PdfDocument for FakePdfDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, _page: usize) -> Result<PageSize, StrategyFault> {
        Ok(FAKE_PAGE)
    }

    fn render_page(&self, page: usize, viewport: &Viewport) -> Result<RasterFrame, StrategyFault> {
        if self.failing_page == Some(page + 1) {
            return Err(StrategyFault::pdf(format!("page {} is damaged", page + 1)));
        }
        Ok(RasterFrame::blank(viewport.width_px, viewport.height_px))
    }
}

/// Counts fetches before delegating to [`DefaultFetcher`]
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    inner: DefaultFetcher,
}

impl CountingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentFetcher for CountingFetcher {
    fn fetch(&self, locator: &DocumentLocator) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(locator)
    }
}

/// Holds fetches of sources containing `slow` until the gate is opened
pub struct GatedFetcher {
    gate: flume::Receiver<()>,
    inner: DefaultFetcher,
}

impl GatedFetcher {
    pub fn new() -> (Self, flume::Sender<()>) {
        let (tx, rx) = flume::unbounded();
        (
            Self {
                gate: rx,
                inner: DefaultFetcher::new(),
            },
            tx,
        )
    }
}

impl DocumentFetcher for GatedFetcher {
    fn fetch(&self, locator: &DocumentLocator) -> Result<Vec<u8>, FetchError> {
        if locator.source().contains("slow") {
            let _ = self.gate.recv();
        }
        self.inner.fetch(locator)
    }
}

pub fn registry_with(fetcher: Arc<dyn DocumentFetcher>) -> Arc<FormatRegistry> {
    Arc::new(FormatRegistry::new(fetcher, Arc::new(FakePdfEngine)))
}

pub fn service_with(fetcher: Arc<dyn DocumentFetcher>, options: ViewerOptions) -> ViewerService {
    ViewerService::new(registry_with(fetcher), options)
}

pub fn service() -> ViewerService {
    service_with(Arc::new(DefaultFetcher::new()), ViewerOptions::default())
}

pub fn write_file(dir: &Path, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Apply responses until `done` holds or the timeout passes
pub fn poll_until(
    service: &mut ViewerService,
    timeout: Duration,
    mut done: impl FnMut(&ViewerService) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        service.poll_responses();
        if done(service) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Write a minimal EPUB 2 with one spine entry per chapter body
pub fn write_epub(dir: &Path, name: &str, chapters: &[&str]) -> PathBuf {
    use zip::{ZipWriter, write::FileOptions};

    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("mimetype", options).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#,
    )
    .unwrap();

    let manifest: String = (1..=chapters.len())
        .map(|i| {
            format!(
                r#"        <item id="chapter{i}" href="chapter{i}.xhtml" media-type="application/xhtml+xml"/>
"#
            )
        })
        .collect();
    let spine: String = (1..=chapters.len())
        .map(|i| format!("        <itemref idref=\"chapter{i}\"/>\n"))
        .collect();

    zip.start_file("OEBPS/content.opf", options).unwrap();
    let content_opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="bookid" version="2.0">
    <metadata>
        <dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">{name}</dc:title>
        <dc:identifier xmlns:dc="http://purl.org/dc/elements/1.1/" id="bookid">test-{name}</dc:identifier>
        <dc:language xmlns:dc="http://purl.org/dc/elements/1.1/">en</dc:language>
    </metadata>
    <manifest>
{manifest}        <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    </manifest>
    <spine toc="ncx">
{spine}    </spine>
</package>"#
    );
    zip.write_all(content_opf.as_bytes()).unwrap();

    zip.start_file("OEBPS/toc.ncx", options).unwrap();
    let nav_points: String = (1..=chapters.len())
        .map(|i| {
            format!(
                r#"        <navPoint id="nav{i}" playOrder="{i}">
            <navLabel><text>Chapter {i}</text></navLabel>
            <content src="chapter{i}.xhtml"/>
        </navPoint>
"#
            )
        })
        .collect();
    let toc_ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
    <head>
        <meta name="dtb:uid" content="test-{name}"/>
        <meta name="dtb:depth" content="1"/>
    </head>
    <docTitle><text>{name}</text></docTitle>
    <navMap>
{nav_points}    </navMap>
</ncx>"#
    );
    zip.write_all(toc_ncx.as_bytes()).unwrap();

    for (i, body) in chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/chapter{}.xhtml", i + 1), options)
            .unwrap();
        let xhtml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter {n}</title></head>
<body>{body}</body>
</html>"#,
            n = i + 1
        );
        zip.write_all(xhtml.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    path
}
