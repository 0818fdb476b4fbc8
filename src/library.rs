use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::viewer::{DocumentLocator, FormatKind};

const APP_NAME: &str = "folio";
const PROGRESS_FILENAME: &str = "progress.json";

/// Extensions the library picks up when scanning a directory
pub const LIBRARY_EXTENSIONS: &[&str] = &["pdf", "epub", "txt", "docx", "html", "htm"];

/// Documents found in one directory, sorted by display name
pub struct Library {
    pub entries: Vec<DocumentLocator>,
}

impl Library {
    /// Scan `directory` (not recursively) for documents in a known format
    pub fn scan(directory: &Path) -> Result<Self> {
        let read_dir = fs::read_dir(directory)
            .with_context(|| format!("Failed to read library directory {directory:?}"))?;

        let mut entries: Vec<DocumentLocator> = read_dir
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("Skipping unreadable entry in {directory:?}: {e}");
                    None
                }
            })
            .filter(|path| path.is_file() && is_library_file(path))
            .map(|path| DocumentLocator::from_path(&path))
            .collect();

        entries.sort_by(|a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
        });

        info!("Found {} documents in {directory:?}", entries.len());
        Ok(Self { entries })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries of one format, in library order
    pub fn of_format(&self, kind: FormatKind) -> impl Iterator<Item = &DocumentLocator> {
        self.entries.iter().filter(move |l| l.format() == kind)
    }
}

fn is_library_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LIBRARY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Where reading progress is persisted, creating the data directory if needed
pub fn progress_file_path() -> Option<PathBuf> {
    let dir = dirs::data_dir()?.join(APP_NAME);
    if let Err(e) = fs::create_dir_all(&dir) {
        warn!("Failed to create data directory {dir:?}: {e}");
        return None;
    }
    Some(dir.join(PROGRESS_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_picks_known_formats_sorted_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.PDF", "Alpha.epub", "beta.txt", "notes.md", "page.htm", "memo.docx"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        fs::write(dir.path().join("nested.pdf").join("inner.pdf"), b"x").unwrap();

        let library = Library::scan(dir.path()).unwrap();
        let names: Vec<_> = library.entries.iter().map(|l| l.display_name()).collect();
        assert_eq!(
            names,
            vec!["Alpha.epub", "beta.txt", "memo.docx", "page.htm", "zeta.PDF"]
        );

        let tags: Vec<_> = library.entries.iter().map(|l| l.format_tag()).collect();
        assert_eq!(tags, vec!["epub", "txt", "docx", "htm", "pdf"]);
        assert_eq!(library.of_format(FormatKind::Html).count(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Library::scan(&dir.path().join("absent")).is_err());
    }
}
