use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BOOKMARK_COLOR: &str = "yellow";

fn default_color() -> String {
    DEFAULT_BOOKMARK_COLOR.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Reading position of one document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub current_page: usize,
    pub total_pages: usize,
    pub percent_read: u8,
    pub last_read_at: DateTime<Utc>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl ReadingProgress {
    fn new(current_page: usize, total_pages: usize) -> Self {
        Self {
            current_page,
            total_pages,
            percent_read: percent_read(current_page, total_pages),
            last_read_at: Utc::now(),
            bookmarks: Vec::new(),
        }
    }
}

/// `round(current * 100 / total)`, capped at 100
#[must_use]
pub fn percent_read(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (current as f64 * 100.0 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Per-document reading progress and bookmarks, keyed by document source
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProgressStore {
    documents: HashMap<String, ReadingProgress>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl ProgressStore {
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            documents: HashMap::new(),
            file_path: Some(file_path.into()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load reading progress from {path:?}: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if file_path.exists() {
            let content = fs::read_to_string(file_path)?;
            let mut store: Self = serde_json::from_str(&content)?;
            store.file_path = Some(file_path.to_path_buf());
            Ok(store)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, source: &str) -> Option<&ReadingProgress> {
        self.documents.get(source)
    }

    /// Stored page for a document, used as its starting unit
    pub fn resume_page(&self, source: &str) -> Option<usize> {
        self.get(source).map(|p| p.current_page)
    }

    pub fn most_recent(&self) -> Option<(&str, &ReadingProgress)> {
        self.documents
            .iter()
            .max_by_key(|(_, progress)| progress.last_read_at)
            .map(|(source, progress)| (source.as_str(), progress))
    }

    pub fn update_progress(&mut self, source: &str, current_page: usize, total_pages: usize) {
        self.documents
            .entry(source.to_string())
            .and_modify(|p| {
                p.current_page = current_page;
                p.total_pages = total_pages;
                p.percent_read = percent_read(current_page, total_pages);
                p.last_read_at = Utc::now();
            })
            .or_insert_with(|| ReadingProgress::new(current_page, total_pages));
        self.persist();
    }

    /// Add a bookmark, replacing any existing one on the same page
    pub fn add_bookmark(&mut self, source: &str, page: usize, note: Option<String>) {
        let progress = self
            .documents
            .entry(source.to_string())
            .or_insert_with(|| ReadingProgress::new(page, page.max(1)));
        progress.bookmarks.retain(|b| b.page != page);
        progress.bookmarks.push(Bookmark {
            page,
            note,
            color: default_color(),
            created_at: Utc::now(),
        });
        progress.bookmarks.sort_by_key(|b| b.page);
        self.persist();
    }

    /// Returns `true` if a bookmark was removed
    pub fn remove_bookmark(&mut self, source: &str, page: usize) -> bool {
        let removed = self.documents.get_mut(source).is_some_and(|progress| {
            let before = progress.bookmarks.len();
            progress.bookmarks.retain(|b| b.page != page);
            progress.bookmarks.len() != before
        });
        if removed {
            self.persist();
        }
        removed
    }

    pub fn bookmarks(&self, source: &str) -> &[Bookmark] {
        self.get(source)
            .map(|p| p.bookmarks.as_slice())
            .unwrap_or_default()
    }

    pub fn is_bookmarked(&self, source: &str, page: usize) -> bool {
        self.bookmarks(source).iter().any(|b| b.page == page)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save reading progress: {e}");
        }
    }
}
