//! Document locators

use std::path::Path;

use url::Url;

use super::format::FormatKind;

/// Immutable reference to a document: where its bytes live, the format it
/// declares and the name shown to the reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentLocator {
    source: String,
    format: String,
    display_name: String,
}

impl DocumentLocator {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        format: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            format: format.into(),
            display_name: display_name.into(),
        }
    }

    /// Build a locator for a local file, taking the format from its extension.
    ///
    /// Files without an extension declare the format `unknown`, which the
    /// viewer shows as plain text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_string());
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Self::new(path.to_string_lossy(), format, display_name)
    }

    /// Build a locator from user input: an `http(s)://` or `file://` URL, or
    /// a plain path.
    ///
    /// Remote URLs without an extension in their last path segment declare
    /// `html`.
    #[must_use]
    pub fn from_source(input: &str) -> Self {
        let Ok(url) = Url::parse(input) else {
            return Self::from_path(Path::new(input));
        };
        match url.scheme() {
            "file" => match url.to_file_path() {
                Ok(path) => {
                    let local = Self::from_path(&path);
                    Self::new(input, local.format, local.display_name)
                }
                Err(()) => Self::new(input, "unknown", input),
            },
            "http" | "https" => {
                let name = url
                    .path_segments()
                    .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                    .map(str::to_string)
                    .or_else(|| url.host_str().map(str::to_string))
                    .unwrap_or_else(|| input.to_string());
                let format = Path::new(&name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "html".to_string());
                Self::new(input, format, name)
            }
            _ => Self::from_path(Path::new(input)),
        }
    }

    /// Same document, different declared format
    #[must_use]
    pub fn with_format(&self, format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn format_tag(&self) -> &str {
        &self.format
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn format(&self) -> FormatKind {
        FormatKind::from_tag(&self.format)
    }

    /// Upper-cased declared format, used in user-facing messages
    #[must_use]
    pub fn format_label(&self) -> String {
        let tag = self.format.trim().trim_start_matches('.');
        if tag.is_empty() {
            self.format().name().to_string()
        } else {
            tag.to_uppercase()
        }
    }
}
