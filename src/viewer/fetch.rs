//! Document fetching for local paths and remote URLs

use std::path::{Path, PathBuf};

use log::debug;
use url::Url;

use super::locator::DocumentLocator;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} does not name a local file")]
    InvalidFileUrl { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("remote documents are not supported in this build: {url}")]
    RemoteDisabled { url: String },
}

/// Capability to read a document's bytes
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, locator: &DocumentLocator) -> Result<Vec<u8>, FetchError>;

    /// Fetch and decode as UTF-8, replacing invalid sequences
    fn fetch_text(&self, locator: &DocumentLocator) -> Result<String, FetchError> {
        let bytes = self.fetch(locator)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

enum Source {
    Local(PathBuf),
    Remote(Url),
}

/// Anything that does not parse as an `http`, `https` or `file` URL is a path
fn classify(source: &str) -> Result<Source, FetchError> {
    let Ok(url) = Url::parse(source) else {
        return Ok(Source::Local(PathBuf::from(source)));
    };
    match url.scheme() {
        "http" | "https" => Ok(Source::Remote(url)),
        "file" => url
            .to_file_path()
            .map(Source::Local)
            .map_err(|()| FetchError::InvalidFileUrl {
                url: source.to_string(),
            }),
        _ => Ok(Source::Local(PathBuf::from(source))),
    }
}

/// Reads local paths and `file://` URLs from disk; `http(s)://` URLs go
/// through a blocking HTTP client when the `remote` feature is enabled.
#[derive(Debug, Default)]
pub struct DefaultFetcher;

impl DefaultFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn read_local(path: &Path) -> Result<Vec<u8>, FetchError> {
        std::fs::read(path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    #[cfg(feature = "remote")]
    fn read_remote(url: Url) -> Result<Vec<u8>, FetchError> {
        let http = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent(super::engine::config().user_agent.clone())
            .build()
            .map_err(http)?;
        let response = client.get(url.clone()).send().map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(http)?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "remote"))]
    fn read_remote(url: Url) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::RemoteDisabled {
            url: url.to_string(),
        })
    }
}

impl DocumentFetcher for DefaultFetcher {
    fn fetch(&self, locator: &DocumentLocator) -> Result<Vec<u8>, FetchError> {
        let bytes = match classify(locator.source())? {
            Source::Local(path) => Self::read_local(&path)?,
            Source::Remote(url) => Self::read_remote(url)?,
        };
        debug!(
            "Fetched {} bytes for {}",
            bytes.len(),
            locator.display_name()
        );
        Ok(bytes)
    }
}
