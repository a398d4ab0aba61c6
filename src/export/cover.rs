//! Cover image retrieval.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolves a cover href to image bytes.
///
/// Fetching is best-effort: the EPUB exporter logs a failure and carries on
/// without a cover.
pub trait CoverFetcher: Send + Sync {
    fn fetch(&self, href: &str) -> io::Result<Vec<u8>>;
}

impl<F> CoverFetcher for F
where
    F: Fn(&str) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn fetch(&self, href: &str) -> io::Result<Vec<u8>> {
        self(href)
    }
}

/// Reads covers from a local directory, using the last path segment of the
/// href (query string and fragment removed) as the file name.
#[derive(Debug, Clone)]
pub struct FsCoverFetcher {
    root: PathBuf,
}

impl FsCoverFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, href: &str) -> io::Result<PathBuf> {
        let name = file_name(href);
        let candidate = Path::new(name);
        let plain = candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if name.is_empty() || !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable cover href: {href}"),
            ));
        }
        Ok(self.root.join(candidate))
    }
}

impl CoverFetcher for FsCoverFetcher {
    fn fetch(&self, href: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(href)?)
    }
}

/// Last path segment of an href, without query or fragment.
pub(crate) fn file_name(href: &str) -> &str {
    let path = href.split(['?', '#']).next().unwrap_or("");
    path.rsplit('/').next().unwrap_or("")
}
