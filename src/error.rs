//! Error types for svgbook operations.

use thiserror::Error;

/// Errors that can occur while reconstructing or exporting a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A chapter fragment could not be turned into an element tree.
    #[error("malformed markup in chapter {chapter_id}: {message}")]
    Markup { chapter_id: String, message: String },

    /// The external PDF renderer failed or is unavailable.
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn markup(chapter_id: &str, message: impl Into<String>) -> Self {
        Error::Markup {
            chapter_id: chapter_id.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
