//! Error types for the status page controller.
//!
//! Manifest problems are kept apart from the crate-level [`Error`] because the
//! page never distinguishes between them: every [`LoadError`] renders as the
//! same status text.

use thiserror::Error;

use crate::page::ElementId;

/// Status text shown for every manifest failure.
pub const MANIFEST_MISSING: &str = "Manifest missing";

/// Why a manifest load failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The resource could not be reached (network error, unreadable file).
    #[error("manifest unavailable: {0}")]
    Unavailable(String),

    /// The server answered with a non-success status.
    #[error("manifest request returned HTTP {0}")]
    Status(u16),

    /// The body was not usable JSON.
    #[error("malformed manifest: {0}")]
    Malformed(String),
}

impl LoadError {
    /// Text rendered on the page. Identical for all variants.
    pub fn display_text(&self) -> &'static str {
        MANIFEST_MISSING
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Unavailable(e.to_string())
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Malformed(e.to_string())
    }
}

/// Clipboard write failures.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard init: {0}")]
    Init(String),

    #[error("clipboard set: {0}")]
    Write(String),

    #[error("clipboard task failed: {0}")]
    Unavailable(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("required element `{}` is not present on the page", .0.dom_id())]
    MissingElement(ElementId),

    #[error("invalid manifest location: {0}")]
    Location(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_load_error_renders_the_same_text() {
        let errors = [
            LoadError::Unavailable("connection refused".into()),
            LoadError::Status(500),
            LoadError::Status(404),
            LoadError::Malformed("expected value".into()),
        ];
        for e in &errors {
            assert_eq!(e.display_text(), MANIFEST_MISSING);
        }
    }

    #[test]
    fn missing_element_names_the_dom_id() {
        let e = Error::MissingElement(ElementId::Status);
        assert!(e.to_string().contains("fw-status"));
    }
}
