//! Resolution input: the caller's DOI, URL or PDF path.

use std::path::{Path, PathBuf};

/// What the caller wants resolved
///
/// Exactly one field is expected. When several are set the DOI is tried
/// first, then the URL, then the PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveInput {
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_path: Option<PathBuf>,
}

impl ResolveInput {
    /// Resolve a DOI
    pub fn doi(doi: impl Into<String>) -> Self {
        Self {
            doi: Some(doi.into()),
            ..Self::default()
        }
    }

    /// Resolve a URL (DOI link, arXiv link or any landing page)
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Resolve a local PDF file
    pub fn pdf(path: impl AsRef<Path>) -> Self {
        Self {
            pdf_path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Add a URL to try after the DOI
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a PDF to try last
    pub fn with_pdf(mut self, path: impl AsRef<Path>) -> Self {
        self.pdf_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// The DOI, if set and not blank
    pub fn doi_str(&self) -> Option<&str> {
        self.doi.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The URL, if set and not blank
    pub fn url_str(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// True when nothing usable was supplied
    pub fn is_empty(&self) -> bool {
        self.doi_str().is_none() && self.url_str().is_none() && self.pdf_path.is_none()
    }
}
