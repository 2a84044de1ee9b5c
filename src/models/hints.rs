//! Hints read directly from a PDF's rendered text.

use serde::{Deserialize, Serialize};

/// Weak signals extracted from the first pages of a PDF
///
/// Hints are never returned to callers as a record. They either anchor a
/// lookup (DOI, title) or end up as the title of a zero-confidence record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfHints {
    /// First DOI found in the sampled pages
    pub doi: Option<String>,

    /// Title candidate from the page-1 layout or text
    pub title_hint: Option<String>,

    /// Earliest plausible year mentioned in the sampled pages
    pub year_hint: Option<i32>,

    /// Bounded excerpt of the sampled text, for diagnostics only
    pub sample_text: String,
}

impl PdfHints {
    /// True when no hint at all was found
    pub fn is_empty(&self) -> bool {
        self.doi.is_none() && self.title_hint.is_none() && self.year_hint.is_none()
    }
}
