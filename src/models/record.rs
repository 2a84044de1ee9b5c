//! Metadata record model: the normalized output of every resolution.

use serde::{Deserialize, Serialize};

use crate::utils::{doi_url, parse_year};

/// The resolver that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordSource {
    /// DOI registry content negotiation (doi.org)
    Registry,
    /// Bibliographic index direct lookup (Crossref)
    Index,
    /// Preprint repository feed (arXiv)
    Preprint,
    /// HTML metadata tags of an arbitrary page
    GenericPage,
    /// Index title search matched against a PDF title hint
    TitleSearch,
    /// Nothing resolved; only unverified PDF hints remain
    PdfHint,
    /// Nothing resolved at all
    None,
}

impl RecordSource {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            RecordSource::Registry => "doi.org",
            RecordSource::Index => "Crossref",
            RecordSource::Preprint => "arXiv",
            RecordSource::GenericPage => "HTML meta tags",
            RecordSource::TitleSearch => "Crossref title search",
            RecordSource::PdfHint => "PDF hints",
            RecordSource::None => "none",
        }
    }

    /// Returns the stable tag used in serialized output
    pub fn id(&self) -> &'static str {
        match self {
            RecordSource::Registry => "registry",
            RecordSource::Index => "index",
            RecordSource::Preprint => "preprint",
            RecordSource::GenericPage => "generic-page",
            RecordSource::TitleSearch => "title-search",
            RecordSource::PdfHint => "pdf-hint",
            RecordSource::None => "none",
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A normalized bibliographic record
///
/// Records are immutable once built. Fields are read through accessors; a
/// modified copy is made with [`RecordBuilder::from_record`]. Records are
/// serialized for output only; the builder is the one way to make one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    title: String,
    authors: Vec<String>,
    year: Option<i32>,
    container: String,
    r#abstract: String,
    doi: String,
    url: String,
    source: RecordSource,
    confidence: f64,
}

impl MetadataRecord {
    /// The record returned when every fallback came back empty.
    ///
    /// Keeps the caller's own identifiers; the URL is derived from the DOI
    /// when no URL was supplied.
    pub fn unresolved(doi: Option<&str>, url: Option<&str>) -> Self {
        let mut builder = RecordBuilder::new(RecordSource::None).confidence(0.0);
        if let Some(doi) = doi {
            builder = builder.doi(doi);
        }
        if let Some(url) = url {
            builder = builder.url(url);
        }
        builder.build()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors in source order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Journal, conference or repository name
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn abstract_text(&self) -> &str {
        &self.r#abstract
    }

    pub fn doi(&self) -> &str {
        &self.doi
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> RecordSource {
        self.source
    }

    /// How directly the record's identity was established, in `[0, 1]`
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// True when no bibliographic field carries data
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.authors.is_empty()
            && self.year.is_none()
            && self.container.is_empty()
            && self.r#abstract.is_empty()
            && self.doi.is_empty()
    }

    /// Flat key/value export for cataloging tools
    pub fn item_fields(&self) -> ItemFields {
        let url = if self.url.is_empty() && !self.doi.is_empty() {
            doi_url(&self.doi)
        } else {
            self.url.clone()
        };

        ItemFields {
            title: self.title.clone(),
            creators: self.authors.clone(),
            year: self.year.map(|y| y.to_string()).unwrap_or_default(),
            venue: self.container.clone(),
            item_type: "Article".to_string(),
            tags: vec!["auto-import".to_string()],
            r#abstract: self.r#abstract.clone(),
            doi: self.doi.clone(),
            url,
        }
    }
}

/// Flat item fields as consumed by a reference library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    pub title: String,
    pub creators: Vec<String>,
    /// Publication year, empty when unknown
    pub year: String,
    pub venue: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub tags: Vec<String>,
    pub r#abstract: String,
    pub doi: String,
    pub url: String,
}

/// Builder for constructing MetadataRecord objects
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: MetadataRecord,
}

impl RecordBuilder {
    /// Create a new builder for a record produced by `source`.
    ///
    /// Confidence starts at 1.0 (identifier-exact resolution).
    pub fn new(source: RecordSource) -> Self {
        Self {
            record: MetadataRecord {
                title: String::new(),
                authors: Vec::new(),
                year: None,
                container: String::new(),
                r#abstract: String::new(),
                doi: String::new(),
                url: String::new(),
                source,
                confidence: 1.0,
            },
        }
    }

    /// Start from an existing record
    pub fn from_record(record: MetadataRecord) -> Self {
        Self { record }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = title.into();
        self
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.record.authors = authors;
        self
    }

    /// Set the year; values outside `1800..=current_year + 1` are dropped
    pub fn year(mut self, year: Option<i32>) -> Self {
        self.record.year = year.and_then(parse_year);
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.record.container = container.into();
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = abstract_text.into();
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = doi.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = url.into();
        self
    }

    pub fn source(mut self, source: RecordSource) -> Self {
        self.record.source = source;
        self
    }

    /// Set the confidence, clamped to `[0, 1]`
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.record.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Build the record, deriving the URL from the DOI when no URL was set
    pub fn build(mut self) -> MetadataRecord {
        if self.record.url.is_empty() && !self.record.doi.is_empty() {
            self.record.url = doi_url(&self.record.doi);
        }
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = RecordBuilder::new(RecordSource::Registry)
            .title("Human-level control through deep reinforcement learning")
            .authors(vec!["Volodymyr Mnih".to_string(), "Koray Kavukcuoglu".to_string()])
            .year(Some(2015))
            .container("Nature")
            .doi("10.1038/nature14539")
            .build();

        assert_eq!(record.source(), RecordSource::Registry);
        assert_eq!(record.confidence(), 1.0);
        assert_eq!(record.year(), Some(2015));
        assert_eq!(record.authors()[0], "Volodymyr Mnih");
        assert_eq!(record.url(), "https://doi.org/10.1038/nature14539");
    }

    #[test]
    fn test_year_out_of_range_is_dropped() {
        let record = RecordBuilder::new(RecordSource::Index)
            .year(Some(1799))
            .build();
        assert_eq!(record.year(), None);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let record = RecordBuilder::new(RecordSource::TitleSearch)
            .confidence(1.7)
            .build();
        assert_eq!(record.confidence(), 1.0);

        let record = RecordBuilder::new(RecordSource::TitleSearch)
            .confidence(f64::NAN)
            .build();
        assert_eq!(record.confidence(), 0.0);
    }

    #[test]
    fn test_unresolved_record() {
        let record = MetadataRecord::unresolved(Some("10.1234/abc"), None);
        assert_eq!(record.source(), RecordSource::None);
        assert_eq!(record.confidence(), 0.0);
        assert_eq!(record.doi(), "10.1234/abc");
        assert_eq!(record.url(), "https://doi.org/10.1234/abc");
        assert!(record.title().is_empty());
    }

    #[test]
    fn test_item_fields() {
        let record = RecordBuilder::new(RecordSource::Preprint)
            .title("Attention Is All You Need")
            .authors(vec!["Ashish Vaswani".to_string()])
            .year(Some(2017))
            .container("arXiv")
            .url("https://arxiv.org/abs/1706.03762")
            .build();

        let fields = record.item_fields();
        assert_eq!(fields.year, "2017");
        assert_eq!(fields.venue, "arXiv");
        assert_eq!(fields.item_type, "Article");
        assert_eq!(fields.tags, vec!["auto-import"]);

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["type"], "Article");
        assert_eq!(json["creators"][0], "Ashish Vaswani");
    }

    #[test]
    fn test_record_serialization() {
        let record = RecordBuilder::new(RecordSource::Index)
            .title("Deep learning")
            .doi("10.1038/nature14539")
            .abstract_text("Deep learning allows computational models.")
            .confidence(1.0)
            .build();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["title"], "Deep learning");
        assert_eq!(json["abstract"], "Deep learning allows computational models.");
        assert_eq!(json["url"], "https://doi.org/10.1038/nature14539");
        assert_eq!(json["source"], "index");
        assert_eq!(json["confidence"], 1.0);
        assert!(json["year"].is_null());
    }

    #[test]
    fn test_source_serialization() {
        let json = serde_json::to_string(&RecordSource::GenericPage).unwrap();
        assert_eq!(json, "\"generic-page\"");
        let json = serde_json::to_string(&RecordSource::TitleSearch).unwrap();
        assert_eq!(json, "\"title-search\"");
    }
}
