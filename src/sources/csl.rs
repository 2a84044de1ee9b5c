//! CSL-JSON work mapping shared by the DOI registry and Crossref.
//!
//! doi.org content negotiation answers with a CSL-JSON item; Crossref's
//! `/works/{doi}` wraps a work of the same shape in a `message` envelope.
//! Both go through [`CslWork::into_record`].

use serde::Deserialize;

use crate::config::AuthorStyle;
use crate::models::{MetadataRecord, RecordBuilder, RecordSource};
use crate::sources::SourceError;
use crate::utils::{clean, clean_abstract, parse_year};

/// A text field that is sometimes a string and sometimes a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TextField {
    One(String),
    Many(Vec<String>),
}

impl TextField {
    /// The first non-blank value
    fn first(&self) -> Option<&str> {
        match self {
            TextField::One(s) => Some(s.as_str()),
            TextField::Many(list) => list.iter().map(String::as_str).find(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CslAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
    /// Organisations carry a single name
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    literal: Option<String>,
}

impl CslAuthor {
    fn display(&self, style: AuthorStyle) -> Option<String> {
        let given = self.given.as_deref().map(clean).unwrap_or_default();
        let family = self.family.as_deref().map(clean).unwrap_or_default();

        let formatted = match (given.is_empty(), family.is_empty()) {
            (false, false) => match style {
                AuthorStyle::GivenFamily => format!("{} {}", given, family),
                AuthorStyle::FamilyGiven => format!("{}, {}", family, given),
            },
            (true, false) => family,
            (false, true) => given,
            (true, true) => self
                .name
                .as_deref()
                .or(self.literal.as_deref())
                .map(clean)
                .unwrap_or_default(),
        };

        (!formatted.is_empty()).then_some(formatted)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CslDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<serde_json::Value>>,
}

impl CslDate {
    fn year(&self) -> Option<i32> {
        let first = self.date_parts.first()?.first()?;
        match first {
            serde_json::Value::Number(n) => n.as_i64().and_then(|y| parse_year(y)),
            serde_json::Value::String(s) => parse_year(s),
            _ => None,
        }
    }
}

/// One bibliographic work in CSL-JSON form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CslWork {
    #[serde(default)]
    title: Option<TextField>,
    #[serde(default)]
    author: Vec<CslAuthor>,
    #[serde(default)]
    issued: Option<CslDate>,
    #[serde(default)]
    published_print: Option<CslDate>,
    #[serde(default)]
    published_online: Option<CslDate>,
    #[serde(default)]
    container_title: Option<TextField>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default, rename = "URL")]
    url: Option<String>,
}

impl CslWork {
    /// Earliest valid year among the issued and publication dates
    fn year(&self) -> Option<i32> {
        [&self.issued, &self.published_print, &self.published_online]
            .into_iter()
            .flatten()
            .filter_map(CslDate::year)
            .min()
    }

    /// Map the work to a record for `doi`.
    ///
    /// The DOI the caller asked for is kept, not the one echoed back. A work
    /// without title, authors and container is `NotFound`.
    pub(crate) fn into_record(
        self,
        doi: &str,
        source: RecordSource,
        style: AuthorStyle,
    ) -> Result<MetadataRecord, SourceError> {
        let title = self.title.as_ref().and_then(TextField::first).map(clean).unwrap_or_default();
        let container = self
            .container_title
            .as_ref()
            .and_then(TextField::first)
            .map(clean)
            .unwrap_or_default();
        let authors: Vec<String> = self.author.iter().filter_map(|a| a.display(style)).collect();

        if title.is_empty() && authors.is_empty() && container.is_empty() {
            return Err(SourceError::NotFound(format!("no usable fields for {}", doi)));
        }

        let year = self.year();
        let url = self.url.as_deref().map(str::trim).unwrap_or_default().to_string();

        Ok(RecordBuilder::new(source)
            .title(title)
            .authors(authors)
            .year(year)
            .container(container)
            .abstract_text(self.abstract_text.as_deref().map(clean_abstract).unwrap_or_default())
            .doi(doi)
            .url(url)
            .build())
    }
}
