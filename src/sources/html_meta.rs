//! Generic page resolver: scrapes citation metadata tags from HTML.
//!
//! Publishers embed bibliographic data for crawlers in `<meta>` tags:
//! Highwire Press (`citation_*`), Dublin Core (`dc.*`), PRISM (`prism.*`)
//! and Open Graph (`og:*`). When a page names its DOI, the DOI chain gets
//! the first word; the tags themselves are the fallback.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::config::Config;
use crate::models::{MetadataRecord, RecordBuilder, RecordSource};
use crate::sources::{
    check_status, content_type, Resolver, ResolverCapabilities, ResolverChain, SourceError,
};
use crate::utils::{clean, extract_doi, normalize_year, with_retry, HttpClient, RetryConfig};

const TITLE_TAGS: &[&str] = &["citation_title", "dc.title", "og:title"];
const ABSTRACT_TAGS: &[&str] = &["citation_abstract", "dc.description", "og:description"];
const CONTAINER_TAGS: &[&str] = &[
    "citation_journal_title",
    "citation_conference_title",
    "prism.publicationname",
    "dc.source",
];
const DATE_TAGS: &[&str] = &[
    "citation_publication_date",
    "prism.publicationdate",
    "dc.date",
    "citation_date",
];
const DOI_TAGS: &[&str] = &[
    "citation_doi",
    "dc.identifier",
    "dc.identifier.doi",
    "doi",
    "og:doi",
];

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:19|20)\d{2}").expect("valid year regex"))
}

/// Resolves arbitrary landing pages from their metadata tags
#[derive(Debug, Clone)]
pub struct HtmlMetaResolver {
    client: HttpClient,
    doi_chain: ResolverChain,
    retry: RetryConfig,
}

impl HtmlMetaResolver {
    /// `doi_chain` is consulted when the page reveals a DOI
    pub fn new(client: HttpClient, doi_chain: ResolverChain) -> Self {
        Self {
            client,
            doi_chain,
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(client: HttpClient, doi_chain: ResolverChain, config: &Config) -> Self {
        Self::new(client, doi_chain).with_retry_config(RetryConfig::from_settings(&config.retry))
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let client = &self.client;

        let response = with_retry(self.retry, || async move {
            let response = client
                .get(url)
                .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5")
                .send()
                .await?;
            check_status(response, "page")
        })
        .await?;

        let kind = content_type(&response);
        if !kind.is_empty() && !kind.contains("html") && !kind.contains("xml") {
            return Err(SourceError::Parse(format!("{} is '{}', not HTML", url, kind)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Resolver for HtmlMetaResolver {
    fn id(&self) -> &str {
        "html-meta"
    }

    fn name(&self) -> &str {
        "HTML metadata tags"
    }

    fn kind(&self) -> RecordSource {
        RecordSource::GenericPage
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities::PAGE_LOOKUP
    }

    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError> {
        let url = url::Url::parse(identifier.trim())
            .map_err(|e| SourceError::InvalidRequest(format!("{}: {}", identifier, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidRequest(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let url = url.as_str();

        let body = self.fetch_page(url).await?;
        // The parsed document is not Send; keep it out of any await
        let page = PageMeta::parse(&body);

        let doi = extract_doi(url).or_else(|| page.doi.clone());
        if let Some(doi) = doi.as_deref() {
            if let Some(record) = self.doi_chain.first_success(doi).await {
                return Ok(record);
            }
        }

        page.into_record(url, doi.unwrap_or_default())
    }
}

/// Metadata tags of one page, keys lowercased
#[derive(Debug, Default)]
struct PageMeta {
    tags: Vec<(String, String)>,
    html_title: String,
    doi: Option<String>,
}

impl PageMeta {
    fn parse(body: &str) -> Self {
        let document = Html::parse_document(body);

        let mut page = PageMeta::default();
        if let Ok(meta) = Selector::parse("meta[content]") {
            for element in document.select(&meta) {
                let value = element.value();
                let Some(content) = value.attr("content") else {
                    continue;
                };
                for key in [value.attr("name"), value.attr("property")].into_iter().flatten() {
                    page.tags
                        .push((key.trim().to_ascii_lowercase(), content.to_string()));
                }
            }
        }

        if let Ok(title) = Selector::parse("title") {
            if let Some(element) = document.select(&title).next() {
                page.html_title = clean(&element.text().collect::<String>());
            }
        }

        let doi = DOI_TAGS
            .iter()
            .flat_map(|name| page.all(name))
            .find_map(|value| extract_doi(&value));
        page.doi = doi;

        page
    }

    /// Every non-blank value of tag `name`, cleaned, in document order
    fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = String> + 'a {
        self.tags
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, content)| clean(content))
            .filter(|content| !content.is_empty())
    }

    /// The first non-blank value among `names`, in priority order
    fn first(&self, names: &[&str]) -> String {
        names
            .iter()
            .find_map(|name| self.all(name).next())
            .unwrap_or_default()
    }

    fn into_record(self, url: &str, doi: String) -> Result<MetadataRecord, SourceError> {
        let mut title = self.first(TITLE_TAGS);
        if title.is_empty() {
            title = self.html_title.clone();
        }

        let mut authors: Vec<String> = self.all("citation_author").collect();
        if authors.is_empty() {
            authors = self.all("dc.creator").take(1).collect();
        }

        let container = self.first(CONTAINER_TAGS);
        let year = year_re()
            .find(&self.first(DATE_TAGS))
            .and_then(|m| normalize_year(m.as_str()));

        if title.is_empty() && authors.is_empty() && container.is_empty() {
            return Err(SourceError::NotFound(format!("no metadata tags on {}", url)));
        }

        Ok(RecordBuilder::new(RecordSource::GenericPage)
            .title(title)
            .authors(authors)
            .year(year)
            .container(container)
            .abstract_text(self.first(ABSTRACT_TAGS))
            .doi(doi)
            .url(url)
            .build())
    }
}
