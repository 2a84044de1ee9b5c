//! arXiv resolver (Atom feed of the export API).

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::config::Config;
use crate::models::{MetadataRecord, RecordBuilder, RecordSource};
use crate::sources::{check_status, Resolver, ResolverCapabilities, SourceError};
use crate::utils::{clean, extract_arxiv_id, normalize_doi, parse_year, with_retry, HttpClient, RetryConfig};

/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

/// Container used when a preprint has no journal reference
const ARXIV_CONTAINER: &str = "arXiv";

/// arXiv preprint resolver
///
/// Accepts an arXiv id in any form [`extract_arxiv_id`] understands and
/// reads the single matching entry of the export API's Atom feed. The
/// published DOI and journal reference, when arXiv has them, come from the
/// `arxiv:` extension elements.
#[derive(Debug, Clone)]
pub struct ArxivResolver {
    client: HttpClient,
    api_url: String,
    retry: RetryConfig,
}

impl ArxivResolver {
    pub fn new(client: HttpClient, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client, &config.endpoints.arxiv_api)
            .with_retry_config(RetryConfig::from_settings(&config.retry))
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn entry_to_record(id: &str, entry: AtomEntry) -> Result<MetadataRecord, SourceError> {
        // Unknown or malformed ids come back as an entry in the errors namespace
        if entry.id.contains("/api/errors") {
            return Err(SourceError::NotFound(format!(
                "arXiv rejected {}: {}",
                id,
                clean(&entry.summary)
            )));
        }

        let title = clean(&entry.title);
        if title.is_empty() {
            return Err(SourceError::NotFound(format!("arXiv has no entry for {}", id)));
        }

        let journal_ref = clean(&entry.journal_ref);
        let container = if journal_ref.is_empty() {
            ARXIV_CONTAINER.to_string()
        } else {
            journal_ref
        };

        let doi = normalize_doi(&entry.doi).unwrap_or_default();
        let url = match entry.id.trim() {
            "" => format!("{}/{}", ARXIV_ABS_URL, id),
            link => link.to_string(),
        };

        Ok(RecordBuilder::new(RecordSource::Preprint)
            .title(title)
            .authors(entry.authors.iter().map(|a| clean(a)).filter(|a| !a.is_empty()).collect())
            .year(parse_year(entry.published.trim()))
            .container(container)
            .abstract_text(clean(&entry.summary))
            .doi(doi)
            .url(url)
            .build())
    }
}

#[async_trait]
impl Resolver for ArxivResolver {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn kind(&self) -> RecordSource {
        RecordSource::Preprint
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities::PREPRINT_LOOKUP
    }

    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError> {
        let id = extract_arxiv_id(identifier).ok_or_else(|| {
            SourceError::InvalidRequest(format!("not an arXiv id: {}", identifier))
        })?;

        let client = &self.client;
        let api_url = self.api_url.as_str();
        let id_ref = id.as_str();

        let response = with_retry(self.retry, || async move {
            let response = client
                .get(api_url)
                .query(&[("id_list", id_ref)])
                .send()
                .await?;
            check_status(response, "arXiv")
        })
        .await?;

        let body = response.text().await?;
        let entry = parse_first_entry(&body)?
            .ok_or_else(|| SourceError::NotFound(format!("arXiv has no entry for {}", id)))?;

        Self::entry_to_record(&id, entry)
    }
}

/// Fields of one Atom `<entry>`
#[derive(Debug, Default)]
struct AtomEntry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    doi: String,
    journal_ref: String,
}

/// Parse the first `<entry>` of an Atom feed.
///
/// Elements are matched by local name: the Atom elements (`id`, `title`,
/// `summary`, `published`, `author/name`) and arXiv's extension elements
/// (`doi`, `journal_ref`) do not collide.
fn parse_first_entry(xml: &str) -> Result<Option<AtomEntry>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<AtomEntry> = None;
    let mut author = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "entry" && entry.is_none() {
                    entry = Some(AtomEntry::default());
                } else if name == "author" {
                    author.clear();
                }
                path.push(name);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.pop();

                match name.as_str() {
                    "author" => {
                        if let Some(entry) = entry.as_mut() {
                            entry.authors.push(std::mem::take(&mut author));
                        }
                    }
                    "entry" => break,
                    _ => {}
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                append_text(&path, entry.as_mut(), &mut author, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_text(&path, entry.as_mut(), &mut author, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entry)
}

fn append_text(path: &[String], entry: Option<&mut AtomEntry>, author: &mut String, text: &str) {
    let Some(entry) = entry else {
        return;
    };

    // Only direct children of <entry>, plus <author><name>
    let depth = path.iter().rposition(|p| p == "entry");
    let Some(depth) = depth else {
        return;
    };
    let inner: Vec<&str> = path[depth + 1..].iter().map(String::as_str).collect();

    let field = match inner.as_slice() {
        ["id"] => &mut entry.id,
        ["title"] => &mut entry.title,
        ["summary"] => &mut entry.summary,
        ["published"] => &mut entry.published,
        ["doi"] => &mut entry.doi,
        ["journal_ref"] => &mut entry.journal_ref,
        ["author", "name"] => author,
        _ => return,
    };
    field.push_str(text);
}
