//! Crossref resolver: direct DOI lookup and bibliographic title search.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::config::{AuthorStyle, Config};
use crate::models::{MetadataRecord, RecordSource};
use crate::sources::csl::CslWork;
use crate::sources::{check_status, Resolver, ResolverCapabilities, SourceError};
use crate::utils::{normalize_doi, with_retry, HttpClient, RetryConfig};

/// Crossref bibliographic index
///
/// Uses the Crossref REST API: `/works/{doi}` for lookup and
/// `/works?query.bibliographic=...` for title search.
#[derive(Debug, Clone)]
pub struct CrossrefResolver {
    client: HttpClient,
    api_base: String,
    author_style: AuthorStyle,
    retry: RetryConfig,
}

impl CrossrefResolver {
    pub fn new(client: HttpClient, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            author_style: AuthorStyle::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client, &config.endpoints.crossref_api)
            .with_author_style(config.resolution.author_style)
            .with_retry_config(RetryConfig::from_settings(&config.retry))
    }

    pub fn with_author_style(mut self, style: AuthorStyle) -> Self {
        self.author_style = style;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let client = &self.client;

        let response = with_retry(self.retry, || async move {
            let response = client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            check_status(response, "Crossref")
        })
        .await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Resolver for CrossrefResolver {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn kind(&self) -> RecordSource {
        RecordSource::Index
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities::DOI_LOOKUP | ResolverCapabilities::TITLE_SEARCH
    }

    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError> {
        let doi = normalize_doi(identifier)
            .ok_or_else(|| SourceError::InvalidRequest(format!("not a DOI: {}", identifier)))?;

        let url = format!("{}/works/{}", self.api_base, urlencoding::encode(&doi));
        let envelope: WorkEnvelope = self.get_json(&url).await?;

        envelope
            .message
            .into_record(&doi, self.kind(), self.author_style)
    }

    async fn search_by_title(
        &self,
        title: &str,
        rows: usize,
    ) -> Result<Vec<MetadataRecord>, SourceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SourceError::InvalidRequest("empty title".to_string()));
        }

        let url = format!(
            "{}/works?query.bibliographic={}&rows={}",
            self.api_base,
            urlencoding::encode(title),
            rows.max(1)
        );
        let envelope: SearchEnvelope = self.get_json(&url).await?;

        // Items without a DOI cannot be re-resolved, and the DOI is the
        // record's identity
        let records = envelope
            .message
            .items
            .into_iter()
            .filter_map(|item| {
                let doi = item.doi.as_deref().and_then(normalize_doi)?;
                item.work
                    .into_record(&doi, RecordSource::TitleSearch, self.author_style)
                    .ok()
            })
            .collect();

        Ok(records)
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct WorkEnvelope {
    message: CslWork,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    message: SearchMessage,
}

#[derive(Debug, Deserialize)]
struct SearchMessage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(flatten)]
    work: CslWork,
}
