//! DOI registry resolver (doi.org content negotiation).

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use crate::config::{AuthorStyle, Config};
use crate::models::{MetadataRecord, RecordSource};
use crate::sources::csl::CslWork;
use crate::sources::{check_status, content_type, Resolver, ResolverCapabilities, SourceError};
use crate::utils::{normalize_doi, with_retry, HttpClient, RetryConfig};

const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";

/// Resolves DOIs through the registry's content negotiation.
///
/// The registry redirects to the agency (Crossref, DataCite, mEDRA, ...)
/// which answers with a CSL-JSON item. Only a 200 with a citation-style or
/// JSON content type counts as an answer.
#[derive(Debug, Clone)]
pub struct DoiRegistryResolver {
    client: HttpClient,
    base_url: String,
    author_style: AuthorStyle,
    retry: RetryConfig,
}

impl DoiRegistryResolver {
    pub fn new(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            author_style: AuthorStyle::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client, &config.endpoints.doi_base)
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

    async fn fetch(&self, doi: &str) -> Result<CslWork, SourceError> {
        let url = format!("{}/{}", self.base_url, doi);
        let client = &self.client;
        let url = url.as_str();

        let response = with_retry(self.retry, || async move {
            let response = client.get(url).header(ACCEPT, CSL_JSON).send().await?;
            check_status(response, "DOI registry")
        })
        .await?;

        // Anything else is usually the landing page the DOI redirects to
        let kind = content_type(&response);
        if response.status() != reqwest::StatusCode::OK
            || !(kind.starts_with("application/vnd.citationstyles")
                || kind.starts_with("application/json"))
        {
            return Err(SourceError::Parse(format!(
                "DOI registry answered {} with '{}'",
                response.status(),
                kind
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Resolver for DoiRegistryResolver {
    fn id(&self) -> &str {
        "doi.org"
    }

    fn name(&self) -> &str {
        "DOI registry"
    }

    fn kind(&self) -> RecordSource {
        RecordSource::Registry
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities::DOI_LOOKUP
    }

    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError> {
        let doi = normalize_doi(identifier)
            .ok_or_else(|| SourceError::InvalidRequest(format!("not a DOI: {}", identifier)))?;

        let work = self.fetch(&doi).await?;
        work.into_record(&doi, self.kind(), self.author_style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const NATURE_CSL: &str = r#"{
        "type": "article-journal",
        "title": "Human-level control through deep reinforcement learning",
        "author": [{"given": "Volodymyr", "family": "Mnih"}],
        "issued": {"date-parts": [[2015, 2, 26]]},
        "container-title": "Nature",
        "DOI": "10.1038/nature14539"
    }"#;

    fn resolver(server: &mockito::Server) -> DoiRegistryResolver {
        DoiRegistryResolver::new(HttpClient::new().unwrap(), &server.url())
            .with_retry_config(RetryConfig::no_retry())
    }

    #[tokio::test]
    async fn test_lookup_csl_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/10.1038/nature14539")
            .match_header("accept", CSL_JSON)
            .with_status(200)
            .with_header("content-type", "application/vnd.citationstyles.csl+json; charset=utf-8")
            .with_body(NATURE_CSL)
            .create_async()
            .await;

        let record = resolver(&server).lookup("doi:10.1038/nature14539").await.unwrap();

        assert_eq!(record.title(), "Human-level control through deep reinforcement learning");
        assert_eq!(record.year(), Some(2015));
        assert_eq!(record.container(), "Nature");
        assert_eq!(record.source(), RecordSource::Registry);
        assert_eq!(record.url(), "https://doi.org/10.1038/nature14539");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_html_answer_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/10\.1234/".to_string()))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>Landing page</body></html>")
            .create_async()
            .await;

        let resolver = resolver(&server);
        let result = resolver.lookup("10.1234/landing").await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
        assert!(resolver.resolve("10.1234/landing").await.is_none());
    }

    #[tokio::test]
    async fn test_not_found_and_invalid_input() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let resolver = resolver(&server);
        assert!(matches!(
            resolver.lookup("10.9999/missing").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            resolver.lookup("not a doi").await,
            Err(SourceError::InvalidRequest(_))
        ));
    }
}
