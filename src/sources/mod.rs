//! Metadata resolvers with a trait-based architecture.
//!
//! Every backend implements the [`Resolver`] trait. A resolver answers a
//! single question: given an identifier (a DOI, an arXiv id, a page URL),
//! what is the bibliographic record? Lookups return a typed
//! [`SourceError`]; [`Resolver::resolve`] folds every error into `None` so
//! the orchestrator only ever decides on "record or nothing".
//!
//! Resolvers are grouped into ordered [`ResolverChain`]s. The first resolver
//! in a chain that produces a record wins; adding a backend means pushing it
//! onto a chain, not touching the orchestrator.
//!
//! | Resolver | Identifier | Record source |
//! |----------|------------|---------------|
//! | [`DoiRegistryResolver`] | DOI | `registry` |
//! | [`CrossrefResolver`] | DOI, or a title via [`Resolver::search_by_title`] | `index` |
//! | [`ArxivResolver`] | arXiv id, `arxiv.org` URL | `preprint` |
//! | [`HtmlMetaResolver`] | any page URL | `generic-page` (or the DOI chain's) |

mod arxiv;
mod chain;
mod crossref;
mod csl;
mod doi_org;
mod html_meta;

pub mod mock;

pub use arxiv::ArxivResolver;
pub use chain::{ResolverCapabilities, ResolverChain};
pub use crossref::CrossrefResolver;
pub use doi_org::DoiRegistryResolver;
pub use html_meta::HtmlMetaResolver;
pub use mock::MockResolver;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};

use crate::models::{MetadataRecord, RecordSource};

/// The Resolver trait defines the interface for all metadata backends.
///
/// # Implementing a New Resolver
///
/// 1. Create a struct that implements `Resolver`
/// 2. Implement `id`, `name`, `kind`, `capabilities` and `lookup`
/// 3. Override `search_by_title` if the backend can search
/// 4. Push it onto the [`ResolverChain`] it belongs to
#[async_trait]
pub trait Resolver: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this resolver (e.g. "crossref", "arxiv")
    fn id(&self) -> &str;

    /// Human-readable name of this resolver
    fn name(&self) -> &str;

    /// Source tag carried by the records this resolver produces
    fn kind(&self) -> RecordSource;

    /// Describe the capabilities of this resolver
    fn capabilities(&self) -> ResolverCapabilities;

    /// Whether this resolver supports searching by title
    fn supports_title_search(&self) -> bool {
        self.capabilities()
            .contains(ResolverCapabilities::TITLE_SEARCH)
    }

    /// Look up one identifier
    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError>;

    /// Look up one identifier, folding every failure into `None`
    async fn resolve(&self, identifier: &str) -> Option<MetadataRecord> {
        match self.lookup(identifier).await {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::debug!(
                    resolver = self.id(),
                    identifier,
                    %error,
                    "lookup returned nothing"
                );
                None
            }
        }
    }

    /// Search for candidate records by title
    async fn search_by_title(
        &self,
        _title: &str,
        _rows: usize,
    ) -> Result<Vec<MetadataRecord>, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when talking to a metadata backend
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this resolver
    #[error("Operation not implemented for this resolver")]
    NotImplemented,

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Connect or read timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Parsing error (XML, JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded, with the server's Retry-After in seconds if sent
    #[error("Rate limit exceeded")]
    RateLimit(Option<u64>),

    /// Well-formed answer without a usable record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

/// Map a non-success response to the matching error
pub(crate) fn check_status(response: Response, what: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            SourceError::RateLimit(retry_after)
        }
        StatusCode::NOT_FOUND => SourceError::NotFound(format!("{} not found", what)),
        _ => SourceError::Api {
            status: status.as_u16(),
            message: format!("{} returned {}", what, status),
        },
    })
}

/// Content type of a response, lowercased, without parameters
pub(crate) fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .unwrap_or_default()
}
