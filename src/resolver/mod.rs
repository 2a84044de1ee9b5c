//! The orchestrator: picks resolvers for an input, falls back and enriches.
//!
//! ```text
//! DOI  -> DOI chain (registry, index)
//! URL  -> arXiv id? preprint chain (+ DOI chain enrichment)
//!      -> DOI in URL? DOI chain
//!      -> page chain (generic page, re-dispatching found DOIs)
//! PDF  -> hints -> DOI chain (scored against the hint title)
//!               -> title search + best match
//!               -> hint-only record
//! ```
//!
//! When several inputs are given they are tried in that order and the
//! first record wins. Remote failures never surface: only an unusable PDF
//! or an empty input is an error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use crate::models::{MetadataRecord, PdfHints, RecordBuilder, RecordSource, ResolveInput};
use crate::pdf::{extract_hints, PdfExtractError};
use crate::sources::{
    ArxivResolver, CrossrefResolver, DoiRegistryResolver, HtmlMetaResolver, Resolver,
    ResolverChain, SourceError,
};
use crate::utils::{
    extract_arxiv_id, extract_doi, normalize_doi, select_best, similarity, HttpClient,
};

/// Errors surfaced to callers of [`MetadataResolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unusable PDF: {0}")]
    Pdf(#[from] PdfExtractError),

    #[error("Nothing to resolve: supply a DOI, a URL or a PDF path")]
    NoInput,
}

/// Resolves DOIs, URLs and PDFs into one [`MetadataRecord`]
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    doi_chain: ResolverChain,
    preprint_chain: ResolverChain,
    page_chain: ResolverChain,
    title_search: Option<Arc<dyn Resolver>>,
    polite_delay: Duration,
    search_rows: usize,
    pdf_max_pages: usize,
}

impl MetadataResolver {
    /// A resolver that only knows the given DOI chain
    pub fn new(doi_chain: ResolverChain) -> Self {
        Self {
            doi_chain,
            preprint_chain: ResolverChain::new(),
            page_chain: ResolverChain::new(),
            title_search: None,
            polite_delay: Duration::ZERO,
            search_rows: 5,
            pdf_max_pages: 2,
        }
    }

    /// Build the standard resolvers from configuration.
    ///
    /// DOIs go to the registry, then Crossref; Crossref also serves title
    /// search. arXiv handles preprints and the generic page resolver
    /// re-dispatches DOIs it finds to the same DOI chain.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http)?;
        let delay = config.resolution.polite_delay();

        let crossref: Arc<dyn Resolver> =
            Arc::new(CrossrefResolver::from_config(client.clone(), config));
        let doi_chain = ResolverChain::new()
            .with_polite_delay(delay)
            .with(Arc::new(DoiRegistryResolver::from_config(client.clone(), config)))
            .with(crossref.clone());

        let arxiv = Arc::new(ArxivResolver::from_config(client.clone(), config));
        let page = Arc::new(HtmlMetaResolver::from_config(client, doi_chain.clone(), config));

        Ok(Self::new(doi_chain)
            .with_preprint(arxiv)
            .with_page(page)
            .with_title_search(crossref)
            .with_polite_delay(delay)
            .with_search_rows(config.resolution.search_rows)
            .with_pdf_max_pages(config.resolution.pdf_max_pages))
    }

    /// Add a preprint resolver (tried for URLs carrying an arXiv id)
    pub fn with_preprint(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.preprint_chain.push(resolver);
        self
    }

    /// Add a generic page resolver (tried last for URLs)
    pub fn with_page(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.page_chain.push(resolver);
        self
    }

    /// Set the resolver used for PDF title search
    pub fn with_title_search(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.title_search = Some(resolver);
        self
    }

    /// Pause inserted between consecutive network steps of one resolution,
    /// including between resolvers of every chain
    pub fn with_polite_delay(mut self, delay: Duration) -> Self {
        self.polite_delay = delay;
        self.doi_chain = self.doi_chain.with_polite_delay(delay);
        self.preprint_chain = self.preprint_chain.with_polite_delay(delay);
        self.page_chain = self.page_chain.with_polite_delay(delay);
        self
    }

    pub fn with_search_rows(mut self, rows: usize) -> Self {
        self.search_rows = rows.max(1);
        self
    }

    pub fn with_pdf_max_pages(mut self, pages: usize) -> Self {
        self.pdf_max_pages = pages.max(1);
        self
    }

    /// The DOI chain, in lookup order
    pub fn doi_chain(&self) -> &ResolverChain {
        &self.doi_chain
    }

    /// Resolve the caller's input.
    ///
    /// The DOI is tried first, then the URL, then the PDF. When everything
    /// comes back empty the result is a zero-confidence record that keeps
    /// the caller's own DOI and URL.
    pub async fn resolve(&self, input: &ResolveInput) -> Result<MetadataRecord, ResolveError> {
        if input.is_empty() {
            return Err(ResolveError::NoInput);
        }

        let doi = input.doi_str().map(|d| normalize_doi(d).unwrap_or_else(|| d.to_string()));
        let url = input.url_str();
        let mut pacer = Pacer::new(self.polite_delay);

        if let Some(doi) = doi.as_deref() {
            pacer.pause().await;
            if let Some(record) = self.resolve_doi(doi).await {
                return Ok(record);
            }
        }

        if let Some(url) = url {
            pacer.pause().await;
            if let Some(record) = self.resolve_url(url).await {
                return Ok(record);
            }
        }

        if let Some(path) = input.pdf_path.as_deref() {
            pacer.pause().await;
            let record = self.resolve_pdf(path).await?;
            if is_resolved(&record) || (doi.is_none() && url.is_none()) {
                return Ok(record);
            }

            // Keep the hint title, but the caller's identifiers win
            let mut builder = RecordBuilder::from_record(record);
            if let Some(doi) = doi.as_deref() {
                builder = builder.doi(doi);
            }
            if let Some(url) = url {
                builder = builder.url(url);
            }
            return Ok(builder.build());
        }

        tracing::info!(doi = ?doi, url = ?url, "No resolver produced a record");
        Ok(MetadataRecord::unresolved(doi.as_deref(), url))
    }

    /// Resolve a DOI through the DOI chain
    pub async fn resolve_doi(&self, doi: &str) -> Option<MetadataRecord> {
        let Some(doi) = normalize_doi(doi) else {
            tracing::debug!(doi, "Not a DOI");
            return None;
        };

        let record = self.doi_chain.first_success(&doi).await;
        if let Some(record) = &record {
            tracing::info!(doi = %doi, source = record.source().id(), "Resolved DOI");
        }
        record
    }

    /// Resolve a URL: arXiv first, then a DOI in the URL, then the page.
    ///
    /// A preprint that names its published DOI is enriched from the DOI
    /// chain; see [`merge_enrichment`].
    pub async fn resolve_url(&self, url: &str) -> Option<MetadataRecord> {
        let mut pacer = Pacer::new(self.polite_delay);

        if let Some(arxiv_id) = extract_arxiv_id(url) {
            if !self.preprint_chain.is_empty() {
                pacer.pause().await;
                if let Some(preprint) = self.preprint_chain.first_success(&arxiv_id).await {
                    tracing::info!(arxiv_id = %arxiv_id, "Resolved preprint");
                    if preprint.doi().is_empty() {
                        return Some(preprint);
                    }

                    pacer.pause().await;
                    return match self.resolve_doi(preprint.doi()).await {
                        Some(published) => Some(merge_enrichment(preprint, published)),
                        None => Some(preprint),
                    };
                }
            }
        }

        if let Some(doi) = extract_doi(url) {
            pacer.pause().await;
            if let Some(record) = self.resolve_doi(&doi).await {
                return Some(record);
            }
        }

        if self.page_chain.is_empty() {
            return None;
        }
        pacer.pause().await;
        let record = self.page_chain.first_success(url).await;
        if let Some(record) = &record {
            tracing::info!(url, source = record.source().id(), "Resolved page");
        }
        record
    }

    /// Resolve a PDF from the hints on its first pages.
    ///
    /// Fails only when the PDF itself is unusable.
    pub async fn resolve_pdf(&self, path: &Path) -> Result<MetadataRecord, ResolveError> {
        let hints = self.hints(path)?;
        let title_hint = hints.title_hint.as_deref();
        let mut pacer = Pacer::new(self.polite_delay);

        if let Some(doi) = hints.doi.as_deref() {
            pacer.pause().await;
            if let Some(record) = self.resolve_doi(doi).await {
                let confidence = match title_hint {
                    Some(hint) => similarity(hint, record.title()),
                    None => 1.0,
                };
                return Ok(RecordBuilder::from_record(record)
                    .confidence(confidence)
                    .build());
            }
        }

        if let (Some(hint), Some(search)) = (title_hint, self.title_search.as_ref()) {
            pacer.pause().await;
            match search.search_by_title(hint, self.search_rows).await {
                Ok(candidates) => {
                    if let (Some(best), score) = select_best(hint, candidates) {
                        tracing::info!(
                            title = hint,
                            score,
                            doi = best.doi(),
                            "Matched PDF title"
                        );
                        return Ok(RecordBuilder::from_record(best)
                            .source(RecordSource::TitleSearch)
                            .confidence(score)
                            .build());
                    }
                }
                Err(error) => {
                    tracing::debug!(resolver = search.id(), %error, "Title search failed");
                }
            }
        }

        Ok(hint_record(&hints))
    }

    /// Extract hints from the PDF at `path` without any network access
    pub fn hints(&self, path: &Path) -> Result<PdfHints, ResolveError> {
        Ok(extract_hints(path, self.pdf_max_pages)?)
    }
}

/// Merge a preprint with the record of its published version.
///
/// The published record's bibliographic fields win when present; the
/// preprint keeps its abstract and URL when it has them. The result is
/// tagged with the published record's source.
pub fn merge_enrichment(preprint: MetadataRecord, published: MetadataRecord) -> MetadataRecord {
    fn pick<'a>(first: &'a str, second: &'a str) -> &'a str {
        if first.is_empty() {
            second
        } else {
            first
        }
    }

    let authors = if published.authors().is_empty() {
        preprint.authors().to_vec()
    } else {
        published.authors().to_vec()
    };

    RecordBuilder::new(published.source())
        .title(pick(published.title(), preprint.title()))
        .authors(authors)
        .year(published.year().or(preprint.year()))
        .container(pick(published.container(), preprint.container()))
        .abstract_text(pick(preprint.abstract_text(), published.abstract_text()))
        .doi(pick(published.doi(), preprint.doi()))
        .url(pick(preprint.url(), published.url()))
        .build()
}

/// The zero-confidence record made from hints alone
fn hint_record(hints: &PdfHints) -> MetadataRecord {
    match hints.title_hint.as_deref() {
        Some(title) => RecordBuilder::new(RecordSource::PdfHint)
            .title(title)
            .confidence(0.0)
            .build(),
        None => MetadataRecord::unresolved(None, None),
    }
}

fn is_resolved(record: &MetadataRecord) -> bool {
    !matches!(record.source(), RecordSource::PdfHint | RecordSource::None)
}

/// Sleeps the polite delay before every network step but the first
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    async fn pause(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}
