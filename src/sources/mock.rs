//! Mock resolver for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::{MetadataRecord, RecordSource};
use crate::sources::{Resolver, ResolverCapabilities, SourceError};

type ErrorFactory = Arc<dyn Fn() -> SourceError + Send + Sync>;

/// A resolver that returns predefined answers and counts its calls.
///
/// With nothing configured every lookup is `NotFound`.
pub struct MockResolver {
    id: String,
    kind: RecordSource,
    capabilities: ResolverCapabilities,
    record: Mutex<Option<MetadataRecord>>,
    error: Mutex<Option<ErrorFactory>>,
    candidates: Mutex<Vec<MetadataRecord>>,
    identifiers: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockResolver {
    /// Create a new mock resolver.
    pub fn new(id: &str, kind: RecordSource) -> Self {
        Self {
            id: id.to_string(),
            kind,
            capabilities: ResolverCapabilities::DOI_LOOKUP,
            record: Mutex::new(None),
            error: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
            identifiers: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: ResolverCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the record returned by `lookup`.
    pub fn set_record(&self, record: MetadataRecord) {
        *lock(&self.record) = Some(record);
    }

    /// Make `lookup` fail with the error built by `factory`.
    pub fn set_error<F>(&self, factory: F)
    where
        F: Fn() -> SourceError + Send + Sync + 'static,
    {
        *lock(&self.error) = Some(Arc::new(factory));
    }

    /// Set the candidates returned by `search_by_title`.
    pub fn set_candidates(&self, candidates: Vec<MetadataRecord>) {
        *lock(&self.candidates) = candidates;
    }

    /// Number of lookups and searches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Identifiers and titles received, in call order.
    pub fn identifiers(&self) -> Vec<String> {
        lock(&self.identifiers).clone()
    }

    fn record_call(&self, identifier: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.identifiers).push(identifier.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl std::fmt::Debug for MockResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockResolver")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl Resolver for MockResolver {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Resolver"
    }

    fn kind(&self) -> RecordSource {
        self.kind
    }

    fn capabilities(&self) -> ResolverCapabilities {
        self.capabilities
    }

    async fn lookup(&self, identifier: &str) -> Result<MetadataRecord, SourceError> {
        self.record_call(identifier);

        if let Some(record) = lock(&self.record).clone() {
            return Ok(record);
        }
        if let Some(factory) = lock(&self.error).clone() {
            return Err(factory());
        }
        Err(SourceError::NotFound(format!("mock has no record for {}", identifier)))
    }

    async fn search_by_title(
        &self,
        title: &str,
        rows: usize,
    ) -> Result<Vec<MetadataRecord>, SourceError> {
        if !self.supports_title_search() {
            return Err(SourceError::NotImplemented);
        }
        self.record_call(title);

        Ok(lock(&self.candidates).iter().take(rows).cloned().collect())
    }
}
