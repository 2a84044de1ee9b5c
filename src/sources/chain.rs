//! Ordered chains of resolvers.

use std::sync::Arc;
use std::time::Duration;

use super::Resolver;
use crate::models::MetadataRecord;

bitflags::bitflags! {
    /// Capabilities that a resolver can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResolverCapabilities: u32 {
        /// Lookup by DOI
        const DOI_LOOKUP = 1 << 0;
        /// Lookup by preprint id or preprint URL
        const PREPRINT_LOOKUP = 1 << 1;
        /// Lookup by arbitrary web page URL
        const PAGE_LOOKUP = 1 << 2;
        /// Candidate search by title
        const TITLE_SEARCH = 1 << 3;
    }
}

/// An ordered list of resolvers tried one after another
///
/// Resolvers are queried sequentially; the first one that produces a
/// record ends the walk. An optional polite delay is slept between two
/// consecutive resolvers, never before the first one.
#[derive(Debug, Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn Resolver>>,
    polite_delay: Duration,
}

impl ResolverChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause inserted between consecutive resolvers
    pub fn with_polite_delay(mut self, delay: Duration) -> Self {
        self.polite_delay = delay;
        self
    }

    /// Append a resolver (builder style)
    pub fn with(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.push(resolver);
        self
    }

    /// Append a resolver
    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    /// Get a resolver by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.iter().find(|r| r.id() == id)
    }

    /// Get all resolver IDs, in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resolvers.iter().map(|r| r.id())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Walk the chain and return the first record produced
    pub async fn first_success(&self, identifier: &str) -> Option<MetadataRecord> {
        for (index, resolver) in self.resolvers.iter().enumerate() {
            if index > 0 && !self.polite_delay.is_zero() {
                tokio::time::sleep(self.polite_delay).await;
            }

            if let Some(record) = resolver.resolve(identifier).await {
                tracing::debug!(resolver = resolver.id(), identifier, "resolved");
                return Some(record);
            }
        }

        None
    }
}
