//! # Paper Meta
//!
//! Resolve a DOI, a URL, an arXiv link or a PDF file into one normalized
//! bibliographic record.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (MetadataRecord, PdfHints, ResolveInput)
//! - [`sources`]: Metadata resolvers behind the [`Resolver`] trait, and ordered chains of them
//! - [`resolver`]: The orchestrator that picks resolvers, falls back and enriches
//! - [`pdf`]: PDF text/layout access and the hint extractor
//! - [`utils`]: Text normalization, identifier extraction, title matching, HTTP and retry
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod pdf;
pub mod resolver;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{MetadataRecord, PdfHints, RecordSource, ResolveInput};
pub use resolver::{MetadataResolver, ResolveError};
pub use sources::{Resolver, ResolverChain};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
