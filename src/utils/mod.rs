//! Utility modules supporting metadata resolution.
//!
//! - [`clean`] / [`clean_abstract`]: Strip markup and entities, collapse whitespace
//! - [`parse_year`] / [`normalize_year`]: Turn loosely formatted values into a year
//! - [`extract_doi`] / [`extract_arxiv_id`]: Find identifiers in free text and URLs
//! - [`similarity`] / [`select_best`]: Token-set title matching
//! - [`HttpClient`]: Shared HTTP client with timeouts and a polite user agent
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//!
//! # Identifiers
//!
//! ```rust
//! use paper_meta::utils::{extract_arxiv_id, extract_doi};
//!
//! assert_eq!(
//!     extract_doi("https://doi.org/10.1038/nature14539").as_deref(),
//!     Some("10.1038/nature14539")
//! );
//! assert_eq!(
//!     extract_arxiv_id("https://arxiv.org/pdf/1706.03762v2.pdf").as_deref(),
//!     Some("1706.03762")
//! );
//! ```
//!
//! # Title matching
//!
//! ```rust
//! use paper_meta::utils::similarity;
//!
//! assert_eq!(similarity("Attention Is All You Need", "attention is all you need"), 1.0);
//! assert_eq!(similarity("", "anything"), 0.0);
//! ```

mod http;
mod identifiers;
mod matching;
mod retry;
mod text;

pub use http::HttpClient;
pub use identifiers::{doi_url, extract_arxiv_id, extract_doi, normalize_doi};
pub use matching::{select_best, similarity};
pub use retry::{with_retry, RetryConfig, TransientError};
pub use text::{
    clean, clean_abstract, collapse_whitespace, current_year, normalize_year, parse_year,
    truncate_chars, PLAUSIBLE_MIN_YEAR, RECORD_MIN_YEAR,
};
