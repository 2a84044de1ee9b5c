//! DOI and arXiv identifier extraction.
//!
//! Pure pattern matching: nothing here touches the network, and a failed
//! match is simply `None`.

use std::sync::OnceLock;

use regex::Regex;

fn doi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(10\.\d{4,9}/[-._;()/:A-Z0-9]+)").expect("valid DOI regex")
    })
}

fn arxiv_prefixed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:arxiv\.org/(?:abs|pdf)/|arxiv:)\s*(\d{4}\.\d{4,5}|[a-z\-]+(?:\.[a-z]{2})?/\d{7})(?:v\d+)?",
        )
        .expect("valid arXiv regex")
    })
}

fn arxiv_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{4}\.\d{4,5}|[a-z\-]+(?:\.[a-z]{2})?/\d{7})(?:v\d+)?$")
            .expect("valid arXiv regex")
    })
}

fn doi_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:doi:\s*|(?:https?://)?(?:dx\.)?doi\.org/)").expect("valid prefix regex")
    })
}

/// Find the first DOI in `text`.
///
/// Trailing `)`, `.`, `,` and `;` are not part of the returned DOI.
pub fn extract_doi(text: &str) -> Option<String> {
    let found = doi_re().captures(text)?.get(1)?.as_str();
    let doi = found.trim_end_matches([')', '.', ',', ';']);

    // "10.1234/" alone is not a DOI
    match doi.split_once('/') {
        Some((_, suffix)) if !suffix.is_empty() => Some(doi.to_string()),
        _ => None,
    }
}

/// Find an arXiv identifier in a URL, an `arXiv:` reference or a bare id.
///
/// Both new-style (`1706.03762`) and old-style (`cs/0112017`) ids are
/// recognized. A version suffix such as `v2` is dropped.
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    let text = text.trim();

    if let Some(caps) = arxiv_prefixed_re().captures(text) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    arxiv_bare_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Normalize a DOI typed by a user.
///
/// Strips `doi:` and resolver URL prefixes, percent-decodes, removes
/// whitespace and lowercases (DOIs are case-insensitive). Returns `None` when
/// nothing DOI-shaped remains.
pub fn normalize_doi(input: &str) -> Option<String> {
    let stripped = doi_prefix_re().replace(input.trim(), "");
    let decoded = urlencoding::decode(&stripped)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| stripped.to_string());
    let compact: String = decoded.chars().filter(|c| !c.is_whitespace()).collect();

    extract_doi(&compact).map(|doi| doi.to_lowercase())
}

/// The registry URL of a DOI
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doi_from_urls() {
        assert_eq!(
            extract_doi("https://doi.org/10.1038/nature14539").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            extract_doi("doi.org/10.1038/nature14539?foo=bar").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            extract_doi("https://doi.org/10.1145/3290605.3300233#main").as_deref(),
            Some("10.1145/3290605.3300233")
        );
    }

    #[test]
    fn test_extract_doi_strips_trailing_punctuation() {
        assert_eq!(
            extract_doi("see (doi 10.1000/xyz123).").as_deref(),
            Some("10.1000/xyz123")
        );
        assert_eq!(
            extract_doi("DOI: 10.1103/PhysRevLett.116.061102, received").as_deref(),
            Some("10.1103/PhysRevLett.116.061102")
        );
    }

    #[test]
    fn test_extract_doi_none() {
        assert_eq!(extract_doi(""), None);
        assert_eq!(extract_doi("no identifier here"), None);
        assert_eq!(extract_doi("10.12/too-short-prefix"), None);
    }

    #[test]
    fn test_extract_arxiv_id_forms() {
        for input in [
            "https://arxiv.org/abs/1706.03762",
            "arxiv.org/abs/1706.03762",
            "https://arxiv.org/pdf/1706.03762v2.pdf",
            "arXiv:1706.03762",
            "arXiv: 1706.03762v5",
            "1706.03762",
            "1706.03762v3",
        ] {
            assert_eq!(
                extract_arxiv_id(input).as_deref(),
                Some("1706.03762"),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_extract_arxiv_id_old_style() {
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/abs/cs/0112017v1").as_deref(),
            Some("cs/0112017")
        );
        assert_eq!(
            extract_arxiv_id("math.GT/0309136").as_deref(),
            Some("math.GT/0309136")
        );
        assert_eq!(extract_arxiv_id("hep-th/9901001").as_deref(), Some("hep-th/9901001"));
    }

    #[test]
    fn test_extract_arxiv_id_none() {
        assert_eq!(extract_arxiv_id("https://example.com/paper/1706"), None);
        assert_eq!(extract_arxiv_id("the year 1706.03762 appears in text"), None);
        assert_eq!(extract_arxiv_id(""), None);
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(
            normalize_doi("doi:10.1038/nature14539").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            normalize_doi(" https://dx.doi.org/10.1038/nature14539 ").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            normalize_doi("10.1002/%28SICI%291097").as_deref(),
            Some("10.1002/(sici)1097")
        );
        assert_eq!(normalize_doi("not-a-doi"), None);
    }

    #[test]
    fn test_normalize_doi_lowercases() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1038/NATURE14539").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            normalize_doi("DOI: 10.1103/PhysRevLett.116.061102").as_deref(),
            Some("10.1103/physrevlett.116.061102")
        );
        // extraction from free text keeps the case it found
        assert_eq!(
            extract_doi("10.1103/PhysRevLett.116.061102").as_deref(),
            Some("10.1103/PhysRevLett.116.061102")
        );
    }

    #[test]
    fn test_doi_url() {
        assert_eq!(doi_url("10.1/x"), "https://doi.org/10.1/x");
    }
}
