//! PDF hint extraction: DOI, title and year guessed from the first pages.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{PdfDocument, PdfExtractError, TextSpan};
use crate::models::PdfHints;
use crate::utils::{clean, extract_doi, normalize_year, truncate_chars};

/// Share of the page height, from the top, searched for the title
const TITLE_REGION: f32 = 0.3;

/// Spans at this share of the largest top-region font size are title candidates
const TITLE_SIZE_RATIO: f32 = 0.9;

/// Vertical distance, in font sizes, over which spans continue one line
const LINE_CONTINUATION: f32 = 1.6;

/// Lines of page-1 text scanned by the plain-text fallback
const FALLBACK_LINES: usize = 15;

const SAMPLE_CHARS: usize = 2000;

fn noise_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:abstract|introduction|keywords|doi|issn|copyright|proceedings|volume)\b|\b(?:vol|no)\.",
        )
        .expect("valid noise regex")
    })
}

fn fallback_stop_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:abstract|introduction|keywords|doi)\b").expect("valid stop regex")
    })
}

fn fallback_skip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)arxiv|issn|www|http").expect("valid skip regex"))
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"))
}

/// Extract hints from the first `max_pages` pages of the PDF at `path`.
///
/// Fails only when the file cannot be read or parsed. A readable PDF with no
/// text gives empty hints.
pub fn extract_hints(path: &Path, max_pages: usize) -> Result<PdfHints, PdfExtractError> {
    let document = PdfDocument::open(path)?;
    let hints = hints_from_document(&document, max_pages);

    tracing::debug!(
        path = %path.display(),
        doi = ?hints.doi,
        title = ?hints.title_hint,
        year = ?hints.year_hint,
        "Extracted PDF hints"
    );

    Ok(hints)
}

/// Hints from an already loaded document
pub fn hints_from_document(document: &PdfDocument, max_pages: usize) -> PdfHints {
    let pages = max_pages.max(1).min(document.page_count());
    let texts: Vec<String> = (0..pages).map(|i| document.page_text(i)).collect();

    let doi = texts.iter().find_map(|text| extract_doi(text));

    let title_hint = if pages == 0 {
        None
    } else {
        let layout = document.page_layout(0);
        title_from_spans(&layout.spans, layout.height).or_else(|| title_from_text(&texts[0]))
    };

    let year_hint = texts.iter().filter_map(|text| year_from_text(text)).min();

    let sample = texts.join("\n");
    let sample_text = truncate_chars(sample.trim(), SAMPLE_CHARS).to_string();

    PdfHints {
        doi,
        title_hint,
        year_hint,
        sample_text,
    }
}

/// Title from the largest text in the top region of page 1.
///
/// Spans in the top 30% at 90% or more of the largest size there are taken
/// in reading order and merged into lines while they stay within 1.6 font
/// sizes of each other. Noise lines are dropped and the first two remaining
/// lines form the title.
pub fn title_from_spans(spans: &[TextSpan], page_height: f32) -> Option<String> {
    let region: Vec<&TextSpan> = spans
        .iter()
        .filter(|s| s.top < TITLE_REGION * page_height && s.text.trim().chars().count() > 3)
        .collect();

    let max_size = region.iter().map(|s| s.size).fold(0.0_f32, f32::max);
    if max_size <= 0.0 {
        return None;
    }

    let mut big: Vec<&TextSpan> = region
        .into_iter()
        .filter(|s| s.size >= TITLE_SIZE_RATIO * max_size)
        .collect();
    big.sort_by(|a, b| a.top.total_cmp(&b.top).then(b.size.total_cmp(&a.size)));

    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut last_top: Option<f32> = None;

    for span in big {
        let continues = last_top.map_or(true, |last| {
            (span.top - last).abs() <= LINE_CONTINUATION * span.size
        });
        if !continues && !current.is_empty() {
            lines.push(current.join(" "));
            current.clear();
        }
        current.push(span.text.trim());
        last_top = Some(span.top);
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    let kept: Vec<String> = lines
        .iter()
        .map(|line| clean(line))
        .filter(|line| line.chars().count() >= 5 && !noise_regex().is_match(line))
        .take(2)
        .collect();

    let title = clean(&kept.join(" "));
    (!title.is_empty()).then_some(title)
}

/// Title from the first lines of page-1 text.
///
/// Stops at the first structural heading and skips repository and URL
/// lines. The first line with more than twice as many letters as digits
/// and more than five characters wins.
pub fn title_from_text(text: &str) -> Option<String> {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(FALLBACK_LINES);

    for line in lines {
        if fallback_stop_regex().is_match(line) {
            break;
        }
        if fallback_skip_regex().is_match(line) {
            continue;
        }

        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        let digits = line.chars().filter(|c| c.is_numeric()).count();
        if letters > 2 * digits && line.chars().count() > 5 {
            return Some(clean(line));
        }
    }

    None
}

/// Earliest plausible year mentioned in `text`.
///
/// This favours the paper's own year over later citations but can pick up
/// an older cited year; it is a weak signal.
pub fn year_from_text(text: &str) -> Option<i32> {
    year_regex()
        .find_iter(text)
        .filter_map(|m| normalize_year(m.as_str()))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{helvetica, pdf_bytes, pdf_bytes_with_font};
    use crate::utils::current_year;
    use lopdf::dictionary;

    fn span(text: &str, top: f32, size: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            left: 72.0,
            top,
            size,
        }
    }

    #[test]
    fn test_two_line_title() {
        let spans = vec![
            span("Journal of Things, Vol. 3", 20.0, 8.0),
            span("Attention Is All", 80.0, 20.0),
            span("You Need", 104.0, 20.0),
            span("Ashish Vaswani", 140.0, 11.0),
            span("Abstract", 180.0, 11.0),
        ];
        assert_eq!(
            title_from_spans(&spans, 792.0).as_deref(),
            Some("Attention Is All You Need")
        );
    }

    #[test]
    fn test_title_ignores_lower_region_and_short_spans() {
        let spans = vec![
            span("Ab", 50.0, 30.0),
            span("Understanding Transformers", 90.0, 18.0),
            span("HUGE FIGURE LABEL", 500.0, 40.0),
        ];
        assert_eq!(
            title_from_spans(&spans, 792.0).as_deref(),
            Some("Understanding Transformers")
        );
    }

    #[test]
    fn test_noise_lines_dropped() {
        let spans = vec![
            span("Proceedings of the Conference", 40.0, 16.0),
            span("Neural Ranking Models", 120.0, 16.0),
        ];
        assert_eq!(
            title_from_spans(&spans, 792.0).as_deref(),
            Some("Neural Ranking Models")
        );
        assert_eq!(title_from_spans(&[], 792.0), None);
    }

    #[test]
    fn test_only_first_two_lines() {
        let spans = vec![
            span("First Title Line", 60.0, 16.0),
            span("Second Title Line", 110.0, 16.0),
            span("Third Title Line", 160.0, 16.0),
        ];
        assert_eq!(
            title_from_spans(&spans, 792.0).as_deref(),
            Some("First Title Line Second Title Line")
        );
    }

    #[test]
    fn test_title_from_text_fallback() {
        let text = "arXiv:1706.03762v7 [cs.CL] 2 Aug 2023\n\n12345 678\nAttention Is All You Need\nAshish Vaswani\nAbstract\n";
        assert_eq!(
            title_from_text(text).as_deref(),
            Some("Attention Is All You Need")
        );

        assert_eq!(title_from_text("Abstract\nA Real Title Here"), None);
        assert_eq!(title_from_text(""), None);
    }

    #[test]
    fn test_year_minimum_plausible() {
        let next = current_year() + 1;
        let text = format!("Published 2017. See [3] 1998 and 2019. Page 1850, ID 2999, {}", next + 1);
        assert_eq!(year_from_text(&text), Some(1998));
        assert_eq!(year_from_text("no years here"), None);
    }

    #[test]
    fn test_extract_hints_from_pdf() {
        let bytes = pdf_bytes(&[
            vec![
                (9, 72, 760, "Preprint 2017 https://example.org"),
                (22, 72, 680, "Playing Atari with Deep"),
                (22, 72, 654, "Reinforcement Learning"),
                (11, 72, 600, "Volodymyr Mnih"),
                (10, 72, 400, "doi:10.1038/nature14236."),
            ],
            vec![(10, 72, 700, "References 2013 2015")],
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atari.pdf");
        std::fs::write(&path, bytes).unwrap();

        let hints = extract_hints(&path, 2).unwrap();
        assert_eq!(hints.doi.as_deref(), Some("10.1038/nature14236"));
        assert_eq!(
            hints.title_hint.as_deref(),
            Some("Playing Atari with Deep Reinforcement Learning")
        );
        assert_eq!(hints.year_hint, Some(2013));
        assert!(!hints.sample_text.is_empty());

        // One page only: the second page's years are not seen
        let hints = extract_hints(&path, 1).unwrap();
        assert_eq!(hints.year_hint, Some(2017));
    }

    #[test]
    fn test_title_hint_keeps_encoded_glyphs() {
        let mut font = helvetica();
        font.set(
            "Encoding",
            lopdf::dictionary! {
                "Type" => "Encoding",
                "BaseEncoding" => "WinAnsiEncoding",
                "Differences" => vec![lopdf::Object::Integer(12), lopdf::Object::Name(b"fi".to_vec())],
            },
        );
        let bytes = pdf_bytes_with_font(
            font,
            &[vec![
                (22, 72, 700, b"E\x0Ccient Training of Networks".as_slice()),
                (10, 72, 640, b"\x93Jane Doe\x94 \x96 Example University".as_slice()),
            ]],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoded.pdf");
        std::fs::write(&path, bytes).unwrap();

        let hints = extract_hints(&path, 1).unwrap();
        assert_eq!(
            hints.title_hint.as_deref(),
            Some("E\u{FB01}cient Training of Networks")
        );
        assert!(hints.sample_text.contains("\u{201C}Jane Doe\u{201D}"));
        assert!(!hints.sample_text.contains('\u{93}'));
    }

    #[test]
    fn test_pdf_without_text_gives_empty_hints() {
        let bytes = pdf_bytes(&[vec![], vec![]]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        std::fs::write(&path, bytes).unwrap();

        let hints = extract_hints(&path, 2).unwrap();
        assert!(hints.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        assert!(extract_hints(&path, 2).is_err());
    }
}
