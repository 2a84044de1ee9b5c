//! PDF document access.
//!
//! [`PdfDocument`] reads a file once and serves what the hint extractor
//! needs: per-page text and per-page positioned text spans. Both come from
//! `pdf-extract`, which decodes glyphs through the font encodings; pages
//! where it finds no text fall back to `lopdf`'s own text extraction.

mod hints;
mod layout;

pub use hints::{extract_hints, hints_from_document, title_from_spans, title_from_text, year_from_text};
pub use layout::{PageLayout, TextSpan};

use std::cell::OnceCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::Document;
use thiserror::Error;

use layout::SpanCollector;

/// Errors that make a PDF unusable
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("File not found or not a valid PDF: {0}")]
    InvalidFile(String),

    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A loaded PDF
pub struct PdfDocument {
    document: Document,
    bytes: Vec<u8>,
    /// One-based page numbers, in page order
    pages: Vec<u32>,
    text: OnceCell<Vec<String>>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.pages.len())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PdfDocument {
    /// Read and parse the file at `path`
    pub fn open(path: &Path) -> Result<Self, PdfExtractError> {
        if !path.is_file() {
            return Err(PdfExtractError::InvalidFile(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes).map_err(|e| match e {
            PdfExtractError::Load(msg) => {
                PdfExtractError::Load(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PdfExtractError> {
        // The header may follow a little leading junk
        if !bytes.windows(5).take(1024).any(|w| w == b"%PDF-") {
            return Err(PdfExtractError::InvalidFile(
                "missing %PDF header".to_string(),
            ));
        }

        let document = Document::load_mem(&bytes).map_err(|e| PdfExtractError::Load(e.to_string()))?;
        let pages = document.get_pages().into_keys().collect();

        Ok(Self {
            document,
            bytes,
            pages,
            text: OnceCell::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Plain text of the page at `index` (zero-based); empty when unreadable
    pub fn page_text(&self, index: usize) -> String {
        let Some(&number) = self.pages.get(index) else {
            return String::new();
        };

        if let Some(text) = self.extracted_text().get(index) {
            if !text.trim().is_empty() {
                return text.clone();
            }
        }

        match self.document.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("lopdf could not read page {}: {}", number, e);
                String::new()
            }
        }
    }

    /// Positioned text spans and height of the page at `index`
    pub fn page_layout(&self, index: usize) -> PageLayout {
        let Some(&number) = self.pages.get(index) else {
            return PageLayout::default();
        };

        let mut collector = SpanCollector::default();
        let document = &self.document;
        // pdf-extract panics on some malformed inputs
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::output_doc_page(document, &mut collector, number)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Could not lay out page {}: {}", number, e),
            Err(_) => tracing::debug!("pdf-extract panicked on page {}", number),
        }

        collector.finish()
    }

    /// Per-page text from pdf-extract, computed on first use
    fn extracted_text(&self) -> &[String] {
        self.text.get_or_init(|| {
            let bytes = &self.bytes;
            match panic::catch_unwind(AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem_by_pages(bytes)
            })) {
                Ok(Ok(pages)) => pages,
                Ok(Err(e)) => {
                    tracing::debug!("pdf-extract failed: {}", e);
                    Vec::new()
                }
                Err(_) => {
                    tracing::debug!("pdf-extract panicked");
                    Vec::new()
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builds small single-font PDFs with lopdf for tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    /// One line of text: (font size, x, baseline y, text)
    pub type Line<'a> = (i64, i64, i64, &'a str);

    /// One line of already encoded text: (font size, x, baseline y, bytes)
    pub type RawLine<'a> = (i64, i64, i64, &'a [u8]);

    /// Helvetica with the standard Windows encoding
    pub fn helvetica() -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }
    }

    /// A PDF whose pages each show the given lines in Helvetica
    pub fn pdf_bytes(pages: &[Vec<Line<'_>>]) -> Vec<u8> {
        let raw: Vec<Vec<RawLine<'_>>> = pages
            .iter()
            .map(|lines| {
                lines
                    .iter()
                    .map(|&(size, x, y, text)| (size, x, y, text.as_bytes()))
                    .collect()
            })
            .collect();
        pdf_bytes_with_font(helvetica(), &raw)
    }

    /// A PDF whose pages each show the given byte strings in `font`
    pub fn pdf_bytes_with_font(font: Dictionary, pages: &[Vec<RawLine<'_>>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for &(size, x, y, text) in lines {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
                operations.push(Operation::new("Td", vec![x.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(text.to_vec())]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
