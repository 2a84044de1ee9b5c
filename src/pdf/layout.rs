//! Positioned text spans of a page.
//!
//! ```text
//! pdf-extract glyphs  ->  runs (one per shown string)  ->  spans (runs joined per baseline)
//! ```
//!
//! pdf-extract walks the content stream and decodes every glyph through the
//! font's encoding, `/Differences` and ToUnicode map. [`SpanCollector`]
//! receives each glyph with its rendering matrix and groups them.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use crate::utils::collapse_whitespace;

/// US Letter height, used until a page reports its MediaBox
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Horizontal gap between runs, relative to font size, read as a word break
const WORD_GAP: f32 = 0.15;

/// A line fragment of text at one font size
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Distance from the left edge of the page box
    pub left: f32,
    /// Distance from the top of the page box to the top of the glyphs
    pub top: f32,
    /// Effective font size in user space
    pub size: f32,
}

/// Spans of one page together with the page height
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub spans: Vec<TextSpan>,
    pub height: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            spans: Vec::new(),
            height: DEFAULT_PAGE_HEIGHT,
        }
    }
}

/// Glyphs of one shown string, in user space
#[derive(Debug, Clone)]
struct Run {
    text: String,
    left: f32,
    right: f32,
    baseline: f32,
    size: f32,
}

/// Collects glyphs from pdf-extract into runs
#[derive(Debug)]
pub(crate) struct SpanCollector {
    page_top: f32,
    page_height: f32,
    current: Option<Run>,
    runs: Vec<Run>,
}

impl Default for SpanCollector {
    fn default() -> Self {
        Self {
            page_top: DEFAULT_PAGE_HEIGHT,
            page_height: DEFAULT_PAGE_HEIGHT,
            current: None,
            runs: Vec::new(),
        }
    }
}

impl SpanCollector {
    fn finish_run(&mut self) {
        if let Some(run) = self.current.take() {
            if !run.text.trim().is_empty() && run.size > 0.0 {
                self.runs.push(run);
            }
        }
    }

    /// The page's spans, runs on one baseline joined left to right
    pub(crate) fn finish(mut self) -> PageLayout {
        self.finish_run();
        PageLayout {
            spans: join_baselines(self.runs, self.page_top),
            height: self.page_height,
        }
    }
}

impl OutputDev for SpanCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        let bottom = media_box.lly.min(media_box.ury);
        let top = media_box.lly.max(media_box.ury);
        if top > bottom {
            self.page_top = top as f32;
            self.page_height = (top - bottom) as f32;
        }
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_run();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        // The rendering matrix excludes the font size
        let size = (font_size * trm.m21.hypot(trm.m22)).abs() as f32;
        let advance = (width * font_size + spacing) * trm.m11.hypot(trm.m12);
        let (x, y) = (trm.m31 as f32, trm.m32 as f32);

        let run = self.current.get_or_insert_with(|| Run {
            text: String::new(),
            left: x,
            right: x,
            baseline: y,
            size,
        });
        run.text.push_str(char);
        run.right = x + advance as f32;
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.finish_run();
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        self.finish_run();
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Join runs that share a baseline and a font size into spans, left to right
fn join_baselines(runs: Vec<Run>, page_top: f32) -> Vec<TextSpan> {
    let mut lines: Vec<Vec<Run>> = Vec::new();

    for run in runs {
        match lines.iter_mut().find(|line| same_line(&line[0], &run)) {
            Some(line) => line.push(run),
            None => lines.push(vec![run]),
        }
    }

    lines
        .into_iter()
        .map(|mut parts| {
            parts.sort_by(|a, b| a.left.total_cmp(&b.left));

            let mut text = String::new();
            let mut right: Option<f32> = None;
            for part in &parts {
                if let Some(right) = right {
                    let gap = part.left - right;
                    if gap > WORD_GAP * part.size
                        && !text.ends_with(char::is_whitespace)
                        && !part.text.starts_with(char::is_whitespace)
                    {
                        text.push(' ');
                    }
                }
                text.push_str(&part.text);
                right = Some(part.right);
            }

            let size = parts.iter().map(|p| p.size).fold(0.0, f32::max);
            TextSpan {
                text: collapse_whitespace(&text),
                left: parts[0].left,
                top: page_top - parts[0].baseline - size,
                size,
            }
        })
        .collect()
}

fn same_line(a: &Run, b: &Run) -> bool {
    let size = a.size.max(b.size);
    (a.baseline - b.baseline).abs() <= 0.2 * size && (a.size - b.size).abs() <= 0.1 * size
}
