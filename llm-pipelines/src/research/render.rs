//! Report rendering to Markdown, HTML and PDF

use super::types::{ResearchReport, SECTION_NAMES};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use pulldown_cmark::{html, Options, Parser};
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to format report: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

const HTML_STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;max-width:860px;margin:40px auto;\
line-height:1.6;color:#222;padding:0 16px}h1{border-bottom:2px solid #4A90D9;padding-bottom:8px}\
h2{color:#2c5d8f;margin-top:32px}table{border-collapse:collapse}td,th{border:1px solid #ccc;\
padding:4px 10px}img{max-width:100%}";

pub struct ReportRenderer {
    output_dir: PathBuf,
}

impl ReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// File stem shared by all artifacts of one report.
    pub fn file_stem(&self, report: &ResearchReport) -> String {
        let slug: String = report
            .topic
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>()
            .split('_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .take(50)
            .collect();
        let slug = if slug.is_empty() { "report".to_string() } else { slug };
        format!("research_{}_{}", slug, report.created_at.format("%Y%m%d_%H%M%S"))
    }

    /// Builds the Markdown document. Known sections come first in their fixed
    /// order, followed by any others in insertion order.
    pub fn generate_markdown(&self, report: &ResearchReport) -> Result<String, RenderError> {
        let mut md = String::new();
        writeln!(md, "# {}\n", report.title)?;
        writeln!(md, "*Generated: {}*\n", report.created_at.format("%B %d, %Y at %H:%M"))?;
        writeln!(md, "---\n")?;

        let ordered = SECTION_NAMES
            .iter()
            .filter_map(|name| report.sections.iter().find(|s| s.name == *name))
            .chain(
                report
                    .sections
                    .iter()
                    .filter(|s| !SECTION_NAMES.contains(&s.name.as_str())),
            );
        for section in ordered {
            writeln!(md, "## {}\n\n{}\n", section.name, section.content.trim())?;
        }

        if let Some(analysis) = &report.analysis {
            writeln!(md, "## Analysis Statistics\n")?;
            writeln!(md, "| Metric | Value |\n|---|---|")?;
            writeln!(md, "| Words analyzed | {} |", analysis.word_count)?;
            writeln!(md, "| Sentences | {} |", analysis.sentence_count)?;
            writeln!(md, "| Avg. sentence length | {:.1} |", analysis.avg_sentence_length)?;
            writeln!(
                md,
                "| Sentiment | {} ({:.3}) |\n",
                analysis.sentiment_label, analysis.sentiment_score
            )?;
            if !analysis.top_keywords.is_empty() {
                writeln!(md, "**Top keywords:** {}\n", analysis.keyword_names(10).join(", "))?;
            }
            if !analysis.chart_paths.is_empty() {
                writeln!(md, "### Charts\n")?;
                for path in &analysis.chart_paths {
                    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("chart");
                    writeln!(md, "![{}]({})\n", name, self.relative_link(path))?;
                }
            }
        }

        if !report.sources.is_empty() {
            writeln!(md, "## Sources\n")?;
            for (i, source) in report.sources.iter().enumerate() {
                writeln!(md, "{}. [{}]({})", i + 1, source.title, source.url)?;
            }
            md.push('\n');
        }

        if !report.contributors.is_empty() {
            writeln!(md, "---\n\n*Contributors: {}*", report.contributors.join(", "))?;
        }
        Ok(md)
    }

    fn relative_link(&self, path: &Path) -> String {
        path.strip_prefix(&self.output_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn ensure_output_dir(&self) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn save_markdown(&self, report: &ResearchReport, markdown: &str) -> Result<PathBuf, RenderError> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(format!("{}.md", self.file_stem(report)));
        std::fs::write(&path, markdown)?;
        Ok(path)
    }

    pub fn markdown_to_html(title: &str, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut body = String::new();
        html::push_html(&mut body, Parser::new_ext(markdown, options));

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
             <style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            super::charts::escape_xml(title),
            HTML_STYLE,
            body
        )
    }

    pub fn save_html(&self, report: &ResearchReport, markdown: &str) -> Result<PathBuf, RenderError> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(format!("{}.html", self.file_stem(report)));
        std::fs::write(&path, Self::markdown_to_html(&report.title, markdown))?;
        Ok(path)
    }

    /// Writes a plain-text PDF rendition of the Markdown.
    pub fn save_pdf(&self, report: &ResearchReport, markdown: &str) -> Result<PathBuf, RenderError> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(format!("{}.pdf", self.file_stem(report)));

        let (doc, page, layer) = PdfDocument::new(&report.title, Mm(210.0), Mm(297.0), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(format!("font error: {e}")))?;

        let mut cursor = PdfCursor {
            layer: doc.get_page(page).get_layer(layer),
            y: Mm(280.0),
        };

        for line in markdown.lines() {
            let (text, size, heading) = pdf_line_style(line);
            if text.is_empty() {
                cursor.advance(&doc, Mm(3.0));
                continue;
            }
            let face: &IndirectFontRef = if heading { &bold } else { &font };
            let width = if heading { 60 } else { 95 };
            if heading {
                cursor.advance(&doc, Mm(3.0));
            }
            for wrapped in wrap_text(&to_latin1(&text), width) {
                cursor.layer.use_text(wrapped, size, Mm(20.0), cursor.y, face);
                cursor.advance(&doc, Mm(size * 0.45));
            }
        }

        let file = File::create(&path)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| RenderError::Pdf(format!("save error: {e}")))?;
        Ok(path)
    }
}

struct PdfCursor {
    layer: PdfLayerReference,
    y: Mm,
}

impl PdfCursor {
    /// Moves down, starting a new page near the bottom margin.
    fn advance(&mut self, doc: &printpdf::PdfDocumentReference, step: Mm) {
        self.y -= step;
        if self.y.0 < 20.0 {
            let (page, layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
            self.layer = doc.get_page(page).get_layer(layer);
            self.y = Mm(280.0);
        }
    }
}

/// Strips Markdown markup and picks a font size for one line.
fn pdf_line_style(line: &str) -> (String, f32, bool) {
    let trimmed = line.trim();
    let (text, size, heading) = if let Some(rest) = trimmed.strip_prefix("### ") {
        (rest, 12.0, true)
    } else if let Some(rest) = trimmed.strip_prefix("## ") {
        (rest, 14.0, true)
    } else if let Some(rest) = trimmed.strip_prefix("# ") {
        (rest, 18.0, true)
    } else if trimmed == "---" || trimmed.starts_with("|---") || trimmed.starts_with("![") {
        ("", 10.0, false)
    } else {
        (trimmed, 10.0, false)
    };
    let cleaned = text.replace("**", "").replace('*', "").replace('|', " ");
    (cleaned.trim().to_string(), size, heading)
}

/// Builtin PDF fonts only cover Latin-1.
pub(crate) fn to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '-',
            c if (c as u32) < 256 => c,
            _ => '?',
        })
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
