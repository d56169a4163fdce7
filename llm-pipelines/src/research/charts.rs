//! SVG charts for the analysis step
//!
//! Three independent charts are written: a keyword bar chart, a keyword
//! cloud and a sentiment gauge. A failure in one never prevents the others.

use super::types::KeywordCount;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const BAR_COLOR: &str = "#4A90D9";
const CLOUD_PALETTE: [&str; 6] = ["#440154", "#3b528b", "#21918c", "#5ec962", "#2c7fb8", "#fdae61"];

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("no keywords to plot")]
    NoData,

    #[error("failed to write chart: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to format chart: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone)]
pub struct ChartRenderer {
    dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Renders every chart it can and returns the paths written.
    pub fn render_all(&self, keywords: &[KeywordCount], sentiment: f64, topic: &str) -> Vec<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::error!(dir = %self.dir.display(), error = %e, "cannot create charts directory");
            return Vec::new();
        }

        let attempts: [(&str, Result<PathBuf, ChartError>); 3] = [
            ("keywords", self.keyword_bar_chart(keywords, topic)),
            ("wordcloud", self.word_cloud(keywords, topic)),
            ("sentiment", self.sentiment_gauge(sentiment, topic)),
        ];

        attempts
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(path) => {
                    tracing::debug!(chart = name, path = %path.display(), "chart written");
                    Some(path)
                }
                Err(e) => {
                    tracing::error!(chart = name, error = %e, "chart generation failed");
                    None
                }
            })
            .collect()
    }

    /// Horizontal bars for the ten most frequent keywords.
    pub fn keyword_bar_chart(&self, keywords: &[KeywordCount], topic: &str) -> Result<PathBuf, ChartError> {
        let top: Vec<&KeywordCount> = keywords.iter().take(10).collect();
        let max = top.iter().map(|k| k.count).max().ok_or(ChartError::NoData)?;

        let (width, row, left, top_margin) = (800.0, 36.0, 170.0, 60.0);
        let plot_width = width - left - 80.0;
        let height = top_margin + row * top.len() as f64 + 50.0;

        let mut svg = svg_open(width, height);
        writeln!(
            svg,
            r#"<text x="{}" y="34" font-size="20" font-weight="bold" text-anchor="middle">Top Keywords: {}</text>"#,
            width / 2.0,
            escape_xml(topic)
        )?;
        for (i, keyword) in top.iter().enumerate() {
            let y = top_margin + row * i as f64;
            let bar = plot_width * keyword.count as f64 / max as f64;
            writeln!(
                svg,
                r#"<text x="{}" y="{}" font-size="14" text-anchor="end">{}</text>"#,
                left - 10.0,
                y + row * 0.6,
                escape_xml(&keyword.word)
            )?;
            writeln!(
                svg,
                r#"<rect x="{}" y="{}" width="{:.1}" height="{}" fill="{}"/>"#,
                left,
                y + 4.0,
                bar,
                row - 8.0,
                BAR_COLOR
            )?;
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{}" font-size="13">{}</text>"#,
                left + bar + 6.0,
                y + row * 0.6,
                keyword.count
            )?;
        }
        writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="14" text-anchor="middle">Frequency</text>"#,
            left + plot_width / 2.0,
            height - 14.0
        )?;
        svg.push_str("</svg>\n");

        self.write("keywords.svg", &svg)
    }

    /// Keywords laid out in rows, font size scaled by frequency.
    pub fn word_cloud(&self, keywords: &[KeywordCount], topic: &str) -> Result<PathBuf, ChartError> {
        let words: Vec<&KeywordCount> = keywords.iter().take(50).collect();
        let max = words.iter().map(|k| k.count).max().ok_or(ChartError::NoData)? as f64;
        let min = words.iter().map(|k| k.count).min().unwrap_or(1) as f64;

        let (width, height) = (800.0, 400.0);
        let mut svg = svg_open(width, height);
        writeln!(
            svg,
            r#"<text x="{}" y="30" font-size="20" font-weight="bold" text-anchor="middle">Word Cloud: {}</text>"#,
            width / 2.0,
            escape_xml(topic)
        )?;

        let (mut x, mut y, mut line_height) = (20.0, 80.0, 0.0_f64);
        for (i, keyword) in words.iter().enumerate() {
            let weight = if max > min {
                (keyword.count as f64 - min) / (max - min)
            } else {
                1.0
            };
            let size = 14.0 + 34.0 * weight;
            // Rough glyph width estimate for layout
            let advance = size * 0.6 * keyword.word.chars().count() as f64 + 18.0;
            if x + advance > width - 20.0 {
                x = 20.0;
                y += line_height.max(size) + 10.0;
                line_height = 0.0;
            }
            if y > height - 10.0 {
                break;
            }
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="{:.1}" fill="{}">{}</text>"#,
                x,
                y,
                size,
                CLOUD_PALETTE[i % CLOUD_PALETTE.len()],
                escape_xml(&keyword.word)
            )?;
            x += advance;
            line_height = line_height.max(size);
        }
        svg.push_str("</svg>\n");

        self.write("wordcloud.svg", &svg)
    }

    /// A red-to-green strip from -1 to 1 with a marker at `score`.
    pub fn sentiment_gauge(&self, score: f64, topic: &str) -> Result<PathBuf, ChartError> {
        let score = score.clamp(-1.0, 1.0);
        let (width, height) = (640.0, 220.0);
        let (left, strip_width, strip_y) = (40.0, 560.0, 90.0);
        let marker_x = left + strip_width * (score + 1.0) / 2.0;

        let mut svg = svg_open(width, height);
        svg.push_str(concat!(
            r#"<defs><linearGradient id="g" x1="0" x2="1" y1="0" y2="0">"#,
            r##"<stop offset="0" stop-color="#d73027"/><stop offset="0.5" stop-color="#ffffbf"/>"##,
            r##"<stop offset="1" stop-color="#1a9850"/></linearGradient></defs>"##,
            "\n"
        ));
        writeln!(
            svg,
            r#"<text x="{}" y="34" font-size="18" font-weight="bold" text-anchor="middle">Sentiment Analysis: {}</text>"#,
            width / 2.0,
            escape_xml(topic)
        )?;
        writeln!(
            svg,
            r##"<rect x="{}" y="{}" width="{}" height="40" fill="url(#g)" stroke="#333"/>"##,
            left, strip_y, strip_width
        )?;
        writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{}" x2="{:.1}" y2="{}" stroke="black" stroke-width="4"/>"#,
            marker_x,
            strip_y - 10.0,
            marker_x,
            strip_y + 50.0
        )?;
        for (label, x) in [("Negative", left), ("Neutral", left + strip_width / 2.0), ("Positive", left + strip_width)] {
            writeln!(
                svg,
                r#"<text x="{}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
                x,
                strip_y + 68.0,
                label
            )?;
        }
        writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="16" text-anchor="middle">Score: {:.3}</text>"#,
            width / 2.0,
            strip_y + 100.0,
            score
        )?;
        svg.push_str("</svg>\n");

        self.write("sentiment.svg", &svg)
    }

    fn write(&self, file_name: &str, svg: &str) -> Result<PathBuf, ChartError> {
        let path = self.dir.join(file_name);
        std::fs::write(&path, svg)?;
        Ok(path)
    }
}

fn svg_open(width: f64, height: f64) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" \
         font-family=\"Helvetica, Arial, sans-serif\">\n<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n",
        w = width,
        h = height
    )
}

pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<KeywordCount> {
        vec![
            KeywordCount { word: "quantum".into(), count: 9 },
            KeywordCount { word: "qubits".into(), count: 4 },
            KeywordCount { word: "error<correction>".into(), count: 2 },
        ]
    }

    #[test]
    fn test_render_all_writes_three_charts() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path().join("charts"));

        let paths = renderer.render_all(&keywords(), 0.25, "Q&A");
        assert_eq!(paths.len(), 3);
        for path in &paths {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.starts_with("<svg"));
            assert!(svg.trim_end().ends_with("</svg>"));
        }
        let bars = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(bars.contains("Top Keywords: Q&amp;A"));
        assert!(bars.contains("error&lt;correction&gt;"));
    }

    #[test]
    fn test_missing_keywords_only_skips_keyword_charts() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path());

        let paths = renderer.render_all(&[], -0.4, "t");
        assert_eq!(paths, vec![dir.path().join("sentiment.svg")]);
        assert!(matches!(renderer.keyword_bar_chart(&[], "t"), Err(ChartError::NoData)));
    }
}
