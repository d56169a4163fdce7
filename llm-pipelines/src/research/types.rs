//! Data structures for the research pipeline

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The five report sections, in the order they are drafted and rendered
pub const SECTION_NAMES: [&str; 5] = [
    "Executive Summary",
    "Introduction",
    "Key Findings",
    "Analysis",
    "Conclusion",
];

/// A web page considered for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<DateTime<Local>>,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            content: String::new(),
            accessed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Strictly above 0.1 is positive, strictly below -0.1 negative.
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Statistics over the collected corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    /// Descending by count, ties in first-seen order
    pub top_keywords: Vec<KeywordCount>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    #[serde(default)]
    pub chart_paths: Vec<PathBuf>,
}

impl AnalysisResult {
    pub fn keyword_names(&self, limit: usize) -> Vec<&str> {
        self.top_keywords
            .iter()
            .take(limit)
            .map(|k| k.word.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub name: String,
    pub content: String,
}

/// Files written when the report is finalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportArtifacts {
    pub markdown: Option<PathBuf>,
    pub html: Option<PathBuf>,
    /// Falls back to the Markdown path when PDF rendering fails
    pub pdf: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub title: String,
    pub topic: String,
    pub sections: Vec<ReportSection>,
    pub contributors: Vec<String>,
    /// Section name -> agent that wrote it
    pub section_authors: Vec<(String, String)>,
    pub sources: Vec<Source>,
    pub analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub markdown_content: String,
    #[serde(default)]
    pub artifacts: ReportArtifacts,
    pub created_at: DateTime<Local>,
}

impl ResearchReport {
    pub fn new(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            title: format!("Research Report: {}", topic),
            topic,
            sections: Vec::new(),
            contributors: Vec::new(),
            section_authors: Vec::new(),
            sources: Vec::new(),
            analysis: None,
            markdown_content: String::new(),
            artifacts: ReportArtifacts::default(),
            created_at: Local::now(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.content.as_str())
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Replaces an existing section in place or appends a new one.
    pub fn set_section(&mut self, name: &str, content: impl Into<String>) {
        let content = content.into();
        match self.sections.iter_mut().find(|s| s.name == name) {
            Some(section) => section.content = content,
            None => self.sections.push(ReportSection {
                name: name.to_string(),
                content,
            }),
        }
    }

    pub fn record_author(&mut self, section: &str, agent: &str) {
        if !self.contributors.iter().any(|c| c == agent) {
            self.contributors.push(agent.to_string());
        }
        match self.section_authors.iter_mut().find(|(s, _)| s == section) {
            Some(entry) => entry.1 = agent.to_string(),
            None => self.section_authors.push((section.to_string(), agent.to_string())),
        }
    }
}
