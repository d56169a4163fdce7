//! Corpus statistics, keyword extraction and lexicon sentiment

use super::charts::ChartRenderer;
use super::types::{AnalysisResult, KeywordCount, SentimentLabel, Source};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

pub const TOP_KEYWORDS: usize = 15;
/// Only this many leading characters are scored for sentiment
pub const SENTIMENT_WINDOW_CHARS: usize = 5000;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "this", "that", "these", "those", "it", "its", "they", "them", "their",
    "what", "which",
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nor", "without", "hardly", "t"];
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("really", 1.2),
    ("remarkably", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
];

const LEXICON: &[(&str, f64)] = &[
    ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("best", 1.0), ("better", 0.5),
    ("positive", 0.23), ("benefit", 0.3), ("beneficial", 0.5), ("effective", 0.6),
    ("efficient", 0.4), ("success", 0.6), ("successful", 0.75), ("improve", 0.4),
    ("improved", 0.4), ("improvement", 0.4), ("innovative", 0.5), ("promising", 0.5),
    ("powerful", 0.3), ("important", 0.4), ("significant", 0.375), ("reliable", 0.5),
    ("secure", 0.4), ("safe", 0.5), ("useful", 0.3), ("advanced", 0.4), ("new", 0.136),
    ("easy", 0.43), ("clear", 0.1), ("strong", 0.43), ("fast", 0.2), ("interesting", 0.5),
    ("exciting", 0.3), ("remarkable", 0.75), ("valuable", 0.5), ("happy", 0.8),
    ("love", 0.5), ("wonderful", 1.0), ("amazing", 0.6), ("breakthrough", 0.6),
    ("opportunity", 0.4), ("growth", 0.3), ("robust", 0.4), ("accurate", 0.4),
    ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("poor", -0.4), ("negative", -0.3),
    ("problem", -0.3), ("problems", -0.3), ("risk", -0.3), ("risks", -0.3),
    ("difficult", -0.5), ("hard", -0.29), ("fail", -0.5), ("failure", -0.5),
    ("failed", -0.5), ("threat", -0.5), ("dangerous", -0.6), ("harmful", -0.6),
    ("error", -0.4), ("errors", -0.4), ("limited", -0.07), ("slow", -0.3),
    ("expensive", -0.5), ("costly", -0.4), ("weak", -0.375), ("unreliable", -0.5),
    ("insecure", -0.5), ("vulnerable", -0.4), ("concern", -0.3), ("concerns", -0.3),
    ("crisis", -0.6), ("decline", -0.4), ("loss", -0.4), ("terrible", -1.0),
    ("awful", -1.0), ("sad", -0.5), ("wrong", -0.5), ("challenge", -0.2),
    ("challenges", -0.2), ("uncertain", -0.2), ("complex", -0.3), ("noisy", -0.3),
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnalysisError {
    #[error("no content to analyze: {0} sources contained no words")]
    EmptyCorpus(usize),
}

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b\w+\b").expect("static regex"))
}

fn sentence_regex() -> &'static Regex {
    static SENTENCE: OnceLock<Regex> = OnceLock::new();
    SENTENCE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

pub struct TextAnalyzer {
    stopwords: HashSet<&'static str>,
    lexicon: HashMap<&'static str, f64>,
    charts: Option<ChartRenderer>,
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TextAnalyzer {
    /// `charts` of `None` skips chart rendering entirely.
    pub fn new(charts: Option<ChartRenderer>) -> Self {
        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            lexicon: LEXICON.iter().copied().collect(),
            charts,
        }
    }

    /// Analyzes the concatenated content of `sources`.
    ///
    /// Deterministic for identical input. Fails only when the corpus has no words.
    pub fn analyze(&self, sources: &[Source], topic: &str) -> Result<AnalysisResult, AnalysisError> {
        tracing::info!(sources = sources.len(), "analyzing corpus");
        let combined = sources
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let lowered = combined.to_lowercase();
        let words: Vec<&str> = word_regex().find_iter(&lowered).map(|m| m.as_str()).collect();
        if words.is_empty() {
            return Err(AnalysisError::EmptyCorpus(sources.len()));
        }

        let sentence_count = sentence_regex()
            .split(&combined)
            .filter(|s| !s.trim().is_empty())
            .count();
        let word_count = words.len();
        let avg_sentence_length = round_to(word_count as f64 / sentence_count.max(1) as f64, 1);

        let top_keywords = self.top_keywords(&words, TOP_KEYWORDS);

        let window: String = combined.chars().take(SENTIMENT_WINDOW_CHARS).collect();
        let sentiment_score = round_to(self.polarity(&window), 3);
        let sentiment_label = SentimentLabel::from_score(sentiment_score);
        tracing::debug!(word_count, sentence_count, %sentiment_label, sentiment_score, "analysis stats");

        let chart_paths = match &self.charts {
            Some(renderer) => renderer.render_all(&top_keywords, sentiment_score, topic),
            None => Vec::new(),
        };

        Ok(AnalysisResult {
            word_count,
            sentence_count,
            avg_sentence_length,
            top_keywords,
            sentiment_score,
            sentiment_label,
            chart_paths,
        })
    }

    /// Most frequent non-stopwords longer than three characters.
    fn top_keywords(&self, words: &[&str], limit: usize) -> Vec<KeywordCount> {
        // word -> (count, first position)
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (pos, word) in words
            .iter()
            .filter(|w| w.chars().count() > 3 && !self.stopwords.contains(**w))
            .enumerate()
        {
            counts.entry(*word).or_insert((0, pos)).0 += 1;
        }

        let mut ranked: Vec<(&str, usize, usize)> =
            counts.into_iter().map(|(w, (count, first))| (w, count, first)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(limit)
            .map(|(word, count, _)| KeywordCount {
                word: word.to_string(),
                count,
            })
            .collect()
    }

    /// Mean polarity of lexicon words in `text`, in `[-1, 1]`.
    ///
    /// A preceding negation flips and halves a word's polarity; a preceding
    /// intensifier scales it.
    pub fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = word_regex().find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut total = 0.0;
        let mut matched = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(*token) else {
                continue;
            };
            let mut score = base;
            let mut lookback = i;
            if lookback > 0 {
                if let Some(&(_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == tokens[lookback - 1]) {
                    score = (score * factor).clamp(-1.0, 1.0);
                    lookback -= 1;
                }
            }
            if lookback > 0 && NEGATIONS.contains(&tokens[lookback - 1]) {
                score *= -0.5;
            }
            total += score;
            matched += 1;
        }

        if matched == 0 {
            return 0.0;
        }
        (total / matched as f64).clamp(-1.0, 1.0)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
