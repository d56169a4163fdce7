//! Runtime settings loaded from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file through `dotenv`. Command line flags override individual fields
//! after loading.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Settings shared by all three pipelines
///
/// # Examples
///
/// ```
/// use llm_pipelines::config::Settings;
///
/// let settings = Settings {
///     max_sources: 2,
///     ..Default::default()
/// };
/// assert_eq!(settings.max_search_results, 5);
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer token for the chat completions endpoint
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL of an OpenAI compatible API
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// How many search hits are fetched and kept as sources
    pub max_sources: usize,
    pub max_search_results: usize,
    /// Page fetch timeout
    pub request_timeout: Duration,
    /// LLM request timeout
    pub llm_timeout: Duration,
    pub max_review_iterations: usize,
    pub output_dir: PathBuf,
    pub charts_dir: PathBuf,
    /// Calendar, notification and record store files
    pub data_dir: PathBuf,
    pub prescriptions_dir: PathBuf,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 8192,
            max_sources: 3,
            max_search_results: 5,
            request_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(120),
            max_review_iterations: 2,
            output_dir: PathBuf::from("outputs"),
            charts_dir: PathBuf::from("outputs/charts"),
            data_dir: PathBuf::from("data"),
            prescriptions_dir: PathBuf::from("prescriptions"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then reads every known variable.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Missing keys keep their
    /// defaults; present but malformed values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_dir = get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir);
        // Charts follow the output dir unless set explicitly
        let charts_dir = get("CHARTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("charts"));

        Ok(Self {
            api_key: get("GROQ_API_KEY"),
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            base_url: get("LLM_BASE_URL").unwrap_or(defaults.base_url),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_or(get("MAX_TOKENS"), "MAX_TOKENS", defaults.max_tokens)?,
            max_sources: parse_or(get("MAX_SOURCES"), "MAX_SOURCES", defaults.max_sources)?,
            max_search_results: parse_or(
                get("MAX_SEARCH_RESULTS"),
                "MAX_SEARCH_RESULTS",
                defaults.max_search_results,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT"),
                "REQUEST_TIMEOUT",
                defaults.request_timeout.as_secs(),
            )?),
            llm_timeout: Duration::from_secs(parse_or(
                get("LLM_TIMEOUT"),
                "LLM_TIMEOUT",
                defaults.llm_timeout.as_secs(),
            )?),
            max_review_iterations: parse_or(
                get("MAX_REVIEW_ITERATIONS"),
                "MAX_REVIEW_ITERATIONS",
                defaults.max_review_iterations,
            )?,
            output_dir,
            charts_dir,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            prescriptions_dir: get("PRESCRIPTIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.prescriptions_dir),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Points every output location below `root`. Used by tests and `--output-root`.
    pub fn rooted_at(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.output_dir = root.join("outputs");
        self.charts_dir = self.output_dir.join("charts");
        self.data_dir = root.join("data");
        self.prescriptions_dir = root.join("prescriptions");
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("medical_records.db")
    }

    pub fn appointments_path(&self) -> PathBuf {
        self.data_dir.join("appointments.json")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.data_dir.join("notifications.json")
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.max_sources, 3);
        assert_eq!(settings.max_review_iterations, 2);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.charts_dir, PathBuf::from("outputs/charts"));
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("MAX_SOURCES", "4"),
            ("LLM_TEMPERATURE", "0.2"),
            ("OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(settings.max_sources, 4);
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.charts_dir, PathBuf::from("/tmp/out/charts"));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_rooted_at_moves_all_dirs() {
        let settings = Settings::default().rooted_at("/tmp/run");
        assert_eq!(settings.charts_dir, PathBuf::from("/tmp/run/outputs/charts"));
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/run/data/medical_records.db"));
    }
}
