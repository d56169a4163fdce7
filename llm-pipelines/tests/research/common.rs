//! Stub collaborators for research pipeline tests

use llm_pipelines::config::Settings;
use llm_pipelines::llm::{LlmError, LlmGateway};
use llm_pipelines::research::{FetchError, PageFetcher, SearchHit, SearchProvider};
use llm_pipelines_sdk::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const SECTION_TEXT: &str = "Quantum computers use qubits that exploit superposition and \
entanglement. Researchers report excellent progress on error correction, although noisy \
hardware remains a challenge.";

pub fn six_task_json() -> String {
    let tasks = [
        "Source Identification",
        "Content Collection",
        "Data Analysis",
        "Report Drafting",
        "Self-Review",
        "Final Production",
    ];
    let items: Vec<String> = tasks
        .iter()
        .map(|name| format!(r#"{{"name": "{}", "description": "Perform {}"}}"#, name, name.to_lowercase()))
        .collect();
    format!("[{}]", items.join(", "))
}

/// Answers by prompt kind: plan JSON for planning, a query for query
/// generation and fixed prose for everything else. Records every prompt.
pub struct ScriptedGateway {
    plan_response: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(plan_response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            plan_response: plan_response.into(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn echoing_plan() -> Arc<Self> {
        Self::new(six_task_json())
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("Create a research plan") {
            Ok(self.plan_response.clone())
        } else if prompt.starts_with("Create a focused search query") {
            Ok("\"quantum computing overview\"".to_string())
        } else {
            Ok(SECTION_TEXT.to_string())
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub struct FailingGateway;

#[async_trait]
impl LlmGateway for FailingGateway {
    async fn complete(&self, _: &str, _: Option<&str>, _: Option<f32>) -> Result<String, LlmError> {
        Err(LlmError::Generation("service unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "failing"
    }
}

pub struct StubSearch {
    pub hits: Vec<SearchHit>,
}

impl StubSearch {
    pub fn with_urls(n: usize) -> Arc<Self> {
        let hits = (1..=n)
            .map(|i| SearchHit {
                url: format!("https://example.org/{}", i),
                title: format!("Source {}", i),
                snippet: String::new(),
            })
            .collect();
        Arc::new(Self { hits })
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Vec<SearchHit> {
        self.hits.iter().take(max_results).cloned().collect()
    }
}

/// Serves fixed page text per URL; unknown URLs fail.
pub struct StubFetcher {
    pages: HashMap<String, String>,
}

impl StubFetcher {
    pub fn uniform(n: usize, text: &str) -> Arc<Self> {
        let pages = (1..=n)
            .map(|i| (format!("https://example.org/{}", i), text.to_string()))
            .collect();
        Arc::new(Self { pages })
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))
    }
}

pub fn settings_in(dir: &TempDir) -> Settings {
    Settings {
        max_review_iterations: 1,
        ..Settings::default()
    }
    .rooted_at(dir.path())
}
