//! Recording gateway for consultation tests

use llm_pipelines::llm::{LlmError, LlmGateway};
use llm_pipelines_sdk::async_trait;
use std::sync::{Arc, Mutex};

/// Answers the nth call with "ANSWER {n}" and records prompts and system
/// prompts. Fails from call `fail_from` onwards when set.
pub struct RecordingGateway {
    pub calls: Mutex<Vec<(String, Option<String>)>>,
    fail_from: Option<usize>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_from: None,
        })
    }

    pub fn failing_from(call: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_from: Some(call),
        })
    }
}

#[async_trait]
impl LlmGateway for RecordingGateway {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        _temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((prompt.to_string(), system_prompt.map(str::to_string)));
        let n = calls.len();
        if self.fail_from.is_some_and(|from| n >= from) {
            return Err(LlmError::Api {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        Ok(format!("ANSWER {}", n))
    }

    fn model(&self) -> &str {
        "recording"
    }
}
