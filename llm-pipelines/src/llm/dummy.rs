use super::{LlmError, LlmGateway};
use llm_pipelines_sdk::async_trait;

const PROMPT_PREVIEW_CHARS: usize = 240;

/// Offline gateway that echoes the start of each prompt.
///
/// Lets every pipeline run end to end without network access or an API key.
/// Structured callers (planner, extractor) see unparseable text and take
/// their fallback paths.
#[derive(Debug, Default, Clone)]
pub struct DummyGateway;

#[async_trait]
impl LlmGateway for DummyGateway {
    async fn complete(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        Ok(format!("DUMMY_CONTENT for prompt: {}", preview))
    }

    fn model(&self) -> &str {
        "dummy"
    }
}
