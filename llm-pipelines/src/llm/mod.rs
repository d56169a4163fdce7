//! LLM gateway abstraction
//!
//! Every pipeline talks to the model through [`LlmGateway`]. The gateway is
//! injected into planners, workers and orchestrators as `Arc<dyn LlmGateway>`;
//! nothing in the crate reaches for a global client.
//!
//! - **groq**: OpenAI compatible chat completions over HTTP
//! - **dummy**: deterministic offline responses for smoke runs

pub mod dummy;
pub mod groq;

pub use dummy::DummyGateway;
pub use groq::GroqClient;

use llm_pipelines_sdk::async_trait;
use std::sync::Arc;

/// Failure to obtain a completion. Every variant reads as a generation failure.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("generation failed: GROQ_API_KEY is not set")]
    MissingApiKey,

    #[error("generation failed: request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation failed: API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("generation failed: empty response")]
    EmptyResponse,

    #[error("generation failed: {0}")]
    Generation(String),
}

#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Sends one prompt and returns the completion text.
    ///
    /// `temperature` of `None` uses the gateway's configured default.
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError>;

    fn model(&self) -> &str;
}

pub type SharedGateway = Arc<dyn LlmGateway>;
