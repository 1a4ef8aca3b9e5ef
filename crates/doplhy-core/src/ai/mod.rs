pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::AiError;

/// Everything one remote call needs.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub api_key: String,
    pub model: String,
    pub system_instruction: String,
    pub content: String,
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("system_instruction_len", &self.system_instruction.len())
            .field("content", &self.content)
            .finish()
    }
}

/// A text generation service the conversation can dispatch to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError>;
}
