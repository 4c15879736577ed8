pub mod anthropic;
pub mod openai;
pub mod tagged;

use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Response is missing text content")]
    EmptyResponse,
    #[error(transparent)]
    Response(#[from] crate::Error),
}

impl LlmError {
    /// Whether calling the model again may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Request(_) | LlmError::Middleware(_) | LlmError::EmptyResponse => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Response(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A chat completion backend answering a single user turn
pub trait LanguageModel {
    const DEFAULT_MODEL: &'static str;

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}
