use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    http,
    llm::{CompletionRequest, LanguageModel, LlmError},
};

/// Client for OpenAI compatible chat completion APIs
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: <Self as LanguageModel>::DEFAULT_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn send_completion_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": request.system
                },
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

impl LanguageModel for OpenAIClient {
    const DEFAULT_MODEL: &'static str = "gpt-4o";

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self
            .send_completion_request(request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to complete prompt"))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_response_shape() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "<response>{}</response>"},
                    "finish_reason": "stop"
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(response.choices.len(), 1);
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("<response>{}</response>")
        );
    }
}
