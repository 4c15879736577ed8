use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    http,
    llm::{CompletionRequest, LanguageModel, LlmError},
};

/// Client for the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".into(),
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
    pub async fn send_messages_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<MessagesResponse, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        Ok(resp.json::<MessagesResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Concatenated text of all text blocks
    pub fn text(&self) -> Option<String> {
        let text = self
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<String>();

        (!text.trim().is_empty()).then_some(text)
    }
}

impl LanguageModel for AnthropicClient {
    const DEFAULT_MODEL: &'static str = "claude-3-7-sonnet-20250219";

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.send_messages_request(request).await?;
        response.text().ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "content": [
                    {"type": "text", "text": "<brief_json>{\"score\": 5,"},
                    {"type": "tool_use", "id": "x"},
                    {"type": "text", "text": " \"reason\": \"ok\"}</brief_json>"}
                ],
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        assert_eq!(
            response.text().as_deref(),
            Some("<brief_json>{\"score\": 5, \"reason\": \"ok\"}</brief_json>")
        );
    }

    #[test]
    fn test_response_without_text_is_empty() {
        let response: MessagesResponse =
            serde_json::from_str(r#"{"id": "msg_2", "content": [], "stop_reason": null}"#).unwrap();
        assert!(response.text().is_none());
    }
}
