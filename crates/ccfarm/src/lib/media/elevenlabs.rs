use reqwest_middleware::ClientWithMiddleware;

use crate::{
    http,
    media::{MediaError, VoiceActor},
};

/// ElevenLabs text to speech
#[derive(Debug, Clone)]
pub struct ElevenLabsVoice {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    voice_id: String,
    model_id: Option<String>,
}

impl ElevenLabsVoice {
    pub const DEFAULT_VOICE_ID: &'static str = "zGjIP4SZlMnY9m93k97r";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            api_key: api_key.into(),
            base_url: "https://api.elevenlabs.io".into(),
            voice_id: Self::DEFAULT_VOICE_ID.into(),
            model_id: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

impl VoiceActor for ElevenLabsVoice {
    #[tracing::instrument(skip_all, fields(voice = %self.voice_id, chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, MediaError> {
        let mut body = serde_json::json!({ "text": text });
        if let Some(model_id) = &self.model_id {
            body["model_id"] = model_id.as_str().into();
        }

        let resp = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url, self.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(MediaError::Api { status, message });
        }

        let audio = resp.bytes().await?;
        tracing::debug!(bytes = audio.len(), "Received speech audio");
        Ok(audio.to_vec())
    }
}
