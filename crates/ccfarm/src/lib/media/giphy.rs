use std::path::Path;

use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    http,
    media::{download_to, MediaError},
};

/// Original rendition of a GIF as returned by the search API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GifImage {
    pub url: String,
    pub mp4: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<GifData>,
}

#[derive(Debug, Deserialize)]
struct GifData {
    images: Option<GifRenditions>,
}

#[derive(Debug, Deserialize)]
struct GifRenditions {
    original: Option<GifImage>,
}

/// Client for the Giphy search API
#[derive(Debug, Clone)]
pub struct GiphyClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl GiphyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            api_key: api_key.into(),
            base_url: "https://api.giphy.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, keyword: &str, limit: u32) -> Result<Vec<GifImage>, MediaError> {
        let resp = self
            .client
            .get(format!("{}/gifs/search", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("q", keyword),
                ("limit", limit.to_string().as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = resp.json().await?;
        Ok(originals(body))
    }

    /// Downloads the GIF itself, not its mp4 rendition
    pub async fn download(&self, gif: &GifImage, path: &Path) -> Result<(), MediaError> {
        download_to(&self.client, &gif.url, path).await
    }
}

fn originals(body: SearchResponse) -> Vec<GifImage> {
    body.data
        .into_iter()
        .filter_map(|gif| gif.images?.original)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_keeps_original_renditions() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "data": [
                    {"images": {"original": {"url": "https://media.giphy.com/a.gif", "mp4": "https://media.giphy.com/a.mp4", "width": "480", "height": "270"}}},
                    {"images": {"fixed_height": {"url": "https://media.giphy.com/b.gif"}}},
                    {"id": "no-images"}
                ],
                "pagination": {"count": 3}
            }"#,
        )
        .unwrap();

        let gifs = originals(body);
        assert_eq!(gifs.len(), 1);
        assert_eq!(gifs[0].url, "https://media.giphy.com/a.gif");
        assert_eq!(gifs[0].mp4.as_deref(), Some("https://media.giphy.com/a.mp4"));
    }

    #[test]
    fn test_empty_search_response() {
        let body: SearchResponse = serde_json::from_str(r#"{"meta": {"status": 200}}"#).unwrap();
        assert!(originals(body).is_empty());
    }
}
