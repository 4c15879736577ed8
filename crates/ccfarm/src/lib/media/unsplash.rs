use std::path::Path;

use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    http,
    media::{download_to, MediaError},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Photo {
    pub id: String,
    pub description: Option<String>,
    pub urls: PhotoUrls,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoUrls {
    pub regular: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

/// Client for the Unsplash photo search API
#[derive(Debug, Clone)]
pub struct UnsplashClient {
    client: ClientWithMiddleware,
    access_key: String,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            access_key: access_key.into(),
            base_url: "https://api.unsplash.com".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Photo>, MediaError> {
        let resp = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", self.access_key),
            )
            .query(&[("query", query), ("per_page", limit.to_string().as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = resp.json().await?;
        Ok(body.results)
    }

    /// Downloads the `regular` sized rendition of `photo`
    pub async fn download(&self, photo: &Photo, path: &Path) -> Result<(), MediaError> {
        let Some(url) = &photo.urls.regular else {
            return Err(MediaError::NotFound(format!(
                "photo {} has no regular url",
                photo.id
            )));
        };
        download_to(&self.client, url, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parses_results() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "total": 1,
                "results": [{
                    "id": "abc",
                    "description": null,
                    "urls": {"raw": "r", "full": "f", "regular": "https://images.unsplash.com/abc"}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(body.results.len(), 1);
        assert_eq!(
            body.results[0].urls.regular.as_deref(),
            Some("https://images.unsplash.com/abc")
        );
    }
}
