use std::{fmt, path::Path, str::FromStr, time::Duration};

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use crate::{http, media::VideoUploader, types::VideoScript};

const MAX_TITLE_CHARS: usize = 100;
const DEFAULT_TITLE: &str = "Untitled Video";
/// "Entertainment"
const DEFAULT_CATEGORY_ID: &str = "24";
const MIN_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Slowest upload throughput still expected to finish
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 256 * 1024;

/// Time allowed for sending a video of `len` bytes
fn upload_timeout(len: usize) -> Duration {
    MIN_UPLOAD_TIMEOUT.max(Duration::from_secs(len as u64 / MIN_UPLOAD_BYTES_PER_SEC))
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Video file not found at {}", .0.display())]
    FileNotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("Token refresh failed: {status} - {message}")]
    Auth { status: u16, message: String },
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Upload session was created without a Location header")]
    MissingUploadUrl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Private => "private",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            "private" => Ok(PrivacyStatus::Private),
            other => Err(format!(
                "unknown privacy status '{other}', expected public, unlisted or private"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
}

impl From<&VideoScript> for VideoMetadata {
    fn from(script: &VideoScript) -> Self {
        Self {
            title: script.title.clone(),
            description: script.description.clone(),
            tags: script.tags.clone(),
            category_id: DEFAULT_CATEGORY_ID.into(),
            privacy: PrivacyStatus::default(),
        }
    }
}

impl VideoMetadata {
    fn resource(&self) -> serde_json::Value {
        serde_json::json!({
            "snippet": {
                "title": normalize_title(&self.title),
                "description": self.description,
                "tags": self.tags,
                "categoryId": self.category_id,
            },
            "status": {
                "privacyStatus": self.privacy.as_str(),
                "selfDeclaredMadeForKids": false,
            }
        })
    }
}

/// Applies YouTube's title rules: never blank, at most 100 characters
pub fn normalize_title(title: &str) -> String {
    if title.trim().is_empty() {
        return DEFAULT_TITLE.into();
    }

    let chars = title.chars().count();
    if chars > MAX_TITLE_CHARS {
        tracing::warn!(chars, "Title exceeds YouTube's 100-character limit, truncating");
        let truncated: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        return format!("{truncated}...");
    }

    title.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

/// Uploads videos through the YouTube Data API v3 using an OAuth2 refresh token
#[derive(Debug, Clone)]
pub struct YouTubeUploader {
    client: ClientWithMiddleware,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_url: String,
    upload_url: String,
}

impl YouTubeUploader {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client: http::default_client(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            upload_url: "https://www.googleapis.com/upload/youtube/v3/videos".into(),
        }
    }

    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.upload_url = upload_url.into();
        self
    }

    #[tracing::instrument(skip(self))]
    async fn access_token(&self) -> Result<String, UploadError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(UploadError::Auth { status, message });
        }

        Ok(resp.json::<TokenResponse>().await?.access_token)
    }

    /// Opens a resumable upload session and returns its upload url
    async fn start_session(
        &self,
        token: &str,
        metadata: &VideoMetadata,
        content_length: usize,
    ) -> Result<String, UploadError> {
        let resp = self
            .client
            .post(&self.upload_url)
            .bearer_auth(token)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", content_length.to_string())
            .json(&metadata.resource())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(UploadError::Api { status, message });
        }

        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(UploadError::MissingUploadUrl)
    }
}

impl VideoUploader for YouTubeUploader {
    #[tracing::instrument(skip(self, metadata), fields(title = %metadata.title))]
    async fn upload(&self, path: &Path, metadata: &VideoMetadata) -> Result<String, UploadError> {
        if !path.is_file() {
            tracing::error!("Video file not found");
            return Err(UploadError::FileNotFound(path.to_path_buf()));
        }
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"))
        {
            tracing::warn!("Video is not an MP4 file, upload might fail");
        }

        let bytes = tokio::fs::read(path).await?;
        let token = self
            .access_token()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to refresh access token"))?;
        let session = self.start_session(&token, metadata, bytes.len()).await?;

        let timeout = upload_timeout(bytes.len());
        tracing::info!(bytes = bytes.len(), timeout_secs = timeout.as_secs(), "Uploading video");
        let resp = self
            .client
            .put(&session)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "video/*")
            .timeout(timeout)
            .body(bytes)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to upload video"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, message, "Error uploading video to YouTube");
            return Err(UploadError::Api { status, message });
        }

        let video = resp.json::<UploadedVideo>().await?;
        tracing::info!(video_id = %video.id, "Video uploaded successfully");
        Ok(format!("https://youtu.be/{}", video.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeechSegment;

    #[test]
    fn test_upload_timeout_grows_with_size() {
        assert_eq!(upload_timeout(0), MIN_UPLOAD_TIMEOUT);
        assert_eq!(upload_timeout(10 * 1024 * 1024), MIN_UPLOAD_TIMEOUT);

        let two_gigabytes = 2 * 1024 * 1024 * 1024;
        assert_eq!(upload_timeout(two_gigabytes), Duration::from_secs(8192));
    }

    #[test]
    fn test_blank_title_gets_default() {
        assert_eq!(normalize_title(""), "Untitled Video");
        assert_eq!(normalize_title("   "), "Untitled Video");
    }

    #[test]
    fn test_long_title_is_truncated() {
        let title = "a".repeat(150);
        let normalized = normalize_title(&title);
        assert_eq!(normalized.chars().count(), 100);
        assert!(normalized.ends_with("..."));
        assert_eq!(&normalized[..97], &title[..97]);

        let exact = "b".repeat(100);
        assert_eq!(normalize_title(&exact), exact);
    }

    #[test]
    fn test_resource_body() {
        let script = VideoScript {
            title: "TikTok's Death Spiral".into(),
            description: "A satirical take".into(),
            tags: vec!["Technology".into()],
            segments: vec![SpeechSegment {
                text: "hi".into(),
                keywords: vec!["tiktok".into()],
            }],
        };
        let mut metadata = VideoMetadata::from(&script);
        metadata.privacy = PrivacyStatus::Unlisted;

        let body = metadata.resource();
        assert_eq!(body["snippet"]["title"], "TikTok's Death Spiral");
        assert_eq!(body["snippet"]["categoryId"], "24");
        assert_eq!(body["snippet"]["tags"][0], "Technology");
        assert_eq!(body["status"]["privacyStatus"], "unlisted");
        assert_eq!(body["status"]["selfDeclaredMadeForKids"], false);
    }

    #[test]
    fn test_privacy_parsing() {
        assert_eq!("Private".parse::<PrivacyStatus>(), Ok(PrivacyStatus::Private));
        assert!("secret".parse::<PrivacyStatus>().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let uploader = YouTubeUploader::new("id", "secret", "refresh");
        let metadata = VideoMetadata {
            title: "t".into(),
            description: "d".into(),
            tags: vec![],
            category_id: "24".into(),
            privacy: PrivacyStatus::Public,
        };

        let result = uploader
            .upload(Path::new("/nonexistent/video.mp4"), &metadata)
            .await;
        assert!(matches!(result, Err(UploadError::FileNotFound(_))));
    }
}
