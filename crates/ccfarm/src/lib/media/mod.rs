//! # Media
//!
//! Everything needed to turn a [`VideoScript`](crate::types::VideoScript)
//! into a published video: speech synthesis, visual search, compositing with
//! ffmpeg and the YouTube upload.

pub mod elevenlabs;
pub mod ffmpeg;
pub mod giphy;
pub mod stock;
pub mod studio;
pub mod unsplash;
pub mod youtube;

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use reqwest_middleware::ClientWithMiddleware;
use tokio::io::AsyncWriteExt;

use crate::types::VideoScript;

pub use elevenlabs::ElevenLabsVoice;
pub use ffmpeg::{Ffmpeg, RenderSettings};
pub use giphy::GiphyClient;
pub use stock::StockMedia;
pub use studio::FfmpegStudio;
pub use unsplash::UnsplashClient;
pub use youtube::{PrivacyStatus, UploadError, VideoMetadata, YouTubeUploader};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Downloaded file {} is empty", .0.display())]
    EmptyDownload(PathBuf),
    #[error("{0}")]
    Ffmpeg(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    /// Animated, looped for the length of its slot
    Gif,
    /// Still, held for the length of its slot
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visual {
    pub path: PathBuf,
    pub kind: VisualKind,
}

/// Text to speech
pub trait VoiceActor {
    /// Returns MP3 encoded speech
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>, MediaError>> + Send;
}

/// Source of GIFs and pictures illustrating a keyword
pub trait MediaLibrary {
    /// Downloads visuals matching `keyword` into `dir`.
    ///
    /// Individual failures are skipped, so the result may be empty.
    fn fetch_visuals(
        &self,
        keyword: &str,
        dir: &Path,
    ) -> impl Future<Output = Vec<Visual>> + Send;
}

/// Renders a script into a video file
pub trait Studio {
    /// Renders `script` to `output` and returns the written path
    fn render(
        &self,
        script: &VideoScript,
        output: &Path,
    ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;
}

/// Publishes rendered videos
pub trait VideoUploader {
    /// Uploads the video at `path` and returns its public url
    fn upload(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
}

/// Streams the body at `url` into `path`, failing on an empty body.
///
/// The body lands in a `.part` sibling first, so `path` only ever holds a
/// complete download.
pub(crate) async fn download_to(
    client: &ClientWithMiddleware,
    url: &str,
    path: &Path,
) -> Result<(), MediaError> {
    let partial = partial_path(path);

    let written = match stream_body(client, url, &partial).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };
    if written == 0 {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(MediaError::EmptyDownload(path.to_path_buf()));
    }

    tokio::fs::rename(&partial, path).await?;
    Ok(())
}

async fn stream_body(
    client: &ClientWithMiddleware,
    url: &str,
    path: &Path,
) -> Result<usize, MediaError> {
    let mut resp = client.get(url).send().await?.error_for_status()?;

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Turns a keyword into something usable inside a file name
pub(crate) fn file_stem(keyword: &str) -> String {
    let stem: String = keyword
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    if stem.trim_matches('_').is_empty() {
        "visual".into()
    } else {
        stem
    }
}
