use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    media::{Ffmpeg, MediaLibrary, Studio, VoiceActor},
    types::{SpeechSegment, VideoScript},
};

/// Renders scripts by narrating each segment over stock visuals
#[derive(Debug, Clone)]
pub struct FfmpegStudio<V, M> {
    voice: V,
    library: M,
    ffmpeg: Ffmpeg,
}

impl<V, M> FfmpegStudio<V, M>
where
    V: VoiceActor + Sync,
    M: MediaLibrary + Sync,
{
    pub fn new(voice: V, library: M, ffmpeg: Ffmpeg) -> Self {
        Self {
            voice,
            library,
            ffmpeg,
        }
    }

    #[tracing::instrument(skip(self, segment, dir))]
    async fn render_segment(
        &self,
        index: usize,
        segment: &SpeechSegment,
        dir: &Path,
    ) -> anyhow::Result<PathBuf> {
        if segment.keywords.is_empty() {
            anyhow::bail!("No keywords provided for the segment");
        }

        let audio = self
            .voice
            .synthesize(&segment.text)
            .await
            .context("Failed to synthesize speech")?;
        let audio_path = dir.join("voice.mp3");
        tokio::fs::write(&audio_path, audio)
            .await
            .context("Failed to write speech audio")?;

        // keywords may share a file stem, each gets its own directory
        let mut visuals = Vec::new();
        for (k, keyword) in segment.keywords.iter().enumerate() {
            let keyword_dir = dir.join(format!("keyword_{:02}", k + 1));
            tokio::fs::create_dir_all(&keyword_dir).await?;
            visuals.extend(self.library.fetch_visuals(keyword, &keyword_dir).await);
        }
        if visuals.is_empty() {
            anyhow::bail!("No visuals could be fetched");
        }
        tracing::info!(visuals = visuals.len(), "Collected visuals");

        let output = dir.join(format!("segment_{index:02}.mp4"));
        self.ffmpeg
            .render_segment(&visuals, &audio_path, &output)
            .await
            .context("Failed to render segment")?;

        Ok(output)
    }
}

impl<V, M> Studio for FfmpegStudio<V, M>
where
    V: VoiceActor + Sync,
    M: MediaLibrary + Sync,
{
    #[tracing::instrument(skip_all, fields(title = %script.title, segments = script.segments.len()))]
    async fn render(&self, script: &VideoScript, output: &Path) -> anyhow::Result<PathBuf> {
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        // removed on drop, whatever the outcome
        let scratch = tempfile::Builder::new()
            .prefix(".segments-")
            .tempdir_in(parent)
            .context("Failed to create scratch directory")?;

        let mut parts = Vec::with_capacity(script.segments.len());
        for (i, segment) in script.segments.iter().enumerate() {
            tracing::info!(segment = i + 1, "Processing segment");

            let dir = scratch.path().join(format!("segment_{:02}", i + 1));
            tokio::fs::create_dir_all(&dir).await?;

            match self.render_segment(i + 1, segment, &dir).await {
                Ok(part) => parts.push(part),
                Err(e) => {
                    tracing::warn!(error = ?e, segment = i + 1, "Failed to create video for segment")
                }
            }
        }

        if parts.is_empty() {
            anyhow::bail!("No segment videos were successfully created");
        }

        tracing::info!(parts = parts.len(), "Concatenating segment videos");
        self.ffmpeg
            .concatenate(&parts, output)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to concatenate segments"))
            .context("Failed to write final video")?;

        Ok(output.to_path_buf())
    }
}
