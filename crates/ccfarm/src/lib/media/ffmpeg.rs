use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::media::{MediaError, Visual, VisualKind};

/// Output encoding of rendered videos
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
            video_codec: "libx264".into(),
            audio_codec: "libmp3lame".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

impl RenderSettings {
    /// Scales to the frame height and centres the result on a black frame
    fn frame_filter(&self) -> String {
        format!(
            "scale=-2:{h},scale=w='min(iw,{w})':h='min(ih,{h})':force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format=yuv420p",
            w = self.width,
            h = self.height,
            fps = self.fps,
        )
    }
}

/// Thin wrapper over the `ffmpeg` and `ffprobe` binaries
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    settings: RenderSettings,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl Ffmpeg {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            settings,
        }
    }

    pub fn with_binaries(
        mut self,
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
    ) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Duration of a media file in seconds
    #[tracing::instrument(skip(self))]
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of"])
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::Ffmpeg(format!(
                "ffprobe failed for {} with status code {}: {}",
                path.display(),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                MediaError::Ffmpeg(format!(
                    "ffprobe returned no usable duration for {}: '{}'",
                    path.display(),
                    stdout.trim()
                ))
            })
    }

    /// Renders `visuals` as an evenly timed slideshow over `audio`
    #[tracing::instrument(skip(self, visuals), fields(visuals = visuals.len()))]
    pub async fn render_segment(
        &self,
        visuals: &[Visual],
        audio: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        if visuals.is_empty() {
            return Err(MediaError::Ffmpeg("no visuals to render".into()));
        }

        let total = self.probe_duration(audio).await?;
        let slot = total / visuals.len() as f64;
        tracing::debug!(total, slot, "Rendering segment");

        let scratch = output.with_extension("clips");
        tokio::fs::create_dir_all(&scratch).await?;

        let mut clips = Vec::with_capacity(visuals.len());
        for (i, visual) in visuals.iter().enumerate() {
            let clip = scratch.join(format!("clip_{i:03}.mp4"));
            self.run(visual_clip_args(&self.settings, visual, slot, &clip))
                .await?;
            clips.push(clip);
        }

        let list = scratch.join("clips.txt");
        tokio::fs::write(&list, concat_list(&clips)).await?;
        self.run(mux_args(&self.settings, &list, audio, output))
            .await?;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::warn!(error = %e, "Failed to remove segment scratch files");
        }

        Ok(())
    }

    /// Joins already encoded videos sharing the same settings
    #[tracing::instrument(skip(self, parts), fields(parts = parts.len()))]
    pub async fn concatenate(&self, parts: &[PathBuf], output: &Path) -> Result<(), MediaError> {
        if parts.is_empty() {
            return Err(MediaError::Ffmpeg("no videos to concatenate".into()));
        }

        let list = output.with_extension("parts.txt");
        tokio::fs::write(&list, concat_list(parts)).await?;
        let result = self.run(concat_args(&list, output)).await;

        if let Err(e) = tokio::fs::remove_file(&list).await {
            tracing::warn!(error = %e, "Failed to remove concat list");
        }

        result
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), MediaError> {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                status = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "ffmpeg failed"
            );
            return Err(MediaError::Ffmpeg(format!(
                "ffmpeg failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Arguments encoding one silent clip of `seconds` from `visual`
fn visual_clip_args(
    settings: &RenderSettings,
    visual: &Visual,
    seconds: f64,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = match visual.kind {
        VisualKind::Gif => vec!["-ignore_loop".into(), "0".into()],
        VisualKind::Image => vec!["-loop".into(), "1".into()],
    };

    args.extend([
        "-i".into(),
        visual.path.clone().into_os_string(),
        "-t".into(),
        format!("{seconds:.3}").into(),
        "-vf".into(),
        settings.frame_filter().into(),
        "-an".into(),
        "-c:v".into(),
        settings.video_codec.clone().into(),
        "-r".into(),
        settings.fps.to_string().into(),
        output.as_os_str().to_owned(),
    ]);

    args
}

/// Arguments joining the clips in `list` and laying `audio` under them
fn mux_args(settings: &RenderSettings, list: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.as_os_str().to_owned(),
        "-i".into(),
        audio.as_os_str().to_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        settings.video_codec.clone().into(),
        "-r".into(),
        settings.fps.to_string().into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        settings.audio_codec.clone().into(),
        "-b:a".into(),
        settings.audio_bitrate.clone().into(),
        "-shortest".into(),
        output.as_os_str().to_owned(),
    ]
}

/// Arguments for a stream copy concatenation of the files in `list`
fn concat_args(list: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.as_os_str().to_owned(),
        "-c".into(),
        "copy".into(),
        output.as_os_str().to_owned(),
    ]
}

/// Contents of an ffmpeg concat demuxer list
fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
        .collect()
}
