//! ffprobe/ffmpeg helpers: frame geometry and audio extraction

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::layout::FrameSize;

/// Geometry and timing of the input video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Container duration in seconds
    pub duration: f64,
    pub fps: f64,
    pub has_audio: bool,
}

impl VideoInfo {
    #[must_use]
    pub fn frame(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rate such as `30/1` or `30000/1001`
fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.trim().parse().ok(),
    }
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json).context("unreadable ffprobe output")?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Err(anyhow!("video stream has no dimensions"));
    };

    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .filter(|fps| *fps > 0.0)
        .unwrap_or(30.0);

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width,
        height,
        duration,
        fps,
        has_audio: probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

/// Read frame size, duration and frame rate with ffprobe
pub async fn probe_video(ffprobe_path: &str, input: &Path) -> Result<VideoInfo> {
    let output = Command::new(ffprobe_path)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run {ffprobe_path}"))?;

    if !output.status.success() {
        return Err(anyhow!("ffprobe failed for {}", input.display()));
    }

    let info = parse_probe(&output.stdout)?;
    debug!("probed {}: {:?}", input.display(), info);
    Ok(info)
}

/// Extract mono 16 kHz PCM audio for transcription
pub async fn extract_audio(ffmpeg_path: &str, input: &Path, temp_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(temp_dir).await?;
    let audio_path = temp_dir.join(format!("{}.wav", uuid::Uuid::new_v4()));

    let status = Command::new(ffmpeg_path)
        .arg("-i")
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y"])
        .arg(&audio_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to run {ffmpeg_path}"))?;

    if !status.success() {
        return Err(anyhow!("Failed to extract audio from {}", input.display()));
    }

    Ok(audio_path)
}

/// Locate a tool on `PATH`, falling back to the bare name
#[must_use]
pub fn find_tool(name: &str) -> String {
    which::which(name).map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
}
