//! ffmpeg render sinks for burning caption timelines into video
//!
//! Two strategies draw the same timeline:
//! - `drawtext` - one filter per wrapped line, gated by the element's window
//! - `ass` - a generated ASS script burned in through libass
//!
//! An empty timeline stream-copies the video so the base frames come out
//! unchanged. No `-shortest` is passed, so the output keeps the full
//! duration of the input.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::ass::AssScript;
use super::media::find_tool;
use super::style::StyleProfile;
use super::timeline::OverlayTimeline;

/// How captions are drawn onto frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// ffmpeg `drawtext` filters
    #[default]
    Drawtext,
    /// libass burn-in of a generated script
    Ass,
}

impl RenderStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drawtext => "drawtext",
            Self::Ass => "ass",
        }
    }
}

impl FromStr for RenderStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drawtext" | "text" => Ok(Self::Drawtext),
            "ass" | "libass" | "subtitles" => Ok(Self::Ass),
            other => Err(anyhow!("unknown render strategy '{other}' (expected drawtext or ass)")),
        }
    }
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ffmpeg invocation settings
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Video codec when captions are drawn (None = libx264)
    pub video_codec: Option<String>,
    /// Audio codec (None = copy)
    pub audio_codec: Option<String>,
    /// Video bitrate (e.g., "5M")
    pub video_bitrate: Option<String>,
    /// Audio bitrate (e.g., "128k")
    pub audio_bitrate: Option<String>,
    /// Hardware acceleration (e.g., "videotoolbox", "cuda")
    pub hwaccel: Option<String>,
    /// Additional ffmpeg input arguments
    pub input_args: Vec<String>,
    /// Additional ffmpeg output arguments
    pub output_args: Vec<String>,
    pub strategy: RenderStrategy,
    /// Where intermediate ASS scripts are written
    pub temp_dir: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: find_tool("ffmpeg"),
            video_codec: None,
            audio_codec: None,
            video_bitrate: None,
            audio_bitrate: None,
            hwaccel: None,
            input_args: Vec::new(),
            output_args: Vec::new(),
            strategy: RenderStrategy::default(),
            temp_dir: std::env::temp_dir().join("wordcap"),
        }
    }
}

impl SinkConfig {
    /// Slow, high-bitrate output for final delivery
    #[must_use]
    pub fn high_quality() -> Self {
        Self {
            video_codec: Some("libx264".to_string()),
            audio_codec: Some("aac".to_string()),
            audio_bitrate: Some("192k".to_string()),
            output_args: vec![
                "-preset".to_string(),
                "slow".to_string(),
                "-crf".to_string(),
                "18".to_string(),
            ],
            ..Default::default()
        }
    }

    /// Enable hardware acceleration and pick the matching encoder
    #[must_use]
    pub fn with_hwaccel(mut self, accel: &str) -> Self {
        self.hwaccel = Some(accel.to_string());
        self.video_codec = Some(
            match accel {
                "videotoolbox" => "h264_videotoolbox",
                "cuda" | "nvenc" => "h264_nvenc",
                "vaapi" => "h264_vaapi",
                "qsv" => "h264_qsv",
                _ => "libx264",
            }
            .to_string(),
        );
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: RenderStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Outcome of one render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    pub output: PathBuf,
    pub strategy: RenderStrategy,
    /// Timeline elements drawn
    pub elements: usize,
    /// Video was stream-copied because nothing needed drawing
    pub copied_video: bool,
    pub elapsed_secs: f64,
}

/// Consumes a timeline and produces the output video
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn render(
        &self,
        input: &Path,
        timeline: &OverlayTimeline,
        output: &Path,
    ) -> Result<RenderReport>;
}

/// Quote a filter option value so it survives both ffmpeg parsing levels.
///
/// The option parser unescapes backslash, `'` and `:`. Above it the
/// filtergraph parser reads the value single-quoted, so only `'` has to
/// step outside the quotes.
fn quote_filter_value(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:");
    format!("'{}'", escaped.replace('\'', "'\\''"))
}

/// Renders through an ffmpeg child process
pub struct FfmpegSink {
    config: SinkConfig,
    style: StyleProfile,
}

impl FfmpegSink {
    #[must_use]
    pub fn new(config: SinkConfig, style: StyleProfile) -> Self {
        Self { config, style }
    }

    #[must_use]
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// One `drawtext` per wrapped line of every element, in paint order
    fn build_drawtext_filter(&self, timeline: &OverlayTimeline) -> String {
        let style = &self.style;
        let line_height = style.line_height();
        let mut filters = Vec::new();

        for element in &timeline.elements {
            if element.end <= element.start {
                continue;
            }
            let enable = format!("gte(t,{:.3})*lt(t,{:.3})", element.start, element.end);
            let (_, top) = element.layout.anchor_position;

            for (i, line) in element.layout.wrapped_lines.iter().enumerate() {
                let y = top + line_height * i as u32;
                let mut drawtext = format!(
                    "drawtext=text={}:expansion=none:font={}:fontsize={}:fontcolor={}",
                    quote_filter_value(line),
                    quote_filter_value(&style.font),
                    style.pixel_size,
                    style.foreground_color.to_ffmpeg(),
                );
                if style.stroke_width > 0.0 {
                    drawtext.push_str(&format!(
                        ":borderw={}:bordercolor={}",
                        style.stroke_width.round() as u32,
                        style.stroke_color.to_ffmpeg()
                    ));
                }
                if let Some(bg) = style.background_color {
                    drawtext.push_str(&format!(
                        ":box=1:boxcolor={}:boxborderw={}",
                        bg.to_ffmpeg(),
                        (style.pixel_size / 6).max(2)
                    ));
                }
                drawtext.push_str(&format!(":x=(w-text_w)/2:y={y}:enable='{enable}'"));
                filters.push(drawtext);
            }
        }

        filters.join(",")
    }

    fn build_ass_filter(script: &Path) -> String {
        format!("ass={}", quote_filter_value(&script.to_string_lossy()))
    }

    /// Build ffmpeg arguments
    fn build_args(&self, input: &Path, output: &Path, filter: &str) -> Vec<String> {
        let config = &self.config;
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-stats"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        if let Some(ref accel) = config.hwaccel {
            args.push("-hwaccel".to_string());
            args.push(accel.clone());
        }

        args.extend(config.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(input.to_string_lossy().to_string());

        if filter.is_empty() {
            args.push("-c:v".to_string());
            args.push("copy".to_string());
        } else {
            args.push("-vf".to_string());
            args.push(filter.to_string());
            args.push("-c:v".to_string());
            args.push(
                config
                    .video_codec
                    .clone()
                    .unwrap_or_else(|| "libx264".to_string()),
            );
            if let Some(ref bitrate) = config.video_bitrate {
                args.push("-b:v".to_string());
                args.push(bitrate.clone());
            }
        }

        args.push("-c:a".to_string());
        args.push(config.audio_codec.clone().unwrap_or_else(|| "copy".to_string()));
        if let Some(ref bitrate) = config.audio_bitrate {
            args.push("-b:a".to_string());
            args.push(bitrate.clone());
        }

        args.extend(config.output_args.iter().cloned());

        args.push("-y".to_string());
        args.push(output.to_string_lossy().to_string());
        args
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!("ffmpeg args: {:?}", args);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("failed to start {}: {e}", self.config.ffmpeg_path))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut last = None;
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("Error") || line.contains("Warning") {
                        warn!("ffmpeg: {}", line);
                    } else {
                        debug!("ffmpeg: {}", line);
                    }
                    last = Some(line);
                }
                last
            })
        });

        let status = child.wait().await?;
        let last_line = match stderr_task {
            Some(task) => task.await.ok().flatten(),
            None => None,
        };

        if !status.success() {
            return Err(match last_line {
                Some(line) => anyhow!("ffmpeg exited with status {status}: {line}"),
                None => anyhow!("ffmpeg exited with status {status}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RenderSink for FfmpegSink {
    async fn render(
        &self,
        input: &Path,
        timeline: &OverlayTimeline,
        output: &Path,
    ) -> Result<RenderReport> {
        let started = Instant::now();
        let strategy = self.config.strategy;

        let mut script_path = None;
        let filter = if timeline.is_empty() {
            String::new()
        } else {
            match strategy {
                RenderStrategy::Drawtext => self.build_drawtext_filter(timeline),
                RenderStrategy::Ass => {
                    tokio::fs::create_dir_all(&self.config.temp_dir).await?;
                    let path = self
                        .config
                        .temp_dir
                        .join(format!("{}.ass", uuid::Uuid::new_v4()));
                    AssScript::new(timeline, &self.style)
                        .write_to_file(&path)
                        .await?;
                    let filter = Self::build_ass_filter(&path);
                    script_path = Some(path);
                    filter
                }
            }
        };

        let args = self.build_args(input, output, &filter);
        let result = self.run_ffmpeg(&args).await;

        if let Some(path) = script_path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!("could not remove {}: {e}", path.display());
            }
        }
        result?;

        let report = RenderReport {
            output: output.to_path_buf(),
            strategy,
            elements: timeline.len(),
            copied_video: filter.is_empty(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            "Rendered {} captions via {} to {:?}",
            report.elements, strategy, output
        );
        Ok(report)
    }
}
