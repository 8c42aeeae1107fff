//! Configuration loaded from `~/.config/wordcap/config.toml`.
//!
//! Every section is optional; a missing file means built-in defaults.
//! Command-line flags override whatever is loaded here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::caption::{
    find_tool, PipelineConfig, RenderStrategy, SegmentationParams, SinkConfig, StyleProfile,
    StyleRegistry, Transcriber, WhisperCli, WhisperServer,
};

/// Segmentation limits as written in the file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SegmentationSection {
    pub max_gap: f64,
    /// Negative values mean unlimited.
    pub max_words: i64,
    pub max_duration: f64,
}

impl Default for SegmentationSection {
    fn default() -> Self {
        let params = SegmentationParams::default();
        Self {
            max_gap: params.max_gap,
            max_words: i64::try_from(params.max_words).unwrap_or(i64::MAX),
            max_duration: params.max_duration,
        }
    }
}

impl SegmentationSection {
    #[must_use]
    pub fn params(&self) -> SegmentationParams {
        let max_words = usize::try_from(self.max_words).unwrap_or(0);
        SegmentationParams::new(self.max_gap, max_words, self.max_duration)
    }
}

/// Speech-to-text back-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local `whisper` command.
    #[default]
    Cli,
    /// Whisper HTTP server.
    Server,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSection {
    pub backend: Backend,
    pub model: String,
    pub language: Option<String>,
    pub whisper_path: Option<String>,
    pub server_url: String,
}

impl Default for TranscriptionSection {
    fn default() -> Self {
        Self {
            backend: Backend::Cli,
            model: "medium".to_string(),
            language: None,
            whisper_path: None,
            server_url: WhisperServer::DEFAULT_URL.to_string(),
        }
    }
}

/// Encoder preset for captioned output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// ffmpeg defaults.
    #[default]
    Standard,
    /// Slow x264 with a low CRF and 192k AAC.
    High,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub strategy: RenderStrategy,
    pub quality: Quality,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub hwaccel: Option<String>,
    /// Report overlapping captions.
    pub strict: bool,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationSection,
    /// Default style preset name.
    pub style: Option<String>,
    /// Custom presets; unspecified fields fall back to `punchy`.
    pub styles: BTreeMap<String, StyleProfile>,
    pub transcription: TranscriptionSection,
    pub render: RenderSection,
}

impl Config {
    /// Preset used when none is given on the command line.
    #[must_use]
    pub fn style_name(&self) -> &str {
        self.style.as_deref().unwrap_or("punchy")
    }

    /// Built-in presets plus the ones declared in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if a custom preset is invalid.
    pub fn registry(&self) -> Result<StyleRegistry> {
        let mut registry = StyleRegistry::builtin();
        for (name, profile) in &self.styles {
            registry
                .insert(name.clone(), profile.clone())
                .with_context(|| format!("invalid style [styles.{name}]"))?;
        }
        Ok(registry)
    }

    /// ffmpeg settings for the render sink.
    #[must_use]
    pub fn sink_config(&self) -> SinkConfig {
        let render = &self.render;
        let mut config = match render.quality {
            Quality::Standard => SinkConfig::default(),
            Quality::High => SinkConfig::high_quality(),
        }
        .with_strategy(render.strategy);

        if let Some(ref path) = render.ffmpeg_path {
            config.ffmpeg_path.clone_from(path);
        }
        if let Some(ref accel) = render.hwaccel {
            config = config.with_hwaccel(accel);
        }
        // Explicit settings win over presets and the accelerator's encoder
        for (field, value) in [
            (&mut config.video_codec, &render.video_codec),
            (&mut config.audio_codec, &render.audio_codec),
            (&mut config.video_bitrate, &render.video_bitrate),
            (&mut config.audio_bitrate, &render.audio_bitrate),
        ] {
            if value.is_some() {
                field.clone_from(value);
            }
        }
        config
    }

    /// Pipeline settings for `style`.
    #[must_use]
    pub fn pipeline_config(&self, style: StyleProfile) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_params(self.segmentation.params())
            .with_style(style)
            .with_strict(self.render.strict);
        if let Some(ref path) = self.render.ffmpeg_path {
            config.ffmpeg_path.clone_from(path);
        }
        if let Some(ref path) = self.render.ffprobe_path {
            config.ffprobe_path.clone_from(path);
        }
        config
    }

    /// Speech-to-text back-end selected by `[transcription]`.
    #[must_use]
    pub fn transcriber(&self) -> Box<dyn Transcriber> {
        let section = &self.transcription;
        match section.backend {
            Backend::Server => Box::new(
                WhisperServer::new(section.server_url.clone())
                    .with_language(section.language.clone()),
            ),
            Backend::Cli => {
                let mut whisper = WhisperCli::new()
                    .with_model(&section.model)
                    .with_language(section.language.clone());
                whisper.whisper_path = section
                    .whisper_path
                    .clone()
                    .unwrap_or_else(|| find_tool("whisper"));
                Box::new(whisper)
            }
        }
    }
}

/// Load configuration from `~/.config/wordcap/config.toml`.
///
/// Returns defaults if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    let path = config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wordcap")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::SegmentationMethod;
    use std::io::Write;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn parse_empty_config() {
        let config = parse("");
        assert_eq!(config.segmentation.params(), SegmentationParams::default());
        assert_eq!(config.style_name(), "punchy");
        assert_eq!(config.transcription.backend, Backend::Cli);
        assert_eq!(config.render.strategy, RenderStrategy::Drawtext);
        assert!(!config.render.strict);
    }

    #[test]
    fn negative_max_words_is_unlimited() {
        let config = parse("[segmentation]\nmax_words = -1\nmax_gap = 0.5\n");
        let params = config.segmentation.params();
        assert_eq!(params.max_words, 0);
        assert!((params.max_gap - 0.5).abs() < f64::EPSILON);
        assert!((params.max_duration - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_style_registered() {
        let config = parse(
            r#"
style = "loud"

[styles.loud]
pixel_size = 110
foreground_color = "FF0000"
segmentation_method = "per_word"
"#,
        );
        let registry = config.registry().unwrap();
        let loud = registry.get(config.style_name()).unwrap();
        assert_eq!(loud.pixel_size, 110);
        assert_eq!(loud.segmentation_method, SegmentationMethod::PerWord);
        // Unset fields come from punchy
        assert_eq!(loud.max_lines, 1);
        assert!(registry.get("subtitle").is_ok());
    }

    #[test]
    fn invalid_custom_style_rejected() {
        let config = parse("[styles.broken]\nmax_lines = 0\n");
        assert!(config.registry().is_err());
    }

    #[test]
    fn render_section_feeds_sink() {
        let config = parse(
            r#"
[render]
strategy = "ass"
ffmpeg_path = "/opt/ffmpeg"
hwaccel = "cuda"
audio_codec = "aac"
"#,
        );
        let sink = config.sink_config();
        assert_eq!(sink.strategy, RenderStrategy::Ass);
        assert_eq!(sink.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(sink.video_codec.as_deref(), Some("h264_nvenc"));
        assert_eq!(sink.audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn high_quality_preset() {
        let sink = parse("[render]\nquality = \"high\"\naudio_bitrate = \"256k\"\n").sink_config();
        assert_eq!(sink.video_codec.as_deref(), Some("libx264"));
        assert_eq!(sink.audio_codec.as_deref(), Some("aac"));
        assert_eq!(sink.audio_bitrate.as_deref(), Some("256k"));
        assert!(sink.output_args.contains(&"-crf".to_string()));

        let standard = parse("").sink_config();
        assert!(standard.video_codec.is_none());
        assert!(standard.output_args.is_empty());
    }

    #[test]
    fn hwaccel_overrides_high_quality_encoder() {
        let config = parse("[render]\nquality = \"high\"\nhwaccel = \"videotoolbox\"\n");
        assert_eq!(config.sink_config().video_codec.as_deref(), Some("h264_videotoolbox"));
    }

    #[test]
    fn explicit_codec_beats_hwaccel_default() {
        let config = parse("[render]\nhwaccel = \"cuda\"\nvideo_codec = \"hevc_nvenc\"\n");
        assert_eq!(config.sink_config().video_codec.as_deref(), Some("hevc_nvenc"));
    }

    #[test]
    fn server_backend_selected() {
        let config = parse("[transcription]\nbackend = \"server\"\nlanguage = \"fi\"\n");
        assert_eq!(config.transcriber().name(), "whisper-server");
        assert_eq!(parse("").transcriber().name(), "whisper-cli");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[segmentation]\nmax_duration = 3.5\n\n[render]\nstrict = true").unwrap();

        let config = load_from(file.path()).unwrap();
        assert!((config.segmentation.max_duration - 3.5).abs() < f64::EPSILON);
        let pipeline = config.pipeline_config(StyleProfile::subtitle());
        assert!(pipeline.options.strict);
        assert_eq!(pipeline.style, StyleProfile::subtitle());
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[segmentation\nmax_gap = ").unwrap();
        assert!(load_from(file.path()).is_err());
    }

    #[test]
    fn config_path_under_wordcap() {
        assert!(config_path().ends_with("wordcap/config.toml"));
    }
}
