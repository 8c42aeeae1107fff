//! Transcript ingestion and speech-to-text back-ends
//!
//! The caption core only needs word timings. Whatever segmentation the
//! transcriber did is discarded: words from every segment are flattened into
//! a single [`WordStream`] and regrouped by our own rules.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use super::word::{Word, WordStream};
use super::Result;

/// Whisper-style transcription output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    /// Full transcript text
    #[serde(default)]
    pub text: String,
    /// Transcriber segments, each with its word list
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    /// Language reported by the transcriber, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One transcriber segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<TranscriptWord>,
}

/// Word as emitted by Whisper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    #[serde(alias = "text")]
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl TranscriptDocument {
    /// Parse a JSON transcript.
    ///
    /// # Errors
    ///
    /// Returns [`super::CaptionError::Transcript`] for malformed JSON or
    /// words missing `word`/`start`/`end`.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// All words across segments, in order
    #[must_use]
    pub fn words(&self) -> Vec<Word> {
        self.segments
            .iter()
            .flat_map(|s| s.words.iter())
            .map(|w| Word {
                text: w.word.clone(),
                start: w.start,
                end: w.end,
            })
            .collect()
    }

    /// Flatten into a validated stream.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the first malformed word.
    pub fn word_stream(&self) -> Result<WordStream> {
        WordStream::new(self.words())
    }

    /// Total number of words
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }
}

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Transcribe an audio file with word-level timestamps
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<TranscriptDocument>;

    /// Whether this back-end needs audio extracted from the video first
    fn needs_audio(&self) -> bool {
        true
    }
}

/// Whisper command-line tool (`openai-whisper`)
#[derive(Debug, Clone)]
pub struct WhisperCli {
    /// Path to the whisper executable
    pub whisper_path: String,
    /// Model size (tiny, base, small, medium, large)
    pub model: String,
    /// Language code; `None` lets whisper decide
    pub language: Option<String>,
    /// Directory whisper writes its JSON into
    pub output_dir: PathBuf,
    /// Additional whisper arguments
    pub extra_args: Vec<String>,
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self {
            whisper_path: "whisper".to_string(),
            model: "medium".to_string(),
            language: None,
            output_dir: std::env::temp_dir().join("wordcap"),
            extra_args: Vec::new(),
        }
    }
}

impl WhisperCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set model size
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set language
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    fn args(&self, audio: &Path) -> Vec<String> {
        let mut args = vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            self.output_dir.to_string_lossy().to_string(),
            "--word_timestamps".to_string(),
            "True".to_string(),
        ];

        if let Some(ref language) = self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn transcribe(&self, audio: &Path) -> anyhow::Result<TranscriptDocument> {
        fs::create_dir_all(&self.output_dir).await?;
        let args = self.args(audio);
        debug!("Running whisper with args: {:?}", args);

        let output = Command::new(&self.whisper_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.whisper_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Whisper transcription failed: {stderr}"));
        }

        let stem = audio
            .file_stem()
            .ok_or_else(|| anyhow!("audio path has no file name: {}", audio.display()))?
            .to_string_lossy();
        let json_path = self.output_dir.join(format!("{stem}.json"));

        let json = fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("Whisper output file not found: {}", json_path.display()))?;
        let _ = fs::remove_file(&json_path).await;

        Ok(TranscriptDocument::parse(&json)?)
    }
}

/// Decoding options forwarded to a Whisper HTTP server
#[derive(Debug, Clone, Serialize)]
pub struct ServerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub verbose: bool,
    pub word_timestamps: bool,
    pub beam_size: u32,
    pub best_of: u32,
    pub temperature: Vec<f32>,
    pub compression_ratio_threshold: f32,
    pub condition_on_previous_text: bool,
    pub fp16: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            language: None,
            verbose: false,
            word_timestamps: true,
            beam_size: 5,
            best_of: 5,
            temperature: vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
            compression_ratio_threshold: 2.4,
            condition_on_previous_text: true,
            fp16: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerRequest<'a> {
    audio_path: String,
    options: &'a ServerOptions,
}

/// Local Whisper HTTP server (`POST /transcribe` with an audio path)
///
/// The server reads the audio from the shared filesystem, so the path must
/// be visible to it.
#[derive(Debug, Clone)]
pub struct WhisperServer {
    /// Full endpoint URL
    pub url: String,
    /// Decoding options
    pub options: ServerOptions,
    client: reqwest::Client,
}

impl WhisperServer {
    /// Default local endpoint
    pub const DEFAULT_URL: &'static str = "http://127.0.0.1:5000/transcribe";

    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ServerOptions::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Set language
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.options.language = language;
        self
    }
}

impl Default for WhisperServer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

#[async_trait]
impl Transcriber for WhisperServer {
    fn name(&self) -> &str {
        "whisper-server"
    }

    async fn transcribe(&self, audio: &Path) -> anyhow::Result<TranscriptDocument> {
        let audio_path = std::path::absolute(audio)
            .unwrap_or_else(|_| audio.to_path_buf())
            .to_string_lossy()
            .to_string();
        debug!("POST {} for {}", self.url, audio_path);

        let request = ServerRequest {
            audio_path,
            options: &self.options,
        };

        let document = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Whisper server unreachable at {}", self.url))?
            .error_for_status()?
            .json::<TranscriptDocument>()
            .await
            .context("Whisper server returned an unexpected payload")?;

        Ok(document)
    }
}

/// Pre-computed transcript loaded from a JSON file
#[derive(Debug, Clone)]
pub struct StaticTranscript {
    path: PathBuf,
}

impl StaticTranscript {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Transcriber for StaticTranscript {
    fn name(&self) -> &str {
        "transcript-file"
    }

    async fn transcribe(&self, _audio: &Path) -> anyhow::Result<TranscriptDocument> {
        let json = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        TranscriptDocument::parse(&json)
            .with_context(|| format!("invalid transcript {}", self.path.display()))
    }

    fn needs_audio(&self) -> bool {
        false
    }
}
