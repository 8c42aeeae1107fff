//! Word-timed caption segmentation and overlay rendering
//!
//! Turns a word-level transcript into styled, time-boxed caption overlays
//! and burns them into a video.
//!
//! # Stages
//!
//! - **Ingestion** - Whisper-style JSON flattened into a validated [`WordStream`]
//! - **Segmentation** - gap / word-count / duration cuts into [`CaptionSegment`]s
//! - **Layout** - line wrapping and anchor placement per caption
//! - **Timeline** - ordered [`OverlayElement`]s with half-open activity windows
//! - **Rendering** - ffmpeg `drawtext` or ASS burn-in via a [`RenderSink`]
//!
//! # Example
//!
//! ```rust,no_run
//! use wordcap::caption::{segment, OverlayTimeline, StyleProfile, TranscriptDocument};
//!
//! fn main() -> anyhow::Result<()> {
//!     let json = std::fs::read_to_string("transcript.json")?;
//!     let words = TranscriptDocument::parse(&json)?.word_stream()?;
//!     let segments = segment(&words, 0.7, 5, 2.0)?;
//!     let timeline = OverlayTimeline::build(&segments, &StyleProfile::punchy(), 1080, 1920);
//!     println!("{} captions", timeline.len());
//!     Ok(())
//! }
//! ```

pub mod ass;
pub mod compositor;
pub mod layout;
pub mod media;
pub mod pipeline;
pub mod segment;
pub mod style;
pub mod timeline;
pub mod transcript;
pub mod word;

use thiserror::Error;

pub use ass::AssScript;
pub use compositor::{FfmpegSink, RenderReport, RenderSink, RenderStrategy, SinkConfig};
pub use layout::{layout, layout_all, FrameSize, LayoutResult, ELLIPSIS};
pub use media::{extract_audio, find_tool, probe_video, VideoInfo};
pub use pipeline::{CaptionPipeline, CaptionRun, PipelineConfig, PipelineResult};
pub use segment::{
    join_tokens, segment, CaptionSegment, CutRule, SegmentationEngine, SegmentationParams,
};
pub use style::{Color, SegmentationMethod, StyleProfile, StyleRegistry};
pub use timeline::{Diagnostic, OverlayElement, OverlayTimeline, TimelineOptions};
pub use transcript::{
    StaticTranscript, Transcriber, TranscriptDocument, WhisperCli, WhisperServer,
};
pub use word::{Word, WordStream};

/// Caption core errors
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("invalid word #{index} '{text}' ({start}..{end}): {reason}")]
    InvalidWord {
        index: usize,
        text: String,
        start: f64,
        end: f64,
        reason: &'static str,
    },

    #[error("word #{index} starts at {start}s, before the previous word ({previous}s)")]
    NonMonotonic {
        index: usize,
        previous: f64,
        start: f64,
    },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("a caption segment needs at least one word")]
    EmptySegment,

    #[error("invalid colour '{0}', expected RRGGBB or RRGGBBAA")]
    InvalidColor(String),

    #[error("invalid style {field}: {reason}")]
    InvalidStyle { field: &'static str, reason: String },

    #[error("unknown style '{name}' (available: {available})")]
    UnknownStyle { name: String, available: String },

    #[error("transcript error: {0}")]
    Transcript(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CaptionError>;
