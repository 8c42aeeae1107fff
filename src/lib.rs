//! `wordcap` - word-timed captions burned into video
//!
//! # Features
//!
//! - **Segmentation**: regroups word timings into short captions on silence,
//!   word-count and duration limits
//! - **Layout**: wraps caption text for the frame and places it at a style anchor
//! - **Styles**: `punchy`, `subtitle` and `karaoke` presets plus custom ones
//! - **Rendering**: ffmpeg `drawtext` or ASS burn-in, never dropping the video
//!   when captions fail
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wordcap::caption::{CaptionPipeline, FfmpegSink, PipelineConfig, SinkConfig, StyleProfile};
//! use wordcap::caption::WhisperCli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let style = StyleProfile::punchy();
//!     let pipeline = CaptionPipeline::new(
//!         PipelineConfig::default().with_style(style.clone()),
//!         Box::new(WhisperCli::new()),
//!         Box::new(FfmpegSink::new(SinkConfig::default(), style)),
//!     );
//!     let result = pipeline
//!         .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
//!         .await?;
//!     println!("{} captions", result.element_count);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;

pub use caption::{
    CaptionError, CaptionPipeline, CaptionSegment, OverlayTimeline, SegmentationEngine,
    SegmentationParams, StyleProfile, StyleRegistry, TranscriptDocument, Word, WordStream,
};
pub use config::{load_config, Config};

/// Version of wordcap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
