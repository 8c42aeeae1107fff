//! Full caption pipeline: probe -> transcribe -> segment -> layout -> render
//!
//! Everything a run needs travels in [`PipelineConfig`]; there is no shared
//! state between runs. Captions never block the video: if any caption stage
//! fails, the base video is still rendered with an empty timeline and the
//! result reports `captions_failed`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, warn};

use super::compositor::{RenderReport, RenderSink};
use super::layout::FrameSize;
use super::media::{extract_audio, find_tool, probe_video};
use super::segment::{CaptionSegment, SegmentationEngine, SegmentationParams};
use super::style::StyleProfile;
use super::timeline::{Diagnostic, OverlayTimeline, TimelineOptions};
use super::transcript::{Transcriber, TranscriptDocument};
use super::word::WordStream;

/// Configuration for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub params: SegmentationParams,
    pub style: StyleProfile,
    pub options: TimelineOptions,
    /// Path to ffmpeg, used for audio extraction
    pub ffmpeg_path: String,
    /// Path to ffprobe
    pub ffprobe_path: String,
    /// Skip probing and lay out for this frame instead
    pub frame: Option<FrameSize>,
    /// Temporary directory for extracted audio
    pub temp_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            params: SegmentationParams::default(),
            style: StyleProfile::default(),
            options: TimelineOptions::default(),
            ffmpeg_path: find_tool("ffmpeg"),
            ffprobe_path: find_tool("ffprobe"),
            frame: None,
            temp_dir: std::env::temp_dir().join("wordcap"),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_params(mut self, params: SegmentationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleProfile) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: FrameSize) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// Segments and the timeline built from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRun {
    pub segments: Vec<CaptionSegment>,
    pub timeline: OverlayTimeline,
}

impl CaptionRun {
    /// Segment `words` and lay the result out for `frame`.
    ///
    /// Zero words is not an error: the run is simply empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the segmentation parameters or style are invalid.
    pub fn build(
        words: &WordStream,
        params: SegmentationParams,
        style: &StyleProfile,
        frame: FrameSize,
        options: TimelineOptions,
    ) -> super::Result<Self> {
        style.validate()?;
        let engine = SegmentationEngine::new(params)?;
        let segments = engine.segment(words);
        let timeline = OverlayTimeline::build_with_options(&segments, style, frame, options);
        Ok(Self { segments, timeline })
    }
}

/// Result of pipeline processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Transcribed text (full)
    pub transcript: Option<String>,
    /// Detected language
    pub language: Option<String>,
    pub word_count: usize,
    pub segment_count: usize,
    /// Overlay elements rendered
    pub element_count: usize,
    /// Elements cut to fit the line limit
    pub truncated: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Captions were dropped and the base video rendered alone
    pub captions_failed: bool,
    /// Why captions were dropped
    pub caption_error: Option<String>,
    pub render: RenderReport,
    /// Processing time in seconds
    pub processing_time_secs: f64,
}

/// What the caption stages produced for one input
struct CaptionStage {
    document: TranscriptDocument,
    word_count: usize,
    run: CaptionRun,
}

impl CaptionStage {
    fn empty(frame: FrameSize) -> Self {
        Self {
            document: TranscriptDocument::default(),
            word_count: 0,
            run: CaptionRun {
                segments: Vec::new(),
                timeline: OverlayTimeline::empty(frame),
            },
        }
    }
}

/// Caption pipeline orchestrator
pub struct CaptionPipeline {
    config: PipelineConfig,
    transcriber: Box<dyn Transcriber>,
    sink: Box<dyn RenderSink>,
}

impl CaptionPipeline {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        transcriber: Box<dyn Transcriber>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        Self {
            config,
            transcriber,
            sink,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build segments and timeline without touching any media
    ///
    /// # Errors
    ///
    /// Returns an error if the configured parameters or style are invalid.
    pub fn build_run(&self, words: &WordStream, frame: FrameSize) -> super::Result<CaptionRun> {
        CaptionRun::build(
            words,
            self.config.params,
            &self.config.style,
            frame,
            self.config.options,
        )
    }

    async fn resolve_frame(&self, input: &Path) -> Result<(FrameSize, bool)> {
        if let Some(frame) = self.config.frame {
            return Ok((frame, true));
        }
        let info = probe_video(&self.config.ffprobe_path, input).await?;
        Ok((info.frame(), info.has_audio))
    }

    async fn transcribe(&self, input: &Path, has_audio: bool) -> Result<TranscriptDocument> {
        if !self.transcriber.needs_audio() {
            return self.transcriber.transcribe(input).await;
        }
        if !has_audio {
            return Err(anyhow!("{} has no audio stream", input.display()));
        }

        info!("Extracting audio...");
        let audio = extract_audio(&self.config.ffmpeg_path, input, &self.config.temp_dir).await?;
        let result = self.transcriber.transcribe(&audio).await;
        if let Err(e) = fs::remove_file(&audio).await {
            debug!("could not remove {}: {e}", audio.display());
        }
        result
    }

    async fn caption_stage(
        &self,
        input: &Path,
        frame: FrameSize,
        has_audio: bool,
    ) -> Result<CaptionStage> {
        info!("Transcribing with {}...", self.transcriber.name());
        let document = self.transcribe(input, has_audio).await?;
        let words = document.word_stream()?;
        info!("Transcribed {} words", words.len());

        let run = self.build_run(&words, frame)?;
        info!(
            "Generated {} segments, {} overlay elements",
            run.segments.len(),
            run.timeline.len()
        );

        Ok(CaptionStage {
            document,
            word_count: words.len(),
            run,
        })
    }

    /// Caption a video file and render it to `output`
    ///
    /// # Errors
    ///
    /// Fails only when the base video cannot be rendered. Caption failures,
    /// including a render that fails only with captions drawn, are reported
    /// in the result.
    pub async fn process_file(&self, input: &Path, output: &Path) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting caption pipeline for {:?}", input);

        let (frame, stage) = match self.resolve_frame(input).await {
            Ok((frame, has_audio)) => (frame, self.caption_stage(input, frame, has_audio).await),
            Err(e) => (FrameSize::default(), Err(e)),
        };

        let (mut stage, mut caption_error) = match stage {
            Ok(stage) => (stage, None),
            Err(e) => {
                warn!("Captions failed, rendering without them: {e:#}");
                (CaptionStage::empty(frame), Some(format!("{e:#}")))
            }
        };

        info!("Rendering video with captions...");
        let rendered = self.sink.render(input, &stage.run.timeline, output).await;
        let render = match rendered {
            Ok(render) => render,
            Err(e) if !stage.run.timeline.is_empty() => {
                warn!("Captioned render failed, retrying without captions: {e:#}");
                caption_error = Some(format!("{e:#}"));
                stage.run = CaptionRun {
                    segments: Vec::new(),
                    timeline: OverlayTimeline::empty(frame),
                };
                self.sink.render(input, &stage.run.timeline, output).await?
            }
            Err(e) => return Err(e),
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        info!("Pipeline completed in {:.2}s", elapsed);

        let transcript = Some(stage.document.text.trim().to_string()).filter(|t| !t.is_empty());
        Ok(PipelineResult {
            transcript,
            language: stage.document.language,
            word_count: stage.word_count,
            segment_count: stage.run.segments.len(),
            element_count: stage.run.timeline.len(),
            truncated: stage.run.timeline.truncated_count(),
            diagnostics: stage.run.timeline.diagnostics,
            captions_failed: caption_error.is_some(),
            caption_error,
            render,
            processing_time_secs: elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::compositor::RenderStrategy;
    use crate::caption::transcript::StaticTranscript;
    use crate::caption::word::Word;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Records the timelines it is asked to render
    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<OverlayTimeline>>>,
    }

    #[async_trait]
    impl RenderSink for RecordingSink {
        async fn render(
            &self,
            _input: &Path,
            timeline: &OverlayTimeline,
            output: &Path,
        ) -> Result<RenderReport> {
            self.seen.lock().unwrap().push(timeline.clone());
            Ok(RenderReport {
                output: output.to_path_buf(),
                strategy: RenderStrategy::Drawtext,
                elements: timeline.len(),
                copied_video: timeline.is_empty(),
                elapsed_secs: 0.0,
            })
        }
    }

    struct FailingSink;

    #[async_trait]
    impl RenderSink for FailingSink {
        async fn render(&self, _: &Path, _: &OverlayTimeline, _: &Path) -> Result<RenderReport> {
            Err(anyhow!("encoder crashed"))
        }
    }

    /// Fails whenever there is something to draw
    #[derive(Clone, Default)]
    struct CaptionRejectingSink {
        calls: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl RenderSink for CaptionRejectingSink {
        async fn render(
            &self,
            _input: &Path,
            timeline: &OverlayTimeline,
            output: &Path,
        ) -> Result<RenderReport> {
            self.calls.lock().unwrap().push(timeline.len());
            if !timeline.is_empty() {
                return Err(anyhow!("No such filter: 'drawtext'"));
            }
            Ok(RenderReport {
                output: output.to_path_buf(),
                strategy: RenderStrategy::Drawtext,
                elements: 0,
                copied_video: true,
                elapsed_secs: 0.0,
            })
        }
    }

    const TRANSCRIPT: &str = r#"{
        "text": " one two three four five six seven",
        "language": "en",
        "segments": [{"text": "", "words": [
            {"word": " one", "start": 0.0, "end": 0.2},
            {"word": " two", "start": 0.2, "end": 0.4},
            {"word": " three", "start": 0.4, "end": 0.6},
            {"word": " four", "start": 0.6, "end": 0.8},
            {"word": " five", "start": 0.8, "end": 1.0},
            {"word": " six", "start": 1.0, "end": 1.2},
            {"word": " seven", "start": 1.2, "end": 1.4}
        ]}]
    }"#;

    fn transcript_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn pipeline(
        transcript: &Path,
        params: SegmentationParams,
        sink: Box<dyn RenderSink>,
    ) -> CaptionPipeline {
        let config = PipelineConfig::default()
            .with_params(params)
            .with_frame(FrameSize::portrait_hd());
        CaptionPipeline::new(config, Box::new(StaticTranscript::new(transcript)), sink)
    }

    #[test]
    fn test_build_run_scenario() {
        let words = WordStream::new(vec![
            Word { text: "H".into(), start: 0.0, end: 0.3 },
            Word { text: "i".into(), start: 0.3, end: 0.5 },
            Word { text: "there".into(), start: 1.4, end: 1.8 },
        ])
        .unwrap();
        let run = CaptionRun::build(
            &words,
            SegmentationParams::default(),
            &StyleProfile::punchy(),
            FrameSize::portrait_hd(),
            TimelineOptions::default(),
        )
        .unwrap();

        assert_eq!(run.segments.len(), 2);
        assert!((run.segments[0].end - 0.5).abs() < f64::EPSILON);
        assert_eq!(run.timeline.elements[1].layout.text(), "there");
    }

    #[test]
    fn test_build_run_empty_words() {
        let run = CaptionRun::build(
            &WordStream::empty(),
            SegmentationParams::default(),
            &StyleProfile::punchy(),
            FrameSize::default(),
            TimelineOptions::default(),
        )
        .unwrap();
        assert!(run.segments.is_empty());
        assert!(run.timeline.is_empty());
    }

    #[test]
    fn test_build_run_rejects_invalid_style() {
        let style = StyleProfile::punchy().with_max_lines(0);
        let result = CaptionRun::build(
            &WordStream::empty(),
            SegmentationParams::default(),
            &style,
            FrameSize::default(),
            TimelineOptions::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_process_file_captions() {
        let file = transcript_file(TRANSCRIPT);
        let sink = RecordingSink::default();
        let params = SegmentationParams::gap_only(0.7).with_max_words(3);
        let pipeline = pipeline(file.path(), params, Box::new(sink.clone()));

        let result = pipeline
            .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap();

        assert!(!result.captions_failed);
        assert_eq!(result.word_count, 7);
        assert_eq!(result.segment_count, 3);
        assert_eq!(result.element_count, 3);
        assert_eq!(result.language.as_deref(), Some("en"));
        assert_eq!(result.render.output, PathBuf::from("out.mp4"));

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].frame, FrameSize::portrait_hd());
    }

    #[tokio::test]
    async fn test_missing_transcript_renders_without_captions() {
        let sink = RecordingSink::default();
        let pipeline = pipeline(
            Path::new("/nonexistent/transcript.json"),
            SegmentationParams::default(),
            Box::new(sink.clone()),
        );

        let result = pipeline
            .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap();

        assert!(result.captions_failed);
        assert!(result.caption_error.is_some());
        assert_eq!(result.element_count, 0);
        assert!(sink.seen.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn test_non_monotonic_transcript_renders_without_captions() {
        let file = transcript_file(
            r#"{"text": "", "segments": [{"text": "", "words": [
                {"word": "b", "start": 1.0, "end": 1.2},
                {"word": "a", "start": 0.5, "end": 0.7}
            ]}]}"#,
        );
        let sink = RecordingSink::default();
        let pipeline = pipeline(file.path(), SegmentationParams::default(), Box::new(sink.clone()));

        let result = pipeline
            .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap();
        assert!(result.captions_failed);
        assert!(sink.seen.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn test_captioned_render_failure_falls_back_to_plain_video() {
        let file = transcript_file(TRANSCRIPT);
        let sink = CaptionRejectingSink::default();
        let pipeline = pipeline(file.path(), SegmentationParams::default(), Box::new(sink.clone()));

        let result = pipeline
            .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap();

        assert!(result.captions_failed);
        assert!(result.caption_error.unwrap().contains("drawtext"));
        assert_eq!(result.element_count, 0);
        assert_eq!(result.segment_count, 0);
        assert!(result.render.copied_video);
        // Transcript survives even though nothing was drawn
        assert_eq!(result.word_count, 7);

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0] > 0);
        assert_eq!(calls[1], 0);
    }

    #[tokio::test]
    async fn test_render_failure_is_fatal() {
        let file = transcript_file(TRANSCRIPT);
        let pipeline = pipeline(file.path(), SegmentationParams::default(), Box::new(FailingSink));
        let result = pipeline
            .process_file(Path::new("in.mp4"), Path::new("out.mp4"))
            .await;
        assert!(result.is_err());
    }
}
