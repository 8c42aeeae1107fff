use std::path::{Path, PathBuf};

use anyhow::Result;

use wordcap::caption::{CaptionPipeline, FfmpegSink, StaticTranscript, Transcriber};
use wordcap::config::{Backend, Config};

use crate::{MethodArg, SegmentArgs, StrategyArg};

/// Flags of the `render` command
pub struct RenderOptions {
    pub transcript: Option<PathBuf>,
    pub style: Option<String>,
    pub method: Option<MethodArg>,
    pub strategy: Option<StrategyArg>,
    pub strict: bool,
    pub model: Option<String>,
    pub language: Option<String>,
    pub server: Option<String>,
    pub hwaccel: bool,
    pub limits: SegmentArgs,
}

pub async fn cmd_render(
    config: &Config,
    video: &Path,
    output: &Path,
    options: RenderOptions,
) -> Result<()> {
    eprintln!("🎬 Captioning: {}", video.display());
    eprintln!("   Output: {}", output.display());

    let mut config = config.clone();
    if let Some(model) = options.model {
        config.transcription.model = model;
    }
    if options.language.is_some() {
        config.transcription.language = options.language;
    }
    if let Some(url) = options.server {
        config.transcription.backend = Backend::Server;
        config.transcription.server_url = url;
    }
    if let Some(strategy) = options.strategy {
        config.render.strategy = strategy.into();
    }
    config.render.strict |= options.strict;

    let style = super::style(&config, options.style.as_deref(), options.method)?;
    eprintln!(
        "   Style: {} ({})",
        options.style.as_deref().unwrap_or(config.style_name()),
        style.segmentation_method
    );

    let transcriber: Box<dyn Transcriber> = match options.transcript {
        Some(path) => {
            eprintln!("   Transcript: {}", path.display());
            Box::new(StaticTranscript::new(path))
        }
        None => config.transcriber(),
    };
    eprintln!("   Transcriber: {}", transcriber.name());

    let mut sink_config = config.sink_config();
    if options.hwaccel {
        #[cfg(target_os = "macos")]
        {
            sink_config = sink_config.with_hwaccel("videotoolbox");
            eprintln!("   Hardware acceleration: VideoToolbox");
        }
        #[cfg(not(target_os = "macos"))]
        {
            sink_config = sink_config.with_hwaccel("nvenc");
            eprintln!("   Hardware acceleration: NVENC");
        }
    }
    eprintln!("   Renderer: {}", sink_config.strategy);

    let mut pipeline_config = config.pipeline_config(style.clone());
    pipeline_config.params = super::params(&config, options.limits);
    pipeline_config.params.validate()?;

    let pipeline = CaptionPipeline::new(
        pipeline_config,
        transcriber,
        Box::new(FfmpegSink::new(sink_config, style)),
    );

    let result = pipeline.process_file(video, output).await?;

    if result.captions_failed {
        eprintln!("\n⚠️  Captions failed; rendered the video without them");
        if let Some(ref reason) = result.caption_error {
            eprintln!("   Reason: {reason}");
        }
    } else {
        eprintln!("\n✅ Captioned in {:.1}s", result.processing_time_secs);
    }

    eprintln!("   Output: {}", result.render.output.display());
    eprintln!("   Words: {}", result.word_count);
    eprintln!("   Captions: {} ({} segments)", result.element_count, result.segment_count);
    if result.truncated > 0 {
        eprintln!("   Truncated: {}", result.truncated);
    }
    if let Some(ref lang) = result.language {
        eprintln!("   Language: {lang}");
    }

    Ok(())
}
