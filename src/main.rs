//! `wordcap` CLI - segment transcripts and burn captions into video

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use wordcap::caption::{RenderStrategy, SegmentationMethod};

#[derive(Parser)]
#[command(name = "wordcap")]
#[command(about = "Word-timed caption segmentation and overlay rendering")]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.config/wordcap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Segmentation overrides shared by several commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct SegmentArgs {
    /// Silence (seconds) that starts a new caption
    #[arg(long)]
    pub max_gap: Option<f64>,

    /// Maximum words per caption (0 or negative = unlimited)
    #[arg(long, allow_hyphen_values = true)]
    pub max_words: Option<i64>,

    /// Maximum caption duration in seconds (0 = unlimited)
    #[arg(long)]
    pub max_duration: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MethodArg {
    /// One caption per segment
    Segment,
    /// One word at a time
    Word,
}

impl From<MethodArg> for SegmentationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Segment => Self::WholeSegment,
            MethodArg::Word => Self::PerWord,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    /// ffmpeg drawtext filters
    Drawtext,
    /// ASS script burned with libass
    Ass,
}

impl From<StrategyArg> for RenderStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Drawtext => Self::Drawtext,
            StrategyArg::Ass => Self::Ass,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split a word-timed transcript into caption segments
    Segment {
        /// Whisper-style transcript JSON
        transcript: PathBuf,

        #[command(flatten)]
        limits: SegmentArgs,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the overlay timeline for a transcript and print it as JSON
    Timeline {
        /// Whisper-style transcript JSON
        transcript: PathBuf,

        /// Frame width in pixels
        #[arg(long, default_value = "1080")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "1920")]
        height: u32,

        /// Style preset name
        #[arg(short, long)]
        style: Option<String>,

        /// Reveal method (overrides the style)
        #[arg(short, long, value_enum)]
        method: Option<MethodArg>,

        /// Report overlapping captions
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        limits: SegmentArgs,
    },

    /// Caption a video and render the result
    Render {
        /// Input video file
        video: PathBuf,

        /// Output video file
        output: PathBuf,

        /// Use an existing transcript instead of running Whisper
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Style preset name
        #[arg(short, long)]
        style: Option<String>,

        /// Reveal method (overrides the style)
        #[arg(short, long, value_enum)]
        method: Option<MethodArg>,

        /// How captions are drawn
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Report overlapping captions
        #[arg(long)]
        strict: bool,

        /// Whisper model (tiny, base, small, medium, large)
        #[arg(long)]
        model: Option<String>,

        /// Spoken language code (default: auto-detect)
        #[arg(short, long)]
        language: Option<String>,

        /// Transcribe through a Whisper HTTP server at this URL
        #[arg(long)]
        server: Option<String>,

        /// Use hardware-accelerated encoding
        #[arg(long)]
        hwaccel: bool,

        #[command(flatten)]
        limits: SegmentArgs,
    },

    /// List available style presets
    Styles {
        /// Print presets as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = cmd::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Segment {
            transcript,
            limits,
            json,
        } => {
            cmd::segment::cmd_segment(&config, &transcript, limits, json)?;
        }
        Commands::Timeline {
            transcript,
            width,
            height,
            style,
            method,
            strict,
            limits,
        } => {
            cmd::timeline::cmd_timeline(
                &config,
                &transcript,
                (width, height),
                style.as_deref(),
                method,
                strict,
                limits,
            )?;
        }
        Commands::Render {
            video,
            output,
            transcript,
            style,
            method,
            strategy,
            strict,
            model,
            language,
            server,
            hwaccel,
            limits,
        } => {
            let options = cmd::render::RenderOptions {
                transcript,
                style,
                method,
                strategy,
                strict,
                model,
                language,
                server,
                hwaccel,
                limits,
            };
            cmd::render::cmd_render(&config, &video, &output, options).await?;
        }
        Commands::Styles { json } => {
            cmd::styles::cmd_styles(&config, json)?;
        }
    }

    Ok(())
}
