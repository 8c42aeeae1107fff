pub mod render;
pub mod segment;
pub mod styles;
pub mod timeline;

use std::path::Path;

use anyhow::{Context, Result};

use wordcap::caption::{SegmentationParams, StyleProfile, TranscriptDocument, WordStream};
use wordcap::config::{load_config, load_from, Config};

use crate::{MethodArg, SegmentArgs};

/// Config from `--config`, or the default location
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_from(path),
        None => load_config(),
    }
}

/// Read a transcript file into a validated word stream
pub fn load_words(path: &Path) -> Result<WordStream> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = TranscriptDocument::parse(&json)
        .with_context(|| format!("invalid transcript {}", path.display()))?;
    Ok(document.word_stream()?)
}

/// Config limits with command-line overrides applied
pub fn params(config: &Config, limits: SegmentArgs) -> SegmentationParams {
    let mut params = config.segmentation.params();
    if let Some(max_gap) = limits.max_gap {
        params = params.with_max_gap(max_gap);
    }
    if let Some(max_words) = limits.max_words {
        params = params.with_max_words(usize::try_from(max_words).unwrap_or(0));
    }
    if let Some(max_duration) = limits.max_duration {
        params = params.with_max_duration(max_duration);
    }
    params
}

/// Look up a preset, falling back to the configured default
pub fn style(
    config: &Config,
    name: Option<&str>,
    method: Option<MethodArg>,
) -> Result<StyleProfile> {
    let registry = config.registry()?;
    let mut style = registry.get(name.unwrap_or(config.style_name()))?.clone();
    if let Some(method) = method {
        style = style.with_method(method.into());
    }
    Ok(style)
}
