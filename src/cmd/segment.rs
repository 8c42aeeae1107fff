use std::path::Path;

use anyhow::Result;

use wordcap::caption::SegmentationEngine;
use wordcap::config::Config;

use crate::SegmentArgs;

pub fn cmd_segment(
    config: &Config,
    transcript: &Path,
    limits: SegmentArgs,
    json: bool,
) -> Result<()> {
    let params = super::params(config, limits);
    let words = super::load_words(transcript)?;
    let segments = SegmentationEngine::new(params)?.segment(&words);

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    eprintln!("📝 Segmenting: {}", transcript.display());
    eprintln!(
        "   Limits: gap > {}s, {} words, {}s",
        params.max_gap,
        if params.max_words == 0 {
            "unlimited".to_string()
        } else {
            params.max_words.to_string()
        },
        params.max_duration,
    );
    eprintln!("   Words: {}", words.len());

    for segment in &segments {
        println!("{:>8.3} → {:>8.3}  {}", segment.start, segment.end, segment.text);
    }

    eprintln!("\n✅ {} segments", segments.len());
    Ok(())
}
