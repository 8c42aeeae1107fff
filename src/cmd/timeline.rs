use std::path::Path;

use anyhow::Result;

use wordcap::caption::{CaptionRun, Diagnostic, FrameSize, TimelineOptions};
use wordcap::config::Config;

use crate::{MethodArg, SegmentArgs};

pub fn cmd_timeline(
    config: &Config,
    transcript: &Path,
    (width, height): (u32, u32),
    style_name: Option<&str>,
    method: Option<MethodArg>,
    strict: bool,
    limits: SegmentArgs,
) -> Result<()> {
    let style = super::style(config, style_name, method)?;
    let words = super::load_words(transcript)?;
    let options = TimelineOptions {
        strict: strict || config.render.strict,
    };

    let run = CaptionRun::build(
        &words,
        super::params(config, limits),
        &style,
        FrameSize::new(width, height),
        options,
    )?;

    for diagnostic in &run.timeline.diagnostics {
        match diagnostic {
            Diagnostic::LayoutTruncated { element, start, shown } => {
                eprintln!("⚠️  caption {element} at {start:.3}s truncated to \"{shown}\"");
            }
            Diagnostic::CompositingOverlap { earlier, later, from, until } => {
                eprintln!("⚠️  caption {later} overlaps {earlier} ({from:.3}s..{until:.3}s)");
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&run.timeline)?);
    Ok(())
}
