//! ASS script generation for libass burn-in
//!
//! Lines are already wrapped by the layout stage, so the script disables
//! libass wrapping and pins every event with `\pos`. The script is a render
//! intermediate only; the sink deletes it after ffmpeg finishes.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use tokio::fs;

use super::style::{Color, StyleProfile};
use super::timeline::OverlayTimeline;

/// Style name used for every caption event
const STYLE_NAME: &str = "Caption";

/// Format seconds as an ASS timestamp (H:MM:SS.cc)
fn format_ass_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6000;
    let secs = (centis % 6000) / 100;
    let cs = centis % 100;
    format!("{hours}:{minutes:02}:{secs:02}.{cs:02}")
}

/// Escape override braces and backslashes; newlines become `\N`
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}

/// An ASS document for one timeline
#[derive(Debug, Clone)]
pub struct AssScript<'a> {
    timeline: &'a OverlayTimeline,
    style: &'a StyleProfile,
    title: String,
}

impl<'a> AssScript<'a> {
    #[must_use]
    pub fn new(timeline: &'a OverlayTimeline, style: &'a StyleProfile) -> Self {
        Self {
            timeline,
            style,
            title: "wordcap captions".to_string(),
        }
    }

    /// `Style:` line derived from the profile
    fn style_line(&self) -> String {
        let style = self.style;
        // BorderStyle 3 draws an opaque box in the outline colour
        let (border_style, outline_color, outline, back_color) = match style.background_color {
            Some(bg) => (3, bg, style.stroke_width.max(4.0), bg),
            None => (1, style.stroke_color, style.stroke_width, Color::BLACK.with_alpha(0)),
        };

        format!(
            "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,{},{},0,8,{},{},0,1",
            STYLE_NAME,
            style.font,
            style.pixel_size,
            style.foreground_color.to_ass(),
            style.foreground_color.to_ass(),
            outline_color.to_ass(),
            back_color.to_ass(),
            if style.bold { -1 } else { 0 },
            border_style,
            outline,
            style.margin,
            style.margin,
        )
    }

    /// Render the whole script.
    ///
    /// # Errors
    ///
    /// Only fails if formatting fails.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let frame = self.timeline.frame;
        let mut out = String::new();

        writeln!(out, "[Script Info]")?;
        writeln!(out, "Title: {}", self.title)?;
        writeln!(out, "ScriptType: v4.00+")?;
        writeln!(out, "PlayResX: {}", frame.width)?;
        writeln!(out, "PlayResY: {}", frame.height)?;
        writeln!(out, "WrapStyle: 2")?;
        writeln!(out, "ScaledBorderAndShadow: yes")?;
        writeln!(out, "YCbCr Matrix: TV.709")?;
        writeln!(out)?;

        writeln!(out, "[V4+ Styles]")?;
        writeln!(
            out,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
             OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, \
             ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, \
             MarginL, MarginR, MarginV, Encoding"
        )?;
        writeln!(out, "{}", self.style_line())?;
        writeln!(out)?;

        writeln!(out, "[Events]")?;
        writeln!(
            out,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        )?;

        // Layer follows emission order so later captions paint on top
        for (layer, element) in self.timeline.elements.iter().enumerate() {
            if element.layout.is_empty() || element.end <= element.start {
                continue;
            }
            let (x, y) = element.layout.anchor_position;
            let center_x = x + element.layout.pixel_width / 2;
            writeln!(
                out,
                "Dialogue: {layer},{},{},{STYLE_NAME},,0,0,0,,{{\\an8\\pos({center_x},{y})}}{}",
                format_ass_time(element.start),
                format_ass_time(element.end),
                escape_text(&element.layout.text()),
            )?;
        }

        Ok(out)
    }

    /// Write the script to `path`
    pub async fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.render()?;
        fs::write(path, content).await?;
        Ok(())
    }
}
