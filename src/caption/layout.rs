//! Text layout for caption boxes
//!
//! Wrapping is estimated from an average glyph width rather than measured
//! glyph by glyph; the renderer rasterizes the lines we hand it. Layout is a
//! pure function of `(text, style, frame)`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::style::StyleProfile;

/// Marker appended to the last visible line when text is cut
pub const ELLIPSIS: &str = "\u{2026}";

/// Video frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 1080x1920 portrait, the usual short-form canvas
    #[must_use]
    pub const fn portrait_hd() -> Self {
        Self::new(1080, 1920)
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Wrapped and positioned caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Lines in display order, never more than the style's `max_lines`
    pub wrapped_lines: Vec<String>,
    /// Estimated box width in pixels
    pub pixel_width: u32,
    /// Estimated box height in pixels
    pub pixel_height: u32,
    /// Top-left corner of the box in frame pixels
    pub anchor_position: (u32, u32),
    /// Text was cut to fit `max_lines`
    pub truncated: bool,
}

impl LayoutResult {
    /// Lines joined with newlines
    #[must_use]
    pub fn text(&self) -> String {
        self.wrapped_lines.join("\n")
    }

    /// Whether there is nothing to draw
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wrapped_lines.is_empty()
    }
}

/// Characters that fit on one line for this style and width
#[must_use]
pub fn char_budget(style: &StyleProfile, available_width: u32) -> usize {
    let usable = available_width.saturating_sub(style.margin.saturating_mul(2)) as f32;
    let glyph = style.pixel_size as f32 * style.glyph_width_factor;
    if glyph <= 0.0 {
        return 1;
    }
    ((usable / glyph).floor() as usize).max(1)
}

/// Greedy whitespace wrap; a word longer than `budget` gets its own line
#[must_use]
pub fn wrap_text(text: &str, budget: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = len;
        } else if current_len + 1 + len <= budget {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Wrap `text` for `frame` and place it at the style's anchor.
///
/// The available width is the frame width; the anchor fraction is the
/// vertical midpoint of the box, so half the box height is subtracted to get
/// the top edge. The box is kept inside the frame.
#[must_use]
pub fn layout(text: &str, style: &StyleProfile, frame: FrameSize) -> LayoutResult {
    let budget = char_budget(style, frame.width);
    let mut lines = wrap_text(text, budget);
    let max_lines = style.max_lines.max(1);

    let truncated = lines.len() > max_lines;
    if truncated {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push_str(ELLIPSIS);
        }
    }

    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let glyph = style.pixel_size as f32 * style.glyph_width_factor;
    let pixel_width = ((longest as f32 * glyph).ceil() as u32).min(frame.width);
    let pixel_height = style.line_height() * lines.len() as u32;

    let x = (frame.width - pixel_width) / 2;
    let midpoint = style.vertical_anchor_fraction.clamp(0.0, 1.0) * frame.height as f32;
    let top = (midpoint - pixel_height as f32 / 2.0).round().max(0.0) as u32;
    let y = top.min(frame.height.saturating_sub(pixel_height));

    LayoutResult {
        wrapped_lines: lines,
        pixel_width,
        pixel_height,
        anchor_position: (x, y),
        truncated,
    }
}

/// Lay out many texts in parallel, preserving input order
#[must_use]
pub fn layout_all<S>(texts: &[S], style: &StyleProfile, frame: FrameSize) -> Vec<LayoutResult>
where
    S: AsRef<str> + Sync,
{
    texts
        .par_iter()
        .map(|text| layout(text.as_ref(), style, frame))
        .collect()
}
