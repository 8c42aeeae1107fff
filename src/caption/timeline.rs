//! Overlay timeline construction and the compositing contract
//!
//! A timeline is the ordered list of time-boxed, laid-out caption elements
//! for one render. Element `e` is visible on a frame at time `t` when
//! `e.start <= t < e.end`; when several are visible they are painted in
//! emission order, so the element with the latest start ends up on top.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

use super::layout::{layout_all, FrameSize, LayoutResult};
use super::segment::CaptionSegment;
use super::style::{SegmentationMethod, StyleProfile};

/// A time-boxed, positioned caption ready for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayElement {
    /// First instant the element is visible (seconds, inclusive)
    pub start: f64,
    /// Instant the element disappears (seconds, exclusive)
    pub end: f64,
    /// Wrapped lines and placement
    pub layout: LayoutResult,
}

impl OverlayElement {
    /// Visible at time `t`
    #[must_use]
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Frame indices covered at `fps`, end exclusive.
    ///
    /// Frame `n` is shown at `n / fps`, so it is covered exactly when
    /// `start <= n / fps < end`.
    #[must_use]
    pub fn frame_range(&self, fps: f64) -> Range<u64> {
        let first = (self.start * fps).ceil().max(0.0) as u64;
        let last = (self.end * fps).ceil().max(0.0) as u64;
        first..last.max(first)
    }
}

/// Non-fatal findings recorded while building a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Caption text exceeded `max_lines` and was cut
    LayoutTruncated {
        element: usize,
        start: f64,
        shown: String,
    },
    /// Two whole-segment elements are visible at once (strict mode only)
    CompositingOverlap {
        earlier: usize,
        later: usize,
        from: f64,
        until: f64,
    },
}

/// Timeline build switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineOptions {
    /// Report overlapping elements outside per-word mode
    pub strict: bool,
}

/// Ordered overlay elements for one render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayTimeline {
    /// Frame the layouts were computed for
    pub frame: FrameSize,
    /// Reveal method used to build the elements
    pub method: SegmentationMethod,
    /// Elements ordered by start
    pub elements: Vec<OverlayElement>,
    /// Recovered layout/compositing findings
    pub diagnostics: Vec<Diagnostic>,
}

impl OverlayTimeline {
    /// Timeline with no captions; renders the base video untouched
    #[must_use]
    pub fn empty(frame: FrameSize) -> Self {
        Self {
            frame,
            method: SegmentationMethod::default(),
            elements: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build elements from segments with default options
    #[must_use]
    pub fn build(
        segments: &[CaptionSegment],
        style: &StyleProfile,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self::build_with_options(
            segments,
            style,
            FrameSize::new(frame_width, frame_height),
            TimelineOptions::default(),
        )
    }

    /// Build elements from segments.
    ///
    /// `whole_segment` yields one element per segment; `per_word` ignores the
    /// grouping and yields one element per word.
    #[must_use]
    pub fn build_with_options(
        segments: &[CaptionSegment],
        style: &StyleProfile,
        frame: FrameSize,
        options: TimelineOptions,
    ) -> Self {
        let method = style.segmentation_method;
        let mut spans: Vec<(f64, f64, String)> = match method {
            SegmentationMethod::WholeSegment => segments
                .iter()
                .map(|s| (s.start, s.end, s.text.clone()))
                .collect(),
            SegmentationMethod::PerWord => segments
                .iter()
                .flat_map(|s| s.words.iter())
                .map(|w| (w.start, w.end, w.token().to_string()))
                .collect(),
        };

        // Stable, so equal starts keep their input order
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));

        let texts: Vec<&str> = spans.iter().map(|(_, _, text)| text.as_str()).collect();
        let layouts = layout_all(&texts, style, frame);

        let elements: Vec<OverlayElement> = spans
            .iter()
            .zip(layouts)
            .map(|(&(start, end, _), layout)| OverlayElement { start, end, layout })
            .collect();

        let mut diagnostics: Vec<Diagnostic> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.layout.truncated)
            .map(|(i, e)| Diagnostic::LayoutTruncated {
                element: i,
                start: e.start,
                shown: e.layout.text(),
            })
            .collect();

        if options.strict && method == SegmentationMethod::WholeSegment {
            diagnostics.extend(find_overlaps(&elements));
        }

        debug!(
            "built {} {} elements ({} diagnostics)",
            elements.len(),
            method,
            diagnostics.len()
        );
        for diagnostic in &diagnostics {
            if let Diagnostic::CompositingOverlap { earlier, later, from, until } = diagnostic {
                warn!("caption {later} overlaps caption {earlier} from {from:.3}s to {until:.3}s");
            }
        }

        Self {
            frame,
            method,
            elements,
            diagnostics,
        }
    }

    /// Elements visible at `t`, in paint order
    pub fn active_at(&self, t: f64) -> impl Iterator<Item = &OverlayElement> {
        self.elements
            .iter()
            .take_while(move |e| e.start <= t)
            .filter(move |e| e.is_active_at(t))
    }

    /// The element painted last (visible on top) at `t`
    #[must_use]
    pub fn topmost_at(&self, t: f64) -> Option<&OverlayElement> {
        self.active_at(t).last()
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// No captions to draw
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements that were truncated
    #[must_use]
    pub fn truncated_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::LayoutTruncated { .. }))
            .count()
    }
}

/// Pairs of elements visible at the same instant
fn find_overlaps(elements: &[OverlayElement]) -> Vec<Diagnostic> {
    let mut overlaps = Vec::new();
    // Element reaching furthest so far: (index, end)
    let mut reach: Option<(usize, f64)> = None;

    for (i, element) in elements.iter().enumerate() {
        if let Some((j, until)) = reach {
            if element.start < until && element.start < element.end {
                overlaps.push(Diagnostic::CompositingOverlap {
                    earlier: j,
                    later: i,
                    from: element.start,
                    until: until.min(element.end),
                });
            }
        }
        if reach.map_or(true, |(_, until)| element.end > until) {
            reach = Some((i, element.end));
        }
    }

    overlaps
}
