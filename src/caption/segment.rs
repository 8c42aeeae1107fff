//! Word stream segmentation
//!
//! Regroups a [`WordStream`] into display-sized [`CaptionSegment`]s in a
//! single left-to-right pass. Three independent cut rules are checked after
//! every word (silence gap, word count, elapsed duration); any one of them
//! closes the current segment, and the last word always flushes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::word::{Word, WordStream};
use super::{CaptionError, Result};

/// Default silence (seconds) beyond which a new segment starts
pub const DEFAULT_MAX_GAP: f64 = 0.7;
/// Default maximum words per segment
pub const DEFAULT_MAX_WORDS: usize = 5;
/// Default maximum segment duration in seconds
pub const DEFAULT_MAX_DURATION: f64 = 2.0;

/// Tunables for the segmentation engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Silence in seconds that forces a cut (strictly greater than)
    pub max_gap: f64,
    /// Maximum words per segment (0 = unlimited)
    pub max_words: usize,
    /// Maximum segment duration in seconds (0 or negative = unlimited)
    pub max_duration: f64,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            max_gap: DEFAULT_MAX_GAP,
            max_words: DEFAULT_MAX_WORDS,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

impl SegmentationParams {
    /// Create parameters from the three tunables
    #[must_use]
    pub fn new(max_gap: f64, max_words: usize, max_duration: f64) -> Self {
        Self {
            max_gap,
            max_words,
            max_duration,
        }
    }

    /// Only cut on silence; word count and duration unlimited
    #[must_use]
    pub fn gap_only(max_gap: f64) -> Self {
        Self::new(max_gap, 0, 0.0)
    }

    /// Set the silence threshold
    #[must_use]
    pub fn with_max_gap(mut self, max_gap: f64) -> Self {
        self.max_gap = max_gap;
        self
    }

    /// Set the word-count limit (0 = unlimited)
    #[must_use]
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Set the duration limit (0 = unlimited)
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: f64) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Check the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidParameter`] when `max_gap` is not
    /// strictly positive or `max_duration` is NaN.
    pub fn validate(&self) -> Result<()> {
        if self.max_gap.is_nan() || self.max_gap <= 0.0 {
            return Err(CaptionError::InvalidParameter {
                name: "max_gap",
                reason: format!("must be greater than 0, got {}", self.max_gap),
            });
        }
        if self.max_duration.is_nan() {
            return Err(CaptionError::InvalidParameter {
                name: "max_duration",
                reason: "must be a number".to_string(),
            });
        }
        Ok(())
    }

    fn word_limit(&self) -> Option<usize> {
        (self.max_words > 0).then_some(self.max_words)
    }

    fn duration_limit(&self) -> Option<f64> {
        (self.max_duration > 0.0).then_some(self.max_duration)
    }
}

/// Which rule closed a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutRule {
    /// Silence to the next word exceeded `max_gap`
    Gap,
    /// Buffer reached `max_words`
    WordCount,
    /// Segment reached `max_duration`
    Duration,
    /// Last word of the stream
    EndOfStream,
}

/// A group of consecutive words displayed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start of the first word (seconds)
    pub start: f64,
    /// End of the last word (seconds)
    pub end: f64,
    /// Display text joined from the word tokens
    pub text: String,
    /// Owned copies of the constituent words
    pub words: Vec<Word>,
}

impl CaptionSegment {
    /// Build a segment from its words, deriving times and text.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::EmptySegment`] when `words` is empty.
    pub fn from_words(words: Vec<Word>) -> Result<Self> {
        let (Some(first), Some(last)) = (words.first(), words.last()) else {
            return Err(CaptionError::EmptySegment);
        };

        Ok(Self {
            start: first.start,
            end: last.end,
            text: join_tokens(&words),
            words,
        })
    }

    /// Displayed duration in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Join word tokens into display text.
///
/// Tokens are separated by a single space, except that no space is inserted
/// before a token beginning or ending with an apostrophe or hyphen, so
/// elided and hyphenated fragments attach to their neighbour.
#[must_use]
pub fn join_tokens(words: &[Word]) -> String {
    let mut text = String::new();

    for word in words {
        let token = word.token();
        if token.is_empty() {
            continue;
        }
        if !text.is_empty() && !attaches_to_previous(token) {
            text.push(' ');
        }
        text.push_str(token);
    }

    text
}

fn attaches_to_previous(token: &str) -> bool {
    const JOINERS: [char; 2] = ['\'', '-'];
    token.starts_with(JOINERS) || token.ends_with(JOINERS)
}

/// Single-pass segmentation engine
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentationEngine {
    params: SegmentationParams,
}

impl SegmentationEngine {
    /// Create an engine, validating the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidParameter`] for unusable tunables.
    pub fn new(params: SegmentationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters this engine cuts with
    #[must_use]
    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Segment a validated stream.
    ///
    /// An empty stream yields no segments. Output is a pure function of the
    /// stream and parameters.
    #[must_use]
    pub fn segment(&self, stream: &WordStream) -> Vec<CaptionSegment> {
        let words = stream.words();
        let Some(first) = words.first() else {
            return Vec::new();
        };

        let mut segments = Vec::new();
        let mut buffer: Vec<Word> = Vec::new();
        let mut segment_start = first.start;

        for (i, word) in words.iter().enumerate() {
            buffer.push(word.clone());

            let next = words.get(i + 1);
            let Some(rule) = self.cut_rule(word, next, buffer.len(), segment_start) else {
                continue;
            };

            let last_end = buffer.last().map_or(segment_start, |w| w.end);
            let chunk = std::mem::take(&mut buffer);
            debug!(
                "segment {} closed by {:?}: {} words, {:.3}s..{:.3}s",
                segments.len(),
                rule,
                chunk.len(),
                segment_start,
                last_end
            );
            segments.push(CaptionSegment {
                start: segment_start,
                end: last_end,
                text: join_tokens(&chunk),
                words: chunk,
            });

            if let Some(next) = next {
                segment_start = next.start;
            }
        }

        segments
    }

    /// Evaluate the cut rules after `word` was appended to the buffer
    fn cut_rule(
        &self,
        word: &Word,
        next: Option<&Word>,
        buffered: usize,
        segment_start: f64,
    ) -> Option<CutRule> {
        let Some(next) = next else {
            return Some(CutRule::EndOfStream);
        };

        let gap_exceeded = next.start - word.end > self.params.max_gap;
        let count_exceeded = self
            .params
            .word_limit()
            .is_some_and(|limit| buffered >= limit);
        let duration_exceeded = self
            .params
            .duration_limit()
            .is_some_and(|limit| word.end - segment_start >= limit);

        if gap_exceeded {
            Some(CutRule::Gap)
        } else if count_exceeded {
            Some(CutRule::WordCount)
        } else if duration_exceeded {
            Some(CutRule::Duration)
        } else {
            None
        }
    }
}

/// Segment `words` with the three tunables.
///
/// `max_words` of 0 and `max_duration` of 0 disable those rules.
///
/// # Errors
///
/// Returns [`CaptionError::InvalidParameter`] for unusable tunables.
pub fn segment(
    words: &WordStream,
    max_gap: f64,
    max_words: usize,
    max_duration: f64,
) -> Result<Vec<CaptionSegment>> {
    let params = SegmentationParams::new(max_gap, max_words, max_duration);
    Ok(SegmentationEngine::new(params)?.segment(words))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str, start: f64, end: f64) -> Word {
        Word {
            text: text.to_string(),
            start,
            end,
        }
    }

    fn contiguous(n: usize) -> WordStream {
        let words = (0..n)
            .map(|i| w(&format!("w{i}"), i as f64 * 0.25, (i + 1) as f64 * 0.25))
            .collect();
        WordStream::new(words).unwrap()
    }

    fn sizes(segments: &[CaptionSegment]) -> Vec<usize> {
        segments.iter().map(|s| s.words.len()).collect()
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        let segments = segment(&WordStream::empty(), 0.7, 5, 2.0).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_single_word_single_segment() {
        let stream = WordStream::new(vec![w("solo", 1.0, 1.5)]).unwrap();
        let segments = segment(&stream, 0.7, 5, 2.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "solo");
        assert!((segments[0].start - 1.0).abs() < f64::EPSILON);
        assert!((segments[0].end - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_word_count_cut() {
        let segments = segment(&contiguous(7), f64::INFINITY, 3, f64::INFINITY).unwrap();
        assert_eq!(sizes(&segments), vec![3, 3, 1]);
    }

    #[test]
    fn test_gap_cut_between_words() {
        let stream = WordStream::new(vec![w("one", 0.0, 0.4), w("two", 1.0, 1.3)]).unwrap();
        let segments = segment(&stream, 0.5, 0, 0.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one");
        assert_eq!(segments[1].text, "two");
    }

    #[test]
    fn test_gap_equal_to_threshold_does_not_cut() {
        let stream = WordStream::new(vec![w("one", 0.0, 0.5), w("two", 1.0, 1.5)]).unwrap();
        let segments = segment(&stream, 0.5, 0, 0.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "one two");
    }

    #[test]
    fn test_duration_cut_starts_at_next_word() {
        let stream = WordStream::new(vec![
            w("a", 0.0, 1.0),
            w("b", 1.0, 2.0),
            w("c", 2.3, 2.6),
            w("d", 2.6, 3.0),
        ])
        .unwrap();
        let segments = segment(&stream, 10.0, 0, 2.0).unwrap();
        assert_eq!(sizes(&segments), vec![2, 2]);
        assert!((segments[1].start - 2.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scenario_gap_split() {
        let stream = WordStream::new(vec![
            w("H", 0.0, 0.3),
            w("i", 0.3, 0.5),
            w("there", 1.4, 1.8),
        ])
        .unwrap();
        let segments = segment(&stream, 0.7, 0, 0.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start - 0.0).abs() < f64::EPSILON);
        assert!((segments[0].end - 0.5).abs() < f64::EPSILON);
        assert_eq!(segments[0].words.len(), 2);
        assert_eq!(segments[1].text, "there");
        assert!((segments[1].start - 1.4).abs() < f64::EPSILON);
        assert!((segments[1].end - 1.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_duration_words() {
        let stream = WordStream::new(vec![w("a", 0.0, 0.0), w("b", 0.0, 0.0)]).unwrap();
        let segments = segment(&stream, 0.7, 5, 2.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].duration().abs() < f64::EPSILON);
    }

    #[test]
    fn test_join_apostrophe_and_hyphen() {
        let words = vec![
            w(" It", 0.0, 0.1),
            w("'s", 0.1, 0.2),
            w(" well", 0.2, 0.3),
            w("-known", 0.3, 0.4),
            w(" fact", 0.4, 0.5),
        ];
        assert_eq!(join_tokens(&words), "It's well-known fact");
    }

    #[test]
    fn test_join_token_ending_with_joiner() {
        let words = vec![w("jusqu", 0.0, 0.1), w("l'", 0.1, 0.2), w("heure", 0.2, 0.3)];
        assert_eq!(join_tokens(&words), "jusqul' heure");
    }

    #[test]
    fn test_join_skips_blank_tokens() {
        let words = vec![w("a", 0.0, 0.1), w("  ", 0.1, 0.2), w("b", 0.2, 0.3)];
        assert_eq!(join_tokens(&words), "a b");
    }

    #[test]
    fn test_partition_and_order_preserved() {
        // Deterministic pseudo-random streams
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 1000) as f64 / 1000.0
        };

        for round in 0..50 {
            let mut t = 0.0;
            let words: Vec<Word> = (0..(round + 1))
                .map(|i| {
                    t += next() * 0.8;
                    let start = t;
                    t += next() * 0.5;
                    w(&format!("t{i}"), start, t)
                })
                .collect();
            let stream = WordStream::new(words.clone()).unwrap();
            let segments = segment(&stream, 0.3, 4, 1.5).unwrap();

            let flattened: Vec<Word> = segments.iter().flat_map(|s| s.words.clone()).collect();
            assert_eq!(flattened, words);

            for pair in segments.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }
            for s in &segments {
                assert!(s.end - s.start >= 0.0);
                assert!((s.start - s.words[0].start).abs() < f64::EPSILON);
                assert!(s.words.len() <= 4);
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let stream = contiguous(23);
        let a = segment(&stream, 0.7, 5, 2.0).unwrap();
        let b = segment(&stream, 0.7, 5, 2.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(segment(&contiguous(2), 0.0, 5, 2.0).is_err());
        assert!(segment(&contiguous(2), -1.0, 5, 2.0).is_err());
        assert!(segment(&contiguous(2), f64::NAN, 5, 2.0).is_err());
        assert!(segment(&contiguous(2), 0.7, 5, f64::NAN).is_err());
    }

    #[test]
    fn test_segment_from_words() {
        assert!(matches!(
            CaptionSegment::from_words(Vec::new()),
            Err(CaptionError::EmptySegment)
        ));
        let seg = CaptionSegment::from_words(vec![w("a", 0.2, 0.4), w("b", 0.5, 0.9)]).unwrap();
        assert!((seg.start - 0.2).abs() < f64::EPSILON);
        assert!((seg.end - 0.9).abs() < f64::EPSILON);
        assert_eq!(seg.text, "a b");
    }
}
