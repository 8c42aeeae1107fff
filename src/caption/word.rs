//! Timed words and validated word streams
//!
//! A [`WordStream`] is the only way words reach the segmentation engine, so
//! every invariant on timestamps is checked once, here, before any grouping
//! happens.

use serde::{Deserialize, Serialize};

use super::{CaptionError, Result};

/// A single transcribed word with start/end timestamps in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Token text exactly as produced by the transcriber (may carry
    /// surrounding whitespace)
    #[serde(alias = "word")]
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Word {
    /// Create a validated word.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidWord`] when a timestamp is not finite,
    /// is negative, or `end < start`.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Result<Self> {
        let word = Self {
            text: text.into(),
            start,
            end,
        };
        word.validate(0)?;
        Ok(word)
    }

    /// Token text with surrounding whitespace removed
    #[must_use]
    pub fn token(&self) -> &str {
        self.text.trim()
    }

    /// Duration in seconds (zero for instantaneous words)
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn validate(&self, index: usize) -> Result<()> {
        let reason = if !self.start.is_finite() || !self.end.is_finite() {
            "timestamps must be finite"
        } else if self.start < 0.0 {
            "start must not be negative"
        } else if self.end < self.start {
            "end is before start"
        } else {
            return Ok(());
        };

        Err(CaptionError::InvalidWord {
            index,
            text: self.text.clone(),
            start: self.start,
            end: self.end,
            reason,
        })
    }
}

/// Ordered, validated sequence of timed words
///
/// Starts are non-decreasing; equal starts (overlapping speech) are legal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WordStream {
    words: Vec<Word>,
}

impl WordStream {
    /// Build a stream, validating every word and the ordering.
    ///
    /// Validation fails fast on the first offending word; nothing is
    /// repaired.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidWord`] or [`CaptionError::NonMonotonic`].
    pub fn new(words: Vec<Word>) -> Result<Self> {
        for (index, word) in words.iter().enumerate() {
            word.validate(index)?;
        }

        for (index, pair) in words.windows(2).enumerate() {
            if pair[1].start < pair[0].start {
                return Err(CaptionError::NonMonotonic {
                    index: index + 1,
                    previous: pair[0].start,
                    start: pair[1].start,
                });
            }
        }

        Ok(Self { words })
    }

    /// Empty stream (no captions is a valid terminal state)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Borrow the words in order
    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Number of words
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the stream has no words
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// End of the last word, or 0 for an empty stream
    #[must_use]
    pub fn end(&self) -> f64 {
        self.words.iter().map(|w| w.end).fold(0.0, f64::max)
    }
}

impl<'de> Deserialize<'de> for WordStream {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let words = Vec::<Word>::deserialize(deserializer)?;
        Self::new(words).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Vec<Word>> for WordStream {
    type Error = CaptionError;

    fn try_from(words: Vec<Word>) -> Result<Self> {
        Self::new(words)
    }
}

impl<'a> IntoIterator for &'a WordStream {
    type Item = &'a Word;
    type IntoIter = std::slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}
