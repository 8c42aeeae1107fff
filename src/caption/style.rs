//! Caption style profiles and the named preset registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{CaptionError, Result};

/// RGBA colour parsed from `RRGGBB` or `RRGGBBAA` hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity, 255 = fully opaque
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Opaque colour
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Same colour with a different opacity
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// ASS colour literal (`&HAABBGGRR`, where ASS alpha 00 is opaque)
    #[must_use]
    pub fn to_ass(&self) -> String {
        format!(
            "&H{:02X}{:02X}{:02X}{:02X}",
            0xFF - self.a,
            self.b,
            self.g,
            self.r
        )
    }

    /// ffmpeg colour literal (`0xRRGGBB` or `0xRRGGBB@opacity`)
    #[must_use]
    pub fn to_ffmpeg(&self) -> String {
        let rgb = format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b);
        if self.a == 0xFF {
            rgb
        } else {
            format!("{rgb}@{:.2}", f32::from(self.a) / 255.0)
        }
    }
}

impl FromStr for Color {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x");

        let invalid = || CaptionError::InvalidColor(s.to_string());
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 0xFF };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 0xFF {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = CaptionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// How captions are revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMethod {
    /// One overlay per caption segment
    #[default]
    WholeSegment,
    /// One overlay per word ("karaoke"), ignoring segment grouping
    PerWord,
}

impl SegmentationMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WholeSegment => "whole_segment",
            Self::PerWord => "per_word",
        }
    }
}

impl FromStr for SegmentationMethod {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "whole_segment" | "segment" => Ok(Self::WholeSegment),
            "per_word" | "word" | "karaoke" => Ok(Self::PerWord),
            _ => Err(CaptionError::InvalidParameter {
                name: "segmentation_method",
                reason: format!("unknown method '{s}'"),
            }),
        }
    }
}

impl fmt::Display for SegmentationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative caption styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleProfile {
    /// Font family name (resolved by fontconfig / libass)
    pub font: String,
    /// Font size in pixels
    pub pixel_size: u32,
    /// Text colour
    pub foreground_color: Color,
    /// Outline colour
    pub stroke_color: Color,
    /// Outline width in pixels
    pub stroke_width: f32,
    /// Box behind the text, none for transparent
    pub background_color: Option<Color>,
    /// Vertical midpoint of the caption box as a fraction of frame height
    pub vertical_anchor_fraction: f32,
    /// Maximum wrapped lines before truncation
    pub max_lines: usize,
    /// Whole segments or word-by-word reveal
    pub segmentation_method: SegmentationMethod,
    /// Horizontal safe margin in pixels on each side
    pub margin: u32,
    /// Average glyph width as a fraction of `pixel_size`
    pub glyph_width_factor: f32,
    /// Line height as a multiple of `pixel_size`
    pub line_spacing: f32,
    /// Bold weight
    pub bold: bool,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self::punchy()
    }
}

impl StyleProfile {
    /// Fast, single-line, high-contrast captions for short-form video
    #[must_use]
    pub fn punchy() -> Self {
        Self {
            font: "Arial".to_string(),
            pixel_size: 72,
            foreground_color: Color::WHITE,
            stroke_color: Color::BLACK,
            stroke_width: 4.0,
            background_color: None,
            vertical_anchor_fraction: 0.75,
            max_lines: 1,
            segmentation_method: SegmentationMethod::WholeSegment,
            margin: 40,
            glyph_width_factor: 0.55,
            line_spacing: 1.2,
            bold: true,
        }
    }

    /// Multi-line, subdued, bottom-anchored subtitles
    #[must_use]
    pub fn subtitle() -> Self {
        Self {
            font: "Arial".to_string(),
            pixel_size: 42,
            foreground_color: Color::rgb(0xE6, 0xE6, 0xE6),
            stroke_color: Color::BLACK,
            stroke_width: 1.5,
            background_color: Some(Color::BLACK.with_alpha(0x80)),
            vertical_anchor_fraction: 0.88,
            max_lines: 2,
            segmentation_method: SegmentationMethod::WholeSegment,
            margin: 20,
            glyph_width_factor: 0.5,
            line_spacing: 1.25,
            bold: false,
        }
    }

    /// Word-by-word reveal, centred in the frame
    #[must_use]
    pub fn karaoke() -> Self {
        Self {
            font: "Arial".to_string(),
            pixel_size: 96,
            foreground_color: Color::rgb(0xFF, 0xE1, 0x35),
            stroke_color: Color::BLACK,
            stroke_width: 5.0,
            background_color: None,
            vertical_anchor_fraction: 0.5,
            max_lines: 1,
            segmentation_method: SegmentationMethod::PerWord,
            margin: 40,
            glyph_width_factor: 0.55,
            line_spacing: 1.2,
            bold: true,
        }
    }

    /// Override the reveal method
    #[must_use]
    pub fn with_method(mut self, method: SegmentationMethod) -> Self {
        self.segmentation_method = method;
        self
    }

    /// Override the line limit
    #[must_use]
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Override the vertical anchor
    #[must_use]
    pub fn with_anchor(mut self, fraction: f32) -> Self {
        self.vertical_anchor_fraction = fraction;
        self
    }

    /// Height of one wrapped line in pixels
    #[must_use]
    pub fn line_height(&self) -> u32 {
        (self.pixel_size as f32 * self.line_spacing).ceil() as u32
    }

    /// Check the profile is renderable.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidStyle`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let bad = |field: &'static str, reason: &str| {
            Err(CaptionError::InvalidStyle {
                field,
                reason: reason.to_string(),
            })
        };

        if self.font.trim().is_empty() {
            return bad("font", "must not be empty");
        }
        if self.pixel_size == 0 {
            return bad("pixel_size", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.vertical_anchor_fraction) {
            return bad("vertical_anchor_fraction", "must be within 0..=1");
        }
        if self.max_lines == 0 {
            return bad("max_lines", "must be at least 1");
        }
        if self.glyph_width_factor.is_nan() || self.glyph_width_factor <= 0.0 {
            return bad("glyph_width_factor", "must be greater than 0");
        }
        if self.line_spacing.is_nan() || self.line_spacing <= 0.0 {
            return bad("line_spacing", "must be greater than 0");
        }
        if self.stroke_width.is_nan() || self.stroke_width < 0.0 {
            return bad("stroke_width", "must not be negative");
        }
        Ok(())
    }
}

/// Named style presets
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    presets: BTreeMap<String, StyleProfile>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StyleRegistry {
    /// Registry holding the built-in presets
    #[must_use]
    pub fn builtin() -> Self {
        let presets = [
            ("punchy", StyleProfile::punchy()),
            ("subtitle", StyleProfile::subtitle()),
            ("karaoke", StyleProfile::karaoke()),
        ]
        .into_iter()
        .map(|(name, profile)| (name.to_string(), profile))
        .collect();

        Self { presets }
    }

    /// Add or replace a preset.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidStyle`] if the profile fails validation.
    pub fn insert(&mut self, name: impl Into<String>, profile: StyleProfile) -> Result<()> {
        profile.validate()?;
        self.presets.insert(name.into().to_ascii_lowercase(), profile);
        Ok(())
    }

    /// Look up a preset by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::UnknownStyle`] listing the known names.
    pub fn get(&self, name: &str) -> Result<&StyleProfile> {
        self.presets
            .get(&name.trim().to_ascii_lowercase())
            .ok_or_else(|| CaptionError::UnknownStyle {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Preset names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Presets in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleProfile)> {
        self.presets.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        let c: Color = "FF8000".parse().unwrap();
        assert_eq!(c, Color::rgb(0xFF, 0x80, 0x00));

        let c: Color = "#00000080".parse().unwrap();
        assert_eq!(c.a, 0x80);

        assert!("FFF".parse::<Color>().is_err());
        assert!("GGGGGG".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_to_ass() {
        assert_eq!(Color::rgb(0xFF, 0x80, 0x00).to_ass(), "&H000080FF");
        assert_eq!(Color::BLACK.with_alpha(0x80).to_ass(), "&H7F000000");
    }

    #[test]
    fn test_color_to_ffmpeg() {
        assert_eq!(Color::WHITE.to_ffmpeg(), "0xFFFFFF");
        assert_eq!(Color::BLACK.with_alpha(0x80).to_ffmpeg(), "0x000000@0.50");
    }

    #[test]
    fn test_color_serde_roundtrip_as_string() {
        let json = serde_json::to_string(&Color::rgb(0x12, 0x34, 0x56)).unwrap();
        assert_eq!(json, "\"123456\"");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            "per-word".parse::<SegmentationMethod>().unwrap(),
            SegmentationMethod::PerWord
        );
        assert_eq!(
            "whole_segment".parse::<SegmentationMethod>().unwrap(),
            SegmentationMethod::WholeSegment
        );
        assert!("sometimes".parse::<SegmentationMethod>().is_err());
    }

    #[test]
    fn test_builtin_presets_valid() {
        let registry = StyleRegistry::builtin();
        for (name, profile) in registry.iter() {
            assert!(profile.validate().is_ok(), "preset {name} invalid");
        }
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["karaoke", "punchy", "subtitle"]
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = StyleRegistry::builtin();
        assert_eq!(
            registry.get("Karaoke").unwrap().segmentation_method,
            SegmentationMethod::PerWord
        );
        assert_eq!(registry.get("punchy").unwrap().max_lines, 1);

        let err = registry.get("fancy").unwrap_err();
        assert!(err.to_string().contains("punchy"));
    }

    #[test]
    fn test_registry_rejects_invalid_profile() {
        let mut registry = StyleRegistry::builtin();
        let err = registry
            .insert("broken", StyleProfile::punchy().with_max_lines(0))
            .unwrap_err();
        assert!(matches!(err, CaptionError::InvalidStyle { field: "max_lines", .. }));
    }

    #[test]
    fn test_validate_anchor_range() {
        assert!(StyleProfile::subtitle().with_anchor(1.2).validate().is_err());
        assert!(StyleProfile::subtitle().with_anchor(0.0).validate().is_ok());
    }

    #[test]
    fn test_partial_profile_deserialize() {
        let profile: StyleProfile =
            toml::from_str("pixel_size = 30\nsegmentation_method = \"per_word\"").unwrap();
        assert_eq!(profile.pixel_size, 30);
        assert_eq!(profile.segmentation_method, SegmentationMethod::PerWord);
        assert_eq!(profile.font, "Arial");
    }
}
