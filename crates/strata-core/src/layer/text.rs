//! Styled text layer

use super::{Layer, LayerCommon, LayerKind};
use crate::color::Color;
use crate::geometry::LayerTransform;
use crate::surface::{DrawError, Surface};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Average glyph advance as a fraction of the font size
const AVERAGE_ADVANCE_EM: f64 = 0.6;
/// Line height as a fraction of the font size
const LINE_HEIGHT_EM: f64 = 1.2;

/// Horizontal alignment of text lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    /// Stretch inter-word spacing to fill the line (last line is left-aligned)
    Justify,
}

/// Typography for a text layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub color: Color,
    pub alignment: TextAlignment,
    /// Extra space between lines
    pub line_spacing: f64,
    /// Extra space between glyphs
    pub letter_spacing: f64,
    /// Maximum number of lines drawn (`None` = unlimited)
    pub max_lines: Option<u32>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 24.0,
            color: Color::BLACK,
            alignment: TextAlignment::Left,
            line_spacing: 0.0,
            letter_spacing: 0.0,
            max_lines: None,
        }
    }
}

impl TextStyle {
    pub fn with_font(mut self, family: impl Into<String>, size: f64) -> Self {
        self.font_family = family.into();
        self.font_size = size.max(0.0);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_max_lines(mut self, max_lines: Option<u32>) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Distance between consecutive baselines
    pub fn line_advance(&self) -> f64 {
        self.font_size * LINE_HEIGHT_EM + self.line_spacing
    }

    /// Font-independent size estimate for `text`
    ///
    /// Explicit newlines start new lines; the line count is capped by
    /// `max_lines`. Empty text measures as zero.
    pub fn measure(&self, text: &str) -> Size {
        if text.is_empty() {
            return Size::ZERO;
        }

        let cap = self.max_lines.map_or(usize::MAX, |n| n.max(1) as usize);
        let lines: Vec<&str> = text.split('\n').take(cap).collect();

        let advance = self.font_size * AVERAGE_ADVANCE_EM + self.letter_spacing;
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);

        let width = (widest as f64 * advance).max(0.0);
        let height = lines.len() as f64 * self.font_size * LINE_HEIGHT_EM
            + lines.len().saturating_sub(1) as f64 * self.line_spacing;

        Size::new(width, height.max(0.0))
    }
}

/// A layer that draws a string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    #[serde(flatten)]
    common: LayerCommon,
    text: String,
    #[serde(default)]
    style: TextStyle,
}

impl TextLayer {
    pub fn new(name: impl Into<String>, text: impl Into<String>, transform: LayerTransform) -> Self {
        Self {
            common: LayerCommon::new(name, transform),
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut TextStyle {
        &mut self.style
    }

    /// Resize the layer to the measured text box
    pub fn fit_to_text(&mut self) {
        let size = self.natural_size();
        self.common.transform.set_size(size);
    }
}

impl Layer for TextLayer {
    fn common(&self) -> &LayerCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut LayerCommon {
        &mut self.common
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Text
    }

    fn natural_size(&self) -> Size {
        self.style.measure(&self.text)
    }

    fn draw_content(&self, surface: &mut dyn Surface, _clip: Rect) -> Result<(), DrawError> {
        if self.text.trim().is_empty() || self.style.font_size <= 0.0 {
            return Ok(());
        }

        surface.draw_text(&self.text, &self.style, self.common.transform.local_bounds())
    }
}
