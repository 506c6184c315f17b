//! Render output types

use crate::capability::FormatNegotiation;
use crate::config::OutputFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strata_core::Color;

/// Straight-alpha RGBA8 pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA data
    pub data: Vec<u8>,
}

impl ImageFrame {
    /// Create a transparent frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wrap existing RGBA data; `None` if the length does not match
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Get pixel at position
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        let i = self.index(x, y)?;
        Some(Color::rgba(
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ))
    }

    /// Set pixel at position; out-of-range writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.data[i..i + 4].copy_from_slice(&color.to_array());
        }
    }

    /// Fill entire frame with a color
    pub fn fill(&mut self, color: Color) {
        let px = color.to_array();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Encoded output bytes
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub negotiation: FormatNegotiation,
    /// Compression quality used for lossy formats
    pub quality: f64,
    pub data: Vec<u8>,
}

impl EncodedImage {
    /// Format the bytes are actually in
    pub fn format(&self) -> OutputFormat {
        self.negotiation.delivered
    }

    pub fn requested_format(&self) -> OutputFormat {
        self.negotiation.requested
    }

    pub fn is_fallback(&self) -> bool {
        self.negotiation.is_fallback()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Counters collected during a render
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStatistics {
    /// Layers considered by the render
    pub total_layers: usize,
    /// Layers drawn successfully
    pub visible_layers: usize,
    /// Hidden layers plus layers that failed to draw
    pub skipped_layers: usize,
    /// Filters attached to drawn layers
    pub filters_applied: usize,
    /// Size of the output raster in bytes
    pub memory_bytes: u64,
    /// Output raster size in pixels
    pub output_size: (u32, u32),
}

/// A finished render
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub frame: ImageFrame,
    pub encoded: EncodedImage,
    pub statistics: RenderStatistics,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_pixels() {
        let mut frame = ImageFrame::new(4, 3);
        assert_eq!(frame.byte_len(), 48);
        assert_eq!(frame.get_pixel(0, 0), Some(Color::CLEAR));

        frame.fill(Color::WHITE);
        frame.set_pixel(3, 2, Color::rgb(1, 2, 3));
        frame.set_pixel(10, 10, Color::BLACK);

        assert_eq!(frame.get_pixel(0, 0), Some(Color::WHITE));
        assert_eq!(frame.get_pixel(3, 2), Some(Color::rgb(1, 2, 3)));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(ImageFrame::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(ImageFrame::from_rgba(2, 2, vec![0; 15]).is_none());
    }
}
