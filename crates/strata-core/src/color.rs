//! RGBA colors
//!
//! Colors are stored as straight (non-premultiplied) 8-bit channels and
//! persisted as `#RRGGBB` or `#RRGGBBAA` strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An 8-bit straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Hex color parse failure
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid hex color: {0:?}")]
pub struct ParseColorError(pub String);

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const CLEAR: Self = Self::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let digits = hex.trim().trim_start_matches('#');
        let err = || ParseColorError(hex.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());

        match digits.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| err())
                };
                Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(err()),
        }
    }

    /// Format as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Return this color with its alpha multiplied by `opacity`
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Is the color fully transparent?
    pub fn is_clear(&self) -> bool {
        self.a == 0
    }

    /// Channels as an `[r, g, b, a]` array
    pub fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Color::from_hex("#FF8000"), Ok(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("00ff0080"), Ok(Color::rgba(0, 255, 0, 128)));
        assert_eq!(Color::from_hex("#fff"), Ok(Color::WHITE));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GG0000").is_err());
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 0)).unwrap();
        assert_eq!(json, "\"#FF0000\"");

        let decoded: Color = serde_json::from_str("\"#00FF00\"").unwrap();
        assert_eq!(decoded, Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_with_opacity() {
        assert_eq!(Color::WHITE.with_opacity(0.5).a, 128);
        assert_eq!(Color::WHITE.with_opacity(2.0).a, 255);
    }
}
