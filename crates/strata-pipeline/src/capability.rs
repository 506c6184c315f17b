//! Encoder capability negotiation
//!
//! Backends advertise which formats they can encode. A request for a format
//! the backend cannot produce is downgraded along a fixed fallback chain
//! (HEIC to JPEG) and the outcome records both sides so callers can tell what
//! they actually received.

use crate::config::OutputFormat;
use serde::{Deserialize, Serialize};

/// Formats a backend can encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    formats: Vec<OutputFormat>,
}

impl EncoderCapabilities {
    pub fn new(formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        let mut list: Vec<OutputFormat> = Vec::new();
        for format in formats {
            if !list.contains(&format) {
                list.push(format);
            }
        }
        Self { formats: list }
    }

    /// JPEG and PNG
    pub fn standard() -> Self {
        Self::new([OutputFormat::Jpeg, OutputFormat::Png])
    }

    pub fn formats(&self) -> &[OutputFormat] {
        &self.formats
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }

    /// Pick the format to deliver for `requested`
    ///
    /// Returns `None` when neither the request nor its fallback is supported.
    pub fn negotiate(&self, requested: OutputFormat) -> Option<FormatNegotiation> {
        let mut candidate = Some(requested);
        while let Some(format) = candidate {
            if self.supports(format) {
                return Some(FormatNegotiation {
                    requested,
                    delivered: format,
                });
            }
            candidate = fallback(format);
        }
        None
    }
}

impl Default for EncoderCapabilities {
    fn default() -> Self {
        Self::standard()
    }
}

fn fallback(format: OutputFormat) -> Option<OutputFormat> {
    match format {
        OutputFormat::Heic => Some(OutputFormat::Jpeg),
        OutputFormat::Jpeg | OutputFormat::Png => None,
    }
}

/// Result of negotiating an output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatNegotiation {
    pub requested: OutputFormat,
    pub delivered: OutputFormat,
}

impl FormatNegotiation {
    /// Was the request downgraded?
    pub fn is_fallback(&self) -> bool {
        self.requested != self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_format_passes_through() {
        let caps = EncoderCapabilities::standard();
        let n = caps.negotiate(OutputFormat::Png).unwrap();
        assert_eq!(n.delivered, OutputFormat::Png);
        assert!(!n.is_fallback());
    }

    #[test]
    fn test_heic_falls_back_to_jpeg() {
        let caps = EncoderCapabilities::standard();
        let n = caps.negotiate(OutputFormat::Heic).unwrap();
        assert_eq!(n.requested, OutputFormat::Heic);
        assert_eq!(n.delivered, OutputFormat::Jpeg);
        assert!(n.is_fallback());
    }

    #[test]
    fn test_unsupported_without_fallback() {
        let caps = EncoderCapabilities::new([OutputFormat::Jpeg]);
        assert!(caps.negotiate(OutputFormat::Png).is_none());

        let png_only = EncoderCapabilities::new([OutputFormat::Png, OutputFormat::Png]);
        assert_eq!(png_only.formats().len(), 1);
        assert!(png_only.negotiate(OutputFormat::Heic).is_none());
    }
}
