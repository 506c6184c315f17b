//! Host-registered fonts

use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Font registration errors
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Invalid font data for {family}: {reason}")]
    InvalidFont { family: String, reason: String },

    #[error("Unknown font family: {0}")]
    UnknownFamily(String),
}

/// Fonts keyed by family name
///
/// Lookups are case-insensitive. A family that is not registered resolves to
/// the default family, which is the first one registered unless set
/// explicitly.
#[derive(Clone, Default)]
pub struct FontBook {
    fonts: HashMap<String, Arc<Font>>,
    default_family: Option<String>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("default_family", &self.default_family)
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a TrueType or OpenType font
    pub fn register(&mut self, family: impl Into<String>, bytes: &[u8]) -> Result<(), FontError> {
        let family = family.into();
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| {
            FontError::InvalidFont {
                family: family.clone(),
                reason: reason.to_string(),
            }
        })?;

        let key = family.to_lowercase();
        if self.default_family.is_none() {
            info!(family = %family, "Registered default font");
            self.default_family = Some(key.clone());
        } else {
            debug!(family = %family, "Registered font");
        }
        self.fonts.insert(key, Arc::new(font));
        Ok(())
    }

    /// Make an already registered family the fallback
    pub fn set_default(&mut self, family: &str) -> Result<(), FontError> {
        let key = family.to_lowercase();
        if !self.fonts.contains_key(&key) {
            return Err(FontError::UnknownFamily(family.to_string()));
        }
        self.default_family = Some(key);
        Ok(())
    }

    /// Font for `family`, falling back to the default family
    pub fn resolve(&self, family: &str) -> Option<&Font> {
        self.fonts
            .get(&family.to_lowercase())
            .or_else(|| {
                self.default_family
                    .as_ref()
                    .and_then(|key| self.fonts.get(key))
            })
            .map(Arc::as_ref)
    }

    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(&family.to_lowercase())
    }

    pub fn default_family(&self) -> Option<&str> {
        self.default_family.as_deref()
    }

    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<_> = self.fonts.keys().map(String::as_str).collect();
        families.sort_unstable();
        families
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book_resolves_nothing() {
        let book = FontBook::new();
        assert!(book.resolve("Helvetica").is_none());
        assert!(book.is_empty());
        assert!(book.default_family().is_none());
    }

    #[test]
    fn test_invalid_font_rejected() {
        let mut book = FontBook::new();
        let result = book.register("Broken", b"definitely not a font");

        assert!(matches!(result, Err(FontError::InvalidFont { family, .. }) if family == "Broken"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_unknown_default() {
        let mut book = FontBook::new();
        assert!(matches!(
            book.set_default("Missing"),
            Err(FontError::UnknownFamily(_))
        ));
    }
}
