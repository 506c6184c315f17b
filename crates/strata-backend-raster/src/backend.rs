//! Raster backend

use crate::fonts::{FontBook, FontError};
use crate::image_cache::{CacheStats, ImageCache};
use crate::surface::SkiaSurface;
use std::sync::Arc;
use strata_core::Color;
use strata_pipeline::{BackendError, EncoderCapabilities, OutputFormat, RasterBackend};
use tracing::info;

/// Default decoded-image cache size (64 MiB)
pub const DEFAULT_IMAGE_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// CPU rasterizer built on tiny-skia
#[derive(Debug, Clone)]
pub struct SkiaBackend {
    images: Arc<ImageCache>,
    fonts: Arc<FontBook>,
}

impl SkiaBackend {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SkiaBackendBuilder {
        SkiaBackendBuilder::default()
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.images
    }

    pub fn image_cache_stats(&self) -> CacheStats {
        self.images.stats()
    }
}

impl Default for SkiaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for SkiaBackend {
    type Surface = SkiaSurface;

    fn name(&self) -> &'static str {
        "tiny-skia"
    }

    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities::new([OutputFormat::Png, OutputFormat::Jpeg])
    }

    fn create_surface(
        &self,
        width: u32,
        height: u32,
        scale: f64,
        background: Color,
    ) -> Result<Self::Surface, BackendError> {
        SkiaSurface::new(
            width,
            height,
            scale,
            background,
            Arc::clone(&self.images),
            Arc::clone(&self.fonts),
        )
        .ok_or_else(|| BackendError::Allocation(format!("pixmap {width}x{height}")))
    }
}

/// Builder for [`SkiaBackend`]
#[derive(Debug)]
pub struct SkiaBackendBuilder {
    image_cache_bytes: usize,
    fonts: FontBook,
}

impl Default for SkiaBackendBuilder {
    fn default() -> Self {
        Self {
            image_cache_bytes: DEFAULT_IMAGE_CACHE_BYTES,
            fonts: FontBook::new(),
        }
    }
}

impl SkiaBackendBuilder {
    pub fn image_cache_bytes(mut self, bytes: usize) -> Self {
        self.image_cache_bytes = bytes;
        self
    }

    /// Register a font from raw TrueType or OpenType bytes
    pub fn font(mut self, family: impl Into<String>, bytes: &[u8]) -> Result<Self, FontError> {
        self.fonts.register(family, bytes)?;
        Ok(self)
    }

    pub fn font_book(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    /// Fallback family for unknown names
    pub fn default_font(mut self, family: &str) -> Result<Self, FontError> {
        self.fonts.set_default(family)?;
        Ok(self)
    }

    pub fn build(self) -> SkiaBackend {
        info!(
            image_cache_bytes = self.image_cache_bytes,
            fonts = self.fonts.families().len(),
            "Created raster backend"
        );

        SkiaBackend {
            images: Arc::new(ImageCache::new(self.image_cache_bytes)),
            fonts: Arc::new(self.fonts),
        }
    }
}
