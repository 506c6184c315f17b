//! Render configuration
//!
//! [`RenderConfig`] describes a single render; [`RendererSettings`] describes
//! the device a renderer runs on and is fixed for the renderer's lifetime.

use serde::{Deserialize, Serialize};
use strata_core::{Color, Scene, Size};

/// Output quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum QualityLevel {
    /// Half resolution, heavy compression
    Preview,
    #[default]
    Standard,
    /// Double resolution
    High,
    /// Triple resolution, lossless where the format allows
    Print,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 4] = [Self::Preview, Self::Standard, Self::High, Self::Print];

    /// Resolution multiplier applied on top of the device scale
    pub fn scale_factor(&self) -> f64 {
        match self {
            Self::Preview => 0.5,
            Self::Standard => 1.0,
            Self::High => 2.0,
            Self::Print => 3.0,
        }
    }

    /// Compression quality in [0, 1] for lossy formats
    pub fn compression_quality(&self) -> f64 {
        match self {
            Self::Preview => 0.6,
            Self::Standard => 0.8,
            Self::High => 0.9,
            Self::Print => 1.0,
        }
    }

    /// Next level down, `None` at the bottom
    pub fn lower(&self) -> Option<Self> {
        match self {
            Self::Print => Some(Self::High),
            Self::High => Some(Self::Standard),
            Self::Standard => Some(Self::Preview),
            Self::Preview => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Standard => "standard",
            Self::High => "high",
            Self::Print => "print",
        }
    }
}

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    Jpeg,
    #[default]
    Png,
    Heic,
}

impl OutputFormat {
    /// Can the format carry an alpha channel?
    pub fn supports_transparency(&self) -> bool {
        match self {
            Self::Jpeg => false,
            Self::Png | Self::Heic => true,
        }
    }

    /// Does the format use the compression quality?
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Heic)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Heic => "heic",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heic => "image/heic",
        }
    }
}

/// Parameters of a single render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Target size in scene units
    pub size: Size,
    /// Device pixel ratio
    pub device_scale: f64,
    pub background_color: Color,
    pub quality: QualityLevel,
    pub format: OutputFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            size: Size::new(1080.0, 1080.0),
            device_scale: 1.0,
            background_color: Color::WHITE,
            quality: QualityLevel::Standard,
            format: OutputFormat::Png,
        }
    }
}

impl RenderConfig {
    /// Standard-quality PNG of the whole scene canvas
    pub fn for_scene(scene: &Scene) -> Self {
        Self {
            size: scene.size(),
            background_color: scene.background_color(),
            ..Default::default()
        }
    }

    /// Preview-quality JPEG
    pub fn preview(scene: &Scene) -> Self {
        Self::for_scene(scene)
            .with_quality(QualityLevel::Preview)
            .with_format(OutputFormat::Jpeg)
    }

    /// High-quality render in `format`
    pub fn high_quality(scene: &Scene, format: OutputFormat) -> Self {
        Self::for_scene(scene)
            .with_quality(QualityLevel::High)
            .with_format(format)
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Size::new(size.width.max(0.0), size.height.max(0.0));
        self
    }

    pub fn with_device_scale(mut self, scale: f64) -> Self {
        self.device_scale = if scale > 0.0 { scale } else { 1.0 };
        self
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_quality(mut self, quality: QualityLevel) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Scene units to output pixels
    pub fn render_scale(&self) -> f64 {
        self.quality.scale_factor() * self.device_scale
    }

    /// Output raster dimensions in pixels
    pub fn output_pixel_size(&self) -> (u32, u32) {
        let scale = self.render_scale();
        let px = |v: f64| (v * scale).round().clamp(0.0, u32::MAX as f64) as u32;
        (px(self.size.width), px(self.size.height))
    }

    /// Bytes needed for the RGBA output raster
    pub fn estimated_memory_bytes(&self) -> u64 {
        let (w, h) = self.output_pixel_size();
        w as u64 * h as u64 * 4
    }
}

/// Device-level renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererSettings {
    /// Physical memory available to the host
    pub device_memory_bytes: u64,
    /// Share of device memory a single render may use
    pub memory_budget_fraction: f64,
    /// Device pixel ratio applied by the renderer's convenience entry points
    #[serde(default = "default_device_scale")]
    pub device_scale: f64,
}

fn default_device_scale() -> f64 {
    1.0
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            device_memory_bytes: 4 * 1024 * 1024 * 1024,
            memory_budget_fraction: 0.25,
            device_scale: default_device_scale(),
        }
    }
}

impl RendererSettings {
    /// Low-memory device (1 GiB)
    pub fn constrained() -> Self {
        Self {
            device_memory_bytes: 1024 * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Desktop workstation (16 GiB)
    pub fn workstation() -> Self {
        Self {
            device_memory_bytes: 16 * 1024 * 1024 * 1024,
            ..Default::default()
        }
    }

    pub fn with_device_memory_bytes(mut self, bytes: u64) -> Self {
        self.device_memory_bytes = bytes;
        self
    }

    pub fn with_device_scale(mut self, scale: f64) -> Self {
        self.device_scale = if scale > 0.0 { scale } else { 1.0 };
        self
    }

    /// Largest raster a single render may allocate
    pub fn memory_limit_bytes(&self) -> u64 {
        (self.device_memory_bytes as f64 * self.memory_budget_fraction.clamp(0.0, 1.0)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_presets() {
        assert_eq!(QualityLevel::Preview.scale_factor(), 0.5);
        assert_eq!(QualityLevel::Print.compression_quality(), 1.0);
        assert_eq!(QualityLevel::Print.lower(), Some(QualityLevel::High));
        assert_eq!(QualityLevel::Preview.lower(), None);
    }

    #[test]
    fn test_output_pixel_size() {
        let config = RenderConfig::default()
            .with_size(Size::new(400.0, 500.0))
            .with_quality(QualityLevel::High)
            .with_device_scale(1.5);

        assert_eq!(config.render_scale(), 3.0);
        assert_eq!(config.output_pixel_size(), (1200, 1500));
        assert_eq!(config.estimated_memory_bytes(), 1200 * 1500 * 4);
    }

    #[test]
    fn test_scene_presets() {
        let scene = Scene::new("s", Size::new(300.0, 200.0)).with_background_color(Color::BLACK);

        let preview = RenderConfig::preview(&scene);
        assert_eq!(preview.size, Size::new(300.0, 200.0));
        assert_eq!(preview.background_color, Color::BLACK);
        assert_eq!(preview.format, OutputFormat::Jpeg);
        assert_eq!(preview.output_pixel_size(), (150, 100));

        let high = RenderConfig::high_quality(&scene, OutputFormat::Heic);
        assert_eq!(high.quality, QualityLevel::High);
        assert_eq!(high.format, OutputFormat::Heic);
    }

    #[test]
    fn test_transparency_flags() {
        assert!(!OutputFormat::Jpeg.supports_transparency());
        assert!(OutputFormat::Png.supports_transparency());
        assert!(!OutputFormat::Png.is_lossy());
    }

    #[test]
    fn test_memory_limit() {
        let settings = RendererSettings::default();
        assert_eq!(settings.memory_limit_bytes(), 1024 * 1024 * 1024);
        assert!(RendererSettings::workstation().memory_limit_bytes() > settings.memory_limit_bytes());
    }
}
