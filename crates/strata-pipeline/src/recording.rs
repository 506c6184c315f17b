//! Recording backend
//!
//! Captures draw calls instead of rasterizing them. Used for dry runs (the
//! CLI's `inspect` command) and for pipeline tests that care about what was
//! drawn rather than the pixels.

use crate::backend::{BackendError, RasterBackend, RenderSurface};
use crate::capability::EncoderCapabilities;
use crate::config::OutputFormat;
use crate::output::ImageFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    Affine, BezPath, Color, DrawError, LayerFilter, Rect, Surface, TextStyle,
    geometry::PathEl,
};

/// A recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Transform(Affine),
    Alpha(f64),
    Clip(Rect),
    Fill { bounds: Rect, color: Color },
    Stroke { bounds: Rect, color: Color, width: f64 },
    Image { dest: Rect, bytes: usize },
    Text { text: String, font_family: String, bounds: Rect },
    BeginLayer,
    EndLayer { filters: Vec<LayerFilter> },
}

/// Backend that records draw calls
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    capabilities: EncoderCapabilities,
    draw_delay: Option<Duration>,
    log: Arc<Mutex<Vec<DrawCommand>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            capabilities: EncoderCapabilities::standard(),
            draw_delay: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Advertise a different set of encoders
    pub fn with_capabilities(mut self, capabilities: EncoderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sleep this long on every fill, stroke, image and text call
    pub fn with_draw_delay(mut self, delay: Duration) -> Self {
        self.draw_delay = Some(delay);
        self
    }

    /// Everything recorded so far, across all surfaces
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for RecordingBackend {
    type Surface = RecordingSurface;

    fn name(&self) -> &'static str {
        "recording"
    }

    fn capabilities(&self) -> EncoderCapabilities {
        self.capabilities.clone()
    }

    fn create_surface(
        &self,
        width: u32,
        height: u32,
        _scale: f64,
        background: Color,
    ) -> Result<Self::Surface, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::Allocation(format!(
                "empty surface {width}x{height}"
            )));
        }

        Ok(RecordingSurface {
            width,
            height,
            background,
            draw_delay: self.draw_delay,
            log: Arc::clone(&self.log),
        })
    }
}

/// Surface half of [`RecordingBackend`]
#[derive(Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    background: Color,
    draw_delay: Option<Duration>,
    log: Arc<Mutex<Vec<DrawCommand>>>,
}

impl RecordingSurface {
    fn record(&self, command: DrawCommand) {
        self.log.lock().push(command);
    }

    fn paint(&self, command: DrawCommand) {
        if let Some(delay) = self.draw_delay {
            std::thread::sleep(delay);
        }
        self.record(command);
    }
}

/// Does `data` start with a PNG or JPEG signature?
fn looks_like_image(data: &[u8]) -> bool {
    data.starts_with(b"\x89PNG\r\n\x1a\n") || data.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn path_bounds(path: &BezPath) -> Rect {
    let mut bounds: Option<Rect> = None;
    for el in path.elements() {
        let p = match *el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => p,
            PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => p,
            PathEl::ClosePath => continue,
        };
        let r = Rect::from_points(p, p);
        bounds = Some(bounds.map_or(r, |b| b.union(r)));
    }
    bounds.unwrap_or(Rect::ZERO)
}

impl Surface for RecordingSurface {
    fn save_state(&mut self) {
        self.record(DrawCommand::Save);
    }

    fn restore_state(&mut self) {
        self.record(DrawCommand::Restore);
    }

    fn concat_transform(&mut self, transform: Affine) {
        self.record(DrawCommand::Transform(transform));
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.record(DrawCommand::Alpha(alpha));
    }

    fn clip_to_rect(&mut self, rect: Rect) {
        self.record(DrawCommand::Clip(rect));
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) -> Result<(), DrawError> {
        self.paint(DrawCommand::Fill {
            bounds: path_bounds(path),
            color,
        });
        Ok(())
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) -> Result<(), DrawError> {
        self.paint(DrawCommand::Stroke {
            bounds: path_bounds(path),
            color,
            width,
        });
        Ok(())
    }

    fn draw_image(&mut self, encoded: &[u8], dest: Rect) -> Result<(), DrawError> {
        if !looks_like_image(encoded) {
            return Err(DrawError::ImageDecode(
                "unrecognized image signature".to_string(),
            ));
        }
        self.paint(DrawCommand::Image {
            dest,
            bytes: encoded.len(),
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<(), DrawError> {
        self.paint(DrawCommand::Text {
            text: text.to_string(),
            font_family: style.font_family.clone(),
            bounds,
        });
        Ok(())
    }

    fn begin_transparency_layer(&mut self) -> Result<(), DrawError> {
        self.record(DrawCommand::BeginLayer);
        Ok(())
    }

    fn end_transparency_layer(&mut self, filters: &[LayerFilter]) -> Result<(), DrawError> {
        self.record(DrawCommand::EndLayer {
            filters: filters.to_vec(),
        });
        Ok(())
    }
}

impl RenderSurface for RecordingSurface {
    fn snapshot(&self) -> ImageFrame {
        let mut frame = ImageFrame::new(self.width, self.height);
        frame.fill(self.background);
        frame
    }

    fn encode(&self, format: OutputFormat, quality: f64) -> Result<Vec<u8>, BackendError> {
        let quality = if format.is_lossy() { quality } else { 1.0 };
        Ok(format!(
            "{}:{}x{}:q{:.2}",
            format.extension(),
            self.width,
            self.height,
            quality
        )
        .into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{GeometryLayer, Layer, LayerTransform, Point, ShapeKind, Size};

    #[test]
    fn test_records_layer_draw() {
        let backend = RecordingBackend::new();
        let mut surface = backend.create_surface(100, 100, 1.0, Color::WHITE).unwrap();

        let layer = GeometryLayer::new(
            "r",
            ShapeKind::Rectangle,
            LayerTransform::new(Point::new(10.0, 10.0), Size::new(20.0, 30.0)),
        )
        .with_fill(Color::BLACK);
        layer
            .render(&mut surface, Rect::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();

        let commands = backend.commands();
        assert_eq!(commands.first(), Some(&DrawCommand::Save));
        assert_eq!(commands.last(), Some(&DrawCommand::Restore));
        assert!(commands.contains(&DrawCommand::Fill {
            bounds: Rect::new(0.0, 0.0, 20.0, 30.0),
            color: Color::BLACK,
        }));
    }

    #[test]
    fn test_rejects_unknown_image_bytes() {
        let backend = RecordingBackend::new();
        let mut surface = backend.create_surface(10, 10, 1.0, Color::WHITE).unwrap();

        let bad = surface.draw_image(b"garbage", Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(matches!(bad, Err(DrawError::ImageDecode(_))));

        let png = surface.draw_image(b"\x89PNG\r\n\x1a\n....", Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(png.is_ok());
    }

    #[test]
    fn test_zero_size_surface_fails() {
        let backend = RecordingBackend::new();
        assert!(matches!(
            backend.create_surface(0, 10, 1.0, Color::WHITE),
            Err(BackendError::Allocation(_))
        ));
    }

    #[test]
    fn test_encode_and_snapshot() {
        let backend = RecordingBackend::new();
        let surface = backend.create_surface(3, 2, 1.0, Color::BLACK).unwrap();

        let bytes = surface.encode(OutputFormat::Jpeg, 0.6).unwrap();
        assert_eq!(bytes, b"jpg:3x2:q0.60");
        assert_eq!(surface.snapshot().get_pixel(2, 1), Some(Color::BLACK));
    }
}
