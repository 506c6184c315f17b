//! tiny-skia drawing surface
//!
//! Drawing coordinates are scene units; the base transform scales them to
//! pixels. Clips are kept as anti-aliased masks the size of the surface, so
//! every transparency layer can share the clip that was current when it was
//! opened.

use crate::encode;
use crate::filters;
use crate::fonts::FontBook;
use crate::image_cache::ImageCache;
use std::sync::Arc;
use strata_core::{
    Affine, BezPath, Color, DrawError, LayerFilter, Rect, Surface, TextStyle, geometry::PathEl,
};
use strata_pipeline::{BackendError, ImageFrame, OutputFormat, RenderSurface};
use tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};
use tracing::{debug, warn};

#[derive(Clone)]
struct GraphicsState {
    /// Scene units to current user space
    transform: Affine,
    alpha: f64,
    clip: Option<Mask>,
}

/// An open transparency layer
struct OpenLayer {
    pixmap: Pixmap,
    /// Alpha to composite with when the layer closes
    alpha: f64,
    clip: Option<Mask>,
    /// Pixels per scene unit at the time the layer was opened
    px_per_unit: f64,
}

/// Off-screen raster surface
pub struct SkiaSurface {
    base: Pixmap,
    layers: Vec<OpenLayer>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    scale: f64,
    images: Arc<ImageCache>,
    fonts: Arc<FontBook>,
}

impl SkiaSurface {
    pub(crate) fn new(
        width: u32,
        height: u32,
        scale: f64,
        background: Color,
        images: Arc<ImageCache>,
        fonts: Arc<FontBook>,
    ) -> Option<Self> {
        let mut base = Pixmap::new(width, height)?;
        base.fill(to_skia_color(background));

        Some(Self {
            base,
            layers: Vec::new(),
            state: GraphicsState {
                transform: Affine::IDENTITY,
                alpha: 1.0,
                clip: None,
            },
            saved: Vec::new(),
            scale,
            images,
            fonts,
        })
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    /// Finished pixels, premultiplied
    pub fn pixmap(&self) -> &Pixmap {
        &self.base
    }

    /// Number of transparency layers still open
    pub fn open_layers(&self) -> usize {
        self.layers.len()
    }

    /// Scene units to device pixels
    fn device_affine(&self) -> Affine {
        Affine::scale(self.scale) * self.state.transform
    }

    fn device_transform(&self) -> Transform {
        to_skia_transform(self.device_affine())
    }

    /// Pixels per unit of the current user space
    fn px_per_unit(&self) -> f64 {
        self.device_affine().determinant().abs().sqrt()
    }

    fn target(&mut self) -> &mut Pixmap {
        match self.layers.last_mut() {
            Some(layer) => &mut layer.pixmap,
            None => &mut self.base,
        }
    }

    /// Current drawing target and the active clip
    fn target_and_clip(&mut self) -> (&mut Pixmap, Option<&Mask>) {
        let target = match self.layers.last_mut() {
            Some(layer) => &mut layer.pixmap,
            None => &mut self.base,
        };
        (target, self.state.clip.as_ref())
    }

    fn paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        let alpha = (color.a as f64 * self.state.alpha.clamp(0.0, 1.0)).round() as u8;
        paint.set_color_rgba8(color.r, color.g, color.b, alpha);
        paint.anti_alias = true;
        paint
    }

    fn draw_pixmap(&mut self, pixmap: &Pixmap, transform: Transform) {
        let paint = PixmapPaint {
            opacity: self.state.alpha.clamp(0.0, 1.0) as f32,
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        let (target, clip) = self.target_and_clip();
        target.draw_pixmap(0, 0, pixmap.as_ref(), &paint, transform, clip);
    }
}

impl Surface for SkiaSurface {
    fn save_state(&mut self) {
        self.saved.push(self.state.clone());
    }

    fn restore_state(&mut self) {
        match self.saved.pop() {
            Some(state) => self.state = state,
            None => warn!("Unbalanced restore_state ignored"),
        }
    }

    fn concat_transform(&mut self, transform: Affine) {
        self.state.transform = self.state.transform * transform;
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha *= alpha.clamp(0.0, 1.0);
    }

    fn clip_to_rect(&mut self, rect: Rect) {
        let Some(path) = tiny_skia::Rect::from_ltrb(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.x1 as f32,
            rect.y1 as f32,
        )
        .map(PathBuilder::from_rect) else {
            // Empty clip: nothing drawn until the state is restored
            self.state.clip = Mask::new(self.base.width(), self.base.height());
            return;
        };

        let transform = self.device_transform();
        match self.state.clip.as_mut() {
            Some(mask) => mask.intersect_path(&path, FillRule::Winding, true, transform),
            None => {
                if let Some(mut mask) = Mask::new(self.base.width(), self.base.height()) {
                    mask.fill_path(&path, FillRule::Winding, true, transform);
                    self.state.clip = Some(mask);
                }
            }
        }
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) -> Result<(), DrawError> {
        let Some(path) = to_skia_path(path) else {
            return Ok(());
        };
        let paint = self.paint(color);
        let transform = self.device_transform();
        let (target, clip) = self.target_and_clip();
        target.fill_path(&path, &paint, FillRule::Winding, transform, clip);
        Ok(())
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) -> Result<(), DrawError> {
        let Some(path) = to_skia_path(path) else {
            return Ok(());
        };
        let paint = self.paint(color);
        let stroke = Stroke {
            width: width as f32,
            ..Default::default()
        };
        let transform = self.device_transform();
        let (target, clip) = self.target_and_clip();
        target.stroke_path(&path, &paint, &stroke, transform, clip);
        Ok(())
    }

    fn draw_image(&mut self, encoded: &[u8], dest: Rect) -> Result<(), DrawError> {
        let image = self.images.get_or_decode(encoded)?;
        if dest.width() <= 0.0 || dest.height() <= 0.0 {
            return Ok(());
        }

        let fit = Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(
                dest.width() / image.width() as f64,
                dest.height() / image.height() as f64,
            );
        let transform = to_skia_transform(self.device_affine() * fit);
        self.draw_pixmap(&image, transform);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<(), DrawError> {
        let Some(font) = self.fonts.resolve(&style.font_family) else {
            debug!(family = %style.font_family, "No font registered, skipping text");
            return Ok(());
        };

        let k = self.px_per_unit().max(f64::EPSILON);
        let Some(pixmap) = crate::text::rasterize(font, text, style, bounds.size(), k as f32) else {
            return Ok(());
        };

        let place = Affine::translate(bounds.origin().to_vec2()) * Affine::scale(1.0 / k);
        let transform = to_skia_transform(self.device_affine() * place);
        self.draw_pixmap(&pixmap, transform);
        Ok(())
    }

    fn begin_transparency_layer(&mut self) -> Result<(), DrawError> {
        let pixmap = Pixmap::new(self.base.width(), self.base.height()).ok_or_else(|| {
            DrawError::Allocation(format!(
                "transparency layer {}x{}",
                self.base.width(),
                self.base.height()
            ))
        })?;

        self.layers.push(OpenLayer {
            pixmap,
            alpha: self.state.alpha,
            clip: self.state.clip.clone(),
            px_per_unit: self.px_per_unit(),
        });
        self.state.alpha = 1.0;
        Ok(())
    }

    fn end_transparency_layer(&mut self, filters: &[LayerFilter]) -> Result<(), DrawError> {
        let Some(mut layer) = self.layers.pop() else {
            return Err(DrawError::Unsupported(
                "no open transparency layer".to_string(),
            ));
        };

        filters::apply_filters(&mut layer.pixmap, filters, layer.px_per_unit);

        let paint = PixmapPaint {
            opacity: layer.alpha.clamp(0.0, 1.0) as f32,
            ..Default::default()
        };
        self.target().draw_pixmap(
            0,
            0,
            layer.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            layer.clip.as_ref(),
        );
        self.state.alpha = layer.alpha;
        Ok(())
    }
}

impl RenderSurface for SkiaSurface {
    fn snapshot(&self) -> ImageFrame {
        let (width, height) = (self.base.width(), self.base.height());
        ImageFrame::from_rgba(width, height, encode::demultiply(&self.base))
            .unwrap_or_else(|| ImageFrame::new(width, height))
    }

    fn encode(&self, format: OutputFormat, quality: f64) -> Result<Vec<u8>, BackendError> {
        if !self.layers.is_empty() {
            warn!(open = self.layers.len(), "Encoding with transparency layers still open");
        }
        encode::encode(&self.base, format, quality)
    }
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs().map(|v| v as f32);
    Transform::from_row(a, b, c, d, e, f)
}

fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p) => pb.quad_to(p1.x as f32, p1.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(p1, p2, p) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}
