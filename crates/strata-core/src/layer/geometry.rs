//! Vector shape layer

use super::{Layer, LayerCommon, LayerKind};
use crate::color::Color;
use crate::geometry::{LayerTransform, ShapeKind, shape_outline};
use crate::surface::{DrawError, Surface};
use kurbo::{BezPath, Rect, Size};
use serde::{Deserialize, Serialize};

/// Outline stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width: width.max(0.0),
        }
    }
}

/// A layer that fills and/or strokes a generated shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryLayer {
    #[serde(flatten)]
    common: LayerCommon,
    #[serde(default)]
    shape: ShapeKind,
    #[serde(default)]
    fill_color: Option<Color>,
    #[serde(default)]
    stroke: Option<Stroke>,
    /// Rectangle corner radius
    #[serde(default)]
    corner_radius: f64,
}

impl GeometryLayer {
    pub fn new(name: impl Into<String>, shape: ShapeKind, transform: LayerTransform) -> Self {
        Self {
            common: LayerCommon::new(name, transform),
            shape,
            fill_color: None,
            stroke: None,
            corner_radius: 0.0,
        }
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke = Some(Stroke::new(color, width));
        self
    }

    pub fn with_corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius.max(0.0);
        self
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill_color
    }

    pub fn stroke(&self) -> Option<Stroke> {
        self.stroke
    }

    pub fn corner_radius(&self) -> f64 {
        self.corner_radius
    }

    /// Outline in local space
    pub fn outline(&self) -> BezPath {
        shape_outline(self.shape, self.common.transform.size(), self.corner_radius)
    }
}

impl Layer for GeometryLayer {
    fn common(&self) -> &LayerCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut LayerCommon {
        &mut self.common
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Geometry
    }

    fn natural_size(&self) -> Size {
        self.common.transform.size()
    }

    fn draw_content(&self, surface: &mut dyn Surface, _clip: Rect) -> Result<(), DrawError> {
        let fill = self.fill_color.filter(|c| !c.is_clear());
        let stroke = self.stroke.filter(|s| s.width > 0.0 && !s.color.is_clear());
        if fill.is_none() && stroke.is_none() {
            return Ok(());
        }

        let path = self.outline();
        if let Some(color) = fill {
            surface.fill_path(&path, color)?;
        }
        if let Some(stroke) = stroke {
            surface.stroke_path(&path, stroke.color, stroke.width)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Call, CallLog, canvas};
    use super::*;
    use kurbo::Point;

    fn transform() -> LayerTransform {
        LayerTransform::new(Point::new(0.0, 0.0), Size::new(40.0, 40.0))
    }

    #[test]
    fn test_fill_then_stroke() {
        let layer = GeometryLayer::new("circle", ShapeKind::Circle, transform())
            .with_fill(Color::WHITE)
            .with_stroke(Color::BLACK, 2.0);
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();

        let fill = log.calls.iter().position(|c| *c == Call::Fill(Color::WHITE));
        let stroke = log.calls.iter().position(|c| *c == Call::Stroke(Color::BLACK, 2.0));
        assert!(fill.unwrap() < stroke.unwrap());
    }

    #[test]
    fn test_no_paint_draws_nothing() {
        let layer = GeometryLayer::new("empty", ShapeKind::Triangle, transform())
            .with_stroke(Color::BLACK, 0.0);
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();
        assert!(!log.calls.iter().any(|c| matches!(c, Call::Fill(_) | Call::Stroke(..))));
    }

    #[test]
    fn test_natural_size_is_transform_size() {
        let layer = GeometryLayer::new("r", ShapeKind::Rectangle, transform());
        assert_eq!(layer.natural_size(), Size::new(40.0, 40.0));
    }

    #[test]
    fn test_geometry_serde_defaults() {
        let json = r##"{
            "kind": "geometry",
            "id": "6f1c1a2e-9a3b-4c1d-8e2f-1a2b3c4d5e6f",
            "name": "Shape",
            "transform": {"position": {"x": 1, "y": 2}},
            "fillColor": "#ff0000"
        }"##;
        let layer: crate::layer::AnyLayer = serde_json::from_str(json).unwrap();
        let geometry = layer.as_geometry().unwrap();

        assert_eq!(geometry.shape(), ShapeKind::Rectangle);
        assert_eq!(geometry.fill_color(), Some(Color::rgb(255, 0, 0)));
        assert!(layer.is_visible());
        assert_eq!(layer.transform().size(), Size::new(100.0, 100.0));
    }
}
