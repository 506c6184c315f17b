//! Per-layer transform

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Placement of a layer inside its parent's coordinate space
///
/// The composed matrix applies, in order: uniform scale, translation by the
/// negative (scaled) anchor offset, rotation, translation back by the anchor
/// offset, and finally translation to `position`. With no rotation and unit
/// scale, `position` is therefore the top-left corner of the layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransformRecord", into = "TransformRecord")]
pub struct LayerTransform {
    /// Position in parent space
    pub position: Point,
    /// Local size (never negative)
    size: Size,
    /// Rotation in radians (positive turns +x toward +y)
    pub rotation: f64,
    /// Uniform scale factor
    pub scale: f64,
    /// Opacity in [0, 1]
    opacity: f64,
    /// Normalized rotation/scale pivot in [0, 1] x [0, 1]
    anchor_point: Point,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            size: Size::new(100.0, 100.0),
            rotation: 0.0,
            scale: 1.0,
            opacity: 1.0,
            anchor_point: Point::new(0.5, 0.5),
        }
    }
}

impl LayerTransform {
    /// Create a transform at `position` with the given local size
    pub fn new(position: Point, size: Size) -> Self {
        Self::default().with_position(position).with_size(size)
    }

    /// Create a transform from a rectangle in parent space
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.origin(), rect.size())
    }

    /// Set the position
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Set the size (negative components clamp to zero)
    pub fn with_size(mut self, size: Size) -> Self {
        self.set_size(size);
        self
    }

    /// Set the rotation in radians
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the opacity (clamped to [0, 1])
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.set_opacity(opacity);
        self
    }

    /// Set the anchor point (each component clamped to [0, 1])
    pub fn with_anchor_point(mut self, anchor: Point) -> Self {
        self.set_anchor_point(anchor);
        self
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = Size::new(non_negative(size.width), non_negative(size.height));
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    pub fn anchor_point(&self) -> Point {
        self.anchor_point
    }

    pub fn set_anchor_point(&mut self, anchor: Point) {
        self.anchor_point = Point::new(unit(anchor.x), unit(anchor.y));
    }

    /// Anchor offset from the layer origin, after scaling
    pub fn anchor_offset(&self) -> Vec2 {
        Vec2::new(
            self.anchor_point.x * self.size.width * self.scale,
            self.anchor_point.y * self.size.height * self.scale,
        )
    }

    /// Composed local-to-parent matrix
    pub fn matrix(&self) -> Affine {
        let anchor = self.anchor_offset();

        Affine::translate(self.position.to_vec2())
            * Affine::translate(anchor)
            * Affine::rotate(self.rotation)
            * Affine::translate(-anchor)
            * Affine::scale(self.scale)
    }

    /// Untransformed local rectangle `(0, 0, w, h)`
    pub fn local_bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size)
    }

    /// Axis-aligned bounds of the local rectangle in parent space
    pub fn transformed_bounds(&self) -> Rect {
        self.matrix().transform_rect_bbox(self.local_bounds())
    }

    /// Center of the transformed bounds
    pub fn center(&self) -> Point {
        self.transformed_bounds().center()
    }

    /// Return a copy moved by `offset`
    pub fn translated(mut self, offset: Vec2) -> Self {
        self.position += offset;
        self
    }

    /// Does the transform collapse the layer to nothing?
    pub fn is_degenerate(&self) -> bool {
        self.scale == 0.0 || self.size.width == 0.0 || self.size.height == 0.0
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}

/// Persisted shape of a [`LayerTransform`]
///
/// Deserializing goes through the setters so a document can never carry an
/// out-of-range opacity, anchor, or negative size into the scene.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransformRecord {
    #[serde(default)]
    position: Point,
    #[serde(default = "default_size")]
    size: Size,
    #[serde(default)]
    rotation: f64,
    #[serde(default = "one")]
    scale: f64,
    #[serde(default = "one")]
    opacity: f64,
    #[serde(default = "center_anchor")]
    anchor_point: Point,
}

fn default_size() -> Size {
    Size::new(100.0, 100.0)
}

fn one() -> f64 {
    1.0
}

fn center_anchor() -> Point {
    Point::new(0.5, 0.5)
}

impl From<TransformRecord> for LayerTransform {
    fn from(record: TransformRecord) -> Self {
        LayerTransform::new(record.position, record.size)
            .with_rotation(record.rotation)
            .with_scale(record.scale)
            .with_opacity(record.opacity)
            .with_anchor_point(record.anchor_point)
    }
}

impl From<LayerTransform> for TransformRecord {
    fn from(t: LayerTransform) -> Self {
        Self {
            position: t.position,
            size: t.size,
            rotation: t.rotation,
            scale: t.scale,
            opacity: t.opacity,
            anchor_point: t.anchor_point,
        }
    }
}
