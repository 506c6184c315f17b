//! Layer model
//!
//! Every layer shares a common set of properties ([`LayerCommon`]) and the
//! [`Layer`] capability trait. The four concrete variants are held in the
//! closed [`AnyLayer`] sum type so a scene can store them in one list.
//!
//! Layers are plain values. Editing a layer that lives in a scene means
//! building an updated copy and handing it back to the scene, which replaces
//! the stored value; copies taken earlier (for example by an in-flight render)
//! never observe the change.

mod geometry;
mod group;
mod image;
mod text;

pub use geometry::{GeometryLayer, Stroke};
pub use group::GroupLayer;
pub use image::ImageLayer;
pub use text::{TextAlignment, TextLayer, TextStyle};

use crate::filter::{self, LayerFilter};
use crate::geometry::LayerTransform;
use crate::surface::{DrawError, Surface};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub Uuid);

impl LayerId {
    /// Create a new random layer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Concrete layer variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    Image,
    Text,
    Geometry,
    Group,
}

impl LayerKind {
    /// Default display name for new layers of this kind
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Text => "Text",
            Self::Geometry => "Shape",
            Self::Group => "Group",
        }
    }
}

/// Properties shared by every layer variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerCommon {
    pub id: LayerId,
    pub name: String,
    pub transform: LayerTransform,
    #[serde(default)]
    pub filters: Vec<LayerFilter>,
    #[serde(default = "visible_default")]
    pub visible: bool,
    /// Paint order key (lower paints first)
    #[serde(default)]
    pub z_order: i32,
}

fn visible_default() -> bool {
    true
}

impl LayerCommon {
    /// Create common properties with a fresh id
    pub fn new(name: impl Into<String>, transform: LayerTransform) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            transform,
            filters: Vec::new(),
            visible: true,
            z_order: 0,
        }
    }
}

/// Capability set shared by all layer variants
pub trait Layer {
    fn common(&self) -> &LayerCommon;

    fn common_mut(&mut self) -> &mut LayerCommon;

    fn kind(&self) -> LayerKind;

    /// Intrinsic content size
    fn natural_size(&self) -> Size;

    /// Variant-specific drawing in local space
    ///
    /// Called with the layer transform and opacity already applied. `clip` is
    /// the visible region expressed in the same local space.
    fn draw_content(&self, surface: &mut dyn Surface, clip: Rect) -> Result<(), DrawError>;

    /// Assign fresh ids to this layer and everything it contains
    fn regenerate_ids(&mut self) {
        self.common_mut().id = LayerId::new();
    }

    fn id(&self) -> LayerId {
        self.common().id
    }

    fn name(&self) -> &str {
        &self.common().name
    }

    fn transform(&self) -> &LayerTransform {
        &self.common().transform
    }

    fn filters(&self) -> &[LayerFilter] {
        &self.common().filters
    }

    fn is_visible(&self) -> bool {
        self.common().visible
    }

    fn z_order(&self) -> i32 {
        self.common().z_order
    }

    /// Transformed bounds in the parent's space
    fn bounds(&self) -> Rect {
        self.transform().transformed_bounds()
    }

    /// Bounds including the area filters may paint into
    fn painted_bounds(&self) -> Rect {
        let outset = filter::total_outset(self.filters());
        self.bounds().inflate(outset, outset)
    }

    /// Region of the parent's space the layer can paint into
    fn paint_extent(&self) -> Rect {
        self.painted_bounds()
    }

    /// Does the layer collapse to nothing?
    fn is_collapsed(&self) -> bool {
        self.transform().is_degenerate()
    }

    /// Draw the layer onto `surface`
    ///
    /// `clip` is the visible region in the parent's space. Invisible layers
    /// and layers entirely outside `clip` draw nothing. The graphics state is
    /// restored on every path, including failures.
    fn render(&self, surface: &mut dyn Surface, clip: Rect) -> Result<(), DrawError> {
        if !self.is_visible() || self.is_collapsed() {
            return Ok(());
        }

        if self.paint_extent().intersect(clip).area() <= 0.0 {
            return Ok(());
        }

        let matrix = self.transform().matrix();
        let local_clip = if matrix.determinant().abs() > f64::EPSILON {
            matrix.inverse().transform_rect_bbox(clip)
        } else {
            return Ok(());
        };

        surface.save_state();
        surface.concat_transform(matrix);
        surface.set_alpha(self.transform().opacity());

        let result = if filter::has_effect(self.filters()) {
            surface.begin_transparency_layer().and_then(|()| {
                let drawn = self.draw_content(surface, local_clip);
                let composited = surface.end_transparency_layer(self.filters());
                drawn.and(composited)
            })
        } else {
            self.draw_content(surface, local_clip)
        };

        surface.restore_state();
        result
    }

    /// Deep copy with fresh ids
    fn duplicate(&self) -> Self
    where
        Self: Clone + Sized,
    {
        let mut copy = self.clone();
        copy.regenerate_ids();
        copy
    }
}

/// A layer of any kind
///
/// Equality is by id only: two layers with identical content but different
/// ids are different layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnyLayer {
    Image(ImageLayer),
    Text(TextLayer),
    Geometry(GeometryLayer),
    Group(GroupLayer),
}

macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            AnyLayer::Image($layer) => $body,
            AnyLayer::Text($layer) => $body,
            AnyLayer::Geometry($layer) => $body,
            AnyLayer::Group($layer) => $body,
        }
    };
}

impl Layer for AnyLayer {
    fn common(&self) -> &LayerCommon {
        dispatch!(self, l => l.common())
    }

    fn common_mut(&mut self) -> &mut LayerCommon {
        dispatch!(self, l => l.common_mut())
    }

    fn kind(&self) -> LayerKind {
        dispatch!(self, l => l.kind())
    }

    fn natural_size(&self) -> Size {
        dispatch!(self, l => l.natural_size())
    }

    fn draw_content(&self, surface: &mut dyn Surface, clip: Rect) -> Result<(), DrawError> {
        dispatch!(self, l => l.draw_content(surface, clip))
    }

    fn paint_extent(&self) -> Rect {
        dispatch!(self, l => l.paint_extent())
    }

    fn is_collapsed(&self) -> bool {
        dispatch!(self, l => l.is_collapsed())
    }

    fn regenerate_ids(&mut self) {
        dispatch!(self, l => l.regenerate_ids())
    }
}

impl AnyLayer {
    /// Copy with `edit` applied to the common properties
    pub fn with_common(&self, edit: impl FnOnce(&mut LayerCommon)) -> Self {
        let mut copy = self.clone();
        edit(copy.common_mut());
        copy
    }

    /// Copy with a new name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_common(|c| c.name = name)
    }

    /// Copy with a new transform
    pub fn with_transform(&self, transform: LayerTransform) -> Self {
        self.with_common(|c| c.transform = transform)
    }

    /// Copy with visibility changed
    pub fn with_visibility(&self, visible: bool) -> Self {
        self.with_common(|c| c.visible = visible)
    }

    /// Copy with a new z-order
    pub fn with_z_order(&self, z_order: i32) -> Self {
        self.with_common(|c| c.z_order = z_order)
    }

    /// Copy with a new filter list
    pub fn with_filters(&self, filters: Vec<LayerFilter>) -> Self {
        self.with_common(|c| c.filters = filters)
    }

    /// Ids of this layer and all nested layers
    pub fn all_ids(&self) -> Vec<LayerId> {
        let mut ids = vec![self.id()];
        if let Self::Group(group) = self {
            for child in group.children() {
                ids.extend(child.all_ids());
            }
        }
        ids
    }

    pub fn as_image(&self) -> Option<&ImageLayer> {
        match self {
            Self::Image(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextLayer> {
        match self {
            Self::Text(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryLayer> {
        match self {
            Self::Geometry(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupLayer> {
        match self {
            Self::Group(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for AnyLayer {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for AnyLayer {}

impl From<ImageLayer> for AnyLayer {
    fn from(layer: ImageLayer) -> Self {
        Self::Image(layer)
    }
}

impl From<TextLayer> for AnyLayer {
    fn from(layer: TextLayer) -> Self {
        Self::Text(layer)
    }
}

impl From<GeometryLayer> for AnyLayer {
    fn from(layer: GeometryLayer) -> Self {
        Self::Geometry(layer)
    }
}

impl From<GroupLayer> for AnyLayer {
    fn from(layer: GroupLayer) -> Self {
        Self::Group(layer)
    }
}

/// Stable paint order: ascending z-order, ties keep list order
pub fn paint_order<L: Layer>(layers: &[L]) -> Vec<&L> {
    let mut ordered: Vec<&L> = layers.iter().collect();
    ordered.sort_by_key(|l| l.z_order());
    ordered
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, CallLog, canvas};
    use super::*;
    use crate::color::Color;
    use crate::geometry::ShapeKind;
    use kurbo::Point;

    fn rect_layer(name: &str) -> AnyLayer {
        GeometryLayer::new(
            name,
            ShapeKind::Rectangle,
            LayerTransform::new(Point::new(10.0, 10.0), Size::new(50.0, 50.0)),
        )
        .with_fill(Color::rgb(255, 0, 0))
        .into()
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = rect_layer("a");
        let same_id_other_name = a.renamed("renamed");
        let same_content_new_id = a.duplicate();

        assert_eq!(a, same_id_other_name);
        assert_ne!(a, same_content_new_id);
    }

    #[test]
    fn test_value_semantics() {
        let original = rect_layer("original");
        let renamed = original.renamed("changed");

        assert_eq!(original.name(), "original");
        assert_eq!(renamed.name(), "changed");
    }

    #[test]
    fn test_render_wraps_state() {
        let layer = rect_layer("r");
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();

        assert_eq!(log.calls.first(), Some(&Call::Save));
        assert_eq!(log.calls.last(), Some(&Call::Restore));
        assert!(log.calls.contains(&Call::Alpha(1.0)));
        assert!(log.calls.contains(&Call::Fill(Color::rgb(255, 0, 0))));
    }

    #[test]
    fn test_invisible_layer_draws_nothing() {
        let layer = rect_layer("hidden").with_visibility(false);
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();
        assert!(log.calls.is_empty());
    }

    #[test]
    fn test_outside_clip_draws_nothing() {
        let layer = rect_layer("far").with_transform(LayerTransform::new(
            Point::new(5000.0, 5000.0),
            Size::new(10.0, 10.0),
        ));
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();
        assert!(log.calls.is_empty());
    }

    #[test]
    fn test_filters_use_transparency_layer() {
        let layer = rect_layer("f").with_filters(vec![LayerFilter::Warm, LayerFilter::None]);
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();

        let begin = log.calls.iter().position(|c| *c == Call::BeginLayer).unwrap();
        let end = log.calls.iter().position(|c| *c == Call::EndLayer(2)).unwrap();
        assert!(begin < end);
        assert_eq!(log.calls.last(), Some(&Call::Restore));
    }

    #[test]
    fn test_identity_filters_skip_transparency_layer() {
        let layer = rect_layer("f").with_filters(vec![LayerFilter::None]);
        let mut log = CallLog::default();
        layer.render(&mut log, canvas()).unwrap();
        assert!(!log.calls.contains(&Call::BeginLayer));
    }

    #[test]
    fn test_paint_order_is_stable() {
        let a = rect_layer("a").with_z_order(1);
        let b = rect_layer("b").with_z_order(0);
        let c = rect_layer("c").with_z_order(1);
        let d = rect_layer("d").with_z_order(0);
        let layers = vec![a, b, c, d];

        let names: Vec<&str> = paint_order(&layers).iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_tagged_serialization() {
        let layer = rect_layer("tagged");
        let json = serde_json::to_value(&layer).unwrap();

        assert_eq!(json["kind"], "geometry");
        assert_eq!(json["name"], "tagged");

        let decoded: AnyLayer = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.id(), layer.id());
        assert_eq!(decoded.kind(), LayerKind::Geometry);
    }
}
