//! Scene graph
//!
//! A [`Scene`] owns an ordered list of layers, the current selection and a
//! little metadata. All edits go through the methods here so the scene can
//! keep its invariants: layer ids are unique (nested group members included),
//! the selection only ever names layers that exist, and every content change
//! bumps `version` together with `modified_at`.
//!
//! Layers are stored by value. Edits replace the stored layer with an updated
//! copy, so a clone of the scene taken for rendering is unaffected by later
//! edits.

use crate::color::Color;
use crate::error::SceneError;
use crate::filter::LayerFilter;
use crate::geometry::{LayerTransform, union_rects};
use crate::layer::{AnyLayer, Layer, LayerCommon, LayerId, paint_order};
use chrono::{DateTime, Utc};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Offset applied to duplicated layers
pub const DUPLICATE_OFFSET: Vec2 = Vec2::new(20.0, 20.0);

/// Unique scene identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub Uuid);

impl SceneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A composed scene
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    id: SceneId,
    name: String,
    /// Canvas size in scene units
    size: Size,
    background_color: Color,
    layers: Vec<AnyLayer>,
    /// Selected layer ids (never persisted)
    #[serde(skip)]
    pub(crate) selection: HashSet<LayerId>,
    /// Revision number, bumped on every content change
    #[serde(default)]
    version: u64,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl Scene {
    /// Create an empty scene with a white background
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        let now = Utc::now();
        Self {
            id: SceneId::new(),
            name: name.into(),
            size: non_negative_size(size),
            background_color: Color::WHITE,
            layers: Vec::new(),
            selection: HashSet::new(),
            version: 0,
            metadata: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn layers(&self) -> &[AnyLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Canvas rectangle `(0, 0, w, h)`
    pub fn canvas_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size)
    }

    /// Geometric center of the canvas
    pub fn center(&self) -> Point {
        self.canvas_rect().center()
    }

    /// Top-level layer by id
    pub fn layer(&self, id: LayerId) -> Option<&AnyLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Top-level layer by list index
    pub fn layer_at(&self, index: usize) -> Option<&AnyLayer> {
        self.layers.get(index)
    }

    /// List index of a top-level layer
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    /// Layer anywhere in the tree, including inside groups
    pub fn find_layer(&self, id: LayerId) -> Option<&AnyLayer> {
        self.layers.iter().find_map(|l| {
            if l.id() == id {
                Some(l)
            } else {
                l.as_group().and_then(|g| g.find(id))
            }
        })
    }

    /// Every layer id in the tree
    pub fn all_layer_ids(&self) -> HashSet<LayerId> {
        self.layers.iter().flat_map(AnyLayer::all_ids).collect()
    }

    /// Append a layer on top of the list
    pub fn add_layer(&mut self, layer: impl Into<AnyLayer>) -> Result<LayerId, SceneError> {
        let index = self.layers.len();
        self.insert_layer(index, layer)
    }

    /// Insert a layer at `index` (clamped to the list length)
    pub fn insert_layer(
        &mut self,
        index: usize,
        layer: impl Into<AnyLayer>,
    ) -> Result<LayerId, SceneError> {
        let layer = layer.into();
        self.check_new_ids(&layer, None)?;

        let id = layer.id();
        let index = index.min(self.layers.len());
        debug!(layer = %id, kind = ?layer.kind(), index, "Adding layer");
        self.layers.insert(index, layer);
        self.touch();
        Ok(id)
    }

    /// Remove a top-level layer
    pub fn remove_layer(&mut self, id: LayerId) -> Option<AnyLayer> {
        let index = self.index_of(id)?;
        let removed = self.layers.remove(index);
        for removed_id in removed.all_ids() {
            self.selection.remove(&removed_id);
        }
        self.touch();
        Some(removed)
    }

    /// Remove every selected layer, returning them in list order
    pub fn remove_selected(&mut self) -> Vec<AnyLayer> {
        if self.selection.is_empty() {
            return Vec::new();
        }

        let (removed, kept): (Vec<AnyLayer>, Vec<AnyLayer>) = std::mem::take(&mut self.layers)
            .into_iter()
            .partition(|l| self.selection.contains(&l.id()));
        self.layers = kept;
        self.selection.clear();

        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    /// Copy a layer, placing the copy directly above the original
    ///
    /// The copy gets fresh ids, a `" Copy"` name suffix and is offset by
    /// [`DUPLICATE_OFFSET`]. Returns the new id.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let source = &self.layers[index];

        let moved = source.transform().translated(DUPLICATE_OFFSET);
        let copy = source
            .duplicate()
            .renamed(format!("{} Copy", source.name()))
            .with_transform(moved);

        let new_id = copy.id();
        self.layers.insert(index + 1, copy);
        self.touch();
        Some(new_id)
    }

    /// Move the layer at `from` to list position `to`
    ///
    /// Out-of-range indices leave the scene unchanged.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let len = self.layers.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let layer = self.layers.remove(from);
            self.layers.insert(to, layer);
            self.touch();
        }
        true
    }

    /// Move a layer to the end of the list and raise it to the top z-order
    pub fn move_to_front(&mut self, id: LayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let top = self.layers.iter().map(|l| l.z_order()).max().unwrap_or(0);

        let layer = self.layers.remove(index).with_z_order(top);
        self.layers.push(layer);
        self.touch();
        true
    }

    /// Move a layer to the start of the list and lower it to the bottom z-order
    pub fn move_to_back(&mut self, id: LayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let bottom = self.layers.iter().map(|l| l.z_order()).min().unwrap_or(0);

        let layer = self.layers.remove(index).with_z_order(bottom);
        self.layers.insert(0, layer);
        self.touch();
        true
    }

    /// Replace the stored layer that has the same id as `layer`
    pub fn replace_layer(&mut self, layer: impl Into<AnyLayer>) -> Result<(), SceneError> {
        let layer = layer.into();
        let id = layer.id();
        let index = self.index_of(id).ok_or(SceneError::InvalidLayer(id))?;
        self.check_new_ids(&layer, Some(index))?;

        let incoming = layer.all_ids();
        for old in self.layers[index].all_ids() {
            if !incoming.contains(&old) {
                self.selection.remove(&old);
            }
        }

        self.layers[index] = layer;
        self.touch();
        Ok(())
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), SceneError> {
        let name = name.into();
        self.update_common(id, |c| c.name = name)
    }

    pub fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> Result<(), SceneError> {
        self.update_common(id, |c| c.visible = visible)
    }

    pub fn set_layer_transform(
        &mut self,
        id: LayerId,
        transform: LayerTransform,
    ) -> Result<(), SceneError> {
        self.update_common(id, |c| c.transform = transform)
    }

    pub fn set_layer_z_order(&mut self, id: LayerId, z_order: i32) -> Result<(), SceneError> {
        self.update_common(id, |c| c.z_order = z_order)
    }

    pub fn set_layer_filters(
        &mut self,
        id: LayerId,
        filters: Vec<LayerFilter>,
    ) -> Result<(), SceneError> {
        let filters: Vec<LayerFilter> = filters.into_iter().map(LayerFilter::normalized).collect();
        self.update_common(id, |c| c.filters = filters)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = non_negative_size(size);
        self.touch();
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
        self.touch();
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
        self.touch();
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<String> {
        let removed = self.metadata.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Layers in paint order: ascending z-order, ties keep list order
    pub fn render_order(&self) -> Vec<&AnyLayer> {
        paint_order(&self.layers)
    }

    /// Union of the transformed bounds of all visible layers
    pub fn content_bounds(&self) -> Option<Rect> {
        union_rects(
            self.layers
                .iter()
                .filter(|l| l.is_visible())
                .map(|l| l.bounds()),
        )
    }

    /// Topmost visible layer whose bounds contain `point`
    ///
    /// Searches in reverse paint order, so the answer is the layer that
    /// would be seen at that point.
    pub fn top_layer_at(&self, point: Point) -> Option<&AnyLayer> {
        self.render_order()
            .into_iter()
            .rev()
            .find(|l| l.is_visible() && l.bounds().contains(point))
    }

    /// Check that every layer id in the tree is unique
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut seen = HashSet::new();
        for id in self.layers.iter().flat_map(AnyLayer::all_ids) {
            if !seen.insert(id) {
                return Err(SceneError::DuplicateId(id));
            }
        }
        Ok(())
    }

    /// Record a content change
    fn touch(&mut self) {
        self.version += 1;
        self.modified_at = Utc::now();
    }

    /// Replace a top-level layer with an edited copy
    fn update_common(
        &mut self,
        id: LayerId,
        edit: impl FnOnce(&mut LayerCommon),
    ) -> Result<(), SceneError> {
        let slot = self
            .layers
            .iter_mut()
            .find(|l| l.id() == id)
            .ok_or(SceneError::InvalidLayer(id))?;
        *slot = slot.with_common(edit);
        self.touch();
        Ok(())
    }

    /// Reject `layer` if any of its ids collide with the tree
    ///
    /// `replacing` names the index whose ids are ignored because the layer
    /// there is about to be replaced.
    fn check_new_ids(&self, layer: &AnyLayer, replacing: Option<usize>) -> Result<(), SceneError> {
        let existing: HashSet<LayerId> = self
            .layers
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != replacing)
            .flat_map(|(_, l)| l.all_ids())
            .collect();

        let mut incoming = HashSet::new();
        for id in layer.all_ids() {
            if existing.contains(&id) || !incoming.insert(id) {
                return Err(SceneError::DuplicateId(id));
            }
        }
        Ok(())
    }
}

fn non_negative_size(size: Size) -> Size {
    Size::new(size.width.max(0.0), size.height.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeKind;
    use crate::layer::{GeometryLayer, GroupLayer, TextLayer};

    fn rect(name: &str, x: f64, y: f64, w: f64, h: f64) -> GeometryLayer {
        GeometryLayer::new(
            name,
            ShapeKind::Rectangle,
            LayerTransform::new(Point::new(x, y), Size::new(w, h)),
        )
        .with_fill(Color::BLACK)
    }

    fn scene() -> Scene {
        Scene::new("Test", Size::new(400.0, 500.0))
    }

    #[test]
    fn test_new_scene() {
        let scene = scene();
        assert!(scene.is_empty());
        assert_eq!(scene.version(), 0);
        assert_eq!(scene.background_color(), Color::WHITE);
        assert_eq!(scene.center(), Point::new(200.0, 250.0));
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut scene = scene();
        let layer = rect("a", 0.0, 0.0, 10.0, 10.0);
        let copy = layer.clone();

        scene.add_layer(layer).unwrap();
        assert_eq!(
            scene.add_layer(copy.clone()),
            Err(SceneError::DuplicateId(copy.id()))
        );
        assert_eq!(scene.layer_count(), 1);
    }

    #[test]
    fn test_add_rejects_nested_duplicate_id() {
        let mut scene = scene();
        let leaf = rect("leaf", 0.0, 0.0, 10.0, 10.0);
        scene.add_layer(leaf.clone()).unwrap();

        let group = GroupLayer::new("g", LayerTransform::default()).with_child(leaf.clone());
        assert_eq!(
            scene.add_layer(group),
            Err(SceneError::DuplicateId(leaf.id()))
        );
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut scene = scene();
        scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.insert_layer(99, rect("b", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.insert_layer(0, rect("c", 0.0, 0.0, 1.0, 1.0)).unwrap();

        let names: Vec<&str> = scene.layers().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_mutations_bump_version() {
        let mut scene = scene();
        let id = scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let v1 = scene.version();
        let m1 = scene.modified_at();

        scene.rename_layer(id, "renamed").unwrap();
        assert_eq!(scene.version(), v1 + 1);
        assert!(scene.modified_at() >= m1);

        scene.select(id);
        assert_eq!(scene.version(), v1 + 1);
    }

    #[test]
    fn test_remove_drops_selection() {
        let mut scene = scene();
        let id = scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.select(id);

        assert!(scene.remove_layer(id).is_some());
        assert!(scene.selected_ids().is_empty());
        assert!(scene.remove_layer(id).is_none());
    }

    #[test]
    fn test_remove_selected() {
        let mut scene = scene();
        let a = scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.add_layer(rect("b", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let c = scene.add_layer(rect("c", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.select(a);
        scene.select(c);

        let removed = scene.remove_selected();
        assert_eq!(removed.len(), 2);
        assert_eq!(scene.layer_count(), 1);
        assert_eq!(scene.layers()[0].name(), "b");
        assert!(scene.selected_ids().is_empty());
    }

    #[test]
    fn test_duplicate_layer() {
        let mut scene = scene();
        let id = scene
            .add_layer(TextLayer::new(
                "Title",
                "Hello",
                LayerTransform::new(Point::new(10.0, 15.0), Size::new(100.0, 30.0))
                    .with_rotation(0.3),
            ))
            .unwrap();
        scene.add_layer(rect("after", 0.0, 0.0, 1.0, 1.0)).unwrap();

        let copy_id = scene.duplicate_layer(id).unwrap();
        assert_ne!(copy_id, id);
        assert_eq!(scene.index_of(copy_id), Some(1));

        let original = scene.layer(id).unwrap();
        let copy = scene.layer(copy_id).unwrap();
        assert_eq!(copy.name(), "Title Copy");
        assert_eq!(copy.transform().position, Point::new(30.0, 35.0));
        assert_eq!(copy.transform().size(), original.transform().size());
        assert_eq!(copy.transform().rotation, original.transform().rotation);
        assert_eq!(copy.as_text().unwrap().text(), "Hello");
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_move_layer_out_of_range_is_noop() {
        let mut scene = scene();
        scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.add_layer(rect("b", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let version = scene.version();

        assert!(!scene.move_layer(0, 2));
        assert!(!scene.move_layer(5, 0));
        assert_eq!(scene.version(), version);

        assert!(scene.move_layer(0, 1));
        assert_eq!(scene.layers()[0].name(), "b");
    }

    #[test]
    fn test_front_and_back_follow_render_order() {
        let mut scene = scene();
        let a = scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let b = scene.add_layer(rect("b", 0.0, 0.0, 1.0, 1.0)).unwrap();
        scene.set_layer_z_order(b, 3).unwrap();

        scene.move_to_front(a);
        let order: Vec<LayerId> = scene.render_order().iter().map(|l| l.id()).collect();
        assert_eq!(order, vec![b, a]);

        scene.move_to_back(a);
        let order: Vec<LayerId> = scene.render_order().iter().map(|l| l.id()).collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(scene.layers()[0].id(), a);
    }

    #[test]
    fn test_replace_layer_is_value_semantic() {
        let mut scene = scene();
        let id = scene.add_layer(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let snapshot = scene.clone();

        let edited = scene.layer(id).unwrap().renamed("edited");
        scene.replace_layer(edited).unwrap();

        assert_eq!(scene.layer(id).unwrap().name(), "edited");
        assert_eq!(snapshot.layer(id).unwrap().name(), "a");

        let missing: AnyLayer = rect("x", 0.0, 0.0, 1.0, 1.0).into();
        assert_eq!(
            scene.replace_layer(missing.clone()),
            Err(SceneError::InvalidLayer(missing.id()))
        );
    }

    #[test]
    fn test_content_bounds_ignores_hidden() {
        let mut scene = scene();
        assert_eq!(scene.content_bounds(), None);

        scene.add_layer(rect("a", 10.0, 10.0, 20.0, 20.0)).unwrap();
        let hidden = scene.add_layer(rect("b", 300.0, 300.0, 10.0, 10.0)).unwrap();
        scene.set_layer_visibility(hidden, false).unwrap();

        assert_eq!(scene.content_bounds(), Some(Rect::new(10.0, 10.0, 30.0, 30.0)));
    }

    #[test]
    fn test_top_layer_at() {
        let mut scene = scene();
        let below = scene.add_layer(rect("below", 0.0, 0.0, 100.0, 100.0)).unwrap();
        let above = scene.add_layer(rect("above", 50.0, 50.0, 100.0, 100.0)).unwrap();

        assert_eq!(scene.top_layer_at(Point::new(75.0, 75.0)).map(|l| l.id()), Some(above));
        assert_eq!(scene.top_layer_at(Point::new(10.0, 10.0)).map(|l| l.id()), Some(below));
        assert!(scene.top_layer_at(Point::new(390.0, 490.0)).is_none());

        // z-order wins over list position
        scene.set_layer_z_order(below, 1).unwrap();
        assert_eq!(scene.top_layer_at(Point::new(75.0, 75.0)).map(|l| l.id()), Some(below));

        scene.set_layer_visibility(below, false).unwrap();
        assert_eq!(scene.top_layer_at(Point::new(75.0, 75.0)).map(|l| l.id()), Some(above));
    }

    #[test]
    fn test_metadata() {
        let mut scene = scene();
        scene.set_metadata("author", "sam");
        assert_eq!(scene.metadata().get("author").map(String::as_str), Some("sam"));
        assert_eq!(scene.remove_metadata("author"), Some("sam".to_string()));
        assert_eq!(scene.remove_metadata("author"), None);
    }
}
