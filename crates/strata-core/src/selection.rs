//! Selection and multi-layer editing
//!
//! The selection is a set of top-level layer ids. Selecting or deselecting
//! does not count as a content change; the transform edits below do.

use crate::geometry::{rotate_about, union_rects};
use crate::layer::{AnyLayer, Layer, LayerId};
use crate::scene::Scene;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Alignment target for [`Scene::align_selected`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    /// Center horizontally
    CenterH,
    /// Center vertically
    CenterV,
    /// Center on both axes
    Center,
}

impl Scene {
    /// Add a top-level layer to the selection; unknown ids are ignored
    pub fn select(&mut self, id: LayerId) {
        if self.layer(id).is_some() {
            self.selection.insert(id);
        }
    }

    pub fn deselect(&mut self, id: LayerId) {
        self.selection.remove(&id);
    }

    pub fn select_all(&mut self) {
        self.selection = self.layers().iter().map(|l| l.id()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Flip the selection state of a layer
    pub fn toggle_selection(&mut self, id: LayerId) {
        if !self.selection.remove(&id) {
            self.select(id);
        }
    }

    pub fn is_selected(&self, id: LayerId) -> bool {
        self.selection.contains(&id)
    }

    /// Selected ids in list order
    pub fn selected_ids(&self) -> Vec<LayerId> {
        self.selected_layers().map(|l| l.id()).collect()
    }

    pub fn selected_layers(&self) -> impl Iterator<Item = &AnyLayer> {
        self.layers()
            .iter()
            .filter(|l| self.selection.contains(&l.id()))
    }

    /// Union of the transformed bounds of the selected layers
    pub fn selection_bounds(&self) -> Option<Rect> {
        union_rects(self.selected_layers().map(|l| l.bounds()))
    }

    /// Center of the selection bounds, or the canvas center without a selection
    pub fn selection_pivot(&self) -> Point {
        self.selection_bounds()
            .map(|b| b.center())
            .unwrap_or_else(|| self.center())
    }

    /// Move every selected layer by `offset`
    pub fn translate_selected(&mut self, offset: Vec2) {
        self.edit_selected(|layer| {
            let moved = layer.transform().translated(offset);
            layer.with_transform(moved)
        });
    }

    /// Scale the selection about `pivot` (default: selection center)
    ///
    /// Positions move away from or toward the pivot and each layer's own
    /// scale is multiplied by `factor`. Non-positive factors are ignored.
    pub fn scale_selected(&mut self, factor: f64, pivot: Option<Point>) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }

        let pivot = pivot.unwrap_or_else(|| self.selection_pivot());
        self.edit_selected(|layer| {
            let t = *layer.transform();
            let position = pivot + (t.position - pivot) * factor;
            layer.with_transform(t.with_position(position).with_scale(t.scale * factor))
        });
    }

    /// Rotate the selection as a rigid group about `pivot` (default: selection center)
    ///
    /// Each layer already turns about its own anchor, so the anchor is what
    /// orbits the pivot.
    pub fn rotate_selected(&mut self, angle: f64, pivot: Option<Point>) {
        if angle == 0.0 || !angle.is_finite() {
            return;
        }

        let pivot = pivot.unwrap_or_else(|| self.selection_pivot());
        self.edit_selected(|layer| {
            let t = *layer.transform();
            let anchor = t.anchor_offset();
            let position = rotate_about(t.position + anchor, pivot, angle) - anchor;
            layer.with_transform(t.with_position(position).with_rotation(t.rotation + angle))
        });
    }

    /// Align the selected layers against the selection bounds
    ///
    /// Positions change; sizes do not.
    pub fn align_selected(&mut self, alignment: Alignment) {
        let Some(bounds) = self.selection_bounds() else {
            return;
        };
        let center = bounds.center();

        self.edit_selected(|layer| {
            let t = *layer.transform();
            let extent = t.size() * t.scale;
            let mut p = t.position;

            match alignment {
                Alignment::Left => p.x = bounds.x0,
                Alignment::Right => p.x = bounds.x1 - extent.width,
                Alignment::Top => p.y = bounds.y0,
                Alignment::Bottom => p.y = bounds.y1 - extent.height,
                Alignment::CenterH => p.x = center.x - extent.width / 2.0,
                Alignment::CenterV => p.y = center.y - extent.height / 2.0,
                Alignment::Center => {
                    p.x = center.x - extent.width / 2.0;
                    p.y = center.y - extent.height / 2.0;
                }
            }

            layer.with_transform(t.with_position(p))
        });
    }

    /// Replace every selected layer with `edit(layer)`
    fn edit_selected(&mut self, edit: impl FnMut(&AnyLayer) -> AnyLayer) {
        let edits: Vec<AnyLayer> = self.selected_layers().map(edit).collect();

        for layer in edits {
            let id = layer.id();
            if let Err(e) = self.replace_layer(layer) {
                warn!(layer = %id, error = %e, "Selection edit was not applied");
            }
        }
    }
}
