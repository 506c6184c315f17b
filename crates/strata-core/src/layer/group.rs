//! Nested layer group

use super::{AnyLayer, Layer, LayerCommon, LayerId, LayerKind, paint_order};
use crate::filter;
use crate::geometry::{LayerTransform, union_rects};
use crate::surface::{DrawError, Surface};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A layer containing other layers
///
/// The group's transform maps its children's coordinate space into the
/// parent's; child positions are relative to the group's top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLayer {
    #[serde(flatten)]
    common: LayerCommon,
    #[serde(default)]
    children: Vec<AnyLayer>,
    #[serde(default)]
    clip_to_bounds: bool,
}

impl GroupLayer {
    pub fn new(name: impl Into<String>, transform: LayerTransform) -> Self {
        Self {
            common: LayerCommon::new(name, transform),
            children: Vec::new(),
            clip_to_bounds: false,
        }
    }

    /// Group sized to fit `children`, which are re-expressed relative to it
    pub fn wrapping(name: impl Into<String>, children: Vec<AnyLayer>) -> Self {
        let bounds = union_rects(children.iter().map(|c| c.bounds())).unwrap_or(Rect::ZERO);
        let offset = -bounds.origin().to_vec2();

        let children = children
            .into_iter()
            .map(|child| {
                let moved = child.transform().translated(offset);
                child.with_transform(moved)
            })
            .collect();

        Self {
            common: LayerCommon::new(name, LayerTransform::from_rect(bounds)),
            children,
            clip_to_bounds: false,
        }
    }

    pub fn with_child(mut self, child: impl Into<AnyLayer>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_clip_to_bounds(mut self, clip: bool) -> Self {
        self.clip_to_bounds = clip;
        self
    }

    pub fn children(&self) -> &[AnyLayer] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<AnyLayer> {
        &mut self.children
    }

    pub fn clip_to_bounds(&self) -> bool {
        self.clip_to_bounds
    }

    /// Find a descendant by id
    pub fn find(&self, id: LayerId) -> Option<&AnyLayer> {
        self.children.iter().find_map(|child| {
            if child.id() == id {
                Some(child)
            } else {
                child.as_group().and_then(|g| g.find(id))
            }
        })
    }
}

impl Layer for GroupLayer {
    fn common(&self) -> &LayerCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut LayerCommon {
        &mut self.common
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Group
    }

    fn natural_size(&self) -> Size {
        self.common.transform.size()
    }

    fn draw_content(&self, surface: &mut dyn Surface, clip: Rect) -> Result<(), DrawError> {
        let clip = if self.clip_to_bounds {
            let local = self.common.transform.local_bounds();
            surface.clip_to_rect(local);
            clip.intersect(local)
        } else {
            clip
        };

        for child in paint_order(&self.children) {
            if let Err(e) = child.render(surface, clip) {
                warn!(
                    group = %self.common.id,
                    layer = %child.id(),
                    error = %e,
                    "Child layer failed to draw"
                );
            }
        }

        Ok(())
    }

    /// Unclipped groups paint wherever their children do
    fn paint_extent(&self) -> Rect {
        if self.clip_to_bounds {
            return self.painted_bounds();
        }

        let matrix = self.common.transform.matrix();
        let outset = filter::total_outset(self.filters());
        union_rects(
            self.children
                .iter()
                .filter(|c| c.is_visible() && !c.is_collapsed())
                .map(|c| matrix.transform_rect_bbox(c.paint_extent())),
        )
        .map(|r| r.inflate(outset, outset))
        .unwrap_or(Rect::ZERO)
    }

    /// An empty group rect only hides children when it clips them
    fn is_collapsed(&self) -> bool {
        if self.clip_to_bounds {
            self.common.transform.is_degenerate()
        } else {
            self.common.transform.scale == 0.0
        }
    }

    fn regenerate_ids(&mut self) {
        self.common.id = LayerId::new();
        for child in &mut self.children {
            child.regenerate_ids();
        }
    }
}
