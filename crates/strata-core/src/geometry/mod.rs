//! Geometry and transforms
//!
//! Strata reuses kurbo's 2D primitives ([`Point`], [`Size`], [`Rect`],
//! [`Affine`], [`BezPath`]) and adds the layer-specific pieces on top:
//!
//! - [`LayerTransform`] - position/size/rotation/scale/opacity/anchor and the
//!   composed affine matrix derived from them
//! - [`ShapeKind`] and [`shape_outline`] - vector outlines in a layer's local space
//! - [`ContentMode`] and [`fit_rect`] - mapping natural content size into bounds

mod fit;
mod outline;
mod transform;

pub use fit::{ContentMode, fit_rect};
pub use kurbo::{Affine, BezPath, PathEl, Point, Rect, Size, Vec2};
pub use outline::{STAR_INNER_RATIO, ShapeKind, shape_outline};
pub use transform::LayerTransform;

/// Union of an iterator of rectangles, `None` when empty
pub fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Rotate `point` around `pivot` by `angle` radians
pub fn rotate_about(point: Point, pivot: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let d = point - pivot;
    pivot + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Approximate equality of two rectangles
pub fn rects_approx_eq(a: Rect, b: Rect, tolerance: f64) -> bool {
    (a.x0 - b.x0).abs() <= tolerance
        && (a.y0 - b.y0).abs() <= tolerance
        && (a.x1 - b.x1).abs() <= tolerance
        && (a.y1 - b.y1).abs() <= tolerance
}
