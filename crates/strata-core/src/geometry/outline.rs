//! Vector shape outlines
//!
//! Outlines are generated in a layer's local space: origin at the top-left,
//! extent equal to the layer size. Radial shapes start their first vertex at
//! the top (angles are offset by -90 degrees).

use kurbo::{BezPath, Circle, Ellipse, Point, Rect, RoundedRect, Shape, Size};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Ratio of a star's inner radius to its outer radius
pub const STAR_INNER_RATIO: f64 = 0.4;

/// Flattening tolerance for curved shapes
const CURVE_TOLERANCE: f64 = 0.1;

/// Kind of vector shape drawn by a geometry layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    /// Circle inscribed in the layer, radius = min(w, h) / 2
    Circle,
    /// Ellipse inscribed in the layer bounds
    Ellipse,
    /// Isoceles triangle with its apex at the top center
    Triangle,
    /// Star with `points` outer vertices
    Star {
        #[serde(default = "default_star_points")]
        points: u32,
    },
    /// Regular polygon
    Polygon {
        #[serde(default = "default_polygon_sides")]
        sides: u32,
    },
}

fn default_star_points() -> u32 {
    5
}

fn default_polygon_sides() -> u32 {
    6
}

impl ShapeKind {
    /// Five-pointed star
    pub fn star() -> Self {
        Self::Star {
            points: default_star_points(),
        }
    }

    /// Hexagon
    pub fn polygon() -> Self {
        Self::Polygon {
            sides: default_polygon_sides(),
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Triangle => "triangle",
            Self::Star { .. } => "star",
            Self::Polygon { .. } => "polygon",
        }
    }
}

/// Build the outline of `kind` at `size`
///
/// `corner_radius` only affects rectangles and is clamped to half the shorter
/// side.
pub fn shape_outline(kind: ShapeKind, size: Size, corner_radius: f64) -> BezPath {
    let size = Size::new(size.width.max(0.0), size.height.max(0.0));
    let bounds = Rect::from_origin_size(Point::ZERO, size);
    let center = bounds.center();
    let radius = size.width.min(size.height) / 2.0;

    match kind {
        ShapeKind::Rectangle => {
            let r = corner_radius.max(0.0).min(radius);
            if r > 0.0 {
                RoundedRect::from_rect(bounds, r).to_path(CURVE_TOLERANCE)
            } else {
                bounds.to_path(CURVE_TOLERANCE)
            }
        }
        ShapeKind::Circle => Circle::new(center, radius).to_path(CURVE_TOLERANCE),
        ShapeKind::Ellipse => Ellipse::from_rect(bounds).to_path(CURVE_TOLERANCE),
        ShapeKind::Triangle => polyline(&[
            Point::new(size.width / 2.0, 0.0),
            Point::new(size.width, size.height),
            Point::new(0.0, size.height),
        ]),
        ShapeKind::Star { points } => {
            let points = points.max(2) as usize;
            let inner = radius * STAR_INNER_RATIO;
            let vertices: Vec<Point> = (0..points * 2)
                .map(|i| {
                    let r = if i % 2 == 0 { radius } else { inner };
                    polar(center, r, i as f64 * PI / points as f64)
                })
                .collect();
            polyline(&vertices)
        }
        ShapeKind::Polygon { sides } => {
            let sides = sides.max(3) as usize;
            let vertices: Vec<Point> = (0..sides)
                .map(|i| polar(center, radius, i as f64 * TAU / sides as f64))
                .collect();
            polyline(&vertices)
        }
    }
}

/// Point at `angle` (measured from the top, clockwise on screen)
fn polar(center: Point, radius: f64, angle: f64) -> Point {
    let a = angle - FRAC_PI_2;
    Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
}

/// Closed polygon through `vertices`
fn polyline(vertices: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = vertices.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}
