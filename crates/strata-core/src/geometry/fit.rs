//! Content-fit rectangles
//!
//! Maps content of a natural size into a layer's bounds. Pure geometry: no
//! resampling happens here.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// How image content is placed inside its layer bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ContentMode {
    /// Stretch to exactly fill the bounds
    #[default]
    ScaleToFill,
    /// Largest uniform scale that fits entirely, centered
    AspectFit,
    /// Smallest uniform scale that covers the bounds, centered
    AspectFill,
    /// Natural size, centered
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ContentMode {
    pub const ALL: [ContentMode; 12] = [
        Self::ScaleToFill,
        Self::AspectFit,
        Self::AspectFill,
        Self::Center,
        Self::Top,
        Self::Bottom,
        Self::Left,
        Self::Right,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Does this mode resample the content?
    pub fn scales_content(&self) -> bool {
        matches!(self, Self::ScaleToFill | Self::AspectFit | Self::AspectFill)
    }
}

/// Destination rectangle for content of `natural` size inside `bounds`
///
/// Content with an empty natural size maps to an empty rectangle at the
/// center of `bounds`.
pub fn fit_rect(mode: ContentMode, natural: Size, bounds: Rect) -> Rect {
    let (iw, ih) = (natural.width, natural.height);
    let (bw, bh) = (bounds.width(), bounds.height());

    if iw <= 0.0 || ih <= 0.0 {
        return Rect::from_center_size(bounds.center(), Size::ZERO);
    }

    let centered = |w: f64, h: f64| Rect::from_center_size(bounds.center(), Size::new(w, h));
    let at = |x: f64, y: f64| Rect::from_origin_size(Point::new(x, y), natural);

    let mid_x = bounds.x0 + (bw - iw) / 2.0;
    let mid_y = bounds.y0 + (bh - ih) / 2.0;
    let right = bounds.x1 - iw;
    let bottom = bounds.y1 - ih;

    match mode {
        ContentMode::ScaleToFill => bounds,
        ContentMode::AspectFit => {
            let s = (bw / iw).min(bh / ih);
            centered(iw * s, ih * s)
        }
        ContentMode::AspectFill => {
            let s = (bw / iw).max(bh / ih);
            centered(iw * s, ih * s)
        }
        ContentMode::Center => at(mid_x, mid_y),
        ContentMode::Top => at(mid_x, bounds.y0),
        ContentMode::Bottom => at(mid_x, bottom),
        ContentMode::Left => at(bounds.x0, mid_y),
        ContentMode::Right => at(right, mid_y),
        ContentMode::TopLeft => at(bounds.x0, bounds.y0),
        ContentMode::TopRight => at(right, bounds.y0),
        ContentMode::BottomLeft => at(bounds.x0, bottom),
        ContentMode::BottomRight => at(right, bottom),
    }
}
