//! Drawing surface contract
//!
//! Layers draw through this trait; a backend provides the implementation. All
//! coordinates passed to drawing calls are in the current user space, i.e.
//! after every transform concatenated since the last matching restore.

use crate::color::Color;
use crate::filter::LayerFilter;
use crate::layer::TextStyle;
use kurbo::{Affine, BezPath, Rect};
use thiserror::Error;

/// Surface-level drawing failure
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("Surface allocation failed: {0}")]
    Allocation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// A drawable surface with a graphics-state stack
///
/// State (`transform`, `alpha`, clip) is saved and restored as a unit.
/// Transparency layers collect drawing off-screen until they are closed,
/// at which point the filters are applied and the result is composited with
/// the alpha that was current when the layer was opened.
pub trait Surface {
    /// Push the current graphics state
    fn save_state(&mut self);

    /// Pop the most recently saved graphics state
    fn restore_state(&mut self);

    /// Pre-multiply the current transform by `transform`
    fn concat_transform(&mut self, transform: Affine);

    /// Set the global alpha, multiplied with the inherited alpha
    fn set_alpha(&mut self, alpha: f64);

    /// Intersect the clip with `rect`
    fn clip_to_rect(&mut self, rect: Rect);

    fn fill_path(&mut self, path: &BezPath, color: Color) -> Result<(), DrawError>;

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) -> Result<(), DrawError>;

    /// Decode `encoded` and draw it stretched into `dest`
    fn draw_image(&mut self, encoded: &[u8], dest: Rect) -> Result<(), DrawError>;

    /// Lay out and draw `text` inside `bounds`
    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<(), DrawError>;

    /// Start collecting drawing into an off-screen layer
    fn begin_transparency_layer(&mut self) -> Result<(), DrawError>;

    /// Apply `filters` to the open layer and composite it
    fn end_transparency_layer(&mut self, filters: &[LayerFilter]) -> Result<(), DrawError>;
}
