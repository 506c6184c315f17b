//! Strata Core - Scene model and geometry
//!
//! Strata composes a visual scene out of an ordered stack of heterogeneous
//! layers (images, text, vector shapes and nested groups) and hands a snapshot
//! of that stack to a renderer.
//!
//! ```text
//! Editor UI → Scene graph mutations → Scene → Renderer → Raster + encoded bytes
//!                                        ↑
//!                         Layer transforms / filters / z-order
//! ```
//!
//! This crate owns everything that does not touch pixels:
//!
//! - [`geometry`] - layer transforms, bounding boxes, shape outlines and
//!   content-fit rectangles
//! - [`filter`] - the per-layer effect model
//! - [`layer`] - the four layer variants and the [`AnyLayer`] container
//! - [`scene`] - the scene graph and its editing operations
//! - [`surface`] - the drawing contract a renderer backend implements
//! - [`document`] - the persisted scene document
//!
//! No file or network I/O happens here. Image bytes and fonts arrive from the
//! host; scene documents leave as byte buffers.

pub mod color;
pub mod document;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod layer;
pub mod scene;
pub mod selection;
pub mod surface;

// Re-export commonly used types
pub use color::Color;
pub use document::{Codec, CodecError};
pub use error::SceneError;
pub use filter::LayerFilter;
pub use geometry::{
    Affine, BezPath, ContentMode, LayerTransform, Point, Rect, ShapeKind, Size, Vec2,
};
pub use layer::{
    AnyLayer, GeometryLayer, GroupLayer, ImageLayer, Layer, LayerCommon, LayerId, LayerKind,
    Stroke, TextAlignment, TextLayer, TextStyle,
};
pub use scene::{Scene, SceneId};
pub use selection::Alignment;
pub use surface::{DrawError, Surface};
