//! Strata Raster Backend
//!
//! CPU rasterization of scene layers onto tiny-skia pixmaps.
//!
//! ```text
//! Layer::render → SkiaSurface (state stack, clip masks, transparency layers)
//!                     │              │                 │
//!                ImageCache       FontBook        filter kernels (rayon)
//!                     └──────── encode (PNG / JPEG) ───┘
//! ```

pub mod backend;
pub mod encode;
pub mod filters;
pub mod fonts;
pub mod image_cache;
pub mod surface;
pub mod text;

pub use backend::{DEFAULT_IMAGE_CACHE_BYTES, SkiaBackend, SkiaBackendBuilder};
pub use fonts::{FontBook, FontError};
pub use image_cache::{CacheStats, ImageCache};
pub use surface::SkiaSurface;
