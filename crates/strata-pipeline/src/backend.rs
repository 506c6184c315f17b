//! Raster backend abstraction
//!
//! A backend creates off-screen surfaces that layers draw into and turns the
//! finished surface into pixels and encoded bytes. The renderer is generic
//! over the backend, so the same pipeline drives a real rasterizer or the
//! [`RecordingBackend`](crate::recording::RecordingBackend).

use crate::capability::EncoderCapabilities;
use crate::config::OutputFormat;
use crate::output::ImageFrame;
use strata_core::{Color, Surface};
use thiserror::Error;

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Surface allocation failed: {0}")]
    Allocation(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(OutputFormat),
}

/// A drawing surface that can be read back
pub trait RenderSurface: Surface {
    /// Current contents as straight-alpha RGBA
    fn snapshot(&self) -> ImageFrame;

    /// Encode the current contents; `quality` in [0, 1] applies to lossy formats
    fn encode(&self, format: OutputFormat, quality: f64) -> Result<Vec<u8>, BackendError>;
}

/// Factory for render surfaces
pub trait RasterBackend: Send + Sync + 'static {
    type Surface: RenderSurface;

    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Formats this backend can encode
    fn capabilities(&self) -> EncoderCapabilities;

    /// Allocate a `width` x `height` pixel surface filled with `background`
    ///
    /// Drawing coordinates on the new surface are in scene units; `scale`
    /// maps them to pixels.
    fn create_surface(
        &self,
        width: u32,
        height: u32,
        scale: f64,
        background: Color,
    ) -> Result<Self::Surface, BackendError>;
}
