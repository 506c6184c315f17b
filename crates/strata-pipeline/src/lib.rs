//! Strata Pipeline - Scene rendering orchestration
//!
//! This crate turns a [`Scene`](strata_core::Scene) snapshot into a raster and
//! encoded bytes through a pluggable [`RasterBackend`].
//!
//! # Render Flow
//!
//! ```text
//! Scene ──prepare──→ RenderTask ──run──→ [surface] → layers by z → encode → RenderResult
//!                       │                                 │
//!                  TaskRegistry                    watch::Sender<RenderProgress>
//!                (cancellation)                         (progress)
//! ```
//!
//! Tasks snapshot the scene when they are prepared, so later edits never
//! leak into an in-flight render. Several tasks may run concurrently; each
//! owns its surface and statistics. A pre-flight [`MemoryBudget`] check
//! rejects renders whose raster would not fit on the device.

pub mod backend;
pub mod budget;
pub mod capability;
pub mod config;
pub mod output;
pub mod progress;
pub mod recording;
pub mod registry;
pub mod renderer;

// Re-export commonly used types
pub use backend::{BackendError, RasterBackend, RenderSurface};
pub use budget::MemoryBudget;
pub use capability::{EncoderCapabilities, FormatNegotiation};
pub use config::{OutputFormat, QualityLevel, RenderConfig, RendererSettings};
pub use output::{EncodedImage, ImageFrame, RenderResult, RenderStatistics};
pub use progress::{ProgressReporter, RenderPhase, RenderProgress};
pub use recording::{DrawCommand, RecordingBackend};
pub use registry::{CancellationFlag, TaskId, TaskRegistry};
pub use renderer::{RenderError, RenderTask, SceneRenderer};
