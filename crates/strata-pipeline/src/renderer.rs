//! Scene renderer
//!
//! [`SceneRenderer`] turns a scene snapshot into a raster and encoded bytes.
//! Each render runs as a [`RenderTask`]: the task owns a clone of the scene
//! taken when it was prepared, its own surface and statistics, a progress
//! channel, and a registry entry that lets the host cancel it. The per-layer
//! loop runs on tokio's blocking pool.

use crate::backend::{BackendError, RasterBackend, RenderSurface};
use crate::budget::MemoryBudget;
use crate::config::{OutputFormat, RenderConfig, RendererSettings};
use crate::output::{EncodedImage, RenderResult, RenderStatistics};
use crate::progress::{ProgressReporter, RenderPhase, RenderProgress};
use crate::registry::{CancellationFlag, RegistryGuard, TaskId, TaskRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use strata_core::{AnyLayer, Layer, LayerId, Point, Rect, Scene};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{Level, debug, info, span, warn};

/// Render errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Scene has no layers to render")]
    InvalidScene,

    #[error("Layer not found: {0}")]
    InvalidLayer(LayerId),

    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    #[error("Image conversion failed")]
    ImageConversionFailed,

    #[error("Insufficient memory: {required} bytes required, {available} available")]
    InsufficientMemory { required: u64, available: u64 },

    #[error("Render cancelled")]
    Cancelled,
}

impl From<BackendError> for RenderError {
    fn from(e: BackendError) -> Self {
        Self::RenderingFailed(e.to_string())
    }
}

/// Renders scenes through a raster backend
pub struct SceneRenderer<B: RasterBackend> {
    backend: Arc<B>,
    registry: Arc<TaskRegistry>,
    settings: RendererSettings,
}

impl<B: RasterBackend> SceneRenderer<B> {
    /// Create a renderer with default device settings
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, RendererSettings::default())
    }

    pub fn with_settings(backend: B, settings: RendererSettings) -> Self {
        let capabilities = backend.capabilities();
        info!(
            backend = backend.name(),
            memory_limit_bytes = settings.memory_limit_bytes(),
            formats = ?capabilities.formats(),
            "Created scene renderer"
        );

        Self {
            backend: Arc::new(backend),
            registry: Arc::new(TaskRegistry::new()),
            settings,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn budget(&self) -> MemoryBudget {
        MemoryBudget::from_settings(&self.settings)
    }

    /// Would `config` pass the pre-flight memory guard?
    pub fn can_render(&self, config: &RenderConfig) -> bool {
        self.budget().fits(config)
    }

    /// Lower the quality of `config` until it passes the memory guard
    pub fn downgrade_to_fit(&self, config: &RenderConfig) -> Option<RenderConfig> {
        self.budget().downgrade(config)
    }

    /// Number of prepared or running tasks
    pub fn active_tasks(&self) -> usize {
        self.registry.active_count()
    }

    pub fn active_task_ids(&self) -> Vec<TaskId> {
        self.registry.active_ids()
    }

    /// Request cancellation of one task
    pub fn cancel(&self, id: TaskId) -> bool {
        let found = self.registry.cancel(id);
        if found {
            info!(task = %id, "Cancellation requested");
        }
        found
    }

    /// Request cancellation of every outstanding task
    pub fn cancel_all(&self) -> usize {
        let count = self.registry.cancel_all();
        if count > 0 {
            info!(tasks = count, "Cancellation requested for all renders");
        }
        count
    }

    /// Snapshot `scene` and set up a render task
    pub fn prepare(&self, scene: &Scene, config: RenderConfig) -> Result<RenderTask<B>, RenderError> {
        self.prepare_task(scene, None, config)
    }

    /// Set up a render of only the named top-level layers
    pub fn prepare_layers(
        &self,
        scene: &Scene,
        ids: &[LayerId],
        config: RenderConfig,
    ) -> Result<RenderTask<B>, RenderError> {
        if let Some(missing) = ids.iter().find(|id| scene.layer(**id).is_none()) {
            return Err(RenderError::InvalidLayer(*missing));
        }
        if ids.is_empty() {
            return Err(RenderError::InvalidScene);
        }
        self.prepare_task(scene, Some(ids.iter().copied().collect()), config)
    }

    fn prepare_task(
        &self,
        scene: &Scene,
        only: Option<HashSet<LayerId>>,
        config: RenderConfig,
    ) -> Result<RenderTask<B>, RenderError> {
        if scene.is_empty() {
            return Err(RenderError::InvalidScene);
        }

        let budget = self.budget();
        if !budget.fits(&config) {
            return Err(RenderError::InsufficientMemory {
                required: config.estimated_memory_bytes(),
                available: budget.limit_bytes(),
            });
        }

        let guard = self.registry.register();
        let progress = ProgressReporter::new();
        progress.enter(RenderPhase::Preparing);

        debug!(
            task = %guard.id(),
            scene = %scene.id(),
            quality = config.quality.name(),
            format = ?config.format,
            "Prepared render task"
        );

        Ok(RenderTask {
            scene: scene.clone(),
            only,
            config,
            backend: Arc::clone(&self.backend),
            progress,
            guard,
        })
    }

    /// Standard-quality PNG of `scene` at the device scale
    pub fn default_config(&self, scene: &Scene) -> RenderConfig {
        RenderConfig::for_scene(scene).with_device_scale(self.settings.device_scale)
    }

    /// Render `scene` with `config`
    pub async fn render(
        &self,
        scene: &Scene,
        config: RenderConfig,
    ) -> Result<RenderResult, RenderError> {
        self.prepare(scene, config)?.run().await
    }

    /// Preview-quality JPEG of the whole scene
    pub async fn render_preview(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
        let config = RenderConfig::preview(scene).with_device_scale(self.settings.device_scale);
        self.render(scene, config).await
    }

    /// High-quality render in `format`
    pub async fn render_high_quality(
        &self,
        scene: &Scene,
        format: OutputFormat,
    ) -> Result<RenderResult, RenderError> {
        let config = RenderConfig::high_quality(scene, format)
            .with_device_scale(self.settings.device_scale);
        self.render(scene, config).await
    }

    /// Render only the named top-level layers, in scene paint order
    pub async fn render_layers(
        &self,
        scene: &Scene,
        ids: &[LayerId],
        config: RenderConfig,
    ) -> Result<RenderResult, RenderError> {
        self.prepare_layers(scene, ids, config)?.run().await
    }
}

/// A prepared render
///
/// Dropping a task without running it releases its registry entry.
pub struct RenderTask<B: RasterBackend> {
    scene: Scene,
    only: Option<HashSet<LayerId>>,
    config: RenderConfig,
    backend: Arc<B>,
    progress: ProgressReporter,
    guard: RegistryGuard,
}

impl<B: RasterBackend> RenderTask<B> {
    pub fn id(&self) -> TaskId {
        self.guard.id()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Progress channel for this task
    pub fn subscribe_progress(&self) -> watch::Receiver<RenderProgress> {
        self.progress.subscribe()
    }

    /// Handle that cancels this task
    pub fn cancellation(&self) -> CancellationFlag {
        self.guard.flag().clone()
    }

    /// Run the task to completion on the blocking pool
    pub async fn run(self) -> Result<RenderResult, RenderError> {
        tokio::task::spawn_blocking(move || self.execute())
            .await
            .map_err(|e| RenderError::RenderingFailed(format!("render task aborted: {e}")))?
    }

    fn execute(self) -> Result<RenderResult, RenderError> {
        let span = span!(
            Level::DEBUG,
            "render_scene",
            task = %self.guard.id(),
            scene = %self.scene.id()
        );
        let _enter = span.enter();

        let result = self.draw();
        match &result {
            Ok(_) => self.progress.enter(RenderPhase::Complete),
            Err(RenderError::Cancelled) => self.progress.enter(RenderPhase::Cancelled),
            Err(e) => {
                warn!(error = %e, "Render failed");
                self.progress.enter(RenderPhase::Failed);
            }
        }
        result
    }

    fn is_cancelled(&self) -> bool {
        self.guard.flag().is_cancelled()
    }

    /// Layers to draw, in paint order
    fn layers(&self) -> Vec<&AnyLayer> {
        self.scene
            .render_order()
            .into_iter()
            .filter(|l| self.only.as_ref().is_none_or(|ids| ids.contains(&l.id())))
            .collect()
    }

    fn draw(&self) -> Result<RenderResult, RenderError> {
        let start = Instant::now();
        let config = &self.config;

        let negotiation = self
            .backend
            .capabilities()
            .negotiate(config.format)
            .ok_or(BackendError::UnsupportedFormat(config.format))?;
        if negotiation.is_fallback() {
            warn!(
                backend = self.backend.name(),
                requested = ?negotiation.requested,
                delivered = ?negotiation.delivered,
                "Output format not supported by backend, falling back"
            );
        }

        self.progress.enter(RenderPhase::Context);
        let (width, height) = config.output_pixel_size();
        let mut surface = self.backend.create_surface(
            width,
            height,
            config.render_scale(),
            config.background_color,
        )?;
        let clip = Rect::from_origin_size(Point::ZERO, config.size);

        let layers = self.layers();
        let mut stats = RenderStatistics {
            total_layers: layers.len(),
            memory_bytes: config.estimated_memory_bytes(),
            output_size: (width, height),
            ..Default::default()
        };

        self.progress.enter(RenderPhase::Rendering);
        for (index, layer) in layers.iter().enumerate() {
            if self.is_cancelled() {
                info!(rendered = index, total = layers.len(), "Render cancelled");
                return Err(RenderError::Cancelled);
            }

            if layer.is_visible() {
                let layer_start = Instant::now();
                match layer.render(&mut surface, clip) {
                    Ok(()) => {
                        stats.visible_layers += 1;
                        stats.filters_applied += layer.filters().len();
                        debug!(
                            layer = %layer.id(),
                            kind = ?layer.kind(),
                            duration_ms = layer_start.elapsed().as_secs_f64() * 1000.0,
                            "Layer rendered"
                        );
                    }
                    Err(e) => {
                        warn!(
                            layer = %layer.id(),
                            name = layer.name(),
                            error = %e,
                            "Layer failed to render, skipping"
                        );
                        stats.skipped_layers += 1;
                    }
                }
            } else {
                stats.skipped_layers += 1;
            }

            self.progress.layer_done(index + 1, layers.len());
        }

        if self.is_cancelled() {
            info!("Render cancelled before encoding");
            return Err(RenderError::Cancelled);
        }

        self.progress.enter(RenderPhase::Encoding);
        let quality = config.quality.compression_quality();
        let data = surface
            .encode(negotiation.delivered, quality)
            .map_err(|e| {
                warn!(error = %e, format = ?negotiation.delivered, "Encoding failed");
                RenderError::ImageConversionFailed
            })?;
        if data.is_empty() {
            return Err(RenderError::ImageConversionFailed);
        }

        self.progress.enter(RenderPhase::Finalizing);
        let frame = surface.snapshot();
        let elapsed = start.elapsed();

        info!(
            total = stats.total_layers,
            visible = stats.visible_layers,
            skipped = stats.skipped_layers,
            width,
            height,
            bytes = data.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Render complete"
        );

        Ok(RenderResult {
            frame,
            encoded: EncodedImage {
                negotiation,
                quality,
                data,
            },
            statistics: stats,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::EncoderCapabilities;
    use crate::config::QualityLevel;
    use crate::recording::{DrawCommand, RecordingBackend};
    use std::time::Duration;
    use strata_core::{
        Color, GeometryLayer, ImageLayer, LayerFilter, LayerTransform, ShapeKind, Size,
    };

    fn rect(color: Color, x: f64, y: f64) -> GeometryLayer {
        GeometryLayer::new(
            "rect",
            ShapeKind::Rectangle,
            LayerTransform::new(Point::new(x, y), Size::new(100.0, 100.0)),
        )
        .with_fill(color)
    }

    fn three_layer_scene() -> Scene {
        let mut scene = Scene::new("three", Size::new(400.0, 500.0));
        scene.add_layer(rect(Color::rgb(255, 0, 0), 0.0, 0.0)).unwrap();
        let hidden = scene.add_layer(rect(Color::rgb(0, 255, 0), 50.0, 50.0)).unwrap();
        scene.add_layer(rect(Color::rgb(0, 0, 255), 100.0, 100.0)).unwrap();
        scene.set_layer_visibility(hidden, false).unwrap();
        scene
    }

    fn fills(backend: &RecordingBackend) -> Vec<Color> {
        backend
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Fill { color, .. } => Some(color),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_statistics_count_hidden_layers() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let scene = three_layer_scene();

        let result = renderer
            .render(&scene, RenderConfig::for_scene(&scene))
            .await
            .unwrap();

        assert_eq!(result.statistics.total_layers, 3);
        assert_eq!(result.statistics.visible_layers, 2);
        assert_eq!(result.statistics.skipped_layers, 1);
        assert_eq!(result.statistics.output_size, (400, 500));
        assert_eq!(result.statistics.memory_bytes, 400 * 500 * 4);
        assert_eq!(result.frame.width, 400);
        assert!(!result.encoded.is_empty());
        assert_eq!(renderer.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_empty_scene_is_invalid() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let scene = Scene::new("empty", Size::new(10.0, 10.0));

        let result = renderer.render(&scene, RenderConfig::for_scene(&scene)).await;
        assert!(matches!(result, Err(RenderError::InvalidScene)));
    }

    #[tokio::test]
    async fn test_cancel_before_render() {
        let backend = RecordingBackend::new();
        let renderer = SceneRenderer::new(backend.clone());
        let scene = three_layer_scene();

        let task = renderer.prepare(&scene, RenderConfig::for_scene(&scene)).unwrap();
        let progress = task.subscribe_progress();
        assert_eq!(renderer.active_tasks(), 1);
        assert_eq!(renderer.cancel_all(), 1);

        let result = task.run().await;
        assert!(matches!(result, Err(RenderError::Cancelled)));
        assert!(fills(&backend).is_empty());
        assert_eq!(progress.borrow().phase, RenderPhase::Cancelled);
        assert_eq!(renderer.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let backend = RecordingBackend::new().with_draw_delay(Duration::from_millis(20));
        let renderer = SceneRenderer::new(backend.clone());
        let mut scene = Scene::new("slow", Size::new(200.0, 200.0));
        for i in 0..50 {
            scene.add_layer(rect(Color::BLACK, i as f64, 0.0)).unwrap();
        }

        let task = renderer.prepare(&scene, RenderConfig::for_scene(&scene)).unwrap();
        let id = task.id();
        let handle = tokio::spawn(task.run());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(renderer.cancel(id));

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(RenderError::Cancelled)));
        assert!(fills(&backend).len() < 50);
        assert!(!renderer.cancel(id));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let scene = three_layer_scene();

        let task = renderer.prepare(&scene, RenderConfig::for_scene(&scene)).unwrap();
        let mut rx = task.subscribe_progress();
        let collector = tokio::spawn(async move {
            let mut seen = vec![*rx.borrow_and_update()];
            while rx.changed().await.is_ok() {
                let p = *rx.borrow_and_update();
                seen.push(p);
                if p.phase.is_terminal() {
                    break;
                }
            }
            seen
        });

        task.run().await.unwrap();
        let seen = collector.await.unwrap();

        assert!(seen.windows(2).all(|w| w[0].fraction <= w[1].fraction));
        let last = seen.last().unwrap();
        assert_eq!(last.phase, RenderPhase::Complete);
        assert_eq!(last.fraction, 1.0);
    }

    #[tokio::test]
    async fn test_heic_falls_back_to_jpeg() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let scene = three_layer_scene();

        let result = renderer
            .render_high_quality(&scene, OutputFormat::Heic)
            .await
            .unwrap();

        assert_eq!(result.encoded.requested_format(), OutputFormat::Heic);
        assert_eq!(result.encoded.format(), OutputFormat::Jpeg);
        assert!(result.encoded.is_fallback());
        assert!(result.encoded.data.starts_with(b"jpg:800x1000"));
    }

    #[tokio::test]
    async fn test_unsupported_format_fails() {
        let backend =
            RecordingBackend::new().with_capabilities(EncoderCapabilities::new([OutputFormat::Jpeg]));
        let renderer = SceneRenderer::new(backend);
        let scene = three_layer_scene();

        let result = renderer.render(&scene, RenderConfig::for_scene(&scene)).await;
        assert!(matches!(result, Err(RenderError::RenderingFailed(_))));
    }

    #[tokio::test]
    async fn test_corrupt_image_is_skipped() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let mut scene = Scene::new("photo", Size::new(100.0, 100.0));
        scene
            .add_layer(
                ImageLayer::new(
                    "broken",
                    LayerTransform::new(Point::ZERO, Size::new(100.0, 100.0)),
                )
                .with_image(vec![0u8, 1, 2, 3], Size::new(10.0, 10.0)),
            )
            .unwrap();
        scene.add_layer(rect(Color::WHITE, 0.0, 0.0)).unwrap();

        let result = renderer
            .render(&scene, RenderConfig::for_scene(&scene))
            .await
            .unwrap();
        assert_eq!(result.statistics.visible_layers, 1);
        assert_eq!(result.statistics.skipped_layers, 1);
    }

    #[tokio::test]
    async fn test_layers_drawn_in_z_order() {
        let backend = RecordingBackend::new();
        let renderer = SceneRenderer::new(backend.clone());
        let mut scene = Scene::new("z", Size::new(400.0, 500.0));

        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        let top = scene.add_layer(rect(red, 0.0, 0.0)).unwrap();
        scene.add_layer(rect(blue, 0.0, 0.0)).unwrap();
        scene.set_layer_z_order(top, 1).unwrap();

        renderer
            .render(&scene, RenderConfig::for_scene(&scene))
            .await
            .unwrap();
        assert_eq!(fills(&backend), vec![blue, red]);
    }

    #[tokio::test]
    async fn test_filter_count() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let mut scene = Scene::new("f", Size::new(100.0, 100.0));
        let id = scene.add_layer(rect(Color::BLACK, 0.0, 0.0)).unwrap();
        scene
            .set_layer_filters(id, vec![LayerFilter::Warm, LayerFilter::sepia(0.5)])
            .unwrap();

        let result = renderer
            .render(&scene, RenderConfig::for_scene(&scene))
            .await
            .unwrap();
        assert_eq!(result.statistics.filters_applied, 2);
    }

    #[tokio::test]
    async fn test_render_layers_subset() {
        let backend = RecordingBackend::new();
        let renderer = SceneRenderer::new(backend.clone());
        let mut scene = Scene::new("subset", Size::new(100.0, 100.0));
        scene.add_layer(rect(Color::BLACK, 0.0, 0.0)).unwrap();
        let white = scene.add_layer(rect(Color::WHITE, 0.0, 0.0)).unwrap();

        let result = renderer
            .render_layers(&scene, &[white], RenderConfig::for_scene(&scene))
            .await
            .unwrap();
        assert_eq!(result.statistics.total_layers, 1);
        assert_eq!(fills(&backend), vec![Color::WHITE]);

        let missing = LayerId::new();
        let result = renderer
            .render_layers(&scene, &[missing], RenderConfig::for_scene(&scene))
            .await;
        assert!(matches!(result, Err(RenderError::InvalidLayer(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_memory_guard() {
        let settings = RendererSettings::default().with_device_memory_bytes(1_000_000);
        let renderer = SceneRenderer::with_settings(RecordingBackend::new(), settings);
        let scene = three_layer_scene();

        let config = RenderConfig::for_scene(&scene).with_quality(QualityLevel::Print);
        assert!(!renderer.can_render(&config));
        let result = renderer.render(&scene, config.clone()).await;
        assert!(matches!(result, Err(RenderError::InsufficientMemory { .. })));

        // 400x500 at preview is 200x250x4 = 200 000 bytes, under the 250 000 limit
        let fitted = renderer.downgrade_to_fit(&config).unwrap();
        assert_eq!(fitted.quality, QualityLevel::Preview);
        assert!(renderer.render(&scene, fitted).await.is_ok());
    }

    #[tokio::test]
    async fn test_device_scale_setting() {
        let settings = RendererSettings::default().with_device_scale(2.0);
        let renderer = SceneRenderer::with_settings(RecordingBackend::new(), settings);
        let scene = three_layer_scene();

        assert_eq!(renderer.default_config(&scene).output_pixel_size(), (800, 1000));
        let preview = renderer.render_preview(&scene).await.unwrap();
        assert_eq!(preview.statistics.output_size, (400, 500));
    }

    #[tokio::test]
    async fn test_snapshot_isolated_from_edits() {
        let backend = RecordingBackend::new();
        let renderer = SceneRenderer::new(backend.clone());
        let mut scene = Scene::new("snap", Size::new(100.0, 100.0));
        let id = scene.add_layer(rect(Color::BLACK, 0.0, 0.0)).unwrap();

        let task = renderer.prepare(&scene, RenderConfig::for_scene(&scene)).unwrap();
        scene.set_layer_visibility(id, false).unwrap();

        let result = task.run().await.unwrap();
        assert_eq!(result.statistics.visible_layers, 1);
    }

    #[tokio::test]
    async fn test_concurrent_renders() {
        let renderer = SceneRenderer::new(RecordingBackend::new());
        let scene = three_layer_scene();

        let (a, b) = tokio::join!(
            renderer.render_preview(&scene),
            renderer.render(&scene, RenderConfig::for_scene(&scene)),
        );
        assert_eq!(a.unwrap().statistics.output_size, (200, 250));
        assert_eq!(b.unwrap().statistics.output_size, (400, 500));
        assert_eq!(renderer.active_tasks(), 0);
    }
}
