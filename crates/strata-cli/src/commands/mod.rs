//! CLI commands

pub mod caps;
pub mod demo;
pub mod inspect;
pub mod render;

use crate::{FormatArg, QualityArg, RenderArgs};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strata_backend_raster::SkiaBackend;
use strata_core::Scene;
use strata_pipeline::{
    OutputFormat, QualityLevel, RenderConfig, RenderPhase, RenderResult, RendererSettings,
    SceneRenderer,
};
use tracing::{debug, info, warn};

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Heic => OutputFormat::Heic,
        }
    }
}

impl From<QualityArg> for QualityLevel {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Preview => QualityLevel::Preview,
            QualityArg::Standard => QualityLevel::Standard,
            QualityArg::High => QualityLevel::High,
            QualityArg::Print => QualityLevel::Print,
        }
    }
}

/// `--font FAMILY=PATH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontArg {
    pub family: String,
    pub path: PathBuf,
}

impl FromStr for FontArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FAMILY=PATH, got '{s}'"))?;
        let family = family.trim();
        if family.is_empty() || path.is_empty() {
            return Err(format!("expected FAMILY=PATH, got '{s}'"));
        }
        Ok(Self {
            family: family.to_string(),
            path: PathBuf::from(path),
        })
    }
}

impl fmt::Display for FontArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.family, self.path.display())
    }
}

/// Raster backend with the requested fonts loaded
pub fn build_backend(fonts: &[FontArg]) -> Result<SkiaBackend, Box<dyn std::error::Error>> {
    let mut builder = SkiaBackend::builder();
    for font in fonts {
        let bytes = fs::read(&font.path)?;
        builder = builder.font(font.family.as_str(), &bytes)?;
        info!("Loaded font '{}' from {}", font.family, font.path.display());
    }
    Ok(builder.build())
}

/// Renderer settings derived from the command line
pub fn settings(args: &RenderArgs) -> RendererSettings {
    let mut settings = RendererSettings::default().with_device_scale(args.device_scale);
    if let Some(mb) = args.device_memory_mb {
        settings = settings.with_device_memory_bytes(mb.saturating_mul(1024 * 1024));
    }
    settings
}

/// Render configuration for `scene`, downgraded when asked to and required
pub fn config_for(
    renderer: &SceneRenderer<SkiaBackend>,
    scene: &Scene,
    args: &RenderArgs,
) -> RenderConfig {
    let config = renderer
        .default_config(scene)
        .with_quality(args.quality.into())
        .with_format(args.format.into());

    if !args.downgrade || renderer.can_render(&config) {
        return config;
    }

    match renderer.downgrade_to_fit(&config) {
        Some(lowered) => {
            warn!(
                "Quality lowered from {} to {} to fit the memory budget",
                config.quality.name(),
                lowered.quality.name()
            );
            lowered
        }
        None => config,
    }
}

/// Render `scene`, logging progress, and cancel on Ctrl-C
pub async fn render_scene(
    scene: &Scene,
    args: &RenderArgs,
) -> Result<RenderResult, Box<dyn std::error::Error>> {
    let renderer = SceneRenderer::with_settings(build_backend(&args.fonts)?, settings(args));
    let config = config_for(&renderer, scene, args);
    let (width, height) = config.output_pixel_size();
    info!(
        "Rendering '{}' at {}x{} ({}, {})",
        scene.name(),
        width,
        height,
        config.quality.name(),
        config.format.extension()
    );

    let task = renderer.prepare(scene, config)?;

    let mut progress = task.subscribe_progress();
    let watcher = tokio::spawn(async move {
        let mut last = RenderPhase::Idle;
        while progress.changed().await.is_ok() {
            let current = *progress.borrow();
            if current.phase != last {
                debug!(
                    "Render phase {:?} ({:.0}%)",
                    current.phase,
                    current.fraction * 100.0
                );
                last = current.phase;
            }
            if current.phase.is_terminal() {
                break;
            }
        }
    });

    let cancel = task.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling render");
            cancel.cancel();
        }
    });

    let result = task.run().await;
    interrupt.abort();
    let _ = watcher.await;
    let result = result?;

    if result.encoded.is_fallback() {
        warn!(
            "{} encoding is unavailable, wrote {} instead",
            result.encoded.requested_format().extension(),
            result.encoded.format().extension()
        );
    }

    Ok(result)
}

/// Write the encoded image and print a summary
pub fn write_output(result: &RenderResult, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let delivered = result.encoded.format().extension();
    let matches_format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extension_matches(ext, delivered));
    if !matches_format {
        warn!("{} holds {} data", path.display(), delivered);
    }

    fs::write(path, &result.encoded.data)?;

    let stats = &result.statistics;
    println!(
        "Wrote {} ({}x{}, {} bytes) in {:.1?}",
        path.display(),
        stats.output_size.0,
        stats.output_size.1,
        result.encoded.len(),
        result.elapsed
    );
    println!(
        "  layers: {} drawn, {} skipped, {} filters",
        stats.visible_layers,
        stats.skipped_layers,
        stats.filters_applied
    );
    Ok(())
}

fn extension_matches(ext: &str, delivered: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    ext == delivered || (delivered == "jpg" && ext == "jpeg")
}
