//! Render command

use super::{render_scene, write_output};
use crate::RenderArgs;
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::Codec;
use strata_pipeline::OutputFormat;
use tracing::info;

pub async fn run(
    input: &Path,
    output: Option<&Path>,
    args: &RenderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Rendering scene from {}", input.display());

    let bytes = fs::read(input)?;
    let scene = Codec::Json.decode_scene(&bytes)?;

    info!(
        "Loaded scene '{}' with {} layers",
        scene.name(),
        scene.layer_count()
    );

    let result = render_scene(&scene, args).await?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output(input, result.encoded.format()),
    };
    write_output(&result, &path)
}

/// `scene.json` becomes `scene.png` (or whichever format was delivered)
fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}
