//! Inspect command

use std::fs;
use std::path::Path;
use strata_core::{AnyLayer, Codec, Layer, Scene};
use strata_pipeline::{RecordingBackend, RenderConfig, SceneRenderer};
use tracing::info;

pub async fn run(input: &Path, show_commands: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Inspecting scene {}", input.display());

    let bytes = fs::read(input)?;
    let scene = Codec::Json.decode_scene(&bytes)?;

    print!("{}", summarize(&scene));

    let backend = RecordingBackend::new();
    let renderer = SceneRenderer::new(backend.clone());
    let result = renderer
        .render(&scene, RenderConfig::for_scene(&scene))
        .await?;

    println!();
    println!("Dry run statistics:");
    println!("{}", serde_json::to_string_pretty(&result.statistics)?);

    if show_commands {
        println!();
        println!("Draw commands:");
        for command in backend.commands() {
            println!("  {:?}", command);
        }
    }

    Ok(())
}

/// Human-readable outline of a scene
fn summarize(scene: &Scene) -> String {
    let size = scene.size();
    let mut out = String::new();

    let title = format!("Scene: {}", scene.name());
    out.push_str(&format!("{}\n{}\n\n", title, "=".repeat(title.len())));
    out.push_str(&format!("  Size:       {} x {}\n", size.width, size.height));
    out.push_str(&format!("  Background: {}\n", scene.background_color().to_hex()));
    out.push_str(&format!("  Layers:     {}\n", scene.layer_count()));
    out.push_str(&format!(
        "  Modified:   {}\n",
        scene.modified_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (key, value) in scene.metadata() {
        out.push_str(&format!("  {key}: {value}\n"));
    }

    out.push_str("\nRender order (back to front):\n");
    for layer in scene.render_order() {
        describe(layer, 1, &mut out);
    }
    out
}

fn describe(layer: &AnyLayer, depth: usize, out: &mut String) {
    let bounds = layer.bounds();
    let marker = if layer.is_visible() { "●" } else { "○" };
    out.push_str(&format!(
        "{}{} [{:?}] {} z={} at ({:.0}, {:.0}) {:.0}x{:.0}",
        "  ".repeat(depth),
        marker,
        layer.kind(),
        layer.name(),
        layer.z_order(),
        bounds.x0,
        bounds.y0,
        bounds.width(),
        bounds.height()
    ));
    if !layer.filters().is_empty() {
        out.push_str(&format!(" filters={:?}", layer.filters()));
    }
    out.push('\n');

    if let Some(group) = layer.as_group() {
        for child in strata_core::layer::paint_order(group.children()) {
            describe(child, depth + 1, out);
        }
    }
}
