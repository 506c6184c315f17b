//! Demo command

use super::{render_scene, write_output};
use crate::RenderArgs;
use std::fs;
use std::path::Path;
use strata_core::{
    Alignment, AnyLayer, Codec, Color, GeometryLayer, GroupLayer, LayerFilter, LayerTransform,
    Point, Scene, SceneError, ShapeKind, Size, TextAlignment, TextLayer, TextStyle, Vec2,
};
use tracing::info;

pub async fn run(
    output: &Path,
    save_scene: Option<&Path>,
    args: &RenderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = create_demo_scene()?;
    info!(
        "Built demo scene '{}' with {} layers",
        scene.name(),
        scene.layer_count()
    );

    if let Some(path) = save_scene {
        fs::write(path, Codec::JsonPretty.encode_scene(&scene)?)?;
        println!("Scene document written to {}", path.display());
    }

    if args.fonts.is_empty() {
        info!("No fonts registered, text layers will be blank (pass --font FAMILY=PATH)");
    }

    let result = render_scene(&scene, args).await?;
    write_output(&result, output)
}

/// A 600x400 postcard exercising every layer kind and most filters
pub fn create_demo_scene() -> Result<Scene, SceneError> {
    let mut scene = Scene::new("Postcard", Size::new(600.0, 400.0))
        .with_background_color(Color::rgb(245, 240, 230));
    scene.set_metadata("generator", "strata demo");

    let backdrop = GeometryLayer::new(
        "Backdrop",
        ShapeKind::Rectangle,
        LayerTransform::new(Point::new(300.0, 200.0), Size::new(560.0, 360.0)),
    )
    .with_fill(Color::rgb(70, 130, 180))
    .with_corner_radius(24.0);
    let backdrop = scene.add_layer(backdrop)?;
    scene.set_layer_filters(backdrop, vec![LayerFilter::Warm])?;

    let sun = GeometryLayer::new(
        "Sun",
        ShapeKind::Star { points: 8 },
        LayerTransform::new(Point::new(470.0, 110.0), Size::new(120.0, 120.0))
            .with_rotation(0.2),
    )
    .with_fill(Color::rgb(255, 200, 60))
    .with_stroke(Color::rgb(230, 120, 30), 3.0);
    let sun = scene.add_layer(sun)?;
    scene.set_layer_filters(
        sun,
        vec![LayerFilter::Shadow {
            offset: Vec2::new(6.0, 6.0),
            blur: 8.0,
            color: Color::rgba(0, 0, 0, 110),
        }],
    )?;

    let hills: Vec<AnyLayer> = [(140.0, 330.0, 320.0), (380.0, 350.0, 420.0)]
        .into_iter()
        .enumerate()
        .map(|(i, (x, y, w))| {
            GeometryLayer::new(
                format!("Hill {}", i + 1),
                ShapeKind::Ellipse,
                LayerTransform::new(Point::new(x, y), Size::new(w, 140.0)),
            )
            .with_fill(Color::rgb(60, 140 + 30 * i as u8, 80))
            .into()
        })
        .collect();
    let hills = scene.add_layer(GroupLayer::wrapping("Hills", hills).with_clip_to_bounds(true))?;
    scene.set_layer_filters(hills, vec![LayerFilter::Blur { radius: 2.0 }])?;

    let title = TextLayer::new(
        "Title",
        "Greetings from Strata",
        LayerTransform::new(Point::new(220.0, 70.0), Size::new(360.0, 60.0)),
    )
    .with_style(
        TextStyle::default()
            .with_font("sans-serif", 36.0)
            .with_color(Color::WHITE)
            .with_alignment(TextAlignment::Center)
            .with_max_lines(Some(1)),
    );
    scene.add_layer(title)?;

    let badges: Vec<_> = [40.0, 90.0, 140.0]
        .into_iter()
        .enumerate()
        .map(|(i, x)| {
            GeometryLayer::new(
                format!("Badge {}", i + 1),
                ShapeKind::Polygon {
                    sides: 5 + i as u32,
                },
                LayerTransform::new(Point::new(x, 160.0 + 25.0 * i as f64), Size::new(36.0, 36.0)),
            )
            .with_fill(Color::rgb(250, 250, 250))
        })
        .collect();
    for badge in badges {
        let id = scene.add_layer(badge)?;
        scene.select(id);
    }
    scene.align_selected(Alignment::Top);
    scene.deselect_all();

    Ok(scene)
}
