//! Filter kernels
//!
//! Kernels operate in place on a premultiplied RGBA pixmap. Color kernels
//! un-premultiply each pixel, work on straight channels in [0, 1] and
//! re-premultiply; blur and shadow work on the premultiplied data directly.
//! Every pass runs over rows or pixels in parallel with rayon.

use rayon::prelude::*;
use strata_core::{Color, LayerFilter, Vec2};
use tiny_skia::{Pixmap, PixmapPaint, Transform};
use tracing::debug;

/// Rec. 709 luma weights
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Apply `filters` in order; `px_per_unit` converts scene units to pixels
pub fn apply_filters(pixmap: &mut Pixmap, filters: &[LayerFilter], px_per_unit: f64) {
    for filter in filters.iter().filter(|f| !f.is_identity()) {
        debug!(filter = filter.name(), "Applying filter");
        apply_filter(pixmap, filter, px_per_unit);
    }
}

pub fn apply_filter(pixmap: &mut Pixmap, filter: &LayerFilter, px_per_unit: f64) {
    match *filter {
        LayerFilter::None => {}
        LayerFilter::Brightness { amount } => {
            let amount = amount as f32;
            map_rgb(pixmap, |c| c.map(|v| v + amount));
        }
        LayerFilter::Contrast { amount } => {
            let amount = amount as f32;
            map_rgb(pixmap, |c| contrast(c, amount));
        }
        LayerFilter::Saturation { amount } => {
            let amount = amount as f32;
            map_rgb(pixmap, |c| saturate(c, amount));
        }
        LayerFilter::Sepia { intensity } => {
            let intensity = intensity as f32;
            map_rgb(pixmap, |c| sepia(c, intensity));
        }
        LayerFilter::BlackAndWhite => map_rgb(pixmap, |c| [luma(c); 3]),
        LayerFilter::Vintage => {
            map_rgb(pixmap, |c| saturate(contrast(sepia(c, 0.4), 0.9), 0.85));
        }
        LayerFilter::Warm => map_rgb(pixmap, |[r, g, b]| [r * 1.1, g, b * 0.9]),
        LayerFilter::Cool => map_rgb(pixmap, |[r, g, b]| [r * 0.9, g, b * 1.1]),
        LayerFilter::Blur { radius } => box_blur(pixmap, radius * px_per_unit),
        LayerFilter::Shadow {
            offset,
            blur,
            color,
        } => drop_shadow(pixmap, offset * px_per_unit, blur * px_per_unit, color),
    }
}

fn luma([r, g, b]: [f32; 3]) -> f32 {
    r * LUMA[0] + g * LUMA[1] + b * LUMA[2]
}

fn contrast(c: [f32; 3], amount: f32) -> [f32; 3] {
    c.map(|v| (v - 0.5) * amount + 0.5)
}

fn saturate(c: [f32; 3], amount: f32) -> [f32; 3] {
    let l = luma(c);
    c.map(|v| l + (v - l) * amount)
}

fn sepia(c: [f32; 3], intensity: f32) -> [f32; 3] {
    let [r, g, b] = c;
    let toned = SEPIA.map(|row| row[0] * r + row[1] * g + row[2] * b);
    [0, 1, 2].map(|i| c[i] + (toned[i] - c[i]) * intensity)
}

/// Run a straight-alpha color kernel over every non-transparent pixel
fn map_rgb<F>(pixmap: &mut Pixmap, kernel: F)
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    pixmap.data_mut().par_chunks_exact_mut(4).for_each(|px| {
        let a = px[3];
        if a == 0 {
            return;
        }
        let alpha = a as f32 / 255.0;
        let straight = [0, 1, 2].map(|i| px[i] as f32 / 255.0 / alpha);
        let out = kernel(straight);
        for i in 0..3 {
            px[i] = (out[i].clamp(0.0, 1.0) * alpha * 255.0).round() as u8;
        }
    });
}

/// Three-pass box blur approximating a gaussian of `radius` pixels
///
/// Windows are truncated at the pixmap edges and averaged over the samples
/// they cover.
pub fn box_blur(pixmap: &mut Pixmap, radius: f64) {
    let box_radius = (radius / 3.0).round() as usize;
    if box_radius == 0 {
        return;
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let data = pixmap.data_mut();
    let mut scratch = vec![0u8; data.len()];

    for _ in 0..3 {
        blur_rows(data, &mut scratch, width, box_radius);
        blur_columns(&scratch, data, width, height, box_radius);
    }
}

fn blur_rows(src: &[u8], dst: &mut [u8], width: usize, radius: usize) {
    let stride = width * 4;
    dst.par_chunks_exact_mut(stride)
        .zip(src.par_chunks_exact(stride))
        .for_each(|(out, row)| {
            for x in 0..width {
                let lo = x.saturating_sub(radius);
                let hi = (x + radius).min(width - 1);
                let mut sum = [0u32; 4];
                for sx in lo..=hi {
                    for c in 0..4 {
                        sum[c] += row[sx * 4 + c] as u32;
                    }
                }
                let n = (hi - lo + 1) as u32;
                for c in 0..4 {
                    out[x * 4 + c] = (sum[c] / n) as u8;
                }
            }
        });
}

fn blur_columns(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    let stride = width * 4;
    dst.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, out)| {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            let n = (hi - lo + 1) as u32;
            for x in 0..width {
                let mut sum = [0u32; 4];
                for sy in lo..=hi {
                    let base = sy * stride + x * 4;
                    for c in 0..4 {
                        sum[c] += src[base + c] as u32;
                    }
                }
                for c in 0..4 {
                    out[x * 4 + c] = (sum[c] / n) as u8;
                }
            }
        });
}

/// Paint a blurred, offset, tinted copy of the alpha beneath the content
pub fn drop_shadow(pixmap: &mut Pixmap, offset: Vec2, blur: f64, color: Color) {
    let Some(mut shadow) = Pixmap::new(pixmap.width(), pixmap.height()) else {
        return;
    };

    let tint = [color.r, color.g, color.b].map(|c| c as f32 / 255.0);
    let tint_alpha = color.a as f32 / 255.0;
    shadow
        .data_mut()
        .par_chunks_exact_mut(4)
        .zip(pixmap.data().par_chunks_exact(4))
        .for_each(|(out, src)| {
            let a = src[3] as f32 / 255.0 * tint_alpha;
            for i in 0..3 {
                out[i] = (tint[i] * a * 255.0).round() as u8;
            }
            out[3] = (a * 255.0).round() as u8;
        });
    box_blur(&mut shadow, blur);

    let Some(mut composed) = Pixmap::new(pixmap.width(), pixmap.height()) else {
        return;
    };
    let paint = PixmapPaint::default();
    composed.draw_pixmap(
        offset.x.round() as i32,
        offset.y.round() as i32,
        shadow.as_ref(),
        &paint,
        Transform::identity(),
        None,
    );
    composed.draw_pixmap(0, 0, pixmap.as_ref(), &paint, Transform::identity(), None);
    *pixmap = composed;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        pixmap
    }

    fn rgba(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let px = pixmap.pixel(x, y).unwrap();
        [px.red(), px.green(), px.blue(), px.alpha()]
    }

    #[test]
    fn test_black_and_white_equal_channels() {
        let mut pixmap = solid(4, 4, [200, 40, 90, 255]);
        apply_filter(&mut pixmap, &LayerFilter::BlackAndWhite, 1.0);

        let [r, g, b, a] = rgba(&pixmap, 1, 1);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_brightness() {
        let mut pixmap = solid(2, 2, [100, 100, 100, 255]);
        apply_filter(&mut pixmap, &LayerFilter::brightness(0.2), 1.0);
        assert_eq!(rgba(&pixmap, 0, 0), [151, 151, 151, 255]);

        let mut white = solid(2, 2, [255, 255, 255, 255]);
        apply_filter(&mut white, &LayerFilter::brightness(0.5), 1.0);
        assert_eq!(rgba(&white, 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_contrast_keeps_mid_grey() {
        let mut pixmap = solid(2, 2, [128, 128, 128, 255]);
        apply_filter(&mut pixmap, &LayerFilter::contrast(2.0), 1.0);
        let [r, ..] = rgba(&pixmap, 0, 0);
        assert!((r as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_zero_saturation_is_grey() {
        let mut pixmap = solid(2, 2, [255, 0, 0, 255]);
        apply_filter(&mut pixmap, &LayerFilter::saturation(0.0), 1.0);
        let [r, g, b, _] = rgba(&pixmap, 0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_warm_and_cool() {
        let mut warm = solid(1, 1, [100, 100, 100, 255]);
        apply_filter(&mut warm, &LayerFilter::Warm, 1.0);
        let [r, _, b, _] = rgba(&warm, 0, 0);
        assert!(r > 100 && b < 100);

        let mut cool = solid(1, 1, [100, 100, 100, 255]);
        apply_filter(&mut cool, &LayerFilter::Cool, 1.0);
        let [r, _, b, _] = rgba(&cool, 0, 0);
        assert!(r < 100 && b > 100);
    }

    #[test]
    fn test_sepia_full_intensity() {
        let mut pixmap = solid(1, 1, [100, 100, 100, 255]);
        apply_filter(&mut pixmap, &LayerFilter::sepia(1.0), 1.0);
        let [r, g, b, _] = rgba(&pixmap, 0, 0);
        assert!(r > g && g > b);
    }

    #[test]
    fn test_transparent_pixels_untouched() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        apply_filter(&mut pixmap, &LayerFilter::brightness(1.0), 1.0);
        assert_eq!(rgba(&pixmap, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_blur_spreads_edge() {
        let mut pixmap = Pixmap::new(20, 1).unwrap();
        for x in 10..20 {
            let i = x * 4;
            pixmap.data_mut()[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
        }

        apply_filter(&mut pixmap, &LayerFilter::blur(6.0), 1.0);
        let [.., left] = rgba(&pixmap, 9, 0);
        let [.., right] = rgba(&pixmap, 10, 0);
        assert!(left > 0 && left < 255);
        assert!(right > 0 && right < 255);
        assert_eq!(rgba(&pixmap, 0, 0)[3], 0);
    }

    #[test]
    fn test_blur_scales_with_px_per_unit() {
        let mut pixmap = Pixmap::new(20, 1).unwrap();
        pixmap.data_mut()[40..44].copy_from_slice(&[255, 255, 255, 255]);

        // 1 unit at 1 px/unit rounds to a zero box radius
        let before = pixmap.clone();
        apply_filter(&mut pixmap, &LayerFilter::blur(1.0), 1.0);
        assert_eq!(pixmap.data(), before.data());

        apply_filter(&mut pixmap, &LayerFilter::blur(1.0), 3.0);
        assert!(rgba(&pixmap, 9, 0)[3] > 0);
    }

    #[test]
    fn test_shadow_beneath_content() {
        let mut pixmap = Pixmap::new(10, 10).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let i = (y * 10 + x) * 4;
                pixmap.data_mut()[i..i + 4].copy_from_slice(&[255, 0, 0, 255]);
            }
        }

        let shadow = LayerFilter::shadow(Vec2::new(5.0, 5.0), 0.0, Color::BLACK);
        apply_filter(&mut pixmap, &shadow, 1.0);

        assert_eq!(rgba(&pixmap, 1, 1), [255, 0, 0, 255]);
        assert_eq!(rgba(&pixmap, 6, 6), [0, 0, 0, 255]);
        assert_eq!(rgba(&pixmap, 9, 0)[3], 0);
    }
}
