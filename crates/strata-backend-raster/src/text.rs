//! Text layout and glyph rasterization
//!
//! Lines break at explicit newlines and wrap greedily at word boundaries to
//! the layer width. A single word wider than the line is never split.

use fontdue::Font;
use strata_core::{Color, Size, TextAlignment, TextStyle};
use tiny_skia::Pixmap;

/// One laid-out line: glyphs with their pen x positions
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub glyphs: Vec<(char, f32)>,
    pub width: f32,
}

/// Break `text` into positioned lines no wider than `max_width`
///
/// `advance` gives the pen advance of a glyph, letter spacing included.
pub fn layout_lines(
    text: &str,
    style: &TextStyle,
    max_width: f32,
    advance: impl Fn(char) -> f32,
) -> Vec<LineLayout> {
    let space = advance(' ');
    let word_width = |word: &str| word.chars().map(&advance).sum::<f32>();

    // (words, ends paragraph)
    let mut lines: Vec<(Vec<&str>, bool)> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current: Vec<&str> = Vec::new();
        let mut width = 0.0;
        for word in paragraph.split_whitespace() {
            let w = word_width(word);
            if !current.is_empty() && width + space + w > max_width {
                lines.push((std::mem::take(&mut current), false));
                width = 0.0;
            }
            if !current.is_empty() {
                width += space;
            }
            width += w;
            current.push(word);
        }
        lines.push((current, true));
    }

    if let Some(max) = style.max_lines {
        lines.truncate(max as usize);
    }

    lines
        .into_iter()
        .map(|(words, ends_paragraph)| {
            let gaps = words.len().saturating_sub(1);
            let natural: f32 =
                words.iter().map(|w| word_width(w)).sum::<f32>() + space * gaps as f32;
            let slack = (max_width - natural).max(0.0);

            let (start, gap) = match style.alignment {
                TextAlignment::Left => (0.0, space),
                TextAlignment::Center => (slack / 2.0, space),
                TextAlignment::Right => (slack, space),
                TextAlignment::Justify if !ends_paragraph && gaps > 0 => {
                    (0.0, space + slack / gaps as f32)
                }
                TextAlignment::Justify => (0.0, space),
            };

            let mut glyphs = Vec::new();
            let mut x = start;
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    x += gap;
                }
                for ch in word.chars() {
                    glyphs.push((ch, x));
                    x += advance(ch);
                }
            }

            LineLayout {
                glyphs,
                width: x - start,
            }
        })
        .collect()
}

/// Rasterize `text` into a pixmap covering `size` scene units
///
/// Returns `None` when the area is empty.
pub fn rasterize(
    font: &Font,
    text: &str,
    style: &TextStyle,
    size: Size,
    px_per_unit: f32,
) -> Option<Pixmap> {
    let width = (size.width as f32 * px_per_unit).ceil() as u32;
    let height = (size.height as f32 * px_per_unit).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)?;

    let px = style.font_size as f32 * px_per_unit;
    let letter_spacing = style.letter_spacing as f32 * px_per_unit;
    let lines = layout_lines(text, style, width as f32, |ch| {
        font.metrics(ch, px).advance_width + letter_spacing
    });

    let line_height = style.line_advance() as f32 * px_per_unit;
    let ascent = font
        .horizontal_line_metrics(px)
        .map(|m| m.ascent)
        .unwrap_or(px * 0.8);

    for (i, line) in lines.iter().enumerate() {
        let top = i as f32 * line_height;
        if top >= height as f32 {
            break;
        }
        let baseline = top + ascent;

        for &(ch, x) in &line.glyphs {
            let (metrics, coverage) = font.rasterize(ch, px);
            if metrics.width == 0 {
                continue;
            }
            let left = (x + metrics.xmin as f32).round() as i32;
            let glyph_top = (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i32;
            blend_coverage(&mut pixmap, left, glyph_top, metrics.width, &coverage, style.color);
        }
    }

    Some(pixmap)
}

/// Source-over blend an 8-bit coverage mask tinted with `color`
fn blend_coverage(
    pixmap: &mut Pixmap,
    left: i32,
    top: i32,
    mask_width: usize,
    coverage: &[u8],
    color: Color,
) {
    let width = pixmap.width() as i32;
    let height = pixmap.height() as i32;
    let data = pixmap.data_mut();
    let color_alpha = color.a as f32 / 255.0;

    for (row, line) in coverage.chunks_exact(mask_width).enumerate() {
        let y = top + row as i32;
        if y < 0 || y >= height {
            continue;
        }
        for (col, &cov) in line.iter().enumerate() {
            let x = left + col as i32;
            if x < 0 || x >= width || cov == 0 {
                continue;
            }

            let a = cov as f32 / 255.0 * color_alpha;
            let i = (y * width + x) as usize * 4;
            let src = [color.r, color.g, color.b].map(|c| c as f32 * a);
            for c in 0..3 {
                data[i + c] = (src[c] + data[i + c] as f32 * (1.0 - a)).round() as u8;
            }
            data[i + 3] = (a * 255.0 + data[i + 3] as f32 * (1.0 - a)).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Monospace stand-in: every glyph advances 10 units
    fn mono(_: char) -> f32 {
        10.0
    }

    fn text_of(line: &LineLayout) -> String {
        line.glyphs.iter().map(|(ch, _)| ch).collect()
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        let lines = layout_lines("aaa bbb ccc", &TextStyle::default(), 75.0, mono);

        assert_eq!(lines.len(), 2);
        assert_eq!(text_of(&lines[0]), "aaabbb");
        assert_eq!(text_of(&lines[1]), "ccc");
        assert_eq!(lines[0].glyphs[3].1, 40.0);
        assert_eq!(lines[0].width, 70.0);
    }

    #[test]
    fn test_explicit_newlines() {
        let lines = layout_lines("one\n\ntwo", &TextStyle::default(), 1000.0, mono);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].glyphs.is_empty());
    }

    #[test]
    fn test_long_word_not_split() {
        let lines = layout_lines("abcdefghij", &TextStyle::default(), 30.0, mono);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 100.0);
    }

    #[test]
    fn test_alignment() {
        let center = TextStyle::default().with_alignment(TextAlignment::Center);
        let lines = layout_lines("ab", &center, 100.0, mono);
        assert_eq!(lines[0].glyphs[0].1, 40.0);

        let right = TextStyle::default().with_alignment(TextAlignment::Right);
        let lines = layout_lines("ab", &right, 100.0, mono);
        assert_eq!(lines[0].glyphs[0].1, 80.0);
    }

    #[test]
    fn test_justify_stretches_all_but_last_line() {
        let style = TextStyle::default().with_alignment(TextAlignment::Justify);
        let lines = layout_lines("aa bb cc dd", &style, 75.0, mono);

        assert_eq!(lines.len(), 2);
        // "aa bb" is 50 wide; 25 of slack goes into its only gap
        assert_eq!(lines[0].glyphs[2].1, 55.0);
        assert_eq!(lines[0].width, 75.0);
        assert_eq!(lines[1].glyphs[2].1, 30.0);
    }

    #[test]
    fn test_max_lines() {
        let style = TextStyle::default().with_max_lines(Some(2));
        let lines = layout_lines("a\nb\nc\nd", &style, 100.0, mono);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_blend_coverage() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        let coverage = [255, 128, 0, 255];
        blend_coverage(&mut pixmap, 1, 1, 2, &coverage, Color::rgb(255, 0, 0));

        let full = pixmap.pixel(1, 1).unwrap();
        assert_eq!((full.red(), full.alpha()), (255, 255));
        let half = pixmap.pixel(2, 1).unwrap();
        assert_eq!(half.alpha(), 128);
        assert_eq!(pixmap.pixel(1, 2).unwrap().alpha(), 0);
        assert_eq!(pixmap.pixel(0, 0).unwrap().alpha(), 0);
    }
}
