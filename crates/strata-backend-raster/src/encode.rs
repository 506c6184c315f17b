//! PNG and JPEG encoding

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use strata_pipeline::{BackendError, OutputFormat};
use tiny_skia::Pixmap;

/// Straight-alpha RGBA bytes of a premultiplied pixmap
pub fn demultiply(pixmap: &Pixmap) -> Vec<u8> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    data
}

/// Encode `pixmap`; `quality` in [0, 1] applies to JPEG only
pub fn encode(pixmap: &Pixmap, format: OutputFormat, quality: f64) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let rgba = demultiply(pixmap);
    let mut buf = Vec::new();

    match format {
        OutputFormat::Png => PngEncoder::new(&mut buf)
            .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
            .map_err(|e| BackendError::Encode(e.to_string()))?,
        OutputFormat::Jpeg => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| BackendError::Encode(e.to_string()))?
        }
        OutputFormat::Heic => return Err(BackendError::UnsupportedFormat(format)),
    }

    Ok(buf)
}

/// JPEG quality on the encoder's 1-100 scale
fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixmap(rgba: [u8; 4]) -> Pixmap {
        let mut pixmap = Pixmap::new(8, 6).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        pixmap
    }

    #[test]
    fn test_png_keeps_alpha() {
        let bytes = encode(&pixmap([255, 0, 0, 128]), OutputFormat::Png, 1.0).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));
        let px = decoded.get_pixel(3, 3).0;
        assert_eq!(px[3], 128);
        assert!(px[0] >= 254);
    }

    #[test]
    fn test_jpeg() {
        let bytes = encode(&pixmap([0, 0, 255, 255]), OutputFormat::Jpeg, 0.8).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let mut noisy = Pixmap::new(64, 64).unwrap();
        for (i, b) in noisy.data_mut().iter_mut().enumerate() {
            *b = if i % 4 == 3 { 255 } else { (i * 37 % 251) as u8 };
        }

        let low = encode(&noisy, OutputFormat::Jpeg, 0.1).unwrap();
        let high = encode(&noisy, OutputFormat::Jpeg, 1.0).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_heic_unsupported() {
        assert!(matches!(
            encode(&pixmap([0, 0, 0, 255]), OutputFormat::Heic, 0.9),
            Err(BackendError::UnsupportedFormat(OutputFormat::Heic))
        ));
    }

    #[test]
    fn test_jpeg_quality_scale() {
        assert_eq!(jpeg_quality(0.6), 60);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.5), 100);
    }
}
