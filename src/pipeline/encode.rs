//! Image encoding: raw RGBA raster → baseline JPEG.
//!
//! JPEG keeps repaired documents close to the size of typical scanned PDFs;
//! a lossless format would make every page several megabytes at 150 DPI.
//! The bytes are embedded unchanged as a `/DCTDecode` image stream, so no
//! re-encoding happens during assembly.

use crate::pipeline::protocol::RenderedPage;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};
use tracing::debug;

/// Map a `(0, 1]` quality to the encoder's `1..=100` scale (0.85 → 85).
pub fn jpeg_quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Compress a rendered page.
///
/// JPEG has no alpha channel; translucent pixels are composited over white,
/// the colour the renderer clears each page to.
pub fn encode_page(page: &RenderedPage, quality: f32) -> Result<Vec<u8>, ImageError> {
    let rgb = flatten_over_white(page)?;

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, jpeg_quality_percent(quality)).encode_image(&rgb)?;

    debug!(
        "Encoded page {} → {} bytes JPEG",
        page.page_index + 1,
        buf.len()
    );
    Ok(buf)
}

fn flatten_over_white(page: &RenderedPage) -> Result<RgbImage, ImageError> {
    if page.pixels.len() != RenderedPage::expected_len(page.width, page.height) {
        return Err(ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        )));
    }

    let mut rgb = Vec::with_capacity(page.width as usize * page.height as usize * 3);
    for px in page.pixels.chunks_exact(4) {
        let alpha = px[3] as u16;
        for &channel in &px[..3] {
            let blended = (channel as u16 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }

    RgbImage::from_raw(page.width, page.height, rgb).ok_or_else(|| {
        ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(width: u32, height: u32, rgba: [u8; 4]) -> RenderedPage {
        RenderedPage {
            page_index: 0,
            width,
            height,
            pixels: rgba.repeat(width as usize * height as usize),
        }
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(jpeg_quality_percent(0.85), 85);
        assert_eq!(jpeg_quality_percent(1.0), 100);
        assert_eq!(jpeg_quality_percent(0.0), 1);
    }

    #[test]
    fn encodes_a_decodable_jpeg_with_same_size() {
        let jpeg = encode_page(&page(40, 30, [200, 10, 10, 255]), 0.85).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing SOI marker");

        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let rgb = flatten_over_white(&page(1, 1, [0, 0, 0, 0])).unwrap();
        assert_eq!(rgb.as_raw(), &vec![255, 255, 255]);

        let rgb = flatten_over_white(&page(1, 1, [10, 20, 30, 255])).unwrap();
        assert_eq!(rgb.as_raw(), &vec![10, 20, 30]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let bad = RenderedPage {
            page_index: 0,
            width: 10,
            height: 10,
            pixels: vec![0; 7],
        };
        assert!(encode_page(&bad, 0.85).is_err());
    }

    #[test]
    fn lower_quality_is_smaller() {
        // A noisy raster so quality actually matters.
        let mut noisy = page(64, 64, [0, 0, 0, 255]);
        for (i, b) in noisy.pixels.iter_mut().enumerate() {
            if i % 4 != 3 {
                *b = (i.wrapping_mul(2654435761) >> 7) as u8;
            }
        }
        let high = encode_page(&noisy, 0.95).unwrap();
        let low = encode_page(&noisy, 0.2).unwrap();
        assert!(low.len() < high.len(), "{} !< {}", low.len(), high.len());
    }
}
