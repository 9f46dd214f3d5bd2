//! Frame annotation and JPEG codec helpers.

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

use sightline_models::{BoundingBox, Detection};

use crate::error::{MediaError, MediaResult};

/// Annotation box color (green).
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Annotation box edge thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;

const JPEG_QUALITY: u8 = 90;

/// Copy the frame and draw one rectangle per detection. The source
/// frame is never modified.
pub fn render_detections(frame: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut annotated = frame.clone();
    for detection in detections {
        draw_rect(&mut annotated, &detection.bbox);
    }
    annotated
}

/// Draw a hollow rectangle clamped to the image bounds.
fn draw_rect(image: &mut RgbImage, bbox: &BoundingBox) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let clamped = bbox.clamp_to(width, height);
    let x1 = (clamped.x1.round() as u32).min(width - 1);
    let y1 = (clamped.y1.round() as u32).min(height - 1);
    let x2 = (clamped.x2.round() as u32).min(width - 1);
    let y2 = (clamped.y2.round() as u32).min(height - 1);
    if x2 < x1 || y2 < y1 {
        return;
    }

    for t in 0..BOX_THICKNESS {
        let top = y1 + t;
        let bottom = y2.saturating_sub(t);
        if top <= y2 {
            for x in x1..=x2 {
                image.put_pixel(x, top, BOX_COLOR);
                image.put_pixel(x, bottom, BOX_COLOR);
            }
        }

        let left = x1 + t;
        let right = x2.saturating_sub(t);
        if left <= x2 {
            for y in y1..=y2 {
                image.put_pixel(left, y, BOX_COLOR);
                image.put_pixel(right, y, BOX_COLOR);
            }
        }
    }
}

/// Encode a frame as JPEG bytes.
pub fn encode_jpeg(image: &RgbImage) -> MediaResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| MediaError::ImageEncode(e.to_string()))?;
    Ok(bytes)
}

/// Decode image bytes (any supported container) to packed RGB.
pub fn decode_image(bytes: &[u8]) -> MediaResult<RgbImage> {
    let image =
        image::load_from_memory(bytes).map_err(|e| MediaError::ImageDecode(e.to_string()))?;
    Ok(image.to_rgb8())
}

/// Load an image file from disk to packed RGB.
pub fn load_image(path: impl AsRef<Path>) -> MediaResult<RgbImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|e| MediaError::ImageDecode(e.to_string()))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_models::Detection;

    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, GRAY)
    }

    #[test]
    fn draws_two_pixel_edges() {
        let frame = blank(20, 20);
        let det = Detection::new(BoundingBox::new(5.0, 5.0, 15.0, 15.0), 0.9, "person");
        let out = render_detections(&frame, &[det]);

        // Outer and inner edge rows/columns are painted.
        assert_eq!(*out.get_pixel(5, 5), BOX_COLOR);
        assert_eq!(*out.get_pixel(10, 6), BOX_COLOR);
        assert_eq!(*out.get_pixel(6, 10), BOX_COLOR);
        assert_eq!(*out.get_pixel(15, 15), BOX_COLOR);
        assert_eq!(*out.get_pixel(14, 10), BOX_COLOR);

        // Interior stays untouched.
        assert_eq!(*out.get_pixel(10, 10), GRAY);
        assert_eq!(*out.get_pixel(7, 7), GRAY);

        // Outside the box stays untouched.
        assert_eq!(*out.get_pixel(3, 3), GRAY);
        assert_eq!(*out.get_pixel(17, 17), GRAY);
    }

    #[test]
    fn source_frame_is_not_modified() {
        let frame = blank(20, 20);
        let det = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, "person");
        let _ = render_detections(&frame, &[det]);
        assert_eq!(*frame.get_pixel(0, 0), GRAY);
    }

    #[test]
    fn out_of_bounds_box_is_clamped() {
        let frame = blank(10, 10);
        let det = Detection::new(BoundingBox::new(-20.0, -20.0, 50.0, 50.0), 0.9, "person");
        let out = render_detections(&frame, &[det]);

        assert_eq!(*out.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*out.get_pixel(9, 9), BOX_COLOR);
        assert_eq!(*out.get_pixel(5, 5), GRAY);
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let frame = blank(32, 24);
        let bytes = encode_jpeg(&frame).unwrap();
        let back = decode_image(&bytes).unwrap();
        assert_eq!(back.dimensions(), (32, 24));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn load_missing_file_is_file_not_found() {
        let err = load_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
