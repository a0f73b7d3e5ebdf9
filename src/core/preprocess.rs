use crate::domain::model::PreprocessedImage;
use crate::domain::ports::ImagePreprocessor;
use crate::domain::settings::PipelineSettings;
use crate::utils::error::{Result, VerifyError};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageReader, Limits};
use std::io::Cursor;

/// Grayscale → full-range normalize → linear gain → JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContrastPreprocessor;

impl ContrastPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl ImagePreprocessor for ContrastPreprocessor {
    fn preprocess(&self, raw: &[u8], settings: &PipelineSettings) -> Result<PreprocessedImage> {
        let decoded = decode_bounded(raw, settings.max_image_dimension)?;

        let mut gray = decoded.to_luma8();
        normalize(&mut gray);
        linear(&mut gray, settings.contrast_gain, 0.0);

        let (width, height) = gray.dimensions();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, settings.jpeg_quality)
            .encode_image(&gray)
            .map_err(|e| VerifyError::ImageEncodeError {
                message: e.to_string(),
            })?;

        tracing::debug!(
            "🖼️ Preprocessed {}x{} image: {} bytes in, {} bytes out",
            width,
            height,
            raw.len(),
            bytes.len()
        );

        Ok(PreprocessedImage {
            bytes,
            width,
            height,
        })
    }
}

/// Decodes with a cap on declared width and height, so a tiny file that
/// claims a huge canvas is rejected before any pixel buffer is allocated.
fn decode_bounded(raw: &[u8], max_dimension: u32) -> Result<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| VerifyError::image_decode(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);
    reader.limits(limits);

    reader
        .decode()
        .map_err(|e| VerifyError::image_decode(e.to_string()))
}

/// Stretches intensities so the darkest pixel becomes 0 and the brightest 255.
/// A flat image is left untouched.
pub fn normalize(image: &mut GrayImage) {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max <= min {
        return;
    }

    let span = f32::from(max - min);
    for pixel in image.pixels_mut() {
        let v = f32::from(pixel[0] - min) * 255.0 / span;
        pixel[0] = v.round() as u8;
    }
}

/// `out = in * gain + offset`, clamped to `0..=255`.
pub fn linear(image: &mut GrayImage, gain: f32, offset: f32) {
    for pixel in image.pixels_mut() {
        let v = f32::from(pixel[0]) * gain + offset;
        pixel[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}
