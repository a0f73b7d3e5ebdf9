use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OCR_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
pub const DEFAULT_CONTRAST_GAIN: f32 = 1.2;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
/// Largest width or height accepted before decoding pixel data.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 8_192;

/// Tesseract `PSM_SINGLE_BLOCK`: the card is read as one uniform block of text.
pub const PSM_SINGLE_BLOCK: u8 = 6;

/// Knobs handed to the orchestrator at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub ocr_timeout_ms: u64,
    pub jpeg_quality: u8,
    pub contrast_gain: f32,
    pub max_image_dimension: u32,
}

impl PipelineSettings {
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_image_dimension(mut self, pixels: u32) -> Self {
        self.max_image_dimension = pixels;
        self
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ocr_timeout_ms: DEFAULT_OCR_TIMEOUT_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            contrast_gain: DEFAULT_CONTRAST_GAIN,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OcrSettings {
    pub language: String,
    pub data_path: Option<String>,
    pub page_segmentation_mode: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            data_path: None,
            page_segmentation_mode: PSM_SINGLE_BLOCK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub verify_path: String,
    pub max_body_bytes: usize,
    pub shutdown_timeout_seconds: u64,
}

impl ServerSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            verify_path: "/api/verify-id".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            shutdown_timeout_seconds: 10,
        }
    }
}
