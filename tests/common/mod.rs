#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use id_verify::core::{OcrEngine, OcrEngineFactory};
use id_verify::domain::model::PreprocessedImage;
use id_verify::{Result, VerifyError};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CARD_TEXT: &str = "REPUBLIC OF THE PHILIPPINES\n\
    Juan Dela Cruz\n\
    DATE OF BIRTH 01/15/1990\n\
    ID NO. 123-4567-8901\n";

#[derive(Debug, Default)]
pub struct EngineStats {
    pub acquired: AtomicUsize,
    pub recognized: AtomicUsize,
    pub terminated: AtomicUsize,
}

impl EngineStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn recognized(&self) -> usize {
        self.recognized.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// Hands out engines that return fixed text, optionally after a delay.
#[derive(Clone)]
pub struct ScriptedFactory {
    text: std::result::Result<String, String>,
    delay: Duration,
    pub stats: Arc<EngineStats>,
}

impl ScriptedFactory {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Ok(text.to_string()),
            delay: Duration::ZERO,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            text: Err(message.to_string()),
            delay: Duration::ZERO,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl OcrEngineFactory for ScriptedFactory {
    fn acquire(&self) -> Result<Arc<dyn OcrEngine>> {
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedEngine {
            text: self.text.clone(),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedEngine {
    text: std::result::Result<String, String>,
    delay: Duration,
    stats: Arc<EngineStats>,
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&self, image: &PreprocessedImage) -> Result<String> {
        assert!(!image.bytes.is_empty());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.stats.recognized.fetch_add(1, Ordering::SeqCst);
        self.text.clone().map_err(VerifyError::ocr_engine)
    }

    fn terminate(&self) -> Result<()> {
        self.stats.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn card_png() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 40, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([30, 30, 30])
        } else {
            Rgb([220, 215, 200])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}
