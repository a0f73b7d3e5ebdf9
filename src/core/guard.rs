use crate::domain::ports::OcrEngine;
use std::sync::Arc;

/// Request-scoped owner of an OCR engine.
///
/// The engine is terminated exactly once: by `release`, or by `Drop` if the
/// request unwound before reaching it. Termination errors are logged only.
pub struct EngineGuard {
    engine: Option<Arc<dyn OcrEngine>>,
}

impl EngineGuard {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// Shared handle for the recognition task. `None` once released.
    pub fn engine(&self) -> Option<Arc<dyn OcrEngine>> {
        self.engine.clone()
    }

    pub fn release(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if let Some(engine) = self.engine.take() {
            match engine.terminate() {
                Ok(()) => tracing::debug!("🧹 OCR engine released"),
                Err(e) => tracing::warn!("⚠️ OCR engine release failed (ignored): {}", e),
            }
        }
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}
