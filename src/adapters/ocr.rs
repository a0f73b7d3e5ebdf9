// Provide two engine factories: Tesseract when the `tesseract` feature is
// enabled, and one that always fails to acquire when it's not. Without OCR
// every request degrades to manual review.

use crate::domain::ports::{OcrEngine, OcrEngineFactory};
use crate::utils::error::{Result, VerifyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

/// Whether this build links a real OCR engine.
pub const OCR_AVAILABLE: bool = cfg!(feature = "tesseract");

#[derive(Debug, Clone, Default)]
pub struct UnavailableOcrFactory;

impl OcrEngineFactory for UnavailableOcrFactory {
    fn acquire(&self) -> Result<Arc<dyn OcrEngine>> {
        Err(VerifyError::ocr_engine(
            "OCR support not compiled in; rebuild with --features tesseract",
        ))
    }
}

/// Holds a native engine that `release` may free while a worker still has
/// it checked out. The worker re-checks the flag after its lock is dropped,
/// so a release that loses the `try_lock` is finished there.
pub struct ReleasableSlot<T> {
    value: Mutex<Option<T>>,
    released: AtomicBool,
}

impl<T> ReleasableSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            released: AtomicBool::new(false),
        }
    }

    /// Runs `f` against the held value. Fails once the slot is released.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let outcome = {
            let mut slot = self
                .value
                .lock()
                .map_err(|_| VerifyError::ocr_engine("engine lock poisoned"))?;
            match slot.as_mut() {
                Some(value) => f(value),
                None => Err(VerifyError::ocr_engine("engine already terminated")),
            }
        };

        // 鎖放掉之後再看一次：release 可能剛好撞上 WouldBlock
        if self.released.load(Ordering::SeqCst) {
            self.free();
        }

        outcome
    }

    /// Frees the value now, or leaves it to the worker currently inside
    /// `with`. Only the first call does anything.
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match self.value.try_lock() {
            Ok(mut slot) => {
                slot.take();
                Ok(())
            }
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("⏳ OCR engine still busy, release deferred to recognition thread");
                Ok(())
            }
            Err(TryLockError::Poisoned(_)) => Err(VerifyError::OcrReleaseError {
                message: "engine lock poisoned".to_string(),
            }),
        }
    }

    #[cfg(test)]
    fn is_held(&self) -> bool {
        self.value.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn free(&self) {
        if let Ok(mut slot) = self.value.lock() {
            if slot.take().is_some() {
                tracing::debug!("🧹 Deferred OCR engine release completed");
            }
        }
    }
}

#[cfg(feature = "tesseract")]
pub use tess::{TesseractEngine, TesseractFactory};

#[cfg(feature = "tesseract")]
mod tess {
    use super::*;
    use crate::domain::model::PreprocessedImage;
    use crate::domain::settings::OcrSettings;
    use leptess::{LepTess, Variable};

    /// Creates one `LepTess` per request.
    #[derive(Debug, Clone)]
    pub struct TesseractFactory {
        settings: OcrSettings,
    }

    impl TesseractFactory {
        pub fn new(settings: OcrSettings) -> Self {
            Self { settings }
        }
    }

    impl OcrEngineFactory for TesseractFactory {
        fn acquire(&self) -> Result<Arc<dyn OcrEngine>> {
            let mut tess = LepTess::new(self.settings.data_path.as_deref(), &self.settings.language)
                .map_err(|e| VerifyError::ocr_engine(format!("tesseract init: {}", e)))?;

            tess.set_variable(
                Variable::TesseditPagesegMode,
                &self.settings.page_segmentation_mode.to_string(),
            )
            .map_err(|e| VerifyError::ocr_engine(format!("tesseract psm: {}", e)))?;

            Ok(Arc::new(TesseractEngine {
                tess: ReleasableSlot::new(tess),
            }))
        }
    }

    pub struct TesseractEngine {
        tess: ReleasableSlot<LepTess>,
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, image: &PreprocessedImage) -> Result<String> {
            self.tess.with(|tess| {
                tess.set_image_from_mem(&image.bytes)
                    .map_err(|e| VerifyError::ocr_engine(format!("tesseract load image: {}", e)))?;
                tess.get_utf8_text()
                    .map_err(|e| VerifyError::ocr_engine(format!("tesseract run: {}", e)))
            })
        }

        fn terminate(&self) -> Result<()> {
            self.tess.release()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_unavailable_factory_fails_to_acquire() {
        let err = match UnavailableOcrFactory.acquire() {
            Ok(_) => panic!("expected acquire to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, VerifyError::OcrEngineError { .. }));
        assert!(err.degrades_to_manual_review());
    }

    struct CountsDrops(Arc<AtomicUsize>);

    impl Drop for CountsDrops {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_when_idle_frees_immediately() {
        let drops = Arc::new(AtomicUsize::new(0));
        let slot = ReleasableSlot::new(CountsDrops(Arc::clone(&drops)));

        slot.release().unwrap();
        slot.release().unwrap();

        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!slot.is_held());
        assert!(slot.with(|_| Ok(())).is_err());
    }

    // release 發生在 worker 持鎖期間：worker 結束時必須自己釋放，不能等 Arc 被丟掉
    #[test]
    fn test_release_while_busy_is_finished_by_worker() {
        let drops = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(ReleasableSlot::new(CountsDrops(Arc::clone(&drops))));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();

        let worker = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                slot.with(|_| {
                    entered_tx.send(()).unwrap();
                    resume_rx.recv().unwrap();
                    Ok("text")
                })
            })
        };

        entered_rx.recv().unwrap();
        slot.release().unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        resume_tx.send(()).unwrap();
        assert_eq!(worker.join().unwrap().unwrap(), "text");

        // slot 本身還活著，值已經被釋放
        assert_eq!(Arc::strong_count(&slot), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!slot.is_held());
    }
}
