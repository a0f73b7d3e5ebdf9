use crate::domain::model::{PreprocessedImage, VerificationRequest, VerificationVerdict};
use crate::domain::settings::PipelineSettings;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub trait ImagePreprocessor: Send + Sync + 'static {
    fn preprocess(&self, raw: &[u8], settings: &PipelineSettings) -> Result<PreprocessedImage>;
}

/// One recognition engine instance. Blocking; called from the blocking pool.
///
/// `terminate` may run while an abandoned `recognize` call is still in
/// flight on another thread.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &PreprocessedImage) -> Result<String>;
    fn terminate(&self) -> Result<()>;
}

pub trait OcrEngineFactory: Send + Sync + 'static {
    fn acquire(&self) -> Result<Arc<dyn OcrEngine>>;
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, request: VerificationRequest) -> VerificationVerdict;
}
