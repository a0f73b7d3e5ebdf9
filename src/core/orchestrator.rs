use crate::core::extractor::extract_fields;
use crate::core::guard::EngineGuard;
use crate::core::validator::validate_claims;
use crate::domain::model::{
    ExtractedFields, PreprocessedImage, ValidationOutcome, VerificationRequest, VerificationVerdict,
};
use crate::domain::ports::{IdentityVerifier, ImagePreprocessor, OcrEngineFactory};
use crate::domain::settings::PipelineSettings;
use crate::utils::error::{Result, VerifyError};
use crate::utils::race::within;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Linear stages of one verification. Any failure jumps to `Terminating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Preprocessing,
    Recognizing,
    Extracting,
    Validating,
    Terminating,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Preprocessing => "preprocessing",
            Stage::Recognizing => "recognizing",
            Stage::Extracting => "extracting",
            Stage::Validating => "validating",
            Stage::Terminating => "terminating",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "➡️ stage");
}

/// Runs preprocess → recognize → extract → validate and maps every outcome
/// onto `verified` or `manual_review`.
pub struct Verifier<P: ImagePreprocessor, F: OcrEngineFactory> {
    preprocessor: Arc<P>,
    engines: Arc<F>,
    settings: PipelineSettings,
}

impl<P: ImagePreprocessor, F: OcrEngineFactory> Verifier<P, F> {
    pub fn new(preprocessor: P, engines: F, settings: PipelineSettings) -> Self {
        Self {
            preprocessor: Arc::new(preprocessor),
            engines: Arc::new(engines),
            settings,
        }
    }

    pub async fn run(&self, request: VerificationRequest) -> VerificationVerdict {
        let started = Instant::now();
        enter(Stage::Received);

        let verdict = match self.engines.acquire() {
            Ok(engine) => {
                let guard = EngineGuard::new(engine);
                let outcome = self.run_stages(&guard, request).await;

                enter(Stage::Terminating);
                guard.release();

                match outcome {
                    Ok((extracted, validation)) => decide(extracted, validation),
                    Err(e) => degrade(&e),
                }
            }
            Err(e) => degrade(&e),
        };

        enter(Stage::Responded);
        tracing::info!(
            status = verdict.status(),
            confidence = verdict.confidence(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Verification finished"
        );
        verdict
    }

    async fn run_stages(
        &self,
        guard: &EngineGuard,
        request: VerificationRequest,
    ) -> Result<(ExtractedFields, ValidationOutcome)> {
        let VerificationRequest {
            image_data,
            claimed_full_name,
            claimed_birthdate,
        } = request;

        enter(Stage::Preprocessing);
        let raw = image_data.into_bytes()?;
        let image = self.preprocess(raw).await?;

        enter(Stage::Recognizing);
        let text = self.recognize(guard, image).await?;

        enter(Stage::Extracting);
        let extracted = extract_fields(&text);
        tracing::debug!(
            name = extracted.name.is_some(),
            birthdate = extracted.birthdate.is_some(),
            id_number = extracted.id_number.is_some(),
            "🔎 Fields extracted"
        );

        enter(Stage::Validating);
        let validation = validate_claims(&extracted, &claimed_full_name, &claimed_birthdate);

        Ok((extracted, validation))
    }

    async fn preprocess(&self, raw: Vec<u8>) -> Result<PreprocessedImage> {
        let preprocessor = Arc::clone(&self.preprocessor);
        let settings = self.settings.clone();

        tokio::task::spawn_blocking(move || preprocessor.preprocess(&raw, &settings))
            .await
            .map_err(|e| VerifyError::image_decode(format!("preprocessing task failed: {}", e)))?
    }

    /// Races the blocking OCR call against `ocr_timeout`. On timeout the
    /// call is abandoned, not interrupted.
    async fn recognize(&self, guard: &EngineGuard, image: PreprocessedImage) -> Result<String> {
        let engine = guard
            .engine()
            .ok_or_else(|| VerifyError::ocr_engine("engine already released"))?;
        let limit = self.settings.ocr_timeout();

        let task = tokio::task::spawn_blocking(move || engine.recognize(&image));

        match within(limit, task).await {
            Some(Ok(result)) => result,
            Some(Err(join_error)) => Err(VerifyError::ocr_engine(format!(
                "recognition task failed: {}",
                join_error
            ))),
            None => Err(VerifyError::OcrTimeoutError {
                timeout_ms: self.settings.ocr_timeout_ms,
            }),
        }
    }
}

fn decide(extracted: ExtractedFields, validation: ValidationOutcome) -> VerificationVerdict {
    if validation.is_valid {
        VerificationVerdict::verified(extracted)
    } else {
        VerificationVerdict::mismatch(&validation.errors, extracted)
    }
}

/// Any failure inside the pipeline still answers `manual_review` at 0.
/// Image and OCR faults are expected; anything else is logged as a bug.
fn degrade(error: &VerifyError) -> VerificationVerdict {
    if error.degrades_to_manual_review() {
        tracing::warn!(
            category = ?error.category(),
            "⚠️ Automatic verification unavailable, handing off to manual review: {}",
            error
        );
    } else {
        tracing::error!(
            category = ?error.category(),
            "❌ Unexpected pipeline failure, handing off to manual review: {}",
            error
        );
    }
    VerificationVerdict::unavailable()
}

#[async_trait]
impl<P: ImagePreprocessor, F: OcrEngineFactory> IdentityVerifier for Verifier<P, F> {
    async fn verify(&self, request: VerificationRequest) -> VerificationVerdict {
        let span = tracing::info_span!("verify");
        self.run(request).instrument(span).await
    }
}
