pub mod extractor;
pub mod guard;
pub mod orchestrator;
pub mod preprocess;
pub mod validator;

pub use crate::domain::model::{ExtractedFields, ValidationOutcome, VerificationVerdict};
pub use crate::domain::ports::{IdentityVerifier, ImagePreprocessor, OcrEngine, OcrEngineFactory};
pub use crate::utils::error::Result;
