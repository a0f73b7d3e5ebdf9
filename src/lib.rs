pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

#[cfg(feature = "tesseract")]
pub use adapters::ocr::TesseractFactory;
pub use adapters::{http::VerifyServer, ocr::UnavailableOcrFactory};
pub use crate::core::{orchestrator::Verifier, preprocess::ContrastPreprocessor};
pub use domain::model::{ExtractedFields, ImageData, VerificationRequest, VerificationVerdict};
pub use domain::settings::{OcrSettings, PipelineSettings, ServerSettings};
pub use utils::error::{Result, VerifyError};
