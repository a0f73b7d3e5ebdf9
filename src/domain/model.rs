use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, VerifyError};

pub const VERIFIED_CONFIDENCE: u8 = 85;
pub const MISMATCH_CONFIDENCE: u8 = 60;
pub const UNAVAILABLE_CONFIDENCE: u8 = 0;

pub const UNAVAILABLE_REASON: &str =
    "Automatic verification unavailable. Your ID will be reviewed manually.";

/// Uploaded photo, either raw bytes or a (data-URL style) base64 string.
#[derive(Debug, Clone)]
pub enum ImageData {
    Bytes(Vec<u8>),
    Base64(String),
}

impl ImageData {
    /// Decodes to raw image bytes. For base64 input everything up to the
    /// first `,` is treated as a data-URL prefix and stripped.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ImageData::Bytes(bytes) => Ok(bytes),
            ImageData::Base64(encoded) => {
                let payload = match encoded.split_once(',') {
                    Some((_, data)) => data,
                    None => encoded.as_str(),
                };
                STANDARD
                    .decode(payload.trim())
                    .map_err(|e| VerifyError::image_decode(format!("invalid base64 payload: {}", e)))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub image_data: ImageData,
    pub claimed_full_name: String,
    pub claimed_birthdate: String,
}

/// Re-encoded, OCR-ready image. Owned by a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub birthdate: Option<String>,
    pub id_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationVerdict {
    Verified {
        confidence: u8,
        extracted: ExtractedFields,
    },
    ManualReview {
        confidence: u8,
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        extracted: Option<ExtractedFields>,
    },
}

impl VerificationVerdict {
    pub fn verified(extracted: ExtractedFields) -> Self {
        Self::Verified {
            confidence: VERIFIED_CONFIDENCE,
            extracted,
        }
    }

    pub fn mismatch(errors: &[String], extracted: ExtractedFields) -> Self {
        Self::ManualReview {
            confidence: MISMATCH_CONFIDENCE,
            reason: errors.join(", "),
            extracted: Some(extracted),
        }
    }

    pub fn unavailable() -> Self {
        Self::ManualReview {
            confidence: UNAVAILABLE_CONFIDENCE,
            reason: UNAVAILABLE_REASON.to_string(),
            extracted: None,
        }
    }

    pub fn confidence(&self) -> u8 {
        match self {
            Self::Verified { confidence, .. } | Self::ManualReview { confidence, .. } => *confidence,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::ManualReview { .. } => "manual_review",
        }
    }
}
