use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Image decode failed: {message}")]
    ImageDecodeError { message: String },

    #[error("Image encode failed: {message}")]
    ImageEncodeError { message: String },

    #[error("OCR timed out after {timeout_ms}ms")]
    OcrTimeoutError { timeout_ms: u64 },

    #[error("OCR engine error: {message}")]
    OcrEngineError { message: String },

    #[error("OCR engine release failed: {message}")]
    OcrReleaseError { message: String },

    #[error("Request rejected ({status}): {reason}")]
    RequestShapeError { status: u16, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Image,
    Ocr,
    Config,
    Io,
}

impl VerifyError {
    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecodeError {
            message: message.into(),
        }
    }

    pub fn ocr_engine(message: impl Into<String>) -> Self {
        Self::OcrEngineError {
            message: message.into(),
        }
    }

    pub fn request_shape(status: u16, reason: impl Into<String>) -> Self {
        Self::RequestShapeError {
            status,
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RequestShapeError { .. } => ErrorCategory::Request,
            Self::ImageDecodeError { .. } | Self::ImageEncodeError { .. } => ErrorCategory::Image,
            Self::OcrTimeoutError { .. }
            | Self::OcrEngineError { .. }
            | Self::OcrReleaseError { .. } => ErrorCategory::Ocr,
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                ErrorCategory::Config
            }
            Self::IoError(_) => ErrorCategory::Io,
        }
    }

    /// 錯誤是否應降級為人工審核，而不是回報給呼叫端
    pub fn degrades_to_manual_review(&self) -> bool {
        matches!(self.category(), ErrorCategory::Image | ErrorCategory::Ocr)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Request => "Send a POST request with a JSON body containing a base64 `file`",
            ErrorCategory::Image => "Upload a readable JPEG or PNG photo of the ID",
            ErrorCategory::Ocr => {
                "Check that Tesseract and its language data are installed, or raise pipeline.ocr_timeout_ms"
            }
            ErrorCategory::Config => "Fix the configuration file and run again with --check-config",
            ErrorCategory::Io => "Check file paths, permissions and that the bind address is free",
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pipeline_faults_degrade() {
        assert!(VerifyError::image_decode("bad header").degrades_to_manual_review());
        assert!(VerifyError::OcrTimeoutError { timeout_ms: 30_000 }.degrades_to_manual_review());
        assert!(VerifyError::ocr_engine("init failed").degrades_to_manual_review());
        assert!(!VerifyError::request_shape(400, "No image file uploaded.").degrades_to_manual_review());
        assert!(!VerifyError::ConfigValidationError {
            field: "ocr".to_string(),
            message: "bad".to_string()
        }
        .degrades_to_manual_review());
        assert!(!VerifyError::IoError(std::io::Error::other("disk")).degrades_to_manual_review());
    }

    #[test]
    fn test_timeout_message_names_limit() {
        let err = VerifyError::OcrTimeoutError { timeout_ms: 30_000 };
        assert_eq!(err.to_string(), "OCR timed out after 30000ms");
        assert_eq!(err.category(), ErrorCategory::Ocr);
    }
}
