use crate::domain::settings::{OcrSettings, PipelineSettings, ServerSettings};
use crate::utils::error::{Result, VerifyError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_route_path,
    validate_socket_addr, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Service configuration file. Every table and key is optional.
///
/// ```toml
/// [server]
/// bind_address = "0.0.0.0:8080"
/// verify_path = "/api/verify-id"
/// max_body_bytes = 10485760
///
/// [pipeline]
/// ocr_timeout_ms = 30000
/// jpeg_quality = 85
/// contrast_gain = 1.2
/// max_image_dimension = 8192
///
/// [ocr]
/// language = "eng"
/// data_path = "${TESSDATA_PREFIX}"
/// page_segmentation_mode = 6
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerSettings,
    pub pipeline: PipelineSettings,
    pub ocr: OcrSettings,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(VerifyError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| VerifyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TESSDATA_PREFIX})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_socket_addr("server.bind_address", &self.server.bind_address)?;
        validate_route_path("server.verify_path", &self.server.verify_path)?;
        validate_positive_number("server.max_body_bytes", self.server.max_body_bytes, 1024)?;

        validate_range("pipeline.ocr_timeout_ms", self.pipeline.ocr_timeout_ms, 1, 300_000)?;
        validate_range("pipeline.jpeg_quality", self.pipeline.jpeg_quality, 1, 100)?;
        validate_range(
            "pipeline.max_image_dimension",
            self.pipeline.max_image_dimension,
            16,
            65_535,
        )?;
        if !(self.pipeline.contrast_gain > 0.0 && self.pipeline.contrast_gain <= 10.0) {
            return Err(VerifyError::InvalidConfigValueError {
                field: "pipeline.contrast_gain".to_string(),
                value: self.pipeline.contrast_gain.to_string(),
                reason: "Gain must be greater than 0 and at most 10".to_string(),
            });
        }

        validate_non_empty_string("ocr.language", &self.ocr.language)?;
        validate_range("ocr.page_segmentation_mode", self.ocr.page_segmentation_mode, 0, 13)?;
        if let Some(data_path) = &self.ocr.data_path {
            validate_non_empty_string("ocr.data_path", data_path)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
