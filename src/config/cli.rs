use crate::config::toml_config::TomlConfig;
use crate::utils::error::{Result, VerifyError};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "id-verify")]
#[command(about = "Identity document verification service")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override server.bind_address
    #[arg(long)]
    pub bind: Option<String>,

    /// Override pipeline.ocr_timeout_ms
    #[arg(long)]
    pub ocr_timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Start even without OCR support; every upload then goes to manual review
    #[arg(long)]
    pub manual_review_only: bool,
}

impl CliConfig {
    /// Loads the config file (if any) and applies command-line overrides.
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
            tracing::info!("🔧 bind_address overridden to: {}", bind);
        }

        if let Some(timeout) = self.ocr_timeout_ms {
            config.pipeline.ocr_timeout_ms = timeout;
            tracing::info!("🔧 ocr_timeout_ms overridden to: {}", timeout);
        }

        Ok(config)
    }

    /// 沒有編入 OCR 時拒絕啟動，除非明確指定 --manual-review-only
    pub fn ensure_ocr(&self, ocr_available: bool) -> Result<()> {
        if ocr_available {
            return Ok(());
        }
        if self.manual_review_only {
            tracing::warn!("⚠️ OCR not compiled in: every upload goes to manual review");
            return Ok(());
        }
        Err(VerifyError::ConfigValidationError {
            field: "ocr".to_string(),
            message: "built without the `tesseract` feature; rebuild with --features tesseract \
                      or pass --manual-review-only"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let cli = CliConfig::parse_from(["id-verify"]);
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert_eq!(cli.load().unwrap(), TomlConfig::default());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[server]\nbind_address = \"127.0.0.1:7000\"\n\n[pipeline]\nocr_timeout_ms = 1000\n")
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from([
            "id-verify",
            "--config",
            path.as_str(),
            "--bind",
            "127.0.0.1:7100",
            "--log-format",
            "json",
        ]);
        let config = cli.load().unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(config.server.bind_address, "127.0.0.1:7100");
        assert_eq!(config.pipeline.ocr_timeout_ms, 1000);
    }

    #[test]
    fn test_missing_ocr_is_a_config_error() {
        let cli = CliConfig::parse_from(["id-verify", "--check-config"]);
        let err = cli.ensure_ocr(false).unwrap_err();

        assert!(matches!(err, VerifyError::ConfigValidationError { ref field, .. } if field == "ocr"));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Config);
        tokio_test::assert_ok!(cli.ensure_ocr(true));
    }

    #[test]
    fn test_manual_review_only_allows_missing_ocr() {
        let cli = CliConfig::parse_from(["id-verify", "--manual-review-only"]);
        assert!(cli.manual_review_only);
        tokio_test::assert_ok!(cli.ensure_ocr(false));
    }
}
