use anyhow::Context;
use clap::Parser;
use id_verify::config::LogFormat;
use id_verify::adapters::ocr::OCR_AVAILABLE;
use id_verify::domain::ports::IdentityVerifier;
use id_verify::utils::{logger, validation::Validate};
use id_verify::{CliConfig, ContrastPreprocessor, TomlConfig, Verifier, VerifyServer};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("🚀 Starting id-verify");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let loaded = cli
        .load()
        .and_then(|config| config.validate().map(|_| config))
        .and_then(|config| cli.ensure_ocr(OCR_AVAILABLE).map(|_| config));
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(
                "❌ Configuration failed: {} (Category: {:?})",
                e,
                e.category()
            );
            eprintln!("❌ {}", e);
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if cli.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    tracing::info!(
        "⚙️ OCR timeout {}ms, JPEG quality {}, contrast gain {}",
        config.pipeline.ocr_timeout_ms,
        config.pipeline.jpeg_quality,
        config.pipeline.contrast_gain
    );

    let server = VerifyServer::new(build_verifier(&config), config.server.clone());
    let listener = server
        .bind()
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;

    tracing::info!("📮 Accepting uploads on POST {}", config.server.verify_path);
    server.run_until(listener, shutdown_signal()).await?;

    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_verifier(config: &TomlConfig) -> Arc<dyn IdentityVerifier> {
    use id_verify::TesseractFactory;

    tracing::info!(
        "🔤 Tesseract language '{}', page segmentation mode {}",
        config.ocr.language,
        config.ocr.page_segmentation_mode
    );
    Arc::new(Verifier::new(
        ContrastPreprocessor::new(),
        TesseractFactory::new(config.ocr.clone()),
        config.pipeline.clone(),
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_verifier(config: &TomlConfig) -> Arc<dyn IdentityVerifier> {
    use id_verify::UnavailableOcrFactory;

    Arc::new(Verifier::new(
        ContrastPreprocessor::new(),
        UnavailableOcrFactory,
        config.pipeline.clone(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
