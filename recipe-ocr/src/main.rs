use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_ocr::config::Config;
use recipe_ocr::ocr::{
    CloudVisionEngine, EngineId, EngineOrder, FallbackOrchestrator, ImageRef, ServiceStatus,
    TesseractEngine,
};
use recipe_ocr::processing::{self, ProcessedText};

#[derive(Parser)]
#[command(name = "recipe-ocr")]
#[command(about = "Extract and clean the text of photographed recipes")]
struct Args {
    /// Image files (paths or file:// URIs)
    images: Vec<String>,

    /// Print engine availability and exit
    #[arg(long)]
    status: bool,

    /// Print the recognized text without cleanup
    #[arg(long)]
    raw: bool,

    /// Try the cloud engine before the on-device engine
    #[arg(long)]
    prefer_cloud: bool,

    /// Maximum number of images recognized at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Log format written to stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    available: bool,
    #[serde(flatten)]
    engines: ServiceStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionReport {
    engine: EngineId,
    engine_confidence: f32,
    results: Vec<TextReport>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum TextReport {
    Raw { text: String },
    Processed(ProcessedText),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let json_logs = args.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_ocr=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let mut config = Config::from_env();
    if args.prefer_cloud {
        config.orchestrator.prefer_cloud = true;
    }
    if let Some(concurrency) = args.concurrency {
        config.orchestrator.batch_concurrency = concurrency;
    }

    tracing::info!("Initializing on-device OCR: {}...", config.on_device.languages);
    let on_device = Arc::new(TesseractEngine::new(&config.on_device));
    tracing::info!("Initializing cloud OCR...");
    let cloud = Arc::new(CloudVisionEngine::new(&config.cloud));

    let mut orchestrator = FallbackOrchestrator::with_order(
        on_device,
        cloud,
        EngineOrder::from(&config.orchestrator),
    );

    if args.status {
        let engines = orchestrator.service_status().await;
        let report = StatusReport {
            available: engines.any_available(),
            engines,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.images.is_empty() {
        anyhow::bail!("No images given - pass one or more image paths, or --status");
    }

    if !orchestrator.is_available().await? {
        tracing::warn!("No OCR engine reports itself available - extraction will likely fail");
    }

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    let images: Vec<ImageRef> = args.images.into_iter().map(ImageRef::from).collect();
    let texts = if let [image] = images.as_slice() {
        vec![orchestrator.extract_text(image, &cancel_token).await?]
    } else {
        orchestrator
            .extract_text_from_multiple(
                &images,
                config.orchestrator.batch_concurrency,
                &cancel_token,
            )
            .await?
    };

    let results = texts
        .into_iter()
        .map(|text| {
            if args.raw {
                Ok(TextReport::Raw { text })
            } else {
                processing::analyze(&text).map(TextReport::Processed)
            }
        })
        .collect::<recipe_ocr::Result<Vec<_>>>()?;

    let report = ExtractionReport {
        engine: orchestrator.last_used_engine(),
        engine_confidence: orchestrator.last_confidence_score(),
        results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Interrupt received, cancelling OCR...");
        cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_defaults_to_text() {
        let args = Args::try_parse_from(["recipe-ocr", "recipe.jpg"]).unwrap();
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.images, vec!["recipe.jpg".to_string()]);
    }

    #[test]
    fn test_json_log_format() {
        let args =
            Args::try_parse_from(["recipe-ocr", "--log-format", "json", "--status"]).unwrap();
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.status);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(Args::try_parse_from(["recipe-ocr", "--log-format", "xml"]).is_err());
    }
}
