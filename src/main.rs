//! Command line entry point
//!
//! Segments an exam PDF into structured questions and prints the result
//! as JSON on stdout. Logs go to stderr so the output stays pipeable.

use clap::Parser;
use exam_segmenter::services::{HttpOcrClient, HttpVisionClient};
use exam_segmenter::{extract_questions, validate, EngineConfig, PdfiumBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "exam-segmenter", version, about = "Segment exam PDFs into structured questions")]
struct Cli {
    /// Path to the exam PDF
    pdf: std::path::PathBuf,

    /// OCR service endpoint; omit to disable the OCR fallback
    #[arg(long)]
    ocr_url: Option<String>,

    /// Vision service endpoint; omit to disable the vision fallback
    #[arg(long)]
    vision_url: Option<String>,

    /// API key for the vision service
    #[arg(long, env = "VISION_API_KEY")]
    api_key: Option<String>,

    /// Vision model identifier
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Skip base64 crop images in the output
    #[arg(long)]
    no_images: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Append a validation summary to the output
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exam_segmenter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = EngineConfig {
        ocr_url: cli.ocr_url,
        vision_url: cli.vision_url,
        vision_api_key: cli.api_key,
        vision_model: cli.model,
        include_images: !cli.no_images,
        ..EngineConfig::default()
    };

    tracing::info!(pdf = %cli.pdf.display(), "loading document");
    let backend = PdfiumBackend::open(&cli.pdf)?;

    let ocr = cfg
        .ocr_url
        .as_deref()
        .map(|url| HttpOcrClient::new(url, cfg.service_timeout));
    let vision = cfg.vision_url.as_deref().map(|url| {
        HttpVisionClient::new(
            url,
            cfg.vision_api_key.clone(),
            cfg.vision_model.clone(),
            cfg.service_timeout,
            cfg.vision_retries,
        )
    });

    let report = extract_questions(&backend, ocr.as_ref(), vision.as_ref(), &cfg).await?;
    tracing::info!(questions = report.total_questions, "extraction finished");

    if cli.check {
        let summary = validate(&report.questions);
        tracing::info!(valid = summary.valid, invalid = summary.invalid, "validation summary");
        for issue in &summary.issues {
            tracing::warn!(id = issue.id, problems = ?issue.problems, "incomplete question");
        }
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
